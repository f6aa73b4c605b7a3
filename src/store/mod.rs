//! Store client primitives consumed by the scan job layer.
//!
//! # Architecture
//!
//! [`StoreClient`] is the narrow seam to the database client: one
//! primitive submits a background scan, one reads a job's raw status.
//! Transport, wire protocol and cluster routing all live behind it.
//! Implementations must be safe to share across concurrent calls.
//!
//! # Implementations
//!
//! - [`InMemoryStore`](memory::InMemoryStore) -- an in-process job
//!   registry for tests and embedding.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::descriptor::JobDescriptor;
use crate::policy::{InfoPolicy, ScanPolicy};
use crate::status::RawScanInfo;
use crate::submit::JobId;

/// Store result code for a generic server-side failure.
pub const STORE_CODE_SERVER: i32 = 1;

/// Store result code for a missing key or an unknown job.
pub const STORE_CODE_NOT_FOUND: i32 = 2;

/// Store result code for a request the server rejected as malformed.
pub const STORE_CODE_REQUEST_INVALID: i32 = 4;

/// Store result code for a timed-out request.
pub const STORE_CODE_TIMEOUT: i32 = 9;

/// A non-success result from the store.
///
/// # Examples
///
/// ```
/// use scan_jobs::store::StoreError;
///
/// let err = StoreError::not_found("job 7 not found");
/// assert_eq!(err.code, 2);
/// assert_eq!(err.to_string(), "store error 2: job 7 not found");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("store error {code}: {message}")]
pub struct StoreError {
    /// Result code reported by the store.
    pub code: i32,
    /// Message reported by the store.
    pub message: String,
}

impl StoreError {
    /// Creates an error with an arbitrary store result code.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Generic server-side failure.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(STORE_CODE_SERVER, message)
    }

    /// Unknown or expired job.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(STORE_CODE_NOT_FOUND, message)
    }

    /// Request rejected as malformed.
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Self::new(STORE_CODE_REQUEST_INVALID, message)
    }

    /// Request timed out.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(STORE_CODE_TIMEOUT, message)
    }
}

/// Database client primitives for background scans.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; a single client is shared by
/// every concurrent call.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Hands `scan` to the store for background execution.
    ///
    /// Returns once the store has accepted the job, not when it finishes.
    /// `None` means the store's default scan policy applies.
    ///
    /// # Errors
    ///
    /// Any non-success result from the store.
    async fn submit_background_scan(
        &self,
        policy: Option<&ScanPolicy>,
        scan: &JobDescriptor,
    ) -> Result<JobId, StoreError>;

    /// Reads the raw status of a background job.
    ///
    /// # Errors
    ///
    /// Any non-success result from the store, including an unknown or
    /// expired job.
    async fn query_scan_info(
        &self,
        policy: Option<&InfoPolicy>,
        job_id: JobId,
    ) -> Result<RawScanInfo, StoreError>;

    /// Constant the store protocol defines between its raw job status
    /// codes and the public status values.
    fn status_base_offset(&self) -> i64;
}

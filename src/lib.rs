//! Background scan jobs for a distributed key-value store client.
//!
//! This crate submits server-side "apply a UDF to every record" scans and
//! polls their progress. Submission returns as soon as the store accepts
//! the job; completion is only observable by polling with the returned
//! [`JobId`].
//!
//! # Overview
//!
//! ```text
//! ScanApplyRequest -> JobDescriptorBuilder -> JobSubmitter -> JobId
//! JobId            -> JobStatusReader                      -> StatusSnapshot
//! ```
//!
//! Both flows run through the same [`invocation`] lifecycle and report
//! failures through [`ErrorReporter`]. The store itself sits behind the
//! [`StoreClient`](store::StoreClient) trait.
//!
//! # Module Organization
//!
//! - [`client`] - The public [`Client`] with `scan_apply` / `scan_info`
//! - [`builder`] - Request validation and descriptor assembly
//! - [`submit`] - Job submission and [`JobId`]
//! - [`status`] - Status polling and [`StatusSnapshot`]
//! - [`policy`] / [`options`] - Closed-shape policy and option handling
//! - [`value`] - UDF argument conversion
//! - [`store`] - Store client seam and the in-memory store
//! - [`error`] - Error codes, records and the caller-facing error

pub mod builder;
pub mod client;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod invocation;
pub mod lease;
#[cfg(feature = "logging")]
pub mod logging;
pub mod options;
pub mod policy;
pub mod status;
pub mod store;
pub mod submit;
pub mod value;

// Re-exports for ergonomic access
pub use builder::{JobDescriptorBuilder, ScanApplyRequest};
pub use client::{Client, ClientHandle};
pub use config::{ClientConfig, ConfigError};
pub use descriptor::{JobDescriptor, ScanPriority, UdfCall};
pub use error::{ClientError, ErrorCode, ErrorRecord, ErrorReporter};
pub use options::ScanOptions;
pub use policy::{InfoPolicy, ScanPolicy};
pub use status::{JobStatusReader, RawScanInfo, ScanStatus, StatusSnapshot};
pub use store::{StoreClient, StoreError};
pub use submit::{JobId, JobSubmitter};
pub use value::{Value, ValueList};

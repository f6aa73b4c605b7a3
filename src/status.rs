//! Background job status polling.
//!
//! The store reports a job's status as a small raw code from its own
//! enumeration. Public status values sit at a fixed offset from those raw
//! codes, and that offset is defined by the store protocol
//! ([`StoreClient::status_base_offset`]). [`JobStatusReader`] adds it to
//! every snapshot it returns.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{ErrorCode, ErrorRecord};
use crate::policy::{self, InfoPolicy};
use crate::store::StoreClient;
use crate::submit::JobId;

/// Job status in the store's raw enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// The store does not know the state.
    Undefined,
    /// The job is still running.
    InProgress,
    /// The job was aborted.
    Aborted,
    /// The job finished.
    Completed,
}

impl ScanStatus {
    /// Maps a raw store code.
    ///
    /// # Examples
    ///
    /// ```
    /// use scan_jobs::ScanStatus;
    ///
    /// assert_eq!(ScanStatus::from_raw(1), Some(ScanStatus::InProgress));
    /// assert_eq!(ScanStatus::from_raw(3), Some(ScanStatus::Completed));
    /// assert_eq!(ScanStatus::from_raw(12), None);
    /// ```
    pub fn from_raw(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Undefined),
            1 => Some(Self::InProgress),
            2 => Some(Self::Aborted),
            3 => Some(Self::Completed),
            _ => None,
        }
    }

    /// The raw store code.
    pub fn raw_code(self) -> i64 {
        match self {
            Self::Undefined => 0,
            Self::InProgress => 1,
            Self::Aborted => 2,
            Self::Completed => 3,
        }
    }

    /// Returns `true` once the job can no longer progress.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Aborted | Self::Completed)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Aborted => write!(f, "aborted"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Status exactly as the store returns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawScanInfo {
    /// Percentage of the scan completed.
    pub progress_pct: u32,
    /// Records scanned so far.
    pub records_scanned: u64,
    /// Raw status code from the store's enumeration.
    pub status: i64,
}

/// Point-in-time status of a background job.
///
/// Field names are a stable output contract.
///
/// # Examples
///
/// ```
/// use scan_jobs::{RawScanInfo, StatusSnapshot};
///
/// let raw = RawScanInfo { progress_pct: 55, records_scanned: 1000, status: 1 };
/// let snapshot = StatusSnapshot::from_raw(raw, 100).unwrap();
/// assert_eq!(snapshot.status, 101);
/// assert_eq!(
///     serde_json::to_value(snapshot).unwrap(),
///     serde_json::json!({"progress_pct": 55, "records_scanned": 1000, "status": 101})
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    /// Percentage of the scan completed, 0 to 100.
    pub progress_pct: u32,
    /// Records scanned so far.
    pub records_scanned: u64,
    /// Public status value: raw code plus the store's base offset.
    pub status: i64,
}

impl StatusSnapshot {
    /// Builds a snapshot, remapping the raw status by `base_offset`.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorCode::Protocol`] record if the remapped status
    /// does not fit in an `i64`.
    pub fn from_raw(raw: RawScanInfo, base_offset: i64) -> Result<Self, ErrorRecord> {
        let status = raw.status.checked_add(base_offset).ok_or_else(|| {
            ErrorRecord::new(
                ErrorCode::Protocol,
                format!(
                    "raw status {} out of range for base offset {base_offset}",
                    raw.status
                ),
            )
        })?;
        Ok(Self {
            progress_pct: raw.progress_pct,
            records_scanned: raw.records_scanned,
            status,
        })
    }

    /// Decodes the public status back into a [`ScanStatus`].
    pub fn scan_status(&self, base_offset: i64) -> Option<ScanStatus> {
        ScanStatus::from_raw(self.status - base_offset)
    }
}

/// Reads job status snapshots from the store.
pub struct JobStatusReader<'a> {
    store: &'a dyn StoreClient,
    defaults: &'a InfoPolicy,
}

impl<'a> JobStatusReader<'a> {
    /// Creates a reader over `store`, converting caller policies on top of
    /// `defaults`.
    pub fn new(store: &'a dyn StoreClient, defaults: &'a InfoPolicy) -> Self {
        Self { store, defaults }
    }

    /// Fetches the status of `job_id`.
    ///
    /// Runs [`prepare`](Self::prepare) then [`query`](Self::query).
    pub async fn read(
        &self,
        job_id: JobId,
        policy: Option<&JsonValue>,
    ) -> Result<StatusSnapshot, ErrorRecord> {
        let policy = self.prepare(policy)?;
        self.query(job_id, policy.as_ref()).await
    }

    /// Validates and converts a caller policy. No store call is made.
    pub fn prepare(&self, policy: Option<&JsonValue>) -> Result<Option<InfoPolicy>, ErrorRecord> {
        policy::resolve::<InfoPolicy>(policy, self.defaults)
    }

    /// Queries the store once and remaps the raw status.
    ///
    /// A failed query, including an unknown or expired job, is returned
    /// immediately and never retried.
    pub async fn query(
        &self,
        job_id: JobId,
        policy: Option<&InfoPolicy>,
    ) -> Result<StatusSnapshot, ErrorRecord> {
        let raw = self
            .store
            .query_scan_info(policy, job_id)
            .await
            .map_err(|e| {
                tracing::warn!(
                    job_id = job_id.get(),
                    code = e.code,
                    error = %e.message,
                    "scan status query failed"
                );
                ErrorRecord::from(e)
            })?;

        let snapshot =
            StatusSnapshot::from_raw(raw, self.store.status_base_offset()).map_err(|e| {
                tracing::warn!(
                    job_id = job_id.get(),
                    raw_status = raw.status,
                    error = %e.message,
                    "scan status could not be remapped"
                );
                e
            })?;
        tracing::debug!(
            job_id = job_id.get(),
            progress_pct = snapshot.progress_pct,
            records_scanned = snapshot.records_scanned,
            raw_status = raw.status,
            status = snapshot.status,
            "scan status read"
        );
        Ok(snapshot)
    }
}

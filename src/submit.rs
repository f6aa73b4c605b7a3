//! Background job submission.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::descriptor::JobDescriptor;
use crate::error::ErrorRecord;
use crate::policy::ScanPolicy;
use crate::store::StoreClient;

/// Opaque, store-issued identifier of a background job.
///
/// The client keeps no registry of issued identifiers; persisting one for
/// later polling is the caller's job.
///
/// # Examples
///
/// ```
/// use scan_jobs::JobId;
///
/// let id = JobId::from(42);
/// assert_eq!(id.get(), 42);
/// assert_eq!(serde_json::to_value(id).unwrap(), 42);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct JobId(u64);

impl JobId {
    /// Wraps a raw identifier.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw identifier.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dispatches built descriptors to the store.
///
/// The submitter borrows the descriptor: releasing it stays with the
/// caller, whatever the outcome.
pub struct JobSubmitter<'a> {
    store: &'a dyn StoreClient,
}

impl<'a> JobSubmitter<'a> {
    /// Creates a submitter over `store`.
    pub fn new(store: &'a dyn StoreClient) -> Self {
        Self { store }
    }

    /// Submits `scan` for background execution and returns the job id.
    ///
    /// Returns as soon as the store accepts the job. Store failures are
    /// propagated unchanged and never retried.
    pub async fn submit(
        &self,
        policy: Option<&ScanPolicy>,
        scan: &JobDescriptor,
    ) -> Result<JobId, ErrorRecord> {
        let job_id = self
            .store
            .submit_background_scan(policy, scan)
            .await
            .map_err(|e| {
                tracing::warn!(
                    namespace = scan.namespace(),
                    set = scan.set(),
                    code = e.code,
                    error = %e.message,
                    "background scan submission failed"
                );
                ErrorRecord::from(e)
            })?;

        tracing::debug!(
            job_id = job_id.get(),
            namespace = scan.namespace(),
            set = scan.set(),
            "background scan accepted"
        );
        Ok(job_id)
    }
}

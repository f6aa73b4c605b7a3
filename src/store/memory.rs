//! In-memory store client.
//!
//! [`InMemoryStore`] keeps a job registry in a [`DashMap`] and records
//! every submission, so tests and embedders can drive job progress by
//! hand and inspect exactly what reached the store. It also supports
//! one-shot failure injection for both primitives.
//!
//! # Examples
//!
//! ```
//! use scan_jobs::store::memory::InMemoryStore;
//!
//! let store = InMemoryStore::new()
//!     .with_next_job_id(42)
//!     .with_status_base_offset(100);
//! assert_eq!(store.submit_calls(), 0);
//! assert!(store.is_empty());
//! ```

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::descriptor::{JobDescriptor, ScanPriority};
use crate::policy::{InfoPolicy, ScanPolicy};
use crate::status::{RawScanInfo, ScanStatus};
use crate::store::{StoreClient, StoreError};
use crate::submit::JobId;
use crate::value::Value;

/// What the store received for one accepted submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Identifier assigned to the job.
    pub job_id: JobId,
    /// Target namespace.
    pub namespace: String,
    /// Target set.
    pub set: String,
    /// UDF module name.
    pub module: String,
    /// UDF function name.
    pub function: String,
    /// UDF arguments, in order.
    pub args: Vec<Value>,
    /// Policy passed with the submission, if any.
    pub policy: Option<ScanPolicy>,
    /// Sampling percentage.
    pub percent: u8,
    /// Scheduling priority.
    pub priority: ScanPriority,
    /// Parallel node fan-out.
    pub concurrent: bool,
    /// Bin data omitted.
    pub no_bins: bool,
    /// When the store accepted the job.
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct JobEntry {
    info: RawScanInfo,
    updated_at: DateTime<Utc>,
}

/// In-process [`StoreClient`] with a job registry.
#[derive(Debug)]
pub struct InMemoryStore {
    next_job_id: AtomicU64,
    status_base_offset: i64,
    jobs: DashMap<u64, JobEntry>,
    submissions: Mutex<Vec<Submission>>,
    last_info_policy: Mutex<Option<InfoPolicy>>,
    submit_calls: AtomicUsize,
    status_calls: AtomicUsize,
    submit_failure: Mutex<Option<StoreError>>,
    status_failure: Mutex<Option<StoreError>>,
}

impl InMemoryStore {
    /// Creates an empty store issuing ids from 1 with a zero status offset.
    pub fn new() -> Self {
        Self {
            next_job_id: AtomicU64::new(1),
            status_base_offset: 0,
            jobs: DashMap::new(),
            submissions: Mutex::new(Vec::new()),
            last_info_policy: Mutex::new(None),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            submit_failure: Mutex::new(None),
            status_failure: Mutex::new(None),
        }
    }

    /// Sets the id the next accepted job receives.
    pub fn with_next_job_id(self, id: u64) -> Self {
        self.next_job_id.store(id, Ordering::SeqCst);
        self
    }

    /// Sets the status base offset this store reports.
    pub fn with_status_base_offset(mut self, offset: i64) -> Self {
        self.status_base_offset = offset;
        self
    }

    /// Number of jobs in the registry.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Returns `true` if the registry holds no jobs.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Registers a job directly, bypassing submission.
    pub fn insert_job(&self, job_id: JobId, info: RawScanInfo) {
        self.jobs.insert(
            job_id.get(),
            JobEntry {
                info,
                updated_at: Utc::now(),
            },
        );
    }

    /// Updates a job's progress. Returns `false` if the job is unknown.
    pub fn set_progress(
        &self,
        job_id: JobId,
        progress_pct: u32,
        records_scanned: u64,
        status: ScanStatus,
    ) -> bool {
        match self.jobs.get_mut(&job_id.get()) {
            Some(mut entry) => {
                entry.info = RawScanInfo {
                    progress_pct: progress_pct.min(100),
                    records_scanned,
                    status: status.raw_code(),
                };
                entry.updated_at = Utc::now();
                true
            },
            None => false,
        }
    }

    /// Drops a job from the registry, as the server does once a job
    /// expires.
    pub fn expire_job(&self, job_id: JobId) -> bool {
        self.jobs.remove(&job_id.get()).is_some()
    }

    /// When a job was last updated.
    pub fn last_updated(&self, job_id: JobId) -> Option<DateTime<Utc>> {
        self.jobs.get(&job_id.get()).map(|entry| entry.updated_at)
    }

    /// Makes the next submission fail with `err`.
    pub fn fail_next_submit(&self, err: StoreError) {
        *self.submit_failure.lock() = Some(err);
    }

    /// Makes the next status query fail with `err`.
    pub fn fail_next_status(&self, err: StoreError) {
        *self.status_failure.lock() = Some(err);
    }

    /// Number of submission attempts, failed ones included.
    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    /// Number of status queries, failed ones included.
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Accepted submissions, oldest first.
    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().clone()
    }

    /// Policy passed with the most recent status query.
    pub fn last_info_policy(&self) -> Option<InfoPolicy> {
        self.last_info_policy.lock().clone()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreClient for InMemoryStore {
    async fn submit_background_scan(
        &self,
        policy: Option<&ScanPolicy>,
        scan: &JobDescriptor,
    ) -> Result<JobId, StoreError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.submit_failure.lock().take() {
            return Err(err);
        }

        let call = scan
            .apply_each_call()
            .ok_or_else(|| StoreError::request_invalid("background scan requires a UDF"))?;

        let job_id = JobId::new(self.next_job_id.fetch_add(1, Ordering::SeqCst));
        let now = Utc::now();
        self.jobs.insert(
            job_id.get(),
            JobEntry {
                info: RawScanInfo {
                    progress_pct: 0,
                    records_scanned: 0,
                    status: ScanStatus::InProgress.raw_code(),
                },
                updated_at: now,
            },
        );
        self.submissions.lock().push(Submission {
            job_id,
            namespace: scan.namespace().to_string(),
            set: scan.set().to_string(),
            module: call.module().to_string(),
            function: call.function().to_string(),
            args: call.args().values().to_vec(),
            policy: policy.cloned(),
            percent: scan.percent(),
            priority: scan.priority(),
            concurrent: scan.concurrent(),
            no_bins: scan.no_bins(),
            submitted_at: now,
        });
        Ok(job_id)
    }

    async fn query_scan_info(
        &self,
        policy: Option<&InfoPolicy>,
        job_id: JobId,
    ) -> Result<RawScanInfo, StoreError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_info_policy.lock() = policy.cloned();
        if let Some(err) = self.status_failure.lock().take() {
            return Err(err);
        }

        self.jobs
            .get(&job_id.get())
            .map(|entry| entry.info)
            .ok_or_else(|| StoreError::not_found(format!("job {job_id} not found")))
    }

    fn status_base_offset(&self) -> i64 {
        self.status_base_offset
    }
}

//! The client surface: `scan_apply` and `scan_info`.
//!
//! [`Client`] wraps a [`StoreClient`] with the configuration and resource
//! ledger every call needs. Calls are independent of each other; the
//! client holds no record of issued job ids and caches no snapshots.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::builder::{JobDescriptorBuilder, ScanApplyRequest};
use crate::config::ClientConfig;
use crate::error::{ClientError, ErrorRecord};
use crate::invocation::{Invocation, Operation};
use crate::lease::ResourceLedger;
use crate::status::{JobStatusReader, StatusSnapshot};
use crate::store::StoreClient;
use crate::submit::{JobId, JobSubmitter};

/// Configuration, resource ledger and open/closed state of a client.
#[derive(Debug)]
pub struct ClientHandle {
    config: ClientConfig,
    ledger: ResourceLedger,
    open: AtomicBool,
}

impl ClientHandle {
    /// Creates an open handle.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            ledger: ResourceLedger::new(),
            open: AtomicBool::new(true),
        }
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The ledger every per-call resource leases from.
    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    /// Returns `true` until [`close`](Self::close) is called.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Invalidates the handle. Later calls fail with an invalid-param
    /// error.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    fn ensure_open(&self) -> Result<(), ErrorRecord> {
        if self.is_open() {
            Ok(())
        } else {
            Err(ErrorRecord::invalid_param("invalid client object"))
        }
    }
}

/// Submits background scans and polls their status.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use scan_jobs::store::memory::InMemoryStore;
/// use scan_jobs::{Client, JobId, ScanApplyRequest};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = Arc::new(InMemoryStore::new().with_next_job_id(42).with_status_base_offset(100));
/// let client = Client::new(store);
///
/// let job = client
///     .scan_apply(&ScanApplyRequest::new("test", "demo", "mod", "fn"))
///     .await
///     .unwrap();
/// assert_eq!(job, JobId::new(42));
///
/// let snapshot = client.scan_info(job, None).await.unwrap();
/// assert_eq!(snapshot.status, 101);
/// # }
/// ```
pub struct Client {
    handle: ClientHandle,
    store: Arc<dyn StoreClient>,
}

impl Client {
    /// Creates a client with the default configuration.
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        Self::with_config(store, ClientConfig::default())
    }

    /// Creates a client with `config`.
    pub fn with_config(store: Arc<dyn StoreClient>, config: ClientConfig) -> Self {
        Self {
            handle: ClientHandle::new(config),
            store,
        }
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        self.handle.config()
    }

    /// Acquire/release counters for per-call resources.
    pub fn ledger(&self) -> &ResourceLedger {
        self.handle.ledger()
    }

    /// Returns `true` until [`close`](Self::close) is called.
    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    /// Invalidates the client. Submitted jobs keep running on the store.
    pub fn close(&self) {
        tracing::debug!("client closed");
        self.handle.close();
    }

    /// Starts a background scan that applies a UDF to every record of a
    /// namespace/set, and returns the store-issued job id.
    ///
    /// Returns once the store has accepted the job. Poll progress with
    /// [`scan_info`](Self::scan_info).
    ///
    /// # Errors
    ///
    /// The first failure of the call: invalid parameters, a rejected
    /// policy or options object, an argument conversion failure, or the
    /// store's own error.
    pub async fn scan_apply(&self, request: &ScanApplyRequest) -> Result<JobId, ClientError> {
        let mut invocation = Invocation::start(Operation::ScanApply);
        let outcome = self.submit(&mut invocation, request).await;
        invocation.finish(outcome)
    }

    /// Reads the status of a background job.
    ///
    /// Makes exactly one store query; nothing is retried.
    ///
    /// # Errors
    ///
    /// Invalid parameters, a rejected policy, or the store's error
    /// (including an unknown or expired job).
    pub async fn scan_info(
        &self,
        job_id: JobId,
        policy: Option<&JsonValue>,
    ) -> Result<StatusSnapshot, ClientError> {
        let mut invocation = Invocation::start(Operation::ScanInfo);
        let outcome = self.query(&mut invocation, job_id, policy).await;
        invocation.finish(outcome)
    }

    async fn submit(
        &self,
        invocation: &mut Invocation,
        request: &ScanApplyRequest,
    ) -> Result<JobId, ErrorRecord> {
        let scan = JobDescriptorBuilder::new(&self.handle).build(invocation, request)?;
        JobSubmitter::new(self.store.as_ref())
            .submit(scan.policy(), &scan)
            .await
    }

    async fn query(
        &self,
        invocation: &mut Invocation,
        job_id: JobId,
        policy: Option<&JsonValue>,
    ) -> Result<StatusSnapshot, ErrorRecord> {
        self.handle.ensure_open()?;
        let reader = JobStatusReader::new(self.store.as_ref(), &self.handle.config().info_policy);
        let policy = reader.prepare(policy)?;
        invocation.begin_work();
        reader.query(job_id, policy.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::store::memory::InMemoryStore;
    use serde_json::json;

    fn client() -> (Arc<InMemoryStore>, Client) {
        let store = Arc::new(InMemoryStore::new());
        let client = Client::new(store.clone());
        (store, client)
    }

    #[tokio::test]
    async fn closed_client_rejects_both_operations() {
        let (store, client) = client();
        client.close();
        assert!(!client.is_open());

        let err = client
            .scan_apply(&ScanApplyRequest::new("test", "demo", "mod", "fn"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParam);
        assert_eq!(err.message, "invalid client object");

        let err = client.scan_info(JobId::new(1), None).await.unwrap_err();
        assert_eq!(err.message, "invalid client object");

        assert_eq!(store.submit_calls(), 0);
        assert_eq!(store.status_calls(), 0);
    }

    #[tokio::test]
    async fn submitted_policy_reaches_store() {
        let (store, client) = client();
        client
            .scan_apply(
                &ScanApplyRequest::new("test", "demo", "mod", "fn")
                    .with_policy(json!({"timeout": 750})),
            )
            .await
            .unwrap();
        let submissions = store.submissions();
        assert_eq!(submissions[0].policy.as_ref().unwrap().timeout_ms, 750);
    }

    #[tokio::test]
    async fn absent_policy_passes_none() {
        let (store, client) = client();
        client
            .scan_apply(&ScanApplyRequest::new("test", "demo", "mod", "fn"))
            .await
            .unwrap();
        assert!(store.submissions()[0].policy.is_none());
        assert_eq!(client.ledger().outstanding(), 0);
    }

    #[tokio::test]
    async fn config_defaults_feed_policy_conversion() {
        let store = Arc::new(InMemoryStore::new());
        let config = ClientConfig::default().with_scan_policy(crate::ScanPolicy {
            timeout_ms: 9000,
            fail_on_cluster_change: true,
        });
        let client = Client::with_config(store.clone(), config);
        client
            .scan_apply(
                &ScanApplyRequest::new("test", "demo", "mod", "fn")
                    .with_policy(json!({"fail_on_cluster_change": false})),
            )
            .await
            .unwrap();
        let policy = store.submissions()[0].policy.clone().unwrap();
        assert_eq!(policy.timeout_ms, 9000);
        assert!(!policy.fail_on_cluster_change);
    }
}

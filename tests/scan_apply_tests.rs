//! Integration tests for background scan submission.
//!
//! Tests cover parameter validation ordering, policy and option handling,
//! argument conversion, store failures, and resource release on every
//! exit path. Organized into module blocks per concern.

use std::sync::Arc;

use scan_jobs::store::memory::InMemoryStore;
use scan_jobs::store::StoreError;
use scan_jobs::{Client, ErrorCode, JobId, ScanApplyRequest, ScanPriority, Value};
use serde_json::json;

fn setup() -> (Arc<InMemoryStore>, Client) {
    let store = Arc::new(InMemoryStore::new().with_next_job_id(42));
    let client = Client::new(store.clone());
    (store, client)
}

fn request() -> ScanApplyRequest {
    ScanApplyRequest::new("test", "demo", "mod", "fn")
}

// ─── Submission ─────────────────────────────────────────────────────────────

mod submission_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_empty_args_returns_store_id() {
        let (store, client) = setup();
        let id = client.scan_apply(&request()).await.unwrap();
        assert_eq!(id, JobId::new(42));
        assert_eq!(store.submit_calls(), 1);
        let submissions = store.submissions();
        assert_eq!(submissions[0].args, Vec::<Value>::new());
    }

    #[tokio::test]
    async fn test_args_reach_store_in_order() {
        let (store, client) = setup();
        client
            .scan_apply(&request().with_args(json!([3, "b", [1, 2], {"k": false}, null, 1.5])))
            .await
            .unwrap();
        let submissions = store.submissions();
        assert_eq!(
            submissions[0].args,
            vec![
                Value::Integer(3),
                Value::String("b".to_string()),
                Value::List(vec![Value::Integer(1), Value::Integer(2)]),
                Value::Map(vec![("k".to_string(), Value::Bool(false))]),
                Value::Nil,
                Value::Float(1.5),
            ]
        );
    }

    #[tokio::test]
    async fn test_descriptor_fields_reach_store() {
        let (store, client) = setup();
        client
            .scan_apply(
                &request()
                    .with_policy(json!({"timeout": 1500, "fail_on_cluster_change": true}))
                    .with_options(
                        json!({"percent": 30, "priority": 2, "concurrent": true, "nobins": true}),
                    ),
            )
            .await
            .unwrap();
        let submissions = store.submissions();
        let sub = &submissions[0];
        assert_eq!(sub.namespace, "test");
        assert_eq!(sub.set, "demo");
        assert_eq!(sub.module, "mod");
        assert_eq!(sub.function, "fn");
        assert_eq!(sub.percent, 30);
        assert_eq!(sub.priority, ScanPriority::Medium);
        assert!(sub.concurrent);
        assert!(sub.no_bins);
        let policy = sub.policy.clone().unwrap();
        assert_eq!(policy.timeout_ms, 1500);
        assert!(policy.fail_on_cluster_change);
    }

    #[tokio::test]
    async fn test_each_submission_gets_new_id() {
        let (_store, client) = setup();
        let first = client.scan_apply(&request()).await.unwrap();
        let second = client.scan_apply(&request()).await.unwrap();
        assert_eq!(first, JobId::new(42));
        assert_eq!(second, JobId::new(43));
    }

    #[tokio::test]
    async fn test_submission_does_not_wait_for_completion() {
        let (store, client) = setup();
        let id = client.scan_apply(&request()).await.unwrap();
        let snapshot = client.scan_info(id, None).await.unwrap();
        assert_eq!(snapshot.progress_pct, 0);
        assert_eq!(store.status_calls(), 1);
    }

    #[tokio::test]
    async fn test_request_decoded_from_json() {
        let (store, client) = setup();
        let request: ScanApplyRequest = serde_json::from_value(json!({
            "ns": "test",
            "set": "demo",
            "module": "mod",
            "function": "fn",
            "args": [7],
            "options": {"percent": 5}
        }))
        .unwrap();
        client.scan_apply(&request).await.unwrap();
        let submissions = store.submissions();
        assert_eq!(submissions[0].args, vec![Value::Integer(7)]);
        assert_eq!(submissions[0].percent, 5);
    }
}

// ─── Parameter Validation ───────────────────────────────────────────────────

mod validation_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_each_empty_name_is_invalid_param() {
        let cases = [
            ScanApplyRequest::new("", "demo", "mod", "fn"),
            ScanApplyRequest::new("test", "", "mod", "fn"),
            ScanApplyRequest::new("test", "demo", "", "fn"),
            ScanApplyRequest::new("test", "demo", "mod", ""),
        ];
        for case in cases {
            let (store, client) = setup();
            let err = client.scan_apply(&case).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidParam);
            assert_eq!(err.message, "parameter should not be null");
            assert_eq!(err.result_code, -2);
            assert_eq!(store.submit_calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_non_list_args_is_invalid_param() {
        for args in [json!(1), json!("x"), json!({"a": 1}), json!(true)] {
            let (store, client) = setup();
            let err = client
                .scan_apply(&request().with_args(args))
                .await
                .unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidParam);
            assert_eq!(err.message, "arguments should be a list");
            assert_eq!(store.submit_calls(), 0);
            assert_eq!(client.ledger().acquired(), 0);
        }
    }

    #[tokio::test]
    async fn test_null_check_precedes_args_check() {
        let (_store, client) = setup();
        let err = client
            .scan_apply(&ScanApplyRequest::new("", "demo", "mod", "fn").with_args(json!(5)))
            .await
            .unwrap_err();
        assert_eq!(err.message, "parameter should not be null");
    }

    #[tokio::test]
    async fn test_policy_rejected_before_options() {
        let (store, client) = setup();
        let err = client
            .scan_apply(
                &request()
                    .with_policy(json!({"timeout": "never"}))
                    .with_options(json!({"percent": 1000})),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
        assert!(err.message.contains("scan policy"));
        assert_eq!(store.submit_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_option_rejected() {
        let (store, client) = setup();
        let err = client
            .scan_apply(&request().with_options(json!({"fanout": 8})))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(store.submit_calls(), 0);
    }

    #[tokio::test]
    async fn test_unconvertible_args_rejected() {
        let (store, client) = setup();
        let err = client
            .scan_apply(&request().with_args(json!([1, u64::MAX])))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conversion);
        assert_eq!(err.result_code, -1);
        assert_eq!(store.submit_calls(), 0);
    }

    #[tokio::test]
    async fn test_overlong_udf_name_cannot_attach() {
        let (store, client) = setup();
        let err = client
            .scan_apply(&ScanApplyRequest::new("test", "demo", "m".repeat(64), "fn"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParam);
        assert_eq!(err.message, "unable to apply UDF on the scan");
        assert_eq!(store.submit_calls(), 0);
    }
}

// ─── Store Failures ─────────────────────────────────────────────────────────

mod store_failure_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_store_error_propagated_unchanged() {
        let (store, client) = setup();
        store.fail_next_submit(StoreError::new(11, "partition unavailable"));
        let err = client.scan_apply(&request()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Store(11));
        assert_eq!(err.result_code, 11);
        assert_eq!(err.message, "partition unavailable");
        assert!(!err.is_client_side());
    }

    #[tokio::test]
    async fn test_store_rejection_is_protocol_error() {
        let (store, client) = setup();
        store.fail_next_submit(StoreError::request_invalid("malformed scan"));
        let err = client.scan_apply(&request()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Protocol);
        assert_eq!(err.result_code, 4);
        assert_eq!(err.message, "malformed scan");
        assert!(!err.is_client_side());
    }

    #[tokio::test]
    async fn test_store_failure_not_retried() {
        let (store, client) = setup();
        store.fail_next_submit(StoreError::timeout("accept timed out"));
        assert!(client.scan_apply(&request()).await.is_err());
        assert_eq!(store.submit_calls(), 1);
        assert!(store.is_empty());
    }
}

// ─── Resource Release ───────────────────────────────────────────────────────

mod resource_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn assert_no_leak(client: &Client, request: ScanApplyRequest) {
        let _ = client.scan_apply(&request).await;
        assert_eq!(
            client.ledger().outstanding(),
            0,
            "leaked resources for {request:?}"
        );
    }

    #[tokio::test]
    async fn test_success_path_releases_everything() {
        let (_store, client) = setup();
        client
            .scan_apply(&request().with_args(json!([1, 2, 3])))
            .await
            .unwrap();
        assert_eq!(client.ledger().acquired(), 2);
        assert_eq!(client.ledger().outstanding(), 0);
    }

    #[tokio::test]
    async fn test_every_failure_after_init_releases_everything() {
        let (store, client) = setup();
        assert_no_leak(&client, request().with_policy(json!({"bogus": 1}))).await;
        assert_no_leak(&client, request().with_options(json!({"percent": 101}))).await;
        assert_no_leak(&client, request().with_args(json!([u64::MAX]))).await;
        assert_no_leak(
            &client,
            ScanApplyRequest::new("test", "demo", "mod", "f".repeat(100)).with_args(json!([1])),
        )
        .await;
        store.fail_next_submit(StoreError::server("boom"));
        assert_no_leak(&client, request().with_args(json!(["x"]))).await;
        assert!(client.ledger().acquired() > 0);
    }
}

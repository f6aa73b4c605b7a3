//! Per-operation policies and the validate-then-convert pipeline.
//!
//! Caller policies arrive as loosely-typed JSON objects. [`validate`]
//! checks the shape against a closed set of recognised keys and rejects
//! unknown or mistyped fields. [`convert`] then overlays the validated
//! fields onto the client's configured defaults. The two steps always run
//! in that order, for both scan and info policies.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::ErrorRecord;

/// A policy type with a closed caller-facing shape.
pub trait Policy: Clone {
    /// The validated caller shape. Every field is optional.
    type Input: DeserializeOwned;

    /// Name used in error messages.
    const NAME: &'static str;

    /// Overlays validated caller fields onto `self`.
    fn overlay(self, input: Self::Input) -> Self;
}

/// Policy for submitting a background scan.
///
/// # Examples
///
/// ```
/// use scan_jobs::ScanPolicy;
///
/// let policy = ScanPolicy::default();
/// assert_eq!(policy.timeout_ms, 0);
/// assert!(!policy.fail_on_cluster_change);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanPolicy {
    /// Total transaction timeout in milliseconds. `0` means no limit.
    pub timeout_ms: u32,
    /// Abort the scan if the cluster changes while it runs.
    pub fail_on_cluster_change: bool,
}

/// Caller-facing scan policy shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanPolicyInput {
    /// Timeout in milliseconds.
    pub timeout: Option<u32>,
    /// See [`ScanPolicy::fail_on_cluster_change`].
    pub fail_on_cluster_change: Option<bool>,
}

impl Policy for ScanPolicy {
    type Input = ScanPolicyInput;
    const NAME: &'static str = "scan policy";

    fn overlay(mut self, input: ScanPolicyInput) -> Self {
        if let Some(timeout) = input.timeout {
            self.timeout_ms = timeout;
        }
        if let Some(fail) = input.fail_on_cluster_change {
            self.fail_on_cluster_change = fail;
        }
        self
    }
}

/// Policy for info requests such as job status queries.
///
/// # Examples
///
/// ```
/// use scan_jobs::InfoPolicy;
///
/// let policy = InfoPolicy::default();
/// assert_eq!(policy.timeout_ms, 1000);
/// assert!(policy.send_as_is);
/// assert!(policy.check_bounds);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoPolicy {
    /// Request timeout in milliseconds.
    pub timeout_ms: u32,
    /// Send the request without appending a trailing newline.
    pub send_as_is: bool,
    /// Verify the request size before sending.
    pub check_bounds: bool,
}

impl Default for InfoPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: 1000,
            send_as_is: true,
            check_bounds: true,
        }
    }
}

/// Caller-facing info policy shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InfoPolicyInput {
    /// Timeout in milliseconds.
    pub timeout: Option<u32>,
    /// See [`InfoPolicy::send_as_is`].
    pub send_as_is: Option<bool>,
    /// See [`InfoPolicy::check_bounds`].
    pub check_bounds: Option<bool>,
}

impl Policy for InfoPolicy {
    type Input = InfoPolicyInput;
    const NAME: &'static str = "info policy";

    fn overlay(mut self, input: InfoPolicyInput) -> Self {
        if let Some(timeout) = input.timeout {
            self.timeout_ms = timeout;
        }
        if let Some(send_as_is) = input.send_as_is {
            self.send_as_is = send_as_is;
        }
        if let Some(check_bounds) = input.check_bounds {
            self.check_bounds = check_bounds;
        }
        self
    }
}

/// Checks a raw policy against the closed shape of `P`.
///
/// # Errors
///
/// Returns an [`ErrorCode::Validation`](crate::ErrorCode::Validation)
/// record if `raw` is not an object or carries an unknown or mistyped
/// field.
///
/// # Examples
///
/// ```
/// use scan_jobs::policy::{validate, ScanPolicyInput};
/// use scan_jobs::ScanPolicy;
/// use serde_json::json;
///
/// let input = validate::<ScanPolicy>(&json!({"timeout": 250})).unwrap();
/// assert_eq!(input, ScanPolicyInput { timeout: Some(250), fail_on_cluster_change: None });
///
/// assert!(validate::<ScanPolicy>(&json!({"retries": 3})).is_err());
/// assert!(validate::<ScanPolicy>(&json!("fast")).is_err());
/// ```
pub fn validate<P: Policy>(raw: &JsonValue) -> Result<P::Input, ErrorRecord> {
    if !raw.is_object() {
        return Err(ErrorRecord::validation(format!(
            "{} should be an object",
            P::NAME
        )));
    }
    serde_json::from_value(raw.clone()).map_err(|e| {
        tracing::warn!(policy = P::NAME, error = %e, "rejected policy");
        ErrorRecord::validation(format!("invalid {}: {e}", P::NAME))
    })
}

/// Converts a validated policy into its internal form, starting from
/// `defaults`.
pub fn convert<P: Policy>(input: P::Input, defaults: &P) -> P {
    defaults.clone().overlay(input)
}

/// Runs [`validate`] then [`convert`] on an optional caller policy.
///
/// `None` stays `None`, leaving the store's own default in effect.
pub fn resolve<P: Policy>(raw: Option<&JsonValue>, defaults: &P) -> Result<Option<P>, ErrorRecord> {
    raw.map(|raw| validate::<P>(raw).map(|input| convert(input, defaults)))
        .transpose()
}

//! Job descriptor assembly.
//!
//! [`JobDescriptorBuilder`] turns a [`ScanApplyRequest`] into a validated
//! [`JobDescriptor`]. The builder owns every intermediate resource while
//! it works. If any step fails, dropping the builder releases the
//! descriptor and any argument list not yet handed to it. The argument
//! list moves into the descriptor on attach, so no resource is ever
//! released twice.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::client::ClientHandle;
use crate::descriptor::JobDescriptor;
use crate::error::ErrorRecord;
use crate::invocation::Invocation;
use crate::options::apply_options;
use crate::policy::{self, ScanPolicy};
use crate::value::{to_internal_list, ValueList};

/// Caller input for a background scan.
///
/// [`ScanApplyRequest::new`] starts with an empty argument list. Requests
/// can also be decoded from JSON, where `args` is required and `ns` is
/// accepted as an alias for `namespace`.
///
/// # Examples
///
/// ```
/// use scan_jobs::ScanApplyRequest;
/// use serde_json::json;
///
/// let request = ScanApplyRequest::new("test", "demo", "mod", "fn")
///     .with_args(json!([1, 2]))
///     .with_options(json!({"percent": 50}));
/// assert_eq!(request.args, json!([1, 2]));
///
/// let decoded: ScanApplyRequest = serde_json::from_value(json!({
///     "ns": "test", "set": "demo", "module": "mod", "function": "fn", "args": []
/// }))
/// .unwrap();
/// assert_eq!(decoded.namespace, "test");
/// assert_eq!(decoded.args, json!([]));
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScanApplyRequest {
    /// Namespace to scan.
    #[serde(alias = "ns")]
    pub namespace: String,
    /// Set to scan.
    pub set: String,
    /// UDF module name.
    pub module: String,
    /// UDF function name.
    pub function: String,
    /// UDF arguments; must be a JSON array.
    pub args: JsonValue,
    /// Optional scan policy object.
    #[serde(default)]
    pub policy: Option<JsonValue>,
    /// Optional scan options object.
    #[serde(default)]
    pub options: Option<JsonValue>,
}

fn empty_args() -> JsonValue {
    JsonValue::Array(Vec::new())
}

impl ScanApplyRequest {
    /// Creates a request with no arguments, policy or options.
    pub fn new(
        namespace: impl Into<String>,
        set: impl Into<String>,
        module: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            set: set.into(),
            module: module.into(),
            function: function.into(),
            args: empty_args(),
            policy: None,
            options: None,
        }
    }

    /// Sets the UDF arguments.
    pub fn with_args(mut self, args: JsonValue) -> Self {
        self.args = args;
        self
    }

    /// Sets the scan policy.
    pub fn with_policy(mut self, policy: JsonValue) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Sets the scan options.
    pub fn with_options(mut self, options: JsonValue) -> Self {
        self.options = Some(options);
        self
    }
}

/// Builds one [`JobDescriptor`] per submission.
pub struct JobDescriptorBuilder<'a> {
    handle: &'a ClientHandle,
    descriptor: Option<JobDescriptor>,
    args: Option<ValueList>,
}

impl<'a> JobDescriptorBuilder<'a> {
    /// Creates a builder bound to a client handle.
    pub fn new(handle: &'a ClientHandle) -> Self {
        Self {
            handle,
            descriptor: None,
            args: None,
        }
    }

    /// Whether the descriptor has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.descriptor.is_some()
    }

    /// Validates `request` and assembles the descriptor.
    ///
    /// Checks, in order: the client handle is open; namespace, set, module
    /// and function are non-empty; `args` is a list. Then converts the
    /// policy (validate, then convert), applies options, converts the
    /// arguments and attaches the UDF. The first failure wins.
    pub fn build(
        mut self,
        invocation: &mut Invocation,
        request: &ScanApplyRequest,
    ) -> Result<JobDescriptor, ErrorRecord> {
        self.check_preconditions(request)?;
        invocation.begin_work();
        self.assemble(request)?;
        self.descriptor
            .take()
            .ok_or_else(|| ErrorRecord::invalid_param("unable to apply UDF on the scan"))
    }

    fn check_preconditions(&self, request: &ScanApplyRequest) -> Result<(), ErrorRecord> {
        if !self.handle.is_open() {
            return Err(ErrorRecord::invalid_param("invalid client object"));
        }
        let required = [
            &request.namespace,
            &request.set,
            &request.module,
            &request.function,
        ];
        if required.iter().any(|field| field.is_empty()) {
            return Err(ErrorRecord::invalid_param("parameter should not be null"));
        }
        if !request.args.is_array() {
            return Err(ErrorRecord::invalid_param("arguments should be a list"));
        }
        Ok(())
    }

    fn assemble(&mut self, request: &ScanApplyRequest) -> Result<(), ErrorRecord> {
        let handle = self.handle;
        let config = handle.config();
        let ledger = handle.ledger();

        let descriptor = self
            .descriptor
            .insert(JobDescriptor::new(&request.namespace, &request.set, ledger));

        let policy = policy::resolve::<ScanPolicy>(request.policy.as_ref(), &config.scan_policy)?;
        descriptor.set_policy(policy);

        if let Some(options) = &request.options {
            apply_options(descriptor, options)?;
        }

        self.args = Some(to_internal_list(
            &request.args,
            &config.conversion_limits(),
            ledger,
        )?);

        if let Some(args) = self.args.take() {
            if let Err(rejected) = descriptor.apply_each(&request.module, &request.function, args) {
                self.args = Some(rejected);
                return Err(ErrorRecord::invalid_param("unable to apply UDF on the scan"));
            }
        }
        Ok(())
    }
}

impl Drop for JobDescriptorBuilder<'_> {
    fn drop(&mut self) {
        if self.descriptor.is_some() || self.args.is_some() {
            tracing::trace!(
                descriptor = self.descriptor.is_some(),
                args = self.args.is_some(),
                "releasing untransferred scan resources"
            );
        }
    }
}

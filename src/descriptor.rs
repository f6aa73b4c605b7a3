//! The scan job descriptor.
//!
//! A [`JobDescriptor`] describes one background scan: the namespace and set
//! to walk, sampling and fan-out options, the optional execution policy,
//! and the apply-each [`UdfCall`]. It lives for exactly one submission
//! call and releases its [`Lease`] (and the attached argument list) when
//! dropped.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::lease::{Lease, ResourceKind, ResourceLedger};
use crate::policy::ScanPolicy;
use crate::value::ValueList;

/// Longest UDF module or function name the store accepts, in bytes.
pub const UDF_NAME_MAX_LEN: usize = 63;

/// Store-side scheduling priority of a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanPriority {
    /// Let the store decide.
    #[default]
    Auto,
    /// Low priority.
    Low,
    /// Medium priority.
    Medium,
    /// High priority.
    High,
}

impl ScanPriority {
    /// Maps the store's numeric priority code.
    ///
    /// # Examples
    ///
    /// ```
    /// use scan_jobs::ScanPriority;
    ///
    /// assert_eq!(ScanPriority::from_code(2), Some(ScanPriority::Medium));
    /// assert_eq!(ScanPriority::from_code(7), None);
    /// ```
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Auto),
            1 => Some(Self::Low),
            2 => Some(Self::Medium),
            3 => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for ScanPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// A UDF applied to every record of the scan.
#[derive(Debug, Clone, PartialEq)]
pub struct UdfCall {
    module: String,
    function: String,
    args: ValueList,
}

impl UdfCall {
    /// UDF module name.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// UDF function name.
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Arguments passed to the function.
    pub fn args(&self) -> &ValueList {
        &self.args
    }
}

/// Description of one background scan job.
#[derive(Debug)]
pub struct JobDescriptor {
    namespace: String,
    set: String,
    percent: u8,
    priority: ScanPriority,
    concurrent: bool,
    no_bins: bool,
    policy: Option<ScanPolicy>,
    apply_each: Option<UdfCall>,
    _lease: Lease,
}

impl JobDescriptor {
    /// Creates an empty descriptor bound to `namespace` and `set`.
    pub fn new(
        namespace: impl Into<String>,
        set: impl Into<String>,
        ledger: &ResourceLedger,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            set: set.into(),
            percent: 100,
            priority: ScanPriority::Auto,
            concurrent: false,
            no_bins: false,
            policy: None,
            apply_each: None,
            _lease: ledger.acquire(ResourceKind::Descriptor),
        }
    }

    /// Target namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Target set.
    pub fn set(&self) -> &str {
        &self.set
    }

    /// Percentage of records to sample.
    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// Scheduling priority.
    pub fn priority(&self) -> ScanPriority {
        self.priority
    }

    /// Whether nodes are scanned in parallel.
    pub fn concurrent(&self) -> bool {
        self.concurrent
    }

    /// Whether bin data is omitted.
    pub fn no_bins(&self) -> bool {
        self.no_bins
    }

    /// Execution policy, if the caller supplied one.
    pub fn policy(&self) -> Option<&ScanPolicy> {
        self.policy.as_ref()
    }

    /// The apply-each directive, once attached.
    pub fn apply_each_call(&self) -> Option<&UdfCall> {
        self.apply_each.as_ref()
    }

    /// Sets the sampling percentage. Returns `false` if above 100.
    pub fn set_percent(&mut self, percent: u8) -> bool {
        if percent > 100 {
            return false;
        }
        self.percent = percent;
        true
    }

    /// Sets the scheduling priority.
    pub fn set_priority(&mut self, priority: ScanPriority) {
        self.priority = priority;
    }

    /// Sets whether nodes are scanned in parallel.
    pub fn set_concurrent(&mut self, concurrent: bool) {
        self.concurrent = concurrent;
    }

    /// Sets whether bin data is omitted.
    pub fn set_no_bins(&mut self, no_bins: bool) {
        self.no_bins = no_bins;
    }

    /// Sets the execution policy.
    pub fn set_policy(&mut self, policy: Option<ScanPolicy>) {
        self.policy = policy;
    }

    /// Attaches a UDF to run on every record, taking ownership of `args`.
    ///
    /// On rejection the argument list is handed back so the caller
    /// decides when it is released. Rejected when a directive is already
    /// attached or a name is empty or longer than [`UDF_NAME_MAX_LEN`].
    pub fn apply_each(
        &mut self,
        module: &str,
        function: &str,
        args: ValueList,
    ) -> Result<(), ValueList> {
        let name_ok = |name: &str| !name.is_empty() && name.len() <= UDF_NAME_MAX_LEN;
        if self.apply_each.is_some() || !name_ok(module) || !name_ok(function) {
            return Err(args);
        }
        self.apply_each = Some(UdfCall {
            module: module.to_string(),
            function: function.to_string(),
            args,
        });
        Ok(())
    }
}

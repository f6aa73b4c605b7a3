//! Client configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::{InfoPolicy, ScanPolicy};
use crate::value::ConversionLimits;

/// Errors loading a [`ClientConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("invalid client configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of range.
    #[error("invalid client configuration: {field} {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Defaults and limits applied by a [`Client`](crate::Client).
///
/// Caller policies are overlaid on `scan_policy` / `info_policy`.
///
/// # Defaults
///
/// | Setting         | Default                  |
/// |-----------------|--------------------------|
/// | `scan_policy`   | no timeout, keep running on cluster change |
/// | `info_policy`   | 1000 ms, send as-is, check bounds |
/// | `max_arg_depth` | 10                       |
/// | `max_args`      | 1024                     |
///
/// # Examples
///
/// ```
/// use scan_jobs::ClientConfig;
///
/// let config = ClientConfig::from_toml_str(
///     r#"
///     max_args = 16
///
///     [info_policy]
///     timeout_ms = 250
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.max_args, 16);
/// assert_eq!(config.max_arg_depth, 10);
/// assert_eq!(config.info_policy.timeout_ms, 250);
/// assert!(config.info_policy.check_bounds);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Baseline for converted scan policies.
    pub scan_policy: ScanPolicy,
    /// Baseline for converted info policies.
    pub info_policy: InfoPolicy,
    /// Maximum nesting depth inside a UDF argument.
    pub max_arg_depth: usize,
    /// Maximum number of UDF arguments.
    pub max_args: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let limits = ConversionLimits::default();
        Self {
            scan_policy: ScanPolicy::default(),
            info_policy: InfoPolicy::default(),
            max_arg_depth: limits.max_depth,
            max_args: limits.max_args,
        }
    }
}

impl ClientConfig {
    /// Parses a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the scan policy baseline.
    pub fn with_scan_policy(mut self, policy: ScanPolicy) -> Self {
        self.scan_policy = policy;
        self
    }

    /// Sets the info policy baseline.
    pub fn with_info_policy(mut self, policy: InfoPolicy) -> Self {
        self.info_policy = policy;
        self
    }

    /// Sets the maximum argument nesting depth.
    pub fn with_max_arg_depth(mut self, depth: usize) -> Self {
        self.max_arg_depth = depth;
        self
    }

    /// Sets the maximum number of arguments.
    pub fn with_max_args(mut self, max: usize) -> Self {
        self.max_args = max;
        self
    }

    /// Limits for UDF argument conversion.
    pub fn conversion_limits(&self) -> ConversionLimits {
        ConversionLimits {
            max_depth: self.max_arg_depth,
            max_args: self.max_args,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_arg_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "max_arg_depth",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

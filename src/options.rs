//! Scan execution options.
//!
//! Options are a closed set of keys: `percent`, `priority`, `concurrent`
//! and `nobins`. Anything else, or a value of the wrong type or range, is
//! a validation error.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::descriptor::{JobDescriptor, ScanPriority};
use crate::error::ErrorRecord;

/// Caller-supplied scan options after validation.
///
/// # Examples
///
/// ```
/// use scan_jobs::{ScanOptions, ScanPriority};
/// use serde_json::json;
///
/// let options = ScanOptions::parse(&json!({"percent": 25, "priority": 3})).unwrap();
/// assert_eq!(options.percent, Some(25));
/// assert_eq!(options.priority, Some(ScanPriority::High));
/// assert!(ScanOptions::parse(&json!({"percent": 101})).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Percentage of records to sample, 0 to 100.
    pub percent: Option<u8>,
    /// Scheduling priority.
    pub priority: Option<ScanPriority>,
    /// Scan all nodes in parallel.
    pub concurrent: Option<bool>,
    /// Omit bin data.
    pub nobins: Option<bool>,
}

/// Caller-facing options shape. `priority` is the numeric code, see
/// [`ScanPriority::from_code`].
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScanOptionsInput {
    percent: Option<u8>,
    priority: Option<i64>,
    concurrent: Option<bool>,
    nobins: Option<bool>,
}

impl ScanOptions {
    /// Validates a raw options object.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorCode::Validation`](crate::ErrorCode::Validation)
    /// record for a non-object, an unknown key, a mistyped value, a percent
    /// above 100 or an unknown priority code.
    pub fn parse(raw: &JsonValue) -> Result<Self, ErrorRecord> {
        if !raw.is_object() {
            return Err(ErrorRecord::validation("scan options should be an object"));
        }
        let input: ScanOptionsInput = serde_json::from_value(raw.clone()).map_err(|e| {
            tracing::warn!(error = %e, "rejected scan options");
            ErrorRecord::validation(format!("invalid scan options: {e}"))
        })?;

        if let Some(percent) = input.percent {
            if percent > 100 {
                return Err(ErrorRecord::validation(format!(
                    "percent must be between 0 and 100, got {percent}"
                )));
            }
        }
        let priority = input
            .priority
            .map(|code| {
                ScanPriority::from_code(code).ok_or_else(|| {
                    ErrorRecord::validation(format!("unknown scan priority {code}"))
                })
            })
            .transpose()?;

        Ok(Self {
            percent: input.percent,
            priority,
            concurrent: input.concurrent,
            nobins: input.nobins,
        })
    }

    /// Applies the options to `scan`.
    pub fn apply_to(&self, scan: &mut JobDescriptor) {
        if let Some(percent) = self.percent {
            let accepted = scan.set_percent(percent);
            debug_assert!(accepted, "unvalidated percent {percent}");
        }
        if let Some(priority) = self.priority {
            scan.set_priority(priority);
        }
        if let Some(concurrent) = self.concurrent {
            scan.set_concurrent(concurrent);
        }
        if let Some(no_bins) = self.nobins {
            scan.set_no_bins(no_bins);
        }
    }
}

/// Validates raw options and applies them to `scan`.
///
/// Nothing is applied unless the whole object is valid.
pub fn apply_options(scan: &mut JobDescriptor, raw: &JsonValue) -> Result<(), ErrorRecord> {
    ScanOptions::parse(raw)?.apply_to(scan);
    Ok(())
}

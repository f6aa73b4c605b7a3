//! Internal value model for UDF arguments.
//!
//! Caller-supplied arguments arrive as loosely-typed [`serde_json::Value`]s
//! and are converted by [`to_internal_list`] into a [`ValueList`], the
//! ordered argument list that travels with the scan's apply-each directive.

use serde_json::Value as JsonValue;

use crate::error::ErrorRecord;
use crate::lease::{Lease, ResourceKind, ResourceLedger};

/// A single UDF argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absence of a value.
    Nil,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Ordered list.
    List(Vec<Value>),
    /// String-keyed map; insertion order is preserved.
    Map(Vec<(String, Value)>),
}

/// Limits applied while converting caller arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionLimits {
    /// Maximum nesting depth of lists/maps inside an argument.
    pub max_depth: usize,
    /// Maximum number of top-level arguments.
    pub max_args: usize,
}

impl Default for ConversionLimits {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_args: 1024,
        }
    }
}

/// Ordered UDF argument list.
///
/// Owns a [`Lease`] for as long as it is alive. Equality compares the
/// values only.
#[derive(Debug, Clone)]
pub struct ValueList {
    values: Vec<Value>,
    _lease: Lease,
}

impl ValueList {
    /// Wraps already-converted values, acquiring a lease from `ledger`.
    pub fn new(values: Vec<Value>, ledger: &ResourceLedger) -> Self {
        Self {
            values,
            _lease: ledger.acquire(ResourceKind::ArgList),
        }
    }

    /// The arguments in order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PartialEq for ValueList {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

/// Converts a caller-supplied JSON array into a [`ValueList`].
///
/// # Errors
///
/// Returns an [`ErrorCode::Conversion`](crate::ErrorCode::Conversion)
/// record if `raw` is not an array, has more than `limits.max_args`
/// elements, nests deeper than `limits.max_depth`, or contains an integer
/// outside the signed 64-bit range.
///
/// # Examples
///
/// ```
/// use scan_jobs::lease::ResourceLedger;
/// use scan_jobs::value::{to_internal_list, ConversionLimits, Value};
/// use serde_json::json;
///
/// let ledger = ResourceLedger::new();
/// let list = to_internal_list(&json!([1, "two", null]), &ConversionLimits::default(), &ledger)
///     .unwrap();
/// assert_eq!(
///     list.values(),
///     &[Value::Integer(1), Value::String("two".into()), Value::Nil]
/// );
/// ```
pub fn to_internal_list(
    raw: &JsonValue,
    limits: &ConversionLimits,
    ledger: &ResourceLedger,
) -> Result<ValueList, ErrorRecord> {
    let items = raw
        .as_array()
        .ok_or_else(|| ErrorRecord::conversion("arguments should be a list"))?;

    if items.len() > limits.max_args {
        return Err(ErrorRecord::conversion(format!(
            "too many arguments: {} exceeds limit of {}",
            items.len(),
            limits.max_args
        )));
    }

    let values = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            convert(item, 1, limits).map_err(|e| {
                ErrorRecord::conversion(format!("argument {index}: {}", e.message))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ValueList::new(values, ledger))
}

fn convert(raw: &JsonValue, depth: usize, limits: &ConversionLimits) -> Result<Value, ErrorRecord> {
    match raw {
        JsonValue::Null => Ok(Value::Nil),
        JsonValue::Bool(b) => Ok(Value::Bool(*b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Integer(i))
            } else if n.is_u64() {
                Err(ErrorRecord::conversion(format!(
                    "integer {n} out of range"
                )))
            } else {
                n.as_f64()
                    .map(Value::Float)
                    .ok_or_else(|| ErrorRecord::conversion(format!("unsupported number {n}")))
            }
        },
        JsonValue::String(s) => Ok(Value::String(s.clone())),
        JsonValue::Array(items) => {
            check_depth(depth, limits)?;
            items
                .iter()
                .map(|item| convert(item, depth + 1, limits))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)
        },
        JsonValue::Object(entries) => {
            check_depth(depth, limits)?;
            entries
                .iter()
                .map(|(k, v)| convert(v, depth + 1, limits).map(|v| (k.clone(), v)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Map)
        },
    }
}

fn check_depth(depth: usize, limits: &ConversionLimits) -> Result<(), ErrorRecord> {
    if depth > limits.max_depth {
        return Err(ErrorRecord::conversion(format!(
            "nesting depth exceeds limit of {}",
            limits.max_depth
        )));
    }
    Ok(())
}

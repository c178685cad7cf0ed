//! Document attributes and attribute filters
//!
//! Attributes are named, typed values attached to a document in full-document
//! mode. They play no part in scoring; the ranker evaluates `FilterOptions`
//! against them after a document has been scored.
//!
//! Comparison rules:
//! - `Eq` / `Ne` work on same-kind pairs and on Int/Float mixes
//! - `Gt` / `Lt` / `Gte` / `Lte` work on numeric pairs and on string pairs
//! - every other pairing is a `TypeMismatch` error

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// Attribute map attached to a document
pub type Attributes = HashMap<String, AttributeValue>;

// ============================================================================
// AttributeValue
// ============================================================================

/// A typed attribute value attached to a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum AttributeValue {
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating-point number
    Float(f64),
    /// UTF-8 string
    String(String),
}

impl AttributeValue {
    /// Short name of the value kind, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::Bool(_) => "bool",
            AttributeValue::Int(_) => "int",
            AttributeValue::Float(_) => "float",
            AttributeValue::String(_) => "string",
        }
    }

    /// False only for a NaN or infinite `Float`, which JSON cannot carry
    pub fn is_finite(&self) -> bool {
        match self {
            AttributeValue::Float(f) => f.is_finite(),
            _ => true,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Order `self` against `other`, or `None` when the kinds are not comparable.
    fn partial_order(&self, other: &AttributeValue) -> Option<Ordering> {
        match (self, other) {
            (AttributeValue::Int(a), AttributeValue::Int(b)) => Some(a.cmp(b)),
            (AttributeValue::String(a), AttributeValue::String(b)) => Some(a.cmp(b)),
            (AttributeValue::Bool(a), AttributeValue::Bool(b)) => Some(a.cmp(b)),
            _ => {
                let a = self.as_f64()?;
                let b = other.as_f64()?;
                a.partial_cmp(&b)
            }
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

// ============================================================================
// CompareOp
// ============================================================================

/// Comparison operator for attribute filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    /// Stored value equals the filter value
    Eq,
    /// Stored value differs from the filter value
    Ne,
    /// Stored value is greater than the filter value
    Gt,
    /// Stored value is less than the filter value
    Lt,
    /// Stored value is greater than or equal to the filter value
    Gte,
    /// Stored value is less than or equal to the filter value
    Lte,
}

impl CompareOp {
    /// Operator name as used in configuration and diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Gt => "gt",
            CompareOp::Lt => "lt",
            CompareOp::Gte => "gte",
            CompareOp::Lte => "lte",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// FilterOptions
// ============================================================================

/// A named-attribute comparison applied after scoring.
///
/// The comparison reads as `stored <op> val`, so
/// `FilterOptions::new("year", CompareOp::Gte, 2020)` keeps documents whose
/// `year` attribute is at least 2020.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Attribute name to test
    pub attr: String,
    /// Value to compare against
    pub val: AttributeValue,
    /// Comparison operator
    pub op: CompareOp,
}

impl FilterOptions {
    /// Create a new filter
    pub fn new(attr: impl Into<String>, op: CompareOp, val: impl Into<AttributeValue>) -> Self {
        FilterOptions {
            attr: attr.into(),
            val: val.into(),
            op,
        }
    }

    /// Compare a stored attribute value against this filter.
    ///
    /// Returns `Ok(true)` when the document satisfies the filter, `Ok(false)`
    /// when it does not, and `Err(TypeMismatch)` when the two values cannot be
    /// compared with this operator.
    pub fn compare(&self, stored: &AttributeValue) -> Result<bool> {
        let ordering = match self.op {
            CompareOp::Eq | CompareOp::Ne => stored.partial_order(&self.val),
            _ => match stored {
                AttributeValue::Bool(_) => None,
                _ => stored.partial_order(&self.val),
            },
        };

        let ordering = ordering.ok_or_else(|| Error::TypeMismatch {
            attr: self.attr.clone(),
            stored: stored.kind(),
            given: self.val.kind(),
            op: self.op,
        })?;

        Ok(match self.op {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Gte => ordering != Ordering::Less,
            CompareOp::Lte => ordering != Ordering::Greater,
        })
    }
}

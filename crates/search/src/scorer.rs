//! Scoring infrastructure
//!
//! This module provides:
//! - ScoringCriteria trait for pluggable scoring strategies
//! - FieldWeights / FieldShape for validating caller payloads
//! - TokenProximityCriteria, FieldWeightedCriteria and Bm25Criteria
//!
//! A strategy maps a candidate plus the fields registered for it to zero or
//! more scores. An empty score list means "no match": the ranker drops the
//! candidate without counting it.

use docrank_core::IndexedDoc;
use serde::{Deserialize, Serialize};

// ============================================================================
// ScoringCriteria Trait
// ============================================================================

/// Pluggable scoring interface
///
/// `fields` is whatever payload was registered for the document, or `None`
/// when nothing was. Implementations must not panic on absent or unexpected
/// payloads; they return an empty vector instead.
///
/// # Thread Safety
///
/// Strategies are invoked concurrently and without any registry lock held,
/// so they must be Send + Sync and free of shared mutable state.
pub trait ScoringCriteria<F>: Send + Sync {
    /// Score a candidate. The first score orders the results.
    fn score(&self, doc: &IndexedDoc, fields: Option<&F>) -> Vec<f32>;

    /// Name for debugging and logging
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F, T> ScoringCriteria<F> for T
where
    T: Fn(&IndexedDoc, Option<&F>) -> Vec<f32> + Send + Sync,
{
    fn score(&self, doc: &IndexedDoc, fields: Option<&F>) -> Vec<f32> {
        self(doc, fields)
    }
}

// ============================================================================
// Field payloads
// ============================================================================

/// Numeric scoring fields `{a, b, c}` combined with proximity by
/// `FieldWeightedCriteria`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldWeights {
    /// Proximity multiplier
    pub a: f32,
    /// First factor of the constant term
    pub b: f32,
    /// Second factor of the constant term
    pub c: f32,
}

impl FieldWeights {
    /// Create a new set of weights
    pub fn new(a: f32, b: f32, c: f32) -> Self {
        FieldWeights { a, b, c }
    }
}

/// Payloads that may carry `FieldWeights`.
///
/// Returning `None` marks the payload as the wrong shape for weight-based
/// strategies.
pub trait FieldShape {
    /// Extract the weights, or `None` on shape mismatch
    fn field_weights(&self) -> Option<FieldWeights>;
}

impl FieldShape for FieldWeights {
    fn field_weights(&self) -> Option<FieldWeights> {
        Some(*self)
    }
}

/// Dynamic payloads: an object with numeric `a`, `b` and `c` members.
impl FieldShape for serde_json::Value {
    fn field_weights(&self) -> Option<FieldWeights> {
        let obj = self.as_object()?;
        let get = |key: &str| obj.get(key).and_then(|v| v.as_f64()).map(|v| v as f32);
        Some(FieldWeights {
            a: get("a")?,
            b: get("b")?,
            c: get("c")?,
        })
    }
}

// ============================================================================
// Built-in strategies
// ============================================================================

/// Scores `1 / (proximity + 1)`; no score when proximity does not apply.
///
/// Ignores the registered fields entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenProximityCriteria;

impl<F> ScoringCriteria<F> for TokenProximityCriteria {
    fn score(&self, doc: &IndexedDoc, _fields: Option<&F>) -> Vec<f32> {
        if !doc.has_proximity() {
            return Vec::new();
        }
        vec![1.0 / (doc.token_proximity as f32 + 1.0)]
    }

    fn name(&self) -> &str {
        "token-proximity"
    }
}

/// Scores `proximity * a + b * c` from the document's `FieldWeights`.
///
/// Documents without weights, or with a payload of the wrong shape, get no
/// score.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldWeightedCriteria;

impl<F: FieldShape> ScoringCriteria<F> for FieldWeightedCriteria {
    fn score(&self, doc: &IndexedDoc, fields: Option<&F>) -> Vec<f32> {
        match fields.and_then(FieldShape::field_weights) {
            Some(w) => vec![doc.token_proximity as f32 * w.a + w.b * w.c],
            None => Vec::new(),
        }
    }

    fn name(&self) -> &str {
        "field-weighted"
    }
}

/// Passes the candidate's BM25 statistic through unchanged.
///
/// Only documents whose payload has a valid `FieldWeights` shape are scored.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bm25Criteria;

impl<F: FieldShape> ScoringCriteria<F> for Bm25Criteria {
    fn score(&self, doc: &IndexedDoc, fields: Option<&F>) -> Vec<f32> {
        match fields.and_then(FieldShape::field_weights) {
            Some(_) => vec![doc.bm25],
            None => Vec::new(),
        }
    }

    fn name(&self) -> &str {
        "bm25"
    }
}

// ============================================================================
// Tests
// ============================================================================

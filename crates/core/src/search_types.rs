//! Ranked output types
//!
//! A ranking pass produces one of two mutually exclusive shapes, fixed by the
//! registry mode:
//! - `ScoredId`: id, scores and token positions (ID-only registries)
//! - `ScoredDoc`: the above plus fields, content and attributes
//!
//! `RankOutput` carries whichever shape the registry produced; `Ranked`
//! pairs it with the number of scored documents.

use crate::attribute::Attributes;
use crate::types::{DocId, IndexedDoc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Scored shapes
// ============================================================================

/// Ranked result from an ID-only registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredId {
    /// Document identifier
    pub doc_id: DocId,
    /// Scores in strategy order; the first one drives sorting
    pub scores: Vec<f32>,
    /// Snippet positions copied from the candidate
    pub token_snippet_locs: Vec<usize>,
    /// Token positions copied from the candidate
    pub token_locs: Vec<Vec<usize>>,
}

impl ScoredId {
    /// Build from a candidate and its scores
    pub fn from_candidate(doc: &IndexedDoc, scores: Vec<f32>) -> Self {
        ScoredId {
            doc_id: doc.doc_id,
            scores,
            token_snippet_locs: doc.token_snippet_locs.clone(),
            token_locs: doc.token_locs.clone(),
        }
    }
}

/// Ranked result from a full-document registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoc<F> {
    /// Document identifier
    pub doc_id: DocId,
    /// Scoring payload registered with the document
    pub fields: Option<F>,
    /// Raw content registered with the document
    pub content: String,
    /// Attributes registered with the document
    pub attributes: Attributes,
    /// Scores in strategy order; the first one drives sorting
    pub scores: Vec<f32>,
    /// Snippet positions copied from the candidate
    pub token_snippet_locs: Vec<usize>,
    /// Token positions copied from the candidate
    pub token_locs: Vec<Vec<usize>>,
}

/// Access to the score that orders a ranked result
pub trait PrimaryScore {
    /// First score, or `None` for an empty score list
    fn primary_score(&self) -> Option<f32>;
}

impl PrimaryScore for ScoredId {
    fn primary_score(&self) -> Option<f32> {
        self.scores.first().copied()
    }
}

impl<F> PrimaryScore for ScoredDoc<F> {
    fn primary_score(&self) -> Option<f32> {
        self.scores.first().copied()
    }
}

// ============================================================================
// RankOutput
// ============================================================================

/// Ranked results in the shape chosen by the registry mode
#[derive(Debug, Clone, PartialEq)]
pub enum RankOutput<F> {
    /// Results from an ID-only registry
    Ids(Vec<ScoredId>),
    /// Results from a full-document registry
    Docs(Vec<ScoredDoc<F>>),
}

impl<F> RankOutput<F> {
    /// Number of results
    pub fn len(&self) -> usize {
        match self {
            RankOutput::Ids(ids) => ids.len(),
            RankOutput::Docs(docs) => docs.len(),
        }
    }

    /// True when there are no results
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Document ids in result order
    pub fn doc_ids(&self) -> Vec<DocId> {
        match self {
            RankOutput::Ids(ids) => ids.iter().map(|d| d.doc_id).collect(),
            RankOutput::Docs(docs) => docs.iter().map(|d| d.doc_id).collect(),
        }
    }

    /// Primary scores in result order
    pub fn primary_scores(&self) -> Vec<f32> {
        match self {
            RankOutput::Ids(ids) => ids.iter().filter_map(|d| d.primary_score()).collect(),
            RankOutput::Docs(docs) => docs.iter().filter_map(|d| d.primary_score()).collect(),
        }
    }

    /// Borrow the ID-only results, if this is that shape
    pub fn as_ids(&self) -> Option<&[ScoredId]> {
        match self {
            RankOutput::Ids(ids) => Some(ids),
            RankOutput::Docs(_) => None,
        }
    }

    /// Borrow the full-document results, if this is that shape
    pub fn as_docs(&self) -> Option<&[ScoredDoc<F>]> {
        match self {
            RankOutput::Ids(_) => None,
            RankOutput::Docs(docs) => Some(docs),
        }
    }
}

/// Output of one ranking pass
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<F> {
    /// Sorted and paginated results (unsorted when sorting was deferred)
    pub docs: RankOutput<F>,
    /// Number of candidates that produced at least one score, counted
    /// before attribute filtering and pagination
    pub matched: usize,
}

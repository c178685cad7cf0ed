//! Candidate document types
//!
//! `IndexedDoc` is what an index lookup hands to the ranker: an id plus the
//! positional and statistical signals a scoring strategy may use. The ranker
//! treats token locations as opaque and passes them through to its output.

use serde::{Deserialize, Serialize};

/// Caller-assigned unique document identifier
pub type DocId = u64;

/// Sentinel proximity for candidates where proximity does not apply
pub const NO_PROXIMITY: i32 = -1;

// ============================================================================
// IndexedDoc
// ============================================================================

/// A candidate document produced by an index lookup.
///
/// # Fields
///
/// - `token_proximity`: how close the matched tokens are to each other; a
///   negative value means "not applicable"
/// - `bm25`: precomputed BM25 relevance statistic
/// - `token_locs`: for each query token, every position it occurs at
/// - `token_snippet_locs`: one chosen position per query token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDoc {
    /// Document identifier
    pub doc_id: DocId,
    /// Token proximity, negative when not applicable
    pub token_proximity: i32,
    /// BM25 relevance statistic
    pub bm25: f32,
    /// Positions of each query token in the document
    pub token_locs: Vec<Vec<usize>>,
    /// Positions chosen for snippet extraction, one per query token
    pub token_snippet_locs: Vec<usize>,
}

impl IndexedDoc {
    /// Create a candidate with no positional data
    pub fn new(doc_id: DocId) -> Self {
        IndexedDoc {
            doc_id,
            token_proximity: NO_PROXIMITY,
            bm25: 0.0,
            token_locs: Vec::new(),
            token_snippet_locs: Vec::new(),
        }
    }

    /// Builder: set token proximity
    pub fn with_proximity(mut self, proximity: i32) -> Self {
        self.token_proximity = proximity;
        self
    }

    /// Builder: set BM25 statistic
    pub fn with_bm25(mut self, bm25: f32) -> Self {
        self.bm25 = bm25;
        self
    }

    /// Builder: set token locations
    pub fn with_token_locs(mut self, locs: Vec<Vec<usize>>) -> Self {
        self.token_locs = locs;
        self
    }

    /// Builder: set snippet locations
    pub fn with_snippet_locs(mut self, locs: Vec<usize>) -> Self {
        self.token_snippet_locs = locs;
        self
    }

    /// True when proximity carries a usable value
    pub fn has_proximity(&self) -> bool {
        self.token_proximity >= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_has_no_proximity() {
        let doc = IndexedDoc::new(7);
        assert_eq!(doc.doc_id, 7);
        assert!(!doc.has_proximity());
        assert!(doc.token_locs.is_empty());
    }

    #[test]
    fn test_builders() {
        let doc = IndexedDoc::new(1)
            .with_proximity(0)
            .with_bm25(1.5)
            .with_token_locs(vec![vec![0], vec![6, 12]])
            .with_snippet_locs(vec![0, 6]);
        assert!(doc.has_proximity());
        assert_eq!(doc.bm25, 1.5);
        assert_eq!(doc.token_locs[1], vec![6, 12]);
        assert_eq!(doc.token_snippet_locs, vec![0, 6]);
    }
}

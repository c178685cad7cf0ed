//! Ranking and filtering for docrank
//!
//! This crate provides:
//! - DocumentRegistry: lock-protected per-document fields, content and attributes
//! - ScoringCriteria trait for pluggable scoring strategies
//! - TokenProximityCriteria, FieldWeightedCriteria, Bm25Criteria
//! - Attribute filter evaluation
//! - Ranker: score, filter, sort and paginate index candidates
//!
//! # Usage
//!
//! ```
//! use docrank_core::IndexedDoc;
//! use docrank_search::{FieldWeights, RankOpts, Ranker, TokenProximityCriteria};
//!
//! let ranker: Ranker<FieldWeights> = Ranker::new();
//! ranker.init(false).unwrap();
//! ranker.add_doc(1, Some(FieldWeights::new(1.0, 2.0, 3.0)), None, None).unwrap();
//!
//! let opts = RankOpts::new(TokenProximityCriteria).reversed(true);
//! let ranked = ranker
//!     .rank(&[IndexedDoc::new(1).with_proximity(1)], &opts, false, &[], false)
//!     .unwrap();
//! assert_eq!(ranked.matched, 1);
//! assert_eq!(ranked.docs.primary_scores(), vec![0.5]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod filter;
pub mod ranker;
pub mod registry;
pub mod scorer;

// Re-export commonly used types
pub use filter::passes_filters;
pub use ranker::{output_range, RankOpts, Ranker};
pub use registry::{DocRecord, DocumentRegistry, RegistryMode};
pub use scorer::{
    Bm25Criteria, FieldShape, FieldWeightedCriteria, FieldWeights, ScoringCriteria,
    TokenProximityCriteria,
};

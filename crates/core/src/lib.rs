//! Core types for docrank
//!
//! This crate defines the foundational types shared by the ranker and the
//! engine:
//! - DocId / IndexedDoc: candidate documents handed over by an index lookup
//! - AttributeValue / FilterOptions / CompareOp: post-scoring attribute filters
//! - ScoredId / ScoredDoc / RankOutput / Ranked: ranked output shapes
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attribute;
pub mod error;
pub mod search_types;
pub mod types;

pub use attribute::{AttributeValue, Attributes, CompareOp, FilterOptions};
pub use error::{Error, Result};
pub use search_types::{PrimaryScore, RankOutput, Ranked, ScoredDoc, ScoredId};
pub use types::{DocId, IndexedDoc, NO_PROXIMITY};

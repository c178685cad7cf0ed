//! Search engine for docrank
//!
//! This crate orchestrates the ranking layer:
//! - Engine: index_doc / remove_doc / search behind one handle
//! - EngineConfig: `docrank.toml` loading and validation
//! - Segmenter: text to tokens with byte offsets
//! - DocIndex / InvertedIndex: AND lookup with proximity and BM25
//! - DocStore: memory and JSON file persistence, reloaded on open
//!
//! Scoring, filtering, sorting and pagination live in `docrank-search`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod index;
pub mod segmenter;
pub mod store;

pub use config::{EngineConfig, CONFIG_FILE_NAME};
pub use engine::{DocData, Engine, SearchRequest, SearchResponse};
pub use index::{token_proximity, Bm25Params, DocIndex, InvertedIndex};
pub use segmenter::{Segmenter, TokenData, UnicodeSegmenter};
pub use store::{DocStore, JsonFileStore, MemoryStore};

//! docrank - embeddable document ranking and filtering
//!
//! docrank scores index candidates with a pluggable strategy, filters them
//! on per-document attributes, then sorts and paginates the survivors.
//!
//! # Quick Start
//!
//! ```
//! use docrank::{DocData, Engine, EngineConfig, SearchRequest, TokenProximityCriteria};
//!
//! let engine: Engine<()> = Engine::new(EngineConfig::default(), TokenProximityCriteria)?;
//! engine.index_doc(1, DocData::new("hello brave new world"))?;
//! engine.index_doc(2, DocData::new("hello world"))?;
//!
//! let response = engine.search(&SearchRequest::new("hello world"))?;
//! assert_eq!(response.num_docs, 2);
//! assert_eq!(response.docs.doc_ids(), vec![1, 2]);
//! # Ok::<(), docrank::Error>(())
//! ```
//!
//! # Architecture
//!
//! - [`docrank_core`]: shared value types and the [`Error`] enum
//! - [`docrank_search`]: the registry, scoring strategies, filters and [`Ranker`]
//! - [`docrank_engine`]: segmentation, indexing, persistence and [`Engine`]

pub use docrank_core::*;
pub use docrank_engine::*;
pub use docrank_search::*;

//! Search orchestration
//!
//! `Engine` wires the collaborators together:
//!
//! ```text
//! text -> Segmenter -> tokens -> DocIndex -> candidates -> Ranker -> results
//! ```
//!
//! Indexing goes the other way: a document is saved to the `DocStore`, then
//! registered with the ranker and added to the index. Writers are serialized,
//! so the store, the registry and the index agree once concurrent
//! `index_doc` / `remove_doc` calls on one id have returned. Searches do not
//! wait for writers: one running alongside `index_doc` may see a candidate
//! the registry does not know yet, and the ranker skips it.

use crate::config::EngineConfig;
use crate::index::{Bm25Params, DocIndex, InvertedIndex};
use crate::segmenter::{Segmenter, TokenData, UnicodeSegmenter};
use crate::store::{DocStore, JsonFileStore, MemoryStore};
use docrank_core::{Attributes, DocId, Error, FilterOptions, RankOutput, Result};
use docrank_search::{RankOpts, Ranker, RegistryMode, ScoringCriteria};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

// ============================================================================
// DocData
// ============================================================================

/// Input of one indexing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocData<F> {
    /// Raw text; segmented unless `tokens` is supplied
    #[serde(default)]
    pub content: String,
    /// Pre-segmented tokens, used instead of segmenting `content`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<TokenData>>,
    /// Labels, indexed whole and without positions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// Scoring payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<F>,
    /// Filterable attributes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
}

impl<F> Default for DocData<F> {
    fn default() -> Self {
        DocData {
            content: String::new(),
            tokens: None,
            labels: Vec::new(),
            fields: None,
            attributes: None,
        }
    }
}

impl<F> DocData<F> {
    /// Document with text content only
    pub fn new(content: impl Into<String>) -> Self {
        DocData {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Supply tokens instead of segmenting the content
    pub fn with_tokens(mut self, tokens: Vec<TokenData>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Attach labels. A label matches a query token equal to it but has no
    /// position, so it contributes nothing to proximity or snippets.
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a scoring payload
    pub fn with_fields(mut self, fields: F) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Attach filterable attributes
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = Some(attributes);
        self
    }
}

// ============================================================================
// SearchRequest / SearchResponse
// ============================================================================

/// One search call.
#[derive(Debug, Clone)]
pub struct SearchRequest<F> {
    /// Query text
    pub text: String,
    /// Query tokens; bypasses segmentation when set
    pub tokens: Option<Vec<String>>,
    /// Labels every match must carry, in addition to the tokens
    pub labels: Vec<String>,
    /// Restrict matches to these documents
    pub doc_ids: Option<HashSet<DocId>>,
    /// Overrides the engine's default rank options
    pub rank_opts: Option<RankOpts<F>>,
    /// Only count matches
    pub count_only: bool,
    /// Attribute filters (full-document mode only)
    pub filters: Vec<FilterOptions>,
    /// Return matches unsorted and unpaginated (full-document mode only)
    pub orderless: bool,
}

impl<F> SearchRequest<F> {
    /// Search for `text` with the default options
    pub fn new(text: impl Into<String>) -> Self {
        SearchRequest {
            text: text.into(),
            tokens: None,
            labels: Vec::new(),
            doc_ids: None,
            rank_opts: None,
            count_only: false,
            filters: Vec::new(),
            orderless: false,
        }
    }

    /// Search for exactly these tokens
    pub fn with_tokens(mut self, tokens: Vec<String>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Require a label on every match
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    /// Search only within these documents
    pub fn within(mut self, doc_ids: impl IntoIterator<Item = DocId>) -> Self {
        self.doc_ids = Some(doc_ids.into_iter().collect());
        self
    }

    /// Override rank options for this call
    pub fn with_rank_opts(mut self, opts: RankOpts<F>) -> Self {
        self.rank_opts = Some(opts);
        self
    }

    /// Count matches without returning them
    pub fn count_only(mut self, count_only: bool) -> Self {
        self.count_only = count_only;
        self
    }

    /// Add an attribute filter
    pub fn with_filter(mut self, filter: FilterOptions) -> Self {
        self.filters.push(filter);
        self
    }

    /// Skip sorting and pagination
    pub fn orderless(mut self, orderless: bool) -> Self {
        self.orderless = orderless;
        self
    }
}

/// Result of one search call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse<F> {
    /// Tokens the query resolved to
    pub tokens: Vec<String>,
    /// Ranked results, in the shape of the registry mode
    pub docs: RankOutput<F>,
    /// Documents that produced a non-empty score, before filtering
    pub num_docs: usize,
    /// The deadline passed before ranking
    pub timed_out: bool,
}

// ============================================================================
// Engine
// ============================================================================

/// Segmentation, indexing, storage and ranking behind one handle.
pub struct Engine<F> {
    config: EngineConfig,
    ranker: Ranker<F>,
    default_opts: RankOpts<F>,
    segmenter: Box<dyn Segmenter>,
    index: Box<dyn DocIndex>,
    store: Box<dyn DocStore<F>>,
    writes: Mutex<()>,
}

impl<F> Engine<F>
where
    F: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create an engine with the default collaborators.
    ///
    /// Documents persist to `config.store_path` when it is set and are
    /// reloaded from it here.
    pub fn new(config: EngineConfig, criteria: impl ScoringCriteria<F> + 'static) -> Result<Self> {
        let store: Box<dyn DocStore<F>> = match &config.store_path {
            Some(path) => Box::new(JsonFileStore::open(path)?),
            None => Box::new(MemoryStore::new()),
        };
        let index = InvertedIndex::new(Bm25Params {
            k1: config.bm25_k1,
            b: config.bm25_b,
        });
        Self::open(
            config,
            Arc::new(criteria),
            Box::new(UnicodeSegmenter),
            Box::new(index),
            store,
        )
    }
}

impl<F: Clone> Engine<F> {
    /// Assemble an engine from explicit collaborators without reading the
    /// store.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when the config does not validate.
    pub fn with_parts(
        config: EngineConfig,
        criteria: Arc<dyn ScoringCriteria<F>>,
        segmenter: Box<dyn Segmenter>,
        index: Box<dyn DocIndex>,
        store: Box<dyn DocStore<F>>,
    ) -> Result<Self> {
        config.validate()?;

        let ranker = Ranker::new();
        ranker.init(config.id_only)?;
        let default_opts = config.rank_opts(criteria);

        Ok(Engine {
            config,
            ranker,
            default_opts,
            segmenter,
            index,
            store,
            writes: Mutex::new(()),
        })
    }

    /// Like [`with_parts`](Self::with_parts), then rebuild the registry and
    /// index from every stored document.
    pub fn open(
        config: EngineConfig,
        criteria: Arc<dyn ScoringCriteria<F>>,
        segmenter: Box<dyn Segmenter>,
        index: Box<dyn DocIndex>,
        store: Box<dyn DocStore<F>>,
    ) -> Result<Self> {
        let engine = Self::with_parts(config, criteria, segmenter, index, store)?;

        let stored = engine.store.load()?;
        let reloaded = stored.len();
        for (doc_id, doc) in stored {
            engine.apply(doc_id, doc)?;
        }

        info!(target: "docrank::engine", docs = reloaded, "Reloaded stored documents");
        Ok(engine)
    }

    /// Index a document, replacing any earlier version with the same id.
    ///
    /// Fields and tokens are always replaced. Empty content and absent
    /// attributes keep what the previous version registered, and the stored
    /// record carries the merged values.
    ///
    /// The store is written first; a storage failure leaves the in-memory
    /// state untouched.
    ///
    /// # Errors
    ///
    /// `Serialization` when an attribute is a NaN or infinite float, or when
    /// the store cannot represent the document.
    pub fn index_doc(&self, doc_id: DocId, mut doc: DocData<F>) -> Result<()> {
        if let Some(attrs) = &doc.attributes {
            if let Some((name, value)) = attrs.iter().find(|(_, v)| !v.is_finite()) {
                return Err(Error::Serialization(format!(
                    "document {}: attribute '{}' is not finite ({:?})",
                    doc_id, name, value
                )));
            }
        }

        let _writes = self.writes.lock();
        if doc.content.is_empty() || doc.attributes.is_none() {
            if let Some(previous) = self.ranker.registry().snapshot(doc_id)? {
                if doc.content.is_empty() {
                    doc.content = previous.content.unwrap_or_default();
                }
                if doc.attributes.is_none() {
                    doc.attributes = previous.attributes;
                }
            }
        }

        self.store.save(doc_id, &doc)?;
        self.apply(doc_id, doc)?;
        debug!(target: "docrank::engine", doc_id, "Indexed document");
        Ok(())
    }

    fn apply(&self, doc_id: DocId, doc: DocData<F>) -> Result<()> {
        let mut tokens = match doc.tokens {
            Some(tokens) => tokens,
            None => self.segmenter.document_tokens(&doc.content),
        };
        tokens.extend(
            doc.labels
                .iter()
                .map(|label| TokenData::new(self.segmenter.label_token(label), Vec::new())),
        );
        let content = (!doc.content.is_empty()).then_some(doc.content);
        self.ranker
            .add_doc(doc_id, doc.fields, content, doc.attributes)?;
        self.index.add(doc_id, &tokens);
        Ok(())
    }

    /// Remove a document everywhere. Unknown ids are a no-op.
    ///
    /// Returns whether the document was registered.
    pub fn remove_doc(&self, doc_id: DocId) -> Result<bool> {
        let _writes = self.writes.lock();
        self.store.remove(doc_id)?;
        let removed = self.ranker.remove_doc(doc_id)?;
        self.index.remove(doc_id);
        debug!(target: "docrank::engine", doc_id, removed, "Removed document");
        Ok(removed)
    }

    /// Run a search.
    ///
    /// When `search_timeout_ms` is set and has elapsed by the time the index
    /// lookup returns, ranking is skipped and an empty response with
    /// `timed_out` is returned.
    pub fn search(&self, request: &SearchRequest<F>) -> Result<SearchResponse<F>> {
        let started = Instant::now();

        let mut tokens = match &request.tokens {
            Some(tokens) => tokens.clone(),
            None => self.segmenter.query_tokens(&request.text),
        };
        for label in &request.labels {
            let token = self.segmenter.label_token(label);
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }

        let mut candidates = self.index.lookup(&tokens);
        if let Some(doc_ids) = &request.doc_ids {
            candidates.retain(|c| doc_ids.contains(&c.doc_id));
        }

        if self.deadline_passed(started) {
            debug!(
                target: "docrank::engine",
                candidates = candidates.len(),
                timeout_ms = self.config.search_timeout_ms,
                "Search timed out before ranking"
            );
            return Ok(SearchResponse {
                tokens,
                docs: self.empty_output()?,
                num_docs: 0,
                timed_out: true,
            });
        }

        let opts = request.rank_opts.as_ref().unwrap_or(&self.default_opts);
        let ranked = self.ranker.rank(
            &candidates,
            opts,
            request.count_only,
            &request.filters,
            request.orderless,
        )?;

        debug!(
            target: "docrank::engine",
            tokens = tokens.len(),
            candidates = candidates.len(),
            matched = ranked.matched,
            returned = ranked.docs.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "Search complete"
        );
        Ok(SearchResponse {
            tokens,
            docs: ranked.docs,
            num_docs: ranked.matched,
            timed_out: false,
        })
    }

    fn deadline_passed(&self, started: Instant) -> bool {
        self.config.search_timeout_ms > 0
            && started.elapsed() >= Duration::from_millis(self.config.search_timeout_ms)
    }

    fn empty_output(&self) -> Result<RankOutput<F>> {
        Ok(match self.ranker.registry().mode()? {
            RegistryMode::IdOnly => RankOutput::Ids(Vec::new()),
            RegistryMode::FullDocument => RankOutput::Docs(Vec::new()),
        })
    }

    /// Query tokens the configured segmenter produces for `text`
    pub fn segment(&self, text: &str) -> Vec<String> {
        self.segmenter.query_tokens(text)
    }

    /// Number of registered documents
    pub fn num_docs(&self) -> usize {
        self.ranker.registry().len()
    }

    /// The ranker, for direct `rank_by_id` / `rank_by_document` calls
    pub fn ranker(&self) -> &Ranker<F> {
        &self.ranker
    }

    /// The index, for lookups that bypass ranking
    pub fn index(&self) -> &dyn DocIndex {
        self.index.as_ref()
    }

    /// The config this engine was built with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Rank options used when a request carries none
    pub fn default_rank_opts(&self) -> &RankOpts<F> {
        &self.default_opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docrank_search::TokenProximityCriteria;

    fn engine(config: EngineConfig) -> Engine<()> {
        Engine::new(config, TokenProximityCriteria).unwrap()
    }

    #[test]
    fn test_doc_data_builders() {
        let doc: DocData<u8> = DocData::new("text").with_fields(3);
        assert_eq!(doc.content, "text");
        assert_eq!(doc.fields, Some(3));
        assert!(doc.tokens.is_none());
        assert!(doc.attributes.is_none());
    }

    #[test]
    fn test_doc_data_json_defaults() {
        let doc: DocData<u8> = serde_json::from_str(r#"{"content": "hi"}"#).unwrap();
        assert_eq!(doc, DocData::new("hi"));
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(json, r#"{"content":"hi"}"#);
    }

    #[test]
    fn test_doc_data_json_without_default_payload() {
        // the payload type needs no Default to read a record without fields
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        struct Payload {
            boost: f32,
        }

        let doc: DocData<Payload> =
            serde_json::from_str(r#"{"content": "hi", "labels": ["Tag"]}"#).unwrap();
        assert_eq!(doc.fields, None);
        assert_eq!(doc.labels, vec!["Tag"]);

        let doc: DocData<Payload> =
            serde_json::from_str(r#"{"fields": {"boost": 2.0}}"#).unwrap();
        assert_eq!(doc.fields, Some(Payload { boost: 2.0 }));
        assert!(doc.content.is_empty());
    }

    #[test]
    fn test_non_finite_attribute_rejected() {
        let engine = engine(EngineConfig::default());
        let mut attrs = Attributes::new();
        attrs.insert("score".to_string(), docrank_core::AttributeValue::Float(f64::INFINITY));

        let err = engine
            .index_doc(1, DocData::new("hello").with_attributes(attrs))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Serialization(_)));
        assert_eq!(engine.num_docs(), 0);
        assert!(engine.search(&SearchRequest::new("hello")).unwrap().docs.is_empty());
    }

    #[test]
    fn test_search_request_builders() {
        let req: SearchRequest<()> = SearchRequest::new("hello")
            .count_only(true)
            .orderless(true)
            .with_tokens(vec!["hello".to_string()]);
        assert!(req.count_only);
        assert!(req.orderless);
        assert_eq!(req.tokens.as_deref(), Some(&["hello".to_string()][..]));
        assert!(req.rank_opts.is_none());
        assert!(req.doc_ids.is_none());

        let req: SearchRequest<()> = SearchRequest::new("x").within([3, 1, 3]).with_label("a");
        assert_eq!(req.doc_ids.map(|ids| ids.len()), Some(2));
        assert_eq!(req.labels, vec!["a"]);
    }

    #[test]
    fn test_labels_and_within() {
        let engine = engine(EngineConfig::default());
        engine
            .index_doc(1, DocData::new("hello world").with_labels(["Greeting"]))
            .unwrap();
        engine.index_doc(2, DocData::new("hello there")).unwrap();
        engine.index_doc(3, DocData::new("hello again")).unwrap();

        let response = engine
            .search(&SearchRequest::new("hello").with_label("greeting"))
            .unwrap();
        assert_eq!(response.tokens, vec!["hello", "greeting"]);
        assert_eq!(response.docs.doc_ids(), vec![1]);

        let response = engine.search(&SearchRequest::new("hello").within([2, 3, 9])).unwrap();
        assert_eq!(response.docs.doc_ids(), vec![2, 3]);
        assert_eq!(response.num_docs, 2);
    }

    #[test]
    fn test_index_and_search() {
        let engine = engine(EngineConfig::default());
        engine.index_doc(1, DocData::new("hello world")).unwrap();
        engine.index_doc(2, DocData::new("goodbye world")).unwrap();

        let response = engine.search(&SearchRequest::new("World")).unwrap();
        assert_eq!(response.tokens, vec!["world"]);
        assert_eq!(response.num_docs, 2);
        assert_eq!(response.docs.doc_ids(), vec![1, 2]);
        assert!(!response.timed_out);
    }

    #[test]
    fn test_segment_and_num_docs() {
        let engine = engine(EngineConfig::default());
        assert_eq!(engine.segment("Hello, World"), vec!["hello", "world"]);
        engine.index_doc(4, DocData::new("x")).unwrap();
        assert_eq!(engine.num_docs(), 1);
        assert!(engine.remove_doc(4).unwrap());
        assert!(!engine.remove_doc(4).unwrap());
        assert_eq!(engine.num_docs(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            bm25_b: 2.0,
            ..EngineConfig::default()
        };
        assert!(Engine::<()>::new(config, TokenProximityCriteria).is_err());
    }
}

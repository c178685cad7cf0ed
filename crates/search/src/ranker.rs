//! Ranking, filtering and pagination
//!
//! The ranker turns index candidates into an ordered, paginated result set:
//!
//! ```text
//! candidates ──► registry snapshot ──► ScoringCriteria ──► filters ──► sort ──► page
//!               (read lock, per doc)   (no lock held)     (docs only)
//! ```
//!
//! # Consistency
//!
//! The read lock is taken and released once per candidate, and scoring runs
//! with no lock held. Concurrent `add_doc` / `remove_doc` calls may therefore
//! interleave with a ranking pass: each document is seen either entirely
//! before or entirely after a write, but the result set as a whole is not a
//! point-in-time view.
//!
//! # Counting
//!
//! `matched` counts candidates that produced at least one score. Attribute
//! filters and pagination only shape the returned list, never the count.

use crate::filter::passes_filters;
use crate::registry::{DocRecord, DocumentRegistry, RegistryMode};
use crate::scorer::ScoringCriteria;
use docrank_core::{
    DocId, Error, FilterOptions, IndexedDoc, PrimaryScore, RankOutput, Ranked, Result, ScoredDoc,
    ScoredId,
};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// RankOpts
// ============================================================================

/// Per-search ranking configuration
pub struct RankOpts<F> {
    /// Strategy that scores each candidate
    pub scoring_criteria: Arc<dyn ScoringCriteria<F>>,
    /// Sort descending by primary score instead of ascending
    pub reverse_order: bool,
    /// Number of sorted results to skip
    pub output_offset: usize,
    /// Maximum number of results to return; 0 means unbounded
    pub max_outputs: usize,
}

impl<F> RankOpts<F> {
    /// Options with the given strategy, ascending order and no pagination
    pub fn new(criteria: impl ScoringCriteria<F> + 'static) -> Self {
        Self::with_criteria(Arc::new(criteria))
    }

    /// Options sharing an existing strategy
    pub fn with_criteria(criteria: Arc<dyn ScoringCriteria<F>>) -> Self {
        RankOpts {
            scoring_criteria: criteria,
            reverse_order: false,
            output_offset: 0,
            max_outputs: 0,
        }
    }

    /// Builder: sort descending
    pub fn reversed(mut self, reverse: bool) -> Self {
        self.reverse_order = reverse;
        self
    }

    /// Builder: set output offset
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.output_offset = offset;
        self
    }

    /// Builder: set maximum outputs (0 = unbounded)
    pub fn with_max_outputs(mut self, max: usize) -> Self {
        self.max_outputs = max;
        self
    }

    /// Slice of a `len`-long sorted result list these options select
    pub fn output_range(&self, len: usize) -> Range<usize> {
        output_range(self.output_offset, self.max_outputs, len)
    }
}

impl<F> Clone for RankOpts<F> {
    fn clone(&self) -> Self {
        RankOpts {
            scoring_criteria: Arc::clone(&self.scoring_criteria),
            reverse_order: self.reverse_order,
            output_offset: self.output_offset,
            max_outputs: self.max_outputs,
        }
    }
}

impl<F> fmt::Debug for RankOpts<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RankOpts")
            .field("scoring_criteria", &self.scoring_criteria.name())
            .field("reverse_order", &self.reverse_order)
            .field("output_offset", &self.output_offset)
            .field("max_outputs", &self.max_outputs)
            .finish()
    }
}

/// Pagination window over `len` sorted results.
///
/// `start = min(offset, len)`; `end = len` when `max_outputs == 0`, else
/// `min(offset + max_outputs, len)`. Never panics, never errors.
pub fn output_range(offset: usize, max_outputs: usize, len: usize) -> Range<usize> {
    let start = offset.min(len);
    let end = if max_outputs == 0 {
        len
    } else {
        offset.saturating_add(max_outputs).min(len)
    };
    start..end
}

fn paginate<T>(mut docs: Vec<T>, range: Range<usize>) -> Vec<T> {
    docs.truncate(range.end);
    docs.drain(..range.start);
    docs
}

/// Stable sort by primary score; ties keep candidate order.
fn sort_by_primary<T: PrimaryScore>(docs: &mut [T], reverse: bool) {
    docs.sort_by(|a, b| {
        let a = a.primary_score().unwrap_or(f32::NEG_INFINITY);
        let b = b.primary_score().unwrap_or(f32::NEG_INFINITY);
        if reverse {
            b.total_cmp(&a)
        } else {
            a.total_cmp(&b)
        }
    });
}

// ============================================================================
// Ranker
// ============================================================================

/// Scores, filters, sorts and paginates candidates against a shared registry.
///
/// Cloning a `Ranker` shares the registry.
pub struct Ranker<F> {
    registry: Arc<DocumentRegistry<F>>,
}

impl<F> Clone for Ranker<F> {
    fn clone(&self) -> Self {
        Ranker {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<F> Default for Ranker<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> Ranker<F> {
    /// Ranker over a fresh, uninitialized registry
    pub fn new() -> Self {
        Self::with_registry(Arc::new(DocumentRegistry::new()))
    }

    /// Ranker over an existing registry
    pub fn with_registry(registry: Arc<DocumentRegistry<F>>) -> Self {
        Ranker { registry }
    }

    /// The underlying registry
    pub fn registry(&self) -> &Arc<DocumentRegistry<F>> {
        &self.registry
    }

    /// Initialize the registry; see [`DocumentRegistry::init`]
    pub fn init(&self, id_only: bool) -> Result<()> {
        self.registry.init(id_only)
    }

    /// Register a document; see [`DocumentRegistry::add_doc`]
    pub fn add_doc(
        &self,
        doc_id: DocId,
        fields: Option<F>,
        content: Option<String>,
        attributes: Option<docrank_core::Attributes>,
    ) -> Result<()> {
        self.registry.add_doc(doc_id, fields, content, attributes)
    }

    /// Unregister a document; see [`DocumentRegistry::remove_doc`]
    pub fn remove_doc(&self, doc_id: DocId) -> Result<bool> {
        self.registry.remove_doc(doc_id)
    }
}

impl<F: Clone> Ranker<F> {
    /// Rank candidates in the shape the registry mode dictates.
    ///
    /// ID-only registries go through [`rank_by_id`](Self::rank_by_id), which
    /// ignores `filters` and `defer_sort`; full-document registries go
    /// through [`rank_by_document`](Self::rank_by_document).
    pub fn rank(
        &self,
        docs: &[IndexedDoc],
        options: &RankOpts<F>,
        count_only: bool,
        filters: &[FilterOptions],
        defer_sort: bool,
    ) -> Result<Ranked<F>> {
        match self.registry.mode()? {
            RegistryMode::IdOnly => {
                let (ids, matched) = self.rank_by_id(docs, options, count_only)?;
                Ok(Ranked {
                    docs: RankOutput::Ids(ids),
                    matched,
                })
            }
            RegistryMode::FullDocument => {
                let (full, matched) =
                    self.rank_by_document(docs, options, count_only, filters, defer_sort)?;
                Ok(Ranked {
                    docs: RankOutput::Docs(full),
                    matched,
                })
            }
        }
    }

    /// Rank candidates into id-and-score records.
    ///
    /// Works in either registry mode. Never filters; always sorts and
    /// paginates unless `count_only`, in which case the list is empty.
    pub fn rank_by_id(
        &self,
        docs: &[IndexedDoc],
        options: &RankOpts<F>,
        count_only: bool,
    ) -> Result<(Vec<ScoredId>, usize)> {
        self.registry.mode()?;

        let mut output = Vec::new();
        let mut matched = 0;

        for doc in docs {
            let fields = match self.snapshot_fields(doc.doc_id)? {
                Some(fields) => fields,
                None => continue,
            };

            let scores = options.scoring_criteria.score(doc, fields.as_ref());
            if scores.is_empty() {
                continue;
            }
            if !count_only {
                output.push(ScoredId::from_candidate(doc, scores));
            }
            matched += 1;
        }

        if count_only {
            return Ok((output, matched));
        }

        sort_by_primary(&mut output, options.reverse_order);
        let range = options.output_range(output.len());
        let output = paginate(output, range);

        debug!(
            target: "docrank::ranker",
            candidates = docs.len(),
            matched,
            returned = output.len(),
            criteria = options.scoring_criteria.name(),
            "Ranked by id"
        );
        Ok((output, matched))
    }

    /// Rank candidates into full-document records.
    ///
    /// Filters are applied after scoring and before output; `matched` still
    /// counts filtered-out documents. With `defer_sort` the whole unsorted
    /// list is returned and the caller sorts and paginates it.
    ///
    /// # Errors
    ///
    /// `ModeMismatch` when the registry is ID-only.
    pub fn rank_by_document(
        &self,
        docs: &[IndexedDoc],
        options: &RankOpts<F>,
        count_only: bool,
        filters: &[FilterOptions],
        defer_sort: bool,
    ) -> Result<(Vec<ScoredDoc<F>>, usize)> {
        if self.registry.mode()? == RegistryMode::IdOnly {
            return Err(Error::ModeMismatch(
                "full documents requested from an ID-only registry".to_string(),
            ));
        }

        let mut output = Vec::new();
        let mut matched = 0;

        for doc in docs {
            let record = match self.snapshot(doc.doc_id)? {
                Some(record) => record,
                None => continue,
            };

            let scores = options.scoring_criteria.score(doc, record.fields.as_ref());
            if scores.is_empty() {
                continue;
            }
            matched += 1;

            if count_only || !passes_filters(doc.doc_id, record.attributes.as_ref(), filters) {
                continue;
            }

            output.push(ScoredDoc {
                doc_id: doc.doc_id,
                fields: record.fields,
                content: record.content.unwrap_or_default(),
                attributes: record.attributes.unwrap_or_default(),
                scores,
                token_snippet_locs: doc.token_snippet_locs.clone(),
                token_locs: doc.token_locs.clone(),
            });
        }

        if count_only || defer_sort {
            return Ok((output, matched));
        }

        sort_by_primary(&mut output, options.reverse_order);
        let range = options.output_range(output.len());
        let output = paginate(output, range);

        debug!(
            target: "docrank::ranker",
            candidates = docs.len(),
            matched,
            returned = output.len(),
            filters = filters.len(),
            criteria = options.scoring_criteria.name(),
            "Ranked by document"
        );
        Ok((output, matched))
    }

    fn snapshot(&self, doc_id: DocId) -> Result<Option<DocRecord<F>>> {
        let record = self.registry.snapshot(doc_id)?;
        if record.is_none() {
            debug!(target: "docrank::ranker", doc_id, "Candidate no longer registered, skipping");
        }
        Ok(record)
    }

    fn snapshot_fields(&self, doc_id: DocId) -> Result<Option<Option<F>>> {
        let fields = self.registry.snapshot_fields(doc_id)?;
        if fields.is_none() {
            debug!(target: "docrank::ranker", doc_id, "Candidate no longer registered, skipping");
        }
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::{FieldWeightedCriteria, FieldWeights, TokenProximityCriteria};

    fn bm25_criteria() -> impl ScoringCriteria<u32> {
        |doc: &IndexedDoc, _fields: Option<&u32>| vec![doc.bm25]
    }

    fn ranker(id_only: bool) -> Ranker<u32> {
        let r = Ranker::new();
        r.init(id_only).unwrap();
        r
    }

    #[test]
    fn test_output_range() {
        assert_eq!(output_range(0, 0, 5), 0..5);
        assert_eq!(output_range(1, 3, 5), 1..4);
        assert_eq!(output_range(3, 10, 5), 3..5);
        assert_eq!(output_range(7, 2, 5), 5..5);
        assert_eq!(output_range(7, 0, 5), 5..5);
        assert_eq!(output_range(usize::MAX, usize::MAX, 5), 5..5);
        assert_eq!(output_range(0, 3, 0), 0..0);
    }

    #[test]
    fn test_paginate() {
        assert_eq!(paginate(vec![0, 1, 2, 3, 4], 1..4), vec![1, 2, 3]);
        assert_eq!(paginate(vec![0, 1, 2], 3..3), Vec::<i32>::new());
    }

    #[test]
    fn test_rank_before_init_fails() {
        let r: Ranker<u32> = Ranker::new();
        let opts = RankOpts::new(TokenProximityCriteria);
        let res = r.rank(&[IndexedDoc::new(1)], &opts, false, &[], false);
        assert!(matches!(res, Err(Error::NotInitialized)));
        assert!(matches!(
            r.rank_by_id(&[], &opts, false),
            Err(Error::NotInitialized)
        ));
    }

    #[test]
    fn test_rank_by_document_on_id_only_fails() {
        let r = ranker(true);
        let opts = RankOpts::new(TokenProximityCriteria);
        let res = r.rank_by_document(&[], &opts, false, &[], false);
        assert!(matches!(res, Err(Error::ModeMismatch(_))));
    }

    #[test]
    fn test_rank_by_id_on_full_registry() {
        let r = ranker(false);
        r.add_doc(1, Some(1), Some("content".into()), None).unwrap();
        let opts = RankOpts::new(bm25_criteria());
        let (ids, matched) = r
            .rank_by_id(&[IndexedDoc::new(1).with_bm25(1.0)], &opts, false)
            .unwrap();
        assert_eq!(matched, 1);
        assert_eq!(ids[0].doc_id, 1);
    }

    #[test]
    fn test_unregistered_candidates_skipped() {
        let r = ranker(false);
        r.add_doc(1, Some(1), None, None).unwrap();
        let opts = RankOpts::new(bm25_criteria());
        let docs = vec![IndexedDoc::new(1), IndexedDoc::new(2)];
        let ranked = r.rank(&docs, &opts, false, &[], false).unwrap();
        assert_eq!(ranked.matched, 1);
        assert_eq!(ranked.docs.doc_ids(), vec![1]);
    }

    #[test]
    fn test_ascending_and_descending() {
        let r = ranker(true);
        for id in 1..=3 {
            r.add_doc(id, Some(0), None, None).unwrap();
        }
        let docs = vec![
            IndexedDoc::new(1).with_bm25(0.5),
            IndexedDoc::new(2).with_bm25(0.1),
            IndexedDoc::new(3).with_bm25(0.9),
        ];

        let opts = RankOpts::new(bm25_criteria());
        let asc = r.rank(&docs, &opts, false, &[], false).unwrap();
        assert_eq!(asc.docs.doc_ids(), vec![2, 1, 3]);

        let desc = r
            .rank(&docs, &opts.clone().reversed(true), false, &[], false)
            .unwrap();
        assert_eq!(desc.docs.doc_ids(), vec![3, 1, 2]);
    }

    #[test]
    fn test_ties_keep_candidate_order() {
        let r = ranker(true);
        for id in 1..=4 {
            r.add_doc(id, Some(0), None, None).unwrap();
        }
        let docs: Vec<_> = [4, 2, 3, 1]
            .iter()
            .map(|&id| IndexedDoc::new(id).with_bm25(1.0))
            .collect();
        let opts = RankOpts::new(bm25_criteria());

        let asc = r.rank(&docs, &opts, false, &[], false).unwrap();
        assert_eq!(asc.docs.doc_ids(), vec![4, 2, 3, 1]);

        let desc = r
            .rank(&docs, &opts.clone().reversed(true), false, &[], false)
            .unwrap();
        assert_eq!(desc.docs.doc_ids(), vec![4, 2, 3, 1]);
    }

    #[test]
    fn test_count_only_returns_no_docs() {
        let r = ranker(false);
        r.add_doc(1, Some(1), None, None).unwrap();
        r.add_doc(2, Some(1), None, None).unwrap();
        let opts = RankOpts::new(bm25_criteria()).with_max_outputs(1);
        let docs = vec![IndexedDoc::new(1), IndexedDoc::new(2)];
        let ranked = r.rank(&docs, &opts, true, &[], false).unwrap();
        assert_eq!(ranked.matched, 2);
        assert!(ranked.docs.is_empty());
    }

    #[test]
    fn test_defer_sort_skips_sort_and_pagination() {
        let r = ranker(false);
        for id in 1..=3 {
            r.add_doc(id, Some(0), None, None).unwrap();
        }
        let docs = vec![
            IndexedDoc::new(1).with_bm25(0.9),
            IndexedDoc::new(2).with_bm25(0.1),
            IndexedDoc::new(3).with_bm25(0.5),
        ];
        let opts = RankOpts::new(bm25_criteria()).with_max_outputs(1);
        let ranked = r.rank(&docs, &opts, false, &[], true).unwrap();
        assert_eq!(ranked.docs.doc_ids(), vec![1, 2, 3]);
        assert_eq!(ranked.matched, 3);
    }

    #[test]
    fn test_id_only_ignores_defer_sort() {
        let r = ranker(true);
        for id in 1..=2 {
            r.add_doc(id, Some(0), None, None).unwrap();
        }
        let docs = vec![
            IndexedDoc::new(1).with_bm25(0.9),
            IndexedDoc::new(2).with_bm25(0.1),
        ];
        let opts = RankOpts::new(bm25_criteria());
        let ranked = r.rank(&docs, &opts, false, &[], true).unwrap();
        assert_eq!(ranked.docs.doc_ids(), vec![2, 1]);
    }

    #[test]
    fn test_scenario_field_weighted() {
        let r: Ranker<FieldWeights> = Ranker::new();
        r.init(false).unwrap();
        r.add_doc(1, Some(FieldWeights::new(1.0, 2.0, 3.0)), None, None)
            .unwrap();
        r.add_doc(2, None, None, None).unwrap();

        let opts = RankOpts::new(FieldWeightedCriteria);
        let docs = vec![
            IndexedDoc::new(1).with_proximity(0),
            IndexedDoc::new(2).with_proximity(0),
        ];
        let ranked = r.rank(&docs, &opts, false, &[], false).unwrap();
        assert_eq!(ranked.matched, 1);
        assert_eq!(ranked.docs.doc_ids(), vec![1]);
        assert_eq!(ranked.docs.primary_scores(), vec![6.0]);
    }

    #[test]
    fn test_rank_opts_debug_shows_criteria_name() {
        let opts: RankOpts<u32> = RankOpts::new(TokenProximityCriteria).with_offset(2);
        let dbg = format!("{:?}", opts);
        assert!(dbg.contains("token-proximity"));
        assert!(dbg.contains("output_offset: 2"));
    }
}

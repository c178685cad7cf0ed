//! In-memory positional inverted index
//!
//! This module provides:
//! - DocIndex trait: the lookup interface the engine consumes
//! - InvertedIndex: posting lists keyed by token, with per-document positions
//! - Token proximity and snippet selection
//! - BM25 statistics for each candidate
//!
//! # Lookup semantics
//!
//! A lookup returns the documents containing every query token, in
//! ascending id order. For each candidate:
//! - `token_locs[i]` lists the byte offsets of query token `i`
//! - `token_snippet_locs` picks one offset per token, minimizing
//!   `Σ |loc[i] - loc[i-1] - len(token[i-1])|`
//! - `token_proximity` is that minimum (0 for a single token)
//!
//! A token indexed without locations is a label: it matches like any other
//! token but is left out of proximity and snippet selection, which run over
//! the remaining query tokens. A query of labels only has no proximity and
//! no snippet. BM25 counts a label as one occurrence.
//!
//! # Concurrency
//!
//! Posting lists live in a `DashMap`. Writers are serialized by one mutex,
//! so replacing a document is atomic with respect to other writers.
//! Lookups take no writer lock and read one posting list at a time, so a
//! lookup may observe a document that is concurrently being added or
//! removed on some tokens but not others; the ranker's registry check is
//! the source of truth for presence.

use crate::segmenter::TokenData;
use dashmap::DashMap;
use docrank_core::{DocId, IndexedDoc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::{DEFAULT_BM25_B, DEFAULT_BM25_K1};

// ============================================================================
// DocIndex Trait
// ============================================================================

/// Pluggable index interface
pub trait DocIndex: Send + Sync {
    /// Index a document's tokens, replacing any earlier version
    fn add(&self, doc_id: DocId, tokens: &[TokenData]);

    /// Drop a document; returns whether it was indexed
    fn remove(&self, doc_id: DocId) -> bool;

    /// Candidates containing every token
    fn lookup(&self, tokens: &[String]) -> Vec<IndexedDoc>;

    /// Number of indexed documents
    fn len(&self) -> usize;

    /// True when nothing is indexed
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Bm25Params
// ============================================================================

/// BM25 tuning parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    /// Term frequency saturation
    pub k1: f32,
    /// Length normalization
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Bm25Params {
            k1: DEFAULT_BM25_K1,
            b: DEFAULT_BM25_B,
        }
    }
}

impl Bm25Params {
    /// Smoothed IDF: `ln((N - df + 0.5) / (df + 0.5) + 1)`
    pub fn idf(total_docs: usize, doc_freq: usize) -> f32 {
        let n = total_docs as f32;
        let df = doc_freq as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Term score for frequency `tf` in a document of `doc_len` tokens
    pub fn term_score(&self, idf: f32, tf: f32, doc_len: f32, avg_doc_len: f32) -> f32 {
        let avg_len = avg_doc_len.max(1.0);
        idf * (tf * (self.k1 + 1.0)) / (tf + self.k1 * (1.0 - self.b + self.b * doc_len / avg_len))
    }
}

// ============================================================================
// InvertedIndex
// ============================================================================

struct DocEntry {
    /// Distinct tokens, for removal
    terms: Vec<String>,
    /// Total token occurrences
    len: u64,
}

/// Positional inverted index
pub struct InvertedIndex {
    /// token -> doc_id -> byte offsets
    postings: DashMap<String, BTreeMap<DocId, Vec<usize>>>,
    docs: DashMap<DocId, DocEntry>,
    total_len: AtomicU64,
    params: Bm25Params,
    /// Serializes add/remove so a re-add never interleaves with another
    writer: Mutex<()>,
}

impl Default for InvertedIndex {
    fn default() -> Self {
        Self::new(Bm25Params::default())
    }
}

impl InvertedIndex {
    /// Create an empty index
    pub fn new(params: Bm25Params) -> Self {
        InvertedIndex {
            postings: DashMap::new(),
            docs: DashMap::new(),
            total_len: AtomicU64::new(0),
            params,
            writer: Mutex::new(()),
        }
    }

    /// BM25 parameters in use
    pub fn params(&self) -> Bm25Params {
        self.params
    }

    /// Number of documents containing `token`
    pub fn doc_freq(&self, token: &str) -> usize {
        self.postings.get(token).map(|p| p.len()).unwrap_or(0)
    }

    /// Average document length in tokens
    pub fn avg_doc_len(&self) -> f32 {
        let n = self.docs.len();
        if n == 0 {
            return 0.0;
        }
        self.total_len.load(Ordering::Relaxed) as f32 / n as f32
    }

    /// Caller holds `writer`
    fn remove_entry(&self, doc_id: DocId) -> bool {
        let (_, entry) = match self.docs.remove(&doc_id) {
            Some(removed) => removed,
            None => return false,
        };

        for term in &entry.terms {
            if let Some(mut postings) = self.postings.get_mut(term) {
                postings.remove(&doc_id);
            }
            self.postings.remove_if(term, |_, p| p.is_empty());
        }
        self.total_len.fetch_sub(entry.len, Ordering::Relaxed);
        true
    }

    fn bm25(&self, tokens: &[String], locs: &[Vec<usize>], doc_len: u64) -> f32 {
        let total_docs = self.docs.len();
        let avg_doc_len = self.avg_doc_len();
        let mut seen = HashSet::new();
        let mut score = 0.0;
        for (token, token_locs) in tokens.iter().zip(locs) {
            if !seen.insert(token.as_str()) {
                continue;
            }
            let idf = Bm25Params::idf(total_docs, self.doc_freq(token));
            score += self.params.term_score(
                idf,
                token_locs.len().max(1) as f32,
                doc_len as f32,
                avg_doc_len,
            );
        }
        score
    }
}

impl DocIndex for InvertedIndex {
    fn add(&self, doc_id: DocId, tokens: &[TokenData]) {
        let mut merged: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for token in tokens {
            merged
                .entry(token.text.as_str())
                .or_default()
                .extend_from_slice(&token.locations);
        }

        let _writer = self.writer.lock();
        self.remove_entry(doc_id);

        let mut terms = Vec::with_capacity(merged.len());
        let mut len = 0u64;
        for (text, mut locations) in merged {
            locations.sort_unstable();
            locations.dedup();
            len += locations.len() as u64;
            self.postings
                .entry(text.to_string())
                .or_default()
                .insert(doc_id, locations);
            terms.push(text.to_string());
        }

        self.total_len.fetch_add(len, Ordering::Relaxed);
        self.docs.insert(doc_id, DocEntry { terms, len });
    }

    fn remove(&self, doc_id: DocId) -> bool {
        let _writer = self.writer.lock();
        self.remove_entry(doc_id)
    }

    fn lookup(&self, tokens: &[String]) -> Vec<IndexedDoc> {
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut shortest: Option<(usize, &String)> = None;
        for token in tokens {
            let df = self.doc_freq(token);
            if df == 0 {
                return Vec::new();
            }
            if shortest.map_or(true, |(best, _)| df < best) {
                shortest = Some((df, token));
            }
        }
        let doc_ids: Vec<DocId> = match shortest.and_then(|(_, t)| self.postings.get(t)) {
            Some(postings) => postings.keys().copied().collect(),
            None => return Vec::new(),
        };

        let token_lens: Vec<usize> = tokens.iter().map(|t| t.len()).collect();
        let mut candidates = Vec::new();

        for doc_id in doc_ids {
            let locs: Option<Vec<Vec<usize>>> = tokens
                .iter()
                .map(|t| self.postings.get(t).and_then(|p| p.get(&doc_id).cloned()))
                .collect();
            let locs = match locs {
                Some(locs) => locs,
                None => continue,
            };
            let doc_len = match self.docs.get(&doc_id) {
                Some(entry) => entry.len,
                None => continue,
            };

            // label-only tokens carry no positions and sit out proximity
            let (proximity, snippet) = if locs.iter().all(|l| !l.is_empty()) {
                token_proximity(&locs, &token_lens)
            } else {
                let (pos_locs, pos_lens): (Vec<Vec<usize>>, Vec<usize>) = locs
                    .iter()
                    .zip(&token_lens)
                    .filter(|(l, _)| !l.is_empty())
                    .map(|(l, n)| (l.clone(), *n))
                    .unzip();
                token_proximity(&pos_locs, &pos_lens)
            };
            let bm25 = self.bm25(tokens, &locs, doc_len);
            candidates.push(
                IndexedDoc::new(doc_id)
                    .with_proximity(proximity)
                    .with_bm25(bm25)
                    .with_token_locs(locs)
                    .with_snippet_locs(snippet),
            );
        }
        candidates
    }

    fn len(&self) -> usize {
        self.docs.len()
    }
}

/// Minimal positional distance across consecutive query tokens.
///
/// Dynamic program over each token's positions: the cost of choosing
/// position `p` for token `i` is the best cost for token `i - 1` plus
/// `|p - prev - len(token[i-1])|`. Returns the minimum total cost and the
/// chosen positions.
pub fn token_proximity(locs: &[Vec<usize>], token_lens: &[usize]) -> (i32, Vec<usize>) {
    if locs.is_empty() || locs.iter().any(|l| l.is_empty()) {
        return (docrank_core::NO_PROXIMITY, Vec::new());
    }

    let mut costs: Vec<Vec<u64>> = Vec::with_capacity(locs.len());
    let mut back: Vec<Vec<usize>> = Vec::with_capacity(locs.len());
    costs.push(vec![0; locs[0].len()]);
    back.push(vec![0; locs[0].len()]);

    for i in 1..locs.len() {
        let prev_len = token_lens.get(i - 1).copied().unwrap_or(0);
        let mut row_cost = Vec::with_capacity(locs[i].len());
        let mut row_back = Vec::with_capacity(locs[i].len());
        for &pos in &locs[i] {
            let mut best = (u64::MAX, 0);
            for (k, &prev) in locs[i - 1].iter().enumerate() {
                let gap = (pos as i64 - prev as i64 - prev_len as i64).unsigned_abs();
                let cost = costs[i - 1][k].saturating_add(gap);
                if cost < best.0 {
                    best = (cost, k);
                }
            }
            row_cost.push(best.0);
            row_back.push(best.1);
        }
        costs.push(row_cost);
        back.push(row_back);
    }

    let last = locs.len() - 1;
    let (mut idx, min_cost) = costs[last]
        .iter()
        .enumerate()
        .min_by_key(|(_, c)| **c)
        .map(|(j, c)| (j, *c))
        .unwrap_or((0, 0));

    let mut snippet = vec![0; locs.len()];
    for i in (0..locs.len()).rev() {
        snippet[i] = locs[i][idx];
        idx = back[i][idx];
    }

    (i32::try_from(min_cost).unwrap_or(i32::MAX), snippet)
}

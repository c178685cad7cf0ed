//! Engine configuration via `docrank.toml`
//!
//! Every key is optional; a missing file section falls back to the default.
//! Unknown keys are rejected so typos do not silently change behavior.

use docrank_core::{Error, Result};
use docrank_search::{RankOpts, ScoringCriteria};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Config file name placed next to the data directory.
pub const CONFIG_FILE_NAME: &str = "docrank.toml";

/// Default BM25 term saturation parameter
pub const DEFAULT_BM25_K1: f32 = 2.0;
/// Default BM25 length normalization parameter
pub const DEFAULT_BM25_B: f32 = 0.75;

fn default_bm25_k1() -> f32 {
    DEFAULT_BM25_K1
}

fn default_bm25_b() -> f32 {
    DEFAULT_BM25_B
}

/// Engine configuration loaded from `docrank.toml`.
///
/// # Example
///
/// ```toml
/// id_only = false
/// reverse_order = true
/// max_outputs = 20
/// search_timeout_ms = 50
/// store_path = "data/docs.json"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Keep only scoring fields; results carry ids and scores only.
    #[serde(default)]
    pub id_only: bool,
    /// Default sort direction: descending when true.
    #[serde(default)]
    pub reverse_order: bool,
    /// Default number of sorted results to skip.
    #[serde(default)]
    pub output_offset: usize,
    /// Default maximum number of results (0 = unbounded).
    #[serde(default)]
    pub max_outputs: usize,
    /// Deadline in milliseconds from search start to ranking (0 = none).
    #[serde(default)]
    pub search_timeout_ms: u64,
    /// JSON document store location; documents are not persisted when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
    /// BM25 k1 parameter.
    #[serde(default = "default_bm25_k1")]
    pub bm25_k1: f32,
    /// BM25 b parameter.
    #[serde(default = "default_bm25_b")]
    pub bm25_b: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            id_only: false,
            reverse_order: false,
            output_offset: 0,
            max_outputs: 0,
            search_timeout_ms: 0,
            store_path: None,
            bm25_k1: DEFAULT_BM25_K1,
            bm25_b: DEFAULT_BM25_B,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::InvalidConfig(msg) => {
                Error::InvalidConfig(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Write the commented default config if `path` does not exist yet.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when `bm25_k1` is negative or `bm25_b` is outside
    /// `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.bm25_k1.is_nan() || self.bm25_k1 < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "bm25_k1 must be non-negative, got {}",
                self.bm25_k1
            )));
        }
        if !(0.0..=1.0).contains(&self.bm25_b) {
            return Err(Error::InvalidConfig(format!(
                "bm25_b must be within [0, 1], got {}",
                self.bm25_b
            )));
        }
        Ok(())
    }

    /// Default rank options for the given strategy
    pub fn rank_opts<F>(&self, criteria: Arc<dyn ScoringCriteria<F>>) -> RankOpts<F> {
        RankOpts::with_criteria(criteria)
            .reversed(self.reverse_order)
            .with_offset(self.output_offset)
            .with_max_outputs(self.max_outputs)
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# docrank engine configuration

# Store only scoring fields (no content, no attributes, no filtering).
id_only = false

# Default ordering and pagination, overridable per search.
reverse_order = false
output_offset = 0
max_outputs = 0          # 0 = unbounded

# Deadline between search start and ranking, in milliseconds (0 = none).
search_timeout_ms = 0

# Persist documents as JSON. Omit to keep documents in memory only.
# store_path = "docrank-docs.json"

# BM25 parameters used by the built-in index.
bm25_k1 = 2.0
bm25_b = 0.75
"#
    }
}

//! Text segmentation
//!
//! The engine only needs `text -> tokens with byte offsets`. The default
//! segmenter splits on UAX#29 word boundaries and lowercases; anything more
//! elaborate (dictionaries, stemming, CJK models) plugs in via `Segmenter`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

/// One distinct token of a document and every byte offset it occurs at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    /// Token text
    pub text: String,
    /// Byte offsets of each occurrence, ascending
    pub locations: Vec<usize>,
}

impl TokenData {
    /// Create a token with its locations
    pub fn new(text: impl Into<String>, locations: Vec<usize>) -> Self {
        TokenData {
            text: text.into(),
            locations,
        }
    }
}

/// Pluggable segmentation interface
pub trait Segmenter: Send + Sync {
    /// Split text into tokens paired with their byte offsets, in text order
    fn segment(&self, text: &str) -> Vec<(String, usize)>;

    /// Distinct query tokens in first-occurrence order
    fn query_tokens(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.segment(text)
            .into_iter()
            .map(|(t, _)| t)
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }

    /// Group a document's tokens by text, preserving first-occurrence order
    fn document_tokens(&self, text: &str) -> Vec<TokenData> {
        let mut grouped: Vec<TokenData> = Vec::new();
        for (token, offset) in self.segment(text) {
            match grouped.iter_mut().find(|t| t.text == token) {
                Some(existing) => existing.locations.push(offset),
                None => grouped.push(TokenData::new(token, vec![offset])),
            }
        }
        grouped
    }

    /// Index token for a document label; labels are never segmented
    fn label_token(&self, label: &str) -> String {
        label.trim().to_string()
    }
}

/// UAX#29 word segmenter with lowercasing.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeSegmenter;

impl Segmenter for UnicodeSegmenter {
    fn segment(&self, text: &str) -> Vec<(String, usize)> {
        text.unicode_word_indices()
            .map(|(offset, word)| (word.to_lowercase(), offset))
            .collect()
    }

    fn label_token(&self, label: &str) -> String {
        label.trim().to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_with_offsets() {
        let tokens = UnicodeSegmenter.segment("The world, hello World");
        assert_eq!(
            tokens,
            vec![
                ("the".to_string(), 0),
                ("world".to_string(), 4),
                ("hello".to_string(), 11),
                ("world".to_string(), 17),
            ]
        );
    }

    #[test]
    fn test_segment_empty() {
        assert!(UnicodeSegmenter.segment("").is_empty());
        assert!(UnicodeSegmenter.segment("... --- ...").is_empty());
    }

    #[test]
    fn test_query_tokens_deduplicated() {
        let tokens = UnicodeSegmenter.query_tokens("World world population");
        assert_eq!(tokens, vec!["world", "population"]);
    }

    #[test]
    fn test_document_tokens_grouped() {
        let tokens = UnicodeSegmenter.document_tokens("rust is rust");
        assert_eq!(
            tokens,
            vec![TokenData::new("rust", vec![0, 8]), TokenData::new("is", vec![5])]
        );
    }

    #[test]
    fn test_label_token_kept_whole() {
        assert_eq!(UnicodeSegmenter.label_token(" Science-Fiction "), "science-fiction");
        assert_eq!(UnicodeSegmenter.segment("Science-Fiction").len(), 2);
    }
}

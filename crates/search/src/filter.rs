//! Attribute filter evaluation
//!
//! Filters run in order against a document's attributes. The first filter
//! that compares `false` excludes the document. A filter whose attribute is
//! missing, or whose value cannot be compared with the stored one, is not
//! applicable: it is logged and skipped, and evaluation continues.

use docrank_core::{Attributes, DocId, FilterOptions};
use tracing::warn;

/// Decide whether a scored document survives the given filters.
pub fn passes_filters(
    doc_id: DocId,
    attributes: Option<&Attributes>,
    filters: &[FilterOptions],
) -> bool {
    for filter in filters {
        let stored = match attributes.and_then(|a| a.get(&filter.attr)) {
            Some(v) => v,
            None => {
                warn!(
                    target: "docrank::ranker",
                    doc_id,
                    attr = %filter.attr,
                    "Filter attribute not found on document, skipping filter"
                );
                continue;
            }
        };

        match filter.compare(stored) {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                warn!(
                    target: "docrank::ranker",
                    doc_id,
                    error = %e,
                    "Filter comparison failed, skipping filter"
                );
            }
        }
    }
    true
}

//! Shared per-document scoring state
//!
//! The registry maps document ids to the fields, content and attributes the
//! ranker needs. It is the only shared mutable state in the ranking path.
//!
//! # Locking
//!
//! One `parking_lot::RwLock` guards the whole map:
//! - `add_doc` / `remove_doc` take the write lock once per call, so a
//!   document's fields, content and attributes always change together
//! - `snapshot` takes the read lock for exactly one document and clones it
//!
//! # Lifecycle
//!
//! `Uninitialized -> Ready`. `init` fixes the mode (ID-only or full document)
//! for the registry's lifetime; a second `init` fails with
//! `AlreadyInitialized`, and every other operation fails with
//! `NotInitialized` until `init` has run.

use docrank_core::{Attributes, DocId, Error, Result};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::info;

// ============================================================================
// RegistryMode
// ============================================================================

/// Storage mode, fixed at initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryMode {
    /// Only fields are kept; output carries ids and scores
    IdOnly,
    /// Fields, content and attributes are kept; output carries full documents
    FullDocument,
}

impl RegistryMode {
    /// Mode for the given `id_only` flag
    pub fn from_id_only(id_only: bool) -> Self {
        if id_only {
            RegistryMode::IdOnly
        } else {
            RegistryMode::FullDocument
        }
    }
}

// ============================================================================
// DocRecord
// ============================================================================

/// Everything the registry knows about one document.
///
/// `content` and `attributes` are always `None` in an ID-only registry.
#[derive(Debug, Clone, PartialEq)]
pub struct DocRecord<F> {
    /// Scoring payload, interpreted only by scoring strategies
    pub fields: Option<F>,
    /// Raw content
    pub content: Option<String>,
    /// Named attributes used by filters
    pub attributes: Option<Attributes>,
}

impl<F> Default for DocRecord<F> {
    fn default() -> Self {
        DocRecord {
            fields: None,
            content: None,
            attributes: None,
        }
    }
}

// ============================================================================
// DocumentRegistry
// ============================================================================

/// Lock-protected table of registered documents.
pub struct DocumentRegistry<F> {
    mode: OnceCell<RegistryMode>,
    docs: RwLock<HashMap<DocId, DocRecord<F>>>,
}

impl<F> Default for DocumentRegistry<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> DocumentRegistry<F> {
    /// Create an uninitialized registry
    pub fn new() -> Self {
        DocumentRegistry {
            mode: OnceCell::new(),
            docs: RwLock::new(HashMap::new()),
        }
    }

    /// One-time setup.
    ///
    /// # Errors
    ///
    /// `AlreadyInitialized` when called a second time; the first mode is
    /// kept.
    pub fn init(&self, id_only: bool) -> Result<()> {
        let mode = RegistryMode::from_id_only(id_only);
        self.mode
            .set(mode)
            .map_err(|_| Error::AlreadyInitialized)?;
        info!(target: "docrank::registry", ?mode, "Registry initialized");
        Ok(())
    }

    /// Current mode, or `NotInitialized`
    pub fn mode(&self) -> Result<RegistryMode> {
        self.mode.get().copied().ok_or(Error::NotInitialized)
    }

    /// True once `init` has succeeded
    pub fn is_initialized(&self) -> bool {
        self.mode.get().is_some()
    }

    /// True when the registry was initialized in ID-only mode
    pub fn is_id_only(&self) -> Result<bool> {
        Ok(self.mode()? == RegistryMode::IdOnly)
    }

    /// Insert or overwrite a document.
    ///
    /// Fields are always replaced. Content and attributes are stored only in
    /// full-document mode, and only when supplied; omitting them keeps
    /// whatever an earlier `add_doc` stored for the same id.
    pub fn add_doc(
        &self,
        doc_id: DocId,
        fields: Option<F>,
        content: Option<String>,
        attributes: Option<Attributes>,
    ) -> Result<()> {
        let mode = self.mode()?;

        let mut docs = self.docs.write();
        let record = docs.entry(doc_id).or_default();
        record.fields = fields;
        if mode == RegistryMode::FullDocument {
            if content.is_some() {
                record.content = content;
            }
            if attributes.is_some() {
                record.attributes = attributes;
            }
        }
        Ok(())
    }

    /// Remove a document. Removing an unknown id is a no-op.
    ///
    /// Returns whether the document was present.
    pub fn remove_doc(&self, doc_id: DocId) -> Result<bool> {
        self.mode()?;
        Ok(self.docs.write().remove(&doc_id).is_some())
    }

    /// True when the document is registered
    pub fn contains(&self, doc_id: DocId) -> Result<bool> {
        self.mode()?;
        Ok(self.docs.read().contains_key(&doc_id))
    }

    /// Number of registered documents
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    /// True when no document is registered
    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }
}

impl<F: Clone> DocumentRegistry<F> {
    /// Clone one document's state under a single read-lock acquisition.
    ///
    /// Returns `Ok(None)` when the document is not registered.
    pub fn snapshot(&self, doc_id: DocId) -> Result<Option<DocRecord<F>>> {
        self.mode()?;
        Ok(self.docs.read().get(&doc_id).cloned())
    }

    /// Clone only the fields of one document.
    ///
    /// The outer `Option` is presence; the inner one is the registered
    /// payload, which may itself be absent.
    pub fn snapshot_fields(&self, doc_id: DocId) -> Result<Option<Option<F>>> {
        self.mode()?;
        Ok(self.docs.read().get(&doc_id).map(|r| r.fields.clone()))
    }
}

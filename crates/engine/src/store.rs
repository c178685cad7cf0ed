//! Document persistence
//!
//! A `DocStore` keeps the inputs of every indexed document so an engine can
//! rebuild its registry and index on startup. Two implementations ship:
//!
//! - `MemoryStore`: nothing survives the process
//! - `JsonFileStore`: an append-only JSON-lines log, compacted on open
//!
//! Each log line is one `save` or `remove` record. It is a convenience
//! format for small corpora, not a stable interchange format.

use crate::engine::DocData;
use docrank_core::{DocId, Error, Result};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Pluggable persistence interface
pub trait DocStore<F>: Send + Sync {
    /// Persist a document, replacing any earlier version
    fn save(&self, doc_id: DocId, doc: &DocData<F>) -> Result<()>;

    /// Forget a document; unknown ids are a no-op
    fn remove(&self, doc_id: DocId) -> Result<()>;

    /// Every stored document in ascending id order
    fn load(&self) -> Result<Vec<(DocId, DocData<F>)>>;
}

// ============================================================================
// MemoryStore
// ============================================================================

/// Volatile store backed by a map.
pub struct MemoryStore<F> {
    docs: RwLock<BTreeMap<DocId, DocData<F>>>,
}

impl<F> Default for MemoryStore<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> MemoryStore<F> {
    /// Create an empty store
    pub fn new() -> Self {
        MemoryStore {
            docs: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }
}

impl<F: Clone + Send + Sync> DocStore<F> for MemoryStore<F> {
    fn save(&self, doc_id: DocId, doc: &DocData<F>) -> Result<()> {
        self.docs.write().insert(doc_id, doc.clone());
        Ok(())
    }

    fn remove(&self, doc_id: DocId) -> Result<()> {
        self.docs.write().remove(&doc_id);
        Ok(())
    }

    fn load(&self) -> Result<Vec<(DocId, DocData<F>)>> {
        Ok(self
            .docs
            .read()
            .iter()
            .map(|(id, doc)| (*id, doc.clone()))
            .collect())
    }
}

// ============================================================================
// JsonFileStore
// ============================================================================

/// One line of the log. `D` is borrowed when writing, owned when reading.
#[derive(Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum LogRecord<D> {
    Save { doc_id: DocId, doc: D },
    Remove { doc_id: DocId },
}

struct LogState<F> {
    docs: BTreeMap<DocId, DocData<F>>,
    log: File,
}

/// Store persisted as an append-only JSON-lines log.
///
/// Every change appends one line and syncs it. Opening the store replays
/// the log, then rewrites it atomically (temp + rename) with one `save`
/// line per live document. A torn last line, left by a crash mid-append,
/// is dropped on replay.
///
/// Documents that would not read back, such as ones holding non-finite
/// floats, are rejected before anything is written.
pub struct JsonFileStore<F> {
    path: PathBuf,
    state: RwLock<LogState<F>>,
}

impl<F> JsonFileStore<F>
where
    F: Serialize + DeserializeOwned,
{
    /// Open the store at `path`, replaying and compacting its log.
    ///
    /// A missing file is an empty store and is created here.
    ///
    /// # Errors
    ///
    /// `Io` when the file cannot be read or written and `Serialization` when
    /// a complete line is not a valid record.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let docs = if path.exists() {
            let docs = replay(&path)?;
            compact(&path, &docs)?;
            docs
        } else {
            BTreeMap::new()
        };
        let log = open_log(&path)?;

        info!(
            target: "docrank::store",
            path = %path.display(),
            docs = docs.len(),
            "Opened document store"
        );
        Ok(JsonFileStore {
            path,
            state: RwLock::new(LogState { docs, log }),
        })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.state.read().docs.len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.state.read().docs.is_empty()
    }

    fn append(&self, log: &mut File, line: &[u8]) -> Result<()> {
        let offset = log.metadata()?.len();
        let written = log.write_all(line).and_then(|_| log.sync_data());
        written.map_err(|e| {
            // drop the partial line so later appends stay parseable
            let _ = log.set_len(offset);
            warn!(
                target: "docrank::store",
                path = %self.path.display(),
                error = %e,
                "Failed to append to document store"
            );
            Error::Storage(format!("{}: {}", self.path.display(), e))
        })
    }
}

fn encode_save<F>(doc_id: DocId, doc: &DocData<F>) -> Result<Vec<u8>>
where
    F: Serialize + DeserializeOwned,
{
    let mut line = serde_json::to_vec(&LogRecord::Save { doc_id, doc })?;
    // non-finite floats serialize as null and would fail the next replay
    serde_json::from_slice::<LogRecord<DocData<F>>>(&line).map_err(|e| {
        Error::Serialization(format!("document {} cannot be stored: {}", doc_id, e))
    })?;
    line.push(b'\n');
    Ok(line)
}

fn replay<F: DeserializeOwned>(path: &Path) -> Result<BTreeMap<DocId, DocData<F>>> {
    let text = std::fs::read_to_string(path)?;
    let complete = text.ends_with('\n');
    let lines: Vec<&str> = text.lines().collect();

    let mut docs = BTreeMap::new();
    for (i, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<LogRecord<DocData<F>>>(line) {
            Ok(LogRecord::Save { doc_id, doc }) => {
                docs.insert(doc_id, doc);
            }
            Ok(LogRecord::Remove { doc_id }) => {
                docs.remove(&doc_id);
            }
            Err(e) if i + 1 == lines.len() && !complete => {
                warn!(
                    target: "docrank::store",
                    path = %path.display(),
                    error = %e,
                    "Dropping torn last record"
                );
            }
            Err(e) => {
                return Err(Error::Serialization(format!(
                    "{}:{}: {}",
                    path.display(),
                    i + 1,
                    e
                )));
            }
        }
    }
    Ok(docs)
}

fn compact<F: Serialize>(path: &Path, docs: &BTreeMap<DocId, DocData<F>>) -> Result<()> {
    let mut payload = Vec::new();
    for (doc_id, doc) in docs {
        serde_json::to_writer(
            &mut payload,
            &LogRecord::Save {
                doc_id: *doc_id,
                doc,
            },
        )?;
        payload.push(b'\n');
    }

    let tmp_path = path.with_extension("json.tmp");
    let written = (|| -> std::io::Result<()> {
        let mut file = File::create(&tmp_path)?;
        file.write_all(&payload)?;
        file.sync_all()?;
        std::fs::rename(&tmp_path, path)
    })();

    written.map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        warn!(
            target: "docrank::store",
            path = %path.display(),
            error = %e,
            "Failed to compact document store"
        );
        Error::Storage(format!("{}: {}", path.display(), e))
    })
}

fn open_log(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

impl<F> DocStore<F> for JsonFileStore<F>
where
    F: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    fn save(&self, doc_id: DocId, doc: &DocData<F>) -> Result<()> {
        let line = encode_save(doc_id, doc)?;
        let mut state = self.state.write();
        self.append(&mut state.log, &line)?;
        state.docs.insert(doc_id, doc.clone());
        Ok(())
    }

    fn remove(&self, doc_id: DocId) -> Result<()> {
        let mut state = self.state.write();
        if !state.docs.contains_key(&doc_id) {
            return Ok(());
        }
        let mut line = serde_json::to_vec(&LogRecord::<()>::Remove { doc_id })?;
        line.push(b'\n');
        self.append(&mut state.log, &line)?;
        state.docs.remove(&doc_id);
        Ok(())
    }

    fn load(&self) -> Result<Vec<(DocId, DocData<F>)>> {
        Ok(self
            .state
            .read()
            .docs
            .iter()
            .map(|(id, doc)| (*id, doc.clone()))
            .collect())
    }
}

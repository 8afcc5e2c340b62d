//! JSON file backend.
//!
//! The collection lives in one JSON object keyed by patient id. Writes go to
//! a temporary file in the target directory which is then renamed over the
//! target, so a reader sees either the old file or the new one. Blocking
//! file I/O runs on tokio's blocking pool.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use medrec_core::{Collection, PatientAttributes, Verdict};
use medrec_storage::{CollectionBackend, StorageError};
use serde::Serialize;
use serde::ser::SerializeMap;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// How the collection is written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileOptions {
    /// Also write `bmi` and `verdict` next to the stored fields. They are
    /// ignored on load either way.
    pub persist_derived: bool,
    /// Indent the JSON output.
    pub pretty: bool,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            persist_derived: false,
            pretty: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
    options: FileOptions,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_options(path, FileOptions::default())
    }

    pub fn with_options(path: impl Into<PathBuf>, options: FileOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }
}

#[async_trait]
impl CollectionBackend for JsonFileBackend {
    async fn load(&self) -> Result<Collection, StorageError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_collection(&path))
            .await
            .map_err(|e| StorageError::internal(format!("load task failed: {e}")))?
    }

    async fn persist(&self, collection: &Collection) -> Result<(), StorageError> {
        let bytes = encode(collection, self.options)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(|e| StorageError::internal(format!("persist task failed: {e}")))?
    }

    fn backend_name(&self) -> &'static str {
        "json-file"
    }
}

fn read_collection(path: &Path) -> Result<Collection, StorageError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Collection file missing, starting empty");
            return Ok(Collection::new());
        }
        Err(e) => {
            return Err(StorageError::io(format!("read {}: {e}", path.display())));
        }
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Collection::new());
    }

    let collection: Collection = serde_json::from_slice(&bytes).map_err(|e| {
        StorageError::serialization(format!("decode {}: {e}", path.display()))
    })?;

    for patient in collection.iter() {
        if let Err(issues) = patient.attributes.check() {
            warn!(patient.id = %patient.id, %issues, "Stored patient violates field constraints");
        }
    }

    Ok(collection)
}

fn encode(collection: &Collection, options: FileOptions) -> Result<Vec<u8>, StorageError> {
    let result = match (options.persist_derived, options.pretty) {
        (false, false) => serde_json::to_vec(collection),
        (false, true) => serde_json::to_vec_pretty(collection),
        (true, false) => serde_json::to_vec(&WithDerived(collection)),
        (true, true) => serde_json::to_vec_pretty(&WithDerived(collection)),
    };
    result.map_err(|e| StorageError::serialization(format!("encode collection: {e}")))
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_err = |e: std::io::Error| StorageError::io(format!("write {}: {e}", path.display()));

    fs::create_dir_all(dir).map_err(io_err)?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// Legacy on-disk layout: stored fields plus `bmi` and `verdict`.
struct WithDerived<'a>(&'a Collection);

#[derive(Serialize)]
struct DerivedEntry<'a> {
    #[serde(flatten)]
    attributes: &'a PatientAttributes,
    bmi: f64,
    verdict: Verdict,
}

impl Serialize for WithDerived<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for patient in self.0.iter() {
            let entry = DerivedEntry {
                attributes: &patient.attributes,
                bmi: patient.bmi(),
                verdict: patient.verdict(),
            };
            map.serialize_entry(&patient.id, &entry)?;
        }
        map.end()
    }
}

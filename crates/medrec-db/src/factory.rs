use std::path::PathBuf;
use std::sync::Arc;

use medrec_storage::DynBackend;
use serde::{Deserialize, Serialize};

use crate::{FileOptions, JsonFileBackend, MemoryBackend};

/// Supported backend types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// JSON file on local disk
    #[default]
    File,
    /// Process memory; contents are lost on restart
    Memory,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Factory configuration to construct a backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Collection file; only used by the file backend.
    pub path: PathBuf,
    pub file_options: FileOptions,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::File,
            path: PathBuf::from("patients.json"),
            file_options: FileOptions::default(),
        }
    }
}

pub fn create_backend(config: &BackendConfig) -> DynBackend {
    match config.kind {
        BackendKind::File => Arc::new(JsonFileBackend::with_options(
            config.path.clone(),
            config.file_options,
        )),
        BackendKind::Memory => Arc::new(MemoryBackend::new()),
    }
}

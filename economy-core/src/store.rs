//! Single-document JSON store
//!
//! The entire application state is one JSON document. Readers load it in
//! full; writers rewrite it in full. The store itself holds no locks and
//! no cache; serialization of access is the actor's job (see
//! [`crate::actor`]).

use crate::error::Result;
use crate::types::EconomyData;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Storage for the persisted economy document
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Create a store backed by the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document; a missing file is the empty document
    ///
    /// A file that exists but does not parse is an error, never replaced
    /// with empty state.
    pub fn load(&self) -> Result<EconomyData> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("data file {:?} not found, starting empty", self.path);
                return Ok(EconomyData::default());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&raw)?)
    }

    /// Overwrite the document wholesale
    ///
    /// Pretty-printed with 2-space indentation, the layout the legacy
    /// deployment wrote.
    pub fn save(&self, data: &EconomyData) -> Result<()> {
        let raw = serde_json::to_string_pretty(data)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

//! Document-layer seam.
//!
//! The PSB document tree itself (record tables, name indexing, binary
//! layout) lives outside this crate.  The extraction engine only ever needs
//! two things from it: the directory structure of an archive manifest, and
//! a best-effort textual decompilation of an entry.  Both arrive through
//! [`DocumentAdapter`], so a real PSB parser can be plugged in without
//! touching the engine.
//!
//! [`JsonDocumentAdapter`] is the built-in implementation: it understands
//! directory documents of the form
//!
//! ```json
//! { "expire_suffix_list": [".psb"],
//!   "file_info": { "entry_name": [offset, length] } }
//! ```
//!
//! and decompiles any JSON document to pretty-printed text.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use crate::extract::manifest::{Directory, ManifestEntry};

#[derive(Error, Debug)]
pub enum DocError {
    #[error("document parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("malformed directory document: {0}")]
    Directory(String),
}

pub trait DocumentAdapter: Send + Sync {
    /// Parse an unwrapped manifest document into its entry directory.
    fn parse_directory(&self, bytes: &[u8]) -> Result<Directory, DocError>;

    /// Decompile an unwrapped document to text.  Failure here is routine —
    /// the engine falls back to writing the raw bytes.
    fn decompile(&self, bytes: &[u8]) -> Result<String, DocError>;
}

// ── JSON-backed adapter ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawDirectory {
    #[serde(default)]
    expire_suffix_list: Vec<String>,
    /// BTreeMap keeps the entry order deterministic across runs.
    file_info: BTreeMap<String, (u64, u64)>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDocumentAdapter;

impl DocumentAdapter for JsonDocumentAdapter {
    fn parse_directory(&self, bytes: &[u8]) -> Result<Directory, DocError> {
        let raw: RawDirectory = serde_json::from_slice(bytes)?;
        if raw.file_info.is_empty() {
            return Err(DocError::Directory("empty file_info table".into()));
        }
        let suffix = raw.expire_suffix_list.first().cloned().unwrap_or_default();
        let entries = raw
            .file_info
            .into_iter()
            .map(|(name, (offset, length))| ManifestEntry { name, offset, length })
            .collect();
        Ok(Directory { suffix, entries })
    }

    fn decompile(&self, bytes: &[u8]) -> Result<String, DocError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

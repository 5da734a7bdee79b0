//! Archive directory model and the manifest/blob naming convention.
//!
//! A manifest named `<base>_info.psb.m` (or an extension-specific
//! equivalent) describes byte ranges inside a sibling blob named
//! `<base>_body.bin`.  Entries are built once from the parsed manifest and
//! read-only from then on; extraction never mutates them.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// One named byte range inside the companion blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Unique within one manifest.
    pub name: String,
    pub offset: u64,
    pub length: u64,
}

/// Parsed directory of an archive manifest.
///
/// Entries need not tile the blob — gaps between ranges are allowed.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    /// Filename suffix entries carry, e.g. `.psb`; also feeds per-entry key
    /// derivation.
    pub suffix: String,
    pub entries: Vec<ManifestEntry>,
}

/// Reproducibility summary written next to the extracted entries.
#[derive(Debug, Serialize)]
pub struct ResxSummary {
    /// Manifest file name the extraction ran against.
    pub source: String,
    /// Caller key material (pre-concatenation).
    pub key: String,
    pub suffix: String,
    pub entry_count: usize,
}

/// Derive the companion blob path from a manifest path: the file-name
/// portion up to `_info.` plus `_body.bin`, in the same directory.
pub fn companion_blob_path(manifest: &Path) -> Option<PathBuf> {
    let name = manifest.file_name()?.to_str()?;
    let base = name.split("_info.").next().filter(|b| *b != name)?;
    Some(manifest.with_file_name(format!("{base}_body.bin")))
}

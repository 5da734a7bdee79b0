//! Archive extraction engine.
//!
//! A manifest document (itself shell-wrapped) names byte ranges inside a
//! sibling blob file.  The engine unwraps the manifest with an archive-level
//! key, memory-maps the blob once, and drives every entry range back through
//! the shell registry with an entry-specific key — sequentially or in
//! parallel, with each entry's failure isolated from the rest.
//!
//! # Key derivation
//! - archive key = caller key + manifest file name (unwraps the manifest)
//! - entry key   = caller key + entry name + suffix (unwraps that entry)
//!
//! An empty caller key disables the cipher for the whole run.
//!
//! # Sharing model
//! The mapping is acquired once, held read-only by all workers, and released
//! when the extraction call returns — every exit path included, since the
//! `Mmap` guard lives on this function's stack.  Each worker clones the
//! archive-level context before mutating it; nothing mutable is shared.

pub mod manifest;

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use rayon::prelude::*;
use thiserror::Error;

use crate::context::ShellContext;
use crate::doc::{DocError, DocumentAdapter, JsonDocumentAdapter};
use crate::shell::{Registry, ShellError};
use self::manifest::{companion_blob_path, Directory, ManifestEntry, ResxSummary};

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("manifest path has no usable file name")]
    BadManifestPath,
    /// The companion blob is absent; extraction degrades to directory-only.
    #[error("companion blob {0} not found")]
    MissingCompanionFile(PathBuf),
    #[error("entry range {offset}+{length} exceeds blob size {blob_len}")]
    RangeOutOfBounds { offset: u64, length: u64, blob_len: u64 },
    #[error(transparent)]
    Shell(#[from] ShellError),
    #[error(transparent)]
    Doc(#[from] DocError),
    #[error("summary serialization failed: {0}")]
    Summary(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One entry's failure, recorded instead of propagated so the batch
/// continues.
#[derive(Error, Debug)]
#[error("entry '{name}' failed: {source}")]
pub struct EntryFailure {
    pub name: String,
    #[source]
    pub source: ExtractError,
}

// ── Options and result ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// One rayon task per entry instead of a sequential walk.
    pub parallel: bool,
    /// Write unwrapped bytes verbatim; skip document decompilation.
    pub raw: bool,
    /// Destination directory; defaults to `<base>/` next to the manifest.
    pub out_dir: Option<PathBuf>,
    /// Bounded keystream length hint, passed through to the cipher.
    pub key_length: Option<usize>,
    /// Overrides the manifest's declared entry suffix.
    pub suffix_hint: Option<String>,
}

#[derive(Debug)]
pub struct ExtractSummary {
    pub succeeded: usize,
    pub total: usize,
    /// True when the blob was absent and only the directory was listed.
    pub directory_only: bool,
    pub errors: Vec<EntryFailure>,
}

// ── Extractor ────────────────────────────────────────────────────────────────

pub struct Extractor {
    registry: Registry,
    adapter: Box<dyn DocumentAdapter>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(Registry::new())
    }
}

impl Extractor {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            adapter: Box::new(JsonDocumentAdapter),
        }
    }

    /// Plug in a real document-layer implementation.
    pub fn with_adapter(registry: Registry, adapter: Box<dyn DocumentAdapter>) -> Self {
        Self { registry, adapter }
    }

    /// Extract every entry of `manifest_path`'s archive.
    ///
    /// Manifest-stage failures (unreadable file, undecodable manifest,
    /// malformed directory) are fatal; per-entry failures are collected in
    /// the returned summary.
    pub fn extract(
        &self,
        manifest_path: &Path,
        key: &str,
        opts: &ExtractOptions,
    ) -> Result<ExtractSummary, ExtractError> {
        let manifest_name = manifest_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(ExtractError::BadManifestPath)?
            .to_owned();

        let wrapped = fs::read(manifest_path)?;
        let mut ctx = ShellContext {
            key: (!key.is_empty()).then(|| format!("{key}{manifest_name}")),
            key_length: opts.key_length,
            source_label: Some(manifest_name.clone()),
            ..ShellContext::default()
        };
        let doc_bytes = self.registry.unwrap_chain(&wrapped, &mut ctx)?;
        let dir = self.adapter.parse_directory(&doc_bytes)?;
        let suffix = opts
            .suffix_hint
            .clone()
            .unwrap_or_else(|| dir.suffix.clone());
        log::info!(
            "manifest {manifest_name}: {} entries, suffix '{suffix}', shell {:?}",
            dir.entries.len(),
            ctx.detected_shell.map(|k| k.name()),
        );

        let out_dir = opts
            .out_dir
            .clone()
            .unwrap_or_else(|| default_out_dir(manifest_path, &manifest_name));
        fs::create_dir_all(&out_dir)?;

        // The summary manifest is written on every successful parse, before
        // any entry work, so even a fully failed run is reproducible.
        self.write_resx(&out_dir, &manifest_name, key, &suffix, &dir)?;

        let blob_path = companion_blob_path(manifest_path)
            .ok_or(ExtractError::BadManifestPath)?;
        if !blob_path.exists() {
            log::warn!(
                "{}: blob missing, directory-only mode",
                ExtractError::MissingCompanionFile(blob_path)
            );
            for entry in &dir.entries {
                log::info!("  {}{suffix}  [{} + {}]", entry.name, entry.offset, entry.length);
            }
            return Ok(ExtractSummary {
                succeeded: 0,
                total: dir.entries.len(),
                directory_only: true,
                errors: Vec::new(),
            });
        }

        let blob_file = File::open(&blob_path)?;
        // Safety: the blob is opened read-only and treated as immutable for
        // the lifetime of the mapping.
        let map = unsafe { Mmap::map(&blob_file)? };

        let base_key = (!key.is_empty()).then_some(key);
        let run = |entry: &ManifestEntry| -> Result<(), EntryFailure> {
            self.extract_entry(&map, entry, base_key, &suffix, &ctx, &out_dir, opts.raw)
                .map_err(|source| EntryFailure { name: entry.name.clone(), source })
        };

        let results: Vec<Result<(), EntryFailure>> = if opts.parallel {
            dir.entries.par_iter().map(run).collect()
        } else {
            dir.entries.iter().map(run).collect()
        };

        let mut errors = Vec::new();
        for result in results {
            if let Err(failure) = result {
                log::warn!("{failure}");
                errors.push(failure);
            }
        }
        let total = dir.entries.len();
        let succeeded = total - errors.len();
        log::info!("{manifest_name}: {succeeded}/{total} entries extracted");
        Ok(ExtractSummary { succeeded, total, directory_only: false, errors })
    }

    fn extract_entry(
        &self,
        map: &[u8],
        entry: &ManifestEntry,
        base_key: Option<&str>,
        suffix: &str,
        archive_ctx: &ShellContext,
        out_dir: &Path,
        raw_mode: bool,
    ) -> Result<(), ExtractError> {
        let end = entry
            .offset
            .checked_add(entry.length)
            .filter(|&end| end <= map.len() as u64)
            .ok_or(ExtractError::RangeOutOfBounds {
                offset: entry.offset,
                length: entry.length,
                blob_len: map.len() as u64,
            })?;

        // Copy the mapped view into an owned buffer; the cipher works in
        // place and the mapping itself must stay untouched.
        let owned = map[entry.offset as usize..end as usize].to_vec();

        // Private context per entry: the registry mutates it as a side
        // channel and siblings may run concurrently.
        let mut ctx = archive_ctx.clone();
        ctx.detected_shell = None;
        ctx.key = base_key.map(|k| format!("{k}{}{suffix}", entry.name));

        let raw = self.registry.unwrap_chain(&owned, &mut ctx)?;

        let out_path = out_dir.join(format!("{}{suffix}", entry.name));
        if raw_mode {
            fs::write(&out_path, &raw)?;
            return Ok(());
        }
        match self.adapter.decompile(&raw) {
            Ok(text) => {
                fs::write(out_dir.join(format!("{}{suffix}.json", entry.name)), text)?;
            }
            Err(e) => {
                // Secondary interpretation failing is not an entry failure.
                log::debug!("{}: not decompilable ({e}), writing raw bytes", entry.name);
                fs::write(&out_path, &raw)?;
            }
        }
        Ok(())
    }

    fn write_resx(
        &self,
        out_dir: &Path,
        manifest_name: &str,
        key: &str,
        suffix: &str,
        dir: &Directory,
    ) -> Result<(), ExtractError> {
        let summary = ResxSummary {
            source: manifest_name.to_owned(),
            key: key.to_owned(),
            suffix: suffix.to_owned(),
            entry_count: dir.entries.len(),
        };
        let path = out_dir.join(format!("{manifest_name}.resx.json"));
        fs::write(path, serde_json::to_string_pretty(&summary)?)?;
        Ok(())
    }
}

/// Default destination: `<base>/` beside the manifest, where `<base>` is the
/// file name up to `_info.`.
fn default_out_dir(manifest_path: &Path, manifest_name: &str) -> PathBuf {
    let base = manifest_name
        .split("_info.")
        .next()
        .filter(|b| *b != manifest_name)
        .unwrap_or(manifest_name);
    manifest_path.with_file_name(base)
}

//! Shell container registry: signature detection and unwrap/wrap dispatch.
//!
//! A "shell" is a compression and/or encryption layer wrapped around a raw
//! PSB document or archive manifest.  The set of shells is closed, so the
//! registry is an enum plus free functions per format — no trait objects,
//! no runtime registration.
//!
//! # Detection
//! [`detect`] probes each shell's signature in a fixed priority order:
//! proprietary four-byte magics first, the public LZ4 frame magic after
//! them, and the positional PSP probe last.  Probing is peek-only — it
//! never consumes or errors, and a stream with no recognizable shell is
//! "bare", which is a valid outcome rather than a failure.
//!
//! # Layer ordering
//! For every ciphered container the order is strict: wrap compresses first
//! and ciphers second; unwrap deciphers first and decompresses second.
//! Container headers (bytes 0–7) stay in the clear either way, which is
//! what keeps detection possible on ciphered streams.

pub mod lzss;

mod lz4f;
mod mdf;
mod mxb;
mod mzs;
mod psp;
mod psz;

use std::fmt;
use std::io;

use thiserror::Error;

use crate::cipher::Keystream;
use crate::context::ShellContext;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ShellError {
    /// No codec matched and the caller required one.
    #[error("no known shell signature matched")]
    UnsupportedContainer,
    /// The codec cannot perform the requested direction (PSP is read-only).
    #[error("{kind} containers support unwrap only")]
    UnsupportedOperation { kind: ShellKind },
    /// Declared sizes disagree with the actual stream, or a strict-mode
    /// checksum failed.
    #[error("corrupt {kind} container: {detail}")]
    CorruptContainer { kind: ShellKind, detail: String },
    /// A cipher was requested but the key text is empty.
    #[error("cipher requested but no key material was provided")]
    MissingKeyMaterial,
    #[error("compression error: {0}")]
    Compression(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ShellError {
    pub(crate) fn corrupt(kind: ShellKind, detail: impl Into<String>) -> Self {
        ShellError::CorruptContainer { kind, detail: detail.into() }
    }
}

// ── ShellKind ────────────────────────────────────────────────────────────────

/// Runtime discriminant for the closed shell set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellKind {
    /// LZ4 frame, whole-stream compression, never ciphered.
    Lz4,
    /// `mdf\0` deflate container, optionally ciphered from byte 8.
    Mdf,
    /// `mxb\0` block-LZSS container, optionally ciphered from byte 8.
    Mxb,
    /// `mzs\0` zstd container, optionally ciphered from byte 8.
    Mzs,
    /// Legacy `PSZ\0` deflate container with an Adler-32 trailer.
    Psz,
    /// Positionally-detected LZSS container; unwrap only.
    Psp,
}

/// Detection priority.  Proprietary magics before the generic public LZ4
/// frame magic; the positional PSP probe last.
pub const DETECT_ORDER: [ShellKind; 6] = [
    ShellKind::Psz,
    ShellKind::Mdf,
    ShellKind::Mxb,
    ShellKind::Mzs,
    ShellKind::Lz4,
    ShellKind::Psp,
];

impl ShellKind {
    /// Fixed 4-byte signature at offset 0, when the format has one.
    /// PSP is signature-less and identified by a positional probe instead.
    pub fn signature(self) -> Option<[u8; 4]> {
        match self {
            ShellKind::Lz4 => Some(lz4f::SIGNATURE),
            ShellKind::Mdf => Some(mdf::SIGNATURE),
            ShellKind::Mxb => Some(mxb::SIGNATURE),
            ShellKind::Mzs => Some(mzs::SIGNATURE),
            ShellKind::Psz => Some(psz::SIGNATURE),
            ShellKind::Psp => None,
        }
    }

    pub fn supports_wrap(self) -> bool {
        !matches!(self, ShellKind::Psp)
    }

    /// Peek-only signature check.  Never consumes, never errors.
    pub fn matches_signature(self, data: &[u8]) -> bool {
        match self.signature() {
            Some(sig) => data.len() >= 4 && data[..4] == sig,
            None => psp::matches(data),
        }
    }

    /// Human-readable name (diagnostics and CLI only — never parsed from disk).
    pub fn name(self) -> &'static str {
        match self {
            ShellKind::Lz4 => "lz4",
            ShellKind::Mdf => "mdf",
            ShellKind::Mxb => "mxb",
            ShellKind::Mzs => "mzs",
            ShellKind::Psz => "psz",
            ShellKind::Psp => "psp",
        }
    }

    /// Parse from a CLI string or a manifest suffix hint.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim_start_matches('.').to_lowercase().as_str() {
            "lz4" => Some(ShellKind::Lz4),
            "mdf" => Some(ShellKind::Mdf),
            "mxb" => Some(ShellKind::Mxb),
            "mzs" => Some(ShellKind::Mzs),
            "psz" => Some(ShellKind::Psz),
            "psp" => Some(ShellKind::Psp),
            _ => None,
        }
    }
}

impl fmt::Display for ShellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Detection ────────────────────────────────────────────────────────────────

/// Identify which shell (if any) wraps `data`.  First match in
/// [`DETECT_ORDER`] wins.  `None` means "bare stream" — not an error.
pub fn detect(data: &[u8]) -> Option<ShellKind> {
    DETECT_ORDER.into_iter().find(|kind| kind.matches_signature(data))
}

/// Like [`detect`], but a bare stream is an [`ShellError::UnsupportedContainer`].
pub fn detect_required(data: &[u8]) -> Result<ShellKind, ShellError> {
    detect(data).ok_or(ShellError::UnsupportedContainer)
}

// ── Registry ─────────────────────────────────────────────────────────────────

/// Dispatch surface for unwrap/wrap with per-instance policy.
///
/// `strict_checksums` turns on PSZ trailer verification, which the on-disk
/// ecosystem never enforced; it is a constructor parameter rather than a
/// process-wide toggle so embedders can opt in per pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Registry {
    pub strict_checksums: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self { strict_checksums: true }
    }

    /// Detect and strip the outer shell.  Records the detected kind into
    /// `ctx.detected_shell`; a bare stream comes back unchanged with
    /// `detected_shell` left as `None`.
    pub fn unwrap_chain(&self, data: &[u8], ctx: &mut ShellContext) -> Result<Vec<u8>, ShellError> {
        match detect(data) {
            Some(kind) => {
                log::debug!("detected {kind} shell ({} bytes)", data.len());
                ctx.detected_shell = Some(kind);
                self.unwrap(kind, data, ctx)
            }
            None => {
                log::debug!("no shell detected ({} bytes), passing through", data.len());
                Ok(data.to_vec())
            }
        }
    }

    /// Strip a specific shell.
    pub fn unwrap(
        &self,
        kind: ShellKind,
        data: &[u8],
        ctx: &mut ShellContext,
    ) -> Result<Vec<u8>, ShellError> {
        match kind {
            ShellKind::Lz4 => lz4f::unwrap(data),
            ShellKind::Mdf => mdf::unwrap(data, ctx),
            ShellKind::Mxb => mxb::unwrap(data, ctx),
            ShellKind::Mzs => mzs::unwrap(data, ctx),
            ShellKind::Psz => psz::unwrap(data, ctx, self.strict_checksums),
            ShellKind::Psp => psp::unwrap(data),
        }
    }

    /// Apply a shell.  The target kind is always named explicitly — wrapping
    /// is never auto-detected.
    pub fn wrap(
        &self,
        kind: ShellKind,
        raw: &[u8],
        ctx: &mut ShellContext,
    ) -> Result<Vec<u8>, ShellError> {
        match kind {
            ShellKind::Lz4 => lz4f::wrap(raw),
            ShellKind::Mdf => mdf::wrap(raw, ctx),
            ShellKind::Mxb => mxb::wrap(raw, ctx),
            ShellKind::Mzs => mzs::wrap(raw, ctx),
            ShellKind::Psz => psz::wrap(raw, ctx),
            ShellKind::Psp => Err(ShellError::UnsupportedOperation { kind }),
        }
    }
}

// ── Shared helpers for ciphered codecs ───────────────────────────────────────

/// Resolve the context's optional cipher key into a keystream.
///
/// `None` key → no cipher.  Empty key text is a caller contract violation.
pub(crate) fn keystream_for(ctx: &ShellContext) -> Result<Option<Keystream>, ShellError> {
    match ctx.key.as_deref() {
        None => Ok(None),
        Some("") => Err(ShellError::MissingKeyMaterial),
        Some(text) => Ok(Some(Keystream::derive(text))),
    }
}

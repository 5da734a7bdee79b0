//! Per-operation shell context.
//!
//! One `ShellContext` belongs to exactly one logical operation — a single
//! shell decode/encode, or a single archive entry.  It is cloned, never
//! shared mutably: the registry writes `detected_shell` back into it as a
//! side channel, so handing one instance to concurrent workers would race.

use crate::shell::ShellKind;

#[derive(Debug, Clone, Default)]
pub struct ShellContext {
    /// Cipher key text.  `None` disables the cipher for codecs where it is
    /// optional.  Present-but-empty is a contract violation and rejected
    /// with `MissingKeyMaterial`.
    pub key: Option<String>,
    /// Bound on generated keystream bytes; the cipher cursor wraps modulo
    /// this length.  `None` covers the whole payload without repetition.
    pub key_length: Option<usize>,
    /// Selects "fast" deflate over "compact" for MDF/PSZ wrapping.  Set back
    /// by unwrap to report which class the container carried.
    pub fast_compression: bool,
    /// Requested compression level; clamped to each codec's own range.
    pub compression_level: Option<i32>,
    /// Written by detection: which shell was stripped. `None` after an
    /// unwrap means the stream carried no shell at all.
    pub detected_shell: Option<ShellKind>,
    /// Label of the archive this operation originates from, for diagnostics.
    pub source_label: Option<String>,
}

impl ShellContext {
    /// Context carrying only a cipher key.
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }
}

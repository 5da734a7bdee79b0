//! PSP shell: LZSS-compressed documents with no fixed magic.
//!
//! Layout: u32 LE decompressed size, then the LZSS bitstream.  The first
//! control byte sits at offset 4 and the first tokens of a real document
//! are always literals, so the document's own `PSB` magic lands at bytes
//! 5..8 of the container — that positional probe is the only signature
//! this legacy format has.
//!
//! Unwrap-only: nothing in the ecosystem writes this format anymore.

use byteorder::{ByteOrder, LittleEndian};

use super::lzss;
use super::{ShellError, ShellKind};

/// Three-byte literal probed at offset 5.
pub const PROBE: [u8; 3] = *b"PSB";
/// Offset of the probe within the container.
pub const PROBE_OFFSET: usize = 5;

pub fn matches(data: &[u8]) -> bool {
    data.len() >= PROBE_OFFSET + PROBE.len()
        && data[PROBE_OFFSET..PROBE_OFFSET + PROBE.len()] == PROBE
}

pub fn unwrap(data: &[u8]) -> Result<Vec<u8>, ShellError> {
    if data.len() < 4 {
        return Err(ShellError::corrupt(ShellKind::Psp, "header truncated"));
    }
    let declared = LittleEndian::read_u32(&data[..4]) as usize;
    lzss::decompress(&data[4..], declared)
        .map_err(|e| ShellError::corrupt(ShellKind::Psp, e.to_string()))
}

//! LZ4 frame shell: whole-stream frame compression, never ciphered.

use std::io::{Read, Write};

use lz4_flex::frame::{FrameDecoder, FrameEncoder};

use super::{ShellError, ShellKind};

/// LZ4 frame magic, 0x184D2204 little-endian.
pub const SIGNATURE: [u8; 4] = [0x04, 0x22, 0x4D, 0x18];

pub fn unwrap(data: &[u8]) -> Result<Vec<u8>, ShellError> {
    let mut out = Vec::new();
    FrameDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| ShellError::corrupt(ShellKind::Lz4, e.to_string()))?;
    Ok(out)
}

pub fn wrap(raw: &[u8]) -> Result<Vec<u8>, ShellError> {
    let mut enc = FrameEncoder::new(Vec::new());
    enc.write_all(raw)
        .map_err(|e| ShellError::Compression(e.to_string()))?;
    enc.finish()
        .map_err(|e| ShellError::Compression(e.to_string()))
}

//! MZS shell: `mzs\0` + u32 LE decompressed size, then a zstd body.
//!
//! The optional cipher covers bytes 8.. of the container, applied after
//! compression on wrap and stripped before decompression on unwrap.

use byteorder::{ByteOrder, LittleEndian};

use super::{keystream_for, ShellContext, ShellError, ShellKind};

pub const SIGNATURE: [u8; 4] = *b"mzs\0";

/// Documented zstd level range for this container.
pub const MIN_LEVEL: i32 = 1;
pub const MAX_LEVEL: i32 = 22;
const DEFAULT_LEVEL: i32 = 3;

pub fn unwrap(data: &[u8], ctx: &mut ShellContext) -> Result<Vec<u8>, ShellError> {
    if data.len() < 8 {
        return Err(ShellError::corrupt(ShellKind::Mzs, "header truncated"));
    }
    let mut buf = data.to_vec();
    if let Some(ks) = keystream_for(ctx)? {
        ks.transform(&mut buf, ctx.key_length);
    }
    let declared = LittleEndian::read_u32(&buf[4..8]) as usize;
    let out = zstd::decode_all(&buf[8..])
        .map_err(|e| ShellError::corrupt(ShellKind::Mzs, e.to_string()))?;
    if out.len() != declared {
        return Err(ShellError::corrupt(
            ShellKind::Mzs,
            format!("declared size {declared}, decompressed to {}", out.len()),
        ));
    }
    Ok(out)
}

pub fn wrap(raw: &[u8], ctx: &mut ShellContext) -> Result<Vec<u8>, ShellError> {
    let ks = keystream_for(ctx)?;
    let level = ctx
        .compression_level
        .unwrap_or(DEFAULT_LEVEL)
        .clamp(MIN_LEVEL, MAX_LEVEL);
    let body = zstd::encode_all(raw, level)
        .map_err(|e| ShellError::Compression(e.to_string()))?;

    let mut out = Vec::with_capacity(8 + body.len());
    out.extend_from_slice(&SIGNATURE);
    out.extend_from_slice(&(raw.len() as u32).to_le_bytes());
    out.extend_from_slice(&body);
    if let Some(ks) = ks {
        ks.transform(&mut out, ctx.key_length);
    }
    Ok(out)
}

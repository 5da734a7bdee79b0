//! MDF shell: `mdf\0` + u32 LE compressed size, then a zlib stream.
//!
//! The zlib body starts at byte 8 and is the region the optional cipher
//! covers (`wrap` = deflate then cipher, `unwrap` = decipher then inflate —
//! strictly in that order).  The second zlib byte (FLG) distinguishes the
//! two deflate classes the ecosystem writes: 0x01 for "fast", 0xDA for
//! "compact"; unwrap reports the class back through the context.

use std::io::{Read, Write};

use byteorder::{ByteOrder, LittleEndian};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::{keystream_for, ShellContext, ShellError, ShellKind};

pub const SIGNATURE: [u8; 4] = *b"mdf\0";

/// zlib FLG byte written by the "fast" deflate class.
const FLG_FAST: u8 = 0x01;

pub fn unwrap(data: &[u8], ctx: &mut ShellContext) -> Result<Vec<u8>, ShellError> {
    if data.len() < 8 {
        return Err(ShellError::corrupt(ShellKind::Mdf, "header truncated"));
    }
    let declared = LittleEndian::read_u32(&data[4..8]) as usize;
    if declared != data.len() - 8 {
        return Err(ShellError::corrupt(
            ShellKind::Mdf,
            format!("declared size {declared} but {} payload bytes follow", data.len() - 8),
        ));
    }

    let mut buf = data.to_vec();
    if let Some(ks) = keystream_for(ctx)? {
        ks.transform(&mut buf, ctx.key_length);
    }
    // After deciphering, report which deflate class the container carried.
    if buf.len() > 9 {
        ctx.fast_compression = buf[9] == FLG_FAST;
    }

    let mut out = Vec::new();
    ZlibDecoder::new(&buf[8..])
        .read_to_end(&mut out)
        .map_err(|e| ShellError::corrupt(ShellKind::Mdf, e.to_string()))?;
    Ok(out)
}

pub fn wrap(raw: &[u8], ctx: &mut ShellContext) -> Result<Vec<u8>, ShellError> {
    let ks = keystream_for(ctx)?;
    let level = if ctx.fast_compression {
        Compression::fast()
    } else {
        Compression::best()
    };

    let mut enc = ZlibEncoder::new(Vec::new(), level);
    enc.write_all(raw)
        .map_err(|e| ShellError::Compression(e.to_string()))?;
    let body = enc
        .finish()
        .map_err(|e| ShellError::Compression(e.to_string()))?;

    let mut out = Vec::with_capacity(8 + body.len());
    out.extend_from_slice(&SIGNATURE);
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&body);
    if let Some(ks) = ks {
        ks.transform(&mut out, ctx.key_length);
    }
    Ok(out)
}

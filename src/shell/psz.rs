//! Legacy PSZ shell.
//!
//! Layout: `P S Z 0x00`, u32 LE compressed length, u32 LE original length,
//! one class byte (1 = fast deflate, 0 = compact), the zlib body, then an
//! Adler-32 of the pre-compression bytes as a big-endian trailer.
//!
//! The trailer is written on wrap but historically never checked on unwrap;
//! verification only happens when the registry was built strict.  Never
//! ciphered.

use std::io::{Read, Write};

use byteorder::{ByteOrder, LittleEndian};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::{ShellContext, ShellError, ShellKind};

pub const SIGNATURE: [u8; 4] = [b'P', b'S', b'Z', 0];

const HEADER_LEN: usize = 13;
const CLASS_FAST: u8 = 1;
const CLASS_COMPACT: u8 = 0;

pub fn unwrap(data: &[u8], ctx: &mut ShellContext, strict: bool) -> Result<Vec<u8>, ShellError> {
    if data.len() < HEADER_LEN {
        return Err(ShellError::corrupt(ShellKind::Psz, "header truncated"));
    }
    let comp_len = LittleEndian::read_u32(&data[4..8]) as usize;
    let orig_len = LittleEndian::read_u32(&data[8..12]) as usize;
    let class = data[12];
    ctx.fast_compression = class == CLASS_FAST;

    let body = &data[HEADER_LEN..];
    if body.len() < comp_len {
        return Err(ShellError::corrupt(
            ShellKind::Psz,
            format!("declared {comp_len} compressed bytes, only {} present", body.len()),
        ));
    }

    let mut out = Vec::with_capacity(orig_len);
    ZlibDecoder::new(&body[..comp_len])
        .read_to_end(&mut out)
        .map_err(|e| ShellError::corrupt(ShellKind::Psz, e.to_string()))?;
    if out.len() != orig_len {
        return Err(ShellError::corrupt(
            ShellKind::Psz,
            format!("declared original length {orig_len}, decompressed to {}", out.len()),
        ));
    }

    if strict {
        let trailer = &body[comp_len..];
        if trailer.len() < 4 {
            return Err(ShellError::corrupt(ShellKind::Psz, "checksum trailer missing"));
        }
        let stored = u32::from_be_bytes(trailer[..4].try_into().unwrap());
        let actual = adler2::adler32_slice(&out);
        if stored != actual {
            return Err(ShellError::corrupt(
                ShellKind::Psz,
                format!("Adler-32 mismatch: trailer {stored:#010x}, computed {actual:#010x}"),
            ));
        }
    }
    Ok(out)
}

pub fn wrap(raw: &[u8], ctx: &mut ShellContext) -> Result<Vec<u8>, ShellError> {
    let (level, class) = if ctx.fast_compression {
        (Compression::fast(), CLASS_FAST)
    } else {
        (Compression::best(), CLASS_COMPACT)
    };

    let mut enc = ZlibEncoder::new(Vec::new(), level);
    enc.write_all(raw)
        .map_err(|e| ShellError::Compression(e.to_string()))?;
    let body = enc
        .finish()
        .map_err(|e| ShellError::Compression(e.to_string()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + body.len() + 4);
    out.extend_from_slice(&SIGNATURE);
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&(raw.len() as u32).to_le_bytes());
    out.push(class);
    out.extend_from_slice(&body);
    out.extend_from_slice(&adler2::adler32_slice(raw).to_be_bytes());
    Ok(out)
}

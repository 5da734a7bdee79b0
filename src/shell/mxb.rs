//! MXB shell: `mxb\0` + u32 LE decompressed size, then size-prefixed LZSS
//! blocks.
//!
//! Wire contract: the body is a sequence of blocks, each a u32 LE compressed
//! length followed by that many LZSS bytes.  Every block expands to
//! [`BLOCK_SIZE`] raw bytes except the last, which carries the remainder.
//! The optional cipher covers bytes 8.. of the whole container, outside the
//! compression layer (compress then cipher, decipher then decompress).

use byteorder::{ByteOrder, LittleEndian};

use super::lzss;
use super::{keystream_for, ShellContext, ShellError, ShellKind};

pub const SIGNATURE: [u8; 4] = *b"mxb\0";

/// Raw bytes per compressed block.
pub const BLOCK_SIZE: usize = 0x10000;

pub fn unwrap(data: &[u8], ctx: &mut ShellContext) -> Result<Vec<u8>, ShellError> {
    if data.len() < 8 {
        return Err(ShellError::corrupt(ShellKind::Mxb, "header truncated"));
    }
    let mut buf = data.to_vec();
    if let Some(ks) = keystream_for(ctx)? {
        ks.transform(&mut buf, ctx.key_length);
    }

    let declared = LittleEndian::read_u32(&buf[4..8]) as usize;
    let mut out = Vec::with_capacity(declared);
    let mut pos = 8usize;
    while out.len() < declared {
        if pos + 4 > buf.len() {
            return Err(ShellError::corrupt(ShellKind::Mxb, "block header truncated"));
        }
        let block_len = LittleEndian::read_u32(&buf[pos..pos + 4]) as usize;
        pos += 4;
        if pos + block_len > buf.len() {
            return Err(ShellError::corrupt(
                ShellKind::Mxb,
                format!("block of {block_len} bytes overruns container"),
            ));
        }
        let expected = BLOCK_SIZE.min(declared - out.len());
        let block = lzss::decompress(&buf[pos..pos + block_len], expected)
            .map_err(|e| ShellError::corrupt(ShellKind::Mxb, e.to_string()))?;
        out.extend_from_slice(&block);
        pos += block_len;
    }
    Ok(out)
}

pub fn wrap(raw: &[u8], ctx: &mut ShellContext) -> Result<Vec<u8>, ShellError> {
    let ks = keystream_for(ctx)?;

    let mut out = Vec::with_capacity(8 + raw.len() / 2);
    out.extend_from_slice(&SIGNATURE);
    out.extend_from_slice(&(raw.len() as u32).to_le_bytes());
    for chunk in raw.chunks(BLOCK_SIZE) {
        let block = lzss::compress(chunk);
        out.extend_from_slice(&(block.len() as u32).to_le_bytes());
        out.extend_from_slice(&block);
    }

    if let Some(ks) = ks {
        ks.transform(&mut out, ctx.key_length);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_block_roundtrip() {
        // Larger than one block so the chunked path is exercised.
        let raw: Vec<u8> = (0..BLOCK_SIZE + 1234).map(|i| (i % 251) as u8).collect();
        let mut ctx = ShellContext::default();
        let wrapped = wrap(&raw, &mut ctx).unwrap();
        assert_eq!(unwrap(&wrapped, &mut ctx).unwrap(), raw);
    }

    #[test]
    fn ciphered_roundtrip() {
        let raw = b"mxb ciphered body, long enough to span a few control groups";
        let mut ctx = ShellContext::with_key("mxb-key");
        let wrapped = wrap(raw, &mut ctx).unwrap();
        assert_eq!(&wrapped[..4], &SIGNATURE);
        let mut rctx = ShellContext::with_key("mxb-key");
        assert_eq!(unwrap(&wrapped, &mut rctx).unwrap(), raw);
    }

    #[test]
    fn overrunning_block_is_corrupt() {
        let mut ctx = ShellContext::default();
        let mut wrapped = wrap(b"some payload bytes here", &mut ctx).unwrap();
        // Inflate the first block's declared length past the container end.
        wrapped[8..12].copy_from_slice(&0xFFFFu32.to_le_bytes());
        assert!(matches!(
            unwrap(&wrapped, &mut ctx),
            Err(ShellError::CorruptContainer { kind: ShellKind::Mxb, .. })
        ));
    }
}

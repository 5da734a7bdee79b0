//! Keystream cipher for shell containers.
//!
//! Key derivation: MD5(key text) → four little-endian u32 words → MT19937
//! seeded via `init_by_array`.  The generator output, serialized as
//! little-endian u32 words, is XORed against the payload.
//!
//! Two rules shape the transform:
//!   - Bytes 0–7 of the buffer are never touched.  Container signatures and
//!     size fields live there in the clear so detection still works on
//!     ciphered streams.
//!   - An optional bound caps how many keystream bytes exist.  Past the
//!     bound the cursor wraps back to keystream offset 0, so the key
//!     material repeats with period `bound` regardless of payload length.
//!
//! XOR is involutive, so encode and decode are the same call.

pub mod mt19937;

use md5::{Digest, Md5};

use self::mt19937::Mt19937;

/// Container bytes below this offset are never ciphered.
pub const CLEAR_PREFIX: usize = 8;

/// Derived keystream seeds for one key text.
///
/// Deriving is cheap; the MT19937 state itself is built fresh inside each
/// [`transform`](Keystream::transform) call and never crosses threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keystream {
    seeds: [u32; 4],
}

impl Keystream {
    /// Derive seeds from the UTF-8 key text.
    ///
    /// Callers must reject empty key text before getting here; an empty key
    /// still derives a well-defined digest but never denotes a real cipher.
    pub fn derive(key_text: &str) -> Self {
        let digest: [u8; 16] = Md5::digest(key_text.as_bytes()).into();
        let mut seeds = [0u32; 4];
        for (i, word) in digest.chunks_exact(4).enumerate() {
            seeds[i] = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
        }
        log::debug!("derived keystream seeds from key digest {}", hex::encode(digest));
        Self { seeds }
    }

    pub fn seeds(&self) -> [u32; 4] {
        self.seeds
    }

    /// Generate exactly `len` keystream bytes from a fresh generator.
    fn material(&self, len: usize) -> Vec<u8> {
        let mut mt = Mt19937::from_key(&self.seeds);
        let mut out = Vec::with_capacity(len + 4);
        while out.len() < len {
            out.extend_from_slice(&mt.next_u32().to_le_bytes());
        }
        out.truncate(len);
        out
    }

    /// XOR-transform `buf` in place from byte 8 onward.
    ///
    /// `bound` limits the keystream to its first `bound` bytes; the cursor
    /// wraps modulo that length.  `None` (or a zero bound) generates key
    /// material covering the whole remainder with no repetition.
    pub fn transform(&self, buf: &mut [u8], bound: Option<usize>) {
        if buf.len() <= CLEAR_PREFIX {
            return;
        }
        let body = buf.len() - CLEAR_PREFIX;
        let effective = match bound {
            Some(n) if n > 0 => n.min(body),
            _ => body,
        };
        let ks = self.material(effective);
        for (i, b) in buf[CLEAR_PREFIX..].iter_mut().enumerate() {
            *b ^= ks[i % ks.len()];
        }
    }
}

//! Sliding-window LZSS coder shared by the PSP and MXB containers.
//!
//! Wire format: a control byte precedes up to eight tokens, consumed
//! LSB-first.  A clear bit is a literal byte; a set bit is a two-byte
//! back-reference `(b0, b1)` into the previous output:
//!
//! ```text
//! distance = (b0 << 4) | (b1 >> 4)     1..=4095 bytes back
//! length   = 2 + (b1 & 0x0F)           2..=17 bytes copied
//! ```
//!
//! Copies may overlap their own output (distance < length), which is how
//! runs are encoded; the decoder therefore copies byte by byte.

use thiserror::Error;

/// Window size implied by the 12-bit distance field.
pub const WINDOW: usize = 4096;
const MIN_MATCH: usize = 2;
const MAX_MATCH: usize = 17;

#[derive(Error, Debug)]
pub enum LzssError {
    #[error("compressed stream truncated at byte {0}")]
    Truncated(usize),
    #[error("back-reference distance {distance} at output offset {at} exceeds window")]
    BadReference { distance: usize, at: usize },
    #[error("decompressed {actual} bytes, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Expand `data` to exactly `expected` bytes.
pub fn decompress(data: &[u8], expected: usize) -> Result<Vec<u8>, LzssError> {
    let mut out: Vec<u8> = Vec::with_capacity(expected);
    let mut pos = 0usize;

    while out.len() < expected {
        if pos >= data.len() {
            return Err(LzssError::Truncated(pos));
        }
        let control = data[pos];
        pos += 1;

        for bit in 0..8 {
            if out.len() >= expected {
                break;
            }
            if control & (1 << bit) == 0 {
                let lit = *data.get(pos).ok_or(LzssError::Truncated(pos))?;
                pos += 1;
                out.push(lit);
            } else {
                if pos + 1 >= data.len() {
                    return Err(LzssError::Truncated(pos));
                }
                let b0 = data[pos] as usize;
                let b1 = data[pos + 1] as usize;
                pos += 2;
                let distance = (b0 << 4) | (b1 >> 4);
                let length = MIN_MATCH + (b1 & 0x0F);
                if distance == 0 || distance > out.len() {
                    return Err(LzssError::BadReference { distance, at: out.len() });
                }
                for _ in 0..length {
                    let b = out[out.len() - distance];
                    out.push(b);
                }
            }
        }
    }

    if out.len() != expected {
        return Err(LzssError::LengthMismatch { expected, actual: out.len() });
    }
    Ok(out)
}

/// Greedy single-pass compressor.
///
/// Candidate positions are indexed by 2-byte prefix; only matches of three
/// bytes or longer are emitted (a 2-byte match never beats two literals by
/// enough to matter, and longer thresholds keep the scan cheap).
pub fn compress(data: &[u8]) -> Vec<u8> {
    use std::collections::HashMap;
    // Per 2-byte prefix, most recent candidate positions (newest last).
    const CANDIDATES: usize = 32;

    let mut out = Vec::with_capacity(data.len() / 2 + 16);
    let mut index: HashMap<[u8; 2], Vec<usize>> = HashMap::new();

    let mut pos = 0usize;
    let mut control_at = 0usize;
    let mut control = 0u8;
    let mut bit = 0u8;

    let begin_group = |out: &mut Vec<u8>, control_at: &mut usize| {
        *control_at = out.len();
        out.push(0);
    };
    begin_group(&mut out, &mut control_at);

    while pos < data.len() {
        let (mut best_len, mut best_dist) = (0usize, 0usize);
        if pos + MIN_MATCH <= data.len() {
            let key = [data[pos], data[pos + 1]];
            if let Some(cands) = index.get(&key) {
                for &cand in cands.iter().rev() {
                    let distance = pos - cand;
                    if distance >= WINDOW {
                        break; // older candidates are even further away
                    }
                    let limit = MAX_MATCH.min(data.len() - pos);
                    let mut len = 0usize;
                    while len < limit && data[cand + len] == data[pos + len] {
                        len += 1;
                    }
                    if len > best_len {
                        best_len = len;
                        best_dist = distance;
                        if len == MAX_MATCH {
                            break;
                        }
                    }
                }
            }
        }

        let taken = if best_len >= 3 {
            control |= 1 << bit;
            out.push((best_dist >> 4) as u8);
            out.push((((best_dist & 0x0F) << 4) | (best_len - MIN_MATCH)) as u8);
            best_len
        } else {
            out.push(data[pos]);
            1
        };

        for p in pos..pos + taken {
            if p + MIN_MATCH <= data.len() {
                let entry = index.entry([data[p], data[p + 1]]).or_default();
                entry.push(p);
                if entry.len() > CANDIDATES {
                    entry.remove(0);
                }
            }
        }
        pos += taken;

        bit += 1;
        if bit == 8 {
            out[control_at] = control;
            control = 0;
            bit = 0;
            if pos < data.len() {
                begin_group(&mut out, &mut control_at);
            }
        }
    }

    if bit != 0 {
        out[control_at] = control;
    } else if out.last() == Some(&0) && out.len() == control_at + 1 {
        // Trailing empty control byte from an exact 8-token boundary.
        out.pop();
    }
    out
}

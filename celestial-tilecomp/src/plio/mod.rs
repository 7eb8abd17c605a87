//! IRAF PLIO line-list run-length coding (`PLIO_1`).
//!
//! A line list is a 7-word header followed by 16-bit instructions, each an
//! opcode in the top four bits and a 12-bit operand:
//!
//! | opcode | action                                        |
//! |--------|-----------------------------------------------|
//! | 0      | `data` zeros                                  |
//! | 1      | high value = next word << 12 + `data`         |
//! | 2 / 3  | high value += / -= `data`                     |
//! | 4      | `data` copies of the high value               |
//! | 5      | `data - 1` zeros, then one high value         |
//! | 6 / 7  | high value += / -= `data`, emit one pixel     |

use byteorder::{BigEndian, ByteOrder};

use crate::core::{CompressionError, Result};

/// Largest pixel value a line list can carry.
pub const MAX_VALUE: i64 = (1 << 24) - 1;

const HEADER_WORDS: usize = 7;
const MAX_RUN: i64 = 4095;

const OP_ZERO_RUN: i16 = 0;
const OP_SET_HIGH: i16 = 1 << 12;
const OP_INC_HIGH: i16 = 2 << 12;
const OP_DEC_HIGH: i16 = 3 << 12;
const OP_HIGH_RUN: i16 = 4 << 12;
const OP_ZEROS_THEN_HIGH: i16 = 5 << 12;
const EMIT_PIXEL: i16 = 4 << 12;

/// Encode non-negative pixels into line-list words.
pub fn encode_line_list(pixels: &[i64]) -> Result<Vec<i16>> {
    if let Some(&bad) = pixels.iter().find(|&&p| !(0..=MAX_VALUE).contains(&p)) {
        return Err(CompressionError::ValueOutOfRange(format!(
            "PLIO pixel {} outside 0..={}",
            bad, MAX_VALUE
        )));
    }

    let mut words: Vec<i16> = vec![0, HEADER_WORDS as i16, -100, 0, 0, 0, 0];
    if pixels.is_empty() {
        return Ok(words);
    }

    // Pixel indices are 1-based to keep run arithmetic inclusive.
    let xe = pixels.len() as i64;
    let px = |i: i64| pixels[(i - 1) as usize];

    let mut pv = px(1);
    let mut nv = 0;
    let mut x1 = 1;
    let mut iz = 1;
    let mut hi = 1;

    for ip in 1..=xe {
        if ip < xe {
            nv = px(ip + 1);
            if nv == pv {
                continue;
            }
            if pv == 0 {
                pv = nv;
                x1 = ip + 1;
                continue;
            }
        } else if pv == 0 {
            x1 = xe + 1;
        }

        let mut np = ip - x1 + 1;
        let mut nz = x1 - iz;
        let mut pixel_written = false;

        if pv > 0 {
            let dv = pv - hi;
            if dv != 0 {
                hi = pv;
                if dv.abs() > MAX_RUN {
                    words.push(OP_SET_HIGH + (pv & MAX_RUN) as i16);
                    words.push((pv / 4096) as i16);
                } else {
                    let word = if dv < 0 {
                        OP_DEC_HIGH + (-dv) as i16
                    } else {
                        OP_INC_HIGH + dv as i16
                    };
                    words.push(word);
                    if np == 1 && nz == 0 {
                        if let Some(last) = words.last_mut() {
                            *last |= EMIT_PIXEL;
                        }
                        pixel_written = true;
                    }
                }
            }
        }

        if !pixel_written && nz > 0 {
            while nz > 0 {
                words.push(OP_ZERO_RUN + nz.min(MAX_RUN) as i16);
                nz -= MAX_RUN;
            }
            if np == 1 && pv > 0 {
                if let Some(last) = words.last_mut() {
                    *last += OP_ZEROS_THEN_HIGH + 1;
                }
                pixel_written = true;
            }
        }

        if !pixel_written {
            while np > 0 {
                words.push(OP_HIGH_RUN + np.min(MAX_RUN) as i16);
                np -= MAX_RUN;
            }
        }

        x1 = ip + 1;
        iz = x1;
        pv = nv;
    }

    let len = words.len();
    words[3] = (len % 32768) as i16;
    words[4] = (len / 32768) as i16;
    Ok(words)
}

/// Expand a line list into `npix` pixels; pixels past the list are zero.
pub fn decode_line_list(words: &[i16], npix: usize) -> Result<Vec<i32>> {
    if words.len() < 3 {
        return Err(CompressionError::corrupt("PLIO header truncated"));
    }

    let (lllen, first) = if words[2] > 0 {
        (words[2] as usize, 3)
    } else {
        if words.len() < 5 {
            return Err(CompressionError::corrupt("PLIO header truncated"));
        }
        let len = ((words[4] as i64) << 15) + words[3] as i64;
        (len.max(0) as usize, words[1].max(0) as usize)
    };

    if lllen > words.len() {
        return Err(CompressionError::corrupt(format!(
            "PLIO line list claims {} words but only {} present",
            lllen,
            words.len()
        )));
    }

    let mut output = vec![0i32; npix];
    if npix == 0 || lllen == 0 {
        return Ok(output);
    }

    let xe = npix as i64;
    let mut op = 0usize;
    let mut x1: i64 = 1;
    let mut pv: i64 = 1;
    let mut ip = first;

    while ip < lllen {
        let word = words[ip] as u16;
        let opcode = word >> 12;
        let data = i64::from(word & 0x0fff);

        match opcode {
            0 | 4 | 5 => {
                let x2 = x1 + data - 1;
                let i1 = x1.max(1);
                let i2 = x2.min(xe);
                let np = i2 - i1 + 1;
                if np > 0 {
                    let end = op + np as usize;
                    let fill = if opcode == 4 { pv as i32 } else { 0 };
                    output[op..end].fill(fill);
                    if opcode == 5 && i2 == x2 {
                        output[end - 1] = pv as i32;
                    }
                    op = end;
                }
                x1 = x2 + 1;
            }
            1 => {
                let next = words
                    .get(ip + 1)
                    .ok_or_else(|| CompressionError::corrupt("PLIO set-high word truncated"))?;
                pv = (i64::from(*next) << 12) + data;
                ip += 1;
            }
            2 => pv += data,
            3 => pv -= data,
            6 | 7 => {
                pv = if opcode == 6 { pv + data } else { pv - data };
                if x1 >= 1 && x1 <= xe {
                    output[op] = pv as i32;
                    op += 1;
                }
                x1 += 1;
            }
            other => {
                return Err(CompressionError::corrupt(format!(
                    "unknown PLIO opcode {}",
                    other
                )))
            }
        }

        if x1 > xe {
            break;
        }
        ip += 1;
    }

    Ok(output)
}

/// Encode a big-endian tile of `bytepix`-wide integers.
pub fn compress_bytes(buf: &[u8], bytepix: usize) -> Result<Vec<u8>> {
    if !matches!(bytepix, 1 | 2 | 4 | 8) {
        return Err(CompressionError::params(format!(
            "unsupported PLIO bytepix {}",
            bytepix
        )));
    }
    if buf.len() % bytepix != 0 {
        return Err(CompressionError::InvalidBufferLength {
            length: buf.len(),
            reason: format!("not a multiple of bytepix {}", bytepix),
        });
    }

    let pixels: Vec<i64> = buf
        .chunks_exact(bytepix)
        .map(|c| match bytepix {
            1 => i64::from(c[0]),
            2 => i64::from(BigEndian::read_i16(c)),
            4 => i64::from(BigEndian::read_i32(c)),
            _ => BigEndian::read_i64(c),
        })
        .collect();

    let words = encode_line_list(&pixels)?;
    let mut out = vec![0u8; words.len() * 2];
    BigEndian::write_i16_into(&words, &mut out);
    Ok(out)
}

/// Decode into a big-endian buffer of 32-bit pixels.
pub fn decompress_bytes(compressed: &[u8], tile_size: usize) -> Result<Vec<u8>> {
    if compressed.len() % 2 != 0 {
        return Err(CompressionError::InvalidBufferLength {
            length: compressed.len(),
            reason: "PLIO streams are made of 16-bit words".to_string(),
        });
    }
    let mut words = vec![0i16; compressed.len() / 2];
    BigEndian::read_i16_into(compressed, &mut words);

    let pixels = decode_line_list(&words, tile_size)?;
    let mut out = vec![0u8; pixels.len() * 4];
    BigEndian::write_i32_into(&pixels, &mut out);
    Ok(out)
}

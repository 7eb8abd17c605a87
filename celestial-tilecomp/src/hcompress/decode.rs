//! Quadtree bit-plane decoding, the inverse of `encode`.

use super::encode::Quadrant;
use super::ilog2_ceil;
use crate::bitbuffer::BitReader;
use crate::core::{CompressionError, Result};

fn input_huffman(reader: &mut BitReader) -> Result<u8> {
    let mut c = reader.read_bits(3)?;
    if c < 4 {
        return Ok(1 << c);
    }

    c = (c << 1) | reader.read_bits(1)?;
    match c {
        8 => return Ok(3),
        9 => return Ok(5),
        10 => return Ok(10),
        11 => return Ok(12),
        12 => return Ok(15),
        _ => {}
    }

    c = (c << 1) | reader.read_bits(1)?;
    match c {
        26 => return Ok(6),
        27 => return Ok(7),
        28 => return Ok(9),
        29 => return Ok(11),
        30 => return Ok(13),
        _ => {}
    }

    c = (c << 1) | reader.read_bits(1)?;
    Ok(if c == 62 { 0 } else { 14 })
}

/// Spread `(nx+1)/2` by `(ny+1)/2` codes over an `nx` by `ny` grid of single
/// bits, in place.
fn qtree_copy(scratch: &mut [u8], nx: usize, ny: usize) {
    let nx2 = nx.div_ceil(2);
    let ny2 = ny.div_ceil(2);

    for i in (0..nx2).rev() {
        for j in (0..ny2).rev() {
            scratch[2 * (ny * i + j)] = scratch[ny2 * i + j];
        }
    }

    let mut i = 0;
    while i + 1 < nx {
        let mut s00 = ny * i;
        let mut s10 = s00 + ny;
        let mut j = 0;
        while j + 1 < ny {
            let v = scratch[s00];
            scratch[s10 + 1] = v & 1;
            scratch[s10] = (v >> 1) & 1;
            scratch[s00 + 1] = (v >> 2) & 1;
            scratch[s00] = (v >> 3) & 1;
            s00 += 2;
            s10 += 2;
            j += 2;
        }
        if j < ny {
            let v = scratch[s00];
            scratch[s10] = (v >> 1) & 1;
            scratch[s00] = (v >> 3) & 1;
        }
        i += 2;
    }
    if i < nx {
        let mut s00 = ny * i;
        let mut j = 0;
        while j + 1 < ny {
            let v = scratch[s00];
            scratch[s00 + 1] = (v >> 2) & 1;
            scratch[s00] = (v >> 3) & 1;
            s00 += 2;
            j += 2;
        }
        if j < ny {
            scratch[s00] = (scratch[s00] >> 3) & 1;
        }
    }
}

fn qtree_expand(reader: &mut BitReader, scratch: &mut [u8], nx: usize, ny: usize) -> Result<()> {
    qtree_copy(scratch, nx, ny);
    for value in scratch[..nx * ny].iter_mut().rev() {
        if *value != 0 {
            *value = input_huffman(reader)?;
        }
    }
    Ok(())
}

/// OR the 4-bit codes into bit plane `bit` of the quadrant.
fn qtree_bitins(scratch: &[u8], a: &mut [i64], q: Quadrant, bit: u32) {
    let mut put = |row: usize, col: usize, v: u8| {
        a[q.index(row, col)] |= i64::from(v & 1) << bit;
    };
    let mut k = 0;
    let mut i = 0;
    while i + 1 < q.nqx {
        let mut j = 0;
        while j + 1 < q.nqy {
            let v = scratch[k];
            put(i + 1, j + 1, v);
            put(i + 1, j, v >> 1);
            put(i, j + 1, v >> 2);
            put(i, j, v >> 3);
            k += 1;
            j += 2;
        }
        if j < q.nqy {
            let v = scratch[k];
            put(i + 1, j, v >> 1);
            put(i, j, v >> 3);
            k += 1;
        }
        i += 2;
    }
    if i < q.nqx {
        let mut j = 0;
        while j + 1 < q.nqy {
            let v = scratch[k];
            put(i, j + 1, v >> 2);
            put(i, j, v >> 3);
            k += 1;
            j += 2;
        }
        if j < q.nqy {
            put(i, j, scratch[k] >> 3);
        }
    }
}

fn read_bdirect(
    reader: &mut BitReader,
    a: &mut [i64],
    q: Quadrant,
    scratch: &mut [u8],
    bit: u32,
) -> Result<()> {
    let count = q.nqx.div_ceil(2) * q.nqy.div_ceil(2);
    for value in scratch[..count].iter_mut() {
        *value = reader.read_nybble()?;
    }
    qtree_bitins(scratch, a, q, bit);
    Ok(())
}

pub(super) fn qtree_decode(
    reader: &mut BitReader,
    a: &mut [i64],
    q: Quadrant,
    nbitplanes: u32,
) -> Result<()> {
    let log2n = ilog2_ceil(q.nqx.max(q.nqy));
    let nqx2 = q.nqx.div_ceil(2).max(1);
    let nqy2 = q.nqy.div_ceil(2).max(1);
    let mut scratch = vec![0u8; nqx2 * nqy2];

    for bit in (0..nbitplanes).rev() {
        match reader.read_nybble()? {
            0x0 => read_bdirect(reader, a, q, &mut scratch, bit)?,
            0xF => {
                scratch[0] = input_huffman(reader)?;

                let mut nx = 1usize;
                let mut ny = 1usize;
                let mut nfx = q.nqx;
                let mut nfy = q.nqy;
                let mut c = 1usize << log2n;
                for _ in 1..log2n {
                    c >>= 1;
                    nx <<= 1;
                    ny <<= 1;
                    if nfx <= c {
                        nx -= 1;
                    } else {
                        nfx -= c;
                    }
                    if nfy <= c {
                        ny -= 1;
                    } else {
                        nfy -= c;
                    }
                    qtree_expand(reader, &mut scratch, nx, ny)?;
                }

                qtree_bitins(&scratch, a, q, bit);
            }
            other => {
                return Err(CompressionError::corrupt(format!(
                    "bad HCOMPRESS bit-plane format code {:#x}",
                    other
                )))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitbuffer::BitWriter;
    use crate::hcompress::{HUFFMAN_CODE, HUFFMAN_LEN};

    #[test]
    fn test_huffman_table_decodes_every_code() {
        let mut writer = BitWriter::with_capacity(16);
        for v in 0..16 {
            writer.output_nbits(HUFFMAN_CODE[v], HUFFMAN_LEN[v]).unwrap();
        }
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        for v in 0..16u8 {
            assert_eq!(input_huffman(&mut reader).unwrap(), v);
        }
    }

    #[test]
    fn test_qtree_copy_expands_codes() {
        let mut scratch = vec![0b1001, 0b0110, 0, 0, 0, 0, 0, 0];
        qtree_copy(&mut scratch, 2, 4);
        assert_eq!(scratch, vec![1, 0, 0, 1, 0, 1, 1, 0]);
    }

    #[test]
    fn test_bitins_sets_requested_plane() {
        let mut a = vec![0i64; 9];
        let q = Quadrant {
            offset: 0,
            stride: 3,
            nqx: 3,
            nqy: 3,
        };
        qtree_bitins(&[0b1001, 0, 0, 0b1000], &mut a, q, 2);
        assert_eq!(a, vec![4, 0, 0, 0, 4, 0, 0, 0, 4]);
    }

    #[test]
    fn test_bad_format_code() {
        let data = [0x50u8];
        let mut reader = BitReader::new(&data);
        let mut a = vec![0i64; 4];
        let q = Quadrant {
            offset: 0,
            stride: 2,
            nqx: 2,
            nqy: 2,
        };
        assert!(matches!(
            qtree_decode(&mut reader, &mut a, q, 1),
            Err(CompressionError::CorruptStream(_))
        ));
    }
}

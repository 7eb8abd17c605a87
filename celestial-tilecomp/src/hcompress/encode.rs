//! Quadtree bit-plane encoding of transformed coefficients.

use super::{ilog2_ceil, HUFFMAN_CODE, HUFFMAN_LEN};
use crate::bitbuffer::BitWriter;
use crate::core::Result;

/// A view of one quadrant: `nqx` rows and `nqy` columns starting at `offset`
/// in an array with row stride `stride`.
#[derive(Debug, Clone, Copy)]
pub(super) struct Quadrant {
    pub offset: usize,
    pub stride: usize,
    pub nqx: usize,
    pub nqy: usize,
}

impl Quadrant {
    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        self.offset + row * self.stride + col
    }
}

/// Pack bit `bit` of each 2x2 block into a 4-bit code.
fn qtree_onebit(a: &[i64], q: Quadrant, scratch: &mut [u8], bit: u32) {
    let b = |row: usize, col: usize| ((a[q.index(row, col)] >> bit) & 1) as u8;
    let mut k = 0;
    let mut i = 0;
    while i + 1 < q.nqx {
        let mut j = 0;
        while j + 1 < q.nqy {
            scratch[k] = b(i + 1, j + 1) | (b(i + 1, j) << 1) | (b(i, j + 1) << 2) | (b(i, j) << 3);
            k += 1;
            j += 2;
        }
        if j < q.nqy {
            scratch[k] = (b(i + 1, j) << 1) | (b(i, j) << 3);
            k += 1;
        }
        i += 2;
    }
    if i < q.nqx {
        let mut j = 0;
        while j + 1 < q.nqy {
            scratch[k] = (b(i, j + 1) << 2) | (b(i, j) << 3);
            k += 1;
            j += 2;
        }
        if j < q.nqy {
            scratch[k] = b(i, j) << 3;
        }
    }
}

/// Collapse each 2x2 block of an `nx` by `ny` code array into one code of
/// non-zero flags, in place.
fn qtree_reduce(scratch: &mut [u8], nx: usize, ny: usize) {
    let nz = |v: u8| u8::from(v != 0);
    let mut k = 0;
    let mut i = 0;
    while i + 1 < nx {
        let mut s00 = ny * i;
        let mut s10 = s00 + ny;
        let mut j = 0;
        while j + 1 < ny {
            scratch[k] = nz(scratch[s10 + 1])
                | (nz(scratch[s10]) << 1)
                | (nz(scratch[s00 + 1]) << 2)
                | (nz(scratch[s00]) << 3);
            k += 1;
            s00 += 2;
            s10 += 2;
            j += 2;
        }
        if j < ny {
            scratch[k] = (nz(scratch[s10]) << 1) | (nz(scratch[s00]) << 3);
            k += 1;
        }
        i += 2;
    }
    if i < nx {
        let mut s00 = ny * i;
        let mut j = 0;
        while j + 1 < ny {
            scratch[k] = (nz(scratch[s00 + 1]) << 2) | (nz(scratch[s00]) << 3);
            k += 1;
            s00 += 2;
            j += 2;
        }
        if j < ny {
            scratch[k] = nz(scratch[s00]) << 3;
        }
    }
}

/// Huffman codes packed least significant bit first; emitted byte-reversed
/// so the decoder meets the coarsest level first.
struct CodeBuffer {
    bytes: Vec<u8>,
    bit_buffer: u32,
    bits: u32,
    bmax: usize,
}

impl CodeBuffer {
    fn new(bmax: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bmax),
            bit_buffer: 0,
            bits: 0,
            bmax,
        }
    }

    /// Returns `true` once the buffer is full and quadtree coding has stopped paying off.
    fn push_codes(&mut self, codes: &[u8]) -> bool {
        for &code in codes.iter().filter(|&&c| c != 0) {
            let c = code as usize;
            self.bit_buffer |= HUFFMAN_CODE[c] << self.bits;
            self.bits += HUFFMAN_LEN[c] as u32;
            if self.bits >= 8 {
                self.bytes.push((self.bit_buffer & 0xff) as u8);
                if self.bytes.len() >= self.bmax {
                    return true;
                }
                self.bit_buffer >>= 8;
                self.bits -= 8;
            }
        }
        false
    }
}

fn output_huffman(writer: &mut BitWriter, value: u8) -> Result<()> {
    let v = value as usize;
    writer.output_nbits(HUFFMAN_CODE[v], HUFFMAN_LEN[v])
}

fn write_bdirect(
    writer: &mut BitWriter,
    a: &[i64],
    q: Quadrant,
    scratch: &mut [u8],
    bit: u32,
) -> Result<()> {
    writer.output_nybble(0x0)?;
    qtree_onebit(a, q, scratch, bit);
    let count = q.nqx.div_ceil(2) * q.nqy.div_ceil(2);
    for &nybble in &scratch[..count] {
        writer.output_nybble(nybble)?;
    }
    Ok(())
}

pub(super) fn qtree_encode(
    writer: &mut BitWriter,
    a: &[i64],
    q: Quadrant,
    nbitplanes: u32,
) -> Result<()> {
    let log2n = ilog2_ceil(q.nqx.max(q.nqy));
    let nqx2 = q.nqx.div_ceil(2);
    let nqy2 = q.nqy.div_ceil(2);
    let bmax = (nqx2 * nqy2).div_ceil(2);
    let mut scratch = vec![0u8; (nqx2 * nqy2).max(1)];

    for bit in (0..nbitplanes).rev() {
        let mut codes = CodeBuffer::new(bmax);

        qtree_onebit(a, q, &mut scratch, bit);
        let mut nx = nqx2;
        let mut ny = nqy2;
        let mut direct = codes.push_codes(&scratch[..nx * ny]);

        let mut k = 1;
        while !direct && k < log2n {
            qtree_reduce(&mut scratch, nx, ny);
            nx = nx.div_ceil(2);
            ny = ny.div_ceil(2);
            direct = codes.push_codes(&scratch[..nx * ny]);
            k += 1;
        }

        if direct {
            write_bdirect(writer, a, q, &mut scratch, bit)?;
            continue;
        }

        writer.output_nybble(0xF)?;
        if codes.bits > 0 {
            let mask = (1u32 << codes.bits) - 1;
            writer.output_nbits(codes.bit_buffer & mask, codes.bits as usize)?;
        } else if codes.bytes.is_empty() {
            output_huffman(writer, 0)?;
        }
        for &byte in codes.bytes.iter().rev() {
            writer.output_nbits(u32::from(byte), 8)?;
        }
    }
    Ok(())
}

//! `RICE_1` tile encoder.
//!
//! The stream opens with the first pixel at full width. Every following
//! pixel is coded as its difference from the previous one, zig-zag folded
//! to an unsigned value, in blocks that each carry a split code saying how
//! the block is laid out.

use super::RicePixel;
use crate::bitbuffer::BitWriter;
use crate::core::Result;

/// Layout chosen for one block of folded differences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockCoding {
    /// Every difference is zero; only the code is written.
    Constant,
    /// Unary high part and `k` verbatim low bits per value.
    Split(usize),
    /// Values too noisy to split are stored at full width.
    Verbatim,
}

pub fn encode_tile<T: RicePixel>(pixels: &[T], block_size: usize) -> Result<Vec<u8>> {
    let Some(&seed) = pixels.first() else {
        return Ok(Vec::new());
    };

    let mut writer = BitWriter::with_capacity(pixels.len() * T::BYTES_PER_ELEMENT + block_size);
    writer.output_nbits(seed.as_signed() as u32, T::BBITS)?;

    let mut previous = seed.as_signed();
    let mut folded = Vec::with_capacity(block_size);
    for block in pixels.chunks(block_size) {
        folded.clear();
        for pixel in block {
            let current = pixel.as_signed();
            folded.push(fold(T::compute_difference(current, previous)));
            previous = current;
        }
        let coding = choose_coding::<T>(&folded);
        emit_block::<T>(&mut writer, &folded, coding)?;
    }
    Ok(writer.finish())
}

/// Zig-zag fold: 0, -1, 1, -2, 2 become 0, 1, 2, 3, 4.
fn fold(diff: i32) -> u32 {
    ((diff << 1) ^ (diff >> 31)) as u32
}

/// Split width from the mean folded value; the half-block bias uses
/// integer division.
fn split_width(total: f64, count: usize) -> usize {
    let mean = ((total - (count / 2) as f64 - 1.0) / count as f64).max(0.0);
    let half = (mean as u32) >> 1;
    (u32::BITS - half.leading_zeros()) as usize
}

fn choose_coding<T: RicePixel>(folded: &[u32]) -> BlockCoding {
    let total: f64 = folded.iter().map(|&v| f64::from(v)).sum();
    match split_width(total, folded.len()) {
        k if k >= T::FSMAX => BlockCoding::Verbatim,
        0 if total == 0.0 => BlockCoding::Constant,
        k => BlockCoding::Split(k),
    }
}

fn emit_block<T: RicePixel>(
    writer: &mut BitWriter,
    folded: &[u32],
    coding: BlockCoding,
) -> Result<()> {
    match coding {
        BlockCoding::Constant => writer.output_nbits(0, T::FSBITS),
        BlockCoding::Verbatim => {
            writer.output_nbits((T::FSMAX + 1) as u32, T::FSBITS)?;
            for &v in folded {
                writer.output_nbits(v, T::BBITS)?;
            }
            Ok(())
        }
        BlockCoding::Split(k) => {
            writer.output_nbits((k + 1) as u32, T::FSBITS)?;
            for &v in folded {
                emit_split(writer, v, k)?;
            }
            Ok(())
        }
    }
}

fn emit_split(writer: &mut BitWriter, value: u32, k: usize) -> Result<()> {
    writer.output_unary((value >> k) as usize)?;
    if k > 0 {
        writer.output_nbits(value & ((1 << k) - 1), k)?;
    }
    Ok(())
}

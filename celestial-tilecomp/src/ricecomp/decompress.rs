//! `RICE_1` tile decoder.

use super::RicePixel;
use crate::bitbuffer::BitReader;
use crate::core::{CompressionError, Result};

/// Restore `npix` pixels from a `RICE_1` stream written with `block_size`.
pub fn decode_tile<T: RicePixel>(stream: &[u8], npix: usize, block_size: usize) -> Result<Vec<T>> {
    if npix == 0 {
        return Ok(Vec::new());
    }

    let mut reader = BitReader::new(stream);
    let seed = T::from_signed(reader.read_bits(T::BBITS)? as i32);
    let mut tile = TileBuilder::new(seed, npix);

    while tile.pixels.len() < npix {
        let count = (npix - tile.pixels.len()).min(block_size);
        let code = reader.read_bits(T::FSBITS)? as usize;
        match code {
            0 => tile.repeat(count),
            c if c == T::FSMAX + 1 => {
                for _ in 0..count {
                    tile.push(reader.read_bits(T::BBITS)?);
                }
            }
            c if c <= T::FSMAX => {
                let k = c - 1;
                for _ in 0..count {
                    let high = reader.count_leading_zeros()? as u32;
                    let low = if k > 0 { reader.read_bits(k)? } else { 0 };
                    tile.push((high << k) | low);
                }
            }
            c => {
                return Err(CompressionError::corrupt(format!(
                    "RICE block code {} above the verbatim code {}",
                    c,
                    T::FSMAX + 1
                )));
            }
        }
    }
    Ok(tile.pixels)
}

/// Inverse of the encoder's zig-zag fold.
fn unfold(folded: u32) -> i32 {
    ((folded >> 1) as i32) ^ -((folded & 1) as i32)
}

/// Accumulates differences onto the running pixel value.
struct TileBuilder<T> {
    pixels: Vec<T>,
    previous: i32,
}

impl<T: RicePixel> TileBuilder<T> {
    fn new(seed: T, npix: usize) -> Self {
        Self {
            pixels: Vec::with_capacity(npix),
            previous: seed.as_signed(),
        }
    }

    fn repeat(&mut self, count: usize) {
        let pixel = T::from_signed(self.previous);
        self.pixels.extend(std::iter::repeat(pixel).take(count));
    }

    fn push(&mut self, folded: u32) {
        let pixel = T::from_signed(self.previous.wrapping_add(unfold(folded)));
        self.previous = pixel.as_signed();
        self.pixels.push(pixel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ricecomp::compress::encode_tile;

    #[test]
    fn zero_pixels_need_no_stream() {
        assert!(decode_tile::<i32>(&[], 0, 32).unwrap().is_empty());
    }

    #[test]
    fn unfold_restores_sign() {
        let diffs: Vec<i32> = [0, 1, 2, 3, 4].into_iter().map(unfold).collect();
        assert_eq!(diffs, vec![0, -1, 1, -2, 2]);
        assert_eq!(unfold(u32::MAX), i32::MIN);
    }

    #[test]
    fn seed_is_sign_extended() {
        // seed then a zero code for a constant block
        assert_eq!(decode_tile::<i16>(&[0xFF, 0xFE, 0x00], 2, 32).unwrap(), vec![-2, -2]);
        assert_eq!(decode_tile::<i8>(&[0x80, 0x00], 1, 32).unwrap(), vec![-128]);
    }

    #[test]
    fn short_seed_is_corrupt() {
        assert!(matches!(
            decode_tile::<i32>(&[0x12], 1, 32),
            Err(CompressionError::CorruptStream(_))
        ));
    }

    #[test]
    fn constant_block_repeats_seed() {
        let data = [0x00, 0x00, 0x00, 0x2A, 0x00];
        assert_eq!(decode_tile::<i32>(&data, 3, 32).unwrap(), vec![42, 42, 42]);
    }

    #[test]
    fn unary_coded_ramp() {
        let data = [0x00, 0x05, 0b0001_1001, 0b0010_0100];
        assert_eq!(decode_tile::<i16>(&data, 4, 32).unwrap(), vec![5, 6, 7, 8]);
    }

    #[test]
    fn verbatim_bytes() {
        // seed 0x10, code 7, then folded 0x00 and 0xAB, a difference of -86
        let data = [0x10, 0b1110_0000, 0b0001_0101, 0b0110_0000];
        assert_eq!(decode_tile::<i8>(&data, 2, 32).unwrap(), vec![0x10, 16 - 86]);
    }

    #[test]
    fn block_code_past_verbatim_is_corrupt() {
        // code 31 for 32-bit pixels
        let data = [0, 0, 0, 0, 0b1111_1000];
        assert!(matches!(
            decode_tile::<i32>(&data, 4, 32),
            Err(CompressionError::CorruptStream(_))
        ));
    }

    #[test]
    fn truncated_stream_is_corrupt() {
        let original: Vec<i32> = (0..64).map(|i| i * i).collect();
        let stream = encode_tile(&original, 32).unwrap();
        assert!(matches!(
            decode_tile::<i32>(&stream[..stream.len() / 2], 64, 32),
            Err(CompressionError::CorruptStream(_))
        ));
    }

    #[test]
    fn short_final_block() {
        let original: Vec<i16> = (0..77).map(|i| ((i * 131) % 997 - 400) as i16).collect();
        let stream = encode_tile(&original, 16).unwrap();
        assert_eq!(decode_tile::<i16>(&stream, original.len(), 16).unwrap(), original);
    }

    #[test]
    fn full_range_differences() {
        let original = vec![i32::MAX, i32::MIN, 0, 1_000_000, -1_000_000, i32::MAX];
        let stream = encode_tile(&original, 32).unwrap();
        assert_eq!(decode_tile::<i32>(&stream, original.len(), 32).unwrap(), original);
    }

    #[test]
    fn wrapping_ramp_tile() {
        // small steps with a drop of almost 1000 whenever the ramp wraps
        let original: Vec<i32> = (10..20)
            .flat_map(|row| (10..20).map(move |col| ((row * 20 + col) * 7) % 1000 - 300))
            .collect();
        for block_size in [8, 16, 32] {
            let stream = encode_tile(&original, block_size).unwrap();
            assert_eq!(decode_tile::<i32>(&stream, 100, block_size).unwrap(), original);
        }
    }
}

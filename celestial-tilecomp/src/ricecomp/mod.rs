//! Block-adaptive Rice coding of first differences (`RICE_1`).

mod compress;
mod decompress;

use byteorder::{BigEndian, ByteOrder};

use crate::core::{CompressionError, Result};

pub const DEFAULT_BLOCK_SIZE: usize = 32;

/// Pixel widths `RICE_1` can code, with the block code widths FITS fixes
/// for each of them.
pub trait RicePixel: Copy {
    /// Bits in a block code.
    const FSBITS: usize;
    /// Largest split width; the code after it marks a verbatim block.
    const FSMAX: usize;
    /// Bits per pixel.
    const BBITS: usize;
    const BYTES_PER_ELEMENT: usize;

    fn compress(pixels: &[Self], block_size: usize) -> Result<Vec<u8>> {
        compress::encode_tile(pixels, block_size)
    }

    fn decompress(stream: &[u8], npix: usize, block_size: usize) -> Result<Vec<Self>> {
        decompress::decode_tile(stream, npix, block_size)
    }

    fn as_signed(self) -> i32;
    fn from_signed(val: i32) -> Self;

    /// Difference wrapped to the sample width.
    fn compute_difference(next_pix: i32, last_pix: i32) -> i32;
}

impl RicePixel for i32 {
    const FSBITS: usize = 5;
    const FSMAX: usize = 25;
    const BBITS: usize = 32;
    const BYTES_PER_ELEMENT: usize = 4;

    fn as_signed(self) -> i32 {
        self
    }

    fn from_signed(val: i32) -> Self {
        val
    }

    fn compute_difference(next_pix: i32, last_pix: i32) -> i32 {
        next_pix.wrapping_sub(last_pix)
    }
}

impl RicePixel for i16 {
    const FSBITS: usize = 4;
    const FSMAX: usize = 14;
    const BBITS: usize = 16;
    const BYTES_PER_ELEMENT: usize = 2;

    fn as_signed(self) -> i32 {
        self as i32
    }

    fn from_signed(val: i32) -> Self {
        val as i16
    }

    fn compute_difference(next_pix: i32, last_pix: i32) -> i32 {
        let diff = (next_pix as i16).wrapping_sub(last_pix as i16);
        diff as i32
    }
}

impl RicePixel for i8 {
    const FSBITS: usize = 3;
    const FSMAX: usize = 6;
    const BBITS: usize = 8;
    const BYTES_PER_ELEMENT: usize = 1;

    fn as_signed(self) -> i32 {
        self as i32
    }

    fn from_signed(val: i32) -> Self {
        val as i8
    }

    fn compute_difference(next_pix: i32, last_pix: i32) -> i32 {
        let diff = (next_pix as i8).wrapping_sub(last_pix as i8);
        diff as i32
    }
}

fn check_block_size(block_size: usize) -> Result<()> {
    if block_size == 0 {
        return Err(CompressionError::params("RICE blocksize must be positive"));
    }
    Ok(())
}

fn check_length(buf: &[u8], bytepix: usize) -> Result<()> {
    if buf.len() % bytepix != 0 {
        return Err(CompressionError::InvalidBufferLength {
            length: buf.len(),
            reason: format!("not a multiple of bytepix {}", bytepix),
        });
    }
    Ok(())
}

/// Rice-compress a big-endian buffer of `bytepix`-wide integers.
pub fn compress_bytes(buf: &[u8], block_size: usize, bytepix: usize) -> Result<Vec<u8>> {
    check_block_size(block_size)?;
    match bytepix {
        1 => {
            let pixels: Vec<i8> = buf.iter().map(|&b| b as i8).collect();
            i8::compress(&pixels, block_size)
        }
        2 => {
            check_length(buf, 2)?;
            let mut pixels = vec![0i16; buf.len() / 2];
            BigEndian::read_i16_into(buf, &mut pixels);
            i16::compress(&pixels, block_size)
        }
        4 => {
            check_length(buf, 4)?;
            let mut pixels = vec![0i32; buf.len() / 4];
            BigEndian::read_i32_into(buf, &mut pixels);
            i32::compress(&pixels, block_size)
        }
        other => Err(CompressionError::params(format!(
            "unsupported RICE bytepix {} (expected 1, 2 or 4)",
            other
        ))),
    }
}

/// Inverse of [`compress_bytes`]; `tile_size` is the pixel count of the tile.
pub fn decompress_bytes(
    compressed: &[u8],
    block_size: usize,
    bytepix: usize,
    tile_size: usize,
) -> Result<Vec<u8>> {
    check_block_size(block_size)?;
    match bytepix {
        1 => {
            let pixels = i8::decompress(compressed, tile_size, block_size)?;
            Ok(pixels.into_iter().map(|p| p as u8).collect())
        }
        2 => {
            let pixels = i16::decompress(compressed, tile_size, block_size)?;
            let mut bytes = vec![0u8; pixels.len() * 2];
            BigEndian::write_i16_into(&pixels, &mut bytes);
            Ok(bytes)
        }
        4 => {
            let pixels = i32::decompress(compressed, tile_size, block_size)?;
            let mut bytes = vec![0u8; pixels.len() * 4];
            BigEndian::write_i32_into(&pixels, &mut bytes);
            Ok(bytes)
        }
        other => Err(CompressionError::params(format!(
            "unsupported RICE bytepix {} (expected 1, 2 or 4)",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i32_constants() {
        assert_eq!(i32::FSBITS, 5);
        assert_eq!(i32::FSMAX, 25);
        assert_eq!(i32::BBITS, 32);
        assert_eq!(i32::BYTES_PER_ELEMENT, 4);
    }

    #[test]
    fn test_i16_constants() {
        assert_eq!(i16::FSBITS, 4);
        assert_eq!(i16::FSMAX, 14);
        assert_eq!(i16::BBITS, 16);
        assert_eq!(i16::BYTES_PER_ELEMENT, 2);
    }

    #[test]
    fn test_i8_constants() {
        assert_eq!(i8::FSBITS, 3);
        assert_eq!(i8::FSMAX, 6);
        assert_eq!(i8::BBITS, 8);
        assert_eq!(i8::BYTES_PER_ELEMENT, 1);
    }

    #[test]
    fn test_narrow_differences_wrap() {
        assert_eq!(i16::compute_difference(-32768, 32767), 1);
        assert_eq!(i8::compute_difference(127, -128), -1);
        assert_eq!(i32::compute_difference(i32::MIN, i32::MAX), 1);
    }

    #[test]
    fn test_hundred_pixels_blocksize_32() {
        let pixels: Vec<i32> = (0..100).map(|i| (i * 37 % 101) - 50).collect();
        let mut buf = vec![0u8; 400];
        BigEndian::write_i32_into(&pixels, &mut buf);

        let compressed = compress_bytes(&buf, 32, 4).unwrap();
        let restored = decompress_bytes(&compressed, 32, 4, 100).unwrap();
        assert_eq!(restored, buf);
    }

    #[test]
    fn test_byte_pixels_round_trip() {
        let buf: Vec<u8> = (0..=255u8).chain((0..=255u8).rev()).collect();
        let compressed = compress_bytes(&buf, 16, 1).unwrap();
        let restored = decompress_bytes(&compressed, 16, 1, buf.len()).unwrap();
        assert_eq!(restored, buf);
    }

    #[test]
    fn test_short_pixels_round_trip() {
        let pixels: Vec<i16> = vec![i16::MIN, i16::MAX, 0, -1, 1, 1000, -1000, 7];
        let mut buf = vec![0u8; pixels.len() * 2];
        BigEndian::write_i16_into(&pixels, &mut buf);

        let compressed = compress_bytes(&buf, 32, 2).unwrap();
        let restored = decompress_bytes(&compressed, 32, 2, pixels.len()).unwrap();
        assert_eq!(restored, buf);
    }

    fn wrapping_ramp(npix: usize, scale: i64) -> Vec<i64> {
        (0..npix as i64).map(|i| ((i * 7) % 1000 - 300) * scale).collect()
    }

    #[test]
    fn test_wrapping_ramp_every_width() {
        // tile 3 of a 20x20 ramp image cut into 10x10 tiles
        let tile: Vec<i64> = (10..20)
            .flat_map(|row| (10..20).map(move |col| ((row * 20 + col) * 7) % 1000 - 300))
            .collect();

        let words: Vec<u8> = tile.iter().flat_map(|&v| (v as i32).to_be_bytes()).collect();
        let shorts: Vec<u8> = wrapping_ramp(400, 30)
            .iter()
            .flat_map(|&v| (v as i16).to_be_bytes())
            .collect();
        let bytes: Vec<u8> = wrapping_ramp(400, 1).iter().map(|&v| (v / 8) as u8).collect();

        for (buf, bytepix) in [(words, 4), (shorts, 2), (bytes, 1)] {
            for block_size in [16, 32] {
                let npix = buf.len() / bytepix;
                let compressed = compress_bytes(&buf, block_size, bytepix).unwrap();
                let restored = decompress_bytes(&compressed, block_size, bytepix, npix).unwrap();
                assert_eq!(restored, buf, "bytepix {} blocksize {}", bytepix, block_size);
            }
        }
    }

    #[test]
    fn test_unsupported_bytepix() {
        assert!(matches!(
            compress_bytes(&[0u8; 16], 32, 8),
            Err(CompressionError::InvalidParameters(_))
        ));
        assert!(matches!(
            decompress_bytes(&[0u8; 16], 32, 3, 2),
            Err(CompressionError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_misaligned_buffer() {
        assert!(matches!(
            compress_bytes(&[0u8; 5], 32, 4),
            Err(CompressionError::InvalidBufferLength { length: 5, .. })
        ));
    }

    #[test]
    fn test_zero_block_size() {
        assert!(compress_bytes(&[0u8; 4], 0, 4).is_err());
    }
}

//! H-transform wavelet compression (`HCOMPRESS_1`).
//!
//! Stream layout: magic `DD 99`, rows, columns and scale as big-endian `i32`,
//! the coefficient sum as big-endian `i64`, three bit-plane counts, the
//! quadtree-coded quadrants, an EOF nybble and finally the sign bits of the
//! non-zero coefficients.

mod decode;
mod encode;
mod htrans;
mod smooth;

use byteorder::{BigEndian, ByteOrder};

use crate::bitbuffer::{BitReader, BitWriter};
use crate::core::{CompressionError, Result};
use decode::qtree_decode;
use encode::{qtree_encode, Quadrant};

const HCOMP_MAGIC: [u8; 2] = [0xDD, 0x99];
const HEADER_LEN: usize = 25;

pub(crate) const HUFFMAN_CODE: [u32; 16] = [
    0x3e, 0x00, 0x01, 0x08, 0x02, 0x09, 0x1a, 0x1b, 0x03, 0x1c, 0x0a, 0x1d, 0x0b, 0x1e, 0x3f, 0x0c,
];
pub(crate) const HUFFMAN_LEN: [usize; 16] = [6, 3, 3, 4, 3, 4, 5, 5, 3, 5, 4, 5, 4, 5, 6, 4];

/// Smallest `k` with `2^k >= n`.
pub(crate) fn ilog2_ceil(n: usize) -> u32 {
    if n <= 1 {
        0
    } else {
        usize::BITS - (n - 1).leading_zeros()
    }
}

fn check_dimensions(nx: i64, ny: i64, len: Option<usize>) -> Result<(usize, usize)> {
    if nx <= 0 || ny <= 0 {
        return Err(CompressionError::params(format!(
            "HCOMPRESS dimensions must be positive, got nx={} ny={}",
            nx, ny
        )));
    }
    let (ncols, nrows) = (nx as usize, ny as usize);
    if let Some(len) = len {
        if len != ncols * nrows {
            return Err(CompressionError::InvalidBufferLength {
                length: len,
                reason: format!("expected {} x {} pixels", nx, ny),
            });
        }
    }
    Ok((ncols, nrows))
}

/// The four quadrants of the top transform level and the index into the
/// bit-plane counts each one uses.
fn quadrants(nrows: usize, ncols: usize) -> [(Quadrant, usize); 4] {
    let nx2 = nrows.div_ceil(2);
    let ny2 = ncols.div_ceil(2);
    let q = |offset, nqx, nqy| Quadrant {
        offset,
        stride: ncols,
        nqx,
        nqy,
    };
    [
        (q(0, nx2, ny2), 0),
        (q(ny2, nx2, ncols / 2), 1),
        (q(ncols * nx2, nrows / 2, ny2), 1),
        (q(ncols * nx2 + ny2, nrows / 2, ncols / 2), 2),
    ]
}

fn bit_length(v: i64) -> u32 {
    i64::BITS - v.leading_zeros()
}

/// Compress `nx` (fast axis) by `ny` (slow axis) pixels.
pub fn compress(pixels: &[i64], nx: i64, ny: i64, scale: i64) -> Result<Vec<u8>> {
    let (ncols, nrows) = check_dimensions(nx, ny, Some(pixels.len()))?;
    if !(0..=i64::from(i32::MAX)).contains(&scale) {
        return Err(CompressionError::params(format!(
            "HCOMPRESS scale must be between 0 and {}, got {}",
            i32::MAX,
            scale
        )));
    }

    let mut a = pixels.to_vec();
    htrans::htrans(&mut a, nrows, ncols)?;
    htrans::digitize(&mut a, scale);

    let sum = a[0];
    a[0] = 0;

    let mut signs = BitWriter::with_capacity(a.len() / 8 + 1);
    let mut vmax = [0i64; 3];
    let nx2 = nrows.div_ceil(2);
    let ny2 = ncols.div_ceil(2);
    for row in 0..nrows {
        for col in 0..ncols {
            let v = &mut a[row * ncols + col];
            if *v != 0 {
                signs.output_nbits(u32::from(*v < 0), 1)?;
                *v = v.checked_abs().ok_or_else(|| {
                    CompressionError::ValueOutOfRange("H-transform coefficient of i64::MIN".into())
                })?;
            }
            let q = usize::from(col >= ny2) + usize::from(row >= nx2);
            vmax[q] = vmax[q].max(*v);
        }
    }
    let nbitplanes = vmax.map(bit_length);

    let mut header = [0u8; HEADER_LEN];
    header[..2].copy_from_slice(&HCOMP_MAGIC);
    BigEndian::write_i32(&mut header[2..6], nrows as i32);
    BigEndian::write_i32(&mut header[6..10], ncols as i32);
    BigEndian::write_i32(&mut header[10..14], scale as i32);
    BigEndian::write_i64(&mut header[14..22], sum);
    for (slot, &nbp) in header[22..].iter_mut().zip(nbitplanes.iter()) {
        *slot = nbp as u8;
    }

    let mut writer = BitWriter::with_capacity(a.len());
    for (quadrant, plane_index) in quadrants(nrows, ncols) {
        qtree_encode(&mut writer, &a, quadrant, nbitplanes[plane_index])?;
    }
    writer.output_nybble(0)?;

    let mut output = header.to_vec();
    output.extend(writer.finish());
    output.extend(signs.finish());
    Ok(output)
}

/// Inverse of [`compress`]; `smooth` applies the blockiness filter on lossy data.
pub fn decompress(data: &[u8], nx: i64, ny: i64, smooth: bool) -> Result<Vec<i64>> {
    let (ncols, nrows) = check_dimensions(nx, ny, None)?;

    if data.len() < HEADER_LEN {
        return Err(CompressionError::corrupt("HCOMPRESS header truncated"));
    }
    if data[..2] != HCOMP_MAGIC {
        return Err(CompressionError::corrupt("bad HCOMPRESS magic number"));
    }
    let header_rows = BigEndian::read_i32(&data[2..6]);
    let header_cols = BigEndian::read_i32(&data[6..10]);
    if header_rows as i64 != ny || header_cols as i64 != nx {
        return Err(CompressionError::corrupt(format!(
            "HCOMPRESS stream is {} x {}, expected {} x {}",
            header_cols, header_rows, nx, ny
        )));
    }
    let scale = BigEndian::read_i32(&data[10..14]) as i64;
    if scale < 0 {
        return Err(CompressionError::corrupt("negative HCOMPRESS scale"));
    }
    let sum = BigEndian::read_i64(&data[14..22]);
    let mut nbitplanes = [0u32; 3];
    for (nbp, &byte) in nbitplanes.iter_mut().zip(&data[22..HEADER_LEN]) {
        if byte > 63 {
            return Err(CompressionError::corrupt(format!(
                "HCOMPRESS bit-plane count {} too large",
                byte
            )));
        }
        *nbp = u32::from(byte);
    }

    let mut a = vec![0i64; nrows * ncols];
    let mut reader = BitReader::new(&data[HEADER_LEN..]);
    for (quadrant, plane_index) in quadrants(nrows, ncols) {
        qtree_decode(&mut reader, &mut a, quadrant, nbitplanes[plane_index])?;
    }
    if reader.read_nybble()? != 0 {
        return Err(CompressionError::corrupt("missing HCOMPRESS EOF code"));
    }

    reader.align_to_byte();
    for v in a.iter_mut().filter(|v| **v != 0) {
        if reader.read_bit()? {
            *v = -*v;
        }
    }

    a[0] = sum;
    htrans::undigitize(&mut a, scale)?;
    htrans::hinv(&mut a, nrows, ncols, smooth, scale)?;
    Ok(a)
}

fn read_pixels(buf: &[u8], bytepix: usize) -> Result<Vec<i64>> {
    if buf.len() % bytepix != 0 {
        return Err(CompressionError::InvalidBufferLength {
            length: buf.len(),
            reason: format!("not a multiple of bytepix {}", bytepix),
        });
    }
    Ok(match bytepix {
        1 => buf.iter().map(|&b| i64::from(b)).collect(),
        2 => buf.chunks_exact(2).map(|c| i64::from(BigEndian::read_i16(c))).collect(),
        4 => buf.chunks_exact(4).map(|c| i64::from(BigEndian::read_i32(c))).collect(),
        _ => buf.chunks_exact(8).map(BigEndian::read_i64).collect(),
    })
}

fn write_pixels(values: &[i64], bytepix: usize) -> Vec<u8> {
    let mut out = vec![0u8; values.len() * bytepix];
    match bytepix {
        1 => {
            for (o, &v) in out.iter_mut().zip(values) {
                *o = v.clamp(0, i64::from(u8::MAX)) as u8;
            }
        }
        2 => {
            for (o, &v) in out.chunks_exact_mut(2).zip(values) {
                BigEndian::write_i16(o, v.clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16);
            }
        }
        4 => {
            for (o, &v) in out.chunks_exact_mut(4).zip(values) {
                BigEndian::write_i32(o, v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32);
            }
        }
        _ => BigEndian::write_i64_into(values, &mut out),
    }
    out
}

fn check_bytepix(bytepix: usize) -> Result<()> {
    if matches!(bytepix, 1 | 2 | 4 | 8) {
        Ok(())
    } else {
        Err(CompressionError::params(format!(
            "unsupported HCOMPRESS bytepix {} (expected 1, 2, 4 or 8)",
            bytepix
        )))
    }
}

/// Compress a big-endian tile buffer; 1-byte pixels are unsigned.
pub fn compress_bytes(buf: &[u8], nx: i64, ny: i64, scale: i64, bytepix: usize) -> Result<Vec<u8>> {
    check_bytepix(bytepix)?;
    let pixels = read_pixels(buf, bytepix)?;
    compress(&pixels, nx, ny, scale)
}

/// Decompress into a big-endian buffer of `bytepix`-wide pixels, clamping
/// smoothed values into the output range.
pub fn decompress_bytes(
    data: &[u8],
    nx: i64,
    ny: i64,
    smooth: bool,
    bytepix: usize,
) -> Result<Vec<u8>> {
    check_bytepix(bytepix)?;
    let values = decompress(data, nx, ny, smooth)?;
    Ok(write_pixels(&values, bytepix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn noisy_image(nx: usize, ny: usize, seed: u64) -> Vec<i64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..nx * ny)
            .map(|i| 1000 + (i % nx) as i64 * 3 + rng.gen_range(-40..40))
            .collect()
    }

    #[test]
    fn test_ilog2_ceil() {
        assert_eq!(ilog2_ceil(0), 0);
        assert_eq!(ilog2_ceil(1), 0);
        assert_eq!(ilog2_ceil(2), 1);
        assert_eq!(ilog2_ceil(3), 2);
        assert_eq!(ilog2_ceil(4), 2);
        assert_eq!(ilog2_ceil(25), 5);
    }

    #[test]
    fn test_header_layout() {
        let pixels = vec![7i64; 6];
        let data = compress(&pixels, 3, 2, 0).unwrap();
        assert_eq!(&data[..2], &HCOMP_MAGIC);
        assert_eq!(BigEndian::read_i32(&data[2..6]), 2);
        assert_eq!(BigEndian::read_i32(&data[6..10]), 3);
        assert_eq!(BigEndian::read_i32(&data[10..14]), 0);
    }

    #[test]
    fn test_lossless_round_trip_odd_shapes() {
        for &(nx, ny) in &[(1, 1), (1, 7), (5, 1), (3, 3), (25, 25), (17, 6), (64, 33)] {
            let pixels = noisy_image(nx, ny, (nx * 31 + ny) as u64);
            let data = compress(&pixels, nx as i64, ny as i64, 0).unwrap();
            let restored = decompress(&data, nx as i64, ny as i64, false).unwrap();
            assert_eq!(restored, pixels, "shape {}x{}", nx, ny);
        }
    }

    #[test]
    fn test_negative_and_large_values() {
        let pixels: Vec<i64> = (0..40)
            .map(|i| if i % 3 == 0 { -(i64::from(i32::MAX)) + i } else { i * 1_000_003 })
            .collect();
        let data = compress(&pixels, 8, 5, 1).unwrap();
        assert_eq!(decompress(&data, 8, 5, false).unwrap(), pixels);
    }

    #[test]
    fn test_lossy_error_bounded_by_scale() {
        let (nx, ny, scale) = (32, 32, 8);
        let pixels = noisy_image(nx, ny, 3);
        let data = compress(&pixels, nx as i64, ny as i64, scale).unwrap();
        let lossless = compress(&pixels, nx as i64, ny as i64, 0).unwrap();
        assert!(data.len() < lossless.len());

        let restored = decompress(&data, nx as i64, ny as i64, false).unwrap();
        let max_err = pixels
            .iter()
            .zip(&restored)
            .map(|(a, b)| (a - b).abs())
            .max()
            .unwrap();
        assert!(max_err <= scale * 2, "max error {}", max_err);
    }

    #[test]
    fn test_smoothing_stays_near_original() {
        let (nx, ny, scale) = (40, 24, 16);
        let pixels = noisy_image(nx, ny, 9);
        let data = compress(&pixels, nx as i64, ny as i64, scale).unwrap();
        let plain = decompress(&data, nx as i64, ny as i64, false).unwrap();
        let smoothed = decompress(&data, nx as i64, ny as i64, true).unwrap();
        for ((p, s), o) in plain.iter().zip(&smoothed).zip(&pixels) {
            assert!((p - s).abs() <= scale * 2);
            assert!((s - o).abs() <= scale * 4);
        }
    }

    #[test]
    fn test_constant_image_compresses_to_header() {
        let pixels = vec![123i64; 100];
        let data = compress(&pixels, 10, 10, 0).unwrap();
        assert_eq!(&data[22..25], &[0, 0, 0]);
        assert_eq!(decompress(&data, 10, 10, false).unwrap(), pixels);
    }

    #[test]
    fn test_full_width_pixels_out_of_range() {
        let pixels = [i64::MAX - 3, i64::MAX, i64::MAX - 1, i64::MAX - 7];
        let buf: Vec<u8> = pixels.iter().flat_map(|v| v.to_be_bytes()).collect();
        assert!(matches!(
            compress_bytes(&buf, 2, 2, 0, 8),
            Err(CompressionError::ValueOutOfRange(_))
        ));
        assert!(matches!(
            compress(&[i64::MIN, i64::MIN, 0, 0], 2, 2, 4),
            Err(CompressionError::ValueOutOfRange(_))
        ));
        assert!(compress(&[1, 2, 3, 4], 2, 2, i64::from(i32::MAX) + 1).is_err());
    }

    #[test]
    fn test_wide_pixels_round_trip() {
        let pixels: Vec<i64> = (0..30)
            .map(|i| if i % 2 == 0 { (1 << 56) + i * 977 } else { -(1 << 55) - i })
            .collect();
        let buf = write_pixels(&pixels, 8);
        let data = compress_bytes(&buf, 6, 5, 0, 8).unwrap();
        assert_eq!(decompress_bytes(&data, 6, 5, false, 8).unwrap(), buf);
    }

    #[test]
    fn test_damaged_sum_is_corrupt() {
        let pixels: Vec<i64> = (0..16).collect();
        let mut data = compress(&pixels, 4, 4, 0).unwrap();
        data[14..22].copy_from_slice(&i64::MAX.to_be_bytes());
        assert!(matches!(
            decompress(&data, 4, 4, false),
            Err(CompressionError::CorruptStream(_))
        ));

        let mut data = compress(&pixels, 4, 4, 6).unwrap();
        data[14..22].copy_from_slice(&(i64::MAX / 4).to_be_bytes());
        assert!(matches!(
            decompress(&data, 4, 4, true),
            Err(CompressionError::CorruptStream(_))
        ));
    }

    #[test]
    fn test_bad_magic() {
        let mut data = compress(&[1, 2, 3, 4], 2, 2, 0).unwrap();
        data[0] = 0;
        assert!(matches!(
            decompress(&data, 2, 2, false),
            Err(CompressionError::CorruptStream(_))
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let data = compress(&[1, 2, 3, 4, 5, 6], 3, 2, 0).unwrap();
        assert!(matches!(
            decompress(&data, 2, 3, false),
            Err(CompressionError::CorruptStream(_))
        ));
    }

    #[test]
    fn test_truncated_stream() {
        let pixels = noisy_image(16, 16, 1);
        let data = compress(&pixels, 16, 16, 0).unwrap();
        assert!(decompress(&data[..30], 16, 16, false).is_err());
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            compress(&[], 0, 1, 0),
            Err(CompressionError::InvalidParameters(_))
        ));
        assert!(matches!(
            compress(&[1], 1, 1, -1),
            Err(CompressionError::InvalidParameters(_))
        ));
        assert!(matches!(
            compress_bytes(&[0; 3], 1, 1, 0, 3),
            Err(CompressionError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_bytes_api_per_width() {
        let values: Vec<i64> = (0..12).map(|i| i * 9).collect();
        for bytepix in [1usize, 2, 4, 8] {
            let buf = write_pixels(&values, bytepix);
            let data = compress_bytes(&buf, 4, 3, 0, bytepix).unwrap();
            assert_eq!(decompress_bytes(&data, 4, 3, false, bytepix).unwrap(), buf);
        }
    }

    #[test]
    fn test_unsigned_bytes() {
        let buf = vec![200u8, 255, 0, 17];
        let data = compress_bytes(&buf, 2, 2, 0, 1).unwrap();
        assert_eq!(decompress_bytes(&data, 2, 2, false, 1).unwrap(), buf);
    }
}

//! Whole-image compression: split an N-dimensional image into tiles, run
//! each through the quantizer and a codec, and store the results as rows of
//! a compressed image table.
//!
//! ```no_run
//! use celestial_tilecomp::compression::CompressionAlgorithm;
//! use celestial_tilecomp::core::PixelData;
//! use celestial_tilecomp::tiled::{compress_image, decompress_image, CompressionConfig, Image};
//!
//! # fn main() -> celestial_tilecomp::core::Result<()> {
//! let image = Image::new(vec![100, 100], PixelData::I16(vec![0; 10_000]))?;
//! let config = CompressionConfig::new(CompressionAlgorithm::Rice1, vec![25, 25]);
//! let compressed = compress_image(&image, &config)?;
//! let restored = decompress_image(&compressed)?;
//! assert_eq!(restored, image);
//! # Ok(())
//! # }
//! ```

pub mod geometry;
pub mod heap;
pub mod settings;

use log::{debug, trace, warn};
use rayon::prelude::*;

use crate::compression::{compress_tile, decompress_tile, CompressionAlgorithm, Parameters};
use crate::core::{BitPix, CompressionError, PixelData, Result};
use crate::header::Keyword;
use crate::quantize::Quantize;

pub use geometry::{TileGrid, TileRegion};
pub use heap::TileRecord;
pub use settings::{CompressionConfig, CompressionHeader, QuantizeSettings};

/// An image as a flat pixel array, first axis varying fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub shape: Vec<usize>,
    pub data: PixelData,
}

impl Image {
    pub fn new(shape: Vec<usize>, data: PixelData) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if shape.is_empty() || data.len() != expected {
            return Err(CompressionError::InvalidBufferLength {
                length: data.len(),
                reason: format!("image shape {:?} needs {} pixels", shape, expected),
            });
        }
        Ok(Self { shape, data })
    }

    pub fn bitpix(&self) -> BitPix {
        self.data.bitpix()
    }
}

/// A compressed image HDU: its `Z*` description and one record per tile.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedImage {
    pub header: CompressionHeader,
    pub tiles: Vec<TileRecord>,
}

impl CompressedImage {
    /// Float images carry the `GZIP_COMPRESSED_DATA`, `ZSCALE` and `ZZERO`
    /// columns.
    pub fn float_columns(&self) -> bool {
        self.header.bitpix.is_float()
    }

    /// Header keywords for the HDU, compression keywords first.
    pub fn keywords(&self) -> Vec<Keyword> {
        let mut keywords = self.header.keywords();
        keywords.extend(heap::table_keywords(&self.tiles, self.float_columns()));
        keywords
    }

    /// The table rows followed by the heap.
    pub fn to_table_bytes(&self) -> Result<Vec<u8>> {
        heap::to_table_bytes(&self.tiles, self.float_columns())
    }

    pub fn from_table_bytes(keywords: &[Keyword], bytes: &[u8]) -> Result<Self> {
        let header = CompressionHeader::from_keywords(keywords)?;
        let nrows = header.grid()?.tile_count();
        let tiles = heap::from_table_bytes(bytes, nrows, header.bitpix.is_float())?;
        Ok(Self { header, tiles })
    }

    /// Decompress a single tile without touching the others.
    pub fn tile_pixels(&self, index: usize) -> Result<PixelData> {
        let grid = self.header.grid()?;
        let region = grid.tile(index)?;
        let bytes = decompress_one(&self.header, &region, self.record(index)?)?;
        PixelData::from_be_bytes(self.header.bitpix, &bytes)
    }

    fn record(&self, index: usize) -> Result<&TileRecord> {
        self.tiles.get(index).ok_or_else(|| {
            CompressionError::corrupt(format!(
                "tile {} missing, table has {} rows",
                index,
                self.tiles.len()
            ))
        })
    }
}

pub fn compress_image(image: &Image, config: &CompressionConfig) -> Result<CompressedImage> {
    let bitpix = image.bitpix();
    config.validate(bitpix)?;
    let header = CompressionHeader::from_config(config, bitpix, &image.shape);
    let grid = header.grid()?;
    debug!(
        "compressing {:?} {:?} image with {} in {} tiles of {:?}",
        bitpix,
        image.shape,
        header.algorithm,
        grid.tile_count(),
        grid.tile_shape()
    );

    let pixels = image.data.to_be_bytes();
    let tiles = (0..grid.tile_count())
        .into_par_iter()
        .map(|index| {
            let region = grid.tile(index)?;
            let bytes = grid.extract(&pixels, bitpix.bytes_per_pixel(), &region);
            compress_one(&header, &region, bytes)
        })
        .collect::<Result<Vec<_>>>()?;

    let compressed = CompressedImage { header, tiles };
    debug!(
        "compressed {} pixel bytes into a {} byte heap",
        pixels.len(),
        compressed
            .tiles
            .iter()
            .map(|t| t.compressed.len() + t.gzip_compressed.len())
            .sum::<usize>()
    );
    Ok(compressed)
}

pub fn decompress_image(compressed: &CompressedImage) -> Result<Image> {
    let header = &compressed.header;
    let grid = header.grid()?;
    if compressed.tiles.len() != grid.tile_count() {
        return Err(CompressionError::corrupt(format!(
            "expected {} tiles, table has {}",
            grid.tile_count(),
            compressed.tiles.len()
        )));
    }
    debug!(
        "decompressing {:?} {:?} image from {} {} tiles",
        header.bitpix,
        header.shape,
        grid.tile_count(),
        header.algorithm
    );

    let decoded = (0..grid.tile_count())
        .into_par_iter()
        .map(|index| {
            let region = grid.tile(index)?;
            let bytes = decompress_one(header, &region, &compressed.tiles[index])?;
            Ok((region, bytes))
        })
        .collect::<Result<Vec<_>>>()?;

    let elem = header.bitpix.bytes_per_pixel();
    let mut pixels = vec![0u8; grid.pixel_count() * elem];
    for (region, bytes) in &decoded {
        grid.insert(&mut pixels, elem, region, bytes);
    }
    Image::new(
        header.shape.clone(),
        PixelData::from_be_bytes(header.bitpix, &pixels)?,
    )
}

fn quantizer(header: &CompressionHeader, region: &TileRegion) -> Result<Option<Quantize>> {
    header
        .quantize
        .map(|q| {
            Quantize::new(
                region.index as i64 + q.seed,
                q.dither,
                q.level,
                header.bitpix.value(),
            )
        })
        .transpose()
}

fn compress_one(
    header: &CompressionHeader,
    region: &TileRegion,
    bytes: Vec<u8>,
) -> Result<TileRecord> {
    let algorithm = header.algorithm.fits_name();
    let params = header.tile_parameters(region);

    let Some(quantize) = quantizer(header, region)? else {
        trace!("tile {}: {} pixels", region.index, region.len());
        return Ok(TileRecord::raw(compress_tile(&bytes, algorithm, &params)?));
    };

    let (nx, ny) = region.plane_dims();
    let quantized = match PixelData::from_be_bytes(header.bitpix, &bytes)? {
        PixelData::F32(values) => quantize.encode_quantized_image(&values, nx, ny),
        PixelData::F64(values) => quantize.encode_quantized_image(&values, nx, ny),
        other => return Err(CompressionError::InvalidBitPix(other.bitpix().value())),
    };

    match quantized {
        Ok(tile) => {
            trace!(
                "tile {}: quantized with scale {} zero {}",
                region.index,
                tile.scale,
                tile.zero
            );
            let ints = PixelData::I32(tile.data).to_be_bytes();
            Ok(TileRecord::quantized(
                compress_tile(&ints, algorithm, &params)?,
                tile.scale,
                tile.zero,
            ))
        }
        Err(CompressionError::QuantizationFailed(reason)) => {
            warn!(
                "tile {} stored losslessly with GZIP_1: {}",
                region.index, reason
            );
            let gzip = CompressionAlgorithm::Gzip1.fits_name();
            Ok(TileRecord::gzip_fallback(compress_tile(
                &bytes,
                gzip,
                &Parameters::new(),
            )?))
        }
        Err(e) => Err(e),
    }
}

fn decompress_one(
    header: &CompressionHeader,
    region: &TileRegion,
    record: &TileRecord,
) -> Result<Vec<u8>> {
    let elem = header.bitpix.bytes_per_pixel();
    let bytes = if record.is_fallback() {
        trace!("tile {}: GZIP_1 fallback", region.index);
        decompress_tile(
            &record.gzip_compressed,
            CompressionAlgorithm::Gzip1.fits_name(),
            &Parameters::new(),
        )?
    } else {
        let algorithm = header.algorithm.fits_name();
        let params = header.tile_parameters(region);
        let raw = decompress_tile(&record.compressed, algorithm, &params)?;

        match (quantizer(header, region)?, record.zscale, record.zzero) {
            (Some(quantize), Some(scale), Some(zero)) => {
                let ints = match PixelData::from_be_bytes(BitPix::I32, &raw)? {
                    PixelData::I32(v) => v,
                    other => return Err(CompressionError::InvalidBitPix(other.bitpix().value())),
                };
                quantize.decode_quantized(&ints, scale, zero)?.to_be_bytes()
            }
            (Some(_), _, _) => {
                return Err(CompressionError::corrupt(format!(
                    "tile {} is quantized but has no ZSCALE/ZZERO",
                    region.index
                )));
            }
            (None, _, _) if header.algorithm == CompressionAlgorithm::Plio1 => {
                widen_plio(&raw, header.bitpix)?
            }
            (None, _, _) => raw,
        }
    };

    if bytes.len() != region.len() * elem {
        return Err(CompressionError::corrupt(format!(
            "tile {} decoded to {} bytes, expected {}",
            region.index,
            bytes.len(),
            region.len() * elem
        )));
    }
    Ok(bytes)
}

/// PLIO always decodes to 32-bit integers; convert to the image pixel width.
fn widen_plio(raw: &[u8], bitpix: BitPix) -> Result<Vec<u8>> {
    let values = match PixelData::from_be_bytes(BitPix::I32, raw)? {
        PixelData::I32(v) => v,
        other => return Err(CompressionError::InvalidBitPix(other.bitpix().value())),
    };
    let out_of_range =
        |v: i32| CompressionError::ValueOutOfRange(format!("PLIO value {} exceeds {:?}", v, bitpix));
    let data = match bitpix {
        BitPix::U8 => PixelData::U8(
            values
                .into_iter()
                .map(|v| u8::try_from(v).map_err(|_| out_of_range(v)))
                .collect::<Result<_>>()?,
        ),
        BitPix::I16 => PixelData::I16(
            values
                .into_iter()
                .map(|v| i16::try_from(v).map_err(|_| out_of_range(v)))
                .collect::<Result<_>>()?,
        ),
        BitPix::I32 => PixelData::I32(values),
        BitPix::I64 => PixelData::I64(values.into_iter().map(i64::from).collect()),
        other => return Err(CompressionError::InvalidBitPix(other.value())),
    };
    Ok(data.to_be_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantize::DitherMethod;
    use approx::assert_abs_diff_eq;

    fn ramp_i32(shape: &[usize]) -> Image {
        let n: usize = shape.iter().product();
        let data = (0..n as i32).map(|i| (i * 7) % 1000 - 300).collect();
        Image::new(shape.to_vec(), PixelData::I32(data)).unwrap()
    }

    #[test]
    fn image_shape_checked() {
        assert!(Image::new(vec![3, 3], PixelData::U8(vec![0; 8])).is_err());
        assert!(Image::new(vec![], PixelData::U8(vec![])).is_err());
    }

    #[test]
    fn lossless_integer_codecs() {
        let image = ramp_i32(&[37, 21]);
        for algorithm in [
            CompressionAlgorithm::Gzip1,
            CompressionAlgorithm::Gzip2,
            CompressionAlgorithm::Rice1,
            CompressionAlgorithm::Hcompress1,
        ] {
            let config = CompressionConfig::new(algorithm, vec![16, 8]);
            let compressed = compress_image(&image, &config).unwrap();
            assert_eq!(compressed.tiles.len(), 9);
            assert_eq!(decompress_image(&compressed).unwrap(), image, "{}", algorithm);
        }
    }

    #[test]
    fn plio_converts_to_pixel_width() {
        let data: Vec<u8> = (0..60).map(|i| if i % 10 < 4 { 3 } else { 0 }).collect();
        let image = Image::new(vec![10, 6], PixelData::U8(data)).unwrap();
        let config = CompressionConfig::new(CompressionAlgorithm::Plio1, vec![10, 2]);
        let compressed = compress_image(&image, &config).unwrap();
        assert_eq!(decompress_image(&compressed).unwrap(), image);
    }

    #[test]
    fn three_dimensional_tiles() {
        let image = ramp_i32(&[8, 5, 3]);
        let config = CompressionConfig::new(CompressionAlgorithm::Hcompress1, vec![8, 5, 1]);
        let compressed = compress_image(&image, &config).unwrap();
        assert_eq!(compressed.tiles.len(), 3);
        assert_eq!(decompress_image(&compressed).unwrap(), image);
    }

    #[test]
    fn quantized_floats_within_step() {
        let n = 64 * 32;
        let values: Vec<f32> = (0..n)
            .map(|i| 100.0 + (i as f32 * 0.37).sin() * 20.0 + (i % 7) as f32)
            .collect();
        let image = Image::new(vec![64, 32], PixelData::F32(values.clone())).unwrap();
        let config = CompressionConfig::new(CompressionAlgorithm::Rice1, vec![64, 8])
            .with_quantize(16.0, DitherMethod::SubtractiveDither1);
        let compressed = compress_image(&image, &config).unwrap();

        let restored = match decompress_image(&compressed).unwrap().data {
            PixelData::F32(v) => v,
            other => panic!("unexpected {:?}", other.bitpix()),
        };
        for (tile, record) in compressed.tiles.iter().enumerate() {
            let step = record.zscale.unwrap() as f32;
            for i in tile * 512..(tile + 1) * 512 {
                assert!((restored[i] - values[i]).abs() <= step, "pixel {}", i);
            }
        }
    }

    #[test]
    fn constant_float_tile_falls_back_to_gzip() {
        let image = Image::new(vec![16, 4], PixelData::F64(vec![2.5; 64])).unwrap();
        let config = CompressionConfig::new(CompressionAlgorithm::Rice1, vec![16, 2]);
        let compressed = compress_image(&image, &config).unwrap();
        assert!(compressed.tiles.iter().all(TileRecord::is_fallback));
        assert_eq!(decompress_image(&compressed).unwrap(), image);
    }

    #[test]
    fn lossless_floats_with_gzip() {
        let values: Vec<f64> = (0..50).map(|i| (i as f64).sqrt()).collect();
        let image = Image::new(vec![10, 5], PixelData::F64(values)).unwrap();
        let config = CompressionConfig::new(CompressionAlgorithm::Gzip2, vec![10, 1]).lossless();
        let compressed = compress_image(&image, &config).unwrap();
        assert!(compressed.tiles.iter().all(|t| t.zscale.is_none()));
        assert_eq!(decompress_image(&compressed).unwrap(), image);
    }

    #[test]
    fn single_tile_access() {
        let image = ramp_i32(&[20, 20]);
        let config = CompressionConfig::new(CompressionAlgorithm::Rice1, vec![10, 10]);
        let compressed = compress_image(&image, &config).unwrap();
        let grid = compressed.header.grid().unwrap();
        let region = grid.tile(3).unwrap();
        let expected = grid.extract(&image.data.to_be_bytes(), 4, &region);
        assert_eq!(
            compressed.tile_pixels(3).unwrap(),
            PixelData::from_be_bytes(BitPix::I32, &expected).unwrap()
        );
        assert!(compressed.tile_pixels(4).is_err());
    }

    #[test]
    fn missing_tiles_rejected() {
        let image = ramp_i32(&[10, 10]);
        let config = CompressionConfig::new(CompressionAlgorithm::Gzip1, vec![10, 5]);
        let mut compressed = compress_image(&image, &config).unwrap();
        compressed.tiles.pop();
        assert!(matches!(
            decompress_image(&compressed),
            Err(CompressionError::CorruptStream(_))
        ));
    }

    #[test]
    fn dither_seed_changes_only_noise() {
        let values: Vec<f64> = (0..400).map(|i| ((i * 31) % 97) as f64 * 0.5).collect();
        let image = Image::new(vec![20, 20], PixelData::F64(values.clone())).unwrap();
        let base = CompressionConfig::new(CompressionAlgorithm::Gzip1, vec![20, 20]);
        let a = compress_image(&image, &base.clone().with_dither_seed(1)).unwrap();
        let b = compress_image(&image, &base.with_dither_seed(500)).unwrap();
        assert_ne!(a.tiles[0].compressed, b.tiles[0].compressed);

        let step = a.tiles[0].zscale.unwrap();
        for restored in [decompress_image(&a).unwrap(), decompress_image(&b).unwrap()] {
            let PixelData::F64(out) = restored.data else {
                panic!("expected doubles")
            };
            for (x, y) in out.iter().zip(&values) {
                assert_abs_diff_eq!(x, y, epsilon = step);
            }
        }
    }
}

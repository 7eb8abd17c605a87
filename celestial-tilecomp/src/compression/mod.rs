//! Algorithm dispatch: a `ZCMPTYPE` name plus a parameter bag becomes a
//! bound [`TileCodec`].

mod codecs;
mod params;
mod registry;

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::core::{CompressionError, Result};

pub use codecs::{GzipCodec, HcompressCodec, PlioCodec, RiceCodec, ShuffledGzipCodec};
pub use params::{ParamKind, ParamSpec, Parameters, Requirement};
pub use registry::{CodecFactory, CodecRegistry, CodecSchema, Direction};

pub const DEFAULT_RICE_BLOCK_SIZE: i64 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionAlgorithm {
    Gzip1,
    Gzip2,
    Rice1,
    Plio1,
    Hcompress1,
}

impl CompressionAlgorithm {
    pub const ALL: [Self; 5] = [
        Self::Gzip1,
        Self::Gzip2,
        Self::Rice1,
        Self::Plio1,
        Self::Hcompress1,
    ];

    /// Accepts the legacy `RICE_ONE` spelling found in older files.
    pub fn from_fits_name(name: &str) -> Option<Self> {
        match name.trim() {
            "GZIP_1" => Some(Self::Gzip1),
            "GZIP_2" => Some(Self::Gzip2),
            "RICE_1" | "RICE_ONE" => Some(Self::Rice1),
            "PLIO_1" => Some(Self::Plio1),
            "HCOMPRESS_1" => Some(Self::Hcompress1),
            _ => None,
        }
    }

    pub fn fits_name(&self) -> &'static str {
        match self {
            Self::Gzip1 => "GZIP_1",
            Self::Gzip2 => "GZIP_2",
            Self::Rice1 => "RICE_1",
            Self::Plio1 => "PLIO_1",
            Self::Hcompress1 => "HCOMPRESS_1",
        }
    }

    /// Whether float pixels can be stored without quantization.
    pub fn is_lossless_for_floats(&self) -> bool {
        matches!(self, Self::Gzip1 | Self::Gzip2)
    }
}

impl fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fits_name())
    }
}

impl FromStr for CompressionAlgorithm {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_fits_name(s).ok_or_else(|| CompressionError::UnknownAlgorithm(s.to_string()))
    }
}

static FITS_REGISTRY: OnceLock<CodecRegistry> = OnceLock::new();

/// Registry of the standard FITS codecs, shared by the free functions below.
pub fn fits_registry() -> &'static CodecRegistry {
    FITS_REGISTRY.get_or_init(CodecRegistry::with_fits_codecs)
}

/// Compress one tile buffer with the named algorithm.
pub fn compress_tile(buf: &[u8], algorithm: &str, params: &Parameters) -> Result<Vec<u8>> {
    fits_registry()
        .codec(algorithm, params, Direction::Compress)?
        .encode(buf)
}

/// Decompress one tile buffer with the named algorithm.
pub fn decompress_tile(buf: &[u8], algorithm: &str, params: &Parameters) -> Result<Vec<u8>> {
    fits_registry()
        .codec(algorithm, params, Direction::Decompress)?
        .decode(buf)
}

/// A codec bound to one parameter set. Implementations hold no mutable state
/// and may be shared across threads.
pub trait TileCodec: Send + Sync {
    fn encode(&self, buf: &[u8]) -> Result<Vec<u8>>;
    fn decode(&self, buf: &[u8]) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_names() {
        for algorithm in CompressionAlgorithm::ALL {
            assert_eq!(
                CompressionAlgorithm::from_fits_name(algorithm.fits_name()),
                Some(algorithm)
            );
        }
        assert_eq!(
            CompressionAlgorithm::from_fits_name("RICE_ONE"),
            Some(CompressionAlgorithm::Rice1)
        );
        assert_eq!(CompressionAlgorithm::from_fits_name("LZ4"), None);
        assert!(matches!(
            "NOPE_1".parse::<CompressionAlgorithm>(),
            Err(CompressionError::UnknownAlgorithm(name)) if name == "NOPE_1"
        ));
        assert_eq!(CompressionAlgorithm::Hcompress1.to_string(), "HCOMPRESS_1");
    }

    #[test]
    fn unknown_algorithm_rejected() {
        let params = Parameters::new();
        assert!(matches!(
            compress_tile(&[1, 2, 3], "FOO_1", &params),
            Err(CompressionError::UnknownAlgorithm(_))
        ));
        assert!(matches!(
            decompress_tile(&[1, 2, 3], "FOO_1", &params),
            Err(CompressionError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn gzip_1_round_trip() {
        let data: Vec<u8> = (0..=255).collect();
        let params = Parameters::new();
        let compressed = compress_tile(&data, "GZIP_1", &params).unwrap();
        assert_eq!(decompress_tile(&compressed, "GZIP_1", &params).unwrap(), data);
    }

    #[test]
    fn gzip_2_requires_itemsize() {
        assert!(matches!(
            compress_tile(&[0; 8], "GZIP_2", &Parameters::new()),
            Err(CompressionError::InvalidParameters(_))
        ));
        let params = Parameters::new().with("itemsize", 4);
        let data: Vec<u8> = (0..64).collect();
        let compressed = compress_tile(&data, "GZIP_2", &params).unwrap();
        assert_eq!(decompress_tile(&compressed, "GZIP_2", &params).unwrap(), data);
    }

    #[test]
    fn rice_100_pixels_blocksize_32() {
        let pixels: Vec<i32> = (0..100).map(|i| (i * 37) % 251 - 100).collect();
        let data: Vec<u8> = pixels.iter().flat_map(|p| p.to_be_bytes()).collect();
        let params = Parameters::new()
            .with("blocksize", 32)
            .with("bytepix", 4)
            .with("tilesize", 100);
        let compressed = compress_tile(&data, "RICE_1", &params).unwrap();
        assert_eq!(decompress_tile(&compressed, "RICE_1", &params).unwrap(), data);
        assert_eq!(decompress_tile(&compressed, "RICE_ONE", &params).unwrap(), data);
    }

    #[test]
    fn rice_decode_needs_tilesize() {
        let params = Parameters::new().with("blocksize", 32).with("bytepix", 2);
        let compressed = compress_tile(&[0, 1, 0, 2], "RICE_1", &params).unwrap();
        assert!(matches!(
            decompress_tile(&compressed, "RICE_1", &params),
            Err(CompressionError::InvalidParameters(_))
        ));
    }

    #[test]
    fn unexpected_parameter_rejected() {
        let params = Parameters::new().with("itemsize", 2).with("level", 9);
        assert!(matches!(
            compress_tile(&[0; 4], "GZIP_2", &params),
            Err(CompressionError::InvalidParameters(_))
        ));
        let params = Parameters::new().with("blocksize", 32);
        assert!(matches!(
            compress_tile(&[0; 4], "GZIP_1", &params),
            Err(CompressionError::InvalidParameters(_))
        ));
    }

    #[test]
    fn wrong_parameter_type_rejected() {
        let params = Parameters::new().with("blocksize", "thirty-two");
        assert!(matches!(
            compress_tile(&[0; 4], "RICE_1", &params),
            Err(CompressionError::InvalidParameters(_))
        ));
        let params = Parameters::new().with("blocksize", 0);
        assert!(matches!(
            compress_tile(&[0; 4], "RICE_1", &params),
            Err(CompressionError::InvalidParameters(_))
        ));
    }

    #[test]
    fn plio_constant_tile() {
        let data: Vec<u8> = std::iter::repeat(7i32.to_be_bytes())
            .take(25 * 25)
            .flatten()
            .collect();
        let params = Parameters::new().with("tilesize", 625);
        let compressed = compress_tile(&data, "PLIO_1", &params).unwrap();
        assert_eq!(decompress_tile(&compressed, "PLIO_1", &params).unwrap(), data);
    }

    #[test]
    fn hcompress_round_trip() {
        let pixels: Vec<i16> = (0..30).map(|i| (i * i) as i16 - 50).collect();
        let data: Vec<u8> = pixels.iter().flat_map(|p| p.to_be_bytes()).collect();
        let params = Parameters::new()
            .with("scale", 0)
            .with("smooth", false)
            .with("nx", 6)
            .with("ny", 5)
            .with("bytepix", 2);
        let compressed = compress_tile(&data, "HCOMPRESS_1", &params).unwrap();
        assert_eq!(decompress_tile(&compressed, "HCOMPRESS_1", &params).unwrap(), data);
    }

    #[test]
    fn hcompress_requires_shape() {
        let params = Parameters::new().with("scale", 0).with("bytepix", 4);
        assert!(matches!(
            compress_tile(&[0; 16], "HCOMPRESS_1", &params),
            Err(CompressionError::InvalidParameters(_))
        ));
    }
}

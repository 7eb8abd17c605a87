//! Compression settings, and their mapping to and from the `Z*` header
//! keywords of a compressed image HDU.

use crate::compression::{CompressionAlgorithm, Parameters, DEFAULT_RICE_BLOCK_SIZE};
use crate::core::{BitPix, CompressionError, Result};
use crate::header::{Keyword, KeywordBuilder, KeywordLookup};
use crate::quantize::{dither::N_RANDOM, DitherMethod, DEFAULT_QUANTIZE_LEVEL};

use super::geometry::{TileGrid, TileRegion};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizeSettings {
    /// Levels per noise sigma when positive, absolute step when negative.
    pub level: f64,
    pub dither: DitherMethod,
    /// `ZDITHER0`, the dither table row of the first tile.
    pub seed: i64,
}

impl Default for QuantizeSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_QUANTIZE_LEVEL,
            dither: DitherMethod::SubtractiveDither1,
            seed: 1,
        }
    }
}

/// How to compress an image. Float images are quantized unless
/// [`CompressionConfig::lossless`] is requested.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionConfig {
    pub algorithm: CompressionAlgorithm,
    pub tile_shape: Vec<usize>,
    pub blocksize: i64,
    pub hcomp_scale: i64,
    pub hcomp_smooth: bool,
    pub quantize: Option<QuantizeSettings>,
}

impl CompressionConfig {
    pub fn new(algorithm: CompressionAlgorithm, tile_shape: impl Into<Vec<usize>>) -> Self {
        Self {
            algorithm,
            tile_shape: tile_shape.into(),
            blocksize: DEFAULT_RICE_BLOCK_SIZE,
            hcomp_scale: 0,
            hcomp_smooth: false,
            quantize: Some(QuantizeSettings::default()),
        }
    }

    /// One tile per image row, the FITS default.
    pub fn row_by_row(algorithm: CompressionAlgorithm, shape: &[usize]) -> Self {
        let mut tile = vec![1; shape.len()];
        if let Some(first) = shape.first() {
            tile[0] = *first;
        }
        Self::new(algorithm, tile)
    }

    pub fn with_blocksize(mut self, blocksize: i64) -> Self {
        self.blocksize = blocksize;
        self
    }

    pub fn with_hcompress(mut self, scale: i64, smooth: bool) -> Self {
        self.hcomp_scale = scale;
        self.hcomp_smooth = smooth;
        self
    }

    pub fn with_quantize(mut self, level: f64, dither: DitherMethod) -> Self {
        let seed = self.quantize.map_or(1, |q| q.seed);
        self.quantize = Some(QuantizeSettings {
            level,
            dither,
            seed,
        });
        self
    }

    pub fn with_dither_seed(mut self, seed: i64) -> Self {
        let mut settings = self.quantize.unwrap_or_default();
        settings.seed = seed;
        self.quantize = Some(settings);
        self
    }

    /// Store float pixels exactly; only the GZIP algorithms allow this.
    pub fn lossless(mut self) -> Self {
        self.quantize = None;
        self
    }

    pub fn validate(&self, bitpix: BitPix) -> Result<()> {
        if self.blocksize <= 0 {
            return Err(CompressionError::params(format!(
                "blocksize must be positive, got {}",
                self.blocksize
            )));
        }
        if self.hcomp_scale < 0 {
            return Err(CompressionError::params(format!(
                "HCOMPRESS scale must not be negative, got {}",
                self.hcomp_scale
            )));
        }
        if self.algorithm == CompressionAlgorithm::Rice1 && bitpix == BitPix::I64 {
            return Err(CompressionError::params("RICE_1 cannot store 64-bit pixels"));
        }
        if bitpix.is_float() {
            match self.quantize {
                None if !self.algorithm.is_lossless_for_floats() => {
                    return Err(CompressionError::params(format!(
                        "{} cannot store float pixels without quantization",
                        self.algorithm
                    )));
                }
                Some(_) if self.algorithm == CompressionAlgorithm::Plio1 => {
                    return Err(CompressionError::params("PLIO_1 cannot store float pixels"));
                }
                Some(q) if !(1..=N_RANDOM as i64).contains(&q.seed) => {
                    return Err(CompressionError::params(format!(
                        "ZDITHER0 must be in 1..={}, got {}",
                        N_RANDOM, q.seed
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// The per-HDU description stored in the `Z*` keywords.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionHeader {
    pub algorithm: CompressionAlgorithm,
    pub bitpix: BitPix,
    pub shape: Vec<usize>,
    pub tile_shape: Vec<usize>,
    pub blocksize: i64,
    pub hcomp_scale: i64,
    pub hcomp_smooth: bool,
    /// Set for float images stored as quantized integers.
    pub quantize: Option<QuantizeSettings>,
}

impl CompressionHeader {
    pub fn from_config(config: &CompressionConfig, bitpix: BitPix, shape: &[usize]) -> Self {
        Self {
            algorithm: config.algorithm,
            bitpix,
            shape: shape.to_vec(),
            tile_shape: config.tile_shape.clone(),
            blocksize: config.blocksize,
            hcomp_scale: config.hcomp_scale,
            hcomp_smooth: config.hcomp_smooth,
            quantize: if bitpix.is_float() { config.quantize } else { None },
        }
    }

    pub fn grid(&self) -> Result<TileGrid> {
        TileGrid::new(&self.shape, &self.tile_shape)
    }

    /// Pixel width handed to the codecs: quantized floats travel as `i32`.
    pub fn bytepix(&self) -> usize {
        if self.quantize.is_some() {
            4
        } else {
            self.bitpix.bytes_per_pixel()
        }
    }

    pub fn keywords(&self) -> Vec<Keyword> {
        let mut builder = KeywordBuilder::new();
        builder
            .value("ZIMAGE", true, "extension contains compressed image")
            .value("ZCMPTYPE", self.algorithm.fits_name(), "compression algorithm")
            .value("ZBITPIX", self.bitpix.value(), "data type of original image")
            .value("ZNAXIS", self.shape.len(), "dimension of original image");
        for (i, &n) in self.shape.iter().enumerate() {
            builder.value(format!("ZNAXIS{}", i + 1), n, "length of original image axis");
        }
        for (i, &n) in self.tile_shape.iter().enumerate() {
            builder.value(format!("ZTILE{}", i + 1), n, "size of tiles to be compressed");
        }

        let zvals: Vec<(&str, i64)> = match self.algorithm {
            CompressionAlgorithm::Rice1 => {
                vec![("BLOCKSIZE", self.blocksize), ("BYTEPIX", self.bytepix() as i64)]
            }
            CompressionAlgorithm::Hcompress1 => {
                vec![("SCALE", self.hcomp_scale), ("SMOOTH", i64::from(self.hcomp_smooth))]
            }
            _ => Vec::new(),
        };
        for (i, (name, value)) in zvals.into_iter().enumerate() {
            builder
                .value(format!("ZNAME{}", i + 1), name, "compression parameter name")
                .value(format!("ZVAL{}", i + 1), value, "compression parameter value");
        }

        if self.bitpix.is_float() {
            match self.quantize {
                Some(q) => {
                    builder.value("ZQUANTIZ", q.dither.as_str(), "quantization method");
                    if q.dither.is_dithered() {
                        builder.value("ZDITHER0", q.seed, "dithering offset when quantizing floats");
                    }
                }
                None => {
                    builder.value("ZQUANTIZ", "NONE", "floats stored without quantization");
                }
            }
        }
        builder.build()
    }

    pub fn from_keywords(keywords: &[Keyword]) -> Result<Self> {
        let missing = |name: &str| CompressionError::params(format!("missing keyword {}", name));
        let positive = |name: String| -> Result<usize> {
            let value = keywords.integer_of(&name).ok_or_else(|| missing(&name))?;
            if value <= 0 {
                return Err(CompressionError::params(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
            Ok(value as usize)
        };

        if keywords.logical_of("ZIMAGE") != Some(true) {
            return Err(CompressionError::params("ZIMAGE is not set"));
        }
        let name = keywords.string_of("ZCMPTYPE").ok_or_else(|| missing("ZCMPTYPE"))?;
        let algorithm: CompressionAlgorithm = name.parse()?;
        let zbitpix = keywords.integer_of("ZBITPIX").ok_or_else(|| missing("ZBITPIX"))?;
        let bitpix = BitPix::try_from_value(zbitpix as i32)?;

        let naxis = positive("ZNAXIS".to_string())?;
        let shape = (1..=naxis)
            .map(|i| positive(format!("ZNAXIS{}", i)))
            .collect::<Result<Vec<_>>>()?;
        let tile_shape = (1..=naxis)
            .map(|i| match keywords.value_of(&format!("ZTILE{}", i)) {
                Some(_) => positive(format!("ZTILE{}", i)),
                None if i == 1 => Ok(shape[0]),
                None => Ok(1),
            })
            .collect::<Result<Vec<_>>>()?;

        let mut blocksize = DEFAULT_RICE_BLOCK_SIZE;
        let mut hcomp_scale = 0;
        let mut hcomp_smooth = false;
        let mut i = 1;
        while let Some(zname) = keywords.string_of(&format!("ZNAME{}", i)) {
            let zval = format!("ZVAL{}", i);
            let value = keywords.value_of(&zval).ok_or_else(|| missing(&zval))?;
            let integer = || {
                value.as_integer().ok_or_else(|| {
                    CompressionError::params(format!("{} must be an integer, got {}", zval, value))
                })
            };
            match zname.trim().to_ascii_uppercase().as_str() {
                "BLOCKSIZE" => blocksize = integer()?,
                "SCALE" => hcomp_scale = value.as_real().map(|v| v.round() as i64).unwrap_or(0),
                "SMOOTH" => {
                    hcomp_smooth = match value.as_logical() {
                        Some(b) => b,
                        None => integer()? != 0,
                    }
                }
                _ => {}
            }
            i += 1;
        }

        let quantize = if bitpix.is_float() {
            match keywords.string_of("ZQUANTIZ").map(str::trim) {
                Some(s) if s.eq_ignore_ascii_case("NONE") => None,
                other => {
                    let dither = match other {
                        Some(s) => s.parse()?,
                        None => DitherMethod::NoDither,
                    };
                    Some(QuantizeSettings {
                        level: DEFAULT_QUANTIZE_LEVEL,
                        dither,
                        seed: keywords.integer_of("ZDITHER0").unwrap_or(1),
                    })
                }
            }
        } else {
            None
        };

        Ok(Self {
            algorithm,
            bitpix,
            shape,
            tile_shape,
            blocksize,
            hcomp_scale,
            hcomp_smooth,
            quantize,
        })
    }

    /// The dispatcher parameters for one tile.
    pub fn tile_parameters(&self, region: &TileRegion) -> Parameters {
        let bytepix = self.bytepix() as i64;
        let tilesize = region.len();
        match self.algorithm {
            CompressionAlgorithm::Gzip1 => Parameters::new(),
            CompressionAlgorithm::Gzip2 => Parameters::new().with("itemsize", bytepix),
            CompressionAlgorithm::Rice1 => Parameters::new()
                .with("blocksize", self.blocksize)
                .with("bytepix", bytepix)
                .with("tilesize", tilesize),
            CompressionAlgorithm::Plio1 => Parameters::new()
                .with("bytepix", bytepix)
                .with("tilesize", tilesize),
            CompressionAlgorithm::Hcompress1 => {
                let (nx, ny) = region.plane_dims();
                Parameters::new()
                    .with("scale", self.hcomp_scale)
                    .with("smooth", self.hcomp_smooth)
                    .with("nx", nx)
                    .with("ny", ny)
                    .with("bytepix", bytepix)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::KeywordValue;

    #[test]
    fn config_builder() {
        let config = CompressionConfig::new(CompressionAlgorithm::Rice1, vec![25, 25])
            .with_blocksize(16)
            .with_quantize(8.0, DitherMethod::SubtractiveDither2)
            .with_dither_seed(42);
        let q = config.quantize.unwrap();
        assert_eq!((q.level, q.dither, q.seed), (8.0, DitherMethod::SubtractiveDither2, 42));
        assert_eq!(config.blocksize, 16);

        let rows = CompressionConfig::row_by_row(CompressionAlgorithm::Gzip1, &[30, 20]);
        assert_eq!(rows.tile_shape, vec![30, 1]);
    }

    #[test]
    fn config_validation() {
        let rice = CompressionConfig::new(CompressionAlgorithm::Rice1, vec![8]);
        assert!(rice.validate(BitPix::I16).is_ok());
        assert!(rice.validate(BitPix::I64).is_err());
        assert!(rice.clone().lossless().validate(BitPix::F32).is_err());
        assert!(rice.clone().with_dither_seed(0).validate(BitPix::F32).is_err());
        assert!(rice.with_blocksize(0).validate(BitPix::I16).is_err());

        let plio = CompressionConfig::new(CompressionAlgorithm::Plio1, vec![8]);
        assert!(plio.validate(BitPix::F64).is_err());
        let gzip = CompressionConfig::new(CompressionAlgorithm::Gzip2, vec![8]).lossless();
        assert!(gzip.validate(BitPix::F64).is_ok());
    }

    #[test]
    fn keyword_round_trip_rice_float() {
        let config = CompressionConfig::new(CompressionAlgorithm::Rice1, vec![50, 10])
            .with_quantize(16.0, DitherMethod::SubtractiveDither1)
            .with_dither_seed(77);
        let header = CompressionHeader::from_config(&config, BitPix::F32, &[100, 40]);
        let keywords = header.keywords();

        assert_eq!(keywords.string_of("ZCMPTYPE"), Some("RICE_1"));
        assert_eq!(keywords.integer_of("ZBITPIX"), Some(-32));
        assert_eq!(keywords.string_of("ZNAME2"), Some("BYTEPIX"));
        assert_eq!(keywords.integer_of("ZVAL2"), Some(4));
        assert_eq!(keywords.string_of("ZQUANTIZ"), Some("SUBTRACTIVE_DITHER_1"));
        assert_eq!(keywords.integer_of("ZDITHER0"), Some(77));

        let parsed = CompressionHeader::from_keywords(&keywords).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn keyword_round_trip_hcompress() {
        let config = CompressionConfig::new(CompressionAlgorithm::Hcompress1, vec![16, 16])
            .with_hcompress(4, true);
        let header = CompressionHeader::from_config(&config, BitPix::I32, &[64, 32]);
        let keywords = header.keywords();
        assert_eq!(keywords.value_of("ZQUANTIZ"), None);
        assert_eq!(keywords.integer_of("ZVAL2"), Some(1));
        assert_eq!(CompressionHeader::from_keywords(&keywords).unwrap(), header);
    }

    #[test]
    fn keyword_defaults() {
        let keywords = vec![
            Keyword::logical("ZIMAGE", true),
            Keyword::string("ZCMPTYPE", "RICE_ONE"),
            Keyword::integer("ZBITPIX", -64),
            Keyword::integer("ZNAXIS", 2),
            Keyword::integer("ZNAXIS1", 300),
            Keyword::integer("ZNAXIS2", 200),
            Keyword::string("ZQUANTIZ", "NONE"),
        ];
        let header = CompressionHeader::from_keywords(&keywords).unwrap();
        assert_eq!(header.algorithm, CompressionAlgorithm::Rice1);
        assert_eq!(header.tile_shape, vec![300, 1]);
        assert_eq!(header.blocksize, 32);
        assert_eq!(header.quantize, None);
        assert_eq!(header.bytepix(), 8);
    }

    #[test]
    fn keyword_errors() {
        let mut keywords = vec![
            Keyword::logical("ZIMAGE", true),
            Keyword::string("ZCMPTYPE", "ZSTD_1"),
            Keyword::integer("ZBITPIX", 16),
            Keyword::integer("ZNAXIS", 1),
            Keyword::integer("ZNAXIS1", 10),
        ];
        assert!(matches!(
            CompressionHeader::from_keywords(&keywords),
            Err(CompressionError::UnknownAlgorithm(_))
        ));
        keywords[1] = Keyword::string("ZCMPTYPE", "GZIP_1");
        keywords[4] = Keyword::new("ZNAXIS1").with_value(KeywordValue::Integer(0));
        assert!(CompressionHeader::from_keywords(&keywords).is_err());
        keywords[0] = Keyword::logical("ZIMAGE", false);
        assert!(CompressionHeader::from_keywords(&keywords).is_err());
    }

    #[test]
    fn hcompress_tile_parameters() {
        let config = CompressionConfig::new(CompressionAlgorithm::Hcompress1, vec![16, 8, 1])
            .with_hcompress(2, false);
        let header = CompressionHeader::from_config(&config, BitPix::I16, &[20, 8, 3]);
        let grid = header.grid().unwrap();
        let params = header.tile_parameters(&grid.tile(1).unwrap());
        assert_eq!(params.integer("nx").unwrap(), Some(4));
        assert_eq!(params.integer("ny").unwrap(), Some(8));
        assert_eq!(params.integer("bytepix").unwrap(), Some(2));
        assert_eq!(params.logical("smooth").unwrap(), Some(false));
    }
}

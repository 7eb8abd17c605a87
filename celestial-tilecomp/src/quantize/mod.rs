//! Lossy conversion of floating-point tiles to scaled 32-bit integers.
//!
//! Pixels become `NINT((v - zero) / scale)`, optionally with a subtractive
//! dither drawn from the shared random table so that the quantization noise
//! averages out. The scale is a fraction of the background noise estimated
//! from the tile itself.

pub mod dither;
pub mod noise;

use std::fmt;
use std::str::FromStr;

use num_traits::Float;

use crate::core::{BitPix, CompressionError, PixelData, Result};
use dither::DitherSequence;
use noise::estimate_noise;

/// Quantized value reserved for null (NaN) pixels.
pub const NULL_VALUE: i32 = -2147483647;
/// Quantized value reserved for exact zeros under `SUBTRACTIVE_DITHER_2`.
pub const ZERO_VALUE: i32 = -2147483646;
pub const N_RESERVED_VALUES: i32 = 10;

/// Noise fraction used when the requested level is zero.
const NOISE_SCALE_DEFAULT: f64 = 4.0;

pub const DEFAULT_QUANTIZE_LEVEL: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DitherMethod {
    NoDither,
    #[default]
    SubtractiveDither1,
    SubtractiveDither2,
}

impl DitherMethod {
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            -1 => Ok(Self::NoDither),
            1 => Ok(Self::SubtractiveDither1),
            2 => Ok(Self::SubtractiveDither2),
            other => Err(CompressionError::params(format!(
                "unknown dither method code {}",
                other
            ))),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::NoDither => -1,
            Self::SubtractiveDither1 => 1,
            Self::SubtractiveDither2 => 2,
        }
    }

    /// Name used in the `ZQUANTIZ` keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoDither => "NO_DITHER",
            Self::SubtractiveDither1 => "SUBTRACTIVE_DITHER_1",
            Self::SubtractiveDither2 => "SUBTRACTIVE_DITHER_2",
        }
    }

    pub fn is_dithered(self) -> bool {
        self != Self::NoDither
    }
}

impl fmt::Display for DitherMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DitherMethod {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NO_DITHER" => Ok(Self::NoDither),
            "SUBTRACTIVE_DITHER_1" => Ok(Self::SubtractiveDither1),
            "SUBTRACTIVE_DITHER_2" => Ok(Self::SubtractiveDither2),
            other => match other.parse::<i64>() {
                Ok(code) => Self::from_code(code),
                Err(_) => Err(CompressionError::params(format!(
                    "unknown dither method {}",
                    s
                ))),
            },
        }
    }
}

/// Integers produced by [`Quantize::encode_quantized`] with the linear
/// scaling that restores them.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedTile {
    pub data: Vec<i32>,
    pub scale: f64,
    pub zero: f64,
    /// Quantized values of the smallest and largest non-null pixel.
    pub min: i32,
    pub max: i32,
}

#[inline]
fn nint(x: f64) -> i32 {
    if x >= 0.0 {
        (x + 0.5) as i32
    } else {
        (x - 0.5) as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantize {
    row: i64,
    dither: DitherMethod,
    quantize_level: f64,
    bitpix: BitPix,
}

impl Quantize {
    /// `row` selects the starting point in the dither table (tile index plus
    /// `ZDITHER0`). A positive `quantize_level` is the number of levels per
    /// noise sigma; a negative one is the absolute step size.
    pub fn new(row: i64, dither: DitherMethod, quantize_level: f64, bitpix: i32) -> Result<Self> {
        let bitpix = BitPix::try_from_value(bitpix)?;
        if !bitpix.is_float() {
            return Err(CompressionError::InvalidBitPix(bitpix.value()));
        }
        Ok(Self {
            row,
            dither,
            quantize_level,
            bitpix,
        })
    }

    pub fn row(&self) -> i64 {
        self.row
    }

    pub fn dither_method(&self) -> DitherMethod {
        self.dither
    }

    pub fn bitpix(&self) -> BitPix {
        self.bitpix
    }

    /// Quantize a tile treated as a single row.
    pub fn encode_quantized<T: Float + Into<f64>>(&self, data: &[T]) -> Result<QuantizedTile> {
        self.encode_quantized_image(data, data.len(), 1)
    }

    /// Quantize an `nx` by `ny` tile; rows matter only for noise estimation.
    pub fn encode_quantized_image<T: Float + Into<f64>>(
        &self,
        data: &[T],
        nx: usize,
        ny: usize,
    ) -> Result<QuantizedTile> {
        if data.len() != nx * ny {
            return Err(CompressionError::InvalidBufferLength {
                length: data.len(),
                reason: format!("expected {} x {} pixels", nx, ny),
            });
        }
        if data.len() <= 1 {
            return Err(CompressionError::QuantizationFailed(
                "need at least two pixels".to_string(),
            ));
        }

        let estimate = estimate_noise(data, nx, ny);
        let (min, max, stdev) = if estimate.ngood == 0 {
            (0.0, 1.0, 1.0)
        } else {
            (estimate.min, estimate.max, estimate.stdev())
        };

        let delta = if self.quantize_level >= 0.0 {
            let delta = if self.quantize_level == 0.0 {
                stdev / NOISE_SCALE_DEFAULT
            } else {
                stdev / self.quantize_level
            };
            if delta == 0.0 {
                return Err(CompressionError::QuantizationFailed(
                    "tile has no measurable noise".to_string(),
                ));
            }
            delta
        } else {
            -self.quantize_level
        };

        let i32_max = f64::from(i32::MAX);
        let reserved = f64::from(N_RESERVED_VALUES);
        if (max - min) / delta > 2.0 * i32_max - reserved {
            return Err(CompressionError::QuantizationFailed(format!(
                "range {}..{} too wide for step {}",
                min, max, delta
            )));
        }

        let has_nulls = estimate.ngood < data.len();
        let zero = if has_nulls || self.dither == DitherMethod::SubtractiveDither2 {
            min - delta * (f64::from(NULL_VALUE) + reserved)
        } else if (max - min) / delta < i32_max - reserved {
            ((min / delta + 0.5) as i64) as f64 * delta
        } else {
            (min + max) / 2.0
        };

        let mut out = Vec::with_capacity(data.len());
        if self.dither.is_dithered() {
            let mut sequence = DitherSequence::new(self.row)?;
            for &v in data {
                let v: f64 = v.into();
                out.push(if v.is_nan() {
                    NULL_VALUE
                } else if self.dither == DitherMethod::SubtractiveDither2 && v == 0.0 {
                    ZERO_VALUE
                } else {
                    nint((v - zero) / delta + sequence.current() - 0.5)
                });
                sequence.advance();
            }
        } else {
            for &v in data {
                let v: f64 = v.into();
                out.push(if v.is_nan() {
                    NULL_VALUE
                } else {
                    nint((v - zero) / delta)
                });
            }
        }

        Ok(QuantizedTile {
            data: out,
            scale: delta,
            zero,
            min: nint((min - zero) / delta),
            max: nint((max - zero) / delta),
        })
    }

    /// Restore floats of this quantizer's `bitpix` from quantized integers.
    pub fn decode_quantized(&self, data: &[i32], scale: f64, zero: f64) -> Result<PixelData> {
        let mut values = Vec::with_capacity(data.len());
        if self.dither.is_dithered() {
            let mut sequence = DitherSequence::new(self.row)?;
            for &q in data {
                values.push(if q == NULL_VALUE {
                    f64::NAN
                } else if self.dither == DitherMethod::SubtractiveDither2 && q == ZERO_VALUE {
                    0.0
                } else {
                    (f64::from(q) - sequence.current() + 0.5) * scale + zero
                });
                sequence.advance();
            }
        } else {
            values.extend(data.iter().map(|&q| {
                if q == NULL_VALUE {
                    f64::NAN
                } else {
                    f64::from(q) * scale + zero
                }
            }));
        }

        Ok(match self.bitpix {
            BitPix::F32 => PixelData::F32(values.into_iter().map(|v| v as f32).collect()),
            _ => PixelData::F64(values),
        })
    }
}

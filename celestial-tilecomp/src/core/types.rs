use super::errors::{CompressionError, Result};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitPix {
    U8 = 8,
    I16 = 16,
    I32 = 32,
    I64 = 64,
    F32 = -32,
    F64 = -64,
}

impl BitPix {
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            8 => Some(Self::U8),
            16 => Some(Self::I16),
            32 => Some(Self::I32),
            64 => Some(Self::I64),
            -32 => Some(Self::F32),
            -64 => Some(Self::F64),
            _ => None,
        }
    }

    pub fn try_from_value(value: i32) -> Result<Self> {
        Self::from_value(value).ok_or(CompressionError::InvalidBitPix(value))
    }

    pub fn value(self) -> i32 {
        self as i32
    }

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::I16 => 2,
            Self::I32 | Self::F32 => 4,
            Self::I64 | Self::F64 => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

/// Pixel storage for a whole image or a single tile, first axis fastest.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    U8(Vec<u8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl PixelData {
    pub fn bitpix(&self) -> BitPix {
        match self {
            Self::U8(_) => BitPix::U8,
            Self::I16(_) => BitPix::I16,
            Self::I32(_) => BitPix::I32,
            Self::I64(_) => BitPix::I64,
            Self::F32(_) => BitPix::F32,
            Self::F64(_) => BitPix::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn zeros(bitpix: BitPix, len: usize) -> Self {
        match bitpix {
            BitPix::U8 => Self::U8(vec![0; len]),
            BitPix::I16 => Self::I16(vec![0; len]),
            BitPix::I32 => Self::I32(vec![0; len]),
            BitPix::I64 => Self::I64(vec![0; len]),
            BitPix::F32 => Self::F32(vec![0.0; len]),
            BitPix::F64 => Self::F64(vec![0.0; len]),
        }
    }

    /// Big-endian (FITS order) byte image of the pixels.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        use byteorder::{BigEndian, ByteOrder};

        let mut out = vec![0u8; self.len() * self.bitpix().bytes_per_pixel()];
        match self {
            Self::U8(v) => out.copy_from_slice(v),
            Self::I16(v) => BigEndian::write_i16_into(v, &mut out),
            Self::I32(v) => BigEndian::write_i32_into(v, &mut out),
            Self::I64(v) => BigEndian::write_i64_into(v, &mut out),
            Self::F32(v) => BigEndian::write_f32_into(v, &mut out),
            Self::F64(v) => BigEndian::write_f64_into(v, &mut out),
        }
        out
    }

    pub fn from_be_bytes(bitpix: BitPix, bytes: &[u8]) -> Result<Self> {
        use byteorder::{BigEndian, ByteOrder};

        let width = bitpix.bytes_per_pixel();
        if bytes.len() % width != 0 {
            return Err(CompressionError::InvalidBufferLength {
                length: bytes.len(),
                reason: format!("not a multiple of the {}-byte pixel size", width),
            });
        }
        let n = bytes.len() / width;
        Ok(match bitpix {
            BitPix::U8 => Self::U8(bytes.to_vec()),
            BitPix::I16 => {
                let mut v = vec![0; n];
                BigEndian::read_i16_into(bytes, &mut v);
                Self::I16(v)
            }
            BitPix::I32 => {
                let mut v = vec![0; n];
                BigEndian::read_i32_into(bytes, &mut v);
                Self::I32(v)
            }
            BitPix::I64 => {
                let mut v = vec![0; n];
                BigEndian::read_i64_into(bytes, &mut v);
                Self::I64(v)
            }
            BitPix::F32 => {
                let mut v = vec![0.0; n];
                BigEndian::read_f32_into(bytes, &mut v);
                Self::F32(v)
            }
            BitPix::F64 => {
                let mut v = vec![0.0; n];
                BigEndian::read_f64_into(bytes, &mut v);
                Self::F64(v)
            }
        })
    }
}

use super::{Parameters, TileCodec, DEFAULT_RICE_BLOCK_SIZE};
use crate::core::{CompressionError, Result};
use crate::{gzip, hcompress, plio, ricecomp};

fn positive(name: &str, value: i64) -> Result<usize> {
    if value <= 0 {
        return Err(CompressionError::params(format!(
            "{} must be positive, got {}",
            name, value
        )));
    }
    Ok(value as usize)
}

fn one_of(name: &str, value: i64, allowed: &[i64]) -> Result<usize> {
    if !allowed.contains(&value) {
        return Err(CompressionError::params(format!(
            "{} must be one of {:?}, got {}",
            name, allowed, value
        )));
    }
    Ok(value as usize)
}

fn tile_size(params: &Parameters) -> Result<Option<usize>> {
    match params.integer("tilesize")? {
        Some(n) if n < 0 => Err(CompressionError::params(format!(
            "tilesize must not be negative, got {}",
            n
        ))),
        other => Ok(other.map(|n| n as usize)),
    }
}

fn require_tile_size(tilesize: Option<usize>) -> Result<usize> {
    tilesize.ok_or_else(|| CompressionError::params("tilesize is required to decompress"))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GzipCodec;

impl GzipCodec {
    pub fn from_params(_params: &Parameters) -> Result<Self> {
        Ok(Self)
    }
}

impl TileCodec for GzipCodec {
    fn encode(&self, buf: &[u8]) -> Result<Vec<u8>> {
        gzip::compress_gzip(buf)
    }

    fn decode(&self, buf: &[u8]) -> Result<Vec<u8>> {
        gzip::decompress_gzip(buf)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ShuffledGzipCodec {
    pub itemsize: usize,
}

impl ShuffledGzipCodec {
    pub fn from_params(params: &Parameters) -> Result<Self> {
        let itemsize = one_of("itemsize", params.required_integer("itemsize")?, &[1, 2, 4, 8])?;
        Ok(Self { itemsize })
    }
}

impl TileCodec for ShuffledGzipCodec {
    fn encode(&self, buf: &[u8]) -> Result<Vec<u8>> {
        gzip::compress_gzip2(buf, self.itemsize)
    }

    fn decode(&self, buf: &[u8]) -> Result<Vec<u8>> {
        gzip::decompress_gzip2(buf, self.itemsize)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RiceCodec {
    pub blocksize: usize,
    pub bytepix: usize,
    pub tilesize: Option<usize>,
}

impl RiceCodec {
    pub fn from_params(params: &Parameters) -> Result<Self> {
        Ok(Self {
            blocksize: positive(
                "blocksize",
                params.integer_or("blocksize", DEFAULT_RICE_BLOCK_SIZE)?,
            )?,
            bytepix: one_of("bytepix", params.integer_or("bytepix", 4)?, &[1, 2, 4])?,
            tilesize: tile_size(params)?,
        })
    }
}

impl TileCodec for RiceCodec {
    fn encode(&self, buf: &[u8]) -> Result<Vec<u8>> {
        ricecomp::compress_bytes(buf, self.blocksize, self.bytepix)
    }

    fn decode(&self, buf: &[u8]) -> Result<Vec<u8>> {
        let tilesize = require_tile_size(self.tilesize)?;
        ricecomp::decompress_bytes(buf, self.blocksize, self.bytepix, tilesize)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PlioCodec {
    pub bytepix: usize,
    pub tilesize: Option<usize>,
}

impl PlioCodec {
    pub fn from_params(params: &Parameters) -> Result<Self> {
        Ok(Self {
            bytepix: one_of("bytepix", params.integer_or("bytepix", 4)?, &[1, 2, 4, 8])?,
            tilesize: tile_size(params)?,
        })
    }
}

impl TileCodec for PlioCodec {
    fn encode(&self, buf: &[u8]) -> Result<Vec<u8>> {
        plio::compress_bytes(buf, self.bytepix)
    }

    fn decode(&self, buf: &[u8]) -> Result<Vec<u8>> {
        plio::decompress_bytes(buf, require_tile_size(self.tilesize)?)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HcompressCodec {
    pub scale: i64,
    pub smooth: bool,
    pub nx: i64,
    pub ny: i64,
    pub bytepix: usize,
}

impl HcompressCodec {
    pub fn from_params(params: &Parameters) -> Result<Self> {
        let scale = params.integer_or("scale", 0)?;
        if scale < 0 {
            return Err(CompressionError::params(format!(
                "scale must not be negative, got {}",
                scale
            )));
        }
        Ok(Self {
            scale,
            smooth: params.logical("smooth")?.unwrap_or(false),
            nx: positive("nx", params.required_integer("nx")?)? as i64,
            ny: positive("ny", params.required_integer("ny")?)? as i64,
            bytepix: one_of("bytepix", params.integer_or("bytepix", 4)?, &[1, 2, 4, 8])?,
        })
    }
}

impl TileCodec for HcompressCodec {
    fn encode(&self, buf: &[u8]) -> Result<Vec<u8>> {
        hcompress::compress_bytes(buf, self.nx, self.ny, self.scale, self.bytepix)
    }

    fn decode(&self, buf: &[u8]) -> Result<Vec<u8>> {
        hcompress::decompress_bytes(buf, self.nx, self.ny, self.smooth, self.bytepix)
    }
}

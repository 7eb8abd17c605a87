//! Gzip-framed deflate codecs (`GZIP_1`, and `GZIP_2` with byte shuffling).

pub mod shuffle;

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::core::{CompressionError, Result};

pub use shuffle::{shuffle, unshuffle};

pub fn compress_gzip(buf: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(buf.len() / 2 + 32), Compression::default());
    encoder.write_all(buf)?;
    Ok(encoder.finish()?)
}

pub fn decompress_gzip(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(compressed);
    let mut decompressed = Vec::with_capacity(compressed.len() * 4);

    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| CompressionError::corrupt(format!("GZIP decompression failed: {}", e)))?;

    Ok(decompressed)
}

pub fn compress_gzip2(buf: &[u8], itemsize: usize) -> Result<Vec<u8>> {
    let shuffled = shuffle(buf, itemsize)?;
    compress_gzip(&shuffled)
}

pub fn decompress_gzip2(compressed: &[u8], itemsize: usize) -> Result<Vec<u8>> {
    let shuffled = decompress_gzip(compressed)?;
    unshuffle(&shuffled, itemsize)
}

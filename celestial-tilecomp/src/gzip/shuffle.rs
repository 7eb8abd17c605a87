use crate::core::{CompressionError, Result};

fn check_itemsize(len: usize, itemsize: usize) -> Result<usize> {
    if !matches!(itemsize, 1 | 2 | 4 | 8) {
        return Err(CompressionError::params(format!(
            "GZIP_2 itemsize must be 1, 2, 4 or 8, got {}",
            itemsize
        )));
    }
    if len % itemsize != 0 {
        return Err(CompressionError::InvalidBufferLength {
            length: len,
            reason: format!("not a multiple of itemsize {}", itemsize),
        });
    }
    Ok(len / itemsize)
}

/// Group byte `j` of every element together, most significant plane first.
pub fn shuffle(buf: &[u8], itemsize: usize) -> Result<Vec<u8>> {
    let count = check_itemsize(buf.len(), itemsize)?;
    let mut out = vec![0u8; buf.len()];
    for (i, element) in buf.chunks_exact(itemsize).enumerate() {
        for (j, &byte) in element.iter().enumerate() {
            out[j * count + i] = byte;
        }
    }
    Ok(out)
}

pub fn unshuffle(buf: &[u8], itemsize: usize) -> Result<Vec<u8>> {
    let count = check_itemsize(buf.len(), itemsize)?;
    let mut out = vec![0u8; buf.len()];
    for (j, plane) in buf.chunks_exact(count.max(1)).enumerate().take(itemsize) {
        for (i, &byte) in plane.iter().enumerate() {
            out[i * itemsize + j] = byte;
        }
    }
    Ok(out)
}

//! Binary table storage of compressed tiles: one row per tile holding
//! variable length array descriptors into a trailing heap.

use std::io::{Cursor, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::core::{CompressionError, Result};
use crate::header::{Keyword, KeywordBuilder};

/// Row width with only the `COMPRESSED_DATA` descriptor.
pub const INT_ROW_LEN: usize = 8;
/// Row width with `COMPRESSED_DATA`, `GZIP_COMPRESSED_DATA`, `ZSCALE`, `ZZERO`.
pub const FLOAT_ROW_LEN: usize = 32;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileRecord {
    pub compressed: Vec<u8>,
    /// Raw pixels of a float tile that could not be quantized, GZIP_1 compressed.
    pub gzip_compressed: Vec<u8>,
    pub zscale: Option<f64>,
    pub zzero: Option<f64>,
}

impl TileRecord {
    pub fn quantized(compressed: Vec<u8>, zscale: f64, zzero: f64) -> Self {
        Self {
            compressed,
            zscale: Some(zscale),
            zzero: Some(zzero),
            ..Self::default()
        }
    }

    pub fn raw(compressed: Vec<u8>) -> Self {
        Self {
            compressed,
            ..Self::default()
        }
    }

    pub fn gzip_fallback(gzip_compressed: Vec<u8>) -> Self {
        Self {
            gzip_compressed,
            ..Self::default()
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.compressed.is_empty() && !self.gzip_compressed.is_empty()
    }
}

pub fn row_len(float_columns: bool) -> usize {
    if float_columns {
        FLOAT_ROW_LEN
    } else {
        INT_ROW_LEN
    }
}

fn descriptor_field(value: usize, what: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| {
        CompressionError::ValueOutOfRange(format!("{} {} does not fit a P descriptor", what, value))
    })
}

/// Serialize the rows followed by the heap.
pub fn to_table_bytes(records: &[TileRecord], float_columns: bool) -> Result<Vec<u8>> {
    let heap_len: usize = records
        .iter()
        .map(|r| r.compressed.len() + r.gzip_compressed.len())
        .sum();
    let mut out = Vec::with_capacity(records.len() * row_len(float_columns) + heap_len);
    let mut heap = Vec::with_capacity(heap_len);

    for record in records {
        let mut arrays = vec![&record.compressed];
        if float_columns {
            arrays.push(&record.gzip_compressed);
        }
        for array in arrays {
            out.write_i32::<BigEndian>(descriptor_field(array.len(), "array length")?)?;
            out.write_i32::<BigEndian>(descriptor_field(heap.len(), "heap offset")?)?;
            heap.extend_from_slice(array);
        }
        if float_columns {
            out.write_f64::<BigEndian>(record.zscale.unwrap_or(f64::NAN))?;
            out.write_f64::<BigEndian>(record.zzero.unwrap_or(f64::NAN))?;
        }
    }
    out.write_all(&heap)?;
    Ok(out)
}

fn read_array<'a>(cursor: &mut Cursor<&[u8]>, heap: &'a [u8]) -> Result<&'a [u8]> {
    let count = cursor.read_i32::<BigEndian>()?;
    let offset = cursor.read_i32::<BigEndian>()?;
    if count < 0 || offset < 0 {
        return Err(CompressionError::corrupt(format!(
            "negative descriptor ({}, {})",
            count, offset
        )));
    }
    let (count, offset) = (count as usize, offset as usize);
    heap.get(offset..offset + count).ok_or_else(|| {
        CompressionError::corrupt(format!(
            "descriptor ({}, {}) past the end of a {}-byte heap",
            count,
            offset,
            heap.len()
        ))
    })
}

/// Parse `nrows` rows and resolve their descriptors against the heap.
pub fn from_table_bytes(bytes: &[u8], nrows: usize, float_columns: bool) -> Result<Vec<TileRecord>> {
    let table_len = nrows * row_len(float_columns);
    if bytes.len() < table_len {
        return Err(CompressionError::InvalidBufferLength {
            length: bytes.len(),
            reason: format!("table of {} rows needs {} bytes", nrows, table_len),
        });
    }
    let (table, heap) = bytes.split_at(table_len);
    let mut cursor = Cursor::new(table);

    let mut records = Vec::with_capacity(nrows);
    for _ in 0..nrows {
        let mut record = TileRecord::raw(read_array(&mut cursor, heap)?.to_vec());
        if float_columns {
            record.gzip_compressed = read_array(&mut cursor, heap)?.to_vec();
            let zscale = cursor.read_f64::<BigEndian>()?;
            let zzero = cursor.read_f64::<BigEndian>()?;
            record.zscale = (!zscale.is_nan()).then_some(zscale);
            record.zzero = (!zzero.is_nan()).then_some(zzero);
        }
        records.push(record);
    }
    Ok(records)
}

/// `NAXISn`, `PCOUNT` and column keywords describing the table.
pub fn table_keywords(records: &[TileRecord], float_columns: bool) -> Vec<Keyword> {
    let heap_len: usize = records
        .iter()
        .map(|r| r.compressed.len() + r.gzip_compressed.len())
        .sum();
    let max_len = |f: fn(&TileRecord) -> usize| records.iter().map(f).max().unwrap_or(0);

    let mut builder = KeywordBuilder::new();
    builder
        .value("NAXIS1", row_len(float_columns), "width of table in bytes")
        .value("NAXIS2", records.len(), "number of rows in table")
        .value("PCOUNT", heap_len, "size of special data area")
        .value("TFIELDS", if float_columns { 4_i64 } else { 1 }, "number of fields in each row")
        .value("TTYPE1", "COMPRESSED_DATA", "label for field 1")
        .value(
            "TFORM1",
            format!("1PB({})", max_len(|r| r.compressed.len())),
            "data format of field: variable length array",
        );
    if float_columns {
        builder
            .value("TTYPE2", "GZIP_COMPRESSED_DATA", "label for field 2")
            .value(
                "TFORM2",
                format!("1PB({})", max_len(|r| r.gzip_compressed.len())),
                "data format of field: variable length array",
            )
            .value("TTYPE3", "ZSCALE", "label for field 3")
            .value("TFORM3", "1D", "data format of field: 8-byte DOUBLE")
            .value("TTYPE4", "ZZERO", "label for field 4")
            .value("TFORM4", "1D", "data format of field: 8-byte DOUBLE");
    }
    builder.build()
}

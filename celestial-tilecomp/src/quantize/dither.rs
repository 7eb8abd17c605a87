//! The fixed sequence of uniform random values used for subtractive
//! dithering. Every FITS reader and writer must produce the same table.

use std::sync::OnceLock;

use crate::core::{CompressionError, Result};

pub const N_RANDOM: usize = 10000;

/// Value of the Park-Miller seed after the last table entry.
pub const FINAL_SEED: f64 = 1_043_618_065.0;

struct DitherTable {
    values: Vec<f32>,
    final_seed: f64,
}

static DITHER_TABLE: OnceLock<DitherTable> = OnceLock::new();

fn generate() -> DitherTable {
    let a = 16807.0f64;
    let m = 2147483647.0f64;
    let mut seed = 1.0f64;
    let mut values = Vec::with_capacity(N_RANDOM);
    for _ in 0..N_RANDOM {
        let temp = a * seed;
        seed = temp - m * (temp / m).trunc();
        values.push((seed / m) as f32);
    }
    DitherTable {
        values,
        final_seed: seed,
    }
}

/// The shared dither table, built on first use.
pub fn random_values() -> Result<&'static [f32]> {
    let table = DITHER_TABLE.get_or_init(generate);
    if table.final_seed != FINAL_SEED {
        return Err(CompressionError::QuantizationFailed(format!(
            "dither table ended on seed {}, expected {}",
            table.final_seed, FINAL_SEED
        )));
    }
    Ok(&table.values)
}

/// Walks the dither table the way the quantizer and dequantizer both do:
/// start at `(row - 1) mod N_RANDOM`, advance once per pixel and reseed
/// whenever the end of the table is reached.
pub struct DitherSequence {
    table: &'static [f32],
    iseed: usize,
    nextrand: usize,
}

impl DitherSequence {
    pub fn new(row: i64) -> Result<Self> {
        let table = random_values()?;
        let iseed = (row - 1).rem_euclid(N_RANDOM as i64) as usize;
        Ok(Self {
            table,
            iseed,
            nextrand: Self::offset(table, iseed),
        })
    }

    fn offset(table: &[f32], iseed: usize) -> usize {
        (table[iseed] * 500.0) as usize
    }

    /// The value for the current pixel.
    #[inline]
    pub fn current(&self) -> f64 {
        f64::from(self.table[self.nextrand])
    }

    #[inline]
    pub fn advance(&mut self) {
        self.nextrand += 1;
        if self.nextrand == N_RANDOM {
            self.iseed = (self.iseed + 1) % N_RANDOM;
            self.nextrand = Self::offset(self.table, self.iseed);
        }
    }
}

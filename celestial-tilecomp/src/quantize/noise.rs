//! Background noise estimation from median absolute pixel differences.
//!
//! The 2nd, 3rd and 5th order estimators look at differences between pixels
//! two apart along each row. Runs of constant pixels are skipped so flat
//! regions do not drag the estimate to zero. NaN pixels are treated as nulls.

use num_traits::Float;

const MIN_ROW: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseEstimate {
    /// Number of non-null pixels.
    pub ngood: usize,
    pub min: f64,
    pub max: f64,
    pub noise2: f64,
    pub noise3: f64,
    pub noise5: f64,
}

impl NoiseEstimate {
    /// The smallest non-zero of the three estimators, preferring `noise3`.
    pub fn stdev(&self) -> f64 {
        let mut stdev = self.noise3;
        if self.noise2 != 0.0 && self.noise2 < stdev {
            stdev = self.noise2;
        }
        if self.noise5 != 0.0 && self.noise5 < stdev {
            stdev = self.noise5;
        }
        stdev
    }
}

/// Lower median, as found by a quick-select.
fn select_median(values: &mut [f64]) -> f64 {
    let mid = (values.len() - 1) / 2;
    let (_, median, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    *median
}

fn median_of_rows(values: &mut [f64]) -> f64 {
    match values.len() {
        0 => 0.0,
        1 => values[0],
        n => {
            values.sort_by(|a, b| a.total_cmp(b));
            (values[(n - 1) / 2] + values[n / 2]) / 2.0
        }
    }
}

/// Estimate the noise of an `nx` by `ny` image stored row by row.
///
/// The 2nd order median of a row is taken over the differences actually
/// collected for it, which can be fewer than the 3rd order ones when a row
/// holds constant triples. cfitsio sizes that median by the 3rd order count
/// instead; that is not reproduced, so `noise2` and the quantization scale
/// picked from it can differ from cfitsio on such tiles.
pub fn estimate_noise<T: Float>(data: &[T], nx: usize, ny: usize) -> NoiseEstimate {
    let (nx, ny) = if nx < MIN_ROW { (nx * ny, 1) } else { (nx, ny) };

    let mut min = f64::MAX;
    let mut max = f64::MIN;
    let mut ngood = 0usize;
    let mut track = |v: f64| {
        min = min.min(v);
        max = max.max(v);
    };

    if nx < MIN_ROW {
        for v in data.iter().take(nx).filter(|v| !v.is_nan()) {
            track(v.to_f64().unwrap_or(0.0));
            ngood += 1;
        }
        return NoiseEstimate {
            ngood,
            min,
            max,
            noise2: 0.0,
            noise3: 0.0,
            noise5: 0.0,
        };
    }

    let mut diffs2 = Vec::with_capacity(ny);
    let mut diffs3 = Vec::with_capacity(ny);
    let mut diffs5 = Vec::with_capacity(ny);
    let mut differences2 = Vec::with_capacity(nx);
    let mut differences3 = Vec::with_capacity(nx);
    let mut differences5 = Vec::with_capacity(nx);

    for row in data.chunks_exact(nx).take(ny) {
        let good: Vec<T> = row.iter().copied().filter(|v| !v.is_nan()).collect();
        ngood += good.len();
        for v in &good {
            track(v.to_f64().unwrap_or(0.0));
        }
        if good.len() < MIN_ROW {
            continue;
        }

        differences2.clear();
        differences3.clear();
        differences5.clear();
        let two = T::one() + T::one();
        let four = two + two;
        let six = four + two;
        for w in good.windows(MIN_ROW) {
            let (v1, v3, v4, v5, v6, v7, v9) = (w[0], w[2], w[3], w[4], w[5], w[6], w[8]);
            if !(v5 == v6 && v6 == v7) {
                differences2.push((v5 - v7).abs().to_f64().unwrap_or(0.0));
            }
            if !(v3 == v4 && v4 == v5 && v5 == v6 && v6 == v7) {
                differences3.push((two * v5 - v3 - v7).abs().to_f64().unwrap_or(0.0));
                differences5.push(
                    (six * v5 - four * v3 - four * v7 + v1 + v9)
                        .abs()
                        .to_f64()
                        .unwrap_or(0.0),
                );
            }
        }

        if differences3.is_empty() {
            continue;
        }
        if !differences2.is_empty() {
            diffs2.push(select_median(&mut differences2));
        }
        diffs3.push(select_median(&mut differences3));
        diffs5.push(select_median(&mut differences5));
    }

    NoiseEstimate {
        ngood,
        min,
        max,
        noise2: 1.0483579 * median_of_rows(&mut diffs2),
        noise3: 0.6052697 * median_of_rows(&mut diffs3),
        noise5: 0.1772048 * median_of_rows(&mut diffs5),
    }
}

//! Coefficient smoothing applied during lossy HCOMPRESS decoding.
//!
//! Adjusts the x, y and cross differences of each level towards values that
//! interpolate the neighbouring block sums, never by more than `scale / 2`
//! and only where the neighbourhood is monotonic. Edge coefficients are left
//! untouched.

use super::htrans::{restored, wide};
use crate::core::Result;

fn limited_step(s: i128, divisor_shift: u32, smax: i128) -> i128 {
    let round = (1i128 << divisor_shift) - 1;
    let s = if s >= 0 {
        s >> divisor_shift
    } else {
        (s + round) >> divisor_shift
    };
    s.clamp(-smax, smax)
}

/// `a` is indexed `a[row * ncols + col]`, of which `nxtop` rows and `nytop`
/// columns are in use at this level.
pub fn hsmooth(a: &mut [i64], nxtop: usize, nytop: usize, ncols: usize, scale: i64) -> Result<()> {
    let smax = wide(scale >> 1);
    if smax <= 0 {
        return Ok(());
    }
    let ny2 = ncols << 1;

    // x differences
    let mut i = 2;
    while i + 2 < nxtop {
        let mut s00 = ncols * i;
        let mut s10 = s00 + ncols;
        let mut j = 0;
        while j < nytop {
            let hm = wide(a[s00 - ny2]);
            let h0 = wide(a[s00]);
            let hp = wide(a[s00 + ny2]);
            let dmax = (hp - h0).min(h0 - hm).max(0) << 2;
            let dmin = (hp - h0).max(h0 - hm).min(0) << 2;
            if dmin < dmax {
                let diff = (hp - hm).min(dmax).max(dmin);
                let hx = wide(a[s10]);
                a[s10] = restored(hx + limited_step(diff - (hx << 3), 3, smax))?;
            }
            s00 += 2;
            s10 += 2;
            j += 2;
        }
        i += 2;
    }

    // y differences
    let mut i = 0;
    while i < nxtop {
        let mut s00 = ncols * i + 2;
        let mut j = 2;
        while j + 2 < nytop {
            let hm = wide(a[s00 - 2]);
            let h0 = wide(a[s00]);
            let hp = wide(a[s00 + 2]);
            let dmax = (hp - h0).min(h0 - hm).max(0) << 2;
            let dmin = (hp - h0).max(h0 - hm).min(0) << 2;
            if dmin < dmax {
                let diff = (hp - hm).min(dmax).max(dmin);
                let hy = wide(a[s00 + 1]);
                a[s00 + 1] = restored(hy + limited_step(diff - (hy << 3), 3, smax))?;
            }
            s00 += 2;
            j += 2;
        }
        i += 2;
    }

    // cross differences
    let mut i = 2;
    while i + 2 < nxtop {
        let mut s00 = ncols * i + 2;
        let mut s10 = s00 + ncols;
        let mut j = 2;
        while j + 2 < nytop {
            let hmm = wide(a[s00 - ny2 - 2]);
            let hpm = wide(a[s00 + ny2 - 2]);
            let hmp = wide(a[s00 - ny2 + 2]);
            let hpp = wide(a[s00 + ny2 + 2]);
            let h0 = wide(a[s00]);

            let diff = hpp + hmm - hmp - hpm;
            let hx2 = wide(a[s10]) << 1;
            let hy2 = wide(a[s00 + 1]) << 1;

            let m1 = ((hpp - h0).max(0) - hx2 - hy2).min((h0 - hpm).max(0) + hx2 - hy2);
            let m2 = ((h0 - hmp).max(0) - hx2 + hy2).min((hmm - h0).max(0) + hx2 + hy2);
            let dmax = m1.min(m2) << 4;
            let m1 = ((hpp - h0).min(0) - hx2 - hy2).max((h0 - hpm).min(0) + hx2 - hy2);
            let m2 = ((h0 - hmp).min(0) - hx2 + hy2).max((hmm - h0).min(0) + hx2 + hy2);
            let dmin = m1.max(m2) << 4;

            if dmin < dmax {
                let diff = diff.min(dmax).max(dmin);
                let hc = wide(a[s10 + 1]);
                a[s10 + 1] = restored(hc + limited_step(diff - (hc << 6), 6, smax))?;
            }
            s00 += 2;
            s10 += 2;
            j += 2;
        }
        i += 2;
    }
    Ok(())
}

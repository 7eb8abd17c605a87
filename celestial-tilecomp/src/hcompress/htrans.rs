//! Integer H-transform and its inverse.
//!
//! Arrays are indexed `a[row * ncols + col]`. Each level replaces 2x2 blocks
//! with their sum and x/y/cross differences, then shuffles so the sums of the
//! next level sit in the top-left corner.

use super::ilog2_ceil;
use super::smooth::hsmooth;
use crate::core::{CompressionError, Result};

pub(super) fn wide(v: i64) -> i128 {
    i128::from(v)
}

fn coefficient(v: i128) -> Result<i64> {
    i64::try_from(v).map_err(|_| {
        CompressionError::ValueOutOfRange(format!("H-transform coefficient {} exceeds 64 bits", v))
    })
}

/// Narrow a value rebuilt by the inverse transform; only a damaged stream
/// can push one past 64 bits.
pub(super) fn restored(v: i128) -> Result<i64> {
    i64::try_from(v).map_err(|_| {
        CompressionError::corrupt(format!("inverse H-transform produced {}", v))
    })
}

pub fn htrans(a: &mut [i64], nrows: usize, ncols: usize) -> Result<()> {
    let nmax = nrows.max(ncols);
    let log2n = ilog2_ceil(nmax);
    let mut tmp = vec![0i64; nmax.div_ceil(2)];

    let mut shift = 0u32;
    let mut mask: i128 = -2;
    let mut mask2: i128 = mask << 1;
    let mut prnd: i128 = 1;
    let mut prnd2: i128 = prnd << 1;
    let mut nrnd2: i128 = prnd2 - 1;

    let round = |v: i128, prnd: i128, mask: i128| (if v >= 0 { v + prnd } else { v }) & mask;
    let round_sum = |v: i128, prnd2: i128, nrnd2: i128, mask2: i128| {
        (if v >= 0 { v + prnd2 } else { v + nrnd2 }) & mask2
    };

    let mut nxtop = nrows;
    let mut nytop = ncols;
    for _ in 0..log2n {
        let oddx = nxtop % 2;
        let oddy = nytop % 2;

        let mut i = 0;
        while i < nxtop - oddx {
            let mut s00 = i * ncols;
            let mut s10 = s00 + ncols;
            let mut j = 0;
            while j < nytop - oddy {
                let (p00, p01) = (wide(a[s00]), wide(a[s00 + 1]));
                let (p10, p11) = (wide(a[s10]), wide(a[s10 + 1]));
                let h0 = (p11 + p10 + p01 + p00) >> shift;
                let hx = (p11 + p10 - p01 - p00) >> shift;
                let hy = (p11 - p10 + p01 - p00) >> shift;
                let hc = (p11 - p10 - p01 + p00) >> shift;

                a[s10 + 1] = coefficient(hc)?;
                a[s10] = coefficient(round(hx, prnd, mask))?;
                a[s00 + 1] = coefficient(round(hy, prnd, mask))?;
                a[s00] = coefficient(round_sum(h0, prnd2, nrnd2, mask2))?;
                s00 += 2;
                s10 += 2;
                j += 2;
            }
            if oddy == 1 {
                let (p00, p10) = (wide(a[s00]), wide(a[s10]));
                let h0 = (p10 + p00) << (1 - shift);
                let hx = (p10 - p00) << (1 - shift);
                a[s10] = coefficient(round(hx, prnd, mask))?;
                a[s00] = coefficient(round_sum(h0, prnd2, nrnd2, mask2))?;
            }
            i += 2;
        }
        if oddx == 1 {
            let mut s00 = i * ncols;
            let mut j = 0;
            while j < nytop - oddy {
                let (p00, p01) = (wide(a[s00]), wide(a[s00 + 1]));
                let h0 = (p01 + p00) << (1 - shift);
                let hy = (p01 - p00) << (1 - shift);
                a[s00 + 1] = coefficient(round(hy, prnd, mask))?;
                a[s00] = coefficient(round_sum(h0, prnd2, nrnd2, mask2))?;
                s00 += 2;
                j += 2;
            }
            if oddy == 1 {
                let h0 = wide(a[s00]) << (2 - shift);
                a[s00] = coefficient(round_sum(h0, prnd2, nrnd2, mask2))?;
            }
        }

        for i in 0..nxtop {
            shuffle(&mut a[ncols * i..], nytop, 1, &mut tmp);
        }
        for j in 0..nytop {
            shuffle(&mut a[j..], nxtop, ncols, &mut tmp);
        }

        nxtop = (nxtop + 1) >> 1;
        nytop = (nytop + 1) >> 1;

        shift = 1;
        mask = mask2;
        prnd = prnd2;
        mask2 <<= 1;
        prnd2 <<= 1;
        nrnd2 = prnd2 - 1;
    }
    Ok(())
}

pub fn hinv(a: &mut [i64], nrows: usize, ncols: usize, smooth: bool, scale: i64) -> Result<()> {
    let nmax = nrows.max(ncols);
    let log2n = ilog2_ceil(nmax);
    if log2n == 0 {
        return Ok(());
    }
    let mut tmp = vec![0i64; nmax.div_ceil(2)];

    let mut shift = 1u32;
    let mut bit0: i128 = 1 << (log2n - 1);
    let mut bit1: i128 = bit0 << 1;
    let bit2: i128 = bit0 << 2;
    let mut mask0: i128 = -bit0;
    let mut mask1: i128 = mask0 << 1;
    let mask2: i128 = mask0 << 2;
    let mut prnd0: i128 = bit0 >> 1;
    let mut prnd1: i128 = bit1 >> 1;
    let prnd2: i128 = bit2 >> 1;
    let mut nrnd0: i128 = prnd0 - 1;
    let mut nrnd1: i128 = prnd1 - 1;
    let nrnd2: i128 = prnd2 - 1;

    let top = wide(a[0]);
    a[0] = restored((top + if top >= 0 { prnd2 } else { nrnd2 }) & mask2)?;

    let mut nxtop = 1usize;
    let mut nytop = 1usize;
    let mut nxf = nrows;
    let mut nyf = ncols;
    let mut c = 1usize << log2n;

    for k in (0..log2n).rev() {
        c >>= 1;
        nxtop <<= 1;
        nytop <<= 1;
        if nxf <= c {
            nxtop -= 1;
        } else {
            nxf -= c;
        }
        if nyf <= c {
            nytop -= 1;
        } else {
            nyf -= c;
        }

        if k == 0 {
            nrnd0 = 0;
            shift = 2;
        }

        for i in 0..nxtop {
            unshuffle(&mut a[ncols * i..], nytop, 1, &mut tmp);
        }
        for j in 0..nytop {
            unshuffle(&mut a[j..], nxtop, ncols, &mut tmp);
        }

        if smooth {
            hsmooth(a, nxtop, nytop, ncols, scale)?;
        }

        let oddx = nxtop % 2;
        let oddy = nytop % 2;
        let mut i = 0;
        while i < nxtop - oddx {
            let mut s00 = ncols * i;
            let mut s10 = s00 + ncols;
            let mut j = 0;
            while j < nytop - oddy {
                let mut h0 = wide(a[s00]);
                let mut hx = wide(a[s10]);
                let mut hy = wide(a[s00 + 1]);
                let mut hc = wide(a[s10 + 1]);

                hx = (hx + if hx >= 0 { prnd1 } else { nrnd1 }) & mask1;
                hy = (hy + if hy >= 0 { prnd1 } else { nrnd1 }) & mask1;
                hc = (hc + if hc >= 0 { prnd0 } else { nrnd0 }) & mask0;

                let lowbit0 = hc & bit0;
                hx = if hx >= 0 { hx - lowbit0 } else { hx + lowbit0 };
                hy = if hy >= 0 { hy - lowbit0 } else { hy + lowbit0 };

                let lowbit1 = (hc ^ hx ^ hy) & bit1;
                h0 = if h0 >= 0 {
                    h0 + lowbit0 - lowbit1
                } else if lowbit0 == 0 {
                    h0 + lowbit1
                } else {
                    h0 + (lowbit0 - lowbit1)
                };

                a[s10 + 1] = restored((h0 + hx + hy + hc) >> shift)?;
                a[s10] = restored((h0 + hx - hy - hc) >> shift)?;
                a[s00 + 1] = restored((h0 - hx + hy - hc) >> shift)?;
                a[s00] = restored((h0 - hx - hy + hc) >> shift)?;
                s00 += 2;
                s10 += 2;
                j += 2;
            }
            if oddy == 1 {
                let mut h0 = wide(a[s00]);
                let mut hx = wide(a[s10]);
                hx = (if hx >= 0 { hx + prnd1 } else { hx + nrnd1 }) & mask1;
                let lowbit1 = hx & bit1;
                h0 = if h0 >= 0 { h0 - lowbit1 } else { h0 + lowbit1 };
                a[s10] = restored((h0 + hx) >> shift)?;
                a[s00] = restored((h0 - hx) >> shift)?;
            }
            i += 2;
        }
        if oddx == 1 {
            let mut s00 = ncols * i;
            let mut j = 0;
            while j < nytop - oddy {
                let mut h0 = wide(a[s00]);
                let mut hy = wide(a[s00 + 1]);
                hy = (if hy >= 0 { hy + prnd1 } else { hy + nrnd1 }) & mask1;
                let lowbit1 = hy & bit1;
                h0 = if h0 >= 0 { h0 - lowbit1 } else { h0 + lowbit1 };
                a[s00 + 1] = restored((h0 + hy) >> shift)?;
                a[s00] = restored((h0 - hy) >> shift)?;
                s00 += 2;
                j += 2;
            }
            if oddy == 1 {
                a[s00] >>= shift;
            }
        }

        bit1 = bit0;
        bit0 >>= 1;
        mask1 = mask0;
        mask0 >>= 1;
        prnd1 = prnd0;
        prnd0 >>= 1;
        nrnd1 = nrnd0;
        nrnd0 = prnd0 - 1;
    }
    Ok(())
}

/// Move even-indexed elements to the front half and odd ones to the back.
fn shuffle(a: &mut [i64], n: usize, stride: usize, tmp: &mut [i64]) {
    let mut k = 0;
    for i in (1..n).step_by(2) {
        tmp[k] = a[i * stride];
        k += 1;
    }
    for i in (2..n).step_by(2) {
        a[(i / 2) * stride] = a[i * stride];
    }
    let half = n.div_ceil(2);
    for (m, value) in tmp[..k].iter().enumerate() {
        a[(half + m) * stride] = *value;
    }
}

fn unshuffle(a: &mut [i64], n: usize, stride: usize, tmp: &mut [i64]) {
    let nhalf = n.div_ceil(2);
    for (k, i) in (nhalf..n).enumerate() {
        tmp[k] = a[i * stride];
    }
    for i in (0..nhalf).rev() {
        a[2 * i * stride] = a[i * stride];
    }
    for (k, i) in (1..n).step_by(2).enumerate() {
        a[i * stride] = tmp[k];
    }
}

pub fn digitize(a: &mut [i64], scale: i64) {
    if scale <= 1 {
        return;
    }
    let d = wide((scale + 1) / 2 - 1);
    for v in a.iter_mut() {
        let x = wide(*v);
        let q = (if x > 0 { x + d } else { x - d }) / wide(scale);
        // |q| never exceeds |v| since d < scale
        *v = q as i64;
    }
}

pub fn undigitize(a: &mut [i64], scale: i64) -> Result<()> {
    if scale <= 1 {
        return Ok(());
    }
    for v in a.iter_mut() {
        *v = v.checked_mul(scale).ok_or_else(|| {
            CompressionError::corrupt(format!("coefficient {} times scale {} overflows", v, scale))
        })?;
    }
    Ok(())
}

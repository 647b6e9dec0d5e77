// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics. These spell out the array operations used when
//! making convolution functions so that no broadcasting is hidden.

#[cfg(test)]
mod tests;

use ndarray::prelude::*;
use rustfft::FftPlanner;

use crate::c64;

/// Complex exponential. The argument is assumed to be purely imaginary.
///
/// This function doesn't actually use complex numbers; it just returns the real
/// and imag components from Euler's formula (i.e. e^{ix} = cos{x} + i sin{x}).
#[inline]
pub(crate) fn cexp(x: f64) -> c64 {
    let (im, re) = x.sin_cos();
    c64::new(re, im)
}

/// Find the index of the value in `values` that is closest to `target`. Ties
/// resolve to the lower index. Returns `None` only if `values` is empty.
pub fn nearest_index(values: &[f64], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        let d = (v - target).abs();
        match best {
            // Strictly less; an equal distance keeps the earlier index.
            Some((_, best_d)) if d >= best_d => (),
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}

/// As [`nearest_index`], but also returns the nearest value.
pub fn nearest_value(values: &[f64], target: f64) -> Option<(usize, f64)> {
    nearest_index(values, target).map(|i| (i, values[i]))
}

/// The frequency mirrored about the reference frequency such that the two
/// frequencies' squares average to the square of the reference. Used to find
/// the frequency at which the conjugate-polarisation beam is evaluated.
pub fn conj_freq(freq: f64, ref_freq: f64) -> f64 {
    (2.0 * ref_freq * ref_freq - freq * freq).max(0.0).sqrt()
}

/// Multiply `dst` by `src` element by element. The arrays must have the same
/// shape.
pub(crate) fn elementwise_multiply_in_place(mut dst: ArrayViewMut2<c64>, src: ArrayView2<c64>) {
    assert_eq!(dst.dim(), src.dim());
    dst.zip_mut_with(&src, |d, &s| *d *= s);
}

/// Multiply `dst` by `a * conj(b)` element by element.
pub(crate) fn multiply_by_conj_product(
    mut dst: ArrayViewMut2<c64>,
    a: ArrayView2<c64>,
    b: ArrayView2<c64>,
) {
    assert_eq!(dst.dim(), a.dim());
    assert_eq!(dst.dim(), b.dim());
    ndarray::Zip::from(&mut dst)
        .and(&a)
        .and(&b)
        .for_each(|d, &a, &b| *d *= a * b.conj());
}

/// Copy the centre of `src` into the centre of `dst`. If `dst` is smaller than
/// `src`, the middle of `src` is cut out; if it's larger, `src` lands in the
/// middle of `dst` and the rest of `dst` is untouched. `offset` shifts the
/// region taken from `src` \[pixels\].
pub(crate) fn centered_slice(mut dst: ArrayViewMut2<c64>, src: ArrayView2<c64>, offset: [isize; 2]) {
    let (dx, dy) = dst.dim();
    let (sx, sy) = src.dim();
    let nx = dx.min(sx);
    let ny = dy.min(sy);
    let dst_x0 = (dx - nx) / 2;
    let dst_y0 = (dy - ny) / 2;
    let src_x0 = (sx - nx) / 2;
    let src_y0 = (sy - ny) / 2;
    for i in 0..nx {
        let si = (src_x0 + i) as isize + offset[0];
        if si < 0 || si as usize >= sx {
            continue;
        }
        for j in 0..ny {
            let sj = (src_y0 + j) as isize + offset[1];
            if sj < 0 || sj as usize >= sy {
                continue;
            }
            dst[(dst_x0 + i, dst_y0 + j)] = src[(si as usize, sj as usize)];
        }
    }
}

/// Return the index and value of the element with the largest magnitude.
/// The first such element wins.
pub(crate) fn peak(a: ArrayView2<c64>) -> ((usize, usize), c64) {
    let mut best = ((0, 0), c64::default());
    let mut best_norm = -1.0;
    for (ndx, &v) in a.indexed_iter() {
        let n = v.norm();
        if n > best_norm {
            best_norm = n;
            best = (ndx, v);
        }
    }
    best
}

/// Swap the quadrants of a 2D array so that the zero-frequency component
/// moves from the corner to the centre (or back, for even sizes).
fn fftshift2(a: &mut Array2<c64>, inverse: bool) {
    let (nx, ny) = a.dim();
    let (sx, sy) = if inverse {
        ((nx + 1) / 2, (ny + 1) / 2)
    } else {
        (nx / 2, ny / 2)
    };
    let mut out = Array2::zeros((nx, ny));
    for ((i, j), &v) in a.indexed_iter() {
        out[((i + sx) % nx, (j + sy) % ny)] = v;
    }
    *a = out;
}

/// In-place 2D complex-to-complex FFT of a centred buffer; the output is
/// centred too. This is the "image domain to gridding domain" transform: the
/// forward FFT, with the origin at pixel N/2 on both sides.
pub(crate) fn cfft2d(a: &mut Array2<c64>, forward: bool) {
    let (nx, ny) = a.dim();
    if nx == 0 || ny == 0 {
        return;
    }
    fftshift2(a, true);

    let mut planner = FftPlanner::new();
    let (fft_x, fft_y) = if forward {
        (planner.plan_fft_forward(nx), planner.plan_fft_forward(ny))
    } else {
        (planner.plan_fft_inverse(nx), planner.plan_fft_inverse(ny))
    };

    // Rows are contiguous in a standard-layout array.
    let mut buf = a.as_standard_layout().into_owned();
    for mut row in buf.rows_mut() {
        let mut line = row.to_vec();
        fft_y.process(&mut line);
        row.assign(&ArrayView1::from(&line));
    }
    for mut col in buf.columns_mut() {
        let mut line = col.to_vec();
        fft_x.process(&mut line);
        col.assign(&ArrayView1::from(&line));
    }
    if !forward {
        let scale = 1.0 / (nx * ny) as f64;
        buf.mapv_inplace(|v| v * scale);
    }
    *a = buf;
    fftshift2(a, false);
}

/// Rotate a 2D complex array by `angle_rad` about its centre pixel using
/// bilinear interpolation. Samples that fall outside the input are zero.
pub(crate) fn rotate_bilinear(a: ArrayView2<c64>, angle_rad: f64) -> Array2<c64> {
    let (nx, ny) = a.dim();
    let cx = (nx / 2) as f64;
    let cy = (ny / 2) as f64;
    let (s, c) = angle_rad.sin_cos();
    let sample = |x: f64, y: f64| -> c64 {
        if x < 0.0 || y < 0.0 || x > (nx - 1) as f64 || y > (ny - 1) as f64 {
            return c64::default();
        }
        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(nx - 1);
        let y1 = (y0 + 1).min(ny - 1);
        let fx = x - x0 as f64;
        let fy = y - y0 as f64;
        a[(x0, y0)] * ((1.0 - fx) * (1.0 - fy))
            + a[(x1, y0)] * (fx * (1.0 - fy))
            + a[(x0, y1)] * ((1.0 - fx) * fy)
            + a[(x1, y1)] * (fx * fy)
    };

    Array2::from_shape_fn((nx, ny), |(i, j)| {
        // Inverse mapping: find where this output pixel came from.
        let dx = i as f64 - cx;
        let dy = j as f64 - cy;
        let x = c * dx + s * dy + cx;
        let y = -s * dx + c * dy + cy;
        sample(x, y)
    })
}

/// Bessel function of the first kind, order one, using the rational
/// approximations from Numerical Recipes (`bessj1`).
pub(crate) fn bessel_j1(x: f64) -> f64 {
    let ax = x.abs();
    if ax < 8.0 {
        let y = x * x;
        #[rustfmt::skip]
        let num = x * (72362614232.0 + y * (-7895059235.0 + y * (242396853.1
            + y * (-2972611.439 + y * (15704.48260 + y * (-30.16036606))))));
        #[rustfmt::skip]
        let den = 144725228442.0 + y * (2300535178.0 + y * (18583304.74
            + y * (99447.43394 + y * (376.9991397 + y))));
        num / den
    } else {
        let z = 8.0 / ax;
        let y = z * z;
        let xx = ax - 2.356194491;
        #[rustfmt::skip]
        let p = 1.0 + y * (0.183105e-2 + y * (-0.3516396496e-4
            + y * (0.2457520174e-5 + y * (-0.240337019e-6))));
        #[rustfmt::skip]
        let q = 0.04687499995 + y * (-0.2002690873e-3
            + y * (0.8449199096e-5 + y * (-0.88228987e-6 + y * 0.105787412e-6)));
        let ans = (0.636619772 / ax).sqrt() * (xx.cos() * p - z * xx.sin() * q);
        if x < 0.0 {
            -ans
        } else {
            ans
        }
    }
}

/// Prolate-spheroidal wave function (order 6, alpha 1) used for anti-aliasing,
/// including the `1 - x^2` factor. Zero for `|x| > 1`.
pub(crate) fn spheroidal(x: f64) -> f64 {
    #[rustfmt::skip]
    let p: [[f64; 5]; 2] = [
        [8.203343e-2, -3.644705e-1, 6.278660e-1, -5.335581e-1, 2.312756e-1],
        [4.028559e-3, -3.697768e-2, 1.021332e-1, -1.201436e-1, 6.412774e-2],
    ];
    #[rustfmt::skip]
    let q: [[f64; 3]; 2] = [
        [1.0000000e0, 8.212018e-1, 2.078043e-1],
        [1.0000000e0, 9.599102e-1, 2.918724e-1],
    ];

    let x = x.abs();
    let (part, end) = if x < 0.75 {
        (0, 0.75)
    } else if x <= 1.0 {
        (1, 1.0)
    } else {
        return 0.0;
    };

    let x_squared = x * x;
    let del_x_squared = x_squared - end * end;
    let mut del_x_squared_pow = del_x_squared;
    let mut top = p[part][0];
    for p in p[part].iter().skip(1) {
        top += p * del_x_squared_pow;
        del_x_squared_pow *= del_x_squared;
    }

    let mut btm = q[part][0];
    del_x_squared_pow = del_x_squared;
    for q in q[part].iter().skip(1) {
        btm += q * del_x_squared_pow;
        del_x_squared_pow *= del_x_squared;
    }

    if btm == 0.0 {
        0.0
    } else {
        (1.0 - x_squared) * (top / btm)
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use ndarray::prelude::*;

use super::*;
use crate::constants::{FRAC_PI_2, PI};

#[test]
fn test_nearest_index() {
    let values = [1.0, 2.0, 4.0];
    assert_eq!(nearest_index(&values, 0.0), Some(0));
    assert_eq!(nearest_index(&values, 1.9), Some(1));
    assert_eq!(nearest_index(&values, 100.0), Some(2));
    assert_eq!(nearest_index(&[], 1.0), None);
}

#[test]
fn test_nearest_index_ties_go_low() {
    let values = [1.0, 3.0, 5.0];
    // 2.0 is exactly between 1.0 and 3.0.
    assert_eq!(nearest_index(&values, 2.0), Some(0));
    assert_eq!(nearest_index(&values, 4.0), Some(1));
    let (i, v) = nearest_value(&values, 4.0).unwrap();
    assert_eq!(i, 1);
    assert_abs_diff_eq!(v, 3.0);
}

#[test]
fn test_conj_freq() {
    // At the reference frequency, the conjugate is the reference.
    assert_abs_diff_eq!(conj_freq(1.4e9, 1.4e9), 1.4e9, epsilon = 1e-3);
    let f = 1.3e9;
    let r = 1.4e9;
    let c = conj_freq(f, r);
    assert_abs_diff_eq!(f * f + c * c, 2.0 * r * r, epsilon = 1e6);
    // Nonsense inputs don't produce NaN.
    assert_abs_diff_eq!(conj_freq(10.0, 1.0), 0.0);
}

#[test]
fn test_cexp() {
    assert_abs_diff_eq!(cexp(PI).re, -1.0, epsilon = 1e-15);
    assert_abs_diff_eq!(cexp(PI).im, 0.0, epsilon = 1e-15);
    assert_abs_diff_eq!(cexp(FRAC_PI_2).im, 1.0, epsilon = 1e-15);
}

#[test]
fn test_centered_slice_shrinks_and_grows() {
    let src = Array2::from_shape_fn((5, 5), |(i, j)| c64::new((i * 5 + j) as f64, 0.0));
    let mut small = Array2::zeros((3, 3));
    centered_slice(small.view_mut(), src.view(), [0, 0]);
    assert_abs_diff_eq!(small[(1, 1)].re, 12.0);
    assert_abs_diff_eq!(small[(0, 0)].re, 6.0);

    let mut big = Array2::zeros((7, 7));
    centered_slice(big.view_mut(), src.view(), [0, 0]);
    assert_abs_diff_eq!(big[(3, 3)].re, 12.0);
    assert_abs_diff_eq!(big[(0, 0)].re, 0.0);
    assert_abs_diff_eq!(big[(1, 1)].re, 0.0);
}

#[test]
fn test_peak() {
    let mut a = Array2::zeros((4, 4));
    a[(1, 2)] = c64::new(0.0, -3.0);
    a[(3, 3)] = c64::new(2.0, 0.0);
    let (ndx, v) = peak(a.view());
    assert_eq!(ndx, (1, 2));
    assert_abs_diff_eq!(v.im, -3.0);
}

#[test]
fn test_fft_of_centred_delta_is_flat() {
    let n = 8;
    let mut a = Array2::zeros((n, n));
    a[(n / 2, n / 2)] = c64::new(1.0, 0.0);
    cfft2d(&mut a, true);
    for v in a.iter() {
        assert_abs_diff_eq!(v.re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v.im, 0.0, epsilon = 1e-12);
    }
}

#[test]
fn test_fft_of_flat_is_centred_delta() {
    let n = 16;
    let mut a = Array2::from_elem((n, n), c64::new(1.0, 0.0));
    cfft2d(&mut a, true);
    let (ndx, v) = peak(a.view());
    assert_eq!(ndx, (n / 2, n / 2));
    assert_abs_diff_eq!(v.re, (n * n) as f64, epsilon = 1e-9);
    cfft2d(&mut a, false);
    for v in a.iter() {
        assert_abs_diff_eq!(v.re, 1.0, epsilon = 1e-12);
    }
}

#[test]
fn test_rotate_by_zero_is_identity() {
    let a = Array2::from_shape_fn((9, 9), |(i, j)| c64::new(i as f64, j as f64));
    let r = rotate_bilinear(a.view(), 0.0);
    for (x, y) in a.iter().zip(r.iter()) {
        assert_abs_diff_eq!(x.re, y.re, epsilon = 1e-12);
        assert_abs_diff_eq!(x.im, y.im, epsilon = 1e-12);
    }
}

#[test]
fn test_rotate_quarter_turn_moves_pixel() {
    let mut a = Array2::zeros((9, 9));
    a[(6, 4)] = c64::new(1.0, 0.0);
    let r = rotate_bilinear(a.view(), FRAC_PI_2);
    let (ndx, v) = peak(r.view());
    assert_eq!(ndx, (4, 6));
    assert_abs_diff_eq!(v.re, 1.0, epsilon = 1e-9);
}

#[test]
fn test_bessel_j1() {
    assert_abs_diff_eq!(bessel_j1(0.0), 0.0);
    assert_abs_diff_eq!(bessel_j1(1.0), 0.4400505857, epsilon = 1e-7);
    assert_abs_diff_eq!(bessel_j1(3.8317059702), 0.0, epsilon = 1e-7);
    assert_abs_diff_eq!(bessel_j1(10.0), 0.0434727462, epsilon = 1e-7);
    assert_abs_diff_eq!(bessel_j1(-1.0), -0.4400505857, epsilon = 1e-7);
}

#[test]
fn test_spheroidal() {
    assert_abs_diff_eq!(spheroidal(0.0), 1.0, epsilon = 1e-5);
    assert_abs_diff_eq!(spheroidal(1.0), 0.0);
    assert_abs_diff_eq!(spheroidal(1.5), 0.0);
    // Monotonically decreasing away from the centre.
    let mut last = spheroidal(0.0);
    for i in 1..=20 {
        let v = spheroidal(i as f64 / 20.0);
        assert!(v <= last);
        last = v;
    }
}

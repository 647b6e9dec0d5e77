// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use ndarray::prelude::*;
use tempfile::TempDir;

use super::*;
use crate::{
    c64,
    cf::CfStore2,
    constants::DEFAULT_PA_STEP_DEG,
    coord::{CoordinateSystem, ImageGeometry, Stokes},
    math::peak,
    pol::{PolError, PolOuterProduct, PolOuterProductKind},
    terms::{
        ATermLike, AiryDishATerm, DishTermFactory, NoATerm, NoWTerm, ProlateSpheroidal,
        PsTermLike, TermError, WTerm, WTermLike,
    },
    vis::{AntennaInfo, SpwSelection, VisBufferSummary},
};

const CONV_SIZE: usize = 64;
const SAMPLING: usize = 4;
const FREQ: f64 = 1.4e9;

type AiryConvFunc = AwConvFunc<AiryDishATerm, ProlateSpheroidal, WTerm>;

fn image(stokes: Vec<Stokes>) -> ImageGeometry {
    ImageGeometry {
        coords: CoordinateSystem::new_sky([0.0, 0.5], 1e-4, 64, 64, FREQ, 1e6, stokes),
        shape: [64, 64],
    }
}

fn antennas(diameters: &[f64]) -> Vec<AntennaInfo> {
    diameters
        .iter()
        .enumerate()
        .map(|(i, &d)| AntennaInfo {
            name: format!("ea{i:02}"),
            diameter_m: d,
        })
        .collect()
}

fn vb(diameters: &[f64], pa_rad: f64) -> VisBufferSummary {
    VisBufferSummary::all_baselines("VLA", antennas(diameters), vec![FREQ], pa_rad)
}

fn rr_diagonal() -> PolOuterProduct {
    PolOuterProduct::new(&[Stokes::RR], PolOuterProductKind::Diagonal).unwrap()
}

fn airy(squint_rad: f64) -> AiryConvFunc {
    AwConvFunc::new(
        AiryDishATerm::new("VLA", CONV_SIZE, SAMPLING).with_squint(squint_rad),
        ProlateSpheroidal::new(),
        WTerm,
    )
}

fn new_stores() -> (CfStore2, CfStore2) {
    let d_pa = DEFAULT_PA_STEP_DEG.to_radians();
    (CfStore2::new(d_pa), CfStore2::new(d_pa))
}

/// Make the kernels of a single RR w-plane at PA 0.
fn make(
    cf: &mut AiryConvFunc,
    diameters: &[f64],
    fill: bool,
) -> Result<(CfStore2, CfStore2), AwConvFuncError> {
    make_with(cf, diameters, 0.0, 1, &rr_diagonal(), vec![Stokes::I], &[], fill)
}

#[allow(clippy::too_many_arguments)]
fn make_with<A: ATermLike, P: PsTermLike, W: WTermLike>(
    cf: &mut AwConvFunc<A, P, W>,
    diameters: &[f64],
    pa_rad: f64,
    w_planes: usize,
    pop: &PolOuterProduct,
    stokes: Vec<Stokes>,
    freq_selection: &[SpwSelection],
    fill: bool,
) -> Result<(CfStore2, CfStore2), AwConvFuncError> {
    let (mut sig, mut wt) = new_stores();
    cf.make_conv_function(
        &image(stokes),
        &vb(diameters, pa_rad),
        w_planes,
        pop,
        pa_rad,
        DEFAULT_PA_STEP_DEG.to_radians(),
        [1.0, 1.0],
        [0.0, 0.0],
        freq_selection,
        &mut sig,
        &mut wt,
        fill,
    )?;
    Ok((sig, wt))
}

/// One channel in each of two spectral windows, either side of the reference
/// frequency.
fn two_spws() -> Vec<SpwSelection> {
    [1.3e9, 1.5e9]
        .into_iter()
        .enumerate()
        .map(|(spw, f)| SpwSelection {
            spw,
            chan_freqs_hz: vec![f],
            selected_channels: vec![0],
        })
        .collect()
}

fn first_kernel(store: &CfStore2) -> Array2<c64> {
    let cfb = store.get_cf_buffer_by_index([0, 0]).unwrap().unwrap();
    cfb.get_cell([0, 0, 0]).unwrap().pixels.clone().unwrap()
}

fn summed_diff(a: &Array2<c64>, b: &Array2<c64>) -> f64 {
    assert_eq!(a.dim(), b.dim());
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).norm()).sum()
}

fn disc(n: usize, radius: f64) -> Array2<c64> {
    let c = (n / 2) as f64;
    Array2::from_shape_fn((n, n), |(i, j)| {
        if (i as f64 - c).hypot(j as f64 - c) <= radius {
            c64::new(1.0, 0.0)
        } else {
            c64::default()
        }
    })
}

#[test]
fn test_w_values() {
    let (w, w_scale) = make_w_values(5, [-1e-4, 1e-4]);
    assert_abs_diff_eq!(w_scale, 16.0 / 2500.0, epsilon = 1e-15);
    assert_eq!(w.len(), 5);
    assert_abs_diff_eq!(w[0], 0.0);
    assert_abs_diff_eq!(w[1], 2500.0 / 16.0, epsilon = 1e-9);
    assert_abs_diff_eq!(w[4], 2500.0, epsilon = 1e-9);

    for n in [0, 1] {
        let (w, w_scale) = make_w_values(n, [1e-4, 1e-4]);
        assert_eq!(w, vec![0.0]);
        assert_abs_diff_eq!(w_scale, 0.0);
    }
}

#[test]
fn test_freq_range_per_spw() {
    let sel = [
        SpwSelection {
            spw: 0,
            chan_freqs_hz: vec![1.0e9, 1.1e9, 1.2e9, 1.3e9],
            selected_channels: vec![1, 3],
        },
        SpwSelection {
            spw: 1,
            chan_freqs_hz: vec![2.0e9, 2.1e9],
            selected_channels: vec![],
        },
    ];
    let ranges = freq_range_per_spw(&sel);
    assert_eq!(ranges, vec![[1.1e9, 1.3e9], [-1.0, -1.0]]);

    let cf = airy(0.0).with_wb_awp(true);
    assert_eq!(cf.make_freq_values(&image(vec![Stokes::I]), &sel), vec![1.3e9]);
    // Nothing selected falls back to the reference frequency.
    assert_eq!(cf.make_freq_values(&image(vec![Stokes::I]), &sel[1..]), vec![FREQ]);
    let cf = airy(0.0);
    assert_eq!(cf.make_freq_values(&image(vec![Stokes::I]), &sel), vec![FREQ]);
}

#[test]
fn test_baseline_list() {
    let list = make_baseline_list(&antennas(&[25.0, 25.0, 12.0]));
    assert_eq!(list.len(), 3);
    assert_eq!(list[0].diameters_m, [25.0, 25.0]);
    assert_eq!(list[1].diameters_m, [25.0, 12.0]);
    assert_eq!(list[2].diameters_m, [12.0, 12.0]);
    assert_eq!(list[1].ant_types, [0, 1]);

    assert_eq!(make_baseline_list(&antennas(&[25.0; 4])).len(), 1);
    assert!(make_baseline_list(&[]).is_empty());
}

#[test]
fn test_cell_coord_sys() {
    let cs = cell_coord_sys(&image(vec![Stokes::I]), CONV_SIZE, SAMPLING).unwrap();
    let dir = cs.direction().unwrap();
    assert_abs_diff_eq!(dir.increment[1], 4e-4, epsilon = 1e-18);
    assert_abs_diff_eq!(dir.increment[0], -4e-4, epsilon = 1e-18);
    assert_eq!(dir.ref_pixel, [32.0, 32.0]);
    assert!(cell_coord_sys(&image(vec![Stokes::I]), 0, SAMPLING).is_err());
}

#[test]
fn test_grid_uv_scale() {
    let (scale, offset) = grid_uv_scale(&image(vec![Stokes::I]));
    assert_abs_diff_eq!(scale[0], 64.0 * 1e-4, epsilon = 1e-15);
    assert_abs_diff_eq!(scale[1], 64.0 * 1e-4, epsilon = 1e-15);
    assert_eq!(offset, [32.0, 32.0]);
}

#[test]
fn test_guard_band_is_truncated() {
    let mut func = disc(64, 10.0);
    let params = SupportParams {
        guard_factor: 1.4,
        ..Default::default()
    };
    let support = resize_cf(&mut func, 4.0, None, &params).unwrap();
    assert_eq!(support, [4, 4]);
    // 1.4 * 4 = 5.6 becomes a guard of 5 pixels.
    assert_eq!(func.dim(), (43, 43));
}

#[test]
fn test_aw_find_support_of_a_disc() {
    let r = aw_find_support(disc(64, 10.0).view(), 1e-3, 32).unwrap();
    assert!((10..=11).contains(&r), "radius was {r}");
    assert!(aw_find_support(Array2::zeros((64, 64)).view(), 0.0, 32).is_none());
}

#[test]
fn test_set_up_cf_support() {
    let params = SupportParams::default();
    let support = set_up_cf_support(disc(64, 10.0).view(), 4.0, None, &params).unwrap();
    assert_eq!(support, [4, 4]);

    // Too big for the buffer; limited to N/2.
    let support = set_up_cf_support(disc(64, 30.0).view(), 4.0, None, &params).unwrap();
    assert_eq!(support, [8, 8]);

    let result = set_up_cf_support(Array2::zeros((64, 64)).view(), 4.0, None, &params);
    assert!(matches!(result, Err(AwConvFuncError::ZeroSupport { .. })));
}

#[test]
fn test_resize_cf() {
    let mut func = disc(64, 10.0);
    let support = resize_cf(&mut func, 4.0, None, &SupportParams::default()).unwrap();
    assert_eq!(support, [4, 4]);
    // 4 * 4 support pixels and a guard of 6 either side of the centre.
    assert_eq!(func.dim(), (45, 45));
    assert_abs_diff_eq!(func[(22, 22)].re, 1.0);
    assert_abs_diff_eq!(func[(0, 0)].re, 0.0);
}

#[test]
fn test_cf_area() {
    let mut func = disc(64, 12.0);
    func[(32, 32)] = c64::new(2.0, 0.0);
    // 4x4 samples every 4 pixels around the peak, all inside the disc.
    assert_abs_diff_eq!(cf_area(func.view(), [2, 2], 4.0), 17.0);
}

#[test]
fn test_single_correlation_makes_one_kernel() {
    let mut cf = airy(0.0);
    let (sig, wt) = make(&mut cf, &[25.0, 25.0, 25.0], true).unwrap();
    assert_eq!(sig.shape(), [1, 1]);
    assert_eq!(wt.shape(), [1, 1]);

    let cfb = sig.get_cf_buffer_by_index([0, 0]).unwrap().unwrap();
    assert_eq!(cfb.shape(), [1, 1, 1]);
    assert_eq!(cfb.mueller_values(), &[0]);
    let cell = cfb.get_cell([0, 0, 0]).unwrap();
    assert!(cell.is_filled());
    assert_abs_diff_eq!(cell.info.freq_hz, FREQ);
    assert_abs_diff_eq!(cell.info.conj_freq_hz, FREQ, epsilon = 1e-3);
    assert_eq!(cell.info.conj_pol, Some(Stokes::LL));
    assert_eq!(cell.info.telescope_name, "VLA");
    assert!(cell.info.is_rotationally_symmetric);

    let support = cell.info.support[0];
    assert!(support > 0);
    assert!(support * SAMPLING <= CONV_SIZE / 2);
    let guard = 6;
    let expected = (2 * (SAMPLING * support + guard) + 1).min(CONV_SIZE);
    assert_eq!(cell.info.shape, Some([expected, expected]));

    // The uv increment belongs to the untrimmed buffer.
    let uv = cell.info.coords.as_ref().unwrap().uv().unwrap();
    assert_abs_diff_eq!(uv.increment[1], 1.0 / (64.0 * 4e-4), epsilon = 1e-9);
}

#[test]
fn test_peak_times_area_norm_is_one() {
    let mut cf = airy(0.0);
    let (sig, wt) = make(&mut cf, &[25.0, 25.0], true).unwrap();
    for store in [&sig, &wt] {
        let cfb = store.get_cf_buffer_by_index([0, 0]).unwrap().unwrap();
        let cell = cfb.get_cell([0, 0, 0]).unwrap();
        let pixels = cell.pixels.as_ref().unwrap();
        let (ndx, p) = peak(pixels.view());
        assert_eq!(ndx, (pixels.dim().0 / 2, pixels.dim().1 / 2));
        assert_abs_diff_eq!(p.norm() * cell.info.area_norm, 1.0, epsilon = 1e-9);
        assert!(cell.info.area_norm > 1.0);
    }

    // The weight is a wider kernel than the signal.
    let support = |s: &CfStore2| {
        let cfb = s.get_cf_buffer_by_index([0, 0]).unwrap().unwrap();
        cfb.get_cell([0, 0, 0]).unwrap().info.support[0]
    };
    assert!(support(&wt) >= support(&sig));
}

#[test]
fn test_support_is_independent_of_oversampling() {
    let mut coarse = airy(0.0);
    let mut fine = AwConvFunc::new(
        AiryDishATerm::new("VLA", 2 * CONV_SIZE, 2 * SAMPLING),
        ProlateSpheroidal::new(),
        WTerm,
    );
    let (coarse, _) = make(&mut coarse, &[25.0, 25.0], true).unwrap();
    let (fine, _) = make(&mut fine, &[25.0, 25.0], true).unwrap();
    let support = |s: &CfStore2| {
        let cfb = s.get_cf_buffer_by_index([0, 0]).unwrap().unwrap();
        cfb.get_cell([0, 0, 0]).unwrap().info.support[0] as isize
    };
    assert!((support(&coarse) - support(&fine)).abs() <= 1);
}

#[test]
fn test_dry_run_then_fill_matches_a_direct_fill() {
    let tmp = TempDir::new().unwrap();
    let mut dry = airy(0.0).with_cache_dir(Some(tmp.path().to_path_buf()));
    let (sig, _) = make(&mut dry, &[25.0, 25.0], false).unwrap();
    let cfb = sig.get_cf_buffer_by_index([0, 0]).unwrap().unwrap();
    let cell = cfb.get_cell([0, 0, 0]).unwrap();
    assert!(!cell.is_empty());
    assert!(!cell.is_filled());
    assert_eq!(cell.info.shape, Some([CONV_SIZE, CONV_SIZE]));
    assert_eq!(cell.info.support, [CONV_SIZE / (2 * SAMPLING); 2]);
    assert!(CfStore2::exists(tmp.path(), ""));
    assert!(CfStore2::exists(tmp.path(), WEIGHT_QUALIFIER));

    let (filled, filled_wt) = make_conv_function2(
        tmp.path(),
        [1.0, 1.0],
        [0.0, 0.0],
        &DishTermFactory::default(),
        &SupportParams::default(),
    )
    .unwrap();

    let mut wet = airy(0.0);
    let (direct, direct_wt) = make(&mut wet, &[25.0, 25.0], true).unwrap();
    for (a, b) in [(&filled, &direct), (&filled_wt, &direct_wt)] {
        let a = a.get_cf_buffer_by_index([0, 0]).unwrap().unwrap();
        let b = b.get_cf_buffer_by_index([0, 0]).unwrap().unwrap();
        let a = a.get_cell([0, 0, 0]).unwrap();
        let b = b.get_cell([0, 0, 0]).unwrap();
        assert_eq!(a.info.support, b.info.support);
        assert_eq!(a.info.shape, b.info.shape);
        assert_abs_diff_eq!(a.info.area_norm, b.info.area_norm, epsilon = 1e-9);
        let (pa, pb) = (a.pixels.as_ref().unwrap(), b.pixels.as_ref().unwrap());
        for (x, y) in pa.iter().zip(pb.iter()) {
            assert_abs_diff_eq!(x.re, y.re, epsilon = 1e-12);
            assert_abs_diff_eq!(x.im, y.im, epsilon = 1e-12);
        }
    }

    // The filled cache was written back.
    let reloaded = CfStore2::load(tmp.path(), "", true).unwrap();
    let cfb = reloaded.get_cf_buffer_by_index([0, 0]).unwrap().unwrap();
    assert!(cfb.get_cell([0, 0, 0]).unwrap().is_filled());
}

#[test]
fn test_rotation_follows_the_parallactic_angle() {
    let mut cf = airy(1e-3);
    let (mut sig, _) = make(&mut cf, &[25.0, 25.0], true).unwrap();
    let baseline = sig.baseline_types()[0];
    let snapshot = sig.get_cf_buffer(0.0, &baseline).unwrap();
    let before = snapshot.get_cell([0, 0, 0]).unwrap().pixels.clone().unwrap();

    let n = cf.prepare_conv_function(&vb(&[25.0, 25.0], 0.5), &mut sig).unwrap();
    assert_eq!(n, 1);
    let rotated = sig.get_cf_buffer(0.5, &baseline).unwrap();
    let cell = rotated.get_cell([0, 0, 0]).unwrap();
    assert_abs_diff_eq!(cell.current_pa(), 0.5);
    assert_abs_diff_eq!(cell.info.pa_rad, 0.0);
    // Whoever held the bucket still sees the kernel as it was.
    assert_eq!(snapshot.get_cell([0, 0, 0]).unwrap().pixels.as_ref(), Some(&before));

    // A change smaller than the rotation step does nothing.
    let n = cf.prepare_conv_function(&vb(&[25.0, 25.0], 0.51), &mut sig).unwrap();
    assert_eq!(n, 0);
}

#[test]
fn test_rotated_kernel_matches_one_made_at_the_new_angle() {
    let mut cf = airy(1e-2);
    let (mut sig, _) = make(&mut cf, &[25.0, 25.0], true).unwrap();
    let (direct, _) = make_with(
        &mut cf,
        &[25.0, 25.0],
        0.5,
        1,
        &rr_diagonal(),
        vec![Stokes::I],
        &[],
        true,
    )
    .unwrap();
    let want = first_kernel(&direct);
    let unrotated = summed_diff(&first_kernel(&sig), &want);
    assert!(unrotated > 0.0);

    assert_eq!(cf.prepare_conv_function(&vb(&[25.0, 25.0], 0.5), &mut sig).unwrap(), 1);
    let rotated = summed_diff(&first_kernel(&sig), &want);
    assert!(
        rotated < 0.5 * unrotated,
        "rotated kernel is {rotated} from the direct one; unrotated is {unrotated}"
    );
}

#[test]
fn test_antenna_order_does_not_make_new_baseline_types() {
    let mut cf = airy(0.0);
    let (mut sig, mut wt) = new_stores();
    for diameters in [[25.0, 12.0], [12.0, 25.0]] {
        cf.make_conv_function(
            &image(vec![Stokes::I]),
            &vb(&diameters, 0.0),
            1,
            &rr_diagonal(),
            0.0,
            DEFAULT_PA_STEP_DEG.to_radians(),
            [1.0, 1.0],
            [0.0, 0.0],
            &[],
            &mut sig,
            &mut wt,
            false,
        )
        .unwrap();
        assert_eq!(sig.shape(), [1, 3]);
        assert_eq!(wt.shape(), [1, 3]);
    }
    let types: Vec<[f64; 2]> = sig.baseline_types().iter().map(|b| b.diameters_m).collect();
    assert_eq!(types, vec![[25.0, 25.0], [25.0, 12.0], [12.0, 12.0]]);
}

#[test]
fn test_w_planes_share_the_first_plane_normalisation() {
    let mut cf = airy(0.0).with_wb_awp(true);
    let pop = PolOuterProduct::new(&[Stokes::RR, Stokes::LL], PolOuterProductKind::Full).unwrap();
    let (sig, wt) = make_with(
        &mut cf,
        &[25.0, 25.0],
        0.0,
        5,
        &pop,
        vec![Stokes::I, Stokes::V],
        &two_spws(),
        true,
    )
    .unwrap();
    assert_eq!(sig.shape(), [1, 1]);
    let cfb = sig.get_cf_buffer_by_index([0, 0]).unwrap().unwrap();
    let wtb = wt.get_cf_buffer_by_index([0, 0]).unwrap().unwrap();
    // One kernel per frequency, w-plane and Mueller element of the single
    // baseline type.
    assert_eq!(cfb.shape(), [2, 5, 8]);
    assert_eq!(cfb.freq_values(), &[1.3e9, 1.5e9]);
    for b in [cfb, wtb] {
        assert_eq!(b.cells().filter(|(_, c)| c.is_filled()).count(), 2 * 5 * 8);
    }

    for i_freq in 0..2 {
        for i_mueller in 0..8 {
            let sig0 = cfb.get_cell([i_freq, 0, i_mueller]).unwrap();
            let wt0 = wtb.get_cell([i_freq, 0, i_mueller]).unwrap();
            for i_w in 1..5 {
                let s = cfb.get_cell([i_freq, i_w, i_mueller]).unwrap();
                let w = wtb.get_cell([i_freq, i_w, i_mueller]).unwrap();
                assert_abs_diff_eq!(s.info.area_norm, sig0.info.area_norm, epsilon = 0.0);
                assert_abs_diff_eq!(w.info.area_norm, wt0.info.area_norm, epsilon = 0.0);
                // Only the signal sees the w-term.
                assert_eq!(w.pixels, wt0.pixels);
                assert_ne!(s.pixels, sig0.pixels);
            }
        }
    }
}

#[test]
fn test_taper_only_weight_to_signal_area_is_constant() {
    let mut cf = AwConvFunc::new(
        NoATerm::new("VLA", CONV_SIZE, SAMPLING),
        ProlateSpheroidal::new(),
        NoWTerm,
    )
    .with_wb_awp(true);
    let pop = PolOuterProduct::new(&[Stokes::RR, Stokes::LL], PolOuterProductKind::Diagonal)
        .unwrap();
    let (sig, wt) = make_with(
        &mut cf,
        &[25.0, 25.0],
        0.0,
        3,
        &pop,
        vec![Stokes::I, Stokes::V],
        &two_spws(),
        true,
    )
    .unwrap();
    let cfb = sig.get_cf_buffer_by_index([0, 0]).unwrap().unwrap();
    let wtb = wt.get_cf_buffer_by_index([0, 0]).unwrap().unwrap();

    let ratios: Vec<f64> = cfb
        .cells()
        .zip(wtb.cells())
        .map(|((_, s), (_, w))| w.info.area_norm / s.info.area_norm)
        .collect();
    assert_eq!(ratios.len(), 2 * 3 * 2);
    for r in &ratios {
        assert_abs_diff_eq!(*r, ratios[0], epsilon = 1e-12);
    }

    // The squared taper transforms to a kernel at least as wide.
    let s = cfb.get_cell([0, 0, 0]).unwrap();
    let w = wtb.get_cell([0, 0, 0]).unwrap();
    assert!(w.info.support[0] >= s.info.support[0]);
    // Nothing but the taper, so every kernel is the same.
    for (_, c) in cfb.cells() {
        assert_eq!(c.pixels, s.pixels);
    }
}

#[test]
fn test_fill_reuses_the_norms_of_a_filled_first_plane() {
    let tmp = TempDir::new().unwrap();
    let mut dry = airy(0.0).with_cache_dir(Some(tmp.path().to_path_buf()));
    make_with(&mut dry, &[25.0, 25.0], 0.0, 3, &rr_diagonal(), vec![Stokes::I], &[], false)
        .unwrap();
    let mut wet = airy(0.0);
    let (direct, direct_wt) =
        make_with(&mut wet, &[25.0, 25.0], 0.0, 3, &rr_diagonal(), vec![Stokes::I], &[], true)
            .unwrap();

    // Only the first w-plane of the cache has pixels.
    for (qualifier, source) in [("", &direct), (WEIGHT_QUALIFIER, &direct_wt)] {
        let mut store = CfStore2::load(tmp.path(), qualifier, true).unwrap();
        let cell = source
            .get_cf_buffer_by_index([0, 0])
            .unwrap()
            .unwrap()
            .get_cell([0, 0, 0])
            .unwrap()
            .as_ref()
            .clone();
        let b = store.get_cf_buffer_mut([0, 0]).unwrap().unwrap();
        b.set_cell([0, 0, 0], cell).unwrap();
        store.make_persistent(tmp.path(), qualifier).unwrap();
    }

    let (filled, filled_wt) = make_conv_function2(
        tmp.path(),
        [1.0, 1.0],
        [0.0, 0.0],
        &DishTermFactory::default(),
        &SupportParams::default(),
    )
    .unwrap();
    for (a, b) in [(&filled, &direct), (&filled_wt, &direct_wt)] {
        let a = a.get_cf_buffer_by_index([0, 0]).unwrap().unwrap();
        let b = b.get_cf_buffer_by_index([0, 0]).unwrap().unwrap();
        let w0_norm = a.get_cell([0, 0, 0]).unwrap().info.area_norm;
        for i_w in 1..3 {
            let ca = a.get_cell([0, i_w, 0]).unwrap();
            let cb = b.get_cell([0, i_w, 0]).unwrap();
            assert!(ca.is_filled());
            assert_abs_diff_eq!(ca.info.area_norm, w0_norm, epsilon = 0.0);
            assert_abs_diff_eq!(ca.info.area_norm, cb.info.area_norm, epsilon = 1e-12);
            let (pa, pb) = (ca.pixels.as_ref().unwrap(), cb.pixels.as_ref().unwrap());
            assert!(summed_diff(pa, pb) < 1e-9);
        }
    }
}

#[test]
fn test_non_conformant_polarisation_is_an_error() {
    let mut cf = airy(0.0);
    let (mut sig, mut wt) = new_stores();
    let result = cf.make_conv_function(
        &image(vec![Stokes::I, Stokes::V]),
        &vb(&[25.0, 25.0], 0.0),
        1,
        &rr_diagonal(),
        0.0,
        DEFAULT_PA_STEP_DEG.to_radians(),
        [1.0, 1.0],
        [0.0, 0.0],
        &[],
        &mut sig,
        &mut wt,
        true,
    );
    assert!(matches!(
        result,
        Err(AwConvFuncError::Pol(PolError::NonConformant { rows: 1, sky: 2 }))
    ));
    assert!(sig.is_empty());
}

#[test]
fn test_failed_fill_leaves_the_stores_alone() {
    let mut cf = airy(0.0);
    let result = make(&mut cf, &[0.0, 0.0], true);
    assert!(matches!(
        result,
        Err(AwConvFuncError::Term(TermError::BadDiameter(_)))
    ));

    let (mut sig, mut wt) = new_stores();
    let _ = cf.make_conv_function(
        &image(vec![Stokes::I]),
        &vb(&[0.0, 0.0], 0.0),
        1,
        &rr_diagonal(),
        0.0,
        DEFAULT_PA_STEP_DEG.to_radians(),
        [1.0, 1.0],
        [0.0, 0.0],
        &[],
        &mut sig,
        &mut wt,
        true,
    );
    assert!(sig.is_empty());
    assert!(wt.is_empty());
}

#[test]
fn test_bad_conv_size() {
    let mut cf = AwConvFunc::new(
        AiryDishATerm::new("VLA", 2, 4),
        ProlateSpheroidal::new(),
        WTerm,
    );
    assert!(matches!(
        make(&mut cf, &[25.0, 25.0], true),
        Err(AwConvFuncError::BadConvSize { .. })
    ));
}

#[test]
fn test_no_antennas() {
    let mut cf = airy(0.0);
    assert!(matches!(
        make(&mut cf, &[], true),
        Err(AwConvFuncError::NoAntennas)
    ));
}

#[test]
fn test_average_response() {
    let cf = airy(0.0);
    let image = image(vec![Stokes::I]);
    let mut pb = cf.make_average_response(&vb(&[25.0, 25.0], 0.0), &image).unwrap();
    assert_eq!(pb.dim(), (1, 64, 64));
    assert_abs_diff_eq!(pb[(0, 32, 32)].re, 1.0, epsilon = 1e-12);
    assert!(pb[(0, 40, 32)].re < 1.0);

    let avg = normalize_avg_pb(&mut pb);
    assert_abs_diff_eq!(avg[(0, 32, 32)], 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(avg[(0, 40, 32)], pb[(0, 40, 32)].norm(), epsilon = 1e-12);
}

#[test]
fn test_normalize_avg_pb() {
    let mut pb = Array3::from_elem((2, 3, 3), c64::new(1.0, 0.0));
    pb[(0, 1, 1)] = c64::new(2.0, 0.0);
    pb[(1, 1, 1)] = c64::new(4.0, 0.0);
    pb[(1, 0, 0)] = c64::new(2.0, 0.0);
    let avg = normalize_avg_pb(&mut pb);
    assert_eq!(avg.dim(), (2, 3, 3));
    assert_abs_diff_eq!(avg[(0, 1, 1)], 1.0);
    assert_abs_diff_eq!(avg[(1, 1, 1)], 1.0);
    // 1/2 and 2/4.
    assert_abs_diff_eq!(avg[(0, 0, 0)], 0.5, epsilon = 1e-15);
    // 1/2 and 1/4.
    assert_abs_diff_eq!(avg[(1, 0, 1)], (0.125_f64).sqrt(), epsilon = 1e-15);
}

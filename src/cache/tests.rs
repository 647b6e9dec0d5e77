// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use tempfile::TempDir;

use super::*;
use crate::{
    coord::{CoordinateSystem, Stokes},
    pol::PolOuterProductKind,
    terms::{AiryDishATerm, ProlateSpheroidal, WTerm},
    vis::{AntennaInfo, VisBufferSummary},
};

type AiryConvFunc = AwConvFunc<AiryDishATerm, ProlateSpheroidal, WTerm>;

fn image() -> ImageGeometry {
    ImageGeometry {
        coords: CoordinateSystem::new_sky([0.0, 0.5], 1e-4, 64, 64, 1.4e9, 1e6, vec![Stokes::I]),
        shape: [64, 64],
    }
}

fn vb(pa_rad: f64) -> VisBufferSummary {
    let antennas = (0..3)
        .map(|i| AntennaInfo {
            name: format!("ea{i:02}"),
            diameter_m: 25.0,
        })
        .collect();
    VisBufferSummary::all_baselines("VLA", antennas, vec![1.4e9], pa_rad)
}

fn plan() -> CachePlan {
    CachePlan {
        w_conv_size: 1,
        pop: PolOuterProduct::new(&[Stokes::RR], PolOuterProductKind::Diagonal).unwrap(),
        uv_scale: [1.0, 1.0],
        uv_offset: [0.0, 0.0],
        freq_selection: vec![],
        fill: true,
    }
}

fn airy(conv_size: usize) -> AiryConvFunc {
    AwConvFunc::new(
        AiryDishATerm::new("VLA", conv_size, 4).with_squint(1e-3),
        ProlateSpheroidal::new(),
        WTerm,
    )
}

#[test]
fn test_pa_change_detector() {
    let mut d = ParAngleChangeDetector::new(0.1);
    assert!(d.changed(0.0));
    assert!(!d.changed(0.05));
    assert!(!d.changed(-0.1));
    assert!(d.changed(0.15));
    // Measured from the last change, not the last call.
    assert!(!d.changed(0.2));
    d.reset();
    assert!(d.changed(0.2));
}

#[test]
fn test_find_makes_then_reuses() {
    let mut cache = CfCache::new(360_f64.to_radians(), 5_f64.to_radians(), plan());
    let mut cf = airy(64);
    assert_eq!(cache.mem_usage().unwrap(), 0);

    let found = cache.find_conv_function(&mut cf, &image(), &vb(0.0)).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].baseline.diameters_m, [25.0, 25.0]);
    assert!(found[0].signal.get_cell([0, 0, 0]).unwrap().is_filled());
    assert!(found[0].weight.get_cell([0, 0, 0]).unwrap().is_filled());
    assert!(cache.mem_usage().unwrap() > 0);

    // A small change gets the same kernels back.
    let again = cache.find_conv_function(&mut cf, &image(), &vb(0.01)).unwrap();
    assert!(Arc::ptr_eq(&found[0].signal, &again[0].signal));
    assert_eq!(cache.signal().read().unwrap().shape(), [1, 1]);
}

#[test]
fn test_find_rotates_within_a_bucket() {
    let mut cache = CfCache::new(360_f64.to_radians(), 5_f64.to_radians(), plan());
    let mut cf = airy(64);
    let first = cache.find_conv_function(&mut cf, &image(), &vb(0.0)).unwrap();

    let turned = cache.find_conv_function(&mut cf, &image(), &vb(0.5)).unwrap();
    // Still one row of buckets; the kernels were rotated rather than remade.
    assert_eq!(cache.signal().read().unwrap().shape(), [1, 1]);
    let cell = turned[0].signal.get_cell([0, 0, 0]).unwrap();
    assert_abs_diff_eq!(cell.current_pa(), 0.5);
    assert_abs_diff_eq!(turned[0].weight.get_cell([0, 0, 0]).unwrap().current_pa(), 0.5);
    // The first snapshot is untouched.
    assert_abs_diff_eq!(first[0].signal.get_cell([0, 0, 0]).unwrap().current_pa(), 0.0);
}

#[test]
fn test_find_makes_a_new_row() {
    let mut cache = CfCache::new(10_f64.to_radians(), 5_f64.to_radians(), plan());
    let mut cf = airy(64);
    cache.find_conv_function(&mut cf, &image(), &vb(0.0)).unwrap();
    cache.find_conv_function(&mut cf, &image(), &vb(1.0)).unwrap();
    assert_eq!(cache.signal().read().unwrap().shape(), [2, 1]);
    assert_eq!(cache.weight().read().unwrap().shape(), [2, 1]);

    cache.invalidate().unwrap();
    assert_eq!(cache.signal().read().unwrap().shape(), [0, 0]);
    assert_eq!(cache.mem_usage().unwrap(), 0);
}

#[test]
fn test_open_uses_what_is_on_disk() {
    let tmp = TempDir::new().unwrap();
    let mut writer = airy(64).with_cache_dir(Some(tmp.path().to_path_buf()));
    let mut cache = CfCache::new(360_f64.to_radians(), 5_f64.to_radians(), plan());
    let made = cache.find_conv_function(&mut writer, &image(), &vb(0.0)).unwrap();

    let mut cache =
        CfCache::open(tmp.path(), 360_f64.to_radians(), 5_f64.to_radians(), plan()).unwrap();
    // This maker can't make anything, so the kernels must have come from disk.
    let mut broken = airy(2);
    let found = cache.find_conv_function(&mut broken, &image(), &vb(0.0)).unwrap();
    let a = made[0].signal.get_cell([0, 0, 0]).unwrap();
    let b = found[0].signal.get_cell([0, 0, 0]).unwrap();
    assert_eq!(a.info, b.info);
    assert_eq!(a.pixels, b.pixels);

    // An empty directory is an empty cache.
    let empty = TempDir::new().unwrap();
    let cache = CfCache::open(empty.path(), 1.0, 0.1, plan()).unwrap();
    assert!(cache.signal().read().unwrap().is_empty());
}

#[test]
fn test_find_without_antennas() {
    let mut cache = CfCache::new(1.0, 0.1, plan());
    let mut cf = airy(64);
    let no_ants = VisBufferSummary::all_baselines("VLA", vec![], vec![1.4e9], 0.0);
    assert!(matches!(
        cache.find_conv_function(&mut cf, &image(), &no_ants),
        Err(CacheError::AwConvFunc(AwConvFuncError::NoAntennas))
    ));
}

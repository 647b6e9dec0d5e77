// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Finding how far a kernel extends, trimming it to that extent, and
//! measuring its area.

use log::{trace, warn};
use ndarray::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::AwConvFuncError;
use crate::{
    c64,
    constants::{
        DEFAULT_SUPPORT_GUARD_FACTOR, DEFAULT_SUPPORT_THRESHOLD, SUPPORT_SEARCH_RESERVED_THREADS,
        TAU,
    },
    math::peak,
};

/// The tunables of support determination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportParams {
    /// Kernel samples smaller than this fraction of the peak are outside the
    /// support.
    pub threshold: f64,

    /// The guard band left either side of the support when trimming, in units
    /// of the oversampling factor. The band is truncated to whole pixels.
    pub guard_factor: f64,
}

impl Default for SupportParams {
    fn default() -> Self {
        SupportParams {
            threshold: DEFAULT_SUPPORT_THRESHOLD,
            guard_factor: DEFAULT_SUPPORT_GUARD_FACTOR,
        }
    }
}

/// Does any sample on the circle of radius `r` about (`origin`, `origin`)
/// exceed `threshold`? The circle is sampled about once per pixel of arc.
fn ring_exceeds(func: ArrayView2<c64>, origin: usize, r: usize, threshold: f64) -> bool {
    let (nx, ny) = func.dim();
    let n_steps = (TAU * r as f64).ceil().max(1.0) as usize;
    (0..n_steps).any(|step| {
        let (s, c) = (TAU * step as f64 / n_steps as f64).sin_cos();
        let x = origin as f64 + r as f64 * s;
        let y = origin as f64 + r as f64 * c;
        if x < 0.0 || y < 0.0 {
            return false;
        }
        let (x, y) = (x as usize, y as usize);
        x < nx && y < ny && func[(x, y)].norm() > threshold
    })
}

/// Find the outermost radius \[pixels\] at which `func` has a sample above
/// `threshold`. Radii are scanned inwards from `N/2 - 2` in bands, each band
/// spread over the rayon thread pool. `None` if nothing is above the
/// threshold.
pub fn aw_find_support(func: ArrayView2<c64>, threshold: f64, origin: usize) -> Option<usize> {
    let band = rayon::current_num_threads()
        .saturating_sub(SUPPORT_SEARCH_RESERVED_THREADS)
        .max(1);
    let mut r1 = (func.dim().0 / 2).saturating_sub(2);
    while r1 > 1 {
        let r0 = r1;
        r1 = r1.saturating_sub(band);
        let found = (r1 + 1..=r0)
            .into_par_iter()
            .filter(|&r| ring_exceeds(func, origin, r, threshold))
            .max();
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Work out the support \[pixels of the target grid\] of an oversampled
/// kernel. The threshold is relative to `peak` if it's given and non-zero,
/// otherwise to the centre pixel.
pub fn set_up_cf_support(
    func: ArrayView2<c64>,
    sampling: f64,
    peak: Option<c64>,
    params: &SupportParams,
) -> Result<[usize; 2], AwConvFuncError> {
    let origin = func.dim().0 / 2;
    let reference = match peak {
        Some(p) if p.norm() != 0.0 => p.norm(),
        _ => func[(origin, origin)].norm(),
    };
    let threshold = reference * params.threshold;

    let mut support = match aw_find_support(func, threshold, origin) {
        Some(r) => (0.5 + r as f64 / sampling) as usize + 1,
        None => 0,
    };
    if support as f64 * sampling > origin as f64 {
        warn!("Convolution function support size > N/2. Limiting it to N/2, but this should be considered a bug (threshold = {threshold})");
        support = (origin as f64 / sampling) as usize;
    }
    if support < 1 {
        return Err(AwConvFuncError::ZeroSupport { threshold });
    }
    Ok([support, support])
}

/// Find the support of `func` and cut it down to the support plus a guard
/// band. The array is replaced, so its shape changes.
pub fn resize_cf(
    func: &mut Array2<c64>,
    sampling: f64,
    peak: Option<c64>,
    params: &SupportParams,
) -> Result<[usize; 2], AwConvFuncError> {
    let support = set_up_cf_support(func.view(), sampling, peak, params)?;
    let n = func.dim().0;
    let origin = (n / 2) as f64;
    let guard = (sampling * params.guard_factor) as usize as f64;
    let half = sampling * support[0] as f64 + guard;
    let bot = ((origin - half) as isize).max(0) as usize;
    let top = ((origin + half) as usize).min(n - 1);
    trace!("Trimming a {n}x{n} kernel to [{bot}, {top}]");
    *func = func.slice(s![bot..=top, bot..=top]).to_owned();
    Ok(support)
}

/// The sum of the real parts of `cf` sampled every `sampling` pixels within
/// `support` grid pixels of its peak.
pub fn cf_area(cf: ArrayView2<c64>, support: [usize; 2], sampling: f64) -> f64 {
    let (nx, ny) = cf.dim();
    let ((px, py), _) = peak(cf);
    let step = sampling as isize;
    let [sx, sy] = [support[0] as isize, support[1] as isize];
    let mut area = 0.0;
    for ix in -sx..sx {
        let x = px as isize + ix * step;
        if x < 0 || x as usize >= nx {
            continue;
        }
        for iy in -sy..sy {
            let y = py as isize + iy * step;
            if y < 0 || y as usize >= ny {
                continue;
            }
            area += cf[(x as usize, y as usize)].re;
        }
    }
    area
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use ndarray::prelude::*;

use super::WTermLike;
use crate::{c64, constants::TAU, math::cexp};

/// The w-projection phase screen `exp(2 pi i w (n - 1))`, where
/// `n = sqrt(1 - l^2 - m^2)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WTerm;

impl WTermLike for WTerm {
    fn name(&self) -> &'static str {
        "WTerm"
    }

    fn apply_sky(&self, mut buf: ArrayViewMut2<c64>, w: f64, cell_size: [f64; 2], inner: usize) {
        if w == 0.0 {
            return;
        }
        let (nx, ny) = buf.dim();
        let half = (inner / 2) as isize;
        let two_pi_w = TAU * w;
        for iy in -half..half {
            let y = (ny / 2) as isize + iy;
            if y < 0 || y as usize >= ny {
                continue;
            }
            let m = cell_size[1] * iy as f64;
            let m2 = m * m;
            for ix in -half..half {
                let x = (nx / 2) as isize + ix;
                if x < 0 || x as usize >= nx {
                    continue;
                }
                let l = cell_size[0] * ix as f64;
                let r2 = l * l + m2;
                if r2 < 1.0 {
                    let phase = two_pi_w * ((1.0 - r2).sqrt() - 1.0);
                    buf[(x as usize, y as usize)] *= cexp(phase);
                }
            }
        }
    }
}

/// No w projection.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NoWTerm;

impl WTermLike for NoWTerm {
    fn name(&self) -> &'static str {
        "NoWTerm"
    }

    fn apply_sky(&self, _: ArrayViewMut2<c64>, _: f64, _: [f64; 2], _: usize) {}
}

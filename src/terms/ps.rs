// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use log::trace;
use ndarray::prelude::*;

use super::PsTermLike;
use crate::{c64, math::spheroidal};

/// A separable prolate-spheroidal taper. It is defined on kernel pixels, so
/// the grid's uv scale and offset don't change it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProlateSpheroidal {
    inner: usize,
    ps_scale: f64,
}

impl ProlateSpheroidal {
    pub fn new() -> ProlateSpheroidal {
        ProlateSpheroidal::default()
    }

    pub fn inner(&self) -> usize {
        self.inner
    }

    pub fn ps_scale(&self) -> f64 {
        self.ps_scale
    }

    /// The taper's value at a pixel offset `(dx, dy)` from the centre.
    pub fn value(&self, dx: f64, dy: f64) -> f64 {
        spheroidal(dx * self.ps_scale) * spheroidal(dy * self.ps_scale)
    }
}

impl PsTermLike for ProlateSpheroidal {
    fn name(&self) -> &'static str {
        "ProlateSpheroidal"
    }

    fn init(&mut self, inner: usize, uv_scale: [f64; 2], uv_offset: [f64; 2], ps_scale: f64) {
        trace!("PS term: inner = {inner}, uv scale = {uv_scale:?}, uv offset = {uv_offset:?}, ps scale = {ps_scale}");
        self.inner = inner;
        self.ps_scale = ps_scale;
    }

    fn apply_sky(&self, mut buf: ArrayViewMut2<c64>, multiply: bool) {
        let (nx, ny) = buf.dim();
        let cx = (nx / 2) as f64;
        let cy = (ny / 2) as f64;
        // Separable, so compute each axis once.
        let tx: Vec<f64> = (0..nx)
            .map(|i| spheroidal((i as f64 - cx) * self.ps_scale))
            .collect();
        let ty: Vec<f64> = (0..ny)
            .map(|j| spheroidal((j as f64 - cy) * self.ps_scale))
            .collect();
        buf.indexed_iter_mut().for_each(|((i, j), v)| {
            let t = tx[i] * ty[j];
            if multiply {
                *v *= t;
            } else {
                *v = c64::new(t, 0.0);
            }
        });
    }
}

/// No anti-aliasing taper. Assigning writes ones; multiplying does nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NoPsTerm;

impl PsTermLike for NoPsTerm {
    fn name(&self) -> &'static str {
        "NoPsTerm"
    }

    fn init(&mut self, _: usize, _: [f64; 2], _: [f64; 2], _: f64) {}

    fn apply_sky(&self, mut buf: ArrayViewMut2<c64>, multiply: bool) {
        if !multiply {
            buf.fill(c64::new(1.0, 0.0));
        }
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    c64,
    coord::{CoordinateSystem, Stokes},
    vis::BaselineType,
};

/// Everything about a kernel except its pixels. This is what a cache keeps
/// on disk for every cell, filled or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfCellInfo {
    /// The pixel shape of the kernel. `None` until the shape is known.
    pub shape: Option<[usize; 2]>,

    /// Half-width of the kernel \[pixels of the target grid\].
    pub support: [usize; 2],

    /// Oversampling of the kernel relative to the target grid.
    pub sampling: f64,

    /// The Fourier-domain coordinates of the kernel.
    pub coords: Option<CoordinateSystem>,

    pub freq_hz: f64,

    /// \[wavelengths\]
    pub w: f64,

    pub mueller: i32,

    /// The parallactic angle the kernel was computed at \[radians\].
    pub pa_rad: f64,

    /// The frequency the conjugate-polarisation response was evaluated at
    /// \[Hz\].
    pub conj_freq_hz: f64,

    pub conj_pol: Option<Stokes>,

    pub telescope_name: String,

    pub baseline: Option<BaselineType>,

    /// The area normalisation the pixels were divided by. One divided by this
    /// is the peak of the kernel before normalisation by area.
    pub area_norm: f64,

    /// Can this kernel follow a parallactic-angle change by rotation?
    pub is_rotationally_symmetric: bool,
}

impl Default for CfCellInfo {
    fn default() -> Self {
        CfCellInfo {
            shape: None,
            support: [0, 0],
            sampling: 1.0,
            coords: None,
            freq_hz: 0.0,
            w: 0.0,
            mueller: 0,
            pa_rad: 0.0,
            conj_freq_hz: 0.0,
            conj_pol: None,
            telescope_name: String::new(),
            baseline: None,
            area_norm: 1.0,
            is_rotationally_symmetric: false,
        }
    }
}

/// One convolution-function plane.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CfCell {
    pub info: CfCellInfo,

    /// The kernel. `None` for cells that only carry metadata (dry runs, or a
    /// cache loaded without pixels).
    pub pixels: Option<Array2<c64>>,

    /// The kernel as it was computed, kept once it has been rotated so that
    /// rotation errors don't accumulate.
    unrotated: Option<Arc<Array2<c64>>>,

    /// The parallactic angle the pixels currently correspond to, if they've
    /// been rotated away from `info.pa_rad`.
    current_pa_rad: Option<f64>,
}

impl CfCell {
    pub fn new(info: CfCellInfo) -> CfCell {
        CfCell {
            info,
            ..Default::default()
        }
    }

    /// Has anything been put in this cell?
    pub fn is_empty(&self) -> bool {
        self.info.shape.is_none()
    }

    /// Does this cell have pixels?
    pub fn is_filled(&self) -> bool {
        self.pixels.is_some()
    }

    /// Record the pixel shape after the pixels have been (re)placed.
    pub fn init_cache(&mut self) {
        if let Some(p) = &self.pixels {
            let (nx, ny) = p.dim();
            self.info.shape = Some([nx, ny]);
        }
    }

    /// Replace the pixels (and the cached shape).
    pub fn set_pixels(&mut self, pixels: Array2<c64>) {
        self.pixels = Some(pixels);
        self.unrotated = None;
        self.current_pa_rad = None;
        self.init_cache();
    }

    /// The parallactic angle the pixels currently correspond to.
    pub fn current_pa(&self) -> f64 {
        self.current_pa_rad.unwrap_or(self.info.pa_rad)
    }

    /// The kernel as it was computed at `info.pa_rad`, before any rotation.
    pub fn unrotated_pixels(&self) -> Option<&Array2<c64>> {
        self.unrotated.as_deref().or(self.pixels.as_ref())
    }

    /// Rotate the kernel so that it corresponds to the parallactic angle
    /// `pa_rad`. The rotation always starts from the kernel as computed.
    pub fn rotate_to<F>(&mut self, pa_rad: f64, rotate: F)
    where
        F: Fn(ArrayView2<c64>, f64) -> Array2<c64>,
    {
        let base = match (&self.unrotated, self.pixels.take()) {
            (Some(base), _) => Arc::clone(base),
            (None, Some(p)) => Arc::new(p),
            (None, None) => return,
        };
        self.pixels = Some(rotate(base.view(), pa_rad - self.info.pa_rad));
        self.unrotated = Some(base);
        self.current_pa_rad = Some(pa_rad);
    }

    /// Bytes used by the pixels.
    pub fn mem_usage(&self) -> usize {
        let n = self.pixels.as_ref().map(|p| p.len()).unwrap_or(0)
            + self.unrotated.as_ref().map(|p| p.len()).unwrap_or(0);
        n * std::mem::size_of::<c64>()
    }
}

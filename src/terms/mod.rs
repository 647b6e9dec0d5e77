// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The image-domain terms that are multiplied together to make a convolution
//! function.
//!
//! [`PsTermLike`], [`WTermLike`] and [`ATermLike`] abstract over the
//! anti-aliasing taper, the w-projection phase screen and the antenna
//! response. Each has a "no" variant ([`NoPsTerm`], [`NoWTerm`],
//! [`NoATerm`]) so that switching a term off is a choice of type.

mod aterm;
mod error;
mod factory;
mod ps;
mod w;

pub use aterm::{AiryDishATerm, NoATerm};
pub use error::TermError;
pub use factory::{DishTermFactory, TermFactory, TermSet};
pub use ps::{NoPsTerm, ProlateSpheroidal};
pub use w::{NoWTerm, WTerm};

use ndarray::prelude::*;

use crate::{coord::CoordinateSystem, math::rotate_bilinear, pol::PolBasis, vis::BaselineType, c64};

/// Everything an A-term needs to know to evaluate one antenna-pair response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ATermContext {
    pub freq_hz: f64,

    /// \[radians\]
    pub pa_rad: f64,

    /// The Mueller element whose response is wanted.
    pub mueller: i32,

    pub basis: PolBasis,

    pub baseline: BaselineType,

    /// Should the beams of opposite-hand feeds be offset from each other?
    pub do_squint: bool,
}

/// The anti-aliasing taper.
pub trait PsTermLike: Send + Sync {
    fn name(&self) -> &'static str;

    /// Set up for kernels whose sky footprint is `inner` pixels wide. The
    /// taper falls to zero `1 / ps_scale` pixels from the centre. `uv_scale`
    /// and `uv_offset` describe the grid the kernels are used on, for tapers
    /// that depend on it.
    fn init(&mut self, inner: usize, uv_scale: [f64; 2], uv_offset: [f64; 2], ps_scale: f64);

    /// Write the taper into `buf`, or multiply `buf` by it if `multiply` is
    /// true. The taper is centred on pixel `n/2`.
    fn apply_sky(&self, buf: ArrayViewMut2<c64>, multiply: bool);
}

/// The w-projection phase screen.
pub trait WTermLike: Send + Sync {
    fn name(&self) -> &'static str;

    /// Multiply `buf` by the phase screen for `w` \[wavelengths\]. `cell_size`
    /// is the image-domain pixel size of `buf` \[radians\]; only the central
    /// `inner` pixels are touched.
    fn apply_sky(&self, buf: ArrayViewMut2<c64>, w: f64, cell_size: [f64; 2], inner: usize);
}

/// The direction-dependent antenna response.
pub trait ATermLike: Send + Sync {
    /// The name of the telescope this response models.
    fn name(&self) -> &str;

    /// The oversampling factor of kernels made with this term.
    fn oversampling(&self) -> usize;

    /// The size of the image-domain buffers that kernels are made in
    /// \[pixels\].
    fn conv_size(&self) -> usize;

    /// Is the response at any parallactic angle a rotated copy of the
    /// response at another? If so, a change of parallactic angle is followed
    /// by rotating existing kernels with [`ATermLike::rotate`] rather than
    /// remaking them. A response that doesn't depend on the parallactic angle
    /// at all still qualifies; rotating its kernels changes nothing.
    fn is_rotationally_symmetric(&self) -> bool;

    /// Multiply `buf` (with coordinates `cs`) by the response described by
    /// `ctx`.
    fn apply_sky(
        &self,
        buf: ArrayViewMut2<c64>,
        cs: &CoordinateSystem,
        ctx: &ATermContext,
    ) -> Result<(), TermError>;

    /// Produce a copy of `kernel` that follows a parallactic-angle change of
    /// `d_pa_rad`.
    fn rotate(&self, kernel: ArrayView2<c64>, d_pa_rad: f64) -> Array2<c64> {
        // The first pixel axis runs against RA, so the sky turning one way
        // turns the pixels the other.
        rotate_bilinear(kernel, -d_pa_rad)
    }
}

impl<T: PsTermLike + ?Sized> PsTermLike for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn init(&mut self, inner: usize, uv_scale: [f64; 2], uv_offset: [f64; 2], ps_scale: f64) {
        (**self).init(inner, uv_scale, uv_offset, ps_scale)
    }

    fn apply_sky(&self, buf: ArrayViewMut2<c64>, multiply: bool) {
        (**self).apply_sky(buf, multiply)
    }
}

impl<T: WTermLike + ?Sized> WTermLike for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn apply_sky(&self, buf: ArrayViewMut2<c64>, w: f64, cell_size: [f64; 2], inner: usize) {
        (**self).apply_sky(buf, w, cell_size, inner)
    }
}

impl<T: ATermLike + ?Sized> ATermLike for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn oversampling(&self) -> usize {
        (**self).oversampling()
    }

    fn conv_size(&self) -> usize {
        (**self).conv_size()
    }

    fn is_rotationally_symmetric(&self) -> bool {
        (**self).is_rotationally_symmetric()
    }

    fn apply_sky(
        &self,
        buf: ArrayViewMut2<c64>,
        cs: &CoordinateSystem,
        ctx: &ATermContext,
    ) -> Result<(), TermError> {
        (**self).apply_sky(buf, cs, ctx)
    }

    fn rotate(&self, kernel: ArrayView2<c64>, d_pa_rad: f64) -> Array2<c64> {
        (**self).rotate(kernel, d_pa_rad)
    }
}

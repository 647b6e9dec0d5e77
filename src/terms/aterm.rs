// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Antenna responses.

use ndarray::{prelude::*, Zip};

use super::{ATermContext, ATermLike, TermError};
use crate::{
    c64,
    constants::{DEFAULT_FEED_LEAKAGE, PI, VEL_C},
    coord::{CoordinateSystem, Feed},
    math::bessel_j1,
};

/// The response of a uniformly illuminated circular dish: an Airy voltage
/// pattern `2 J1(x) / x` with `x = pi D r nu / c`.
///
/// Circular feeds may be squinted: the R and L beams point `squint / 2` either
/// side of the pointing centre, along a direction that turns with the
/// parallactic angle. Each feed also picks up `leakage` times the response of
/// its partner.
#[derive(Debug, Clone, PartialEq)]
pub struct AiryDishATerm {
    telescope: String,
    conv_size: usize,
    oversampling: usize,
    squint_rad: f64,
    leakage: f64,
}

impl AiryDishATerm {
    pub fn new(telescope: &str, conv_size: usize, oversampling: usize) -> AiryDishATerm {
        AiryDishATerm {
            telescope: telescope.to_string(),
            conv_size,
            oversampling,
            squint_rad: 0.0,
            leakage: DEFAULT_FEED_LEAKAGE,
        }
    }

    pub fn with_squint(mut self, squint_rad: f64) -> AiryDishATerm {
        self.squint_rad = squint_rad;
        self
    }

    pub fn with_leakage(mut self, leakage: f64) -> AiryDishATerm {
        self.leakage = leakage;
        self
    }

    pub fn squint_rad(&self) -> f64 {
        self.squint_rad
    }

    /// The voltage pattern of a dish of diameter `diameter_m` at angular
    /// distance `r_rad` from its pointing centre.
    pub fn voltage(diameter_m: f64, freq_hz: f64, r_rad: f64) -> f64 {
        let x = PI * diameter_m * r_rad * freq_hz / VEL_C;
        if x.abs() < 1e-12 {
            1.0
        } else {
            2.0 * bessel_j1(x) / x
        }
    }

    /// Where the beam of `feed` points, relative to the pointing centre.
    fn feed_offset(&self, feed: Feed, pa_rad: f64, do_squint: bool) -> (f64, f64) {
        if !do_squint || self.squint_rad == 0.0 {
            return (0.0, 0.0);
        }
        let half = 0.5 * self.squint_rad;
        let sign = match feed {
            Feed::R => 1.0,
            Feed::L => -1.0,
            Feed::X | Feed::Y => return (0.0, 0.0),
        };
        let (s, c) = pa_rad.sin_cos();
        (sign * half * c, sign * half * s)
    }

    /// Element `[out][inp]` of an antenna's Jones matrix at `(l, m)`.
    fn jones_element(
        &self,
        diameter_m: f64,
        out: Feed,
        inp: Feed,
        l: f64,
        m: f64,
        ctx: &ATermContext,
    ) -> f64 {
        let (l0, m0) = self.feed_offset(out, ctx.pa_rad, ctx.do_squint);
        let r = ((l - l0).powi(2) + (m - m0).powi(2)).sqrt();
        let v = AiryDishATerm::voltage(diameter_m, ctx.freq_hz, r);
        if out == inp {
            v
        } else {
            self.leakage * v
        }
    }
}

impl ATermLike for AiryDishATerm {
    fn name(&self) -> &str {
        &self.telescope
    }

    fn oversampling(&self) -> usize {
        self.oversampling
    }

    fn conv_size(&self) -> usize {
        self.conv_size
    }

    /// The parallactic angle only turns the squint direction, so the response
    /// at one angle is a rotated copy of the response at another.
    fn is_rotationally_symmetric(&self) -> bool {
        true
    }

    fn apply_sky(
        &self,
        buf: ArrayViewMut2<c64>,
        cs: &CoordinateSystem,
        ctx: &ATermContext,
    ) -> Result<(), TermError> {
        for &d in &ctx.baseline.diameters_m {
            if !(d > 0.0) {
                return Err(TermError::BadDiameter(d));
            }
        }
        if !(ctx.freq_hz > 0.0) {
            return Err(TermError::BadFrequency(ctx.freq_hz));
        }
        let dir = cs.direction()?;
        let ((a, b), (c, d)) = ctx.basis.mueller_feeds(ctx.mueller);
        let [d1, d2] = ctx.baseline.diameters_m;

        Zip::indexed(buf).par_for_each(|(i, j), v| {
            let l = (i as f64 - dir.ref_pixel[0]) * dir.increment[0];
            let m = (j as f64 - dir.ref_pixel[1]) * dir.increment[1];
            let j1 = self.jones_element(d1, a, c, l, m, ctx);
            let j2 = self.jones_element(d2, b, d, l, m, ctx);
            // The voltage patterns are real, so the conjugate of the second
            // antenna's element is itself.
            *v *= j1 * j2;
        });
        Ok(())
    }
}

/// No antenna response; the identity.
#[derive(Debug, Clone, PartialEq)]
pub struct NoATerm {
    telescope: String,
    conv_size: usize,
    oversampling: usize,
}

impl NoATerm {
    pub fn new(telescope: &str, conv_size: usize, oversampling: usize) -> NoATerm {
        NoATerm {
            telescope: telescope.to_string(),
            conv_size,
            oversampling,
        }
    }
}

impl ATermLike for NoATerm {
    fn name(&self) -> &str {
        &self.telescope
    }

    fn oversampling(&self) -> usize {
        self.oversampling
    }

    fn conv_size(&self) -> usize {
        self.conv_size
    }

    fn is_rotationally_symmetric(&self) -> bool {
        false
    }

    fn apply_sky(
        &self,
        _: ArrayViewMut2<c64>,
        _: &CoordinateSystem,
        _: &ATermContext,
    ) -> Result<(), TermError> {
        Ok(())
    }
}

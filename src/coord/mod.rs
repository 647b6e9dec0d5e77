// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Coordinate systems attached to images and convolution functions.
//!
//! A [`CoordinateSystem`] always has a spatial pair of axes, a spectral axis
//! and a Stokes axis. The spatial axes are either sky directions (for images
//! and image-domain kernels) or a linear uv coordinate (for kernels after
//! they've been Fourier transformed into the gridding domain).

mod error;
mod stokes;

pub use error::CoordError;
pub use stokes::{Feed, Stokes};

use serde::{Deserialize, Serialize};

/// A sky-direction coordinate on a (SIN) projection plane. Angles are in
/// radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionCoordinate {
    /// The (RA, Dec) at the reference pixel \[radians\].
    pub ref_value: [f64; 2],

    /// The reference pixel (zero indexed).
    pub ref_pixel: [f64; 2],

    /// The pixel increment along each axis \[radians\].
    pub increment: [f64; 2],
}

/// A linear coordinate. Used for the uv plane, where the unit is wavelengths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearCoordinate {
    pub ref_value: [f64; 2],
    pub ref_pixel: [f64; 2],
    pub increment: [f64; 2],
}

/// Either a direction or a uv coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpatialCoordinate {
    Direction(DirectionCoordinate),
    Uv(LinearCoordinate),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralCoordinate {
    /// \[Hz\]
    pub ref_value: f64,
    pub ref_pixel: f64,
    /// \[Hz\]
    pub increment: f64,
}

impl SpectralCoordinate {
    pub fn to_world(&self, pixel: f64) -> f64 {
        self.ref_value + (pixel - self.ref_pixel) * self.increment
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StokesCoordinate {
    pub stokes: Vec<Stokes>,
}

/// The geometry of a sky image: its coordinates and its pixel shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGeometry {
    pub coords: CoordinateSystem,
    pub shape: [usize; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSystem {
    pub spatial: SpatialCoordinate,
    pub spectral: SpectralCoordinate,
    pub stokes: StokesCoordinate,
}

impl CoordinateSystem {
    /// A sky coordinate system with square pixels of size `cell_rad`, centred
    /// on pixel (`nx/2`, `ny/2`).
    pub fn new_sky(
        phase_centre: [f64; 2],
        cell_rad: f64,
        nx: usize,
        ny: usize,
        ref_freq_hz: f64,
        freq_increment_hz: f64,
        stokes: Vec<Stokes>,
    ) -> CoordinateSystem {
        CoordinateSystem {
            spatial: SpatialCoordinate::Direction(DirectionCoordinate {
                ref_value: phase_centre,
                ref_pixel: [(nx / 2) as f64, (ny / 2) as f64],
                // RA increases to the left.
                increment: [-cell_rad, cell_rad],
            }),
            spectral: SpectralCoordinate {
                ref_value: ref_freq_hz,
                ref_pixel: 0.0,
                increment: freq_increment_hz,
            },
            stokes: StokesCoordinate { stokes },
        }
    }

    pub fn direction(&self) -> Result<&DirectionCoordinate, CoordError> {
        match &self.spatial {
            SpatialCoordinate::Direction(d) => Ok(d),
            SpatialCoordinate::Uv(_) => Err(CoordError::NoDirection),
        }
    }

    pub fn direction_mut(&mut self) -> Result<&mut DirectionCoordinate, CoordError> {
        match &mut self.spatial {
            SpatialCoordinate::Direction(d) => Ok(d),
            SpatialCoordinate::Uv(_) => Err(CoordError::NoDirection),
        }
    }

    pub fn uv(&self) -> Option<&LinearCoordinate> {
        match &self.spatial {
            SpatialCoordinate::Uv(l) => Some(l),
            SpatialCoordinate::Direction(_) => None,
        }
    }

    /// The spatial increment, whatever the domain.
    pub fn increment(&self) -> [f64; 2] {
        match &self.spatial {
            SpatialCoordinate::Direction(d) => d.increment,
            SpatialCoordinate::Uv(l) => l.increment,
        }
    }

    pub fn ref_pixel(&self) -> [f64; 2] {
        match &self.spatial {
            SpatialCoordinate::Direction(d) => d.ref_pixel,
            SpatialCoordinate::Uv(l) => l.ref_pixel,
        }
    }

    pub fn ref_freq(&self) -> f64 {
        self.spectral.ref_value
    }

    /// Direction-cosine offsets (l, m) of a pixel from the reference pixel.
    /// Only meaningful for a direction coordinate; the pixel offsets are
    /// scaled by the increments, which is the small-field approximation.
    pub fn pixel_to_lm(&self, pixel: [f64; 2]) -> Result<[f64; 2], CoordError> {
        let d = self.direction()?;
        Ok([
            (pixel[0] - d.ref_pixel[0]) * d.increment[0],
            (pixel[1] - d.ref_pixel[1]) * d.increment[1],
        ])
    }

    pub fn lm_to_pixel(&self, lm: [f64; 2]) -> Result<[f64; 2], CoordError> {
        let d = self.direction()?;
        Ok([
            lm[0] / d.increment[0] + d.ref_pixel[0],
            lm[1] / d.increment[1] + d.ref_pixel[1],
        ])
    }

    /// A copy with a single-entry Stokes axis.
    pub fn with_stokes(&self, stokes: Stokes) -> CoordinateSystem {
        let mut cs = self.clone();
        cs.stokes.stokes = vec![stokes];
        cs
    }

    /// A copy with the spectral reference value replaced.
    pub fn with_ref_freq(&self, freq_hz: f64) -> CoordinateSystem {
        let mut cs = self.clone();
        cs.spectral.ref_value = freq_hz;
        cs
    }

    /// Replace the Stokes axis with its conjugate-polarisation counterpart. If
    /// `conj_stokes` is given, the axis becomes that single product.
    /// Otherwise, every product on the axis is swapped with its partner.
    pub fn make_conj_pol_axis(&mut self, conj_stokes: Option<Stokes>) {
        match conj_stokes {
            Some(s) => self.stokes.stokes = vec![s],
            None => self
                .stokes
                .stokes
                .iter_mut()
                .for_each(|s| *s = s.conj()),
        }
    }

    /// Make the Fourier-domain counterpart of this (image-domain) coordinate
    /// system for a square kernel of `npix` pixels whose image-domain pixels
    /// are this coordinate system's increments. The direction axis becomes a
    /// uv axis with increment `1 / (npix * cell)` wavelengths and reference
    /// pixel `ft_ref`.
    pub fn make_ft_coord_sys(
        &self,
        npix: usize,
        ft_ref: [f64; 2],
    ) -> Result<CoordinateSystem, CoordError> {
        if npix == 0 {
            return Err(CoordError::ZeroSize);
        }
        let d = self.direction()?;
        let inc = [
            1.0 / (npix as f64 * d.increment[0]),
            1.0 / (npix as f64 * d.increment[1]),
        ];
        let mut cs = self.clone();
        cs.spatial = SpatialCoordinate::Uv(LinearCoordinate {
            ref_value: [0.0, 0.0],
            ref_pixel: ft_ref,
            increment: inc,
        });
        Ok(cs)
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The average primary-beam response of an array.

use log::{debug, info};
use ndarray::prelude::*;

use super::{AwConvFunc, AwConvFuncError};
use crate::{
    c64,
    coord::{ImageGeometry, Stokes},
    pol::PolBasis,
    terms::{ATermContext, ATermLike, PsTermLike, WTermLike},
    vis::{antenna_types, baseline_type, VisBufferLike},
};

/// The diagonal Mueller element of a polarisation product, or 0 for Stokes
/// parameters.
fn diagonal_mueller(stokes: Stokes) -> i32 {
    match stokes.feeds() {
        Some((p, q)) => {
            let corr = 2 * p.basis_index() + q.basis_index();
            (5 * corr) as i32
        }
        None => 0,
    }
}

impl<A: ATermLike, P: PsTermLike, W: WTermLike> AwConvFunc<A, P, W> {
    /// The antenna power response over `image`, one plane per Stokes plane of
    /// the image. Every plane starts at one and is multiplied by the
    /// (squinted) response of the first antenna type's baseline with itself.
    pub fn make_average_response<V: VisBufferLike + ?Sized>(
        &self,
        vb: &V,
        image: &ImageGeometry,
    ) -> Result<Array3<c64>, AwConvFuncError> {
        info!("Making the average response for {}", self.aterm.name());
        let (diameters, _) = antenna_types(vb.antennas());
        if diameters.is_empty() {
            return Err(AwConvFuncError::NoAntennas);
        }
        let baseline = baseline_type(&diameters, 0, 0);
        let stokes = &image.coords.stokes.stokes;
        let basis = match stokes.iter().find_map(|s| s.feeds()) {
            Some((p, _)) if !p.is_circular() => PolBasis::Linear,
            _ => PolBasis::Circular,
        };

        let [nx, ny] = image.shape;
        let mut pb = Array3::from_elem((stokes.len(), nx, ny), c64::new(1.0, 0.0));
        for (plane, &s) in pb.outer_iter_mut().zip(stokes.iter()) {
            let ctx = ATermContext {
                freq_hz: image.coords.ref_freq(),
                pa_rad: vb.parallactic_angle(),
                mueller: diagonal_mueller(s),
                basis,
                baseline,
                do_squint: true,
            };
            self.aterm.apply_sky(plane, &image.coords, &ctx)?;
        }
        Ok(pb)
    }
}

/// Normalise each plane of an average response to a peak of one (if the
/// response isn't already normalised) and combine the first two planes into
/// `sqrt(Re(P0 * P1))`, which is written into every plane of the output. A
/// single-plane response is combined with itself.
pub fn normalize_avg_pb(response: &mut Array3<c64>) -> Array3<f64> {
    let max = response.iter().map(|v| v.norm()).fold(0.0, f64::max);
    if max - 1.0 > 1e-3 {
        debug!("Normalising the average PBs to unity");
        for mut plane in response.outer_iter_mut() {
            let peak = plane
                .iter()
                .copied()
                .fold(c64::default(), |best, v| if v.norm() > best.norm() { v } else { best });
            if peak.norm() > 0.0 {
                plane.mapv_inplace(|v| v / peak);
            }
        }
    }

    let (n_planes, nx, ny) = response.dim();
    let mut out = Array3::zeros((n_planes, nx, ny));
    if n_planes == 0 {
        return out;
    }
    let p0 = response.index_axis(Axis(0), 0);
    let p1 = response.index_axis(Axis(0), n_planes.min(2) - 1);
    let combined = Array2::from_shape_fn((nx, ny), |ij| (p0[ij] * p1[ij]).re.max(0.0).sqrt());
    for mut plane in out.outer_iter_mut() {
        plane.assign(&combined);
    }
    out
}

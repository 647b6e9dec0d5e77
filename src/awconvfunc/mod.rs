// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Making AW-projection convolution functions.
//!
//! [`AwConvFunc`] multiplies a prolate-spheroidal taper, a w-term phase screen
//! and an antenna response together in the image domain, Fourier transforms
//! the product, trims it to its support and normalises it. It does this for
//! every (frequency, w, Mueller element) of every baseline type, and stores
//! the results in a pair of [`CfStore2`]s: one for the gridding kernels and
//! one for their weights.

mod error;
mod fill;
mod rebuild;
mod response;
mod support;
#[cfg(test)]
mod tests;

pub use error::AwConvFuncError;
pub use fill::{fill_conv_func_buffer2, PlaneNorms};
pub use rebuild::make_conv_function2;
pub use response::normalize_avg_pb;
pub use support::{aw_find_support, cf_area, resize_cf, set_up_cf_support, SupportParams};

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::Itertools;
use log::{debug, info, trace, warn};

use crate::{
    cf::{save_uv_grid, CfBuffer, CfStore2, WEIGHT_QUALIFIER},
    constants::{DEFAULT_ROT_PA_STEP_DEG, MAX_FREQ},
    coord::{CoordError, CoordinateSystem, ImageGeometry},
    math::{conj_freq, nearest_value},
    pol::PolOuterProduct,
    terms::{ATermLike, PsTermLike, WTermLike},
    vis::{antenna_types, baseline_type, AntennaInfo, BaselineType, SpwSelection, VisBufferLike},
    PROGRESS_BARS,
};
use fill::{tag_cell, CellTags};

/// The convolution-function maker, generic over its three terms. Use
/// [`crate::terms::NoATerm`], [`crate::terms::NoPsTerm`] or
/// [`crate::terms::NoWTerm`] to switch a term off.
#[derive(Debug, Clone)]
pub struct AwConvFunc<A: ATermLike, P: PsTermLike, W: WTermLike> {
    aterm: A,
    psterm: P,
    wterm: W,

    /// Make kernels for every selected spectral window rather than only at the
    /// image reference frequency?
    wb_awp: bool,

    /// Evaluate the conjugate-polarisation response at the conjugate
    /// frequency?
    conj_beams: bool,

    support: SupportParams,

    /// The parallactic-angle change beyond which kernels are rotated
    /// \[radians\].
    rot_pa_step_rad: f64,

    /// If set, stores are written here after they're made.
    cache_dir: Option<PathBuf>,
}

impl<A: ATermLike, P: PsTermLike, W: WTermLike> AwConvFunc<A, P, W> {
    pub fn new(aterm: A, psterm: P, wterm: W) -> AwConvFunc<A, P, W> {
        AwConvFunc {
            aterm,
            psterm,
            wterm,
            wb_awp: false,
            conj_beams: true,
            support: SupportParams::default(),
            rot_pa_step_rad: DEFAULT_ROT_PA_STEP_DEG.to_radians(),
            cache_dir: None,
        }
    }

    pub fn with_wb_awp(mut self, wb_awp: bool) -> Self {
        self.wb_awp = wb_awp;
        self
    }

    pub fn with_conj_beams(mut self, conj_beams: bool) -> Self {
        self.conj_beams = conj_beams;
        self
    }

    pub fn with_support_params(mut self, support: SupportParams) -> Self {
        self.support = support;
        self
    }

    pub fn with_rot_pa_step(mut self, rot_pa_step_rad: f64) -> Self {
        self.rot_pa_step_rad = rot_pa_step_rad.abs();
        self
    }

    pub fn with_cache_dir(mut self, cache_dir: Option<PathBuf>) -> Self {
        self.cache_dir = cache_dir;
        self
    }

    pub fn aterm(&self) -> &A {
        &self.aterm
    }

    pub fn psterm(&self) -> &P {
        &self.psterm
    }

    pub fn wterm(&self) -> &W {
        &self.wterm
    }

    pub fn support_params(&self) -> &SupportParams {
        &self.support
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    /// The frequencies kernels are made at: the image reference frequency, or
    /// with wide-band AW projection, the top of each selected spectral
    /// window.
    pub fn make_freq_values(&self, image: &ImageGeometry, freq_selection: &[SpwSelection]) -> Vec<f64> {
        let ref_freq = image.coords.ref_freq();
        if !self.wb_awp {
            return vec![ref_freq];
        }
        let freqs: Vec<f64> = freq_range_per_spw(freq_selection)
            .into_iter()
            .filter(|&[lo, _]| lo >= 0.0)
            .map(|[_, hi]| hi)
            .dedup()
            .collect();
        if freqs.is_empty() {
            warn!("No channels are selected; making convolution functions at the image reference frequency only");
            vec![ref_freq]
        } else {
            freqs
        }
    }

    /// Make the convolution functions of every baseline type at the
    /// parallactic angle `pa_rad` and put them in `cf_store` and their
    /// weights in `cf_wt_store`.
    ///
    /// Each bucket is made privately and only put in the stores once all of
    /// its kernels have been made; an error leaves the stores as they were,
    /// apart from buckets of earlier baseline types. If `fill_cf` is false,
    /// only the shapes and metadata of the kernels are made (a dry run).
    #[allow(clippy::too_many_arguments)]
    pub fn make_conv_function<V: VisBufferLike + ?Sized>(
        &mut self,
        image: &ImageGeometry,
        vb: &V,
        w_conv_size: usize,
        pop: &PolOuterProduct,
        pa_rad: f64,
        d_pa_rad: f64,
        uv_scale: [f64; 2],
        uv_offset: [f64; 2],
        freq_selection: &[SpwSelection],
        cf_store: &mut CfStore2,
        cf_wt_store: &mut CfStore2,
        fill_cf: bool,
    ) -> Result<(), AwConvFuncError> {
        pop.check_conformance(&image.coords.stokes.stokes)?;
        let conv_size = self.aterm.conv_size();
        let sampling = self.aterm.oversampling();
        if sampling == 0 || conv_size < 4 || conv_size < sampling {
            return Err(AwConvFuncError::BadConvSize {
                conv_size,
                oversampling: sampling,
            });
        }

        let (w_values, w_scale) = make_w_values(w_conv_size, image.coords.direction()?.increment);
        let freq_values = self.make_freq_values(image, freq_selection);
        let baselines = make_baseline_list(vb.antennas());
        if baselines.is_empty() {
            return Err(AwConvFuncError::NoAntennas);
        }
        let sky_cs = cell_coord_sys(image, conv_size, sampling)?;
        let inner = conv_size / sampling;
        self.psterm
            .init(inner, uv_scale, uv_offset, 2.0 / inner as f64);

        cf_store.set_d_pa(d_pa_rad);
        cf_wt_store.set_d_pa(d_pa_rad);

        let n_mueller = pop.mueller_list().len();
        let total = baselines.len() * w_values.len() * freq_values.len() * n_mueller;
        info!(
            "Making {} convolution functions ({} baseline types, {} w-planes, {} frequencies, {} Mueller elements) at PA {:.2} deg",
            if fill_cf { "filled" } else { "empty" },
            baselines.len(),
            w_values.len(),
            freq_values.len(),
            n_mueller,
            pa_rad.to_degrees()
        );
        debug!("Using {}, {} and {}", self.aterm.name(), self.psterm.name(), self.wterm.name());
        let progress = ProgressBar::with_draw_target(
            Some(total as _),
            if PROGRESS_BARS.load() {
                ProgressDrawTarget::stdout()
            } else {
                ProgressDrawTarget::hidden()
            },
        )
        .with_style(
            ProgressStyle::default_bar()
                .template("{msg:17}: [{wide_bar:.blue}] {pos:3}/{len:3} CFs ({elapsed_precise}<{eta_precise})")
                .unwrap()
                .progress_chars("=> "),
        )
        .with_position(0)
        .with_message("Making CFs");

        let im_ref_freq = image.coords.ref_freq();
        for baseline in baselines {
            let mut cfb = CfBuffer::new();
            cfb.resize(&w_values, &freq_values, pop);
            cfb.w_scale = w_scale;
            let mut cfwtb = cfb.clone();

            for index in cfb.indices().collect::<Vec<_>>() {
                let freq = freq_values[index[0]];
                let conj_freq_hz = if self.conj_beams {
                    nearest_value(&freq_values, conj_freq(freq, im_ref_freq))
                        .map(|(_, f)| f)
                        .unwrap_or(freq)
                } else {
                    freq
                };
                let tags = CellTags {
                    sky_cs: &sky_cs,
                    conv_size,
                    sampling,
                    pa_rad,
                    conj_freq_hz,
                    baseline,
                    telescope_name: self.aterm.name(),
                    is_rotationally_symmetric: self.aterm.is_rotationally_symmetric(),
                };
                tag_cell(&mut cfb, index, &tags)?;
                tag_cell(&mut cfwtb, index, &tags)?;
            }

            self.fill_conv_func_buffer(&mut cfb, &mut cfwtb, &sky_cs, !fill_cf, &progress)?;

            let i_sig = cf_store.resize(pa_rad, baseline);
            let i_wt = cf_wt_store.resize(pa_rad, baseline);
            trace!(
                "Baseline type {:?} goes into bucket {:?} (weights {:?}); max support {}",
                baseline.diameters_m,
                i_sig,
                i_wt,
                cfb.max_support()
            );
            cf_store.insert(i_sig, cfb)?;
            cf_wt_store.insert(i_wt, cfwtb)?;
        }
        progress.abandon_with_message("Finished CFs");

        if let Some(dir) = &self.cache_dir {
            cf_store.make_persistent(dir, "")?;
            cf_wt_store.make_persistent(dir, WEIGHT_QUALIFIER)?;
            save_uv_grid(dir, image)?;
            info!("Wrote the CF cache to {}", dir.display());
        }
        Ok(())
    }

    /// Follow a change of parallactic angle by rotating the kernels of the
    /// buckets in `store` whose row matches the parallactic angle of `vb`.
    /// Nothing happens if the antenna response isn't rotationally symmetric
    /// or the angle hasn't moved by more than the rotation step. Readers
    /// holding a bucket keep the unrotated one. Returns the number of buckets
    /// rotated.
    pub fn prepare_conv_function<V: VisBufferLike + ?Sized>(
        &self,
        vb: &V,
        store: &mut CfStore2,
    ) -> Result<usize, AwConvFuncError> {
        if !self.aterm.is_rotationally_symmetric() {
            return Ok(0);
        }
        let actual_pa = vb.parallactic_angle();
        let i_pa = match store.pa_index(actual_pa) {
            Some(i) => i,
            None => return Ok(0),
        };

        let mut rotated = 0;
        for i_bl in 0..store.shape()[1] {
            let cfb = match store.get_cf_buffer_mut([i_pa, i_bl])? {
                Some(b) => b,
                None => continue,
            };
            let current_pa = match cfb.cells().next() {
                Some((_, c)) => c.current_pa(),
                None => continue,
            };
            let d_pa = current_pa - actual_pa;
            if d_pa.abs() <= self.rot_pa_step_rad {
                continue;
            }
            debug!(
                "Rotating the CFs of bucket [{i_pa}, {i_bl}] from PA {:.2} deg to {:.2} deg",
                current_pa.to_degrees(),
                actual_pa.to_degrees()
            );
            for index in cfb.indices().collect::<Vec<_>>() {
                let cell = cfb.get_cell_mut(index)?;
                if cell.is_filled() {
                    cell.rotate_to(actual_pa, |k, angle| self.aterm.rotate(k, angle));
                }
            }
            rotated += 1;
        }
        Ok(rotated)
    }
}

/// The w values of `n_w` w-planes for an image with pixel increments
/// `image_increment` \[radians\], and the scale `w_scale` such that
/// `w[i] = i^2 / w_scale`. The largest w is set by the largest baseline the
/// image can represent. With one plane (or none), w projection is off and the
/// scale is zero.
pub fn make_w_values(n_w: usize, image_increment: [f64; 2]) -> (Vec<f64>, f64) {
    let n_w = if n_w == 0 {
        warn!("Zero w-planes were requested; using one (no w projection)");
        1
    } else {
        n_w
    };
    let max_uvw = 0.25 / image_increment[0].abs();
    let w_scale = if n_w > 1 && max_uvw.is_finite() {
        ((n_w - 1) * (n_w - 1)) as f64 / max_uvw
    } else {
        0.0
    };
    let w_values = (0..n_w)
        .map(|i| {
            if w_scale > 0.0 {
                (i * i) as f64 / w_scale
            } else {
                0.0
            }
        })
        .collect();
    (w_values, w_scale)
}

/// The lowest and highest selected frequency of each spectral window \[Hz\],
/// in the order given. Windows without selected channels get `[-1, -1]`.
pub fn freq_range_per_spw(freq_selection: &[SpwSelection]) -> Vec<[f64; 2]> {
    freq_selection
        .iter()
        .map(|sel| {
            let (lo, hi) = sel
                .selected_channels
                .iter()
                .filter_map(|&c| sel.chan_freqs_hz.get(c))
                .fold((MAX_FREQ, -1.0_f64), |(lo, hi), &f| (lo.min(f), hi.max(f)));
            if hi < 0.0 {
                [-1.0, -1.0]
            } else {
                [lo, hi]
            }
        })
        .collect()
}

/// Every unordered pair of antenna types in `antennas`.
pub fn make_baseline_list(antennas: &[AntennaInfo]) -> Vec<BaselineType> {
    let (diameters, _) = antenna_types(antennas);
    let n = diameters.len();
    (0..n)
        .flat_map(|i| (i..n).map(move |j| (i, j)))
        .map(|(i, j)| baseline_type(&diameters, i, j))
        .collect()
}

/// The image-domain coordinate system of a kernel buffer of `conv_size`
/// pixels oversampled by `sampling` for `image`. The buffer's pixels are
/// `sampling * nx / conv_size` times larger than the image's, and it's
/// centred on pixel `conv_size / 2`.
pub fn cell_coord_sys(
    image: &ImageGeometry,
    conv_size: usize,
    sampling: usize,
) -> Result<CoordinateSystem, CoordError> {
    if conv_size == 0 {
        return Err(CoordError::ZeroSize);
    }
    let mut cs = image.coords.clone();
    let scale = sampling as f64 * image.shape[0] as f64 / conv_size as f64;
    let dir = cs.direction_mut()?;
    dir.increment = dir.increment.map(|inc| inc * scale);
    dir.ref_pixel = [(conv_size / 2) as f64; 2];
    Ok(cs)
}

/// The uv scale and offset of the grid `image` is imaged on: the grid's
/// extent in wavelengths and its centre pixel, per axis.
pub fn grid_uv_scale(image: &ImageGeometry) -> ([f64; 2], [f64; 2]) {
    let inc = image.coords.increment();
    let scale = [
        image.shape[0] as f64 * inc[0].abs(),
        image.shape[1] as f64 * inc[1].abs(),
    ];
    let offset = [(image.shape[0] / 2) as f64, (image.shape[1] / 2) as f64];
    (scale, offset)
}

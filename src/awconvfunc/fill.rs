// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Computing the pixels of a single kernel and its weight.

use indicatif::ProgressBar;
use log::debug;
use ndarray::prelude::*;

use super::{resize_cf, AwConvFunc, AwConvFuncError, SupportParams};
use crate::{
    c64,
    cf::{CfBuffer, CfParams},
    coord::CoordinateSystem,
    math::{
        centered_slice, cfft2d, elementwise_multiply_in_place, multiply_by_conj_product, peak,
    },
    pol::conj_mueller,
    terms::{ATermContext, ATermLike, PsTermLike, WTermLike},
    vis::BaselineType,
};

use super::support::cf_area;

/// The normalisations worked out on the first w-plane of a (frequency,
/// Mueller) pair and reused for its other w-planes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneNorms {
    /// The weight kernel's peak before normalisation. `None` if only the
    /// areas are known, e.g. when they're taken from a filled cell; the
    /// weight doesn't depend on w, so the peak is then measured again.
    pub weight_peak: Option<c64>,

    pub signal_area: f64,

    pub weight_area: f64,
}

impl Default for PlaneNorms {
    fn default() -> Self {
        PlaneNorms {
            weight_peak: None,
            signal_area: 1.0,
            weight_area: 1.0,
        }
    }
}

/// The metadata every cell of a bucket is given before it's filled.
pub(super) struct CellTags<'a> {
    pub(super) sky_cs: &'a CoordinateSystem,
    pub(super) conv_size: usize,
    pub(super) sampling: usize,
    pub(super) pa_rad: f64,
    pub(super) conj_freq_hz: f64,
    pub(super) baseline: BaselineType,
    pub(super) telescope_name: &'a str,
    pub(super) is_rotationally_symmetric: bool,
}

/// Give the cell at `index` its coordinates, sampling and provisional support,
/// and everything else the fill needs to know about it. Until it's filled, a
/// cell's support is as large as its buffer allows.
pub(super) fn tag_cell(
    buf: &mut CfBuffer,
    index: [usize; 3],
    tags: &CellTags,
) -> Result<(), AwConvFuncError> {
    let [i_freq, _, i_mueller] = index;
    let freq_hz = buf.freq_values()[i_freq];
    let mueller = buf.mueller_values()[i_mueller];
    let pol = buf.pol().ok_or(AwConvFuncError::MissingTag {
        index,
        what: "polarisation map",
    })?;
    let stokes = pol
        .row_of(mueller)
        .map(|row| pol.vis_corr()[row])
        .ok_or(AwConvFuncError::UnknownMueller(mueller))?;

    let n = tags.conv_size;
    let coords = tags
        .sky_cs
        .with_stokes(stokes)
        .with_ref_freq(freq_hz)
        .make_ft_coord_sys(n, [(n / 2) as f64; 2])?;
    let dry_support = n / (2 * tags.sampling);
    buf.set_params(
        index,
        CfParams {
            coords: Some(coords),
            sampling: tags.sampling as f64,
            support: [dry_support, dry_support],
        },
    )?;

    let cell = buf.get_cell_mut(index)?;
    cell.info.shape = Some([n, n]);
    cell.info.pa_rad = tags.pa_rad;
    cell.info.conj_freq_hz = tags.conj_freq_hz;
    cell.info.conj_pol = Some(stokes.conj());
    cell.info.telescope_name = tags.telescope_name.to_string();
    cell.info.baseline = Some(tags.baseline);
    cell.info.is_rotationally_symmetric = tags.is_rotationally_symmetric;
    Ok(())
}

/// Fill the signal and weight kernels at `index` of a pair of tagged buffers.
///
/// `sky_cs` is the image-domain coordinate system of the kernel buffer (see
/// [`super::cell_coord_sys`]). The weight kernel is divided by
/// `w0_norms.weight_peak` and both kernels by the areas in `w0_norms`; if
/// `w0_norms` is `None`, they are measured on this plane. The norms used are
/// returned so the caller can hand them to the other w-planes.
///
/// A dry run only records the shape of the cell and leaves its pixels empty.
#[allow(clippy::too_many_arguments)]
pub fn fill_conv_func_buffer2<A, P, W>(
    cfb: &mut CfBuffer,
    cfwtb: &mut CfBuffer,
    index: [usize; 3],
    sky_cs: &CoordinateSystem,
    aterm: &A,
    psterm: &P,
    wterm: &W,
    support_params: &SupportParams,
    dry_run: bool,
    w0_norms: Option<PlaneNorms>,
) -> Result<PlaneNorms, AwConvFuncError>
where
    A: ATermLike + ?Sized,
    P: PsTermLike + ?Sized,
    W: WTermLike + ?Sized,
{
    let info = cfb.get_cell(index)?.info.clone();
    let missing = |what| AwConvFuncError::MissingTag { index, what };
    let [n, _] = info.shape.ok_or_else(|| missing("shape"))?;
    let baseline = info.baseline.ok_or_else(|| missing("baseline type"))?;
    let pol = cfb.pol().ok_or_else(|| missing("polarisation map"))?;
    let basis = pol.basis();
    let stokes = pol
        .row_of(info.mueller)
        .map(|row| pol.vis_corr()[row])
        .ok_or(AwConvFuncError::UnknownMueller(info.mueller))?;
    let sampling = info.sampling;

    if dry_run {
        for buf in [&mut *cfb, &mut *cfwtb] {
            let cell = buf.get_cell_mut(index)?;
            cell.pixels = None;
            cell.info.shape = Some([n, n]);
        }
        return Ok(PlaneNorms::default());
    }

    let cs = sky_cs.with_stokes(stokes).with_ref_freq(info.freq_hz);
    let mut conj_cs = cs.clone();
    conj_cs.make_conj_pol_axis(info.conj_pol);

    let one = c64::new(1.0, 0.0);
    let mut sig = Array2::from_elem((n, n), one);
    let mut wt = Array2::from_elem((n, n), one);
    psterm.apply_sky(sig.view_mut(), false);
    psterm.apply_sky(wt.view_mut(), false);
    wt.mapv_inplace(|v| v * v);

    wterm.apply_sky(sig.view_mut(), info.w, cs.direction()?.increment, n);

    let ctx = ATermContext {
        freq_hz: info.freq_hz,
        pa_rad: info.pa_rad,
        mueller: info.mueller,
        basis,
        baseline,
        do_squint: true,
    };
    let conj_ctx = ATermContext {
        freq_hz: info.conj_freq_hz,
        mueller: conj_mueller(info.mueller),
        ..ctx
    };
    let mut a = Array2::from_elem((n, n), one);
    let mut a_conj = Array2::from_elem((n, n), one);
    aterm.apply_sky(a.view_mut(), &cs, &ctx)?;
    aterm.apply_sky(a_conj.view_mut(), &conj_cs, &conj_ctx)?;
    multiply_by_conj_product(wt.view_mut(), a.view(), a_conj.view());
    elementwise_multiply_in_place(sig.view_mut(), a.view());

    cfft2d(&mut sig, true);
    cfft2d(&mut wt, true);
    let mut sig_cell = Array2::zeros((n, n));
    let mut wt_cell = Array2::zeros((n, n));
    centered_slice(sig_cell.view_mut(), sig.view(), [0, 0]);
    centered_slice(wt_cell.view_mut(), wt.view(), [0, 0]);

    let degenerate = |what| AwConvFuncError::DegenerateKernel {
        what,
        mueller: info.mueller,
        freq_hz: info.freq_hz,
        w: info.w,
    };

    // The weight is normalised by the peak of the first w-plane.
    let weight_peak = match w0_norms.and_then(|norms| norms.weight_peak) {
        Some(p) => p,
        None => peak(wt_cell.view()).1,
    };
    if weight_peak.norm() == 0.0 {
        return Err(degenerate("weight"));
    }
    wt_cell.mapv_inplace(|v| v / weight_peak);
    let wt_support = resize_cf(&mut wt_cell, sampling, None, support_params)?;

    let (_, sig_peak) = peak(sig_cell.view());
    if sig_peak.norm() == 0.0 {
        return Err(degenerate("signal"));
    }
    sig_cell.mapv_inplace(|v| v / sig_peak);
    let support = resize_cf(&mut sig_cell, sampling, None, support_params)?;

    let norms = match w0_norms {
        Some(norms) => PlaneNorms {
            weight_peak: Some(weight_peak),
            ..norms
        },
        None => PlaneNorms {
            weight_peak: Some(weight_peak),
            signal_area: cf_area(sig_cell.view(), support, sampling),
            weight_area: cf_area(wt_cell.view(), wt_support, sampling),
        },
    };
    if !norms.signal_area.is_normal() {
        return Err(degenerate("signal"));
    }
    if !norms.weight_area.is_normal() {
        return Err(degenerate("weight"));
    }
    sig_cell.mapv_inplace(|v| v / norms.signal_area);
    wt_cell.mapv_inplace(|v| v / norms.weight_area);

    debug!(
        "CF support for Mueller {} ({}) at {:.3} MHz, w = {:.2}: {} ({}) pixels",
        info.mueller,
        stokes,
        info.freq_hz / 1e6,
        info.w,
        support[0],
        wt_support[0]
    );

    store_kernel(cfb, index, &cs, sig_cell, support, norms.signal_area)?;
    store_kernel(cfwtb, index, &cs, wt_cell, wt_support, norms.weight_area)?;
    Ok(norms)
}

fn store_kernel(
    buf: &mut CfBuffer,
    index: [usize; 3],
    cs: &CoordinateSystem,
    pixels: Array2<c64>,
    support: [usize; 2],
    area_norm: f64,
) -> Result<(), AwConvFuncError> {
    let cell = buf.get_cell_mut(index)?;
    // The uv pixel size is set by the untrimmed buffer.
    let n = cell.info.shape.map(|s| s[0]).unwrap_or(pixels.dim().0);
    let centre = (pixels.dim().0 / 2) as f64;
    cell.info.coords = Some(cs.make_ft_coord_sys(n, [centre, centre])?);
    cell.info.support = support;
    cell.info.area_norm = area_norm;
    cell.set_pixels(pixels);
    Ok(())
}

impl<A: ATermLike, P: PsTermLike, W: WTermLike> AwConvFunc<A, P, W> {
    /// Fill every cell of a pair of tagged buffers, w varying fastest so that
    /// each (frequency, Mueller) pair measures its normalisation once at the
    /// first w-plane.
    pub fn fill_conv_func_buffer(
        &self,
        cfb: &mut CfBuffer,
        cfwtb: &mut CfBuffer,
        sky_cs: &CoordinateSystem,
        dry_run: bool,
        progress: &ProgressBar,
    ) -> Result<(), AwConvFuncError> {
        let [n_freq, n_w, n_mueller] = cfb.shape();
        for i_freq in 0..n_freq {
            for i_mueller in 0..n_mueller {
                let mut w0_norms = None;
                for i_w in 0..n_w {
                    let norms = fill_conv_func_buffer2(
                        cfb,
                        cfwtb,
                        [i_freq, i_w, i_mueller],
                        sky_cs,
                        &self.aterm,
                        &self.psterm,
                        &self.wterm,
                        &self.support,
                        dry_run,
                        w0_norms,
                    )?;
                    if w0_norms.is_none() {
                        w0_norms = Some(norms);
                    }
                    progress.inc(1);
                }
            }
        }
        Ok(())
    }
}

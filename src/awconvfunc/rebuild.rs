// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Filling the kernels of a cache that was made by a dry run.

use std::path::Path;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info};

use super::{cell_coord_sys, fill_conv_func_buffer2, AwConvFuncError, PlaneNorms, SupportParams};
use crate::{
    cf::{load_uv_grid, CfBuffer, CfStore2, WEIGHT_QUALIFIER},
    terms::TermFactory,
    PROGRESS_BARS,
};

/// Load the signal and weight stores in `cache_dir`, fill every cell that has
/// a shape but no pixels, and write both stores back. The terms of each cell
/// are made by `factory` from the telescope name the cell remembers; the sky
/// geometry comes from the cache's `uvgrid.json`.
///
/// Cells that already have pixels are left alone. If the first w-plane of a
/// (frequency, Mueller) pair is one of them, its area normalisations are
/// reused for the pair's other planes.
pub fn make_conv_function2<F: TermFactory + ?Sized>(
    cache_dir: &Path,
    uv_scale: [f64; 2],
    uv_offset: [f64; 2],
    factory: &F,
    support_params: &SupportParams,
) -> Result<(CfStore2, CfStore2), AwConvFuncError> {
    let image = load_uv_grid(cache_dir)?;
    let mut cf_store = CfStore2::load(cache_dir, "", true)?;
    let mut cf_wt_store = CfStore2::load(cache_dir, WEIGHT_QUALIFIER, true)?;

    let to_fill: usize = cf_store
        .buffers()
        .map(|(_, b)| b.cells().filter(|(_, c)| !c.is_empty() && !c.is_filled()).count())
        .sum();
    info!("Filling {to_fill} empty CFs in {}", cache_dir.display());
    let progress = ProgressBar::with_draw_target(
        Some(to_fill as _),
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
    .with_message("Filling CFs");

    let buckets: Vec<[usize; 2]> = cf_store.buffers().map(|(i, _)| i).collect();
    for bucket in buckets {
        let [i_pa, i_bl] = bucket;
        debug!("Filling CFs for baseline type {i_bl}, PA slot {i_pa}");
        let mut cfb = match cf_store.get_cf_buffer_by_index(bucket)? {
            Some(b) => b.as_ref().clone(),
            None => continue,
        };
        let mut cfwtb = cf_wt_store
            .get_cf_buffer_by_index(bucket)?
            .ok_or(AwConvFuncError::NoWeightBucket(bucket))?
            .as_ref()
            .clone();

        let [n_freq, n_w, n_mueller] = cfb.shape();
        for i_freq in 0..n_freq {
            for i_mueller in 0..n_mueller {
                let mut w0_norms = filled_norms(&cfb, &cfwtb, [i_freq, 0, i_mueller])?;
                for i_w in 0..n_w {
                    let index = [i_freq, i_w, i_mueller];
                    let info = {
                        let cell = cfb.get_cell(index)?;
                        if cell.is_empty() || cell.is_filled() {
                            continue;
                        }
                        cell.info.clone()
                    };
                    let [conv_size, _] = info.shape.ok_or(AwConvFuncError::MissingTag {
                        index,
                        what: "shape",
                    })?;
                    let sampling = (info.sampling.round() as usize).max(1);

                    let mut terms = factory.make_terms(&info.telescope_name, conv_size, sampling)?;
                    let inner = conv_size / sampling;
                    terms
                        .psterm
                        .init(inner, uv_scale, uv_offset, 2.0 / inner as f64);
                    let sky_cs = cell_coord_sys(&image, conv_size, sampling)?;

                    let norms = fill_conv_func_buffer2(
                        &mut cfb,
                        &mut cfwtb,
                        index,
                        &sky_cs,
                        &*terms.aterm,
                        &*terms.psterm,
                        &*terms.wterm,
                        support_params,
                        false,
                        w0_norms,
                    )?;
                    if w0_norms.is_none() {
                        w0_norms = Some(norms);
                    }
                    progress.inc(1);
                }
            }
        }
        cf_store.insert(bucket, cfb)?;
        cf_wt_store.insert(bucket, cfwtb)?;
    }
    progress.abandon_with_message("Filled CFs");

    cf_store.make_persistent(cache_dir, "")?;
    cf_wt_store.make_persistent(cache_dir, WEIGHT_QUALIFIER)?;
    Ok((cf_store, cf_wt_store))
}

/// The area normalisations of the cells at `index` if both are filled.
fn filled_norms(
    cfb: &CfBuffer,
    cfwtb: &CfBuffer,
    index: [usize; 3],
) -> Result<Option<PlaneNorms>, AwConvFuncError> {
    let sig = cfb.get_cell(index)?;
    let wt = cfwtb.get_cell(index)?;
    if !(sig.is_filled() && wt.is_filled()) {
        return Ok(None);
    }
    Ok(Some(PlaneNorms {
        weight_peak: None,
        signal_area: sig.info.area_norm,
        weight_area: wt.info.area_norm,
    }))
}

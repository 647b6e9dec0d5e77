// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Make the convolution functions of a synthetic array and write them to a
//! CF cache.

use std::path::{Path, PathBuf};

use clap::Parser;
use log::{debug, info, trace};

use super::{merge_arg_file, save_args, AwcfError};
use crate::{
    awconvfunc::{grid_uv_scale, AwConvFunc},
    cache::{CachePlan, CfCache},
    config::{CfConfig, ARG_FILE_HELP},
    terms::TermFactory,
    vis::VisBufferLike,
    PROGRESS_BARS,
};

#[derive(Parser, Debug, Clone, Default)]
pub(super) struct MakeCacheArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    #[clap(flatten)]
    pub(super) cf_args: CfConfig,

    /// Only work out the shapes and metadata of the convolution functions;
    /// their pixels can be computed later with fill-cache.
    #[clap(long, help_heading = "CONVOLUTION FUNCTIONS")]
    pub(super) no_fill: bool,
}

impl MakeCacheArgs {
    pub(super) fn run(self, dry_run: bool, save_toml: Option<&Path>) -> Result<(), AwcfError> {
        let MakeCacheArgs {
            args_file,
            cf_args,
            no_fill,
        } = self;
        let args = merge_arg_file(cf_args, args_file.as_deref())?;
        save_args(&args, save_toml)?;

        debug!("Converting arguments into parameters");
        trace!("{:#?}", args);
        let settings = args.parse()?;
        if !settings.progress_bars {
            PROGRESS_BARS.store(false);
        }
        let cache_dir = settings
            .cache_dir
            .clone()
            .ok_or(MakeCacheArgsError::NoCacheDir)?;
        let image = settings.image_geometry()?;
        let pop = settings.pol_outer_product()?;
        pop.check_conformance(&image.coords.stokes.stokes)?;
        let vbs = settings.vis_buffers()?;
        let freq_selection = settings.freq_selection()?;
        let telescope = vbs
            .first()
            .map(|vb| vb.telescope_name().to_string())
            .unwrap_or_default();

        info!("CF cache:           {}", cache_dir.display());
        info!("Telescope:          {telescope}");
        info!("Correlations:       {:?} ({})", pop.vis_corr(), pop.kind());
        info!("Mueller elements:   {:?}", pop.mueller_list());
        info!(
            "Image:              {} x {} pixels",
            image.shape[0], image.shape[1]
        );
        info!("w-planes:           {}", settings.w_planes);
        info!(
            "Buffer:             {} pixels, oversampled {}x",
            settings.conv_size, settings.oversampling
        );
        info!("Parallactic angles: {}", vbs.len());

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        let terms = settings.term_factory().make_terms(
            &telescope,
            settings.conv_size,
            settings.oversampling,
        )?;
        let mut cf = AwConvFunc::new(terms.aterm, terms.psterm, terms.wterm)
            .with_wb_awp(settings.wb_awp)
            .with_conj_beams(settings.conj_beams)
            .with_support_params(settings.support)
            .with_rot_pa_step(settings.rot_pa_step_rad)
            .with_cache_dir(Some(cache_dir.clone()));

        let (uv_scale, uv_offset) = grid_uv_scale(&image);
        let plan = CachePlan {
            w_conv_size: settings.w_planes,
            pop,
            uv_scale,
            uv_offset,
            freq_selection,
            fill: !no_fill,
        };
        let mut cache = CfCache::open(
            &cache_dir,
            settings.pa_step_rad,
            settings.rot_pa_step_rad,
            plan,
        )?;
        for vb in &vbs {
            let found = cache.find_conv_function(&mut cf, &image, vb)?;
            for f in &found {
                debug!(
                    "PA {:.2} deg, dishes {:?} m: max support {} pixels",
                    vb.parallactic_angle().to_degrees(),
                    f.baseline.diameters_m,
                    f.signal.max_support()
                );
            }
        }

        let [n_pa, n_bl] = cache.signal().read()?.shape();
        info!(
            "The CF cache has {n_pa} PA rows of {n_bl} baseline types and uses {:.3} MiB",
            cache.mem_usage()? as f64 / 1024.0 / 1024.0
        );
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub(super) enum MakeCacheArgsError {
    #[error("No CF cache directory was specified; use --cfcachedir")]
    NoCacheDir,
}

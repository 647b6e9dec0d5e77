// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Compute the pixels of a CF cache made with `make-cache --no-fill`.

use std::path::{Path, PathBuf};

use clap::Parser;
use log::{debug, info, trace};

use super::{make_cache::MakeCacheArgsError, merge_arg_file, save_args, AwcfError};
use crate::{
    awconvfunc::{grid_uv_scale, make_conv_function2},
    cf::load_uv_grid,
    config::{CfConfig, ARG_FILE_HELP},
    PROGRESS_BARS,
};

#[derive(Parser, Debug, Clone, Default)]
pub(super) struct FillCacheArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    #[clap(flatten)]
    pub(super) cf_args: CfConfig,
}

impl FillCacheArgs {
    pub(super) fn run(self, dry_run: bool, save_toml: Option<&Path>) -> Result<(), AwcfError> {
        let FillCacheArgs { args_file, cf_args } = self;
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
        let image = load_uv_grid(&cache_dir)?;
        let (uv_scale, uv_offset) = grid_uv_scale(&image);
        // The w values of the cells decide whether w projection matters.
        let mut factory = settings.term_factory();
        factory.wterm = true;
        info!("CF cache: {}", cache_dir.display());
        debug!("Filling with {factory:?}");

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        let (cf_store, cf_wt_store) =
            make_conv_function2(&cache_dir, uv_scale, uv_offset, &factory, &settings.support)?;
        info!(
            "The filled CF cache uses {:.3} MiB",
            (cf_store.mem_usage() + cf_wt_store.mem_usage()) as f64 / 1024.0 / 1024.0
        );
        Ok(())
    }
}

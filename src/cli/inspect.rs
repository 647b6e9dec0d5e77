// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use clap::Parser;
use log::{info, warn};

use super::AwcfError;
use crate::cf::{load_uv_grid, CfStore2, WEIGHT_QUALIFIER};

#[derive(Parser, Debug, Clone, Default)]
pub(super) struct InspectArgs {
    /// The directory of the CF cache.
    #[clap(name = "CACHE_DIR", parse(from_os_str))]
    pub(super) cache_dir: PathBuf,
}

impl InspectArgs {
    pub(super) fn run(self) -> Result<(), AwcfError> {
        let dir = &self.cache_dir;
        let image = load_uv_grid(dir)?;
        info!(
            "Made for a {} x {} image with {:?} rad pixels at {} Hz",
            image.shape[0],
            image.shape[1],
            image.coords.increment(),
            image.coords.ref_freq()
        );

        for (what, qualifier) in [("Signal", ""), ("Weight", WEIGHT_QUALIFIER)] {
            if !CfStore2::exists(dir, qualifier) {
                warn!("{what} store: none");
                continue;
            }
            let store = CfStore2::load(dir, qualifier, false)?;
            let [n_pa, n_bl] = store.shape();
            info!(
                "{what} store: {n_pa} PA rows {:.1?} deg, {n_bl} baseline types, PA step {:.2} deg",
                store
                    .pa_values()
                    .iter()
                    .map(|pa| pa.to_degrees())
                    .collect::<Vec<_>>(),
                store.d_pa().to_degrees()
            );
            for ([i_pa, i_bl], buffer) in store.buffers() {
                let [n_freq, n_w, n_mueller] = buffer.shape();
                let n_cells = n_freq * n_w * n_mueller;
                let n_shaped = buffer
                    .cells()
                    .filter(|(_, c)| c.info.shape.is_some())
                    .count();
                info!(
                    "  [{i_pa}, {i_bl}] dishes {:?} m: {n_freq} freqs x {n_w} w-planes x {n_mueller} Mueller elements; {n_shaped}/{n_cells} with a shape; max support {}",
                    store.baseline_types()[i_bl].diameters_m,
                    buffer.max_support()
                );
            }
        }
        Ok(())
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The imaging side of the CF cache: finding the kernels for a buffer of
//! visibilities, and making them when they don't exist yet.

mod error;
#[cfg(test)]
mod tests;

pub use error::CacheError;

use std::{path::Path, sync::Arc};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    awconvfunc::{make_baseline_list, AwConvFunc, AwConvFuncError},
    cf::{CfBuffer, CfError, CfStore2, SharedCfStore, WEIGHT_QUALIFIER},
    coord::ImageGeometry,
    pol::PolOuterProduct,
    terms::{ATermLike, PsTermLike, WTermLike},
    vis::{BaselineType, SpwSelection, VisBufferLike},
};

/// Everything about the kernels to make that doesn't come from the
/// visibilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachePlan {
    /// The number of w-planes.
    pub w_conv_size: usize,

    pub pop: PolOuterProduct,
    pub uv_scale: [f64; 2],
    pub uv_offset: [f64; 2],
    pub freq_selection: Vec<SpwSelection>,

    /// Compute pixels, or only shapes and metadata?
    pub fill: bool,
}

/// Tells when the parallactic angle has moved far enough to look at the
/// cache again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParAngleChangeDetector {
    tolerance_rad: f64,
    last_pa_rad: Option<f64>,
}

impl ParAngleChangeDetector {
    pub fn new(tolerance_rad: f64) -> ParAngleChangeDetector {
        ParAngleChangeDetector {
            tolerance_rad: tolerance_rad.abs(),
            last_pa_rad: None,
        }
    }

    /// Has `pa_rad` moved more than the tolerance since the last change? The
    /// first angle seen is always a change.
    pub fn changed(&mut self, pa_rad: f64) -> bool {
        match self.last_pa_rad {
            Some(last) if (pa_rad - last).abs() <= self.tolerance_rad => false,
            _ => {
                self.last_pa_rad = Some(pa_rad);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last_pa_rad = None;
    }
}

/// The kernels and weights of one baseline type.
#[derive(Debug, Clone)]
pub struct FoundCf {
    pub baseline: BaselineType,
    pub signal: Arc<CfBuffer>,
    pub weight: Arc<CfBuffer>,
}

/// The signal and weight stores of an imager, with the logic that keeps them
/// up to date as the parallactic angle changes.
#[derive(Debug)]
pub struct CfCache {
    signal: SharedCfStore,
    weight: SharedCfStore,
    pa_change: ParAngleChangeDetector,

    /// The PA width of a row of buckets \[radians\].
    pa_step_rad: f64,

    plan: CachePlan,
    last_found: Vec<FoundCf>,
}

impl CfCache {
    /// An empty cache. The cache is looked at again whenever the parallactic
    /// angle moves by more than the smaller of `pa_step_rad` and
    /// `rot_pa_step_rad`.
    pub fn new(pa_step_rad: f64, rot_pa_step_rad: f64, plan: CachePlan) -> CfCache {
        CfCache {
            signal: SharedCfStore::new(CfStore2::new(pa_step_rad)),
            weight: SharedCfStore::new(CfStore2::new(pa_step_rad)),
            pa_change: ParAngleChangeDetector::new(pa_step_rad.abs().min(rot_pa_step_rad.abs())),
            pa_step_rad: pa_step_rad.abs(),
            plan,
            last_found: vec![],
        }
    }

    /// As [`CfCache::new`], but start from the stores in `dir` if there are
    /// any.
    pub fn open(
        dir: &Path,
        pa_step_rad: f64,
        rot_pa_step_rad: f64,
        plan: CachePlan,
    ) -> Result<CfCache, CacheError> {
        let cache = CfCache::new(pa_step_rad, rot_pa_step_rad, plan);
        if CfStore2::exists(dir, "") && CfStore2::exists(dir, WEIGHT_QUALIFIER) {
            let signal = CfStore2::load(dir, "", true)?;
            let weight = CfStore2::load(dir, WEIGHT_QUALIFIER, true)?;
            info!(
                "Opened the CF cache in {} ({} PA rows, {} baseline types)",
                dir.display(),
                signal.shape()[0],
                signal.shape()[1]
            );
            *cache.signal.write()? = signal;
            *cache.weight.write()? = weight;
        } else {
            debug!("No CF cache in {}; starting empty", dir.display());
        }
        Ok(cache)
    }

    pub fn signal(&self) -> &SharedCfStore {
        &self.signal
    }

    pub fn weight(&self) -> &SharedCfStore {
        &self.weight
    }

    pub fn plan(&self) -> &CachePlan {
        &self.plan
    }

    /// The kernels of every baseline type of `vb` at its parallactic angle.
    ///
    /// Missing buckets are made with `cf` (and written to its cache directory,
    /// if it has one). Kernels of a rotationally symmetric antenna response
    /// are turned to follow the parallactic angle.
    pub fn find_conv_function<A, P, W, V>(
        &mut self,
        cf: &mut AwConvFunc<A, P, W>,
        image: &ImageGeometry,
        vb: &V,
    ) -> Result<Vec<FoundCf>, CacheError>
    where
        A: ATermLike,
        P: PsTermLike,
        W: WTermLike,
        V: VisBufferLike + ?Sized,
    {
        let pa_rad = vb.parallactic_angle();
        if !self.pa_change.changed(pa_rad) && !self.last_found.is_empty() {
            return Ok(self.last_found.clone());
        }

        let baselines = make_baseline_list(vb.antennas());
        if baselines.is_empty() {
            return Err(AwConvFuncError::NoAntennas.into());
        }
        if self.lookup(pa_rad, &baselines)?.is_none() {
            info!(
                "No CFs for a parallactic angle of {:.2} deg; making them",
                pa_rad.to_degrees()
            );
            let mut signal = self.signal.write()?;
            let mut weight = self.weight.write()?;
            let plan = &self.plan;
            cf.make_conv_function(
                image,
                vb,
                plan.w_conv_size,
                &plan.pop,
                pa_rad,
                self.pa_step_rad,
                plan.uv_scale,
                plan.uv_offset,
                &plan.freq_selection,
                &mut signal,
                &mut weight,
                plan.fill,
            )?;
            info!(
                "The CF cache uses {:.3} MiB",
                (signal.mem_usage() + weight.mem_usage()) as f64 / 1024.0 / 1024.0
            );
        }

        let rotated = {
            let mut signal = self.signal.write()?;
            let mut weight = self.weight.write()?;
            cf.prepare_conv_function(vb, &mut signal)? + cf.prepare_conv_function(vb, &mut weight)?
        };
        if rotated > 0 {
            debug!("Rotated {rotated} CF buckets");
        }

        let found = self.lookup(pa_rad, &baselines)?.ok_or(CfError::NoBucket {
            pa_deg: pa_rad.to_degrees(),
            diameters_m: baselines[0].diameters_m,
        })?;
        self.last_found = found.clone();
        Ok(found)
    }

    /// Snapshots of the buckets of every baseline type at `pa_rad`, or `None`
    /// if any signal bucket is missing.
    fn lookup(
        &self,
        pa_rad: f64,
        baselines: &[BaselineType],
    ) -> Result<Option<Vec<FoundCf>>, CacheError> {
        let signal = self.signal.read()?;
        let weight = self.weight.read()?;
        let mut found = Vec::with_capacity(baselines.len());
        for &baseline in baselines {
            let sig = match signal.get_cf_buffer(pa_rad, &baseline) {
                Ok(b) => b,
                Err(CfError::NoBucket { .. }) => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            let wt = weight
                .get_cf_buffer(pa_rad, &baseline)
                .map_err(|_| CacheError::NoWeights {
                    pa_deg: pa_rad.to_degrees(),
                    diameters_m: baseline.diameters_m,
                })?;
            found.push(FoundCf {
                baseline,
                signal: sig,
                weight: wt,
            });
        }
        Ok(Some(found))
    }

    /// Bytes used by every kernel in both stores.
    pub fn mem_usage(&self) -> Result<usize, CacheError> {
        Ok(self.signal.read()?.mem_usage() + self.weight.read()?.mem_usage())
    }

    /// Forget every kernel.
    pub fn invalidate(&mut self) -> Result<(), CacheError> {
        self.signal.write()?.invalidate();
        self.weight.write()?.invalidate();
        self.pa_change.reset();
        self.last_found.clear();
        Ok(())
    }
}

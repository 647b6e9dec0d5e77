// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;

use super::{CfBuffer, CfError};
use crate::{constants::DIAMETER_TOLERANCE_M, vis::BaselineType};

/// The (parallactic angle, baseline type) grid of [`CfBuffer`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CfStore2 {
    /// The parallactic angle of each row of buckets \[radians\].
    pub(super) pa_values: Vec<f64>,

    /// How close a parallactic angle must be to a row's to share its buckets
    /// \[radians\].
    pub(super) d_pa: f64,

    pub(super) baseline_types: Vec<BaselineType>,

    /// Row major; `None` for buckets that haven't been made.
    pub(super) buffers: Vec<Option<Arc<CfBuffer>>>,
}

/// Baseline types are unordered pairs of dishes.
fn same_baseline_type(a: &BaselineType, b: &BaselineType) -> bool {
    let close = |x: f64, y: f64| (x - y).abs() < DIAMETER_TOLERANCE_M;
    let [a1, a2] = a.diameters_m;
    let [b1, b2] = b.diameters_m;
    (close(a1, b1) && close(a2, b2)) || (close(a1, b2) && close(a2, b1))
}

impl CfStore2 {
    pub fn new(d_pa_rad: f64) -> CfStore2 {
        CfStore2 {
            d_pa: d_pa_rad.abs(),
            ..Default::default()
        }
    }

    pub fn d_pa(&self) -> f64 {
        self.d_pa
    }

    /// Change the parallactic-angle tolerance. Existing rows keep their
    /// angles.
    pub fn set_d_pa(&mut self, d_pa_rad: f64) {
        self.d_pa = d_pa_rad.abs();
    }

    pub fn pa_values(&self) -> &[f64] {
        &self.pa_values
    }

    pub fn baseline_types(&self) -> &[BaselineType] {
        &self.baseline_types
    }

    /// (number of PA rows, number of baseline types)
    pub fn shape(&self) -> [usize; 2] {
        [self.pa_values.len(), self.baseline_types.len()]
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.iter().all(|b| b.is_none())
    }

    /// The row whose parallactic angle is nearest to `pa_rad`, if it's within
    /// the tolerance.
    pub fn pa_index(&self, pa_rad: f64) -> Option<usize> {
        self.pa_values
            .iter()
            .enumerate()
            .map(|(i, &pa)| (i, (pa - pa_rad).abs()))
            .filter(|&(_, d)| d <= self.d_pa)
            .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((i, d)),
            })
            .map(|(i, _)| i)
    }

    pub fn baseline_index(&self, baseline: &BaselineType) -> Option<usize> {
        self.baseline_types
            .iter()
            .position(|b| same_baseline_type(b, baseline))
    }

    /// Make room for the bucket (`pa_rad`, `baseline`), adding a row and/or a
    /// column if needed, and return its indices. Existing buckets are
    /// untouched.
    pub fn resize(&mut self, pa_rad: f64, baseline: BaselineType) -> [usize; 2] {
        let [n_pa, n_bl] = self.shape();
        let i_pa = match self.pa_index(pa_rad) {
            Some(i) => i,
            None => {
                self.pa_values.push(pa_rad);
                n_pa
            }
        };
        let i_bl = match self.baseline_index(&baseline) {
            Some(i) => i,
            None => {
                self.baseline_types.push(baseline);
                n_bl
            }
        };

        let [new_n_pa, new_n_bl] = self.shape();
        if [new_n_pa, new_n_bl] != [n_pa, n_bl] {
            debug!("Resizing CF store from {n_pa}x{n_bl} to {new_n_pa}x{new_n_bl}");
            let mut buffers = vec![None; new_n_pa * new_n_bl];
            for i in 0..n_pa {
                for j in 0..n_bl {
                    buffers[i * new_n_bl + j] = self.buffers[i * n_bl + j].take();
                }
            }
            self.buffers = buffers;
        }
        [i_pa, i_bl]
    }

    fn flat_index(&self, [i_pa, i_bl]: [usize; 2]) -> Result<usize, CfError> {
        let [n_pa, n_bl] = self.shape();
        if i_pa >= n_pa || i_bl >= n_bl {
            return Err(CfError::BucketIndex {
                index: [i_pa, i_bl],
                shape: [n_pa, n_bl],
            });
        }
        Ok(i_pa * n_bl + i_bl)
    }

    pub fn get_cf_buffer_by_index(&self, index: [usize; 2]) -> Result<Option<&Arc<CfBuffer>>, CfError> {
        let i = self.flat_index(index)?;
        Ok(self.buffers[i].as_ref())
    }

    /// A snapshot of the bucket for this parallactic angle and baseline type.
    pub fn get_cf_buffer(&self, pa_rad: f64, baseline: &BaselineType) -> Result<Arc<CfBuffer>, CfError> {
        let not_found = || CfError::NoBucket {
            pa_deg: pa_rad.to_degrees(),
            diameters_m: baseline.diameters_m,
        };
        let i_pa = self.pa_index(pa_rad).ok_or_else(not_found)?;
        let i_bl = self.baseline_index(baseline).ok_or_else(not_found)?;
        self.get_cf_buffer_by_index([i_pa, i_bl])?
            .cloned()
            .ok_or_else(not_found)
    }

    /// Mutable access to a bucket; readers holding a snapshot keep the old
    /// one.
    pub fn get_cf_buffer_mut(&mut self, index: [usize; 2]) -> Result<Option<&mut CfBuffer>, CfError> {
        let i = self.flat_index(index)?;
        Ok(self.buffers[i].as_mut().map(Arc::make_mut))
    }

    pub fn insert(&mut self, index: [usize; 2], buffer: CfBuffer) -> Result<(), CfError> {
        let i = self.flat_index(index)?;
        self.buffers[i] = Some(Arc::new(buffer));
        Ok(())
    }

    /// Every bucket that has been made, with its indices.
    pub fn buffers(&self) -> impl Iterator<Item = ([usize; 2], &Arc<CfBuffer>)> {
        let n_bl = self.baseline_types.len().max(1);
        self.buffers
            .iter()
            .enumerate()
            .filter_map(move |(i, b)| b.as_ref().map(|b| ([i / n_bl, i % n_bl], b)))
    }

    /// Forget every bucket.
    pub fn invalidate(&mut self) {
        self.pa_values.clear();
        self.baseline_types.clear();
        self.buffers.clear();
    }

    /// Bytes used by every kernel in the store.
    pub fn mem_usage(&self) -> usize {
        self.buffers().map(|(_, b)| b.mem_usage()).sum()
    }
}

/// A [`CfStore2`] that many readers (gridders) and one writer (the
/// convolution-function maker) can share.
#[derive(Debug, Clone, Default)]
pub struct SharedCfStore(Arc<RwLock<CfStore2>>);

impl SharedCfStore {
    pub fn new(store: CfStore2) -> SharedCfStore {
        SharedCfStore(Arc::new(RwLock::new(store)))
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, CfStore2>, CfError> {
        self.0.read().map_err(|_| CfError::Poisoned)
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, CfStore2>, CfError> {
        self.0.write().map_err(|_| CfError::Poisoned)
    }

    /// A snapshot of a bucket; see [`CfStore2::get_cf_buffer`].
    pub fn get_cf_buffer(&self, pa_rad: f64, baseline: &BaselineType) -> Result<Arc<CfBuffer>, CfError> {
        self.read()?.get_cf_buffer(pa_rad, baseline)
    }
}

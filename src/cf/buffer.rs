// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{CfCell, CfCellInfo, CfError};
use crate::{coord::CoordinateSystem, math::nearest_index, pol::PolOuterProduct};

/// The parameters the gridder needs from a kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct CfParams {
    pub coords: Option<CoordinateSystem>,
    pub sampling: f64,
    pub support: [usize; 2],
}

/// The kernels of one (parallactic angle, baseline type) bucket, indexed by
/// (frequency, w, Mueller element).
///
/// The three axes are fixed by [`CfBuffer::resize`]; the cells are stored
/// flat with the Mueller index varying fastest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CfBuffer {
    freq_values: Vec<f64>,
    w_values: Vec<f64>,
    mueller_values: Vec<i32>,
    pol: Option<PolOuterProduct>,
    cells: Vec<Arc<CfCell>>,

    /// The pointing offset of the antennas \[radians\].
    pub pointing_offset: [f64; 2],

    /// The scale that turns a w-plane index into a w value: `w = i^2 /
    /// w_scale`.
    pub w_scale: f64,
}

/// The pieces of a [`CfBuffer`] that aren't cells. Used for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(super) struct CfBufferAxes {
    pub(super) freq_values: Vec<f64>,
    pub(super) w_values: Vec<f64>,
    pub(super) mueller_values: Vec<i32>,
    pub(super) pol: Option<PolOuterProduct>,
    pub(super) pointing_offset: [f64; 2],
    pub(super) w_scale: f64,
}

impl CfBuffer {
    pub fn new() -> CfBuffer {
        CfBuffer::default()
    }

    /// Set the axes and replace every cell with an empty one.
    pub fn resize(&mut self, w_values: &[f64], freq_values: &[f64], pol: &PolOuterProduct) {
        self.freq_values = freq_values.to_vec();
        self.w_values = w_values.to_vec();
        self.mueller_values = pol.mueller_list().to_vec();
        self.pol = Some(pol.clone());
        let n = self.freq_values.len() * self.w_values.len() * self.mueller_values.len();
        let empty = Arc::new(CfCell::default());
        self.cells = vec![empty; n];
    }

    /// The lengths of the (frequency, w, Mueller) axes.
    pub fn shape(&self) -> [usize; 3] {
        [
            self.freq_values.len(),
            self.w_values.len(),
            self.mueller_values.len(),
        ]
    }

    pub fn freq_values(&self) -> &[f64] {
        &self.freq_values
    }

    pub fn w_values(&self) -> &[f64] {
        &self.w_values
    }

    pub fn mueller_values(&self) -> &[i32] {
        &self.mueller_values
    }

    pub fn pol(&self) -> Option<&PolOuterProduct> {
        self.pol.as_ref()
    }

    fn flat_index(&self, [i_freq, i_w, i_mueller]: [usize; 3]) -> Result<usize, CfError> {
        let [nf, nw, nm] = self.shape();
        if i_freq >= nf || i_w >= nw || i_mueller >= nm {
            return Err(CfError::CellIndex {
                index: [i_freq, i_w, i_mueller],
                shape: [nf, nw, nm],
            });
        }
        Ok((i_freq * nw + i_w) * nm + i_mueller)
    }

    pub fn nearest_freq_index(&self, freq_hz: f64) -> Result<usize, CfError> {
        nearest_index(&self.freq_values, freq_hz).ok_or(CfError::EmptyAxis("frequency"))
    }

    pub fn nearest_w_index(&self, w: f64) -> Result<usize, CfError> {
        nearest_index(&self.w_values, w).ok_or(CfError::EmptyAxis("w"))
    }

    pub fn nearest_mueller_index(&self, mueller: i32) -> Result<usize, CfError> {
        let values: Vec<f64> = self.mueller_values.iter().map(|&m| m as f64).collect();
        nearest_index(&values, mueller as f64).ok_or(CfError::EmptyAxis("Mueller"))
    }

    /// The (frequency, w, Mueller) indices nearest to the given values. Only
    /// fails if an axis is empty.
    pub fn nearest_indices(&self, freq_hz: f64, w: f64, mueller: i32) -> Result<[usize; 3], CfError> {
        Ok([
            self.nearest_freq_index(freq_hz)?,
            self.nearest_w_index(w)?,
            self.nearest_mueller_index(mueller)?,
        ])
    }

    pub fn get_cell(&self, index: [usize; 3]) -> Result<&Arc<CfCell>, CfError> {
        let i = self.flat_index(index)?;
        Ok(&self.cells[i])
    }

    /// The cell nearest to the given axis values.
    pub fn get_cell_by_value(&self, freq_hz: f64, w: f64, mueller: i32) -> Result<&Arc<CfCell>, CfError> {
        let index = self.nearest_indices(freq_hz, w, mueller)?;
        self.get_cell(index)
    }

    /// Mutable access to a cell. If anyone else holds the cell, they keep the
    /// old version.
    pub fn get_cell_mut(&mut self, index: [usize; 3]) -> Result<&mut CfCell, CfError> {
        let i = self.flat_index(index)?;
        Ok(Arc::make_mut(&mut self.cells[i]))
    }

    pub fn set_cell(&mut self, index: [usize; 3], cell: CfCell) -> Result<(), CfError> {
        let i = self.flat_index(index)?;
        self.cells[i] = Arc::new(cell);
        Ok(())
    }

    /// Kernel parameters of the cell nearest to the given axis values.
    pub fn get_params(&self, freq_hz: f64, w: f64, mueller: i32) -> Result<CfParams, CfError> {
        let info = &self.get_cell_by_value(freq_hz, w, mueller)?.info;
        Ok(CfParams {
            coords: info.coords.clone(),
            sampling: info.sampling,
            support: info.support,
        })
    }

    /// Set the kernel parameters of a cell, tagging it with this buffer's axis
    /// values at `index`.
    pub fn set_params(&mut self, index: [usize; 3], params: CfParams) -> Result<(), CfError> {
        let [i_freq, i_w, i_mueller] = index;
        let (freq_hz, w, mueller) = (
            self.freq_values.get(i_freq).copied().unwrap_or_default(),
            self.w_values.get(i_w).copied().unwrap_or_default(),
            self.mueller_values.get(i_mueller).copied().unwrap_or_default(),
        );
        let cell = self.get_cell_mut(index)?;
        cell.info.coords = params.coords;
        cell.info.sampling = params.sampling;
        cell.info.support = params.support;
        cell.info.freq_hz = freq_hz;
        cell.info.w = w;
        cell.info.mueller = mueller;
        Ok(())
    }

    /// Every index of this buffer, Mueller varying fastest.
    pub fn indices(&self) -> impl Iterator<Item = [usize; 3]> {
        let [nf, nw, nm] = self.shape();
        (0..nf).flat_map(move |f| (0..nw).flat_map(move |w| (0..nm).map(move |m| [f, w, m])))
    }

    pub fn cells(&self) -> impl Iterator<Item = ([usize; 3], &Arc<CfCell>)> {
        self.indices().zip(self.cells.iter())
    }

    /// Are all the cells empty?
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }

    /// Bytes used by the pixels of every cell.
    pub fn mem_usage(&self) -> usize {
        self.cells.iter().map(|c| c.mem_usage()).sum()
    }

    /// The largest support of any cell.
    pub fn max_support(&self) -> usize {
        self.cells
            .iter()
            .map(|c| c.info.support[0].max(c.info.support[1]))
            .max()
            .unwrap_or(0)
    }

    pub(super) fn axes(&self) -> CfBufferAxes {
        CfBufferAxes {
            freq_values: self.freq_values.clone(),
            w_values: self.w_values.clone(),
            mueller_values: self.mueller_values.clone(),
            pol: self.pol.clone(),
            pointing_offset: self.pointing_offset,
            w_scale: self.w_scale,
        }
    }

    pub(super) fn from_axes(axes: CfBufferAxes) -> CfBuffer {
        let n = axes.freq_values.len() * axes.w_values.len() * axes.mueller_values.len();
        CfBuffer {
            cells: vec![Arc::new(CfCell::new(CfCellInfo::default())); n],
            freq_values: axes.freq_values,
            w_values: axes.w_values,
            mueller_values: axes.mueller_values,
            pol: axes.pol,
            pointing_offset: axes.pointing_offset,
            w_scale: axes.w_scale,
        }
    }
}

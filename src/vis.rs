// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! What the convolution-function engine needs to know about a buffer of
//! visibilities: who observed it, on which baselines, at which frequencies
//! and at which parallactic angle.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::constants::DIAMETER_TOLERANCE_M;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntennaInfo {
    pub name: String,

    /// \[metres\]
    pub diameter_m: f64,
}

/// An unordered pair of antenna types. Baselines of the same type share
/// convolution functions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineType {
    /// Indices into the buffer's list of unique antenna types, in the same
    /// order as `diameters_m`.
    pub ant_types: [usize; 2],

    /// The dish diameters of the two antenna types, larger first
    /// \[metres\].
    pub diameters_m: [f64; 2],
}

/// The channels selected from one spectral window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpwSelection {
    pub spw: usize,

    /// The frequencies of every channel in the window \[Hz\].
    pub chan_freqs_hz: Vec<f64>,

    /// Indices into `chan_freqs_hz`.
    pub selected_channels: Vec<usize>,
}

/// The visibility-buffer contract.
pub trait VisBufferLike {
    fn telescope_name(&self) -> &str;

    /// Every antenna in the array, indexed by antenna number.
    fn antennas(&self) -> &[AntennaInfo];

    /// The first antenna of each row.
    fn antenna1(&self) -> &[usize];

    /// The second antenna of each row.
    fn antenna2(&self) -> &[usize];

    /// Channel frequencies \[Hz\].
    fn frequencies_hz(&self) -> &[f64];

    fn spw(&self) -> usize;

    /// \[radians\]
    fn parallactic_angle(&self) -> f64;
}

/// An owned [`VisBufferLike`] without any visibilities; enough to plan and
/// fill convolution functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisBufferSummary {
    pub telescope_name: String,
    pub antennas: Vec<AntennaInfo>,
    pub antenna1: Vec<usize>,
    pub antenna2: Vec<usize>,
    pub frequencies_hz: Vec<f64>,
    #[serde(default)]
    pub spw: usize,
    #[serde(default)]
    pub parallactic_angle_rad: f64,
}

impl VisBufferSummary {
    /// A summary with every cross-correlation baseline of `antennas` as a
    /// row.
    pub fn all_baselines(
        telescope_name: &str,
        antennas: Vec<AntennaInfo>,
        frequencies_hz: Vec<f64>,
        parallactic_angle_rad: f64,
    ) -> VisBufferSummary {
        let n = antennas.len();
        let (antenna1, antenna2) = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .unzip();
        VisBufferSummary {
            telescope_name: telescope_name.to_string(),
            antennas,
            antenna1,
            antenna2,
            frequencies_hz,
            spw: 0,
            parallactic_angle_rad,
        }
    }
}

impl VisBufferLike for VisBufferSummary {
    fn telescope_name(&self) -> &str {
        &self.telescope_name
    }

    fn antennas(&self) -> &[AntennaInfo] {
        &self.antennas
    }

    fn antenna1(&self) -> &[usize] {
        &self.antenna1
    }

    fn antenna2(&self) -> &[usize] {
        &self.antenna2
    }

    fn frequencies_hz(&self) -> &[f64] {
        &self.frequencies_hz
    }

    fn spw(&self) -> usize {
        self.spw
    }

    fn parallactic_angle(&self) -> f64 {
        self.parallactic_angle_rad
    }
}

/// Classify antennas by dish diameter. Returns the unique diameters (in order
/// of first appearance) and the type index of every antenna.
pub fn antenna_types(antennas: &[AntennaInfo]) -> (Vec<f64>, Vec<usize>) {
    let mut diameters: Vec<f64> = vec![];
    let types = antennas
        .iter()
        .map(|a| {
            match diameters
                .iter()
                .position(|&d| (d - a.diameter_m).abs() < DIAMETER_TOLERANCE_M)
            {
                Some(i) => i,
                None => {
                    diameters.push(a.diameter_m);
                    diameters.len() - 1
                }
            }
        })
        .collect();
    (diameters, types)
}

/// The baseline type of the pair of antenna types `t1` and `t2`. The larger
/// dish comes first, so the same pair of dishes has the same type whatever
/// order a buffer lists its antennas in.
pub fn baseline_type(diameters: &[f64], t1: usize, t2: usize) -> BaselineType {
    let (a, b) = match diameters[t1].partial_cmp(&diameters[t2]) {
        Some(Ordering::Less) => (t2, t1),
        Some(Ordering::Equal) if t2 < t1 => (t2, t1),
        _ => (t1, t2),
    };
    BaselineType {
        ant_types: [a, b],
        diameters_m: [diameters[a], diameters[b]],
    }
}

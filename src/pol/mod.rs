// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The polarisation outer product: which elements of the 4x4 Mueller matrix
//! of a baseline need their own convolution function.
//!
//! Correlations are numbered within their feed basis (RR, RL, LR, LL or XX,
//! XY, YX, YY -> 0..4), and the Mueller element that takes correlation `j`
//! into correlation `i` has index `4 * i + j`. Swapping both feeds of a
//! correlation for their partners takes `i` to `3 - i`, so the conjugate of
//! Mueller element `m` is `15 - m`.

mod error;

pub use error::PolError;

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::coord::{Feed, Stokes};

/// A ragged table of Mueller indices. Row `i` belongs to the `i`th
/// correlation.
pub type PolMapType = Vec<Vec<i32>>;

/// How much of the Mueller matrix to convolve.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum PolOuterProductKind {
    /// Only the diagonal: each correlation is gridded with its own response.
    Diagonal,

    /// Every element of each correlation's row (leakage included).
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolBasis {
    Circular,
    Linear,
}

impl PolBasis {
    fn feed(self, basis_index: usize) -> Feed {
        match (self, basis_index) {
            (PolBasis::Circular, 0) => Feed::R,
            (PolBasis::Circular, _) => Feed::L,
            (PolBasis::Linear, 0) => Feed::X,
            (PolBasis::Linear, _) => Feed::Y,
        }
    }

    /// The feeds of correlation number `corr` (0..4) in this basis.
    pub fn corr_feeds(self, corr: usize) -> (Feed, Feed) {
        (self.feed(corr / 2), self.feed(corr % 2))
    }

    /// The correlation product of correlation number `corr` in this basis.
    pub fn corr_stokes(self, corr: usize) -> Stokes {
        let (p, q) = self.corr_feeds(corr);
        // Feeds from the same basis always make a correlation.
        Stokes::from_feeds(p, q).unwrap_or(Stokes::I)
    }

    /// The four feeds involved in Mueller element `m`: the feeds of the output
    /// correlation, then those of the input correlation.
    pub fn mueller_feeds(self, m: i32) -> ((Feed, Feed), (Feed, Feed)) {
        let m = m.rem_euclid(16) as usize;
        (self.corr_feeds(m / 4), self.corr_feeds(m % 4))
    }
}

/// The Mueller element with both correlations conjugated.
pub fn conj_mueller(m: i32) -> i32 {
    15 - m
}

/// Mueller element number for a pair of correlation numbers.
fn mueller_index(row_corr: usize, col_corr: usize) -> i32 {
    (4 * row_corr + col_corr) as i32
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolOuterProduct {
    basis: PolBasis,
    kind: PolOuterProductKind,
    vis_corr: Vec<Stokes>,
    pol_mat: PolMapType,
    pol2cf_mat: PolMapType,
    conj_pol_mat: PolMapType,
    conj_pol2cf_mat: PolMapType,

    /// The unique Mueller elements of `pol_mat`, ascending. This is the
    /// Mueller axis of a [`crate::cf::CfBuffer`]; conjugate elements are only
    /// on it if they're also forward elements.
    mueller_list: Vec<i32>,
}

impl PolOuterProduct {
    /// Build the outer-product maps for the visibility correlations
    /// `vis_corr`. Every correlation must come from the same feed basis.
    pub fn new(
        vis_corr: &[Stokes],
        kind: PolOuterProductKind,
    ) -> Result<PolOuterProduct, PolError> {
        let first = vis_corr.first().ok_or(PolError::NoCorrelations)?;
        let (p0, _) = first.feeds().ok_or(PolError::NotACorrelation(*first))?;
        let basis = if p0.is_circular() {
            PolBasis::Circular
        } else {
            PolBasis::Linear
        };

        let mut corr_indices = Vec::with_capacity(vis_corr.len());
        for &s in vis_corr {
            let (p, q) = s.feeds().ok_or(PolError::NotACorrelation(s))?;
            if p.is_circular() != p0.is_circular() || q.is_circular() != p0.is_circular() {
                return Err(PolError::MixedBasis(s, *first));
            }
            corr_indices.push(2 * p.basis_index() + q.basis_index());
        }
        if corr_indices.iter().unique().count() != corr_indices.len() {
            return Err(PolError::DuplicateCorrelation);
        }

        let row = |c: usize| -> Vec<i32> {
            match kind {
                PolOuterProductKind::Diagonal => vec![mueller_index(c, c)],
                PolOuterProductKind::Full => (0..4).map(|k| mueller_index(c, k)).collect(),
            }
        };
        let pol_mat: PolMapType = corr_indices.iter().map(|&c| row(c)).collect();
        let conj_pol_mat: PolMapType = pol_mat
            .iter()
            .map(|r| r.iter().copied().map(conj_mueller).collect())
            .collect();

        let mueller_list: Vec<i32> = pol_mat
            .iter()
            .flatten()
            .copied()
            .sorted()
            .dedup()
            .collect();
        let to_cf = |mat: &PolMapType| -> PolMapType {
            mat.iter()
                .map(|r| {
                    r.iter()
                        .map(|m| match mueller_list.binary_search(m) {
                            Ok(i) => i as i32,
                            // A conjugate element without a kernel of its own.
                            Err(_) => -1,
                        })
                        .collect()
                })
                .collect()
        };
        let pol2cf_mat = to_cf(&pol_mat);
        let conj_pol2cf_mat = to_cf(&conj_pol_mat);

        debug!("Polarisation outer product ({kind}) for {vis_corr:?}: Mueller elements {mueller_list:?}");

        Ok(PolOuterProduct {
            basis,
            kind,
            vis_corr: vis_corr.to_vec(),
            pol_mat,
            pol2cf_mat,
            conj_pol_mat,
            conj_pol2cf_mat,
            mueller_list,
        })
    }

    pub fn basis(&self) -> PolBasis {
        self.basis
    }

    pub fn kind(&self) -> PolOuterProductKind {
        self.kind
    }

    pub fn vis_corr(&self) -> &[Stokes] {
        &self.vis_corr
    }

    pub fn pol_mat(&self) -> &PolMapType {
        &self.pol_mat
    }

    pub fn pol2cf_mat(&self) -> &PolMapType {
        &self.pol2cf_mat
    }

    pub fn conj_pol_mat(&self) -> &PolMapType {
        &self.conj_pol_mat
    }

    pub fn conj_pol2cf_mat(&self) -> &PolMapType {
        &self.conj_pol2cf_mat
    }

    pub fn mueller_list(&self) -> &[i32] {
        &self.mueller_list
    }

    /// The position of Mueller element `m` on the CF Mueller axis.
    pub fn cf_index(&self, m: i32) -> Option<usize> {
        self.mueller_list.binary_search(&m).ok()
    }

    /// The correlation row that Mueller element `m` belongs to, searching the
    /// forward map first and then the conjugate map.
    pub fn row_of(&self, m: i32) -> Option<usize> {
        self.pol_mat
            .iter()
            .position(|r| r.contains(&m))
            .or_else(|| self.conj_pol_mat.iter().position(|r| r.contains(&m)))
    }

    /// Check that the rows of the maps line up with the sky Stokes axis of the
    /// image being made.
    pub fn check_conformance(&self, sky_stokes: &[Stokes]) -> Result<(), PolError> {
        if self.pol_mat.len() != sky_stokes.len() {
            return Err(PolError::NonConformant {
                rows: self.pol_mat.len(),
                sky: sky_stokes.len(),
            });
        }
        if self.conj_pol_mat.len() != self.pol_mat.len() {
            return Err(PolError::NonConformant {
                rows: self.conj_pol_mat.len(),
                sky: self.pol_mat.len(),
            });
        }
        Ok(())
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::coord::Stokes;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolError {
    #[error("No visibility correlations were supplied")]
    NoCorrelations,

    #[error("{0} is not a correlation product; expected one of RR, RL, LR, LL, XX, XY, YX, YY")]
    NotACorrelation(Stokes),

    #[error("Correlation {0} is not in the same feed basis as {1}")]
    MixedBasis(Stokes, Stokes),

    #[error("A visibility correlation was listed more than once")]
    DuplicateCorrelation,

    #[error("The polarisation map has {rows} rows, but the sky Stokes axis has {sky} entries")]
    NonConformant { rows: usize, sky: usize },
}

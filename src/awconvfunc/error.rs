// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with making convolution functions.

use thiserror::Error;

use crate::{
    cf::{CfError, PersistError},
    coord::CoordError,
    pol::PolError,
    terms::TermError,
};

#[derive(Error, Debug)]
pub enum AwConvFuncError {
    #[error("The convolution buffer size ({conv_size}) must be at least 4 pixels and no smaller than the oversampling ({oversampling})")]
    BadConvSize {
        conv_size: usize,
        oversampling: usize,
    },

    #[error("The visibilities don't list any antennas")]
    NoAntennas,

    #[error("Convolution function is misbehaved - support seems to be zero (threshold = {threshold})")]
    ZeroSupport { threshold: f64 },

    #[error("The {what} kernel for Mueller element {mueller} at {freq_hz} Hz and w = {w} is all zeros")]
    DegenerateKernel {
        what: &'static str,
        mueller: i32,
        freq_hz: f64,
        w: f64,
    },

    #[error("Mueller element {0} isn't part of the polarisation outer product")]
    UnknownMueller(i32),

    #[error("CF cell {index:?} doesn't know its {what}")]
    MissingTag {
        index: [usize; 3],
        what: &'static str,
    },

    #[error("There's no weight CF bucket to go with signal bucket {0:?}")]
    NoWeightBucket([usize; 2]),

    #[error(transparent)]
    Pol(#[from] PolError),

    #[error(transparent)]
    Term(#[from] TermError),

    #[error(transparent)]
    Coord(#[from] CoordError),

    #[error(transparent)]
    Cf(#[from] CfError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

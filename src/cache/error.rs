// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with the imaging-side CF cache.

use thiserror::Error;

use crate::{
    awconvfunc::AwConvFuncError,
    cf::{CfError, PersistError},
};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("The CF cache has no weight bucket for baseline type {diameters_m:?} m at PA {pa_deg} deg")]
    NoWeights { pa_deg: f64, diameters_m: [f64; 2] },

    #[error(transparent)]
    AwConvFunc(#[from] AwConvFuncError),

    #[error(transparent)]
    Cf(#[from] CfError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

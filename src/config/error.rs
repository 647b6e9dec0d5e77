// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with convolution-function configuration.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Argument file '{file}' doesn't have a recognised file extension! Valid extensions are: {valid}")]
    BadExtension { file: PathBuf, valid: String },

    #[error("Couldn't decode {kind} structure from {file}:\n{err}")]
    Decode {
        kind: &'static str,
        file: PathBuf,
        err: String,
    },

    #[error("The oversampling factor must be positive")]
    ZeroOversampling,

    #[error("The convolution buffer size ({conv_size}) must be at least 4 and no smaller than the oversampling factor ({oversampling})")]
    ConvSizeTooSmall { conv_size: usize, oversampling: usize },

    #[error("The support threshold must be between 0 and 1 (exclusive); got {0}")]
    BadSupportThreshold(f64),

    #[error("The support guard factor can't be negative; got {0}")]
    NegativeGuardFactor(f64),

    #[error("The parallactic-angle steps must be positive and finite; got {pastep} and {rotpastep} deg")]
    BadPaStep { pastep: f64, rotpastep: f64 },

    #[error("No array was described; an [array] table is needed")]
    NoArray,

    #[error("No image was described; an [image] table is needed")]
    NoImage,

    #[error("The image must have a positive size and cell size; got {size} pixels of {cell_arcsec} arcsec")]
    BadImage { size: usize, cell_arcsec: f64 },

    #[error("Couldn't encode the configuration as toml: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error(transparent)]
    Pol(#[from] crate::pol::PolError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all awcf-related errors. This should be the *only* error
//! enum that is publicly visible from the command line.

use thiserror::Error;

use super::make_cache::MakeCacheArgsError;
use crate::{
    awconvfunc::AwConvFuncError,
    cache::CacheError,
    cf::{CfError, PersistError},
    config::ConfigError,
    coord::CoordError,
    pol::PolError,
    terms::TermError,
};

/// The *only* publicly visible error from awcf. Messages carry a hint where
/// one helps.
#[derive(Error, Debug)]
pub enum AwcfError {
    /// An error in the options or the argument file.
    #[error("{0}\n\nRun with --help to see every option; argument files are toml or json.")]
    Config(String),

    /// An error relating visibility correlations to image Stokes parameters.
    #[error("{0}\n\nThe image Stokes parameters must be formable from the visibility correlations.")]
    Polarisation(String),

    /// An error while making or filling a convolution function.
    #[error("{0}")]
    Kernel(String),

    /// An error in a CF cache on disk.
    #[error("{0}\n\nIf the cache was written by an older awcf, remove the cache directory and make it again.")]
    Cache(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<MakeCacheArgsError> for AwcfError {
    fn from(e: MakeCacheArgsError) -> Self {
        match e {
            MakeCacheArgsError::NoCacheDir => Self::Config(e.to_string()),
        }
    }
}

impl From<ConfigError> for AwcfError {
    fn from(e: ConfigError) -> Self {
        let s = e.to_string();
        match e {
            ConfigError::BadExtension { .. }
            | ConfigError::Decode { .. }
            | ConfigError::ZeroOversampling
            | ConfigError::ConvSizeTooSmall { .. }
            | ConfigError::BadSupportThreshold(_)
            | ConfigError::NegativeGuardFactor(_)
            | ConfigError::BadPaStep { .. }
            | ConfigError::NoArray
            | ConfigError::NoImage
            | ConfigError::BadImage { .. }
            | ConfigError::Encode(_) => Self::Config(s),
            ConfigError::Pol(e) => Self::from(e),
            ConfigError::IO(e) => Self::from(e),
        }
    }
}

impl From<CacheError> for AwcfError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::NoWeights { .. } => Self::Cache(e.to_string()),
            CacheError::AwConvFunc(e) => Self::from(e),
            CacheError::Cf(e) => Self::from(e),
            CacheError::Persist(e) => Self::from(e),
        }
    }
}

impl From<AwConvFuncError> for AwcfError {
    fn from(e: AwConvFuncError) -> Self {
        let s = e.to_string();
        match e {
            AwConvFuncError::BadConvSize { .. } => Self::Config(s),
            AwConvFuncError::NoAntennas
            | AwConvFuncError::ZeroSupport { .. }
            | AwConvFuncError::DegenerateKernel { .. }
            | AwConvFuncError::UnknownMueller(_) => Self::Kernel(s),
            AwConvFuncError::MissingTag { .. } | AwConvFuncError::NoWeightBucket(_) => {
                Self::Cache(s)
            }
            AwConvFuncError::Pol(e) => Self::from(e),
            AwConvFuncError::Term(e) => Self::from(e),
            AwConvFuncError::Coord(e) => Self::from(e),
            AwConvFuncError::Cf(e) => Self::from(e),
            AwConvFuncError::Persist(e) => Self::from(e),
        }
    }
}

impl From<CfError> for AwcfError {
    fn from(e: CfError) -> Self {
        match e {
            CfError::Persist(e) => Self::from(e),
            CfError::Poisoned => Self::Generic(e.to_string()),
            _ => Self::Cache(e.to_string()),
        }
    }
}

impl From<PersistError> for AwcfError {
    fn from(e: PersistError) -> Self {
        match e {
            PersistError::IO(e) => Self::from(e),
            _ => Self::Cache(e.to_string()),
        }
    }
}

impl From<PolError> for AwcfError {
    fn from(e: PolError) -> Self {
        Self::Polarisation(e.to_string())
    }
}

impl From<TermError> for AwcfError {
    fn from(e: TermError) -> Self {
        Self::Kernel(e.to_string())
    }
}

impl From<CoordError> for AwcfError {
    fn from(e: CoordError) -> Self {
        Self::Generic(e.to_string())
    }
}

impl From<std::io::Error> for AwcfError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}

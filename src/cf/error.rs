// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with the convolution-function cache.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CfError {
    #[error("The {0} axis of the CF buffer is empty")]
    EmptyAxis(&'static str),

    #[error("CF cell index {index:?} is out of range for a buffer of shape {shape:?}")]
    CellIndex { index: [usize; 3], shape: [usize; 3] },

    #[error("CF bucket index {index:?} is out of range for a store of shape {shape:?}")]
    BucketIndex { index: [usize; 2], shape: [usize; 2] },

    #[error("There's no CF bucket for a parallactic angle of {pa_deg} deg and dish diameters {diameters_m:?} m")]
    NoBucket { pa_deg: f64, diameters_m: [f64; 2] },

    #[error("A thread panicked while it held the CF store lock")]
    Poisoned,

    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("No CF cache index was found at {0}")]
    MissingIndex(PathBuf),

    #[error("When reading {file}, expected the magic string '{expected}', got '{got}' instead")]
    BadMagic {
        file: String,
        expected: &'static str,
        got: String,
    },

    #[error("When reading {file}, a kernel of {expected} pixels was expected but the file ended early")]
    Truncated { file: String, expected: usize },

    #[error("When reading {file}, cell {index:?} says it has pixels but no shape")]
    NoShape { file: String, index: [usize; 3] },

    #[error("When reading {file}, cell {index:?} is outside the buffer's axes")]
    BadCell { file: String, index: [usize; 3] },

    #[error("When reading {file}, bucket {index:?} is outside the {shape:?} store")]
    BadBucket {
        file: String,
        index: [usize; 2],
        shape: [usize; 2],
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with coordinate systems.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordError {
    #[error("The coordinate system has no direction coordinate (it's probably already in the uv domain)")]
    NoDirection,

    #[error("Cannot make a Fourier-domain coordinate system for a zero-sized kernel")]
    ZeroSize,

    #[error("'{0}' is not a known Stokes or correlation code")]
    UnknownStokesCode(i32),
}

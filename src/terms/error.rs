// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TermError {
    #[error("Got a dish diameter of {0} m; diameters must be positive")]
    BadDiameter(f64),

    #[error("Cannot evaluate an antenna response at a frequency of {0} Hz")]
    BadFrequency(f64),

    #[error("Cannot make terms for a telescope without a name")]
    NoTelescopeName,

    #[error(transparent)]
    Coord(#[from] crate::coord::CoordError),
}

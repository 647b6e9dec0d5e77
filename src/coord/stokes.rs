// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Polarisation products.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use super::CoordError;

/// A feed (receptor) polarisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    R,
    L,
    X,
    Y,
}

impl Feed {
    /// The position of this feed within its basis (R and X are first).
    pub(crate) fn basis_index(self) -> usize {
        match self {
            Feed::R | Feed::X => 0,
            Feed::L | Feed::Y => 1,
        }
    }

    pub(crate) fn is_circular(self) -> bool {
        matches!(self, Feed::R | Feed::L)
    }
}

/// Stokes parameters and correlation products. The discriminants are the
/// codes used by measurement sets and image Stokes axes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[allow(clippy::upper_case_acronyms)]
pub enum Stokes {
    I = 1,
    Q = 2,
    U = 3,
    V = 4,
    RR = 5,
    RL = 6,
    LR = 7,
    LL = 8,
    XX = 9,
    XY = 10,
    YX = 11,
    YY = 12,
}

impl Stokes {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Result<Stokes, CoordError> {
        use strum::IntoEnumIterator;

        Stokes::iter()
            .find(|s| s.code() == code)
            .ok_or(CoordError::UnknownStokesCode(code))
    }

    /// The polarisation product with both feeds swapped to their partners
    /// (RR <-> LL, RL <-> LR, XX <-> YY, XY <-> YX). Sky Stokes parameters are
    /// their own conjugates.
    pub fn conj(self) -> Stokes {
        match self {
            Stokes::RR => Stokes::LL,
            Stokes::LL => Stokes::RR,
            Stokes::RL => Stokes::LR,
            Stokes::LR => Stokes::RL,
            Stokes::XX => Stokes::YY,
            Stokes::YY => Stokes::XX,
            Stokes::XY => Stokes::YX,
            Stokes::YX => Stokes::XY,
            s => s,
        }
    }

    /// The two feeds correlated to make this product, if this is a
    /// correlation product.
    pub fn feeds(self) -> Option<(Feed, Feed)> {
        match self {
            Stokes::RR => Some((Feed::R, Feed::R)),
            Stokes::RL => Some((Feed::R, Feed::L)),
            Stokes::LR => Some((Feed::L, Feed::R)),
            Stokes::LL => Some((Feed::L, Feed::L)),
            Stokes::XX => Some((Feed::X, Feed::X)),
            Stokes::XY => Some((Feed::X, Feed::Y)),
            Stokes::YX => Some((Feed::Y, Feed::X)),
            Stokes::YY => Some((Feed::Y, Feed::Y)),
            _ => None,
        }
    }

    /// Build a correlation product from two feeds of the same basis.
    pub fn from_feeds(p: Feed, q: Feed) -> Option<Stokes> {
        match (p, q) {
            (Feed::R, Feed::R) => Some(Stokes::RR),
            (Feed::R, Feed::L) => Some(Stokes::RL),
            (Feed::L, Feed::R) => Some(Stokes::LR),
            (Feed::L, Feed::L) => Some(Stokes::LL),
            (Feed::X, Feed::X) => Some(Stokes::XX),
            (Feed::X, Feed::Y) => Some(Stokes::XY),
            (Feed::Y, Feed::X) => Some(Stokes::YX),
            (Feed::Y, Feed::Y) => Some(Stokes::YY),
            _ => None,
        }
    }

    /// Is this a parallel-hand product (RR, LL, XX, YY)?
    pub fn is_parallel_hand(self) -> bool {
        matches!(self, Stokes::RR | Stokes::LL | Stokes::XX | Stokes::YY)
    }
}

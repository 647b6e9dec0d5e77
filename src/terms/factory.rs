// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Making terms from what a persisted cache remembers about a kernel.

use log::debug;

use super::*;
use crate::constants::DEFAULT_FEED_LEAKAGE;

/// The three terms of a convolution function, dynamically dispatched.
pub struct TermSet {
    pub aterm: Box<dyn ATermLike>,
    pub psterm: Box<dyn PsTermLike>,
    pub wterm: Box<dyn WTermLike>,
}

impl std::fmt::Debug for TermSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermSet")
            .field("aterm", &self.aterm.name())
            .field("psterm", &self.psterm.name())
            .field("wterm", &self.wterm.name())
            .finish()
    }
}

/// Something that can rebuild the terms for a kernel given the name of the
/// telescope it was made for.
pub trait TermFactory: Send + Sync {
    fn make_terms(
        &self,
        telescope_name: &str,
        conv_size: usize,
        oversampling: usize,
    ) -> Result<TermSet, TermError>;
}

/// Makes [`AiryDishATerm`]s (or [`NoATerm`]s) for any telescope; dish
/// diameters travel with each baseline type, so no telescope database is
/// needed.
#[derive(Debug, Clone, PartialEq)]
pub struct DishTermFactory {
    pub aterm: bool,
    pub psterm: bool,
    pub wterm: bool,

    /// \[radians\]
    pub squint_rad: f64,

    pub leakage: f64,
}

impl Default for DishTermFactory {
    fn default() -> Self {
        DishTermFactory {
            aterm: true,
            psterm: true,
            wterm: true,
            squint_rad: 0.0,
            leakage: DEFAULT_FEED_LEAKAGE,
        }
    }
}

impl TermFactory for DishTermFactory {
    fn make_terms(
        &self,
        telescope_name: &str,
        conv_size: usize,
        oversampling: usize,
    ) -> Result<TermSet, TermError> {
        if telescope_name.is_empty() {
            return Err(TermError::NoTelescopeName);
        }
        let aterm: Box<dyn ATermLike> = if self.aterm {
            Box::new(
                AiryDishATerm::new(telescope_name, conv_size, oversampling)
                    .with_squint(self.squint_rad)
                    .with_leakage(self.leakage),
            )
        } else {
            Box::new(NoATerm::new(telescope_name, conv_size, oversampling))
        };
        let psterm: Box<dyn PsTermLike> = if self.psterm {
            Box::new(ProlateSpheroidal::new())
        } else {
            Box::new(NoPsTerm)
        };
        let wterm: Box<dyn WTermLike> = if self.wterm {
            Box::new(WTerm)
        } else {
            Box::new(NoWTerm)
        };
        let terms = TermSet {
            aterm,
            psterm,
            wterm,
        };
        debug!("Made terms for {telescope_name}: {terms:?}");
        Ok(terms)
    }
}

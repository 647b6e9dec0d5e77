// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Convolution-function generation and caching for wide-band AW-projection
imaging.
 */

pub mod awconvfunc;
pub mod cache;
pub mod cf;
mod cli;
pub mod config;
pub mod constants;
pub mod coord;
pub(crate) mod math;
pub mod pol;
pub mod terms;
pub mod vis;

use crossbeam_utils::atomic::AtomicCell;

// Re-exports.
pub use awconvfunc::{AwConvFunc, AwConvFuncError};
pub use cache::{CacheError, CachePlan, CfCache, FoundCf};
pub use cf::{CfBuffer, CfCell, CfStore2, SharedCfStore};
pub use cli::{Awcf, AwcfError};
pub use config::{CfConfig, CfSettings, ConfigError};
pub use coord::{CoordinateSystem, ImageGeometry, Stokes};
pub use pol::{PolOuterProduct, PolOuterProductKind};
pub use vis::{AntennaInfo, BaselineType, SpwSelection, VisBufferLike, VisBufferSummary};

#[allow(non_camel_case_types)]
pub type c64 = num_complex::Complex64;

lazy_static::lazy_static! {
    /// Should progress bars be drawn? The command line turns these on unless
    /// told otherwise.
    pub static ref PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);
}

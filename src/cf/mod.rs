// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The convolution-function cache hierarchy.
//!
//! A [`CfCell`] is a single kernel. A [`CfBuffer`] holds the kernels of one
//! (parallactic angle, baseline type) bucket, indexed by frequency, w and
//! Mueller element. A [`CfStore2`] is the 2D grid of buckets.
//!
//! Cells and buffers are held behind [`Arc`](std::sync::Arc)s. Anyone holding
//! a clone of one keeps seeing the kernel as it was when they took it;
//! mutation goes through [`Arc::make_mut`](std::sync::Arc::make_mut) and so
//! never disturbs such a reader.

mod buffer;
mod cell;
mod error;
mod persist;
mod store;

pub use buffer::{CfBuffer, CfParams};
pub use cell::{CfCell, CfCellInfo};
pub use error::{CfError, PersistError};
pub use persist::{load_uv_grid, save_uv_grid, WEIGHT_QUALIFIER};
pub use store::{CfStore2, SharedCfStore};

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All constants *must* be double precision. Kernels are computed and stored in
double precision.
 */

pub use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Speed of light \[m/s\].
pub const VEL_C: f64 = 299_792_458.0;

/// Kernel samples with magnitudes below this fraction of the kernel peak are
/// considered to be outside the kernel's support.
pub const DEFAULT_SUPPORT_THRESHOLD: f64 = 1e-3;

/// The guard band around a trimmed kernel, in units of the oversampling
/// factor.
pub const DEFAULT_SUPPORT_GUARD_FACTOR: f64 = 1.5;

/// The default oversampling factor of convolution functions.
pub const DEFAULT_OVERSAMPLING: usize = 20;

/// The default size of the image-domain buffer used to make a convolution
/// function \[pixels\].
pub const DEFAULT_CONV_SIZE: usize = 512;

/// The default parallactic-angle bucket width \[degrees\].
pub const DEFAULT_PA_STEP_DEG: f64 = 360.0;

/// The default parallactic-angle change that triggers kernel rotation
/// \[degrees\].
pub const DEFAULT_ROT_PA_STEP_DEG: f64 = 5.0;

/// Sentinel used when a spectral window has no selected channels.
pub(crate) const MAX_FREQ: f64 = 1e30;

/// Number of hardware threads kept free when fanning out the support search.
pub(crate) const SUPPORT_SEARCH_RESERVED_THREADS: usize = 2;

/// Antenna diameters within this distance of each other \[m\] are treated as
/// the same antenna type.
pub(crate) const DIAMETER_TOLERANCE_M: f64 = 1e-3;

/// The default fractional coupling between the two feeds of an antenna.
pub const DEFAULT_FEED_LEAKAGE: f64 = 0.01;

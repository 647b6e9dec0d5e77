// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Options controlling how convolution functions are made and cached.
//!
//! Every option is optional so that a [`CfConfig`] can come from the command
//! line, from a toml or json file, or from both (see [`CfConfig::merge`]).
//! [`CfConfig::parse`] fills in the defaults and checks the values.

mod error;

pub use error::ConfigError;

use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    str::FromStr,
};

use clap::Parser;
use itertools::Itertools;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use vec1::{vec1, Vec1};

use crate::{
    awconvfunc::SupportParams,
    constants::{
        DEFAULT_CONV_SIZE, DEFAULT_FEED_LEAKAGE, DEFAULT_OVERSAMPLING, DEFAULT_PA_STEP_DEG,
        DEFAULT_ROT_PA_STEP_DEG, DEFAULT_SUPPORT_GUARD_FACTOR, DEFAULT_SUPPORT_THRESHOLD,
    },
    coord::{CoordinateSystem, ImageGeometry, Stokes},
    pol::{PolOuterProduct, PolOuterProductKind},
    terms::DishTermFactory,
    vis::{AntennaInfo, SpwSelection, VisBufferSummary},
};

lazy_static::lazy_static! {
    pub(crate) static ref ARG_FILE_TYPES_COMMA_SEPARATED: String = ArgFileTypes::iter().join(", ");

    pub(crate) static ref ARG_FILE_HELP: String =
        format!("All options may be specified in a file. Any CLI arguments override options set in the file. Supported formats: {}", *ARG_FILE_TYPES_COMMA_SEPARATED);

    static ref PASTEP_HELP: String =
        format!("Parallactic angles closer than this share convolution functions [degrees]. Default: {DEFAULT_PA_STEP_DEG}");

    static ref ROTPASTEP_HELP: String =
        format!("Rotate convolution functions when the parallactic angle moves by more than this [degrees]. Default: {DEFAULT_ROT_PA_STEP_DEG}");

    static ref SUPPORT_THRESHOLD_HELP: String =
        format!("Kernel samples below this fraction of the peak are outside the support. Default: {DEFAULT_SUPPORT_THRESHOLD}");

    static ref SUPPORT_GUARD_FACTOR_HELP: String =
        format!("The guard band kept around a trimmed kernel, in units of the oversampling. Default: {DEFAULT_SUPPORT_GUARD_FACTOR}");

    static ref OVERSAMPLING_HELP: String =
        format!("The oversampling factor of the convolution functions. Default: {DEFAULT_OVERSAMPLING}");

    static ref CONV_SIZE_HELP: String =
        format!("The size of the image-domain buffer convolution functions are made in [pixels]. Default: {DEFAULT_CONV_SIZE}");
}

#[derive(Debug, Display, EnumIter, EnumString)]
pub(crate) enum ArgFileTypes {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

/// A synthetic array: enough to plan and fill convolution functions without
/// any visibilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayConfig {
    pub telescope: String,

    /// One entry per antenna \[metres\].
    pub dish_diameters_m: Vec1<f64>,

    /// The correlations of the visibilities, e.g. `["RR", "LL"]`.
    pub correlations: Vec1<Stokes>,

    /// \[Hz\]
    pub channels_hz: Vec1<f64>,

    /// Kernels are made for each of these \[degrees\]. Default: 0.
    #[serde(default)]
    pub parallactic_angles_deg: Vec<f64>,

    /// The separation of the R and L beams \[arcsec\].
    #[serde(default)]
    pub squint_arcsec: f64,

    #[serde(default = "default_leakage")]
    pub leakage: f64,
}

fn default_leakage() -> f64 {
    DEFAULT_FEED_LEAKAGE
}

/// The sky image the kernels are for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// The image is `size` x `size` pixels.
    pub size: usize,

    pub cell_arcsec: f64,

    /// (RA, Dec) \[degrees\]
    #[serde(default)]
    pub phase_centre_deg: [f64; 2],

    /// Default: the middle of the array's channels.
    pub ref_freq_hz: Option<f64>,

    #[serde(default = "default_image_stokes")]
    pub stokes: Vec1<Stokes>,
}

fn default_image_stokes() -> Vec1<Stokes> {
    vec1![Stokes::I]
}

#[derive(Parser, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CfConfig {
    /// The number of w-projection planes. One (the default) switches w
    /// projection off.
    #[clap(long, help_heading = "CONVOLUTION FUNCTIONS")]
    pub wprojplanes: Option<usize>,

    /// The directory the convolution functions are cached in.
    #[clap(long, parse(from_os_str), help_heading = "CONVOLUTION FUNCTIONS")]
    pub cfcachedir: Option<PathBuf>,

    /// Apply the prolate-spheroidal anti-aliasing taper. Default: true
    #[clap(long, help_heading = "TERMS")]
    pub psterm: Option<bool>,

    /// Apply the antenna response. Default: true
    #[clap(long, help_heading = "TERMS")]
    pub aterm: Option<bool>,

    /// Make kernels for the off-diagonal Mueller elements too. Default: false
    #[clap(long, help_heading = "TERMS")]
    pub mterm: Option<bool>,

    /// Make kernels at every selected spectral window rather than only at the
    /// image reference frequency. Default: false
    #[clap(long, help_heading = "TERMS")]
    pub wbawp: Option<bool>,

    /// Evaluate the conjugate-polarisation beam at the conjugate frequency.
    /// Default: true
    #[clap(long, help_heading = "TERMS")]
    pub conjbeams: Option<bool>,

    #[clap(long, help = PASTEP_HELP.as_str(), help_heading = "PARALLACTIC ANGLE")]
    pub pastep: Option<f64>,

    #[clap(long, help = ROTPASTEP_HELP.as_str(), help_heading = "PARALLACTIC ANGLE")]
    pub rotpastep: Option<f64>,

    #[clap(long, help = SUPPORT_THRESHOLD_HELP.as_str(), help_heading = "SUPPORT")]
    pub support_threshold: Option<f64>,

    #[clap(long, help = SUPPORT_GUARD_FACTOR_HELP.as_str(), help_heading = "SUPPORT")]
    pub support_guard_factor: Option<f64>,

    #[clap(long, help = OVERSAMPLING_HELP.as_str(), help_heading = "CONVOLUTION FUNCTIONS")]
    pub oversampling: Option<usize>,

    #[clap(long, help = CONV_SIZE_HELP.as_str(), help_heading = "CONVOLUTION FUNCTIONS")]
    pub conv_size: Option<usize>,

    /// Draw progress bars. Only settable in a file; the command line has
    /// --no-progress-bars.
    #[clap(skip)]
    #[serde(default)]
    pub progress_bars: Option<bool>,

    #[clap(skip)]
    #[serde(default)]
    pub array: Option<ArrayConfig>,

    #[clap(skip)]
    #[serde(default)]
    pub image: Option<ImageConfig>,
}

impl CfConfig {
    /// Read a configuration from a toml or json file, chosen by the file's
    /// extension.
    pub fn from_file(file: &Path) -> Result<CfConfig, ConfigError> {
        debug!("Attempting to parse argument file {}", file.display());

        let file_type = file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .and_then(|e| ArgFileTypes::from_str(&e).ok());
        let mut contents = String::new();
        let decode_err = |kind, err: String| ConfigError::Decode {
            kind,
            file: file.to_path_buf(),
            err,
        };
        match file_type {
            Some(ArgFileTypes::Toml) => {
                debug!("Parsing toml file...");
                File::open(file)?.read_to_string(&mut contents)?;
                toml::from_str(&contents).map_err(|e| decode_err("toml", e.to_string()))
            }
            Some(ArgFileTypes::Json) => {
                debug!("Parsing json file...");
                File::open(file)?.read_to_string(&mut contents)?;
                serde_json::from_str(&contents).map_err(|e| decode_err("json", e.to_string()))
            }
            None => Err(ConfigError::BadExtension {
                file: file.to_path_buf(),
                valid: ARG_FILE_TYPES_COMMA_SEPARATED.clone(),
            }),
        }
    }

    /// Combine two configurations, preferring `self` (normally the command
    /// line) wherever both say something.
    pub fn merge(self, other: CfConfig) -> CfConfig {
        CfConfig {
            wprojplanes: self.wprojplanes.or(other.wprojplanes),
            cfcachedir: self.cfcachedir.or(other.cfcachedir),
            psterm: self.psterm.or(other.psterm),
            aterm: self.aterm.or(other.aterm),
            mterm: self.mterm.or(other.mterm),
            wbawp: self.wbawp.or(other.wbawp),
            conjbeams: self.conjbeams.or(other.conjbeams),
            pastep: self.pastep.or(other.pastep),
            rotpastep: self.rotpastep.or(other.rotpastep),
            support_threshold: self.support_threshold.or(other.support_threshold),
            support_guard_factor: self.support_guard_factor.or(other.support_guard_factor),
            oversampling: self.oversampling.or(other.oversampling),
            conv_size: self.conv_size.or(other.conv_size),
            progress_bars: self.progress_bars.or(other.progress_bars),
            array: self.array.or(other.array),
            image: self.image.or(other.image),
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Fill in the defaults and check the values.
    pub fn parse(self) -> Result<CfSettings, ConfigError> {
        let CfConfig {
            wprojplanes,
            cfcachedir,
            psterm,
            aterm,
            mterm,
            wbawp,
            conjbeams,
            pastep,
            rotpastep,
            support_threshold,
            support_guard_factor,
            oversampling,
            conv_size,
            progress_bars,
            array,
            image,
        } = self;

        let w_planes = match wprojplanes {
            Some(0) => {
                warn!("wprojplanes was 0; using 1 (no w projection)");
                1
            }
            Some(n) => n,
            None => 1,
        };

        let oversampling = oversampling.unwrap_or(DEFAULT_OVERSAMPLING);
        if oversampling == 0 {
            return Err(ConfigError::ZeroOversampling);
        }
        let conv_size = conv_size.unwrap_or(DEFAULT_CONV_SIZE);
        if conv_size < 4 || conv_size < oversampling {
            return Err(ConfigError::ConvSizeTooSmall {
                conv_size,
                oversampling,
            });
        }

        let threshold = support_threshold.unwrap_or(DEFAULT_SUPPORT_THRESHOLD);
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(ConfigError::BadSupportThreshold(threshold));
        }
        let guard_factor = support_guard_factor.unwrap_or(DEFAULT_SUPPORT_GUARD_FACTOR);
        if guard_factor < 0.0 || !guard_factor.is_finite() {
            return Err(ConfigError::NegativeGuardFactor(guard_factor));
        }

        let pastep = pastep.unwrap_or(DEFAULT_PA_STEP_DEG);
        let rotpastep = rotpastep.unwrap_or(DEFAULT_ROT_PA_STEP_DEG);
        if !(pastep > 0.0 && pastep.is_finite() && rotpastep > 0.0 && rotpastep.is_finite()) {
            return Err(ConfigError::BadPaStep { pastep, rotpastep });
        }

        if let Some(image) = &image {
            if image.size == 0 || !(image.cell_arcsec > 0.0) {
                return Err(ConfigError::BadImage {
                    size: image.size,
                    cell_arcsec: image.cell_arcsec,
                });
            }
        }

        Ok(CfSettings {
            w_planes,
            cache_dir: cfcachedir,
            psterm: psterm.unwrap_or(true),
            aterm: aterm.unwrap_or(true),
            mterm: mterm.unwrap_or(false),
            wb_awp: wbawp.unwrap_or(false),
            conj_beams: conjbeams.unwrap_or(true),
            pa_step_rad: pastep.to_radians(),
            rot_pa_step_rad: rotpastep.to_radians(),
            support: SupportParams {
                threshold,
                guard_factor,
            },
            oversampling,
            conv_size,
            progress_bars: progress_bars.unwrap_or(true),
            array,
            image,
        })
    }
}

/// A checked [`CfConfig`] with every default filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct CfSettings {
    pub w_planes: usize,
    pub cache_dir: Option<PathBuf>,
    pub psterm: bool,
    pub aterm: bool,
    pub mterm: bool,
    pub wb_awp: bool,
    pub conj_beams: bool,

    /// \[radians\]
    pub pa_step_rad: f64,

    /// \[radians\]
    pub rot_pa_step_rad: f64,

    pub support: SupportParams,
    pub oversampling: usize,
    pub conv_size: usize,
    pub progress_bars: bool,
    pub array: Option<ArrayConfig>,
    pub image: Option<ImageConfig>,
}

impl CfSettings {
    pub fn pol_kind(&self) -> PolOuterProductKind {
        if self.mterm {
            PolOuterProductKind::Full
        } else {
            PolOuterProductKind::Diagonal
        }
    }

    /// The factory that makes the terms these settings ask for. w projection
    /// is only on with more than one w-plane.
    pub fn term_factory(&self) -> DishTermFactory {
        let (squint_arcsec, leakage) = match &self.array {
            Some(a) => (a.squint_arcsec, a.leakage),
            None => (0.0, DEFAULT_FEED_LEAKAGE),
        };
        DishTermFactory {
            aterm: self.aterm,
            psterm: self.psterm,
            wterm: self.w_planes > 1,
            squint_rad: (squint_arcsec / 3600.0).to_radians(),
            leakage,
        }
    }

    fn array(&self) -> Result<&ArrayConfig, ConfigError> {
        self.array.as_ref().ok_or(ConfigError::NoArray)
    }

    pub fn pol_outer_product(&self) -> Result<PolOuterProduct, ConfigError> {
        Ok(PolOuterProduct::new(
            self.array()?.correlations.as_slice(),
            self.pol_kind(),
        )?)
    }

    pub fn image_geometry(&self) -> Result<ImageGeometry, ConfigError> {
        let image = self.image.as_ref().ok_or(ConfigError::NoImage)?;
        let channels = &self.array()?.channels_hz;
        let ref_freq_hz = image.ref_freq_hz.unwrap_or_else(|| {
            let (lo, hi) = channels
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &f| {
                    (lo.min(f), hi.max(f))
                });
            0.5 * (lo + hi)
        });
        let freq_increment_hz = match channels.as_slice() {
            [a, b, ..] => b - a,
            _ => 1.0,
        };
        Ok(ImageGeometry {
            coords: CoordinateSystem::new_sky(
                [
                    image.phase_centre_deg[0].to_radians(),
                    image.phase_centre_deg[1].to_radians(),
                ],
                (image.cell_arcsec / 3600.0).to_radians(),
                image.size,
                image.size,
                ref_freq_hz,
                freq_increment_hz,
                image.stokes.to_vec(),
            ),
            shape: [image.size, image.size],
        })
    }

    /// One visibility summary per parallactic angle of the array.
    pub fn vis_buffers(&self) -> Result<Vec<VisBufferSummary>, ConfigError> {
        let array = self.array()?;
        let antennas: Vec<AntennaInfo> = array
            .dish_diameters_m
            .iter()
            .enumerate()
            .map(|(i, &d)| AntennaInfo {
                name: format!("{}{i:03}", array.telescope),
                diameter_m: d,
            })
            .collect();
        let pas = if array.parallactic_angles_deg.is_empty() {
            vec![0.0]
        } else {
            array.parallactic_angles_deg.clone()
        };
        Ok(pas
            .into_iter()
            .map(|pa| {
                VisBufferSummary::all_baselines(
                    &array.telescope,
                    antennas.clone(),
                    array.channels_hz.to_vec(),
                    pa.to_radians(),
                )
            })
            .collect())
    }

    /// Every channel of the array, selected.
    pub fn freq_selection(&self) -> Result<Vec<SpwSelection>, ConfigError> {
        let array = self.array()?;
        Ok(vec![SpwSelection {
            spw: 0,
            chan_freqs_hz: array.channels_hz.to_vec(),
            selected_channels: (0..array.channels_hz.len()).collect(),
        }])
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Command-line interface code. More specific options for `awcf`
//! subcommands are contained in modules.
//!
//! Only 3 things should be public in this module: `Awcf`, `Awcf::run`, and
//! `AwcfError`.

mod error;
mod fill_cache;
mod inspect;
mod make_cache;

pub use error::AwcfError;

use std::path::{Path, PathBuf};

use clap::{AppSettings, Args, Parser, Subcommand};
use log::{debug, info};

use crate::{
    config::{CfConfig, ConfigError},
    PROGRESS_BARS,
};

#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    about = "Make, fill and inspect caches of AW-projection convolution functions"
)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_subcommands = true)]
#[clap(propagate_version = true)]
#[clap(infer_long_args = true)]
pub struct Awcf {
    #[clap(flatten)]
    global_opts: GlobalArgs,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Don't draw progress bars.
    #[clap(long)]
    #[clap(global = true)]
    no_progress_bars: bool,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    #[clap(global = true)]
    verbosity: u8,

    /// Only verify that arguments were correctly ingested and print out
    /// high-level information.
    #[clap(long)]
    #[clap(global = true)]
    dry_run: bool,

    /// Save the input arguments into a new TOML file that can be used to
    /// reproduce this run.
    #[clap(long)]
    #[clap(global = true)]
    save_toml: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
#[clap(arg_required_else_help = true)]
enum Command {
    #[clap(alias = "make")]
    #[clap(about = "Make the convolution functions of a synthetic array and write them to a CF cache.")]
    MakeCache(make_cache::MakeCacheArgs),

    #[clap(alias = "fill")]
    #[clap(about = "Compute the pixels of every empty convolution function in a CF cache.")]
    FillCache(fill_cache::FillCacheArgs),

    #[clap(about = "Print a summary of a CF cache.")]
    Inspect(inspect::InspectArgs),
}

impl Awcf {
    pub fn run(self) -> Result<(), AwcfError> {
        // Set up logging.
        let GlobalArgs {
            verbosity,
            dry_run,
            no_progress_bars,
            save_toml,
        } = self.global_opts;
        setup_logging(verbosity).expect("Failed to initialise logging.");
        // Enable progress bars if the user didn't say "no progress bars".
        if !no_progress_bars {
            PROGRESS_BARS.store(true);
        }

        let sub_command = match &self.command {
            Command::MakeCache(_) => "make-cache",
            Command::FillCache(_) => "fill-cache",
            Command::Inspect(_) => "inspect",
        };
        info!("awcf {} {}", sub_command, env!("CARGO_PKG_VERSION"));

        match self.command {
            Command::MakeCache(args) => args.run(dry_run, save_toml.as_deref())?,
            Command::FillCache(args) => args.run(dry_run, save_toml.as_deref())?,
            Command::Inspect(args) => args.run()?,
        }

        info!("awcf {} complete.", sub_command);
        Ok(())
    }
}

/// Consolidate the command-line options with those of an argument file,
/// preferring the command line.
fn merge_arg_file(cli_args: CfConfig, args_file: Option<&Path>) -> Result<CfConfig, ConfigError> {
    match args_file {
        Some(f) => {
            debug!("Merging command-line arguments with the argument file");
            Ok(cli_args.merge(CfConfig::from_file(f)?))
        }
        None => Ok(cli_args),
    }
}

fn save_args(args: &CfConfig, save_toml: Option<&Path>) -> Result<(), AwcfError> {
    if let Some(toml) = save_toml {
        use std::{
            fs::File,
            io::{BufWriter, Write},
        };

        let mut f = BufWriter::new(File::create(toml)?);
        f.write_all(args.to_toml()?.as_bytes())?;
        info!("Saved the arguments to {}", toml.display());
    }
    Ok(())
}

/// Activate a logger. All log messages are put onto `stdout`. `env_logger`
/// automatically only uses colours and fancy symbols if we're on a tty (e.g. a
/// terminal); piped output will be formatted sensibly. Source code lines are
/// displayed in log messages when verbosity >= 3.
fn setup_logging(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.init();

    Ok(())
}

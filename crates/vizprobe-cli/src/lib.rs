//! Vizprobe CLI library
//!
//! Command-line front end for running declarative scenarios through the
//! vizprobe harness.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, Commands, ConfigArgs, HarnessArgs, RunArgs, ValidateArgs};
pub use config::{resolve_harness_config, CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{render_step, Reporter};
#[cfg(feature = "browser")]
pub use runner::run_scenarios;
pub use runner::{load_scenarios, LoadedScenario};

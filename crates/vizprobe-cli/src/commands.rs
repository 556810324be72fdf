//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Vizprobe: run declarative browser scenarios against visualization pages
#[derive(Parser, Debug)]
#[command(name = "vizprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenarios in a browser
    Run(RunArgs),

    /// Parse and validate scenarios without running them
    Validate(ValidateArgs),

    /// Show the effective harness configuration
    Config(ConfigArgs),
}

/// Harness configuration sources shared by subcommands
#[derive(Parser, Debug, Clone, Default)]
pub struct HarnessArgs {
    /// Harness configuration file (YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Base URL that relative scenario URLs resolve against
    #[arg(long, env = "VIZPROBE_BASE_URL")]
    pub base_url: Option<String>,

    /// Default wait timeout in milliseconds
    #[arg(long)]
    pub wait_timeout: Option<u64>,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Scenario files
    #[arg(required = true)]
    pub scenarios: Vec<PathBuf>,

    /// Configuration sources
    #[command(flatten)]
    pub harness: HarnessArgs,

    /// Print reports as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Chromium executable
    #[arg(long)]
    pub chromium: Option<String>,

    /// Disable the Chromium sandbox (containers, CI)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Stop after the first failing scenario
    #[arg(long)]
    pub fail_fast: bool,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Scenario files
    #[arg(required = true)]
    pub scenarios: Vec<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Configuration sources
    #[command(flatten)]
    pub harness: HarnessArgs,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::parse_from([
            "vizprobe",
            "run",
            "set.yaml",
            "queue.yaml",
            "--base-url",
            "http://localhost:8080",
            "--json",
            "--no-sandbox",
        ]);
        if let Commands::Run(args) = cli.command {
            assert_eq!(args.scenarios.len(), 2);
            assert_eq!(
                args.harness.base_url.as_deref(),
                Some("http://localhost:8080")
            );
            assert!(args.json);
            assert!(args.no_sandbox);
            assert!(!args.headed);
        } else {
            panic!("expected Run command");
        }
    }

    #[test]
    fn test_run_requires_a_scenario() {
        assert!(Cli::try_parse_from(["vizprobe", "run"]).is_err());
    }

    #[test]
    fn test_parse_validate_command() {
        let cli = Cli::parse_from(["vizprobe", "validate", "a.yaml"]);
        assert!(matches!(cli.command, Commands::Validate(_)));
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["vizprobe", "-vv", "--color", "never", "config"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.color, ColorArg::Never));
        if let Commands::Config(args) = cli.command {
            assert!(args.harness.config.is_none());
        } else {
            panic!("expected Config command");
        }
    }
}

//! Vizprobe CLI: run browser scenarios from the command line
//!
//! ## Usage
//!
//! ```bash
//! vizprobe validate scenarios/*.yaml                       # Parse only
//! vizprobe run scenarios/set.yaml --base-url http://localhost:8080
//! vizprobe run scenarios/*.yaml --json > report.json      # Machine-readable
//! vizprobe config --config vizprobe.yaml                   # Effective settings
//! ```

use clap::Parser;
use std::process::ExitCode;
use vizprobe::logging::{init_tracing, level_for, LogFormat};
use vizprobe_cli::{
    load_scenarios, resolve_harness_config, Cli, CliConfig, CliError, CliResult, ColorChoice,
    Commands, ConfigArgs, Reporter, RunArgs, ValidateArgs, Verbosity,
};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(level_for(cli.verbose, cli.quiet), LogFormat::Text);

    let color: ColorChoice = cli.color.clone().into();
    let config = CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.verbose, cli.quiet))
        .with_color(color);
    let reporter = Reporter::new(&config);

    match cli.command {
        Commands::Run(args) => run_scenarios(&args, &reporter),
        Commands::Validate(args) => run_validate(&args, &reporter),
        Commands::Config(args) => run_config(&args),
    }
}

fn run_validate(args: &ValidateArgs, reporter: &Reporter) -> CliResult<()> {
    for loaded in load_scenarios(&args.scenarios)? {
        reporter.success(&format!(
            "{}: {} ({} step(s))",
            loaded.path.display(),
            loaded.scenario.name,
            loaded.scenario.steps.len()
        ));
    }
    Ok(())
}

fn run_config(args: &ConfigArgs) -> CliResult<()> {
    let config = resolve_harness_config(&args.harness)?;
    print!("{}", vizprobe::yaml::to_string(&config)?);
    Ok(())
}

#[cfg(feature = "browser")]
fn run_scenarios(args: &RunArgs, reporter: &Reporter) -> CliResult<()> {
    use vizprobe::BrowserConfig;

    let scenarios = load_scenarios(&args.scenarios)?;
    let harness_config = resolve_harness_config(&args.harness)?;
    let mut browser_config = BrowserConfig::default().with_headless(!args.headed);
    if let Some(path) = &args.chromium {
        browser_config = browser_config.with_chromium_path(path.clone());
    }
    if args.no_sandbox {
        browser_config = browser_config.with_no_sandbox();
    }

    reporter.info(&format!("running {} scenario(s)", scenarios.len()));
    let runtime = tokio::runtime::Runtime::new()?;
    let reports = runtime.block_on(vizprobe_cli::run_scenarios(
        &scenarios,
        &harness_config,
        &browser_config,
        args.fail_fast,
        reporter,
    ))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }
    let passed = reports.iter().filter(|r| r.passed).count();
    reporter.summary(passed, reports.len());
    if passed == reports.len() {
        Ok(())
    } else {
        Err(CliError::ScenariosFailed {
            failed: reports.len() - passed,
            total: reports.len(),
        })
    }
}

#[cfg(not(feature = "browser"))]
fn run_scenarios(args: &RunArgs, _reporter: &Reporter) -> CliResult<()> {
    load_scenarios(&args.scenarios)?;
    Err(CliError::BrowserUnavailable)
}

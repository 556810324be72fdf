//! Scenario loading and execution

use crate::error::{CliError, CliResult};
use std::path::{Path, PathBuf};
use vizprobe::Scenario;

/// A parsed scenario and the file it came from
#[derive(Debug, Clone)]
pub struct LoadedScenario {
    /// Source file
    pub path: PathBuf,
    /// Parsed scenario
    pub scenario: Scenario,
}

/// Parse and validate every file, failing on the first invalid one
pub fn load_scenarios(paths: &[PathBuf]) -> CliResult<Vec<LoadedScenario>> {
    paths
        .iter()
        .map(|path| {
            let scenario = Scenario::from_file(path)
                .map_err(|e| CliError::invalid_scenario(display(path), e.to_string()))?;
            Ok(LoadedScenario {
                path: path.clone(),
                scenario,
            })
        })
        .collect()
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(feature = "browser")]
pub use browser::run_scenarios;

#[cfg(feature = "browser")]
mod browser {
    use super::LoadedScenario;
    use crate::error::CliResult;
    use crate::output::Reporter;
    use std::sync::Arc;
    use tracing::info;
    use vizprobe::{
        BrowserConfig, ChromiumDriver, Harness, HarnessConfig, PageDriver, ScenarioReport,
        ScenarioRunner,
    };

    /// Run each scenario in a fresh browser page
    pub async fn run_scenarios(
        scenarios: &[LoadedScenario],
        harness_config: &HarnessConfig,
        browser_config: &BrowserConfig,
        fail_fast: bool,
        reporter: &Reporter,
    ) -> CliResult<Vec<ScenarioReport>> {
        let mut reports = Vec::with_capacity(scenarios.len());
        for loaded in scenarios {
            info!(path = %loaded.path.display(), "launching browser");
            let driver: Arc<dyn PageDriver> =
                Arc::new(ChromiumDriver::launch(browser_config.clone()).await?);
            let harness = Harness::attach_shared(driver, harness_config.clone()).await?;
            let report = ScenarioRunner::new(loaded.scenario.clone())
                .run(&harness)
                .await?;
            harness.teardown().await?;

            reporter.scenario(&report);
            let passed = report.passed;
            reports.push(report);
            if fail_fast && !passed {
                reporter.warning("stopping after first failure (--fail-fast)");
                break;
            }
        }
        Ok(reports)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;

    const VALID: &str = "version: \"1.0\"\nname: smoke\nsteps:\n  - click: \"#go\"\n";

    #[test]
    fn test_load_valid_scenarios() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smoke.yaml");
        fs::write(&path, VALID).unwrap();

        let loaded = load_scenarios(&[path.clone()]).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].path, path);
        assert_eq!(loaded[0].scenario.name, "smoke");
    }

    #[test]
    fn test_invalid_scenario_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "version: \"1.0\"\nname: broken\nsteps: []\n").unwrap();

        let err = load_scenarios(&[path]).unwrap_err();
        assert!(matches!(err, CliError::InvalidScenario { .. }));
        assert!(err.to_string().contains("broken.yaml"));
    }

    #[test]
    fn test_missing_file_is_invalid_scenario() {
        let err = load_scenarios(&[PathBuf::from("/nonexistent/none.yaml")]).unwrap_err();
        assert!(matches!(err, CliError::InvalidScenario { .. }));
    }
}

//! Declarative scenarios: a page test written as YAML.
//!
//! # Example
//!
//! ```yaml
//! version: "1.0"
//! name: "set: insert apple"
//! url: /set.html
//! allow:
//!   - favicon
//! steps:
//!   - fill: { locator: "#valueInput", value: apple }
//!   - click: "#addValueBtn"
//!   - wait_for:
//!       condition:
//!         text_equals: { locator: "#setContents", text: apple }
//!       timeout_ms: 2000
//!   - expect_dialog:
//!       response: accept
//!       message: Please enter a value to add.
//!       then: { action: click, locator: "#addValueBtn" }
//!   - assert_no_errors: {}
//! ```
//!
//! Steps run in order and the run stops at the first failure. A passing run
//! ends with an implicit diagnostics check against the scenario allowlist.

use crate::action::Action;
use crate::condition::Condition;
use crate::diagnostics::{Allowlist, DiagnosticsSink};
use crate::dialog::{Dialog, DialogPolicy, DialogResponse};
use crate::harness::Harness;
use crate::locator::Locator;
use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Supported schema version
pub const SCENARIO_VERSION: &str = "1.0";

const fn default_true() -> bool {
    true
}

const fn default_accept() -> DialogResponse {
    DialogResponse::Accept
}

/// One scenario step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Navigate
    Goto(String),
    /// Fill an input
    Fill {
        /// Target
        locator: Locator,
        /// Value
        value: String,
    },
    /// Click
    Click(Locator),
    /// Press a key
    Press {
        /// Target
        locator: Locator,
        /// Key name
        key: String,
    },
    /// Set checked state
    Check {
        /// Target
        locator: Locator,
        /// Desired state
        #[serde(default = "default_true")]
        checked: bool,
    },
    /// Select an option
    Select {
        /// Target
        locator: Locator,
        /// Option value
        value: String,
    },
    /// Wait for a condition
    WaitFor {
        /// Condition
        condition: Condition,
        /// Override of the wait timeout
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Perform `then` and require that it raises a dialog
    ExpectDialog {
        /// Answer
        #[serde(default = "default_accept")]
        response: DialogResponse,
        /// Exact message the dialog must carry
        #[serde(default)]
        message: Option<String>,
        /// Action raising the dialog
        then: Action,
        /// Override of the dialog timeout
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Fail on error diagnostics outside the allowlists
    AssertNoErrors {
        /// Entries added to the scenario allowlist for this check
        #[serde(default)]
        allow: Vec<String>,
    },
}

impl Step {
    /// The action this step performs, for plain action steps
    #[must_use]
    pub fn action(&self) -> Option<Action> {
        match self {
            Self::Fill { locator, value } => Some(Action::fill(locator.clone(), value.as_str())),
            Self::Click(locator) => Some(Action::click(locator.clone())),
            Self::Press { locator, key } => Some(Action::press(locator.clone(), key.as_str())),
            Self::Check { locator, checked } => Some(Action::check(locator.clone(), *checked)),
            Self::Select { locator, value } => {
                Some(Action::select_option(locator.clone(), value.as_str()))
            }
            Self::Goto(_) | Self::WaitFor { .. } | Self::ExpectDialog { .. } | Self::AssertNoErrors { .. } => {
                None
            }
        }
    }

    /// Short label for reports
    #[must_use]
    pub fn describe(&self) -> String {
        if let Some(action) = self.action() {
            return action.describe();
        }
        match self {
            Self::Goto(url) => format!("goto {url}"),
            Self::WaitFor { condition, .. } => format!("wait for {}", condition.description()),
            Self::ExpectDialog { then, .. } => format!("expect dialog from {}", then.describe()),
            Self::AssertNoErrors { .. } => "assert no unexpected errors".to_string(),
            _ => String::new(),
        }
    }
}

/// A YAML page test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Schema version, must be "1.0"
    pub version: String,
    /// Name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Page opened before the first step
    #[serde(default)]
    pub url: Option<String>,
    /// Tolerated error diagnostics (`/regex/` or substring)
    #[serde(default)]
    pub allow: Vec<String>,
    /// Policy for dialogs no step expects
    #[serde(default)]
    pub dialog_policy: Option<DialogPolicy>,
    /// Steps
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Parse and validate
    pub fn from_yaml(yaml: &str) -> HarnessResult<Self> {
        let scenario: Self = crate::yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Load from a file
    pub fn from_file(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let yaml = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&yaml)
    }

    /// Check version, name, steps and allowlist patterns
    pub fn validate(&self) -> HarnessResult<()> {
        if self.version != SCENARIO_VERSION {
            return Err(HarnessError::scenario(format!(
                "invalid version '{}', expected '{SCENARIO_VERSION}'",
                self.version
            )));
        }
        if self.name.trim().is_empty() {
            return Err(HarnessError::scenario("name must not be empty"));
        }
        if self.steps.is_empty() {
            return Err(HarnessError::scenario(format!(
                "scenario '{}' has no steps",
                self.name
            )));
        }
        self.allowlist()?;
        for (index, step) in self.steps.iter().enumerate() {
            if let Step::AssertNoErrors { allow } = step {
                Allowlist::from_entries(allow).map_err(|e| {
                    HarnessError::scenario(format!("step {}: {e}", index + 1))
                })?;
            }
        }
        Ok(())
    }

    /// The scenario-wide allowlist
    pub fn allowlist(&self) -> HarnessResult<Allowlist> {
        Allowlist::from_entries(&self.allow)
    }

    fn allowlist_with(&self, extra: &[String]) -> HarnessResult<Allowlist> {
        let entries: Vec<&String> = self.allow.iter().chain(extra).collect();
        Allowlist::from_entries(&entries)
    }
}

/// Outcome of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Succeeded
    Passed,
    /// Failed; the run stopped here
    Failed,
    /// Not run because an earlier step failed
    Skipped,
}

/// Report line for one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// Position, starting at 1
    pub index: usize,
    /// What the step does
    pub description: String,
    /// Outcome
    pub status: StepStatus,
    /// Time spent
    pub elapsed_ms: u64,
    /// Failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of running a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub name: String,
    /// Whether every step passed
    pub passed: bool,
    /// Per-step results, including the final diagnostics check
    pub steps: Vec<StepReport>,
    /// Diagnostics captured during the run
    pub diagnostics: DiagnosticsSink,
    /// Dialogs handled during the run
    pub dialogs: Vec<Dialog>,
    /// Total time
    pub elapsed_ms: u64,
}

impl ScenarioReport {
    /// Failed steps
    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| s.status == StepStatus::Failed)
    }

    /// Pretty JSON
    pub fn to_json(&self) -> HarnessResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Executes a [`Scenario`] through a [`Harness`]
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    scenario: Scenario,
}

impl ScenarioRunner {
    /// Runner for a validated scenario
    #[must_use]
    pub const fn new(scenario: Scenario) -> Self {
        Self { scenario }
    }

    /// The scenario
    #[must_use]
    pub const fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Run every step. Step failures land in the report; only an invalid
    /// allowlist is returned as an error.
    pub async fn run(&self, harness: &Harness) -> HarnessResult<ScenarioReport> {
        let scenario = &self.scenario;
        let allowlist = scenario.allowlist()?;
        if let Some(policy) = &scenario.dialog_policy {
            harness.set_dialog_policy(policy.clone());
        }
        info!(scenario = %scenario.name, steps = scenario.steps.len(), "running scenario");

        let started = Instant::now();
        let mut plan: Vec<Step> = Vec::with_capacity(scenario.steps.len() + 1);
        if let Some(url) = &scenario.url {
            plan.push(Step::Goto(url.clone()));
        }
        plan.extend(scenario.steps.iter().cloned());

        let mut reports = Vec::with_capacity(plan.len() + 1);
        let mut failed = false;
        for (i, step) in plan.iter().enumerate() {
            let description = step.describe();
            if failed {
                reports.push(StepReport {
                    index: i + 1,
                    description,
                    status: StepStatus::Skipped,
                    elapsed_ms: 0,
                    error: None,
                });
                continue;
            }
            let step_started = Instant::now();
            let result = self.execute(harness, step).await;
            let elapsed_ms = step_started.elapsed().as_millis() as u64;
            if let Err(err) = &result {
                warn!(step = i + 1, %description, %err, "step failed");
                failed = true;
            }
            reports.push(StepReport {
                index: i + 1,
                description,
                status: if result.is_ok() {
                    StepStatus::Passed
                } else {
                    StepStatus::Failed
                },
                elapsed_ms,
                error: result.err().map(|e| e.to_string()),
            });
        }

        if !failed {
            let check_started = Instant::now();
            let result = harness.assert_no_unexpected_errors(&allowlist).await;
            failed = result.is_err();
            reports.push(StepReport {
                index: reports.len() + 1,
                description: "final diagnostics check".to_string(),
                status: if failed {
                    StepStatus::Failed
                } else {
                    StepStatus::Passed
                },
                elapsed_ms: check_started.elapsed().as_millis() as u64,
                error: result.err().map(|e| e.to_string()),
            });
        }

        let report = ScenarioReport {
            name: scenario.name.clone(),
            passed: !failed,
            steps: reports,
            diagnostics: harness.collect_diagnostics().await,
            dialogs: harness.dialogs(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(scenario = %scenario.name, passed = report.passed, elapsed_ms = report.elapsed_ms, "scenario finished");
        Ok(report)
    }

    async fn execute(&self, harness: &Harness, step: &Step) -> HarnessResult<()> {
        if let Some(action) = step.action() {
            return harness.perform(&action).await;
        }
        match step {
            Step::Goto(url) => harness.goto(url).await,
            Step::WaitFor {
                condition,
                timeout_ms,
            } => {
                let timeout = timeout_ms
                    .map_or_else(|| harness.config().wait_timeout(), Duration::from_millis);
                harness.wait_for(condition, timeout).await.map(|_| ())
            }
            Step::ExpectDialog {
                response,
                message,
                then,
                timeout_ms,
            } => {
                let interception = harness.intercept_next_dialog(response.clone());
                harness.perform(then).await?;
                let timeout = timeout_ms
                    .map_or_else(|| harness.config().dialog_timeout(), Duration::from_millis);
                let dialog = interception.outcome_within(timeout).await.expect_handled()?;
                match message {
                    Some(expected) if dialog.message() != expected => {
                        Err(HarnessError::scenario(format!(
                            "expected dialog message {expected:?}, got {:?}",
                            dialog.message()
                        )))
                    }
                    _ => Ok(()),
                }
            }
            Step::AssertNoErrors { allow } => {
                let allowlist = self.scenario.allowlist_with(allow)?;
                harness.assert_no_unexpected_errors(&allowlist).await
            }
            _ => Ok(()),
        }
    }
}

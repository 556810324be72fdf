//! Output formatting for scenario results

use crate::config::{CliConfig, Verbosity};
use console::{style, Term};
use vizprobe::{ScenarioReport, StepReport, StepStatus};

/// Writes human-readable results to stderr
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Verbosity
    pub verbosity: Verbosity,
}

impl Reporter {
    /// Reporter for the given CLI configuration
    #[must_use]
    pub fn new(config: &CliConfig) -> Self {
        Self {
            term: Term::stderr(),
            use_color: config.color.should_color(),
            verbosity: config.verbosity,
        }
    }

    fn prefix(&self, styled: console::StyledObject<&str>, plain: &str) -> String {
        if self.use_color {
            styled.bold().to_string()
        } else {
            plain.to_string()
        }
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.verbosity.is_quiet() {
            return;
        }
        self.line(&format!("{} {message}", self.prefix(style("✓").green(), "PASS")));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        self.line(&format!("{} {message}", self.prefix(style("✗").red(), "FAIL")));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.verbosity.is_quiet() {
            return;
        }
        self.line(&format!("{} {message}", self.prefix(style("⚠").yellow(), "WARN")));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.verbosity.is_quiet() {
            return;
        }
        self.line(&format!("{} {message}", self.prefix(style("ℹ").blue(), "INFO")));
    }

    /// Print one scenario report
    pub fn scenario(&self, report: &ScenarioReport) {
        let summary = format!("{} ({}ms)", report.name, report.elapsed_ms);
        if report.passed {
            self.success(&summary);
        } else {
            self.failure(&summary);
        }
        for step in &report.steps {
            if self.verbosity.is_verbose() || step.status == StepStatus::Failed {
                self.line(&format!("    {}", render_step(step)));
            }
        }
        if self.verbosity.is_verbose() {
            for entry in report.diagnostics.entries() {
                self.line(&format!("    {entry}"));
            }
        }
    }

    /// Print the closing summary
    pub fn summary(&self, passed: usize, total: usize) {
        let text = format!("{passed}/{total} scenario(s) passed");
        if passed == total {
            self.success(&text);
        } else {
            self.failure(&text);
        }
    }
}

/// One report line for a step
#[must_use]
pub fn render_step(step: &StepReport) -> String {
    let status = match step.status {
        StepStatus::Passed => "ok",
        StepStatus::Failed => "FAILED",
        StepStatus::Skipped => "skipped",
    };
    match &step.error {
        Some(error) => format!("{:>2}. {} ... {status}: {error}", step.index, step.description),
        None => format!(
            "{:>2}. {} ... {status} ({}ms)",
            step.index, step.description, step.elapsed_ms
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(status: StepStatus, error: Option<&str>) -> StepReport {
        StepReport {
            index: 3,
            description: "click #addValueBtn".to_string(),
            status,
            elapsed_ms: 12,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_render_passed_step() {
        assert_eq!(
            render_step(&step(StepStatus::Passed, None)),
            " 3. click #addValueBtn ... ok (12ms)"
        );
    }

    #[test]
    fn test_render_failed_step_shows_error() {
        let line = render_step(&step(
            StepStatus::Failed,
            Some("Element not found: #addValueBtn (waited 5000ms)"),
        ));
        assert_eq!(
            line,
            " 3. click #addValueBtn ... FAILED: Element not found: #addValueBtn (waited 5000ms)"
        );
    }

    #[test]
    fn test_render_skipped_step() {
        assert!(render_step(&step(StepStatus::Skipped, None)).contains("... skipped"));
    }
}

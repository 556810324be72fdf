//! Runtime diagnostics captured from the page under test.
//!
//! The [`DiagnosticsSink`] is an append-only, ordered log of console messages
//! and uncaught page errors. Only the harness event pump appends to it; test
//! code reads snapshots at assertion time.

use crate::result::{HarnessError, HarnessResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Console message severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// console.debug
    Debug,
    /// console.log
    Log,
    /// console.info
    Info,
    /// console.warn
    Warning,
    /// console.error, console.assert failures, uncaught exceptions
    Error,
}

impl Severity {
    /// Map a console API type name ("log", "warning", "error", ...) to a severity.
    ///
    /// Unknown types (table, dir, trace, ...) are treated as plain logs.
    #[must_use]
    pub fn from_console_type(kind: &str) -> Self {
        match kind.to_ascii_lowercase().as_str() {
            "debug" | "verbose" => Self::Debug,
            "info" => Self::Info,
            "warn" | "warning" => Self::Warning,
            "error" | "assert" => Self::Error,
            _ => Self::Log,
        }
    }

    /// Get the lowercase name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Log => "log",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of diagnostic was captured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A console API call
    Console {
        /// Severity of the call
        severity: Severity,
        /// Rendered message text
        text: String,
    },
    /// An uncaught exception or unhandled rejection
    PageError {
        /// Exception message
        message: String,
        /// Stack trace, when the engine provides one
        stack: Option<String>,
    },
}

/// One captured diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Position in emission order, starting at 0
    pub seq: u64,
    /// Time since the harness attached
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
    /// Payload
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    /// Severity; uncaught page errors are always errors
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match &self.kind {
            DiagnosticKind::Console { severity, .. } => *severity,
            DiagnosticKind::PageError { .. } => Severity::Error,
        }
    }

    /// Message text
    #[must_use]
    pub fn text(&self) -> &str {
        match &self.kind {
            DiagnosticKind::Console { text, .. } => text,
            DiagnosticKind::PageError { message, .. } => message,
        }
    }

    /// Whether this is an uncaught page error
    #[must_use]
    pub const fn is_page_error(&self) -> bool {
        matches!(self.kind, DiagnosticKind::PageError { .. })
    }

    /// Whether this entry has error severity
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::Console { severity, text } => write!(f, "[{severity}] {text}"),
            DiagnosticKind::PageError { message, .. } => write!(f, "[pageerror] {message}"),
        }
    }
}

/// Append-only ordered log of console messages and page errors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsSink {
    entries: Vec<Diagnostic>,
}

impl DiagnosticsSink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a console message
    pub fn record_console(&mut self, severity: Severity, text: impl Into<String>, elapsed: Duration) {
        self.push(
            DiagnosticKind::Console {
                severity,
                text: text.into(),
            },
            elapsed,
        );
    }

    /// Append an uncaught page error
    pub fn record_page_error(
        &mut self,
        message: impl Into<String>,
        stack: Option<String>,
        elapsed: Duration,
    ) {
        self.push(
            DiagnosticKind::PageError {
                message: message.into(),
                stack,
            },
            elapsed,
        );
    }

    fn push(&mut self, kind: DiagnosticKind, elapsed: Duration) {
        let seq = self.entries.len() as u64;
        self.entries.push(Diagnostic { seq, elapsed, kind });
    }

    /// All entries in emission order
    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Console entries only
    pub fn console_messages(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| !d.is_page_error())
    }

    /// Uncaught page errors only
    pub fn page_errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.is_page_error())
    }

    /// Error-severity entries (console errors and page errors)
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.is_error())
    }

    /// Count entries at a given severity
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .iter()
            .filter(|d| d.severity() == severity)
            .count()
    }

    /// Whether any console entry contains `needle`
    #[must_use]
    pub fn console_contains(&self, needle: &str) -> bool {
        self.console_messages().any(|d| d.text().contains(needle))
    }

    /// Error-severity entries not covered by `allowlist`
    #[must_use]
    pub fn unexpected_errors<'a>(&'a self, allowlist: &Allowlist) -> Vec<&'a Diagnostic> {
        self.errors().filter(|d| !allowlist.matches(d)).collect()
    }

    /// Fail if any error-severity entry is not allow-listed
    pub fn check(&self, allowlist: &Allowlist) -> HarnessResult<()> {
        let unexpected = self.unexpected_errors(allowlist);
        if unexpected.is_empty() {
            return Ok(());
        }
        Err(HarnessError::UnexpectedDiagnostic {
            count: unexpected.len(),
            entries: unexpected.iter().map(ToString::to_string).collect(),
        })
    }
}

/// One allowlist entry
#[derive(Debug, Clone)]
pub enum AllowPattern {
    /// Matches when the diagnostic text contains the string
    Substring(String),
    /// Matches when the regex finds a match in the diagnostic text
    Regex(Regex),
}

impl AllowPattern {
    /// Check a diagnostic against this pattern
    #[must_use]
    pub fn matches(&self, diagnostic: &Diagnostic) -> bool {
        match self {
            Self::Substring(s) => diagnostic.text().contains(s.as_str()),
            Self::Regex(re) => re.is_match(diagnostic.text()),
        }
    }
}

/// Error diagnostics that a test tolerates
#[derive(Debug, Clone, Default)]
pub struct Allowlist {
    patterns: Vec<AllowPattern>,
}

impl Allowlist {
    /// Empty allowlist: every error is unexpected
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow errors containing `text`
    #[must_use]
    pub fn allow(mut self, text: impl Into<String>) -> Self {
        self.patterns.push(AllowPattern::Substring(text.into()));
        self
    }

    /// Allow errors matching a regular expression
    pub fn allow_regex(mut self, pattern: &str) -> HarnessResult<Self> {
        let re = Regex::new(pattern)
            .map_err(|e| HarnessError::config(format!("invalid allowlist regex {pattern:?}: {e}")))?;
        self.patterns.push(AllowPattern::Regex(re));
        Ok(self)
    }

    /// Build from textual entries; `/.../` entries are regexes, the rest substrings
    pub fn from_entries<S: AsRef<str>>(entries: &[S]) -> HarnessResult<Self> {
        entries.iter().try_fold(Self::new(), |list, entry| {
            let entry = entry.as_ref();
            match entry
                .strip_prefix('/')
                .and_then(|rest| rest.strip_suffix('/'))
            {
                Some(pattern) if !pattern.is_empty() => list.allow_regex(pattern),
                _ => Ok(list.allow(entry)),
            }
        })
    }

    /// Whether any pattern covers the diagnostic
    #[must_use]
    pub fn matches(&self, diagnostic: &Diagnostic) -> bool {
        self.patterns.iter().any(|p| p.matches(diagnostic))
    }

    /// Number of patterns
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the allowlist is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sink_with(entries: &[(Severity, &str)], page_errors: &[&str]) -> DiagnosticsSink {
        let mut sink = DiagnosticsSink::new();
        for (sev, text) in entries {
            sink.record_console(*sev, *text, Duration::ZERO);
        }
        for msg in page_errors {
            sink.record_page_error(*msg, None, Duration::ZERO);
        }
        sink
    }

    #[test]
    fn test_severity_from_console_type() {
        assert_eq!(Severity::from_console_type("error"), Severity::Error);
        assert_eq!(Severity::from_console_type("assert"), Severity::Error);
        assert_eq!(Severity::from_console_type("warning"), Severity::Warning);
        assert_eq!(Severity::from_console_type("warn"), Severity::Warning);
        assert_eq!(Severity::from_console_type("INFO"), Severity::Info);
        assert_eq!(Severity::from_console_type("table"), Severity::Log);
    }

    #[test]
    fn test_sequence_numbers_follow_emission_order() {
        let sink = sink_with(&[(Severity::Log, "a"), (Severity::Error, "b")], &["c"]);
        let seqs: Vec<u64> = sink.entries().iter().map(|d| d.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(sink.entries()[2].to_string(), "[pageerror] c");
    }

    #[test]
    fn test_page_errors_are_error_severity() {
        let sink = sink_with(&[], &["ReferenceError: x is not defined"]);
        assert_eq!(sink.count(Severity::Error), 1);
        assert_eq!(sink.errors().count(), 1);
        assert_eq!(sink.console_messages().count(), 0);
    }

    #[test]
    fn test_check_with_allowlist() {
        let sink = sink_with(
            &[
                (Severity::Error, "Failed to load resource: favicon.ico"),
                (Severity::Warning, "deprecated"),
            ],
            &[],
        );
        assert!(sink.check(&Allowlist::new()).is_err());
        assert!(sink.check(&Allowlist::new().allow("favicon")).is_ok());

        let list = Allowlist::new().allow_regex(r"^Failed to load").unwrap();
        assert!(sink.check(&list).is_ok());
    }

    #[test]
    fn test_check_reports_every_offender() {
        let sink = sink_with(&[(Severity::Error, "one")], &["two"]);
        match sink.check(&Allowlist::new().allow("zzz")) {
            Err(HarnessError::UnexpectedDiagnostic { count, entries }) => {
                assert_eq!(count, 2);
                assert_eq!(entries, vec!["[error] one", "[pageerror] two"]);
            }
            other => panic!("expected UnexpectedDiagnostic, got {other:?}"),
        }
    }

    #[test]
    fn test_allowlist_from_entries() {
        let list = Allowlist::from_entries(&["favicon", "/^Uncaught \\w+Error/"]).unwrap();
        assert_eq!(list.len(), 2);
        let sink = sink_with(&[], &["Uncaught TypeError: boom"]);
        assert!(sink.check(&list).is_ok());

        assert!(Allowlist::from_entries(&["/([/"]).is_err());
    }

    #[test]
    fn test_json_shape() {
        let sink = sink_with(&[(Severity::Info, "ready")], &[]);
        let json = serde_json::to_value(&sink).unwrap();
        assert_eq!(json["entries"][0]["kind"], "console");
        assert_eq!(json["entries"][0]["severity"], "info");
        assert_eq!(json["entries"][0]["elapsed"], 0);
    }

    proptest! {
        #[test]
        fn prop_empty_allowlist_fails_iff_any_error(
            severities in proptest::collection::vec(0u8..5, 0..20),
            page_errors in 0usize..3,
        ) {
            let mut sink = DiagnosticsSink::new();
            for s in &severities {
                let sev = match s {
                    0 => Severity::Debug,
                    1 => Severity::Log,
                    2 => Severity::Info,
                    3 => Severity::Warning,
                    _ => Severity::Error,
                };
                sink.record_console(sev, "msg", Duration::ZERO);
            }
            for _ in 0..page_errors {
                sink.record_page_error("boom", None, Duration::ZERO);
            }
            let any_error = severities.iter().any(|s| *s >= 4) || page_errors > 0;
            prop_assert_eq!(sink.check(&Allowlist::new()).is_err(), any_error);
            prop_assert_eq!(sink.len(), severities.len() + page_errors);
        }
    }
}

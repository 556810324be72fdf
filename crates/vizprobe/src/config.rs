//! Harness configuration: defaults, YAML files and environment overrides.
//!
//! Precedence, lowest to highest: built-in defaults, YAML file,
//! `VIZPROBE_*` environment variables, explicit `with_*` calls.

use crate::dialog::DialogPolicy;
use crate::result::{HarnessError, HarnessResult};
use crate::wait::{WaitOptions, MIN_POLL_INTERVAL_MS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Base URL override
pub const ENV_BASE_URL: &str = "VIZPROBE_BASE_URL";
/// Action timeout override (ms)
pub const ENV_ACTION_TIMEOUT_MS: &str = "VIZPROBE_ACTION_TIMEOUT_MS";
/// Wait timeout override (ms)
pub const ENV_WAIT_TIMEOUT_MS: &str = "VIZPROBE_WAIT_TIMEOUT_MS";
/// Poll interval override (ms)
pub const ENV_POLL_INTERVAL_MS: &str = "VIZPROBE_POLL_INTERVAL_MS";

/// Timeouts and policies shared by every operation of a harness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Base URL relative navigation is resolved against
    pub base_url: Option<String>,
    /// Bound on locating an actionable element
    pub action_timeout_ms: u64,
    /// Default bound for `wait_for`
    pub wait_timeout_ms: u64,
    /// Default bound for a dialog interception
    pub dialog_timeout_ms: u64,
    /// Bound on a single navigation
    pub navigation_timeout_ms: u64,
    /// Interval between condition checks
    pub poll_interval_ms: u64,
    /// Answer for dialogs nobody intercepted
    pub dialog_policy: DialogPolicy,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            action_timeout_ms: 5_000,
            wait_timeout_ms: 5_000,
            dialog_timeout_ms: 2_000,
            navigation_timeout_ms: 30_000,
            poll_interval_ms: 50,
            dialog_policy: DialogPolicy::FailFast,
        }
    }
}

impl HarnessConfig {
    /// Defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the action timeout
    #[must_use]
    pub const fn with_action_timeout(mut self, ms: u64) -> Self {
        self.action_timeout_ms = ms;
        self
    }

    /// Set the default wait timeout
    #[must_use]
    pub const fn with_wait_timeout(mut self, ms: u64) -> Self {
        self.wait_timeout_ms = ms;
        self
    }

    /// Set the default dialog timeout
    #[must_use]
    pub const fn with_dialog_timeout(mut self, ms: u64) -> Self {
        self.dialog_timeout_ms = ms;
        self
    }

    /// Set the navigation timeout
    #[must_use]
    pub const fn with_navigation_timeout(mut self, ms: u64) -> Self {
        self.navigation_timeout_ms = ms;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the dialog policy
    #[must_use]
    pub fn with_dialog_policy(mut self, policy: DialogPolicy) -> Self {
        self.dialog_policy = policy;
        self
    }

    /// Parse YAML; missing keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> HarnessResult<Self> {
        let config: Self = crate::yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let yaml = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&yaml)
    }

    /// Apply `VIZPROBE_*` overrides from the process environment
    pub fn apply_env(self) -> HarnessResult<Self> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup
    pub fn apply_env_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> HarnessResult<Self> {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|u| !u.trim().is_empty()) {
            self.base_url = Some(url);
        }
        if let Some(ms) = parse_ms(&lookup, ENV_ACTION_TIMEOUT_MS)? {
            self.action_timeout_ms = ms;
        }
        if let Some(ms) = parse_ms(&lookup, ENV_WAIT_TIMEOUT_MS)? {
            self.wait_timeout_ms = ms;
        }
        if let Some(ms) = parse_ms(&lookup, ENV_POLL_INTERVAL_MS)? {
            self.poll_interval_ms = ms;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject zero timeouts and malformed base URLs
    pub fn validate(&self) -> HarnessResult<()> {
        for (name, value) in [
            ("action_timeout_ms", self.action_timeout_ms),
            ("wait_timeout_ms", self.wait_timeout_ms),
            ("dialog_timeout_ms", self.dialog_timeout_ms),
            ("navigation_timeout_ms", self.navigation_timeout_ms),
        ] {
            if value == 0 {
                return Err(HarnessError::config(format!("{name} must be greater than 0")));
            }
        }
        if let Some(base) = &self.base_url {
            if !is_absolute(base) {
                return Err(HarnessError::config(format!(
                    "base_url must be absolute, got {base:?}"
                )));
            }
        }
        Ok(())
    }

    /// Action timeout
    #[must_use]
    pub const fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    /// Default wait timeout
    #[must_use]
    pub const fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    /// Default dialog timeout
    #[must_use]
    pub const fn dialog_timeout(&self) -> Duration {
        Duration::from_millis(self.dialog_timeout_ms)
    }

    /// Navigation timeout
    #[must_use]
    pub const fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Poll interval, clamped to the minimum
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }

    /// Wait options bounded by `timeout`
    #[must_use]
    pub fn wait_options(&self, timeout: Duration) -> WaitOptions {
        WaitOptions::new()
            .with_timeout(timeout.as_millis() as u64)
            .with_poll_interval(self.poll_interval_ms)
    }

    /// Resolve `url` against `base_url` unless it is already absolute
    pub fn resolve_url(&self, url: &str) -> HarnessResult<String> {
        if is_absolute(url) {
            return Ok(url.to_string());
        }
        let base = self.base_url.as_deref().ok_or_else(|| {
            HarnessError::config(format!("relative URL {url:?} needs a base_url"))
        })?;
        Ok(format!(
            "{}/{}",
            base.trim_end_matches('/'),
            url.trim_start_matches('/')
        ))
    }
}

fn is_absolute(url: &str) -> bool {
    url.contains("://") || url.starts_with("about:") || url.starts_with("data:")
}

fn parse_ms(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> HarnessResult<Option<u64>> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|_| HarnessError::config(format!("{key} must be milliseconds, got {raw:?}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::DialogResponse;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.action_timeout(), Duration::from_secs(5));
        assert_eq!(config.wait_timeout(), Duration::from_secs(5));
        assert_eq!(config.dialog_timeout(), Duration::from_secs(2));
        assert_eq!(config.navigation_timeout(), Duration::from_secs(30));
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.dialog_policy, DialogPolicy::FailFast);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial_keeps_defaults() {
        let config = HarnessConfig::from_yaml_str(
            "base_url: http://localhost:8080\nwait_timeout_ms: 2000\ndialog_policy:\n  respond: dismiss\n",
        )
        .unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(config.wait_timeout_ms, 2000);
        assert_eq!(config.action_timeout_ms, 5000);
        assert_eq!(
            config.dialog_policy,
            DialogPolicy::Respond(DialogResponse::Dismiss)
        );
    }

    #[test]
    fn test_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vizprobe.yaml");
        std::fs::write(&path, "poll_interval_ms: 25\n").unwrap();
        let config = HarnessConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.poll_interval_ms, 25);
        assert!(HarnessConfig::from_yaml_file(dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_BASE_URL, "http://127.0.0.1:3000/"),
            (ENV_ACTION_TIMEOUT_MS, "750"),
            (ENV_POLL_INTERVAL_MS, " 20 "),
        ]
        .into_iter()
        .collect();
        let config = HarnessConfig::new()
            .apply_env_from(|k| env.get(k).map(|v| (*v).to_string()))
            .unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://127.0.0.1:3000/"));
        assert_eq!(config.action_timeout_ms, 750);
        assert_eq!(config.poll_interval_ms, 20);
        assert_eq!(config.wait_timeout_ms, 5000);
    }

    #[test]
    fn test_env_rejects_garbage() {
        let result = HarnessConfig::new().apply_env_from(|k| {
            (k == ENV_WAIT_TIMEOUT_MS).then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(HarnessError::Config { .. })));
    }

    #[test]
    fn test_validate() {
        assert!(HarnessConfig::new().with_action_timeout(0).validate().is_err());
        assert!(HarnessConfig::new()
            .with_base_url("localhost:8080")
            .validate()
            .is_err());
        // poll interval is clamped, not rejected
        let config = HarnessConfig::new().with_poll_interval(0);
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval(), Duration::from_millis(MIN_POLL_INTERVAL_MS));
    }

    #[test]
    fn test_resolve_url() {
        let config = HarnessConfig::new().with_base_url("http://localhost:8080/");
        assert_eq!(
            config.resolve_url("/set.html").unwrap(),
            "http://localhost:8080/set.html"
        );
        assert_eq!(
            config.resolve_url("https://example.com/").unwrap(),
            "https://example.com/"
        );
        assert_eq!(config.resolve_url("about:blank").unwrap(), "about:blank");
        assert!(HarnessConfig::new().resolve_url("set.html").is_err());
    }
}

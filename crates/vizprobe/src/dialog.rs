//! Native dialog interception (alert, confirm, prompt, beforeunload).
//!
//! Native dialogs block the page until answered, so every dialog gets an
//! answer. Which answer depends on the [`DialogHandler`] state:
//!
//! 1. an armed one-shot interception ([`DialogInterception`]) is consumed;
//! 2. otherwise a persistent [`DialogPolicy::Respond`] answers it;
//! 3. otherwise ([`DialogPolicy::FailFast`]) the dialog is dismissed and
//!    recorded as unexpected, and the harness fails its next operation.

use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

/// Type of browser dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogType {
    /// Alert dialog (OK button only)
    Alert,
    /// Confirm dialog (OK/Cancel buttons)
    Confirm,
    /// Prompt dialog (text input + OK/Cancel)
    Prompt,
    /// Before unload dialog (Leave/Stay buttons)
    BeforeUnload,
}

impl DialogType {
    /// Parse an engine type name; unknown names are treated as alerts
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "confirm" => Self::Confirm,
            "prompt" => Self::Prompt,
            "beforeunload" => Self::BeforeUnload,
            _ => Self::Alert,
        }
    }
}

impl std::fmt::Display for DialogType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alert => write!(f, "alert"),
            Self::Confirm => write!(f, "confirm"),
            Self::Prompt => write!(f, "prompt"),
            Self::BeforeUnload => write!(f, "beforeunload"),
        }
    }
}

/// Scripted answer to a dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogResponse {
    /// OK / Yes / Leave
    Accept,
    /// OK with prompt text
    AcceptWith(String),
    /// Cancel / No / Stay
    Dismiss,
}

impl DialogResponse {
    /// Whether the dialog is accepted
    #[must_use]
    pub const fn accepts(&self) -> bool {
        !matches!(self, Self::Dismiss)
    }

    /// Prompt text to submit, if any
    #[must_use]
    pub fn prompt_text(&self) -> Option<&str> {
        match self {
            Self::AcceptWith(text) => Some(text),
            _ => None,
        }
    }
}

/// A dialog raised by the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialog {
    dialog_type: DialogType,
    message: String,
    default_value: Option<String>,
    response: Option<DialogResponse>,
}

impl Dialog {
    /// Create a new, unanswered dialog
    #[must_use]
    pub fn new(dialog_type: DialogType, message: impl Into<String>) -> Self {
        Self {
            dialog_type,
            message: message.into(),
            default_value: None,
            response: None,
        }
    }

    /// Create an alert dialog
    #[must_use]
    pub fn alert(message: impl Into<String>) -> Self {
        Self::new(DialogType::Alert, message)
    }

    /// Create a confirm dialog
    #[must_use]
    pub fn confirm(message: impl Into<String>) -> Self {
        Self::new(DialogType::Confirm, message)
    }

    /// Create a prompt dialog
    #[must_use]
    pub fn prompt(message: impl Into<String>, default: Option<String>) -> Self {
        let mut dialog = Self::new(DialogType::Prompt, message);
        dialog.default_value = default;
        dialog
    }

    /// Get dialog type
    #[must_use]
    pub const fn dialog_type(&self) -> DialogType {
        self.dialog_type
    }

    /// Get dialog message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Default value (for prompts)
    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// The answer given, once handled
    #[must_use]
    pub const fn response(&self) -> Option<&DialogResponse> {
        self.response.as_ref()
    }

    fn answered(mut self, response: DialogResponse) -> Self {
        self.response = Some(response);
        self
    }
}

/// What to do with dialogs when no one-shot interception is armed
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogPolicy {
    /// Dismiss and fail the next harness operation with `UnexpectedDialog`
    #[default]
    FailFast,
    /// Answer every dialog the same way for the page's lifetime
    Respond(DialogResponse),
}

/// Result of a one-shot interception
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome {
    /// A dialog arrived and was answered
    Handled(Dialog),
    /// No dialog arrived before the timeout
    NotSeen {
        /// How long the interception waited
        waited: Duration,
    },
}

impl DialogOutcome {
    /// The captured dialog, if one was seen
    #[must_use]
    pub const fn dialog(&self) -> Option<&Dialog> {
        match self {
            Self::Handled(dialog) => Some(dialog),
            Self::NotSeen { .. } => None,
        }
    }

    /// The captured message, if a dialog was seen
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.dialog().map(Dialog::message)
    }

    /// Whether a dialog was seen
    #[must_use]
    pub const fn was_seen(&self) -> bool {
        matches!(self, Self::Handled(_))
    }

    /// Turn `NotSeen` into an error for tests that require the dialog
    pub fn expect_handled(self) -> HarnessResult<Dialog> {
        match self {
            Self::Handled(dialog) => Ok(dialog),
            Self::NotSeen { waited } => Err(HarnessError::DialogNotSeen {
                timeout_ms: waited.as_millis() as u64,
            }),
        }
    }

    /// The captured message, or `DialogNotSeen`
    pub fn expect_message(self) -> HarnessResult<String> {
        self.expect_handled().map(|dialog| dialog.message)
    }
}

/// Pending one-shot interception returned by `Harness::intercept_next_dialog`
#[derive(Debug)]
pub struct DialogInterception {
    rx: oneshot::Receiver<Dialog>,
    default_timeout: Duration,
}

impl DialogInterception {
    /// Wait for the intercepted dialog using the configured dialog timeout
    pub async fn outcome(self) -> DialogOutcome {
        let timeout = self.default_timeout;
        self.outcome_within(timeout).await
    }

    /// Wait at most `timeout` for the intercepted dialog.
    ///
    /// Dropping the interception (including through a timeout) disarms it.
    pub async fn outcome_within(self, timeout: Duration) -> DialogOutcome {
        let started = tokio::time::Instant::now();
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(dialog)) => DialogOutcome::Handled(dialog),
            // Re-armed or harness torn down before a dialog arrived
            Ok(Err(_)) => DialogOutcome::NotSeen {
                waited: started.elapsed(),
            },
            Err(_) => DialogOutcome::NotSeen { waited: timeout },
        }
    }
}

#[derive(Debug, Default)]
struct DialogState {
    armed: Option<(DialogResponse, oneshot::Sender<Dialog>)>,
    policy: DialogPolicy,
    history: Vec<Dialog>,
    unexpected: Vec<Dialog>,
}

/// Shared dialog state between a harness and its event pump
#[derive(Clone, Default)]
pub struct DialogHandler {
    state: Arc<Mutex<DialogState>>,
}

impl DialogHandler {
    /// Create a handler with the given policy
    #[must_use]
    pub fn new(policy: DialogPolicy) -> Self {
        let handler = Self::default();
        handler.set_policy(policy);
        handler
    }

    /// Replace the policy for unarmed dialogs
    pub fn set_policy(&self, policy: DialogPolicy) {
        if let Ok(mut state) = self.state.lock() {
            state.policy = policy;
        }
    }

    /// Current policy
    #[must_use]
    pub fn policy(&self) -> DialogPolicy {
        self.state
            .lock()
            .map(|s| s.policy.clone())
            .unwrap_or_default()
    }

    /// Arm a one-shot interception. Re-arming replaces the previous one.
    #[must_use]
    pub fn arm(&self, response: DialogResponse, default_timeout: Duration) -> DialogInterception {
        let (tx, rx) = oneshot::channel();
        if let Ok(mut state) = self.state.lock() {
            state.armed = Some((response, tx));
        }
        DialogInterception {
            rx,
            default_timeout,
        }
    }

    /// Whether a live one-shot interception is armed
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.state
            .lock()
            .map(|s| s.armed.as_ref().is_some_and(|(_, tx)| !tx.is_closed()))
            .unwrap_or(false)
    }

    /// Decide the answer for an incoming dialog and record it
    pub fn dispatch(&self, dialog: Dialog) -> DialogResponse {
        let Ok(mut state) = self.state.lock() else {
            return DialogResponse::Dismiss;
        };

        if let Some((response, tx)) = state.armed.take() {
            if !tx.is_closed() {
                let handled = dialog.answered(response.clone());
                state.history.push(handled.clone());
                let _ = tx.send(handled);
                return response;
            }
        }

        match state.policy.clone() {
            DialogPolicy::Respond(response) => {
                state.history.push(dialog.answered(response.clone()));
                response
            }
            DialogPolicy::FailFast => {
                let handled = dialog.answered(DialogResponse::Dismiss);
                state.history.push(handled.clone());
                state.unexpected.push(handled);
                DialogResponse::Dismiss
            }
        }
    }

    /// Drain dialogs that arrived with nothing to answer them
    #[must_use]
    pub fn take_unexpected(&self) -> Vec<Dialog> {
        self.state
            .lock()
            .map(|mut s| std::mem::take(&mut s.unexpected))
            .unwrap_or_default()
    }

    /// Every dialog handled so far, in arrival order
    #[must_use]
    pub fn history(&self) -> Vec<Dialog> {
        self.state
            .lock()
            .map(|s| s.history.clone())
            .unwrap_or_default()
    }

    /// Drop any armed interception (its outcome resolves to `NotSeen`)
    pub fn disarm(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.armed = None;
        }
    }
}

impl std::fmt::Debug for DialogHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogHandler")
            .field("policy", &self.policy())
            .field("armed", &self.is_armed())
            .field("handled", &self.history().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_millis(100);

    #[test]
    fn test_type_from_name() {
        assert_eq!(DialogType::from_name("confirm"), DialogType::Confirm);
        assert_eq!(DialogType::from_name("beforeunload"), DialogType::BeforeUnload);
        assert_eq!(DialogType::from_name("Prompt"), DialogType::Prompt);
        assert_eq!(DialogType::from_name("alert"), DialogType::Alert);
        assert_eq!(format!("{}", DialogType::BeforeUnload), "beforeunload");
    }

    #[test]
    fn test_response_accessors() {
        assert!(DialogResponse::Accept.accepts());
        assert!(!DialogResponse::Dismiss.accepts());
        assert_eq!(
            DialogResponse::AcceptWith("42".into()).prompt_text(),
            Some("42")
        );
        assert_eq!(DialogResponse::Accept.prompt_text(), None);
    }

    #[tokio::test]
    async fn test_armed_interception_is_consumed_once() {
        let handler = DialogHandler::default();
        let interception = handler.arm(DialogResponse::Accept, T);
        assert!(handler.is_armed());

        let first = handler.dispatch(Dialog::alert("Please enter a value to add."));
        assert_eq!(first, DialogResponse::Accept);
        assert!(!handler.is_armed());

        let outcome = interception.outcome().await;
        assert_eq!(outcome.message(), Some("Please enter a value to add."));

        let second = handler.dispatch(Dialog::alert("again"));
        assert_eq!(second, DialogResponse::Dismiss);
        let unexpected = handler.take_unexpected();
        assert_eq!(unexpected.len(), 1);
        assert_eq!(unexpected[0].message(), "again");
        assert!(handler.take_unexpected().is_empty());
    }

    #[tokio::test]
    async fn test_not_seen_after_timeout_disarms() {
        let handler = DialogHandler::default();
        let interception = handler.arm(DialogResponse::Accept, T);
        let outcome = interception.outcome_within(Duration::from_millis(5)).await;
        assert_eq!(
            outcome,
            DialogOutcome::NotSeen {
                waited: Duration::from_millis(5)
            }
        );
        assert!(!handler.is_armed());

        // A late dialog is not swallowed by the expired interception
        let response = handler.dispatch(Dialog::confirm("late"));
        assert_eq!(response, DialogResponse::Dismiss);
        assert_eq!(handler.take_unexpected().len(), 1);
    }

    #[tokio::test]
    async fn test_rearm_replaces_previous() {
        let handler = DialogHandler::default();
        let old = handler.arm(DialogResponse::Dismiss, T);
        let new = handler.arm(DialogResponse::AcceptWith("7".into()), T);
        let response = handler.dispatch(Dialog::prompt("Value?", None));
        assert_eq!(response, DialogResponse::AcceptWith("7".into()));
        assert!(!old.outcome().await.was_seen());
        let dialog = new.outcome().await.expect_handled().unwrap();
        assert_eq!(
            dialog.response(),
            Some(&DialogResponse::AcceptWith("7".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_replaced_interception_reports_time_actually_waited() {
        let handler = DialogHandler::default();
        let old = handler.arm(DialogResponse::Accept, T);
        let waiting = tokio::spawn(old.outcome_within(Duration::from_secs(10)));
        tokio::time::sleep(Duration::from_millis(300)).await;
        let _new = handler.arm(DialogResponse::Dismiss, T);

        match waiting.await.unwrap() {
            DialogOutcome::NotSeen { waited } => {
                assert!(waited >= Duration::from_millis(300), "{waited:?}");
                assert!(waited < Duration::from_secs(10), "{waited:?}");
            }
            other => panic!("expected NotSeen, got {other:?}"),
        }
    }

    #[test]
    fn test_persistent_policy_answers_every_dialog() {
        let handler = DialogHandler::new(DialogPolicy::Respond(DialogResponse::Accept));
        for i in 0..3 {
            assert_eq!(
                handler.dispatch(Dialog::confirm(format!("#{i}"))),
                DialogResponse::Accept
            );
        }
        assert_eq!(handler.history().len(), 3);
        assert!(handler.take_unexpected().is_empty());
    }

    #[test]
    fn test_expect_handled_not_seen_is_error() {
        let outcome = DialogOutcome::NotSeen {
            waited: Duration::from_millis(2000),
        };
        match outcome.expect_handled() {
            Err(HarnessError::DialogNotSeen { timeout_ms }) => assert_eq!(timeout_ms, 2000),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_policy_yaml() {
        let policy: DialogPolicy = crate::yaml::from_str("fail_fast").unwrap();
        assert_eq!(policy, DialogPolicy::FailFast);
        let policy: DialogPolicy = crate::yaml::from_str("respond: accept").unwrap();
        assert_eq!(policy, DialogPolicy::Respond(DialogResponse::Accept));
    }

    #[test]
    fn test_handler_debug() {
        let debug = format!("{:?}", DialogHandler::default());
        assert!(debug.contains("DialogHandler"));
        assert!(debug.contains("FailFast"));
    }
}

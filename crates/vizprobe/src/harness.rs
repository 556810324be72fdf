//! The interaction/assertion harness.
//!
//! A [`Harness`] owns one page. It performs user-like actions, polls for
//! conditions, answers native dialogs and keeps the page's console messages
//! and uncaught errors for assertions at the end of a test.
//!
//! ```text
//!  test task                        pump task
//!  ─────────                        ─────────
//!  perform / wait_for / goto        PageEventStream ──► DiagnosticsSink
//!        │                                   └────────► DialogHandler ──► respond
//!        └─ settle() waits until the pump has seen every emitted event
//! ```
//!
//! Events are only captured after [`Harness::attach`] has subscribed, so
//! attach before the navigation whose console output matters.

use crate::action::Action;
use crate::condition::{Condition, PageView};
use crate::config::HarnessConfig;
use crate::diagnostics::{Allowlist, DiagnosticsSink};
use crate::dialog::{Dialog, DialogHandler, DialogInterception, DialogPolicy, DialogResponse};
use crate::driver::{ElementState, PageDriver, PageEvent, PageEventStream};
use crate::locator::{Locator, Selector};
use crate::result::{HarnessError, HarnessResult};
use crate::wait::{self, Poller, WaitResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Drives one page and records what it reports
pub struct Harness {
    driver: Arc<dyn PageDriver>,
    config: HarnessConfig,
    diagnostics: Arc<Mutex<DiagnosticsSink>>,
    dialogs: DialogHandler,
    pump: JoinHandle<()>,
    processed: watch::Receiver<u64>,
    emitted: Arc<AtomicU64>,
    session: Uuid,
    attached_at: Instant,
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("session", &self.session)
            .field("config", &self.config)
            .field("dialogs", &self.dialogs)
            .finish_non_exhaustive()
    }
}

impl Harness {
    /// Take ownership of a driver, subscribe to its events and start the pump.
    ///
    /// Events the page emitted before this call are not captured.
    pub async fn attach<D>(driver: D, config: HarnessConfig) -> HarnessResult<Self>
    where
        D: PageDriver + 'static,
    {
        Self::attach_shared(Arc::new(driver), config).await
    }

    /// Like [`Harness::attach`] for a driver that is already shared
    pub async fn attach_shared(
        driver: Arc<dyn PageDriver>,
        config: HarnessConfig,
    ) -> HarnessResult<Self> {
        config.validate()?;
        let events = driver.subscribe().await?;
        let emitted = events.emitted();
        let (processed_tx, processed) = watch::channel(0);
        let diagnostics = Arc::new(Mutex::new(DiagnosticsSink::new()));
        let dialogs = DialogHandler::new(config.dialog_policy.clone());
        let session = Uuid::new_v4();
        let attached_at = Instant::now();

        let pump = tokio::spawn(run_pump(
            events,
            Arc::clone(&diagnostics),
            dialogs.clone(),
            processed_tx,
            attached_at,
        ));
        info!(%session, "harness attached");

        Ok(Self {
            driver,
            config,
            diagnostics,
            dialogs,
            pump,
            processed,
            emitted,
            session,
            attached_at,
        })
    }

    /// Session id used in log spans
    #[must_use]
    pub const fn session(&self) -> Uuid {
        self.session
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// The page driver
    #[must_use]
    pub fn driver(&self) -> &dyn PageDriver {
        self.driver.as_ref()
    }

    /// Time since attach
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.attached_at.elapsed()
    }

    // ------------------------------------------------------------------
    // Navigation and actions
    // ------------------------------------------------------------------

    /// Navigate, resolving relative URLs against `base_url`
    #[instrument(skip(self), fields(session = %self.session))]
    pub async fn goto(&self, url: &str) -> HarnessResult<()> {
        self.check_dialogs()?;
        let url = self.config.resolve_url(url)?;
        let timeout = self.config.navigation_timeout();
        match tokio::time::timeout(timeout, self.driver.navigate(&url)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(HarnessError::Navigation {
                    url,
                    message: format!("timed out after {}ms", timeout.as_millis()),
                })
            }
        }
        info!(%url, "navigated");
        self.settle().await;
        self.check_dialogs()
    }

    /// Execute one action against the current page.
    ///
    /// The target must be attached, visible and enabled (and editable for
    /// `fill`) within the action timeout. There is no retry once the action
    /// has been dispatched.
    #[instrument(skip(self, action), fields(session = %self.session, action = %action.describe()))]
    pub async fn perform(&self, action: &Action) -> HarnessResult<()> {
        self.check_dialogs()?;
        let locator = action.locator();
        let selector = locator.selector();
        let timeout = locator.timeout().unwrap_or_else(|| self.config.action_timeout());
        self.wait_actionable(selector, action.needs_editable(), timeout)
            .await?;

        match action {
            Action::Fill { value, .. } => self.driver.fill(selector, value).await?,
            Action::Click { .. } => self.driver.click(selector).await?,
            Action::DoubleClick { .. } => self.driver.double_click(selector).await?,
            Action::Press { key, .. } => self.driver.press(selector, key).await?,
            Action::Check { checked, .. } => self.driver.set_checked(selector, *checked).await?,
            Action::SelectOption { value, .. } => {
                self.driver.select_option(selector, value).await?;
            }
        }
        debug!("performed");
        self.settle().await;
        self.check_dialogs()
    }

    /// Fill an input
    pub async fn fill(&self, locator: impl Into<Locator>, value: &str) -> HarnessResult<()> {
        self.perform(&Action::fill(locator, value)).await
    }

    /// Click an element
    pub async fn click(&self, locator: impl Into<Locator>) -> HarnessResult<()> {
        self.perform(&Action::click(locator)).await
    }

    /// Press a key on an element
    pub async fn press(&self, locator: impl Into<Locator>, key: &str) -> HarnessResult<()> {
        self.perform(&Action::press(locator, key)).await
    }

    async fn wait_actionable(
        &self,
        selector: &Selector,
        needs_editable: bool,
        timeout: Duration,
    ) -> HarnessResult<()> {
        let options = self.config.wait_options(timeout);
        let mut poller = Poller::new(&options);
        let state: ElementState = loop {
            let state = self.driver.element_state(selector).await?;
            if state.blocker(needs_editable).is_none() {
                return Ok(());
            }
            if !poller.tick().await {
                break state;
            }
        };

        if state.is_attached() {
            let reason = state.blocker(needs_editable).unwrap_or("not actionable");
            warn!(%selector, reason, "element not interactable");
            Err(HarnessError::ElementNotInteractable {
                selector: selector.to_string(),
                reason: reason.to_string(),
            })
        } else {
            warn!(%selector, "element not found");
            Err(HarnessError::ElementNotFound {
                selector: selector.to_string(),
                timeout_ms: options.timeout_ms,
            })
        }
    }

    // ------------------------------------------------------------------
    // Waiting
    // ------------------------------------------------------------------

    /// Poll `condition` until it holds or `timeout` expires.
    ///
    /// A condition that already holds returns without sleeping. A dialog
    /// nobody intercepted aborts the wait with `UnexpectedDialog`.
    #[instrument(skip(self, condition), fields(session = %self.session, condition = %condition.description()))]
    pub async fn wait_for(
        &self,
        condition: &Condition,
        timeout: Duration,
    ) -> HarnessResult<WaitResult> {
        self.settle().await;
        self.check_dialogs()?;
        let description = condition.description();
        let options = self.config.wait_options(timeout);
        let view = PageView {
            driver: self.driver.as_ref(),
            diagnostics: &self.diagnostics,
        };
        let result = wait::wait_for(&description, &options, move || async move {
            self.check_dialogs()?;
            condition.evaluate(view).await
        })
        .await?;
        debug!(
            elapsed_ms = result.elapsed.as_millis() as u64,
            checks = result.checks,
            "condition met"
        );
        Ok(result)
    }

    /// [`Harness::wait_for`] with the configured wait timeout
    pub async fn wait_for_default(&self, condition: &Condition) -> HarnessResult<WaitResult> {
        self.wait_for(condition, self.config.wait_timeout()).await
    }

    // ------------------------------------------------------------------
    // Dialogs
    // ------------------------------------------------------------------

    /// Arm a one-shot answer for the next dialog.
    ///
    /// Call before the action that raises the dialog. Re-arming replaces an
    /// earlier interception, whose outcome then resolves to `NotSeen`.
    #[must_use = "await the interception's outcome to observe the dialog"]
    pub fn intercept_next_dialog(&self, response: DialogResponse) -> DialogInterception {
        debug!(session = %self.session, ?response, "dialog interception armed");
        self.dialogs.arm(response, self.config.dialog_timeout())
    }

    /// Replace the policy for dialogs nobody intercepted
    pub fn set_dialog_policy(&self, policy: DialogPolicy) {
        self.dialogs.set_policy(policy);
    }

    /// Every dialog handled so far
    #[must_use]
    pub fn dialogs(&self) -> Vec<Dialog> {
        self.dialogs.history()
    }

    fn check_dialogs(&self) -> HarnessResult<()> {
        let mut unexpected = self.dialogs.take_unexpected().into_iter();
        let Some(first) = unexpected.next() else {
            return Ok(());
        };
        for extra in unexpected {
            warn!(dialog_type = %extra.dialog_type(), message = extra.message(), "additional unexpected dialog");
        }
        Err(HarnessError::UnexpectedDialog {
            dialog_type: first.dialog_type().to_string(),
            message: first.message().to_string(),
        })
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Snapshot of every console message and page error captured so far
    pub async fn collect_diagnostics(&self) -> DiagnosticsSink {
        self.settle().await;
        self.snapshot()
    }

    fn snapshot(&self) -> DiagnosticsSink {
        self.diagnostics
            .lock()
            .map(|sink| sink.clone())
            .unwrap_or_default()
    }

    /// Fail if any error-severity diagnostic matches no allowlist pattern
    #[instrument(skip(self, allowlist), fields(session = %self.session))]
    pub async fn assert_no_unexpected_errors(&self, allowlist: &Allowlist) -> HarnessResult<()> {
        self.settle().await;
        self.check_dialogs()?;
        let result = self.snapshot().check(allowlist);
        if let Err(err) = &result {
            warn!(%err, "unexpected diagnostics");
        }
        result
    }

    /// Wait until the pump has processed every event emitted so far.
    ///
    /// Bounded by one poll interval; a late event is picked up by the next
    /// poll of whatever waits on it.
    pub async fn settle(&self) {
        let target = self.emitted.load(Ordering::SeqCst);
        let mut processed = self.processed.clone();
        let caught_up = tokio::time::timeout(
            self.config.poll_interval(),
            processed.wait_for(|seen| *seen >= target),
        )
        .await
        .is_ok_and(|r| r.is_ok());
        if !caught_up {
            debug!(target, "event pump behind after settle");
        }
    }

    // ------------------------------------------------------------------
    // Single-attempt reads
    // ------------------------------------------------------------------

    /// Text content of the first match, without waiting
    pub async fn text_of(&self, locator: impl Into<Locator>) -> HarnessResult<Option<String>> {
        self.driver.text_content(locator.into().selector()).await
    }

    /// Form value of the first match, without waiting
    pub async fn value_of(&self, locator: impl Into<Locator>) -> HarnessResult<Option<String>> {
        self.driver.input_value(locator.into().selector()).await
    }

    /// Number of matches, without waiting
    pub async fn count_of(&self, locator: impl Into<Locator>) -> HarnessResult<usize> {
        Ok(self
            .driver
            .element_state(locator.into().selector())
            .await?
            .count)
    }

    /// Stop the pump and close the page
    pub async fn teardown(self) -> HarnessResult<()> {
        self.pump.abort();
        self.dialogs.disarm();
        info!(session = %self.session, "harness torn down");
        self.driver.close().await
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

async fn run_pump(
    mut events: PageEventStream,
    diagnostics: Arc<Mutex<DiagnosticsSink>>,
    dialogs: DialogHandler,
    processed: watch::Sender<u64>,
    attached_at: Instant,
) {
    let mut seen = 0_u64;
    while let Some(event) = events.recv().await {
        let elapsed = attached_at.elapsed();
        match event {
            PageEvent::Console { severity, text } => {
                debug!(%severity, %text, "console");
                if let Ok(mut sink) = diagnostics.lock() {
                    sink.record_console(severity, text, elapsed);
                }
            }
            PageEvent::PageError { message, stack } => {
                warn!(%message, "page error");
                if let Ok(mut sink) = diagnostics.lock() {
                    sink.record_page_error(message, stack, elapsed);
                }
            }
            PageEvent::Dialog(pending) => {
                let response = dialogs.dispatch(pending.dialog().clone());
                info!(
                    dialog_type = %pending.dialog().dialog_type(),
                    message = pending.dialog().message(),
                    ?response,
                    "dialog answered"
                );
                pending.respond(response);
            }
        }
        seen += 1;
        processed.send_replace(seen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::mock::{Effect, MockDriver, MockElement, Trigger};

    fn fast() -> HarnessConfig {
        HarnessConfig::new()
            .with_action_timeout(200)
            .with_wait_timeout(500)
            .with_dialog_timeout(200)
            .with_poll_interval(10)
    }

    // =========================================================================
    // Actions
    // =========================================================================

    #[tokio::test]
    async fn test_missing_element_is_not_found() {
        let harness = Harness::attach(MockDriver::new(), fast()).await.unwrap();
        match harness.click("#nope").await {
            Err(HarnessError::ElementNotFound {
                selector,
                timeout_ms,
            }) => {
                assert_eq!(selector, "#nope");
                assert_eq!(timeout_ms, 200);
            }
            other => panic!("expected ElementNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_disabled_element_is_not_interactable() {
        let page = MockDriver::new().with_element("#btn", MockElement::new().disabled());
        let harness = Harness::attach(page, fast()).await.unwrap();
        match harness.click("#btn").await {
            Err(HarnessError::ElementNotInteractable { reason, .. }) => {
                assert_eq!(reason, "disabled");
            }
            other => panic!("expected ElementNotInteractable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fill_requires_editable() {
        let page = MockDriver::new().with_element("#label", MockElement::new());
        let harness = Harness::attach(page, fast()).await.unwrap();
        let err = harness.fill("#label", "x").await.unwrap_err();
        assert!(matches!(
            err,
            HarnessError::ElementNotInteractable { ref reason, .. } if reason == "not editable"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_action_waits_for_element_to_become_enabled() {
        let page = MockDriver::new()
            .with_element("#btn", MockElement::new().disabled())
            .with_element("#out", MockElement::new());
        let page = page.on("#btn", Trigger::Click, vec![Effect::set_text("#out", "clicked")]);
        page.run(vec![Effect::delay_ms(100), Effect::enable("#btn")]).await;

        let harness = Harness::attach(page.clone(), fast()).await.unwrap();
        harness.click("#btn").await.unwrap();
        assert_eq!(
            harness.text_of("#out").await.unwrap().as_deref(),
            Some("clicked")
        );
    }

    // =========================================================================
    // Waits
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_times_out_naming_condition() {
        let page = MockDriver::new().with_element("#out", MockElement::new().with_text("3"));
        let harness = Harness::attach(page, fast()).await.unwrap();
        let err = harness
            .wait_for(&Condition::text_equals("#out", "7"), Duration::from_millis(100))
            .await
            .unwrap_err();
        match err {
            HarnessError::Timeout {
                condition,
                timeout_ms,
            } => {
                assert_eq!(condition, "text of #out to equal \"7\"");
                assert_eq!(timeout_ms, 100);
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_console_contains_condition_sees_pumped_messages() {
        let page = MockDriver::new();
        let harness = Harness::attach(page.clone(), fast()).await.unwrap();
        page.console(Severity::Info, "sorted in 12 steps");
        harness
            .wait_for_default(&Condition::console_contains("sorted"))
            .await
            .unwrap();
    }

    // =========================================================================
    // Dialogs
    // =========================================================================

    #[tokio::test]
    async fn test_unintercepted_dialog_fails_next_operation() {
        let page = MockDriver::new().with_element("#x", MockElement::new());
        let harness = Harness::attach(page.clone(), fast()).await.unwrap();
        assert_eq!(page.open_dialog(Dialog::alert("surprise")).await, DialogResponse::Dismiss);

        match harness.click("#x").await {
            Err(HarnessError::UnexpectedDialog {
                dialog_type,
                message,
            }) => {
                assert_eq!(dialog_type, "alert");
                assert_eq!(message, "surprise");
            }
            other => panic!("expected UnexpectedDialog, got {other:?}"),
        }
        // reported once
        harness.click("#x").await.unwrap();
    }

    #[tokio::test]
    async fn test_alert_during_wait_aborts_wait() {
        let page = MockDriver::new().with_element("#x", MockElement::new());
        let harness = Harness::attach(page.clone(), fast()).await.unwrap();
        page.run(vec![Effect::delay_ms(50), Effect::alert("mid-wait")])
            .await;

        let started = tokio::time::Instant::now();
        match harness
            .wait_for(&Condition::text_equals("#x", "never"), Duration::from_millis(500))
            .await
        {
            Err(HarnessError::UnexpectedDialog {
                dialog_type,
                message,
            }) => {
                assert_eq!(dialog_type, "alert");
                assert_eq!(message, "mid-wait");
            }
            other => panic!("expected UnexpectedDialog, got {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_unintercepted_dialog_fails_goto() {
        let page = MockDriver::new();
        let harness = Harness::attach(page.clone(), fast().with_base_url("http://localhost:8080"))
            .await
            .unwrap();
        page.open_dialog(Dialog::confirm("leave?")).await;

        match harness.goto("/tree.html").await {
            Err(HarnessError::UnexpectedDialog { dialog_type, .. }) => {
                assert_eq!(dialog_type, "confirm");
            }
            other => panic!("expected UnexpectedDialog, got {other:?}"),
        }
        harness.goto("/tree.html").await.unwrap();
    }

    #[tokio::test]
    async fn test_unintercepted_dialog_fails_error_assertion() {
        let page = MockDriver::new();
        let harness = Harness::attach(page.clone(), fast()).await.unwrap();
        page.open_dialog(Dialog::alert("late")).await;

        match harness.assert_no_unexpected_errors(&Allowlist::new()).await {
            Err(HarnessError::UnexpectedDialog { message, .. }) => assert_eq!(message, "late"),
            other => panic!("expected UnexpectedDialog, got {other:?}"),
        }
        harness
            .assert_no_unexpected_errors(&Allowlist::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_persistent_policy_answers_dialogs() {
        let page = MockDriver::new();
        let harness = Harness::attach(
            page.clone(),
            fast().with_dialog_policy(DialogPolicy::Respond(DialogResponse::Accept)),
        )
        .await
        .unwrap();
        assert_eq!(page.open_dialog(Dialog::confirm("sure?")).await, DialogResponse::Accept);
        assert_eq!(page.open_dialog(Dialog::confirm("really?")).await, DialogResponse::Accept);
        assert!(harness.assert_no_unexpected_errors(&Allowlist::new()).await.is_ok());
        assert_eq!(harness.dialogs().len(), 2);
    }

    #[tokio::test]
    async fn test_prompt_answer_reaches_page() {
        let page = MockDriver::new()
            .with_element("#ask", MockElement::new())
            .with_element("#answer", MockElement::new())
            .on(
                "#ask",
                Trigger::Click,
                vec![Effect::Prompt {
                    message: "Value?".into(),
                    target: Selector::css("#answer"),
                }],
            );
        let harness = Harness::attach(page, fast()).await.unwrap();
        let interception = harness.intercept_next_dialog(DialogResponse::AcceptWith("42".into()));
        harness.click("#ask").await.unwrap();
        let dialog = interception.outcome().await.expect_handled().unwrap();
        assert_eq!(dialog.message(), "Value?");
        assert_eq!(harness.text_of("#answer").await.unwrap().as_deref(), Some("42"));
    }

    // =========================================================================
    // Diagnostics and lifecycle
    // =========================================================================

    #[tokio::test]
    async fn test_events_before_attach_are_lost() {
        let page = MockDriver::new();
        page.console(Severity::Error, "too early");
        let harness = Harness::attach(page.clone(), fast()).await.unwrap();
        page.console(Severity::Error, "captured");
        let sink = harness.collect_diagnostics().await;
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.entries()[0].text(), "captured");
    }

    #[tokio::test]
    async fn test_goto_resolves_relative_urls() {
        let page = MockDriver::new();
        let harness = Harness::attach(page.clone(), fast().with_base_url("http://localhost:8080"))
            .await
            .unwrap();
        harness.goto("/heap.html").await.unwrap();
        assert_eq!(
            page.current_url().await.unwrap(),
            "http://localhost:8080/heap.html"
        );
    }

    #[tokio::test]
    async fn test_teardown_closes_page() {
        let page = MockDriver::new();
        let harness = Harness::attach(page.clone(), fast()).await.unwrap();
        harness.teardown().await.unwrap();
        assert!(page.is_closed());
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let result = Harness::attach(MockDriver::new(), fast().with_wait_timeout(0)).await;
        assert!(matches!(result, Err(HarnessError::Config { .. })));
    }
}

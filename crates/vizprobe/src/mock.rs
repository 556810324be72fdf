//! In-memory page for testing the harness without a browser.
//!
//! A [`MockDriver`] holds a flat list of elements keyed by the selector that
//! finds them, plus scripted reactions bound to `(selector, trigger)` pairs.
//! Reactions run [`Effect`]s: they mutate elements, log to the console, throw
//! page errors or raise dialogs, optionally after a delay.
//!
//! ## Example
//!
//! ```rust,ignore
//! let page = MockDriver::new()
//!     .with_element("#valueInput", MockElement::input())
//!     .with_element("#addValueBtn", MockElement::new().with_text("Add"))
//!     .with_element("#setContents", MockElement::new())
//!     .on("#addValueBtn", Trigger::Click, vec![
//!         Effect::copy_value("#valueInput", "#setContents"),
//!     ]);
//! ```
//!
//! Dialogs block the page like the real thing: the triggering call does not
//! return until the dialog is answered. With no subscriber the dialog is
//! dismissed immediately.

use crate::dialog::{Dialog, DialogResponse};
use crate::diagnostics::Severity;
use crate::driver::{ElementState, EventHub, PageDriver, PageEvent, PageEventStream};
use crate::locator::Selector;
use crate::result::{HarnessError, HarnessResult};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// One element of the mock page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockElement {
    text: String,
    value: String,
    visible: bool,
    enabled: bool,
    editable: bool,
    checked: bool,
    attributes: BTreeMap<String, String>,
}

impl MockElement {
    /// Visible, enabled, non-editable element
    #[must_use]
    pub fn new() -> Self {
        Self {
            visible: true,
            enabled: true,
            ..Self::default()
        }
    }

    /// Visible, enabled text input
    #[must_use]
    pub fn input() -> Self {
        Self {
            editable: true,
            ..Self::new()
        }
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set form value
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Start hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Start disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Start checked
    #[must_use]
    pub const fn checked(mut self) -> Self {
        self.checked = true;
        self
    }

    /// Text content
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Form value
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Checked state
    #[must_use]
    pub const fn is_checked(&self) -> bool {
        self.checked
    }

    /// Visibility
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Enabled state
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// What fires a reaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Element clicked
    Click,
    /// Element double-clicked
    DoubleClick,
    /// Element filled
    Fill,
    /// Key pressed on element
    Press(String),
    /// Checkbox toggled
    Check,
    /// Option selected
    Select,
}

/// Scripted page behaviour
#[derive(Debug, Clone)]
pub enum Effect {
    /// Replace text content of every match
    SetText(Selector, String),
    /// Replace form value of every match
    SetValue(Selector, String),
    /// Copy the first `from` match's value into the text of every `to` match
    CopyValue {
        /// Source input
        from: Selector,
        /// Destination element
        to: Selector,
    },
    /// Make every match visible
    Show(Selector),
    /// Hide every match
    Hide(Selector),
    /// Enable every match
    Enable(Selector),
    /// Disable every match
    Disable(Selector),
    /// Append a new element
    Insert(String, MockElement),
    /// Remove every match
    Remove(Selector),
    /// console.* call
    Console(Severity, String),
    /// Uncaught exception
    PageError(String),
    /// Raise a dialog and block until it is answered
    Dialog(Dialog),
    /// Raise a confirm and branch on the answer
    Confirm {
        /// Dialog message
        message: String,
        /// Effects when accepted
        accepted: Vec<Effect>,
        /// Effects when dismissed
        dismissed: Vec<Effect>,
    },
    /// Raise a prompt and write the submitted text into `target`
    Prompt {
        /// Dialog message
        message: String,
        /// Element receiving the answer as text
        target: Selector,
    },
    /// Branch on whether an input's trimmed value is empty
    IfEmpty {
        /// Input to inspect
        source: Selector,
        /// Effects when empty (or missing)
        then: Vec<Effect>,
        /// Effects otherwise
        otherwise: Vec<Effect>,
    },
    /// Run the remaining effects later, without blocking the caller
    Delay(Duration),
}

impl Effect {
    /// Set text
    #[must_use]
    pub fn set_text(selector: impl Into<Selector>, text: impl Into<String>) -> Self {
        Self::SetText(selector.into(), text.into())
    }

    /// Set value
    #[must_use]
    pub fn set_value(selector: impl Into<Selector>, value: impl Into<String>) -> Self {
        Self::SetValue(selector.into(), value.into())
    }

    /// Copy an input value into an element's text
    #[must_use]
    pub fn copy_value(from: impl Into<Selector>, to: impl Into<Selector>) -> Self {
        Self::CopyValue {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Show
    #[must_use]
    pub fn show(selector: impl Into<Selector>) -> Self {
        Self::Show(selector.into())
    }

    /// Hide
    #[must_use]
    pub fn hide(selector: impl Into<Selector>) -> Self {
        Self::Hide(selector.into())
    }

    /// Enable
    #[must_use]
    pub fn enable(selector: impl Into<Selector>) -> Self {
        Self::Enable(selector.into())
    }

    /// Disable
    #[must_use]
    pub fn disable(selector: impl Into<Selector>) -> Self {
        Self::Disable(selector.into())
    }

    /// Insert
    #[must_use]
    pub fn insert(key: impl Into<String>, element: MockElement) -> Self {
        Self::Insert(key.into(), element)
    }

    /// Remove
    #[must_use]
    pub fn remove(selector: impl Into<Selector>) -> Self {
        Self::Remove(selector.into())
    }

    /// console.log
    #[must_use]
    pub fn log(text: impl Into<String>) -> Self {
        Self::Console(Severity::Log, text.into())
    }

    /// console.error
    #[must_use]
    pub fn console_error(text: impl Into<String>) -> Self {
        Self::Console(Severity::Error, text.into())
    }

    /// Uncaught exception
    #[must_use]
    pub fn throw(message: impl Into<String>) -> Self {
        Self::PageError(message.into())
    }

    /// alert()
    #[must_use]
    pub fn alert(message: impl Into<String>) -> Self {
        Self::Dialog(Dialog::alert(message))
    }

    /// Delay
    #[must_use]
    pub const fn delay_ms(ms: u64) -> Self {
        Self::Delay(Duration::from_millis(ms))
    }
}

#[derive(Debug, Clone)]
struct Reaction {
    target: Selector,
    trigger: Trigger,
    effects: Vec<Effect>,
}

#[derive(Debug, Default)]
struct MockState {
    url: String,
    elements: Vec<(String, MockElement)>,
    reactions: Vec<Reaction>,
    on_load: Vec<Effect>,
    scripts: HashMap<String, serde_json::Value>,
    unreachable: Vec<String>,
    calls: Vec<String>,
    dialogs: Vec<(Dialog, DialogResponse)>,
    closed: bool,
}

impl MockState {
    fn matches(key: &str, element: &MockElement, selector: &Selector) -> bool {
        match selector {
            Selector::Css(css) | Selector::XPath(css) => key == css,
            // Mock elements have no children, so every element is a leaf
            Selector::Text(text) => element.text.contains(text.as_str()),
            Selector::TestId(id) => element.attributes.get("data-testid") == Some(id),
            Selector::CssWithText { css, text } => key == css && element.text.contains(text.as_str()),
        }
    }

    fn indices(&self, selector: &Selector) -> Vec<usize> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, (key, el))| Self::matches(key, el, selector))
            .map(|(i, _)| i)
            .collect()
    }

    fn first(&self, selector: &Selector) -> Option<&MockElement> {
        self.elements
            .iter()
            .find(|(key, el)| Self::matches(key, el, selector))
            .map(|(_, el)| el)
    }

    fn first_mut(&mut self, selector: &Selector) -> Option<&mut MockElement> {
        self.elements
            .iter_mut()
            .find(|(key, el)| Self::matches(key, el, selector))
            .map(|(_, el)| el)
    }

    fn for_each(&mut self, selector: &Selector, f: impl Fn(&mut MockElement)) {
        for (key, el) in &mut self.elements {
            if Self::matches(key, el, selector) {
                f(el);
            }
        }
    }

    /// Effects of reactions whose target resolves to the same element as `selector`
    fn reactions_for(&self, selector: &Selector, trigger: &Trigger) -> Vec<Effect> {
        let Some(target) = self.indices(selector).first().copied() else {
            return Vec::new();
        };
        self.reactions
            .iter()
            .filter(|r| &r.trigger == trigger)
            .filter(|r| self.indices(&r.target).first() == Some(&target))
            .flat_map(|r| r.effects.iter().cloned())
            .collect()
    }

    fn apply(&mut self, effect: Effect) -> Option<PageEvent> {
        match effect {
            Effect::SetText(sel, text) => self.for_each(&sel, |el| el.text.clone_from(&text)),
            Effect::SetValue(sel, value) => self.for_each(&sel, |el| el.value.clone_from(&value)),
            Effect::CopyValue { from, to } => {
                let value = self.first(&from).map(|el| el.value.clone()).unwrap_or_default();
                self.for_each(&to, |el| el.text.clone_from(&value));
            }
            Effect::Show(sel) => self.for_each(&sel, |el| el.visible = true),
            Effect::Hide(sel) => self.for_each(&sel, |el| el.visible = false),
            Effect::Enable(sel) => self.for_each(&sel, |el| el.enabled = true),
            Effect::Disable(sel) => self.for_each(&sel, |el| el.enabled = false),
            Effect::Insert(key, element) => self.elements.push((key, element)),
            Effect::Remove(sel) => self
                .elements
                .retain(|(key, el)| !Self::matches(key, el, &sel)),
            Effect::Console(severity, text) => return Some(PageEvent::Console { severity, text }),
            Effect::PageError(message) => {
                return Some(PageEvent::PageError {
                    message,
                    stack: None,
                })
            }
            // handled asynchronously by run_effects
            Effect::Dialog(_)
            | Effect::Confirm { .. }
            | Effect::Prompt { .. }
            | Effect::IfEmpty { .. }
            | Effect::Delay(_) => {}
        }
        None
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<MockState>,
    events: EventHub,
}

impl Shared {
    fn lock(&self) -> HarnessResult<MutexGuard<'_, MockState>> {
        self.state
            .lock()
            .map_err(|_| HarnessError::driver("mock page state poisoned"))
    }

    async fn raise(&self, dialog: Dialog) -> DialogResponse {
        let response = match self.events.emit_dialog(dialog.clone()) {
            Some(rx) => rx.await.unwrap_or(DialogResponse::Dismiss),
            None => DialogResponse::Dismiss,
        };
        if let Ok(mut state) = self.state.lock() {
            state.dialogs.push((dialog, response.clone()));
        }
        response
    }
}

fn run_effects(shared: Arc<Shared>, effects: Vec<Effect>) -> BoxFuture<'static, ()> {
    async move {
        let mut queue = effects.into_iter();
        while let Some(effect) = queue.next() {
            match effect {
                Effect::Delay(delay) => {
                    let rest: Vec<Effect> = queue.by_ref().collect();
                    let shared = Arc::clone(&shared);
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        run_effects(shared, rest).await;
                    });
                    return;
                }
                Effect::Dialog(dialog) => {
                    shared.raise(dialog).await;
                }
                Effect::Confirm {
                    message,
                    accepted,
                    dismissed,
                } => {
                    let response = shared.raise(Dialog::confirm(message)).await;
                    let branch = if response.accepts() { accepted } else { dismissed };
                    run_effects(Arc::clone(&shared), branch).await;
                }
                Effect::Prompt { message, target } => {
                    let response = shared.raise(Dialog::prompt(message, None)).await;
                    if let Some(text) = response.prompt_text() {
                        let text = text.to_string();
                        if let Ok(mut state) = shared.state.lock() {
                            state.for_each(&target, |el| el.text.clone_from(&text));
                        }
                    }
                }
                Effect::IfEmpty {
                    source,
                    then,
                    otherwise,
                } => {
                    let empty = shared.state.lock().map_or(true, |state| {
                        state
                            .first(&source)
                            .map_or(true, |el| el.value.trim().is_empty())
                    });
                    let branch = if empty { then } else { otherwise };
                    run_effects(Arc::clone(&shared), branch).await;
                }
                other => {
                    let event = shared.state.lock().ok().and_then(|mut s| s.apply(other));
                    if let Some(event) = event {
                        shared.events.emit(event);
                    }
                }
            }
        }
    }
    .boxed()
}

/// Scriptable in-memory [`PageDriver`]
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    shared: Arc<Shared>,
}

impl MockDriver {
    /// Empty page at `about:blank`
    #[must_use]
    pub fn new() -> Self {
        let driver = Self::default();
        if let Ok(mut state) = driver.shared.state.lock() {
            state.url = "about:blank".to_string();
        }
        driver
    }

    fn update(self, f: impl FnOnce(&mut MockState)) -> Self {
        if let Ok(mut state) = self.shared.state.lock() {
            f(&mut state);
        }
        self
    }

    /// Add an element found by `key`
    #[must_use]
    pub fn with_element(self, key: impl Into<String>, element: MockElement) -> Self {
        let key = key.into();
        self.update(|s| s.elements.push((key, element)))
    }

    /// Bind effects to `trigger` on the element `target` resolves to
    #[must_use]
    pub fn on(self, target: impl Into<Selector>, trigger: Trigger, effects: Vec<Effect>) -> Self {
        let reaction = Reaction {
            target: target.into(),
            trigger,
            effects,
        };
        self.update(|s| s.reactions.push(reaction))
    }

    /// Effects run after every navigation
    #[must_use]
    pub fn on_load(self, effects: Vec<Effect>) -> Self {
        self.update(|s| s.on_load.extend(effects))
    }

    /// Scripted result for `evaluate(expression)`
    #[must_use]
    pub fn with_script(self, expression: impl Into<String>, value: serde_json::Value) -> Self {
        let expression = expression.into();
        self.update(|s| {
            s.scripts.insert(expression, value);
        })
    }

    /// Make navigation to `url` fail
    #[must_use]
    pub fn with_unreachable(self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.update(|s| s.unreachable.push(url))
    }

    /// Replace a scripted result while the page is live
    pub fn set_script(&self, expression: impl Into<String>, value: serde_json::Value) {
        if let Ok(mut state) = self.shared.state.lock() {
            state.scripts.insert(expression.into(), value);
        }
    }

    /// Run effects now, as if page script did it
    pub async fn run(&self, effects: Vec<Effect>) {
        run_effects(Arc::clone(&self.shared), effects).await;
    }

    /// console.* from page script
    pub fn console(&self, severity: Severity, text: impl Into<String>) -> bool {
        self.shared.events.emit(PageEvent::Console {
            severity,
            text: text.into(),
        })
    }

    /// Uncaught exception from page script
    pub fn throw(&self, message: impl Into<String>) -> bool {
        self.shared.events.emit(PageEvent::PageError {
            message: message.into(),
            stack: None,
        })
    }

    /// Raise a dialog and wait for its answer
    pub async fn open_dialog(&self, dialog: Dialog) -> DialogResponse {
        self.shared.raise(dialog).await
    }

    /// Snapshot of the first element matching `selector`
    #[must_use]
    pub fn element(&self, selector: impl Into<Selector>) -> Option<MockElement> {
        let selector = selector.into();
        self.shared
            .state
            .lock()
            .ok()
            .and_then(|s| s.first(&selector).cloned())
    }

    /// Driver calls made so far, e.g. `"click #addValueBtn"`
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.shared
            .state
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    /// Dialogs raised so far with the answer each received
    #[must_use]
    pub fn dialog_log(&self) -> Vec<(Dialog, DialogResponse)> {
        self.shared
            .state
            .lock()
            .map(|s| s.dialogs.clone())
            .unwrap_or_default()
    }

    /// Whether `close` was called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().map(|s| s.closed).unwrap_or(true)
    }

    /// Record a call and fail if the page is closed
    fn begin(&self, call: String) -> HarnessResult<MutexGuard<'_, MockState>> {
        let mut state = self.shared.lock()?;
        if state.closed {
            return Err(HarnessError::driver("page is closed"));
        }
        state.calls.push(call);
        Ok(state)
    }

    /// Mutate the first match, then run the reactions bound to `trigger`
    async fn interact(
        &self,
        call: String,
        selector: &Selector,
        trigger: Trigger,
        mutate: impl FnOnce(&mut MockElement),
    ) -> HarnessResult<()> {
        let effects = {
            let mut state = self.begin(call)?;
            let element = state
                .first_mut(selector)
                .ok_or_else(|| HarnessError::driver(format!("no element matches {selector}")))?;
            mutate(element);
            state.reactions_for(selector, &trigger)
        };
        self.run(effects).await;
        Ok(())
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn navigate(&self, url: &str) -> HarnessResult<()> {
        let effects = {
            let mut state = self.begin(format!("navigate {url}"))?;
            if state.unreachable.iter().any(|u| u == url) {
                return Err(HarnessError::Navigation {
                    url: url.to_string(),
                    message: "net::ERR_CONNECTION_REFUSED".to_string(),
                });
            }
            state.url = url.to_string();
            state.on_load.clone()
        };
        self.run(effects).await;
        Ok(())
    }

    async fn current_url(&self) -> HarnessResult<String> {
        Ok(self.shared.lock()?.url.clone())
    }

    async fn element_state(&self, selector: &Selector) -> HarnessResult<ElementState> {
        let state = self.shared.lock()?;
        let count = state.indices(selector).len();
        Ok(state
            .first(selector)
            .map_or_else(ElementState::missing, |el| ElementState {
                count,
                visible: el.visible,
                enabled: el.enabled,
                editable: el.editable,
            }))
    }

    async fn text_content(&self, selector: &Selector) -> HarnessResult<Option<String>> {
        Ok(self.shared.lock()?.first(selector).map(|el| el.text.clone()))
    }

    async fn input_value(&self, selector: &Selector) -> HarnessResult<Option<String>> {
        Ok(self.shared.lock()?.first(selector).map(|el| el.value.clone()))
    }

    async fn attribute(&self, selector: &Selector, name: &str) -> HarnessResult<Option<String>> {
        Ok(self
            .shared
            .lock()?
            .first(selector)
            .and_then(|el| el.attributes.get(name).cloned()))
    }

    async fn click(&self, selector: &Selector) -> HarnessResult<()> {
        self.interact(format!("click {selector}"), selector, Trigger::Click, |_| {})
            .await
    }

    async fn double_click(&self, selector: &Selector) -> HarnessResult<()> {
        self.interact(
            format!("dblclick {selector}"),
            selector,
            Trigger::DoubleClick,
            |_| {},
        )
        .await
    }

    async fn fill(&self, selector: &Selector, value: &str) -> HarnessResult<()> {
        self.interact(format!("fill {selector}"), selector, Trigger::Fill, |el| {
            el.value = value.to_string();
        })
        .await
    }

    async fn press(&self, selector: &Selector, key: &str) -> HarnessResult<()> {
        self.interact(
            format!("press {selector} {key}"),
            selector,
            Trigger::Press(key.to_string()),
            |_| {},
        )
        .await
    }

    async fn set_checked(&self, selector: &Selector, checked: bool) -> HarnessResult<()> {
        self.interact(format!("check {selector}"), selector, Trigger::Check, |el| {
            el.checked = checked;
        })
        .await
    }

    async fn select_option(&self, selector: &Selector, value: &str) -> HarnessResult<()> {
        self.interact(format!("select {selector}"), selector, Trigger::Select, |el| {
            el.value = value.to_string();
        })
        .await
    }

    async fn evaluate(&self, expression: &str) -> HarnessResult<serde_json::Value> {
        self.shared
            .lock()?
            .scripts
            .get(expression)
            .cloned()
            .ok_or_else(|| HarnessError::driver(format!("no scripted result for `{expression}`")))
    }

    async fn subscribe(&self) -> HarnessResult<PageEventStream> {
        Ok(self.shared.events.subscribe())
    }

    async fn close(&self) -> HarnessResult<()> {
        self.shared.lock()?.closed = true;
        self.shared.events.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_page() -> MockDriver {
        MockDriver::new()
            .with_element("#valueInput", MockElement::input())
            .with_element("#addValueBtn", MockElement::new().with_text("Add"))
            .with_element("#setContents", MockElement::new())
            .on(
                "#addValueBtn",
                Trigger::Click,
                vec![Effect::IfEmpty {
                    source: Selector::css("#valueInput"),
                    then: vec![Effect::alert("Please enter a value to add.")],
                    otherwise: vec![
                        Effect::copy_value("#valueInput", "#setContents"),
                        Effect::set_value("#valueInput", ""),
                    ],
                }],
            )
    }

    #[tokio::test]
    async fn test_element_state_and_reads() {
        let page = set_page();
        let state = page.element_state(&Selector::css("#valueInput")).await.unwrap();
        assert_eq!(state.count, 1);
        assert!(state.visible && state.enabled && state.editable);

        let missing = page.element_state(&Selector::css("#nope")).await.unwrap();
        assert_eq!(missing, ElementState::missing());

        let by_text = page.text_content(&Selector::text("Add")).await.unwrap();
        assert_eq!(by_text.as_deref(), Some("Add"));
    }

    #[tokio::test]
    async fn test_reaction_resolves_same_element_by_any_selector() {
        let page = set_page();
        page.fill(&Selector::css("#valueInput"), "apple").await.unwrap();
        page.click(&Selector::text("Add")).await.unwrap();
        assert_eq!(page.element("#setContents").unwrap().text(), "apple");
        assert_eq!(page.element("#valueInput").unwrap().value(), "");
        assert_eq!(
            page.calls(),
            vec!["fill #valueInput", "click text=Add"]
        );
    }

    #[tokio::test]
    async fn test_dialog_without_subscriber_is_dismissed() {
        let page = set_page();
        page.click(&Selector::css("#addValueBtn")).await.unwrap();
        let log = page.dialog_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0.message(), "Please enter a value to add.");
        assert_eq!(log[0].1, DialogResponse::Dismiss);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_effects_do_not_block_caller() {
        let page = MockDriver::new()
            .with_element("#go", MockElement::new())
            .with_element("#out", MockElement::new().hidden())
            .on(
                "#go",
                Trigger::Click,
                vec![Effect::delay_ms(300), Effect::show("#out")],
            );
        page.click(&Selector::css("#go")).await.unwrap();
        assert!(!page.element("#out").unwrap().is_visible());
        tokio::time::sleep(Duration::from_millis(301)).await;
        assert!(page.element("#out").unwrap().is_visible());
    }

    #[tokio::test]
    async fn test_console_and_errors_reach_subscriber() {
        let page = MockDriver::new()
            .with_element("#boom", MockElement::new())
            .on(
                "#boom",
                Trigger::Click,
                vec![Effect::console_error("bad"), Effect::throw("TypeError: x")],
            );
        let mut events = page.subscribe().await.unwrap();
        page.click(&Selector::css("#boom")).await.unwrap();
        assert!(matches!(
            events.recv().await,
            Some(PageEvent::Console { severity: Severity::Error, .. })
        ));
        assert!(matches!(
            events.recv().await,
            Some(PageEvent::PageError { .. })
        ));
    }

    #[tokio::test]
    async fn test_insert_and_remove_change_count() {
        let page = MockDriver::new()
            .with_element("#add", MockElement::new())
            .on(
                "#add",
                Trigger::Click,
                vec![Effect::insert("li.node", MockElement::new().with_text("1"))],
            );
        let nodes = Selector::css("li.node");
        page.click(&Selector::css("#add")).await.unwrap();
        page.click(&Selector::css("#add")).await.unwrap();
        assert_eq!(page.element_state(&nodes).await.unwrap().count, 2);
        page.run(vec![Effect::remove("li.node")]).await;
        assert_eq!(page.element_state(&nodes).await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_navigation_and_close() {
        let page = MockDriver::new().with_unreachable("http://localhost:1/");
        page.navigate("http://localhost:8080/set.html").await.unwrap();
        assert_eq!(
            page.current_url().await.unwrap(),
            "http://localhost:8080/set.html"
        );
        assert!(matches!(
            page.navigate("http://localhost:1/").await,
            Err(HarnessError::Navigation { .. })
        ));

        page.close().await.unwrap();
        assert!(page.is_closed());
        assert!(page.click(&Selector::css("#x")).await.is_err());
    }

    #[tokio::test]
    async fn test_scripted_evaluate() {
        let page = MockDriver::new().with_script("window.ready", serde_json::json!(true));
        assert_eq!(
            page.evaluate("window.ready").await.unwrap(),
            serde_json::json!(true)
        );
        assert!(page.evaluate("window.other").await.is_err());
    }
}

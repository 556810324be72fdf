//! PageDriver - the boundary to the browser automation engine.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Harness  (actions, waits, dialogs, diagnostics)                 │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  PageDriver (async trait)                                         │
//! │   ┌────────────────────┐            ┌────────────────────┐        │
//! │   │  ChromiumDriver    │            │  MockDriver        │        │
//! │   │  CDP via           │            │  in-memory page    │        │
//! │   │  chromiumoxide     │            │  for unit tests    │        │
//! │   └────────────────────┘            └────────────────────┘        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Drivers push console messages, page errors and dialogs through an
//! [`EventHub`]. The hub has a single subscriber; anything emitted before
//! [`PageDriver::subscribe`] is called is dropped. Subscribe before the
//! navigation or action whose events you need.

use crate::dialog::{Dialog, DialogResponse};
use crate::diagnostics::Severity;
use crate::locator::Selector;
use crate::result::HarnessResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

/// Actionability snapshot of the first element matching a selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    /// Number of matching elements
    pub count: usize,
    /// First match is rendered with a non-empty box
    pub visible: bool,
    /// First match is not disabled
    pub enabled: bool,
    /// First match accepts text input
    pub editable: bool,
}

impl ElementState {
    /// State of a selector with no matches
    #[must_use]
    pub const fn missing() -> Self {
        Self {
            count: 0,
            visible: false,
            enabled: false,
            editable: false,
        }
    }

    /// Whether anything matched
    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.count > 0
    }

    /// Why an action cannot run yet, or `None` when it can
    #[must_use]
    pub const fn blocker(&self, needs_editable: bool) -> Option<&'static str> {
        if self.count == 0 {
            Some("not attached")
        } else if !self.visible {
            Some("hidden")
        } else if !self.enabled {
            Some("disabled")
        } else if needs_editable && !self.editable {
            Some("not editable")
        } else {
            None
        }
    }
}

/// A dialog waiting for an answer
#[derive(Debug)]
pub struct PendingDialog {
    dialog: Dialog,
    responder: oneshot::Sender<DialogResponse>,
}

impl PendingDialog {
    /// Create a pending dialog and the receiver the driver awaits
    #[must_use]
    pub fn new(dialog: Dialog) -> (Self, oneshot::Receiver<DialogResponse>) {
        let (responder, rx) = oneshot::channel();
        (Self { dialog, responder }, rx)
    }

    /// The dialog as raised by the page
    #[must_use]
    pub const fn dialog(&self) -> &Dialog {
        &self.dialog
    }

    /// Answer the dialog. Dropping without answering dismisses it.
    pub fn respond(self, response: DialogResponse) {
        let _ = self.responder.send(response);
    }
}

/// Events pushed by a driver
#[derive(Debug)]
pub enum PageEvent {
    /// console.* call
    Console {
        /// Severity
        severity: Severity,
        /// Rendered text
        text: String,
    },
    /// Uncaught exception
    PageError {
        /// Message
        message: String,
        /// Stack trace if available
        stack: Option<String>,
    },
    /// Native dialog opened
    Dialog(PendingDialog),
}

/// Receiving end of a driver subscription
#[derive(Debug)]
pub struct PageEventStream {
    rx: mpsc::UnboundedReceiver<PageEvent>,
    emitted: Arc<AtomicU64>,
}

impl PageEventStream {
    /// Next event, or `None` once the driver side is gone
    pub async fn recv(&mut self) -> Option<PageEvent> {
        self.rx.recv().await
    }

    /// Counter of events successfully delivered to this stream
    #[must_use]
    pub fn emitted(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.emitted)
    }
}

/// Single-subscriber fan-in used by driver implementations
#[derive(Debug, Default)]
pub struct EventHub {
    sink: Mutex<Option<(mpsc::UnboundedSender<PageEvent>, Arc<AtomicU64>)>>,
}

impl EventHub {
    /// Create a hub with no subscriber
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current subscriber
    pub fn subscribe(&self) -> PageEventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let emitted = Arc::new(AtomicU64::new(0));
        if let Ok(mut sink) = self.sink.lock() {
            *sink = Some((tx, Arc::clone(&emitted)));
        }
        PageEventStream { rx, emitted }
    }

    /// Whether someone is listening
    #[must_use]
    pub fn has_subscriber(&self) -> bool {
        self.sink
            .lock()
            .map(|s| s.as_ref().is_some_and(|(tx, _)| !tx.is_closed()))
            .unwrap_or(false)
    }

    /// Deliver an event; returns false if it was dropped
    pub fn emit(&self, event: PageEvent) -> bool {
        let Ok(sink) = self.sink.lock() else {
            return false;
        };
        let Some((tx, emitted)) = sink.as_ref() else {
            return false;
        };
        if tx.send(event).is_err() {
            return false;
        }
        emitted.fetch_add(1, Ordering::SeqCst);
        true
    }

    /// Deliver a dialog; `None` means nobody will answer it
    pub fn emit_dialog(&self, dialog: Dialog) -> Option<oneshot::Receiver<DialogResponse>> {
        let (pending, rx) = PendingDialog::new(dialog);
        self.emit(PageEvent::Dialog(pending)).then_some(rx)
    }

    /// Drop the subscriber, ending its stream
    pub fn close(&self) {
        if let Ok(mut sink) = self.sink.lock() {
            *sink = None;
        }
    }
}

/// Abstract driver trait for browser automation.
///
/// All methods take `&self` so a harness can share the driver with its event
/// pump. Element methods act on the first match of the selector; the harness
/// checks actionability through [`PageDriver::element_state`] before calling
/// them.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to an absolute URL
    async fn navigate(&self, url: &str) -> HarnessResult<()>;

    /// Current page URL
    async fn current_url(&self) -> HarnessResult<String>;

    /// Count and actionability of matching elements
    async fn element_state(&self, selector: &Selector) -> HarnessResult<ElementState>;

    /// Text content of the first match
    async fn text_content(&self, selector: &Selector) -> HarnessResult<Option<String>>;

    /// Form value of the first match
    async fn input_value(&self, selector: &Selector) -> HarnessResult<Option<String>>;

    /// Attribute of the first match
    async fn attribute(&self, selector: &Selector, name: &str) -> HarnessResult<Option<String>>;

    /// Click the first match
    async fn click(&self, selector: &Selector) -> HarnessResult<()>;

    /// Double-click the first match
    async fn double_click(&self, selector: &Selector) -> HarnessResult<()>;

    /// Replace the value of the first match and fire input/change events
    async fn fill(&self, selector: &Selector, value: &str) -> HarnessResult<()>;

    /// Press a key on the first match
    async fn press(&self, selector: &Selector, key: &str) -> HarnessResult<()>;

    /// Set the checked state of the first match
    async fn set_checked(&self, selector: &Selector, checked: bool) -> HarnessResult<()>;

    /// Select an option by value on the first match
    async fn select_option(&self, selector: &Selector, value: &str) -> HarnessResult<()>;

    /// Evaluate a JavaScript expression in page context
    async fn evaluate(&self, expression: &str) -> HarnessResult<serde_json::Value>;

    /// Subscribe to page events, replacing any earlier subscriber.
    ///
    /// Events emitted before this call are lost.
    async fn subscribe(&self) -> HarnessResult<PageEventStream>;

    /// Close the page
    async fn close(&self) -> HarnessResult<()>;
}

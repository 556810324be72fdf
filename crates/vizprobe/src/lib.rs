//! Vizprobe: end-to-end test harness for browser-hosted visualization pages
//!
//! Drives a page through a [`PageDriver`] (a real Chromium over CDP with the
//! `browser` feature, or the scriptable [`MockDriver`]) and gives tests four
//! primitives on top of it:
//!
//! - [`Harness::perform`]: fill, click and press on elements once they are
//!   actionable
//! - [`Harness::wait_for`]: poll a [`Condition`] until it holds or times out
//! - [`Harness::intercept_next_dialog`]: answer the next alert, confirm or
//!   prompt and capture its message
//! - [`Harness::collect_diagnostics`] and
//!   [`Harness::assert_no_unexpected_errors`]: console and page-error capture
//!   checked against an [`Allowlist`]
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐    ┌────────────┐    ┌──────────────┐
//! │ Scenario   │    │ Harness    │    │ PageDriver   │
//! │ (YAML) or  │───►│ actions,   │───►│ Chromium or  │
//! │ Rust test  │    │ waits      │    │ MockDriver   │
//! └────────────┘    └─────▲──────┘    └──────┬───────┘
//!                         │   console, errors, dialogs
//!                         └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use vizprobe::prelude::*;
//!
//! let harness = Harness::attach(driver, HarnessConfig::new()).await?;
//! harness.goto("http://localhost:8080/set.html").await?;
//! harness.fill("#valueInput", "apple").await?;
//! harness.click("#addValueBtn").await?;
//! harness
//!     .wait_for(
//!         &Condition::text_equals("#setContents", "apple"),
//!         Duration::from_secs(2),
//!     )
//!     .await?;
//! harness.assert_no_unexpected_errors(&Allowlist::new()).await?;
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

mod action;
mod browser;
mod condition;
mod config;
mod diagnostics;
mod dialog;
mod driver;
mod harness;
mod locator;
pub mod logging;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod mock;
mod page_object;
mod result;
pub mod scenario;
mod wait;
pub mod yaml;

pub use action::Action;
#[cfg(feature = "browser")]
pub use browser::ChromiumDriver;
pub use browser::BrowserConfig;
pub use condition::{is_truthy, Condition, PageView};
pub use config::{
    HarnessConfig, ENV_ACTION_TIMEOUT_MS, ENV_BASE_URL, ENV_POLL_INTERVAL_MS, ENV_WAIT_TIMEOUT_MS,
};
pub use diagnostics::{AllowPattern, Allowlist, Diagnostic, DiagnosticKind, DiagnosticsSink, Severity};
pub use dialog::{
    Dialog, DialogHandler, DialogInterception, DialogOutcome, DialogPolicy, DialogResponse,
    DialogType,
};
pub use driver::{ElementState, EventHub, PageDriver, PageEvent, PageEventStream, PendingDialog};
pub use harness::Harness;
pub use locator::{Locator, Selector};
pub use mock::{Effect, MockDriver, MockElement, Trigger};
pub use page_object::{open_page, FixturePage, PageObject};
pub use result::{HarnessError, HarnessResult};
pub use scenario::{
    Scenario, ScenarioReport, ScenarioRunner, Step, StepReport, StepStatus, SCENARIO_VERSION,
};
pub use wait::{
    wait_for, Poller, WaitOptions, WaitResult, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS,
    MIN_POLL_INTERVAL_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::action::*;
    pub use super::browser::*;
    pub use super::condition::*;
    pub use super::config::*;
    pub use super::diagnostics::*;
    pub use super::dialog::*;
    pub use super::driver::*;
    pub use super::harness::*;
    pub use super::locator::*;
    pub use super::mock::{Effect, MockDriver, MockElement, Trigger};
    pub use super::page_object::*;
    pub use super::result::*;
    pub use super::scenario::{Scenario, ScenarioReport, ScenarioRunner, Step};
    pub use super::wait::{WaitOptions, WaitResult};
    pub use std::time::Duration;
}

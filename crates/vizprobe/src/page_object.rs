//! Page Object Model support.
//!
//! A page object names the locators of one fixture page and the condition
//! that means "this page is ready". [`open_page`] navigates to it and waits
//! for that condition, replacing the per-test navigation boilerplate.
//!
//! # Example
//!
//! ```ignore
//! struct SetPage;
//!
//! impl PageObject for SetPage {
//!     fn path(&self) -> &str {
//!         "/set.html"
//!     }
//!
//!     fn ready(&self) -> Condition {
//!         Condition::visible("#addValueBtn")
//!     }
//! }
//!
//! open_page(&harness, &SetPage).await?;
//! ```

use crate::condition::Condition;
use crate::harness::Harness;
use crate::locator::Locator;
use crate::result::{HarnessError, HarnessResult};
use crate::wait::WaitResult;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

/// A page or component of the application under test
pub trait PageObject {
    /// Path (or absolute URL) of the page
    fn path(&self) -> &str;

    /// Condition that holds once the page can be used
    fn ready(&self) -> Condition;

    /// Override for the load timeout; defaults to the navigation timeout
    fn load_timeout(&self) -> Option<Duration> {
        None
    }

    /// Name used in logs
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Navigate to `page` and wait until it is ready
pub async fn open_page<P>(harness: &Harness, page: &P) -> HarnessResult<WaitResult>
where
    P: PageObject + ?Sized,
{
    harness.goto(page.path()).await?;
    let timeout = page
        .load_timeout()
        .unwrap_or_else(|| harness.config().navigation_timeout());
    let result = harness.wait_for(&page.ready(), timeout).await?;
    info!(page = page.page_name(), elapsed_ms = result.elapsed.as_millis() as u64, "page ready");
    Ok(result)
}

/// Page object assembled from named locators
#[derive(Debug, Clone)]
pub struct FixturePage {
    name: String,
    path: String,
    ready: Option<Condition>,
    locators: BTreeMap<String, Locator>,
    load_timeout: Option<Duration>,
}

impl FixturePage {
    /// Page at `path`
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ready: None,
            locators: BTreeMap::new(),
            load_timeout: None,
        }
    }

    /// Register a named locator
    #[must_use]
    pub fn with_locator(mut self, name: impl Into<String>, locator: impl Into<Locator>) -> Self {
        self.locators.insert(name.into(), locator.into());
        self
    }

    /// Set the readiness condition
    #[must_use]
    pub fn with_ready(mut self, condition: Condition) -> Self {
        self.ready = Some(condition);
        self
    }

    /// Set the load timeout
    #[must_use]
    pub const fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }

    /// Look up a locator by name
    pub fn locator(&self, name: &str) -> HarnessResult<&Locator> {
        self.locators.get(name).ok_or_else(|| {
            HarnessError::config(format!("page {} has no locator named {name:?}", self.name))
        })
    }

    /// Registered locator names, sorted
    #[must_use]
    pub fn locator_names(&self) -> Vec<&str> {
        self.locators.keys().map(String::as_str).collect()
    }
}

impl PageObject for FixturePage {
    fn path(&self) -> &str {
        &self.path
    }

    /// Explicit condition, else every registered locator visible
    fn ready(&self) -> Condition {
        self.ready.clone().unwrap_or_else(|| {
            Condition::All(self.locators.values().cloned().map(Condition::visible).collect())
        })
    }

    fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout
    }

    fn page_name(&self) -> &str {
        &self.name
    }
}

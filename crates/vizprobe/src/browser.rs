//! Real browser backend over the Chrome `DevTools` Protocol.
//!
//! [`BrowserConfig`] is always available so configuration files and CLI flags
//! parse without the feature. The driver itself, [`ChromiumDriver`], needs
//! the `browser` feature and a local Chromium.
//!
//! Element lookup and actions run as JavaScript in the page, built from
//! [`Selector::to_all_query`](crate::locator::Selector::to_all_query).
//! Console calls, uncaught exceptions and dialogs arrive as CDP events and are
//! forwarded to the harness through an [`EventHub`](crate::driver::EventHub).

use crate::locator::js_str;
use serde::{Deserialize, Serialize};

/// Browser launch options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run without a window
    pub headless: bool,
    /// Viewport width in pixels
    pub viewport_width: u32,
    /// Viewport height in pixels
    pub viewport_height: u32,
    /// Chromium executable; autodetected when unset
    pub chromium_path: Option<String>,
    /// Keep the Chromium sandbox (disable inside containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the Chromium executable
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable the sandbox
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn element_script(query: &str, body: &str) -> String {
    format!("(() => {{ const el = {query}; if (!el) return false; {body} return true; }})()")
}

#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn state_script(all_query: &str) -> String {
    format!(
        "(() => {{ const all = {all_query}; const el = all[0]; \
         if (!el) return {{ count: 0, visible: false, enabled: false, editable: false }}; \
         const r = el.getBoundingClientRect(); const s = getComputedStyle(el); \
         const visible = r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; \
         const enabled = !el.disabled; \
         const tag = el.tagName; \
         const editable = !el.readOnly && (tag === 'INPUT' || tag === 'TEXTAREA' || tag === 'SELECT' || el.isContentEditable); \
         return {{ count: all.length, visible, enabled, editable }}; }})()"
    )
}

#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn fill_body(value: &str) -> String {
    format!(
        "el.focus(); \
         const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype; \
         const setter = Object.getOwnPropertyDescriptor(proto, 'value'); \
         if (setter && setter.set && (el instanceof HTMLInputElement || el instanceof HTMLTextAreaElement)) {{ setter.set.call(el, {v}); }} else {{ el.value = {v}; }} \
         el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         el.dispatchEvent(new Event('change', {{ bubbles: true }}));",
        v = js_str(value)
    )
}

#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn press_body(key: &str) -> String {
    format!(
        "el.focus(); const init = {{ key: {k}, bubbles: true, cancelable: true }}; \
         el.dispatchEvent(new KeyboardEvent('keydown', init)); \
         el.dispatchEvent(new KeyboardEvent('keypress', init)); \
         el.dispatchEvent(new KeyboardEvent('keyup', init));",
        k = js_str(key)
    )
}

#[cfg(feature = "browser")]
mod cdp {
    use super::{element_script, fill_body, js_str, press_body, state_script, BrowserConfig};
    use crate::dialog::{Dialog, DialogResponse, DialogType};
    use crate::diagnostics::Severity;
    use crate::driver::{ElementState, EventHub, PageDriver, PageEvent, PageEventStream};
    use crate::locator::Selector;
    use crate::result::{HarnessError, HarnessResult};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::page::{
        EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
    };
    use chromiumoxide::cdp::js_protocol::runtime::{
        EnableParams as RuntimeEnableParams, EventConsoleApiCalled, EventExceptionThrown,
        RemoteObject,
    };
    use chromiumoxide::page::Page;
    use futures::StreamExt;
    use serde::de::DeserializeOwned;
    use std::sync::{Arc, Mutex};
    use tokio::task::JoinHandle;
    use tracing::{debug, info, warn};

    fn driver_err(e: impl std::fmt::Display) -> HarnessError {
        HarnessError::driver(e.to_string())
    }

    /// `PageDriver` backed by a launched Chromium.
    ///
    /// The CDP page is used without a lock: a click that raises a dialog only
    /// completes once the dialog listener has answered it on the same page.
    #[derive(Debug)]
    pub struct ChromiumDriver {
        config: BrowserConfig,
        browser: tokio::sync::Mutex<Option<Browser>>,
        page: Page,
        events: Arc<EventHub>,
        tasks: Mutex<Vec<JoinHandle<()>>>,
    }

    impl ChromiumDriver {
        /// Launch Chromium and open a blank page
        pub async fn launch(config: BrowserConfig) -> HarnessResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height);
            if !config.headless {
                builder = builder.with_head();
            }
            if !config.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }
            let cdp_config = builder.build().map_err(driver_err)?;

            let (browser, mut handler) = Browser::launch(cdp_config).await.map_err(driver_err)?;
            let handler_task = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            let page = browser.new_page("about:blank").await.map_err(driver_err)?;
            page.execute(RuntimeEnableParams::default())
                .await
                .map_err(driver_err)?;

            let events = Arc::new(EventHub::new());
            let mut tasks = vec![handler_task];
            tasks.push(Self::forward_console(&page, Arc::clone(&events)).await?);
            tasks.push(Self::forward_exceptions(&page, Arc::clone(&events)).await?);
            tasks.push(Self::forward_dialogs(&page, Arc::clone(&events)).await?);
            info!(headless = config.headless, "chromium launched");

            Ok(Self {
                config,
                browser: tokio::sync::Mutex::new(Some(browser)),
                page,
                events,
                tasks: Mutex::new(tasks),
            })
        }

        /// Launch options in use
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        async fn forward_console(page: &Page, events: Arc<EventHub>) -> HarnessResult<JoinHandle<()>> {
            let mut stream = page
                .event_listener::<EventConsoleApiCalled>()
                .await
                .map_err(driver_err)?;
            Ok(tokio::spawn(async move {
                while let Some(event) = stream.next().await {
                    let severity = Severity::from_console_type(event.r#type.as_ref());
                    let text = event
                        .args
                        .iter()
                        .map(render_remote)
                        .collect::<Vec<_>>()
                        .join(" ");
                    events.emit(PageEvent::Console { severity, text });
                }
            }))
        }

        async fn forward_exceptions(
            page: &Page,
            events: Arc<EventHub>,
        ) -> HarnessResult<JoinHandle<()>> {
            let mut stream = page
                .event_listener::<EventExceptionThrown>()
                .await
                .map_err(driver_err)?;
            Ok(tokio::spawn(async move {
                while let Some(event) = stream.next().await {
                    let details = &event.exception_details;
                    let message = details
                        .exception
                        .as_ref()
                        .and_then(|e| e.description.clone())
                        .unwrap_or_else(|| details.text.clone());
                    let stack = details.stack_trace.as_ref().map(|trace| {
                        trace
                            .call_frames
                            .iter()
                            .map(|f| {
                                format!(
                                    "    at {} ({}:{}:{})",
                                    if f.function_name.is_empty() {
                                        "<anonymous>"
                                    } else {
                                        &f.function_name
                                    },
                                    f.url,
                                    f.line_number + 1,
                                    f.column_number + 1
                                )
                            })
                            .collect::<Vec<_>>()
                            .join("\n")
                    });
                    events.emit(PageEvent::PageError { message, stack });
                }
            }))
        }

        async fn forward_dialogs(page: &Page, events: Arc<EventHub>) -> HarnessResult<JoinHandle<()>> {
            let mut stream = page
                .event_listener::<EventJavascriptDialogOpening>()
                .await
                .map_err(driver_err)?;
            let page = page.clone();
            Ok(tokio::spawn(async move {
                while let Some(event) = stream.next().await {
                    let dialog_type = DialogType::from_name(event.r#type.as_ref());
                    let dialog = match dialog_type {
                        DialogType::Prompt => {
                            Dialog::prompt(event.message.clone(), event.default_prompt.clone())
                        }
                        other => Dialog::new(other, event.message.clone()),
                    };
                    let response = match events.emit_dialog(dialog) {
                        Some(rx) => rx.await.unwrap_or(DialogResponse::Dismiss),
                        None => DialogResponse::Dismiss,
                    };
                    let mut params = HandleJavaScriptDialogParams::new(response.accepts());
                    params.prompt_text = response.prompt_text().map(str::to_string);
                    if let Err(e) = page.execute(params).await {
                        warn!(error = %e, "failed to answer dialog");
                    }
                }
            }))
        }

        /// Evaluate and deserialize; a JS `null` arrives without a value
        async fn eval<T: DeserializeOwned>(&self, expression: &str) -> HarnessResult<T> {
            let value = PageDriver::evaluate(self, expression).await?;
            Ok(serde_json::from_value(value)?)
        }

        async fn on_element(&self, selector: &Selector, body: &str) -> HarnessResult<()> {
            let found: bool = self
                .eval(&element_script(&selector.to_query(), body))
                .await?;
            if found {
                Ok(())
            } else {
                Err(HarnessError::driver(format!("no element matches {selector}")))
            }
        }
    }

    fn render_remote(arg: &RemoteObject) -> String {
        match (&arg.value, &arg.description) {
            (Some(serde_json::Value::String(s)), _) => s.clone(),
            (Some(v), _) => v.to_string(),
            (None, Some(d)) => d.clone(),
            (None, None) => "undefined".to_string(),
        }
    }

    #[async_trait]
    impl PageDriver for ChromiumDriver {
        async fn navigate(&self, url: &str) -> HarnessResult<()> {
            self.page
                .goto(url)
                .await
                .map_err(|e| HarnessError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            debug!(%url, "page loaded");
            Ok(())
        }

        async fn current_url(&self) -> HarnessResult<String> {
            Ok(self
                .page
                .url()
                .await
                .map_err(driver_err)?
                .unwrap_or_else(|| "about:blank".to_string()))
        }

        async fn element_state(&self, selector: &Selector) -> HarnessResult<ElementState> {
            self.eval(&state_script(&selector.to_all_query())).await
        }

        async fn text_content(&self, selector: &Selector) -> HarnessResult<Option<String>> {
            self.eval(&format!(
                "(() => {{ const el = {}; return el ? el.textContent : null; }})()",
                selector.to_query()
            ))
            .await
        }

        async fn input_value(&self, selector: &Selector) -> HarnessResult<Option<String>> {
            self.eval(&format!(
                "(() => {{ const el = {}; return el && el.value !== undefined ? String(el.value) : null; }})()",
                selector.to_query()
            ))
            .await
        }

        async fn attribute(&self, selector: &Selector, name: &str) -> HarnessResult<Option<String>> {
            self.eval(&format!(
                "(() => {{ const el = {}; return el ? el.getAttribute({}) : null; }})()",
                selector.to_query(),
                js_str(name)
            ))
            .await
        }

        async fn click(&self, selector: &Selector) -> HarnessResult<()> {
            self.on_element(selector, "el.scrollIntoView({ block: 'center' }); el.click();")
                .await
        }

        async fn double_click(&self, selector: &Selector) -> HarnessResult<()> {
            self.on_element(
                selector,
                "el.scrollIntoView({ block: 'center' }); \
                 el.dispatchEvent(new MouseEvent('dblclick', { bubbles: true, cancelable: true, detail: 2 }));",
            )
            .await
        }

        async fn fill(&self, selector: &Selector, value: &str) -> HarnessResult<()> {
            self.on_element(selector, &fill_body(value)).await
        }

        async fn press(&self, selector: &Selector, key: &str) -> HarnessResult<()> {
            self.on_element(selector, &press_body(key)).await
        }

        async fn set_checked(&self, selector: &Selector, checked: bool) -> HarnessResult<()> {
            self.on_element(selector, &format!("if (el.checked !== {checked}) el.click();"))
                .await
        }

        async fn select_option(&self, selector: &Selector, value: &str) -> HarnessResult<()> {
            self.on_element(
                selector,
                &format!(
                    "el.value = {}; \
                     el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
                     el.dispatchEvent(new Event('change', {{ bubbles: true }}));",
                    js_str(value)
                ),
            )
            .await
        }

        async fn evaluate(&self, expression: &str) -> HarnessResult<serde_json::Value> {
            let result = self.page.evaluate(expression).await.map_err(driver_err)?;
            Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
        }

        async fn subscribe(&self) -> HarnessResult<PageEventStream> {
            Ok(self.events.subscribe())
        }

        async fn close(&self) -> HarnessResult<()> {
            self.events.close();
            if let Ok(mut tasks) = self.tasks.lock() {
                for task in tasks.drain(..) {
                    task.abort();
                }
            }
            if let Some(mut browser) = self.browser.lock().await.take() {
                browser.close().await.map_err(driver_err)?;
                let _ = browser.wait().await;
            }
            info!("chromium closed");
            Ok(())
        }
    }

    impl Drop for ChromiumDriver {
        fn drop(&mut self) {
            if let Ok(mut tasks) = self.tasks.lock() {
                for task in tasks.drain(..) {
                    task.abort();
                }
            }
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::ChromiumDriver;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = BrowserConfig::default()
            .with_viewport(1920, 1080)
            .with_headless(false)
            .with_chromium_path("/usr/bin/chromium")
            .with_no_sandbox();
        assert_eq!(config.viewport_width, 1920);
        assert_eq!(config.viewport_height, 1080);
        assert!(!config.headless);
        assert!(!config.sandbox);
        assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
    }

    #[test]
    fn test_config_yaml_defaults() {
        let config: BrowserConfig = serde_yaml_ng::from_str("sandbox: false\n").unwrap();
        assert!(config.headless);
        assert!(!config.sandbox);
        assert_eq!(config.viewport_width, 1280);
    }

    #[test]
    fn test_js_string_literals_are_escaped() {
        assert_eq!(js_str("a\"b"), "\"a\\\"b\"");
        assert_eq!(js_str("line\nbreak"), "\"line\\nbreak\"");
        assert!(fill_body("it's \"quoted\"").contains("\"it's \\\"quoted\\\"\""));
    }

    #[test]
    fn test_scripts_embed_queries() {
        let script = element_script("document.querySelector('#a')", "el.click();");
        assert!(script.starts_with("(() => { const el = document.querySelector('#a');"));
        assert!(script.ends_with("return true; })()"));
        assert!(state_script("[]").contains("count: all.length"));
        assert!(press_body("Enter").contains("key: \"Enter\""));
    }
}

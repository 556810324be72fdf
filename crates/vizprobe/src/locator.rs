//! Locators: how actions and conditions name their target element.
//!
//! A [`Selector`] is pure data. It renders to a JavaScript query expression for
//! drivers that resolve elements by evaluation, and it can be parsed from the
//! short textual form used in scenario files (`#id`, `text=Insert`,
//! `testid=submit`, `xpath=//button`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// JSON-encoded string literal for embedding in page scripts
pub(crate) fn js_str(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// CSS selector (e.g., "#insertBtn")
    Css(String),
    /// XPath selector
    XPath(String),
    /// Leaf element (no child elements) whose text contains the string
    Text(String),
    /// Test ID selector (data-testid attribute)
    TestId(String),
    /// CSS selector filtered by text content
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text content to match
        text: String,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(path: impl Into<String>) -> Self {
        Self::XPath(path.into())
    }

    /// Parse the short textual form used in scenario files.
    ///
    /// Anything without a recognised `engine=` prefix is CSS.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix("text=") {
            Self::Text(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix("testid=") {
            Self::TestId(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix("xpath=") {
            Self::XPath(rest.to_string())
        } else if let Some((css, text)) = raw.split_once(":has-text(") {
            let text = text.trim_end_matches(')').trim_matches(|c| c == '"' || c == '\'');
            Self::CssWithText {
                css: css.to_string(),
                text: text.to_string(),
            }
        } else {
            Self::Css(raw.to_string())
        }
    }

    /// JavaScript expression evaluating to an array of every matching element
    #[must_use]
    pub fn to_all_query(&self) -> String {
        match self {
            Self::Css(s) => format!("Array.from(document.querySelectorAll({}))", js_str(s)),
            Self::XPath(s) => format!(
                "(() => {{ const r = document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
                 const out = []; for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); return out; }})()",
                js_str(s)
            ),
            Self::Text(t) => format!(
                "Array.from(document.querySelectorAll('body *')).filter(el => \
                 el.children.length === 0 && el.textContent.includes({}))",
                js_str(t)
            ),
            Self::TestId(id) => {
                let attr = format!("[data-testid={}]", js_str(id));
                format!("Array.from(document.querySelectorAll({}))", js_str(&attr))
            }
            Self::CssWithText { css, text } => format!(
                "Array.from(document.querySelectorAll({})).filter(el => el.textContent.includes({}))",
                js_str(css),
                js_str(text)
            ),
        }
    }

    /// JavaScript expression evaluating to the first match or `undefined`
    #[must_use]
    pub fn to_query(&self) -> String {
        format!("{}[0]", self.to_all_query())
    }

    /// JavaScript expression evaluating to the number of matches
    #[must_use]
    pub fn to_count_query(&self) -> String {
        format!("{}.length", self.to_all_query())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "{s}"),
            Self::XPath(s) => write!(f, "xpath={s}"),
            Self::Text(t) => write!(f, "text={t}"),
            Self::TestId(id) => write!(f, "testid={id}"),
            Self::CssWithText { css, text } => write!(f, "{css}:has-text({text:?})"),
        }
    }
}

impl From<&str> for Selector {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl Serialize for Selector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// A selector plus an optional per-locator timeout override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Selector", into = "Selector")]
pub struct Locator {
    selector: Selector,
    timeout: Option<Duration>,
}

impl Locator {
    /// Create a locator with a CSS selector
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self::from_selector(Selector::Css(selector.into()))
    }

    /// Create a locator from a selector
    #[must_use]
    pub const fn from_selector(selector: Selector) -> Self {
        Self {
            selector,
            timeout: None,
        }
    }

    /// Filter a CSS locator by text content
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        let selector = match self.selector {
            Selector::Css(css) => Selector::CssWithText {
                css,
                text: text.into(),
            },
            other => other,
        };
        Self { selector, ..self }
    }

    /// Override the harness action timeout for this locator
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Per-locator timeout, if any
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.selector.fmt(f)
    }
}

impl From<Selector> for Locator {
    fn from(selector: Selector) -> Self {
        Self::from_selector(selector)
    }
}

impl From<Locator> for Selector {
    fn from(locator: Locator) -> Self {
        locator.selector
    }
}

impl From<&str> for Locator {
    fn from(raw: &str) -> Self {
        Self::from_selector(Selector::parse(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prefixes() {
        assert_eq!(Selector::parse("#insertBtn"), Selector::css("#insertBtn"));
        assert_eq!(Selector::parse("text=Insert"), Selector::text("Insert"));
        assert_eq!(Selector::parse("testid=add"), Selector::test_id("add"));
        assert_eq!(Selector::parse("xpath=//button"), Selector::xpath("//button"));
        assert_eq!(
            Selector::parse("button:has-text(\"Run\")"),
            Selector::CssWithText {
                css: "button".to_string(),
                text: "Run".to_string(),
            }
        );
    }

    #[test]
    fn test_display_parses_back() {
        for raw in ["#a", "text=Go", "testid=x", "xpath=//div", "li:has-text(\"3\")"] {
            let sel = Selector::parse(raw);
            assert_eq!(Selector::parse(&sel.to_string()), sel, "{raw}");
        }
    }

    #[test]
    fn test_queries_escape_selector() {
        let sel = Selector::css("input[name=\"v\"]");
        assert_eq!(
            sel.to_count_query(),
            "Array.from(document.querySelectorAll(\"input[name=\\\"v\\\"]\")).length"
        );
        assert!(sel.to_query().ends_with("[0]"));
    }

    #[test]
    fn test_queries_use_js_string_escapes() {
        let sel = Selector::text("tab\u{1b}here");
        let query = sel.to_all_query();
        assert!(query.contains("\"tab\\u001bhere\""), "{query}");
        assert!(!query.contains("\\u{"), "{query}");

        let sel = Selector::test_id("say \"hi\"");
        assert_eq!(
            sel.to_query(),
            r#"Array.from(document.querySelectorAll("[data-testid=\"say \\\"hi\\\"\"]"))[0]"#
        );
    }

    #[test]
    fn test_locator_with_text_only_wraps_css() {
        let loc = Locator::new("button").with_text("Insert");
        assert_eq!(loc.to_string(), "button:has-text(\"Insert\")");
        let loc = Locator::from(Selector::test_id("x")).with_text("ignored");
        assert_eq!(loc.selector(), &Selector::test_id("x"));
    }

    #[test]
    fn test_locator_deserializes_from_string() {
        let loc: Locator = serde_json::from_str("\"#valueInput\"").unwrap();
        assert_eq!(loc.selector(), &Selector::css("#valueInput"));
        assert!(loc.timeout().is_none());
    }
}

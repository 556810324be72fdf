//! Conditions: pure predicates over live page state.
//!
//! A condition only reads. It is evaluated repeatedly by [`crate::wait`] until
//! it holds or the wait times out, and its [`Condition::description`] is what
//! a timeout error reports.

use crate::diagnostics::DiagnosticsSink;
use crate::driver::PageDriver;
use crate::locator::Locator;
use crate::result::HarnessResult;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Predicate over page state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Trimmed text content equals `text`
    TextEquals {
        /// Element
        locator: Locator,
        /// Expected text
        text: String,
    },
    /// Text content contains `text`
    TextContains {
        /// Element
        locator: Locator,
        /// Expected substring
        text: String,
    },
    /// Form value equals `value`
    ValueEquals {
        /// Element
        locator: Locator,
        /// Expected value
        value: String,
    },
    /// Exactly `count` elements match
    CountEquals {
        /// Elements
        locator: Locator,
        /// Expected count
        count: usize,
    },
    /// Attribute is present (any value)
    AttributePresent {
        /// Element
        locator: Locator,
        /// Attribute name
        name: String,
    },
    /// Attribute equals `value`
    AttributeEquals {
        /// Element
        locator: Locator,
        /// Attribute name
        name: String,
        /// Expected value
        value: String,
    },
    /// Element is attached and visible
    Visible {
        /// Element
        locator: Locator,
    },
    /// Element is absent or not visible
    Hidden {
        /// Element
        locator: Locator,
    },
    /// Element is attached and enabled
    Enabled {
        /// Element
        locator: Locator,
    },
    /// Element is attached and disabled
    Disabled {
        /// Element
        locator: Locator,
    },
    /// JavaScript expression evaluates to a truthy value.
    ///
    /// The expression must not mutate the page.
    Script {
        /// Expression
        expression: String,
        /// Optional description used in timeouts
        #[serde(default)]
        description: Option<String>,
    },
    /// A console message containing `text` has been captured
    ConsoleContains {
        /// Expected substring
        text: String,
    },
    /// Every inner condition holds
    All(Vec<Condition>),
    /// At least one inner condition holds
    Any(Vec<Condition>),
    /// Inner condition does not hold
    Not(Box<Condition>),
}

/// What a condition can look at
#[derive(Clone, Copy)]
pub struct PageView<'a> {
    /// Live page
    pub driver: &'a dyn PageDriver,
    /// Diagnostics captured so far
    pub diagnostics: &'a Arc<Mutex<DiagnosticsSink>>,
}

impl std::fmt::Debug for PageView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageView").finish_non_exhaustive()
    }
}

impl Condition {
    /// Text equals
    #[must_use]
    pub fn text_equals(locator: impl Into<Locator>, text: impl Into<String>) -> Self {
        Self::TextEquals {
            locator: locator.into(),
            text: text.into(),
        }
    }

    /// Text contains
    #[must_use]
    pub fn text_contains(locator: impl Into<Locator>, text: impl Into<String>) -> Self {
        Self::TextContains {
            locator: locator.into(),
            text: text.into(),
        }
    }

    /// Value equals
    #[must_use]
    pub fn value_equals(locator: impl Into<Locator>, value: impl Into<String>) -> Self {
        Self::ValueEquals {
            locator: locator.into(),
            value: value.into(),
        }
    }

    /// Count equals
    #[must_use]
    pub fn count_equals(locator: impl Into<Locator>, count: usize) -> Self {
        Self::CountEquals {
            locator: locator.into(),
            count,
        }
    }

    /// Attribute present
    #[must_use]
    pub fn attribute_present(locator: impl Into<Locator>, name: impl Into<String>) -> Self {
        Self::AttributePresent {
            locator: locator.into(),
            name: name.into(),
        }
    }

    /// Attribute equals
    #[must_use]
    pub fn attribute_equals(
        locator: impl Into<Locator>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::AttributeEquals {
            locator: locator.into(),
            name: name.into(),
            value: value.into(),
        }
    }

    /// Visible
    #[must_use]
    pub fn visible(locator: impl Into<Locator>) -> Self {
        Self::Visible {
            locator: locator.into(),
        }
    }

    /// Hidden
    #[must_use]
    pub fn hidden(locator: impl Into<Locator>) -> Self {
        Self::Hidden {
            locator: locator.into(),
        }
    }

    /// Enabled
    #[must_use]
    pub fn enabled(locator: impl Into<Locator>) -> Self {
        Self::Enabled {
            locator: locator.into(),
        }
    }

    /// Disabled
    #[must_use]
    pub fn disabled(locator: impl Into<Locator>) -> Self {
        Self::Disabled {
            locator: locator.into(),
        }
    }

    /// JavaScript predicate
    #[must_use]
    pub fn script(expression: impl Into<String>) -> Self {
        Self::Script {
            expression: expression.into(),
            description: None,
        }
    }

    /// Console message captured
    #[must_use]
    pub fn console_contains(text: impl Into<String>) -> Self {
        Self::ConsoleContains { text: text.into() }
    }

    /// Negate
    #[must_use]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Human-readable description used in timeout errors
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::TextEquals { locator, text } => format!("text of {locator} to equal {text:?}"),
            Self::TextContains { locator, text } => {
                format!("text of {locator} to contain {text:?}")
            }
            Self::ValueEquals { locator, value } => {
                format!("value of {locator} to equal {value:?}")
            }
            Self::CountEquals { locator, count } => format!("{count} element(s) matching {locator}"),
            Self::AttributePresent { locator, name } => {
                format!("attribute {name:?} on {locator}")
            }
            Self::AttributeEquals {
                locator,
                name,
                value,
            } => format!("attribute {name:?} of {locator} to equal {value:?}"),
            Self::Visible { locator } => format!("{locator} to be visible"),
            Self::Hidden { locator } => format!("{locator} to be hidden"),
            Self::Enabled { locator } => format!("{locator} to be enabled"),
            Self::Disabled { locator } => format!("{locator} to be disabled"),
            Self::Script {
                expression,
                description,
            } => description
                .clone()
                .unwrap_or_else(|| format!("script `{expression}` to be truthy")),
            Self::ConsoleContains { text } => format!("console message containing {text:?}"),
            Self::All(inner) => join("all of", inner),
            Self::Any(inner) => join("any of", inner),
            Self::Not(inner) => format!("not ({})", inner.description()),
        }
    }

    /// Evaluate once against live state
    pub fn evaluate<'a>(&'a self, view: PageView<'a>) -> BoxFuture<'a, HarnessResult<bool>> {
        async move {
            let driver = view.driver;
            match self {
                Self::TextEquals { locator, text } => Ok(driver
                    .text_content(locator.selector())
                    .await?
                    .is_some_and(|t| t.trim() == text.trim())),
                Self::TextContains { locator, text } => Ok(driver
                    .text_content(locator.selector())
                    .await?
                    .is_some_and(|t| t.contains(text.as_str()))),
                Self::ValueEquals { locator, value } => Ok(driver
                    .input_value(locator.selector())
                    .await?
                    .is_some_and(|v| v == *value)),
                Self::CountEquals { locator, count } => {
                    Ok(driver.element_state(locator.selector()).await?.count == *count)
                }
                Self::AttributePresent { locator, name } => Ok(driver
                    .attribute(locator.selector(), name)
                    .await?
                    .is_some()),
                Self::AttributeEquals {
                    locator,
                    name,
                    value,
                } => Ok(driver
                    .attribute(locator.selector(), name)
                    .await?
                    .is_some_and(|v| v == *value)),
                Self::Visible { locator } => {
                    let state = driver.element_state(locator.selector()).await?;
                    Ok(state.is_attached() && state.visible)
                }
                Self::Hidden { locator } => {
                    let state = driver.element_state(locator.selector()).await?;
                    Ok(!state.is_attached() || !state.visible)
                }
                Self::Enabled { locator } => {
                    let state = driver.element_state(locator.selector()).await?;
                    Ok(state.is_attached() && state.enabled)
                }
                Self::Disabled { locator } => {
                    let state = driver.element_state(locator.selector()).await?;
                    Ok(state.is_attached() && !state.enabled)
                }
                Self::Script { expression, .. } => {
                    Ok(is_truthy(&driver.evaluate(expression).await?))
                }
                Self::ConsoleContains { text } => Ok(view
                    .diagnostics
                    .lock()
                    .map(|sink| sink.console_contains(text))
                    .unwrap_or(false)),
                Self::All(inner) => {
                    for condition in inner {
                        if !condition.evaluate(view).await? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                Self::Any(inner) => {
                    for condition in inner {
                        if condition.evaluate(view).await? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
                Self::Not(inner) => Ok(!inner.evaluate(view).await?),
            }
        }
        .boxed()
    }
}

fn join(prefix: &str, inner: &[Condition]) -> String {
    let parts: Vec<String> = inner.iter().map(Condition::description).collect();
    format!("{prefix} [{}]", parts.join(", "))
}

/// JavaScript truthiness of an evaluation result
#[must_use]
pub fn is_truthy(value: &serde_json::Value) -> bool {
    use serde_json::Value;
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

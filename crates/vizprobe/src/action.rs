//! User-like actions performed against a located element.

use crate::locator::Locator;
use serde::{Deserialize, Serialize};

/// A single user operation. Stateless; executed once per `perform`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Replace the value of an input
    Fill {
        /// Target element
        locator: Locator,
        /// New value
        value: String,
    },
    /// Click the element
    Click {
        /// Target element
        locator: Locator,
    },
    /// Double-click the element
    DoubleClick {
        /// Target element
        locator: Locator,
    },
    /// Press a key while the element has focus (e.g. "Enter")
    Press {
        /// Target element
        locator: Locator,
        /// Key name
        key: String,
    },
    /// Set a checkbox or radio state
    Check {
        /// Target element
        locator: Locator,
        /// Desired checked state
        #[serde(default = "default_checked")]
        checked: bool,
    },
    /// Choose an option of a `<select>` by value
    SelectOption {
        /// Target element
        locator: Locator,
        /// Option value
        value: String,
    },
}

const fn default_checked() -> bool {
    true
}

impl Action {
    /// Fill an input
    #[must_use]
    pub fn fill(locator: impl Into<Locator>, value: impl Into<String>) -> Self {
        Self::Fill {
            locator: locator.into(),
            value: value.into(),
        }
    }

    /// Click an element
    #[must_use]
    pub fn click(locator: impl Into<Locator>) -> Self {
        Self::Click {
            locator: locator.into(),
        }
    }

    /// Double-click an element
    #[must_use]
    pub fn double_click(locator: impl Into<Locator>) -> Self {
        Self::DoubleClick {
            locator: locator.into(),
        }
    }

    /// Press a key on an element
    #[must_use]
    pub fn press(locator: impl Into<Locator>, key: impl Into<String>) -> Self {
        Self::Press {
            locator: locator.into(),
            key: key.into(),
        }
    }

    /// Check or uncheck an element
    #[must_use]
    pub fn check(locator: impl Into<Locator>, checked: bool) -> Self {
        Self::Check {
            locator: locator.into(),
            checked,
        }
    }

    /// Select an option by value
    #[must_use]
    pub fn select_option(locator: impl Into<Locator>, value: impl Into<String>) -> Self {
        Self::SelectOption {
            locator: locator.into(),
            value: value.into(),
        }
    }

    /// Get the target of this action
    #[must_use]
    pub const fn locator(&self) -> &Locator {
        match self {
            Self::Fill { locator, .. }
            | Self::Click { locator }
            | Self::DoubleClick { locator }
            | Self::Press { locator, .. }
            | Self::Check { locator, .. }
            | Self::SelectOption { locator, .. } => locator,
        }
    }

    /// Whether the target must accept text input (not just be enabled)
    #[must_use]
    pub const fn needs_editable(&self) -> bool {
        matches!(self, Self::Fill { .. })
    }

    /// Human-readable description for logs and errors
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Fill { locator, value } => format!("fill {locator} with {value:?}"),
            Self::Click { locator } => format!("click {locator}"),
            Self::DoubleClick { locator } => format!("double-click {locator}"),
            Self::Press { locator, key } => format!("press {key} on {locator}"),
            Self::Check { locator, checked } => {
                format!("{} {locator}", if *checked { "check" } else { "uncheck" })
            }
            Self::SelectOption { locator, value } => format!("select {value:?} in {locator}"),
        }
    }
}

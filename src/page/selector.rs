//! Element locator strategies.
//!
//! The injector only ever looks elements up by ID, class, tag or ID prefix,
//! so [`By`] carries exactly those. Each strategy maps to a CSS selector
//! for host bindings that forward to `querySelector`.
//!
//! # Example
//!
//! ```ignore
//! use custom_tabs::By;
//!
//! let slider = page.query(&By::class("emby-tabs-slider"));
//! let injected = page.query_within(slider?, &By::id_prefix("tab_"));
//! ```

use serde::{Deserialize, Serialize};

// ============================================================================
// By Enum
// ============================================================================

/// Element locator strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "value")]
pub enum By {
    /// Exact `id` attribute (`#value`).
    #[serde(rename = "id")]
    Id(String),

    /// One entry of the class list (`.value`).
    #[serde(rename = "class")]
    Class(String),

    /// Tag name, case-insensitive (`value`).
    #[serde(rename = "tag")]
    Tag(String),

    /// `id` attribute starting with a prefix (`[id^="value"]`).
    #[serde(rename = "idPrefix")]
    IdPrefix(String),
}

impl By {
    /// Creates an ID selector.
    #[inline]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Creates a class selector.
    #[inline]
    pub fn class(class: impl Into<String>) -> Self {
        Self::Class(class.into())
    }

    /// Creates a tag selector.
    #[inline]
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into())
    }

    /// Creates an ID prefix selector.
    #[inline]
    pub fn id_prefix(prefix: impl Into<String>) -> Self {
        Self::IdPrefix(prefix.into())
    }

    /// Returns the strategy name.
    #[must_use]
    pub fn strategy(&self) -> &'static str {
        match self {
            Self::Id(_) => "id",
            Self::Class(_) => "class",
            Self::Tag(_) => "tag",
            Self::IdPrefix(_) => "idPrefix",
        }
    }

    /// Returns the selector value.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Id(v) | Self::Class(v) | Self::Tag(v) | Self::IdPrefix(v) => v,
        }
    }

    /// Renders the equivalent CSS selector.
    #[must_use]
    pub fn to_css(&self) -> String {
        match self {
            Self::Id(v) => format!("#{v}"),
            Self::Class(v) => format!(".{v}"),
            Self::Tag(v) => v.to_ascii_lowercase(),
            Self::IdPrefix(v) => format!("[id^=\"{v}\"]"),
        }
    }

    /// Tests an element described by its tag and attribute lookup.
    pub fn matches<'a>(&self, tag: &str, attribute: impl Fn(&str) -> Option<&'a str>) -> bool {
        match self {
            Self::Id(v) => attribute("id") == Some(v.as_str()),
            Self::Class(v) => attribute("class")
                .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == v)),
            Self::Tag(v) => tag.eq_ignore_ascii_case(v),
            Self::IdPrefix(v) => attribute("id").is_some_and(|id| id.starts_with(v.as_str())),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Route settings and their wire projection
//!
//! `RouteSettings` is the identity and transient state of one navigation
//! entry: a URL, a per-URL instance index, and the animation flag and opaque
//! parameters stamped onto the entry just before an operation. Platform
//! containers and engine channels receive settings as a flattened key-value
//! [`Arguments`] map.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flattened key-value projection of route settings
///
/// Handed to platform containers (`on_push`, `on_pop`, ...) and engine
/// channels as the wire form of a route: `url`, `index`, `animated` and,
/// when present, `params`.
pub type Arguments = Map<String, Value>;

/// Settings identifying one navigation entry
///
/// `(url, index)` is unique among the live routes of a single container.
/// Indexes start at 1 and grow monotonically per URL as new instances of
/// the same page are pushed.
///
/// # Example
///
/// ```
/// use page_navigator::RouteSettings;
///
/// let settings = RouteSettings::new("/detail", 1);
/// assert!(settings.matches("/detail", None));
/// assert!(settings.matches("/detail", Some(0)));
/// assert!(!settings.matches("/detail", Some(2)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSettings {
    /// Page URL
    pub url: String,
    /// Per-URL instance index (>= 1)
    pub index: usize,
    /// Whether the next transition for this entry is animated
    pub animated: bool,
    /// Opaque parameters for the next operation on this entry
    pub params: Option<Value>,
}

impl RouteSettings {
    /// Create settings for a URL instance
    pub fn new(url: impl Into<String>, index: usize) -> Self {
        Self {
            url: url.into(),
            index,
            animated: true,
            params: None,
        }
    }

    /// Set the opaque parameters
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Set the animation flag
    pub fn animated(mut self, animated: bool) -> Self {
        self.animated = animated;
        self
    }

    /// Match against a target `(url, index)` filter
    ///
    /// An index filter of `None` or `Some(0)` is the "any instance"
    /// sentinel; any other value requires an exact match.
    pub fn matches(&self, url: &str, index: Option<usize>) -> bool {
        self.url == url && index_matches(index, self.index)
    }

    /// Flatten into the wire projection
    pub fn to_arguments(&self) -> Arguments {
        let mut args = Arguments::new();
        args.insert("url".to_string(), Value::String(self.url.clone()));
        args.insert("index".to_string(), Value::from(self.index));
        args.insert("animated".to_string(), Value::Bool(self.animated));
        if let Some(params) = &self.params {
            args.insert("params".to_string(), params.clone());
        }
        args
    }
}

/// Check an index filter against a concrete index
///
/// `None` and `Some(0)` mean "don't filter on index".
pub(crate) fn index_matches(filter: Option<usize>, index: usize) -> bool {
    match filter {
        None | Some(0) => true,
        Some(wanted) => wanted == index,
    }
}

// ============================================================================
// Tests
// ============================================================================

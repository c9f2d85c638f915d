//! Page route definition
//!
//! A [`PageRoute`] is one logical navigation-history entry: route settings
//! plus the bookkeeping that ties the entry to the rendering engine that
//! owns it and the engine that pushed it, an at-most-once popped-result
//! callback, and a pending-notification queue drained by the host when the
//! page surfaces.

use crate::engine::{DEFAULT_ENTRYPOINT, NATIVE_ENTRYPOINT};
use crate::settings::RouteSettings;
use serde_json::Value;
use std::fmt;

/// Callback invoked with the pop parameters when the route is popped
///
/// Cleared after the first invocation; it never fires twice.
pub type PoppedCallback = Box<dyn FnOnce(Option<Value>)>;

/// One logical navigation-history entry within a container
///
/// # Example
///
/// ```
/// use page_navigator::PageRoute;
/// use serde_json::json;
///
/// let route = PageRoute::new("/detail")
///     .with_index(1)
///     .with_params(json!({"id": 42}))
///     .from_entrypoint("order");
///
/// assert!(route.matches("/detail", Some(1)));
/// ```
pub struct PageRoute {
    /// Identity and transient operation state
    pub settings: RouteSettings,
    /// Logical engine that rendered this page
    pub entrypoint: String,
    /// Logical engine that initiated the push
    pub from_entrypoint: String,
    popped_result: Option<PoppedCallback>,
    notifications: Vec<(String, Option<Value>)>,
}

impl PageRoute {
    /// Create a route for a URL
    ///
    /// The instance index starts at 0 (unassigned); [`PageStack::push`]
    /// stamps the real per-URL index at push time. Use [`with_index`] when
    /// constructing routes by hand.
    ///
    /// [`PageStack::push`]: crate::PageStack::push
    /// [`with_index`]: PageRoute::with_index
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            settings: RouteSettings::new(url, 0),
            entrypoint: DEFAULT_ENTRYPOINT.to_string(),
            from_entrypoint: NATIVE_ENTRYPOINT.to_string(),
            popped_result: None,
            notifications: Vec::new(),
        }
    }

    /// Set the per-URL instance index
    pub fn with_index(mut self, index: usize) -> Self {
        self.settings.index = index;
        self
    }

    /// Set the opaque push parameters
    pub fn with_params(mut self, params: Value) -> Self {
        self.settings.params = Some(params);
        self
    }

    /// Set the animation flag
    pub fn animated(mut self, animated: bool) -> Self {
        self.settings.animated = animated;
        self
    }

    /// Set the engine that initiated the push
    ///
    /// Defaults to the native sentinel, meaning the push came from platform
    /// code rather than a rendering engine.
    pub fn from_entrypoint(mut self, entrypoint: impl Into<String>) -> Self {
        self.from_entrypoint = entrypoint.into();
        self
    }

    /// Set the callback fired when this route is popped
    pub fn on_popped<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(Option<Value>) + 'static,
    {
        self.popped_result = Some(Box::new(callback));
        self
    }

    /// Match against a `(url, index)` filter
    ///
    /// An index of `None` or `Some(0)` matches any instance.
    pub fn matches(&self, url: &str, index: Option<usize>) -> bool {
        self.settings.matches(url, index)
    }

    /// Whether this route crossed engines on its way in
    ///
    /// True when the push originated from a rendering engine other than the
    /// one that rendered the page; such routes owe that engine a pop
    /// notification when they leave the stack.
    pub fn crossed_engines(&self) -> bool {
        self.from_entrypoint != NATIVE_ENTRYPOINT && self.from_entrypoint != self.entrypoint
    }

    /// Queue a named notification for this route
    pub fn add_notification(&mut self, name: impl Into<String>, params: Option<Value>) {
        self.notifications.push((name.into(), params));
    }

    /// Drain the pending notifications, oldest first
    ///
    /// The host delivers these to the page when it next surfaces.
    pub fn take_notifications(&mut self) -> Vec<(String, Option<Value>)> {
        std::mem::take(&mut self.notifications)
    }

    /// Take the popped-result callback, leaving `None` behind
    pub(crate) fn take_popped_result(&mut self) -> Option<PoppedCallback> {
        self.popped_result.take()
    }
}

impl fmt::Debug for PageRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageRoute")
            .field("settings", &self.settings)
            .field("entrypoint", &self.entrypoint)
            .field("from_entrypoint", &self.from_entrypoint)
            .field("popped_result", &self.popped_result.is_some())
            .field("notifications", &self.notifications.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_route_defaults() {
        let route = PageRoute::new("/home");
        assert_eq!(route.settings.url, "/home");
        assert_eq!(route.settings.index, 0);
        assert_eq!(route.entrypoint, DEFAULT_ENTRYPOINT);
        assert_eq!(route.from_entrypoint, NATIVE_ENTRYPOINT);
    }

    #[test]
    fn test_route_builder() {
        let route = PageRoute::new("/detail")
            .with_index(2)
            .with_params(json!({"id": 1}))
            .animated(false)
            .from_entrypoint("order");

        assert_eq!(route.settings.index, 2);
        assert_eq!(route.settings.params, Some(json!({"id": 1})));
        assert!(!route.settings.animated);
        assert_eq!(route.from_entrypoint, "order");
    }

    #[test]
    fn test_crossed_engines() {
        let native = PageRoute::new("/a");
        assert!(!native.crossed_engines());

        let mut same = PageRoute::new("/a").from_entrypoint("main");
        same.entrypoint = "main".to_string();
        assert!(!same.crossed_engines());

        let mut crossed = PageRoute::new("/a").from_entrypoint("order");
        crossed.entrypoint = "main".to_string();
        assert!(crossed.crossed_engines());
    }

    #[test]
    fn test_notification_queue_order() {
        let mut route = PageRoute::new("/a");
        route.add_notification("first", None);
        route.add_notification("second", Some(json!(1)));

        let drained = route.take_notifications();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].0, "first");
        assert_eq!(drained[1], ("second".to_string(), Some(json!(1))));

        assert!(route.take_notifications().is_empty());
    }

    #[test]
    fn test_popped_result_taken_once() {
        let fired = Rc::new(Cell::new(0));
        let fired_in = fired.clone();
        let mut route = PageRoute::new("/a").on_popped(move |_| {
            fired_in.set(fired_in.get() + 1);
        });

        let callback = route.take_popped_result().unwrap();
        callback(Some(json!("result")));
        assert_eq!(fired.get(), 1);

        assert!(route.take_popped_result().is_none());
    }
}

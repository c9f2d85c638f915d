//! Per-container route bookkeeping
//!
//! A [`PageHolder`] owns the ordered list of routes pushed within one
//! native container instance. Mutating operations follow the strict
//! request -> platform acknowledgment -> commit pattern: the route list
//! changes only after the container's transition channel confirms the
//! visual transition, never optimistically. Containers without a channel
//! (unmanaged) commit the same bookkeeping synchronously.

use crate::engine::{CrossEngineNotifier, NATIVE_ENTRYPOINT};
use crate::error::NavigationError;
use crate::lifecycle::NavigationAction;
use crate::observers::{PageObservers, RouteObservers};
use crate::platform::{BooleanCallback, IndexCallback, PageId, PlatformContainer};
use crate::route::PageRoute;
use crate::settings::RouteSettings;
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Shared handle to a holder
///
/// Operations that cross into the platform take the shared handle so their
/// acknowledgment callbacks can commit against the same holder later.
pub type HolderRef = Rc<RefCell<PageHolder>>;

/// Ordered routes of one native container instance
pub struct PageHolder {
    page_id: PageId,
    entrypoint: String,
    routes: Vec<PageRoute>,
    container: Option<Weak<dyn PlatformContainer>>,
    pushed_by_navigator: bool,
    expecting_system_destroy: bool,
    engines: CrossEngineNotifier,
    page_observers: PageObservers,
    route_observers: RouteObservers,
}

impl PageHolder {
    /// Create a holder with detached collaborators
    ///
    /// Engine fan-out and observer notifications become no-ops; the
    /// registry injects live collaborators via `with_collaborators`.
    pub fn new(page_id: PageId, entrypoint: impl Into<String>) -> Self {
        Self::with_collaborators(
            page_id,
            entrypoint.into(),
            CrossEngineNotifier::disconnected(),
            PageObservers::new(),
            RouteObservers::new(),
        )
    }

    pub(crate) fn with_collaborators(
        page_id: PageId,
        entrypoint: String,
        engines: CrossEngineNotifier,
        page_observers: PageObservers,
        route_observers: RouteObservers,
    ) -> Self {
        Self {
            page_id,
            entrypoint,
            routes: Vec::new(),
            container: None,
            pushed_by_navigator: false,
            expecting_system_destroy: false,
            engines,
            page_observers,
            route_observers,
        }
    }

    /// Stable page identity of this holder
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Engine that was live when the container was created
    pub fn entrypoint(&self) -> &str {
        &self.entrypoint
    }

    /// Whether this container exists to host navigator-pushed pages
    pub fn pushed_by_navigator(&self) -> bool {
        self.pushed_by_navigator
    }

    pub(crate) fn mark_pushed_by_navigator(&mut self) {
        self.pushed_by_navigator = true;
    }

    pub(crate) fn expecting_system_destroy(&self) -> bool {
        self.expecting_system_destroy
    }

    pub(crate) fn set_expecting_system_destroy(&mut self, expecting: bool) {
        self.expecting_system_destroy = expecting;
    }

    /// Attach the live platform instance (create/start/resume)
    pub fn attach(&mut self, container: &Rc<dyn PlatformContainer>) {
        self.container = Some(Rc::downgrade(container));
    }

    /// Drop the platform back-reference (backgrounded/destroyed)
    pub fn detach(&mut self) {
        self.container = None;
    }

    /// Upgrade the platform back-reference, if the instance is still alive
    pub fn live_container(&self) -> Option<Rc<dyn PlatformContainer>> {
        self.container.as_ref()?.upgrade()
    }

    fn require_container(&self) -> Result<Rc<dyn PlatformContainer>, NavigationError> {
        self.live_container()
            .ok_or(NavigationError::StaleContainer {
                page_id: self.page_id,
            })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Check for a live route
    ///
    /// `url == None` matches any route; an index of `None` or `Some(0)`
    /// matches any instance of the URL.
    pub fn has_route(&self, url: Option<&str>, index: Option<usize>) -> bool {
        match url {
            None => !self.routes.is_empty(),
            Some(url) => self.routes.iter().any(|route| route.matches(url, index)),
        }
    }

    /// Most recent route matching the filter
    pub fn last_route(&self, url: Option<&str>, index: Option<usize>) -> Option<&PageRoute> {
        match url {
            None => self.routes.last(),
            Some(url) => self
                .routes
                .iter()
                .rev()
                .find(|route| route.matches(url, index)),
        }
    }

    /// Most recent route rendered by an engine
    pub fn last_route_for_engine(&self, entrypoint: &str) -> Option<&PageRoute> {
        self.routes
            .iter()
            .rev()
            .find(|route| route.entrypoint == entrypoint)
    }

    /// Settings of every route matching the URL, most recent first
    pub fn all_routes(&self, url: &str) -> Vec<RouteSettings> {
        self.routes
            .iter()
            .rev()
            .filter(|route| route.matches(url, None))
            .map(|route| route.settings.clone())
            .collect()
    }

    /// Snapshot of the whole route list, oldest first
    pub fn route_settings(&self) -> Vec<RouteSettings> {
        self.routes
            .iter()
            .map(|route| route.settings.clone())
            .collect()
    }

    fn last_position(&self, url: &str, index: Option<usize>) -> Option<usize> {
        self.routes
            .iter()
            .rposition(|route| route.matches(url, index))
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Push a route onto this container
    ///
    /// Managed containers round-trip through the platform and commit on
    /// acknowledgment; unmanaged containers append immediately. Reports the
    /// route's index, or `None` when the container is gone or the platform
    /// declined.
    pub fn push(holder: &HolderRef, route: PageRoute, result: IndexCallback) {
        let prepared = {
            let h = holder.borrow();
            h.require_container()
        };
        let container = match prepared {
            Ok(container) => container,
            Err(error) => {
                crate::debug_log!("push {} aborted: {}", route.settings.url, error);
                result(None);
                return;
            }
        };

        let index = route.settings.index;
        match container.transition_channel() {
            Some(channel) => {
                let args = route.settings.to_arguments();
                let holder = Rc::clone(holder);
                channel.on_push(
                    &args,
                    Box::new(move |ok| {
                        if ok {
                            holder.borrow_mut().routes.push(route);
                            result(Some(index));
                        } else {
                            crate::debug_log!(
                                "{}",
                                NavigationError::PlatformRejected {
                                    action: NavigationAction::Push
                                }
                            );
                            result(None);
                        }
                    }),
                );
            }
            None => {
                holder.borrow_mut().routes.push(route);
                result(Some(index));
            }
        }
    }

    /// Pop the last route
    ///
    /// Stamps `params`/`animated` onto the route before the platform round
    /// trip. On success the route leaves the list, its popped-result
    /// callback fires exactly once with `params`, and the pop is forwarded
    /// to the origin engine when the route crossed engines.
    pub fn pop(
        holder: &HolderRef,
        params: Option<Value>,
        animated: bool,
        result: BooleanCallback,
    ) {
        let prepared = {
            let mut h = holder.borrow_mut();
            let page_id = h.page_id;
            if h.routes.is_empty() {
                Err(NavigationError::RouteNotFound {
                    url: None,
                    index: None,
                })
            } else {
                let last = h.routes.len() - 1;
                let route = &mut h.routes[last];
                route.settings.params = params.clone();
                route.settings.animated = animated;
                let args = route.settings.to_arguments();
                match h.require_container() {
                    Ok(container) if container.is_destroyed() => {
                        Err(NavigationError::StaleContainer { page_id })
                    }
                    Ok(container) => Ok((container, args)),
                    Err(error) => Err(error),
                }
            }
        };
        let (container, args) = match prepared {
            Ok(value) => value,
            Err(error) => {
                crate::debug_log!("pop aborted: {}", error);
                result(false);
                return;
            }
        };

        match container.transition_channel() {
            Some(channel) => {
                let holder = Rc::clone(holder);
                channel.on_pop(
                    &args,
                    Box::new(move |ok| {
                        if ok {
                            Self::commit_pop(&holder, params, result);
                        } else {
                            crate::debug_log!(
                                "{}",
                                NavigationError::PlatformRejected {
                                    action: NavigationAction::Pop
                                }
                            );
                            result(false);
                        }
                    }),
                );
            }
            None => Self::commit_pop(holder, params, result),
        }
    }

    fn commit_pop(holder: &HolderRef, params: Option<Value>, result: BooleanCallback) {
        let (route, engines) = {
            let mut h = holder.borrow_mut();
            let route = h.routes.pop();
            (route, h.engines.clone())
        };
        let Some(mut route) = route else {
            result(false);
            return;
        };
        result(true);
        if let Some(callback) = route.take_popped_result() {
            callback(params);
        }
        engines.route_popped(&route);
    }

    /// Pop back to the last route matching `(url, index)`
    ///
    /// On success the list is truncated to end at the matched route,
    /// discarding everything pushed after it.
    pub fn pop_to(
        holder: &HolderRef,
        url: &str,
        index: Option<usize>,
        animated: bool,
        result: BooleanCallback,
    ) {
        let prepared = {
            let mut h = holder.borrow_mut();
            match h.last_position(url, index) {
                None => Err(NavigationError::not_found(url, index)),
                Some(position) => {
                    h.routes[position].settings.animated = animated;
                    let args = h.routes[position].settings.to_arguments();
                    h.require_container().map(|container| (container, args))
                }
            }
        };
        let (container, args) = match prepared {
            Ok(value) => value,
            Err(error) => {
                crate::debug_log!("pop_to {} aborted: {}", url, error);
                result(false);
                return;
            }
        };

        match container.transition_channel() {
            Some(channel) => {
                let holder = Rc::clone(holder);
                let url = url.to_string();
                channel.on_pop_to(
                    &args,
                    Box::new(move |ok| {
                        if ok {
                            Self::truncate_to(&holder, &url, index);
                        } else {
                            crate::debug_log!(
                                "{}",
                                NavigationError::PlatformRejected {
                                    action: NavigationAction::PopTo
                                }
                            );
                        }
                        result(ok);
                    }),
                );
            }
            None => {
                Self::truncate_to(holder, url, index);
                result(true);
            }
        }
    }

    fn truncate_to(holder: &HolderRef, url: &str, index: Option<usize>) {
        let mut h = holder.borrow_mut();
        if let Some(position) = h.last_position(url, index) {
            h.routes.truncate(position + 1);
        }
    }

    /// Remove the last route matching `(url, index)` without disturbing the
    /// routes above it
    ///
    /// When the removed route originated from platform code (the native
    /// sentinel), route observers learn about the removal along with the
    /// settings of the route now frontmost.
    pub fn remove(
        holder: &HolderRef,
        url: &str,
        index: Option<usize>,
        animated: bool,
        result: BooleanCallback,
    ) {
        let prepared = {
            let mut h = holder.borrow_mut();
            match h.last_position(url, index) {
                None => Err(NavigationError::not_found(url, index)),
                Some(position) => {
                    h.routes[position].settings.animated = animated;
                    let args = h.routes[position].settings.to_arguments();
                    h.require_container().map(|container| (container, args))
                }
            }
        };
        let (container, args) = match prepared {
            Ok(value) => value,
            Err(error) => {
                crate::debug_log!("remove {} aborted: {}", url, error);
                result(false);
                return;
            }
        };

        match container.transition_channel() {
            Some(channel) => {
                let holder = Rc::clone(holder);
                let url = url.to_string();
                channel.on_remove(
                    &args,
                    Box::new(move |ok| {
                        if ok {
                            Self::commit_remove(&holder, &url, index, result);
                        } else {
                            crate::debug_log!(
                                "{}",
                                NavigationError::PlatformRejected {
                                    action: NavigationAction::Remove
                                }
                            );
                            result(false);
                        }
                    }),
                );
            }
            None => Self::commit_remove(holder, url, index, result),
        }
    }

    fn commit_remove(holder: &HolderRef, url: &str, index: Option<usize>, result: BooleanCallback) {
        let (removed, new_top, route_observers) = {
            let mut h = holder.borrow_mut();
            let Some(position) = h.last_position(url, index) else {
                drop(h);
                result(false);
                return;
            };
            let removed = h.routes.remove(position);
            let new_top = h.routes.last().map(|route| route.settings.clone());
            (removed, new_top, h.route_observers.clone())
        };
        result(true);
        if removed.entrypoint == NATIVE_ENTRYPOINT {
            route_observers.did_remove(&removed.settings, new_top.as_ref());
        }
    }

    /// Queue a named notification on every route matching `(url, index)`
    ///
    /// Returns whether at least one route matched.
    pub fn notify(
        &mut self,
        url: &str,
        index: Option<usize>,
        name: &str,
        params: Option<&Value>,
    ) -> bool {
        let mut matched = false;
        for route in &mut self.routes {
            if route.matches(url, index) {
                matched = true;
                route.add_notification(name, params.cloned());
            }
        }
        matched
    }

    /// Drain the pending notifications of the last route matching
    /// `(url, index)`
    pub fn take_notifications(
        &mut self,
        url: &str,
        index: Option<usize>,
    ) -> Vec<(String, Option<Value>)> {
        match self.last_position(url, index) {
            Some(position) => self.routes[position].take_notifications(),
            None => Vec::new(),
        }
    }

    /// Remove and return the topmost route without a platform round trip
    ///
    /// Used to synchronize the logical stack when the platform tears the
    /// container down out of band.
    pub(crate) fn retire_top_route(&mut self) -> Option<PageRoute> {
        self.routes.pop()
    }

    pub(crate) fn engines(&self) -> CrossEngineNotifier {
        self.engines.clone()
    }

    // ------------------------------------------------------------------
    // Appear/disappear fan-out
    // ------------------------------------------------------------------

    /// Report the frontmost route as about to appear
    pub fn will_appear(&self) {
        if let Some(route) = self.routes.last() {
            self.page_observers.will_appear(&route.settings);
        }
    }

    /// Report the frontmost route as appeared
    pub fn did_appear(&self) {
        if let Some(route) = self.routes.last() {
            self.page_observers.did_appear(&route.settings);
        }
    }

    /// Report the frontmost route as about to disappear
    pub fn will_disappear(&self) {
        if let Some(route) = self.routes.last() {
            self.page_observers.will_disappear(&route.settings);
        }
    }

    /// Report the frontmost route as disappeared
    pub fn did_disappear(&self) {
        if let Some(route) = self.routes.last() {
            self.page_observers.did_disappear(&route.settings);
        }
    }
}

impl fmt::Debug for PageHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageHolder")
            .field("page_id", &self.page_id)
            .field("entrypoint", &self.entrypoint)
            .field("routes", &self.routes.len())
            .field("attached", &self.live_container().is_some())
            .field("pushed_by_navigator", &self.pushed_by_navigator)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

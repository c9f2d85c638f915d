//! Cross-container orchestration
//!
//! [`PageStack`] owns the ordered list of live holders (creation order,
//! tail = topmost in the overall cross-container stack) plus the side list
//! of holders whose navigation content vanished while the OS had already
//! reclaimed their native instance. All cross-container operations and all
//! platform lifecycle callbacks enter here; the stack locates the holder,
//! delegates the per-container mutation, and performs the cross-container
//! cleanup and cross-engine notification afterwards.
//!
//! A stack is an explicitly constructed, cheaply cloneable handle: build
//! one with [`PageStack::builder`] and pass it wherever navigation or
//! lifecycle events originate.

use crate::engine::{CrossEngineNotifier, EngineProvider, NATIVE_ENTRYPOINT};
use crate::error::NavigationError;
use crate::holder::{HolderRef, PageHolder};
use crate::lifecycle::{DestroyListener, NavigationAction, OperationTracker};
use crate::observers::{PageObserver, PageObservers, RouteObserver, RouteObservers};
use crate::platform::{
    BooleanCallback, IndexCallback, PageId, PlatformContainer, SaveBundle, PAGE_ID_KEY,
};
use crate::route::PageRoute;
use crate::settings::RouteSettings;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

struct StackInner {
    holders: RefCell<Vec<HolderRef>>,
    removed: RefCell<Vec<HolderRef>>,
    next_page_id: Cell<PageId>,
    ops: OperationTracker,
    engines: CrossEngineNotifier,
    page_observers: PageObservers,
    route_observers: RouteObservers,
    destroy_listeners: RefCell<Vec<Rc<dyn DestroyListener>>>,
}

/// Builder for a [`PageStack`]
///
/// Collaborators are injected here; everything defaults to a disconnected
/// no-op so tests and single-engine hosts only wire what they need.
#[derive(Default)]
pub struct PageStackBuilder {
    engines: CrossEngineNotifier,
    page_observers: PageObservers,
    route_observers: RouteObservers,
}

impl PageStackBuilder {
    /// Connect the rendering-engine registry used for cross-engine fan-out
    pub fn engines(mut self, provider: Rc<dyn EngineProvider>) -> Self {
        self.engines = CrossEngineNotifier::new(provider);
        self
    }

    /// Register a page visibility observer
    pub fn page_observer(self, observer: Rc<dyn PageObserver>) -> Self {
        self.page_observers.register(observer);
        self
    }

    /// Register a route removal observer
    pub fn route_observer(self, observer: Rc<dyn RouteObserver>) -> Self {
        self.route_observers.register(observer);
        self
    }

    /// Build the stack
    pub fn build(self) -> PageStack {
        PageStack {
            inner: Rc::new(StackInner {
                holders: RefCell::new(Vec::new()),
                removed: RefCell::new(Vec::new()),
                next_page_id: Cell::new(1),
                ops: OperationTracker::new(),
                engines: self.engines,
                page_observers: self.page_observers,
                route_observers: self.route_observers,
                destroy_listeners: RefCell::new(Vec::new()),
            }),
        }
    }
}

/// Registry of live containers and single entry point for all
/// cross-container navigation
pub struct PageStack {
    inner: Rc<StackInner>,
}

impl Clone for PageStack {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Default for PageStack {
    fn default() -> Self {
        Self::new()
    }
}

impl PageStack {
    /// Create a stack with no collaborators attached
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start building a stack with injected collaborators
    pub fn builder() -> PageStackBuilder {
        PageStackBuilder::default()
    }

    /// Register a listener for out-of-band native container destruction
    pub fn register_destroy_listener(&self, listener: Rc<dyn DestroyListener>) {
        self.inner.destroy_listeners.borrow_mut().push(listener);
    }

    /// The in-flight operation tracker (shared view)
    pub fn operations(&self) -> OperationTracker {
        self.inner.ops.clone()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Number of containers in the primary list
    pub fn container_count(&self) -> usize {
        self.inner.holders.borrow().len()
    }

    /// Number of containers parked awaiting their native destroy callback
    pub fn parked_count(&self) -> usize {
        self.inner.removed.borrow().len()
    }

    /// Check for a live route anywhere in the stack
    pub fn has_route(&self, url: Option<&str>, index: Option<usize>) -> bool {
        self.inner
            .holders
            .borrow()
            .iter()
            .any(|holder| holder.borrow().has_route(url, index))
    }

    /// Check whether the container with this page id holds any route
    pub fn page_has_route(&self, page_id: PageId) -> bool {
        self.inner.holders.borrow().iter().any(|holder| {
            let holder = holder.borrow();
            holder.page_id() == page_id && holder.has_route(None, None)
        })
    }

    /// Most recent route matching the filter, scanning containers from the
    /// tail
    pub fn last_route(&self, url: Option<&str>, index: Option<usize>) -> Option<RouteSettings> {
        self.inner
            .holders
            .borrow()
            .iter()
            .rev()
            .find_map(|holder| {
                holder
                    .borrow()
                    .last_route(url, index)
                    .map(|route| route.settings.clone())
            })
    }

    /// Frontmost route of the container with this page id
    pub fn last_route_of_page(&self, page_id: PageId) -> Option<RouteSettings> {
        let holder = self.last_holder_by_page(page_id)?;
        let holder = holder.borrow();
        holder.last_route(None, None).map(|route| route.settings.clone())
    }

    /// Every route matching the URL, most recent container first
    pub fn all_routes(&self, url: &str) -> Vec<RouteSettings> {
        self.inner
            .holders
            .borrow()
            .iter()
            .rev()
            .flat_map(|holder| holder.borrow().all_routes(url))
            .collect()
    }

    /// Page ids of the containers stacked above the pop-to target, i.e.
    /// those a successful `pop_to(url, index)` would cascade over
    pub fn pages_above(&self, url: &str, index: Option<usize>) -> Vec<PageId> {
        let holders = self.inner.holders.borrow();
        let Some(position) = holders
            .iter()
            .rposition(|holder| holder.borrow().last_route(Some(url), index).is_some())
        else {
            return Vec::new();
        };
        holders[position + 1..]
            .iter()
            .map(|holder| holder.borrow().page_id())
            .collect()
    }

    /// Drain the pending notifications of the most recent route matching
    /// `(url, index)`
    pub fn take_notifications(
        &self,
        url: &str,
        index: Option<usize>,
    ) -> Vec<(String, Option<Value>)> {
        match self.last_holder_with_route(url, index) {
            Some(holder) => holder.borrow_mut().take_notifications(url, index),
            None => Vec::new(),
        }
    }

    /// Retrieve (and forget) a holder parked after being emptied while its
    /// native instance was already gone
    pub fn take_removed(&self, page_id: PageId) -> Option<HolderRef> {
        let mut removed = self.inner.removed.borrow_mut();
        let position = removed
            .iter()
            .rposition(|holder| holder.borrow().page_id() == page_id)?;
        Some(removed.remove(position))
    }

    fn last_holder_by_page(&self, page_id: PageId) -> Option<HolderRef> {
        self.inner
            .holders
            .borrow()
            .iter()
            .rev()
            .find(|holder| holder.borrow().page_id() == page_id)
            .cloned()
    }

    fn last_holder_with_route(&self, url: &str, index: Option<usize>) -> Option<HolderRef> {
        self.inner
            .holders
            .borrow()
            .iter()
            .rev()
            .find(|holder| holder.borrow().last_route(Some(url), index).is_some())
            .cloned()
    }

    fn allocate_page_id(&self) -> PageId {
        let page_id = self.inner.next_page_id.get();
        self.inner.next_page_id.set(page_id + 1);
        page_id
    }

    fn make_holder(&self, page_id: PageId, entrypoint: String) -> HolderRef {
        Rc::new(RefCell::new(PageHolder::with_collaborators(
            page_id,
            entrypoint,
            self.inner.engines.clone(),
            self.inner.page_observers.clone(),
            self.inner.route_observers.clone(),
        )))
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Push a route into the given platform container
    ///
    /// Resolves (or lazily creates) the holder keyed by the container's
    /// page identity, marks it navigator-managed, stamps the route's engine
    /// and per-URL index, and delegates to the holder.
    pub fn push(
        &self,
        container: &Rc<dyn PlatformContainer>,
        mut route: PageRoute,
        result: IndexCallback,
    ) {
        let page_id = match container.page_id() {
            Some(page_id) => page_id,
            None => {
                let page_id = self.allocate_page_id();
                container.assign_page_id(page_id);
                page_id
            }
        };
        let holder = match self.last_holder_by_page(page_id) {
            Some(holder) => holder,
            None => {
                let holder = self.make_holder(page_id, container.entrypoint().to_string());
                holder.borrow_mut().attach(container);
                self.inner.holders.borrow_mut().push(holder.clone());
                holder
            }
        };
        holder.borrow_mut().mark_pushed_by_navigator();

        route.entrypoint = container.entrypoint().to_string();
        route.settings.index = self
            .last_route(Some(&route.settings.url), None)
            .map_or(1, |settings| settings.index + 1);
        crate::debug_log!(
            "pushing {}/{} into container {}",
            route.settings.url,
            route.settings.index,
            page_id
        );

        let token = self.inner.ops.begin(NavigationAction::Push);
        PageHolder::push(
            &holder,
            route,
            Box::new(move |index| {
                result(index);
                drop(token);
            }),
        );
    }

    /// Pop the frontmost route of the most recently registered container
    ///
    /// A container that was not pushed by the navigator is torn down
    /// wholesale instead of route-by-route. A navigator-managed container
    /// that empties out is reclaimed: dropped from the registry and
    /// finished, or parked when its native instance is already gone.
    pub fn pop(&self, params: Option<Value>, animated: bool, result: BooleanCallback) {
        let holder = self.inner.holders.borrow().last().cloned();
        let Some(holder) = holder else {
            crate::debug_log!("pop aborted: {}", NavigationError::EmptyStack);
            result(false);
            return;
        };

        let token = self.inner.ops.begin(NavigationAction::Pop);
        if !holder.borrow().pushed_by_navigator() {
            // finish() may re-enter the registry; no holder borrow across it
            let container = holder.borrow().live_container();
            if let Some(container) = container {
                container.finish();
            }
            result(true);
            drop(token);
            return;
        }

        let stack = self.clone();
        let target = holder.clone();
        PageHolder::pop(
            &holder,
            params,
            animated,
            Box::new(move |ok| {
                if ok && !target.borrow().has_route(None, None) {
                    stack.reclaim_empty(&target);
                }
                result(ok);
                drop(token);
            }),
        );
    }

    /// Pop back to the last route matching `(url, index)` anywhere in the
    /// stack
    ///
    /// On success, every engine whose containers were cascaded over (other
    /// than the native sentinel and the target's own engine) receives one
    /// pop-to notification carrying its most recent surviving route, or
    /// `None` when nothing of its stack survives.
    pub fn pop_to(
        &self,
        url: &str,
        index: Option<usize>,
        animated: bool,
        result: BooleanCallback,
    ) {
        let Some(target) = self.last_holder_with_route(url, index) else {
            crate::debug_log!("pop_to aborted: {}", NavigationError::not_found(url, index));
            result(false);
            return;
        };
        if target.borrow().live_container().is_none() {
            crate::debug_log!(
                "pop_to aborted: {}",
                NavigationError::StaleContainer {
                    page_id: target.borrow().page_id()
                }
            );
            result(false);
            return;
        }

        let token = self.inner.ops.begin(NavigationAction::PopTo);
        let stack = self.clone();
        let holder = target.clone();
        PageHolder::pop_to(
            &target,
            url,
            index,
            animated,
            Box::new(move |ok| {
                if ok {
                    stack.fan_out_pop_to(&holder);
                }
                result(ok);
                drop(token);
            }),
        );
    }

    fn fan_out_pop_to(&self, target: &HolderRef) {
        let mut notifications: Vec<(String, Option<RouteSettings>)> = Vec::new();
        {
            let holders = self.inner.holders.borrow();
            let Some(position) = holders.iter().position(|holder| Rc::ptr_eq(holder, target))
            else {
                return;
            };
            let target_entrypoint = target.borrow().entrypoint().to_string();

            // Distinct engines among the cascaded containers, in stack order.
            let mut entrypoints: Vec<String> = Vec::new();
            for holder in holders.iter().skip(position + 1) {
                let entrypoint = holder.borrow().entrypoint().to_string();
                if entrypoint != target_entrypoint
                    && entrypoint != NATIVE_ENTRYPOINT
                    && !entrypoints.contains(&entrypoint)
                {
                    entrypoints.push(entrypoint);
                }
            }

            for entrypoint in entrypoints {
                let mut survivor = None;
                for holder in holders[..=position].iter().rev() {
                    if let Some(route) = holder.borrow().last_route_for_engine(&entrypoint) {
                        survivor = Some(route.settings.clone());
                        break;
                    }
                }
                notifications.push((entrypoint, survivor));
            }
        }
        for (entrypoint, survivor) in notifications {
            self.inner
                .engines
                .stack_truncated(&entrypoint, survivor.as_ref());
        }
    }

    /// Remove the last route matching `(url, index)` anywhere in the stack
    pub fn remove(
        &self,
        url: &str,
        index: Option<usize>,
        animated: bool,
        result: BooleanCallback,
    ) {
        let Some(holder) = self.last_holder_with_route(url, index) else {
            crate::debug_log!("remove aborted: {}", NavigationError::not_found(url, index));
            result(false);
            return;
        };

        let token = self.inner.ops.begin(NavigationAction::Remove);
        let stack = self.clone();
        let target = holder.clone();
        PageHolder::remove(
            &holder,
            url,
            index,
            animated,
            Box::new(move |ok| {
                if ok && !target.borrow().has_route(None, None) {
                    stack.reclaim_empty(&target);
                }
                result(ok);
                drop(token);
            }),
        );
    }

    /// Queue a named notification on every route matching `(url, index)`
    ///
    /// Short-circuits to `false` when nothing matches, avoiding the
    /// per-container fan-out.
    pub fn notify(
        &self,
        url: &str,
        index: Option<usize>,
        name: &str,
        params: Option<&Value>,
        result: BooleanCallback,
    ) {
        if !self.has_route(Some(url), index) {
            result(false);
            return;
        }
        let mut matched = false;
        for holder in self.inner.holders.borrow().iter() {
            if holder.borrow_mut().notify(url, index, name, params) {
                matched = true;
            }
        }
        result(matched);
    }

    /// Drop an emptied holder from the primary list, then finish its live
    /// container or park the holder when the instance is already gone
    fn reclaim_empty(&self, holder: &HolderRef) {
        {
            let mut holders = self.inner.holders.borrow_mut();
            if let Some(position) = holders.iter().position(|entry| Rc::ptr_eq(entry, holder)) {
                holders.remove(position);
            }
        }
        let container = holder.borrow().live_container();
        match container {
            Some(container) => container.finish(),
            None => {
                crate::debug_log!(
                    "parking emptied container {} pending its native destroy",
                    holder.borrow().page_id()
                );
                self.inner.removed.borrow_mut().push(holder.clone());
            }
        }
    }

    // ------------------------------------------------------------------
    // Platform lifecycle callbacks
    // ------------------------------------------------------------------

    /// A container instance was created
    ///
    /// Fresh creation (no saved state) registers a new attached holder;
    /// recreation with saved state reattaches the surviving holder found by
    /// the persisted page id.
    pub fn on_created(&self, container: &Rc<dyn PlatformContainer>, saved: Option<&SaveBundle>) {
        match saved {
            None => {
                if container.page_id().is_none() {
                    let page_id = self.allocate_page_id();
                    container.assign_page_id(page_id);
                    let holder = self.make_holder(page_id, container.entrypoint().to_string());
                    holder.borrow_mut().attach(container);
                    self.inner.holders.borrow_mut().push(holder);
                    crate::info_log!(
                        "container {} created for entrypoint {}",
                        page_id,
                        container.entrypoint()
                    );
                }
            }
            Some(bundle) => {
                if let Some(page_id) = bundle.int(PAGE_ID_KEY) {
                    container.assign_page_id(page_id);
                    match self.last_holder_by_page(page_id) {
                        Some(holder) => holder.borrow_mut().attach(container),
                        None => {
                            crate::warn_log!("restored container {} has no holder", page_id);
                        }
                    }
                }
            }
        }
    }

    /// A container instance became visible to the user
    pub fn on_started(&self, container: &Rc<dyn PlatformContainer>) {
        self.reattach(container);
    }

    /// A container instance is about to reach the foreground
    pub fn on_pre_resumed(&self, container: &Rc<dyn PlatformContainer>) {
        if !self.inner.ops.idle() {
            return;
        }
        if let Some(holder) = self.holder_of(container) {
            holder.borrow().will_appear();
        }
    }

    /// A container instance reached the foreground
    pub fn on_resumed(&self, container: &Rc<dyn PlatformContainer>) {
        self.reattach(container);
        if let Some(holder) = self.holder_of(container) {
            holder.borrow_mut().set_expecting_system_destroy(false);
            if self.inner.ops.idle() {
                holder.borrow().did_appear();
            }
        }
    }

    /// A container instance is about to leave the foreground
    pub fn on_pre_paused(&self, container: &Rc<dyn PlatformContainer>) {
        if !self.inner.ops.idle() {
            return;
        }
        if let Some(holder) = self.holder_of(container) {
            holder.borrow().will_disappear();
        }
    }

    /// A container instance left the foreground
    pub fn on_paused(&self, container: &Rc<dyn PlatformContainer>) {
        if !self.inner.ops.idle() {
            return;
        }
        if let Some(holder) = self.holder_of(container) {
            holder.borrow().did_disappear();
        }
    }

    /// The platform is about to reclaim the container instance
    ///
    /// Persists the page id into the save bundle and flags the holder so
    /// the upcoming destroy callback reads as a transient reclaim rather
    /// than a user-driven close.
    pub fn on_save_state(&self, container: &Rc<dyn PlatformContainer>, out: &mut SaveBundle) {
        let Some(page_id) = container.page_id() else {
            return;
        };
        out.put_int(PAGE_ID_KEY, page_id);
        if let Some(holder) = self.last_holder_by_page(page_id) {
            holder.borrow_mut().set_expecting_system_destroy(true);
        }
    }

    /// A container instance was destroyed
    ///
    /// Detaches unconditionally. A destroy expected after save-state leaves
    /// the holder (and its routes) intact for later reattachment. A genuine
    /// close drops a finishing holder from the registry and synchronizes
    /// the logical stack: the topmost route is retired out of band and
    /// destroy listeners are told which page went away. A destroy for a
    /// parked holder finalizes it.
    pub fn on_destroyed(&self, container: &Rc<dyn PlatformContainer>) {
        let Some(page_id) = container.page_id() else {
            return;
        };

        if let Some(parked) = self.take_removed(page_id) {
            parked.borrow_mut().detach();
            crate::debug_log!("finalized parked container {}", page_id);
            return;
        }

        let Some(holder) = self.last_holder_by_page(page_id) else {
            return;
        };
        holder.borrow_mut().detach();

        if holder.borrow().expecting_system_destroy() {
            crate::debug_log!("container {} reclaimed by the system, holder retained", page_id);
            return;
        }

        if container.is_finishing() {
            let mut holders = self.inner.holders.borrow_mut();
            if let Some(position) = holders.iter().position(|entry| Rc::ptr_eq(entry, &holder)) {
                holders.remove(position);
            }
        }

        let retired = holder.borrow_mut().retire_top_route();
        if let Some(mut route) = retired {
            crate::debug_log!(
                "retiring {}/{} after native destroy of container {}",
                route.settings.url,
                route.settings.index,
                page_id
            );
            if let Some(callback) = route.take_popped_result() {
                callback(None);
            }
            holder.borrow().engines().route_popped(&route);
        }

        let listeners: Vec<Rc<dyn DestroyListener>> =
            self.inner.destroy_listeners.borrow().clone();
        for listener in listeners {
            listener.did_destroy(page_id);
        }
    }

    fn reattach(&self, container: &Rc<dyn PlatformContainer>) {
        if let Some(holder) = self.holder_of(container) {
            holder.borrow_mut().attach(container);
        }
    }

    fn holder_of(&self, container: &Rc<dyn PlatformContainer>) -> Option<HolderRef> {
        self.last_holder_by_page(container.page_id()?)
    }
}

impl fmt::Debug for PageStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageStack")
            .field("containers", &self.container_count())
            .field("parked", &self.parked_count())
            .field("operations", &self.inner.ops)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineChannel;
    use crate::platform::TransitionChannel;
    use crate::settings::Arguments;
    use serde_json::json;
    use std::collections::HashMap;

    struct TestContainer {
        entrypoint: String,
        page_id: Cell<Option<PageId>>,
        managed: bool,
        accept: Cell<bool>,
        defer: Cell<bool>,
        destroyed: Cell<bool>,
        finishing: Cell<bool>,
        finish_count: Cell<usize>,
        pending: RefCell<Vec<BooleanCallback>>,
        requests: RefCell<Vec<String>>,
    }

    impl TestContainer {
        fn new(entrypoint: &str) -> Rc<Self> {
            Rc::new(Self {
                entrypoint: entrypoint.to_string(),
                page_id: Cell::new(None),
                managed: true,
                accept: Cell::new(true),
                defer: Cell::new(false),
                destroyed: Cell::new(false),
                finishing: Cell::new(false),
                finish_count: Cell::new(0),
                pending: RefCell::new(Vec::new()),
                requests: RefCell::new(Vec::new()),
            })
        }

        fn with_page_id(entrypoint: &str, page_id: PageId) -> Rc<Self> {
            let container = Self::new(entrypoint);
            container.page_id.set(Some(page_id));
            container
        }

        fn as_dyn(self: &Rc<Self>) -> Rc<dyn PlatformContainer> {
            self.clone()
        }

        fn record(&self, op: &str, args: &Arguments, result: BooleanCallback) {
            let url = args
                .get("url")
                .and_then(|value| value.as_str())
                .unwrap_or("?");
            self.requests.borrow_mut().push(format!("{} {}", op, url));
            if self.defer.get() {
                self.pending.borrow_mut().push(result);
            } else {
                result(self.accept.get());
            }
        }

        fn take_ack(&self) -> BooleanCallback {
            self.pending.borrow_mut().remove(0)
        }
    }

    impl TransitionChannel for TestContainer {
        fn on_push(&self, args: &Arguments, result: BooleanCallback) {
            self.record("push", args, result);
        }

        fn on_pop(&self, args: &Arguments, result: BooleanCallback) {
            self.record("pop", args, result);
        }

        fn on_pop_to(&self, args: &Arguments, result: BooleanCallback) {
            self.record("pop_to", args, result);
        }

        fn on_remove(&self, args: &Arguments, result: BooleanCallback) {
            self.record("remove", args, result);
        }
    }

    impl PlatformContainer for TestContainer {
        fn entrypoint(&self) -> &str {
            &self.entrypoint
        }

        fn page_id(&self) -> Option<PageId> {
            self.page_id.get()
        }

        fn assign_page_id(&self, page_id: PageId) {
            self.page_id.set(Some(page_id));
        }

        fn is_destroyed(&self) -> bool {
            self.destroyed.get()
        }

        fn is_finishing(&self) -> bool {
            self.finishing.get()
        }

        fn finish(&self) {
            self.finish_count.set(self.finish_count.get() + 1);
        }

        fn transition_channel(&self) -> Option<&dyn TransitionChannel> {
            if self.managed {
                Some(self)
            } else {
                None
            }
        }
    }

    #[derive(Default)]
    struct RecordingEngine {
        pops: RefCell<Vec<Arguments>>,
        pop_tos: RefCell<Vec<Option<Arguments>>>,
    }

    impl EngineChannel for RecordingEngine {
        fn on_pop(&self, args: &Arguments) {
            self.pops.borrow_mut().push(args.clone());
        }

        fn on_pop_to(&self, target: Option<&Arguments>) {
            self.pop_tos.borrow_mut().push(target.cloned());
        }
    }

    struct Hub {
        engines: RefCell<HashMap<String, Rc<RecordingEngine>>>,
    }

    impl Hub {
        fn new(entrypoints: &[&str]) -> Rc<Self> {
            Rc::new(Self {
                engines: RefCell::new(
                    entrypoints
                        .iter()
                        .map(|name| (name.to_string(), Rc::new(RecordingEngine::default())))
                        .collect(),
                ),
            })
        }

        fn recorder(&self, entrypoint: &str) -> Rc<RecordingEngine> {
            self.engines.borrow()[entrypoint].clone()
        }
    }

    impl EngineProvider for Hub {
        fn engine(&self, entrypoint: &str) -> Option<Rc<dyn EngineChannel>> {
            self.engines
                .borrow()
                .get(entrypoint)
                .map(|engine| engine.clone() as Rc<dyn EngineChannel>)
        }
    }

    #[derive(Default)]
    struct RecordingPageObserver {
        events: RefCell<Vec<String>>,
    }

    impl PageObserver for RecordingPageObserver {
        fn will_appear(&self, settings: &RouteSettings) {
            self.events
                .borrow_mut()
                .push(format!("will_appear {}", settings.url));
        }

        fn did_appear(&self, settings: &RouteSettings) {
            self.events
                .borrow_mut()
                .push(format!("did_appear {}", settings.url));
        }

        fn will_disappear(&self, settings: &RouteSettings) {
            self.events
                .borrow_mut()
                .push(format!("will_disappear {}", settings.url));
        }

        fn did_disappear(&self, settings: &RouteSettings) {
            self.events
                .borrow_mut()
                .push(format!("did_disappear {}", settings.url));
        }
    }

    fn push_ok(stack: &PageStack, container: &Rc<TestContainer>, url: &str) -> usize {
        let reported = Rc::new(Cell::new(None));
        let reported_in = reported.clone();
        stack.push(
            &container.as_dyn(),
            PageRoute::new(url),
            Box::new(move |index| reported_in.set(index)),
        );
        reported.get().expect("push should succeed")
    }

    fn pop_result(stack: &PageStack) -> bool {
        let reported = Rc::new(Cell::new(None));
        let reported_in = reported.clone();
        stack.pop(None, true, Box::new(move |ok| reported_in.set(Some(ok))));
        reported.get().expect("pop should complete")
    }

    #[test]
    fn test_push_claims_container_identity() {
        let stack = PageStack::new();
        let container = TestContainer::new("main");
        assert!(container.page_id().is_none());

        let index = push_ok(&stack, &container, "/home");

        assert_eq!(index, 1);
        assert_eq!(container.page_id(), Some(1));
        assert_eq!(stack.container_count(), 1);
        assert!(stack.has_route(Some("/home"), None));
    }

    #[test]
    fn test_push_assigns_monotonic_indexes_across_containers() {
        let stack = PageStack::new();
        let first = TestContainer::new("main");
        let second = TestContainer::new("main");

        assert_eq!(push_ok(&stack, &first, "/detail"), 1);
        assert_eq!(push_ok(&stack, &first, "/detail"), 2);
        assert_eq!(push_ok(&stack, &second, "/detail"), 3);
        assert_eq!(push_ok(&stack, &second, "/other"), 1);

        // No two live instances of a URL share an index.
        let routes = stack.all_routes("/detail");
        let mut indexes: Vec<usize> = routes.iter().map(|settings| settings.index).collect();
        indexes.sort_unstable();
        indexes.dedup();
        assert_eq!(indexes.len(), 3);
    }

    #[test]
    fn test_pop_targets_tail_container() {
        let stack = PageStack::new();
        let first = TestContainer::new("main");
        let second = TestContainer::new("main");
        push_ok(&stack, &first, "/a");
        push_ok(&stack, &first, "/b");
        push_ok(&stack, &second, "/c");

        assert!(pop_result(&stack));

        assert!(!stack.has_route(Some("/c"), None));
        assert!(stack.has_route(Some("/a"), None));
        assert!(stack.has_route(Some("/b"), None));
        assert_eq!(*second.requests.borrow(), vec!["push /c", "pop /c"]);
    }

    #[test]
    fn test_pop_foreign_container_finishes_wholesale() {
        let stack = PageStack::new();
        let container = TestContainer::new("main");
        // Created by the platform, never pushed into by the navigator.
        stack.on_created(&container.as_dyn(), None);
        assert_eq!(stack.container_count(), 1);

        assert!(pop_result(&stack));
        assert_eq!(container.finish_count.get(), 1);
        // The holder leaves the registry via the destroy callback, not here.
        assert_eq!(stack.container_count(), 1);
    }

    #[test]
    fn test_emptied_container_is_finished_and_dropped() {
        let stack = PageStack::new();
        let container = TestContainer::new("main");
        push_ok(&stack, &container, "/only");

        assert!(pop_result(&stack));
        assert_eq!(stack.container_count(), 0);
        assert_eq!(container.finish_count.get(), 1);
        assert_eq!(stack.parked_count(), 0);
    }

    #[test]
    fn test_emptied_container_parks_when_instance_is_gone() {
        let stack = PageStack::new();
        let container = TestContainer::new("main");
        push_ok(&stack, &container, "/only");
        let page_id = container.page_id().unwrap();

        // The remove transition is acknowledged only after the platform has
        // already dropped the container instance.
        container.defer.set(true);
        let reported = Rc::new(Cell::new(None));
        let reported_in = reported.clone();
        stack.remove(
            "/only",
            None,
            false,
            Box::new(move |ok| reported_in.set(Some(ok))),
        );
        assert_eq!(reported.get(), None);

        let ack = container.take_ack();
        drop(container);
        ack(true);

        assert_eq!(reported.get(), Some(true));
        assert_eq!(stack.container_count(), 0);
        assert_eq!(stack.parked_count(), 1);

        // The late destroy callback for the same page id finds and
        // finalizes the parked holder.
        let ghost = TestContainer::with_page_id("main", page_id);
        stack.on_destroyed(&ghost.as_dyn());
        assert_eq!(stack.parked_count(), 0);
    }

    #[test]
    fn test_pop_to_fan_out_scope() {
        let hub = Hub::new(&["main", "order", "chat"]);
        let stack = PageStack::builder().engines(hub.clone()).build();

        let base = TestContainer::new("order");
        let target = TestContainer::new("main");
        let above_first = TestContainer::new("order");
        let above_second = TestContainer::new("chat");
        push_ok(&stack, &base, "/base");
        push_ok(&stack, &target, "/a");
        push_ok(&stack, &above_first, "/top");
        push_ok(&stack, &above_second, "/c");

        let reported = Rc::new(Cell::new(None));
        let reported_in = reported.clone();
        stack.pop_to(
            "/a",
            Some(1),
            true,
            Box::new(move |ok| reported_in.set(Some(ok))),
        );
        assert_eq!(reported.get(), Some(true));

        // One notification per distinct cascaded engine, exactly once.
        let order_events = hub.recorder("order").pop_tos.borrow().clone();
        assert_eq!(order_events.len(), 1);
        assert_eq!(
            order_events[0].as_ref().and_then(|args| args.get("url")),
            Some(&json!("/base"))
        );

        let chat_events = hub.recorder("chat").pop_tos.borrow().clone();
        assert_eq!(chat_events.len(), 1);
        assert!(chat_events[0].is_none());

        assert!(hub.recorder("main").pop_tos.borrow().is_empty());
    }

    #[test]
    fn test_pop_to_missing_target_fails() {
        let stack = PageStack::new();
        let container = TestContainer::new("main");
        push_ok(&stack, &container, "/a");

        let reported = Rc::new(Cell::new(None));
        let reported_in = reported.clone();
        stack.pop_to(
            "/missing",
            None,
            true,
            Box::new(move |ok| reported_in.set(Some(ok))),
        );
        assert_eq!(reported.get(), Some(false));
    }

    #[test]
    fn test_notify_short_circuits_and_broadcasts() {
        let stack = PageStack::new();
        let first = TestContainer::new("main");
        let second = TestContainer::new("main");
        push_ok(&stack, &first, "/a");
        push_ok(&stack, &second, "/a");

        let reported = Rc::new(Cell::new(None));
        let reported_in = reported.clone();
        stack.notify(
            "/missing",
            None,
            "refresh",
            None,
            Box::new(move |matched| reported_in.set(Some(matched))),
        );
        assert_eq!(reported.get(), Some(false));

        let reported = Rc::new(Cell::new(None));
        let reported_in = reported.clone();
        stack.notify(
            "/a",
            None,
            "refresh",
            Some(&json!({"n": 1})),
            Box::new(move |matched| reported_in.set(Some(matched))),
        );
        assert_eq!(reported.get(), Some(true));

        // Both instances of /a queued the event; the registry drains the
        // most recent one.
        assert_eq!(
            stack.take_notifications("/a", Some(2)),
            vec![("refresh".to_string(), Some(json!({"n": 1})))]
        );
        assert_eq!(
            stack.take_notifications("/a", Some(1)),
            vec![("refresh".to_string(), Some(json!({"n": 1})))]
        );
    }

    #[test]
    fn test_lifecycle_suppression_while_operation_in_flight() {
        let observer = Rc::new(RecordingPageObserver::default());
        let stack = PageStack::builder().page_observer(observer.clone()).build();
        let container = TestContainer::new("main");
        push_ok(&stack, &container, "/a");
        push_ok(&stack, &container, "/b");

        container.defer.set(true);
        stack.pop(None, true, Box::new(|_| {}));
        assert!(!stack.operations().idle());

        // Platform-driven appear events during the pop are side effects of
        // the pop and must not reach observers.
        stack.on_pre_resumed(&container.as_dyn());
        stack.on_resumed(&container.as_dyn());
        assert!(observer.events.borrow().is_empty());

        container.take_ack()(true);
        assert!(stack.operations().idle());

        stack.on_pre_resumed(&container.as_dyn());
        stack.on_resumed(&container.as_dyn());
        assert_eq!(
            *observer.events.borrow(),
            vec!["will_appear /a", "did_appear /a"]
        );
    }

    #[test]
    fn test_save_state_then_destroy_is_transient() {
        let stack = PageStack::new();
        let container = TestContainer::new("main");
        push_ok(&stack, &container, "/a");
        let page_id = container.page_id().unwrap();

        let mut bundle = SaveBundle::new();
        stack.on_save_state(&container.as_dyn(), &mut bundle);
        assert_eq!(bundle.int(PAGE_ID_KEY), Some(page_id));

        // Not finishing: the OS is reclaiming the instance for memory.
        stack.on_destroyed(&container.as_dyn());
        assert_eq!(stack.container_count(), 1);
        assert!(stack.has_route(Some("/a"), None));

        // Recreation with the saved bundle reattaches the same holder.
        let recreated = TestContainer::new("main");
        stack.on_created(&recreated.as_dyn(), Some(&bundle));
        assert_eq!(recreated.page_id(), Some(page_id));
        stack.on_resumed(&recreated.as_dyn());

        // The reattached container accepts operations again.
        assert_eq!(push_ok(&stack, &recreated, "/b"), 1);
        assert_eq!(stack.container_count(), 1);
    }

    #[test]
    fn test_genuine_destroy_syncs_logical_stack() {
        struct Listener {
            destroyed: Cell<Option<PageId>>,
        }
        impl DestroyListener for Listener {
            fn did_destroy(&self, page_id: PageId) {
                self.destroyed.set(Some(page_id));
            }
        }

        let stack = PageStack::new();
        let listener = Rc::new(Listener {
            destroyed: Cell::new(None),
        });
        stack.register_destroy_listener(listener.clone());

        let container = TestContainer::new("main");
        let popped = Rc::new(Cell::new(false));
        let popped_in = popped.clone();
        let reported = Rc::new(Cell::new(None));
        let reported_in = reported.clone();
        stack.push(
            &container.as_dyn(),
            PageRoute::new("/a").on_popped(move |params| {
                assert!(params.is_none());
                popped_in.set(true);
            }),
            Box::new(move |index| reported_in.set(index)),
        );
        assert_eq!(reported.get(), Some(1));
        let page_id = container.page_id().unwrap();

        // User closed the container natively; no save-state happened.
        container.finishing.set(true);
        stack.on_destroyed(&container.as_dyn());

        assert_eq!(stack.container_count(), 0);
        assert!(popped.get());
        assert_eq!(listener.destroyed.get(), Some(page_id));
    }

    #[test]
    fn test_created_fresh_registers_holder_once() {
        let stack = PageStack::new();
        let container = TestContainer::new("main");

        stack.on_created(&container.as_dyn(), None);
        assert_eq!(stack.container_count(), 1);
        let page_id = container.page_id().unwrap();

        // A second created callback for an already-claimed instance is a
        // no-op.
        stack.on_created(&container.as_dyn(), None);
        assert_eq!(stack.container_count(), 1);
        assert_eq!(container.page_id(), Some(page_id));

        // Pushing into the platform-created container reuses its holder.
        push_ok(&stack, &container, "/a");
        assert_eq!(stack.container_count(), 1);
        assert_eq!(stack.last_route_of_page(page_id).unwrap().url, "/a");
    }

    #[test]
    fn test_pages_above_lists_cascaded_containers() {
        let stack = PageStack::new();
        let first = TestContainer::new("main");
        let second = TestContainer::new("main");
        let third = TestContainer::new("main");
        push_ok(&stack, &first, "/a");
        push_ok(&stack, &second, "/b");
        push_ok(&stack, &third, "/c");

        assert_eq!(
            stack.pages_above("/a", None),
            vec![
                second.page_id().unwrap(),
                third.page_id().unwrap()
            ]
        );
        assert!(stack.pages_above("/c", None).is_empty());
        assert!(stack.pages_above("/missing", None).is_empty());
    }
}

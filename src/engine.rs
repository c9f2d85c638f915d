//! Rendering-engine collaborators and cross-engine fan-out
//!
//! Multiple independent rendering-engine instances can each own a disjoint
//! subset of the page stack. The navigation core reaches them through the
//! [`EngineProvider`] lookup and the one-way [`EngineChannel`]; the
//! [`CrossEngineNotifier`] decides which pop/pop-to events must be forwarded
//! so that every engine's internal stack model stays truthful for
//! transitions it did not directly witness.

use crate::route::PageRoute;
use crate::settings::{Arguments, RouteSettings};
use std::fmt;
use std::rc::Rc;

/// Entrypoint sentinel for pages owned by platform code rather than a
/// rendering engine
pub const NATIVE_ENTRYPOINT: &str = "__native__";

/// Entrypoint of the default rendering-engine instance
pub const DEFAULT_ENTRYPOINT: &str = "main";

/// One-way notification channel into a rendering engine
///
/// Fire-and-forget: the core consumes no acknowledgment.
pub trait EngineChannel {
    /// A route owned by this engine was popped elsewhere
    fn on_pop(&self, args: &Arguments);

    /// The stack was truncated past this engine's pages
    ///
    /// `target` carries the most recent surviving route owned by this
    /// engine, or `None` when no prior route survives and the engine should
    /// fall back to its own default.
    fn on_pop_to(&self, target: Option<&Arguments>);
}

/// Lookup of live engine instances by logical entrypoint name
pub trait EngineProvider {
    /// Get the channel for an entrypoint, if that engine is live
    fn engine(&self, entrypoint: &str) -> Option<Rc<dyn EngineChannel>>;
}

/// Fan-out of pop/pop-to events to engines other than the one that handled
/// the transition
#[derive(Clone, Default)]
pub struct CrossEngineNotifier {
    provider: Option<Rc<dyn EngineProvider>>,
}

impl CrossEngineNotifier {
    /// Create a notifier backed by an engine provider
    pub fn new(provider: Rc<dyn EngineProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// Create a notifier with no engines attached
    ///
    /// All fan-out becomes a no-op; useful for hosts with a single engine
    /// and for tests.
    pub fn disconnected() -> Self {
        Self { provider: None }
    }

    fn engine(&self, entrypoint: &str) -> Option<Rc<dyn EngineChannel>> {
        self.provider.as_ref()?.engine(entrypoint)
    }

    /// Forward a pop to the engine that initiated the push, when the route
    /// crossed engines on its way in
    pub fn route_popped(&self, route: &PageRoute) {
        if !route.crossed_engines() {
            return;
        }
        match self.engine(&route.from_entrypoint) {
            Some(channel) => channel.on_pop(&route.settings.to_arguments()),
            None => {
                crate::debug_log!(
                    "no live engine for entrypoint {}, dropping pop notification",
                    route.from_entrypoint
                );
            }
        }
    }

    /// Tell an engine its pages were cascaded over by a pop-to
    ///
    /// `target` is the most recent surviving route owned by that engine, or
    /// `None` when nothing of its stack survives.
    pub fn stack_truncated(&self, entrypoint: &str, target: Option<&RouteSettings>) {
        match self.engine(entrypoint) {
            Some(channel) => {
                let args = target.map(RouteSettings::to_arguments);
                channel.on_pop_to(args.as_ref());
            }
            None => {
                crate::debug_log!(
                    "no live engine for entrypoint {}, dropping pop-to notification",
                    entrypoint
                );
            }
        }
    }
}

impl fmt::Debug for CrossEngineNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrossEngineNotifier")
            .field("connected", &self.provider.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

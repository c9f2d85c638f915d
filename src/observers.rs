//! Page and route observer sinks
//!
//! Pure notification interfaces: the core reports appear/disappear and
//! removal events and consumes no return value. Observer registries are
//! dependency-injected into the stack at build time and fan each event out
//! to every registered sink.

use crate::settings::RouteSettings;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Observer of page visibility transitions
///
/// All methods default to no-ops so implementations can pick the events
/// they care about.
pub trait PageObserver {
    /// The page is about to become visible
    fn will_appear(&self, _settings: &RouteSettings) {}

    /// The page became visible
    fn did_appear(&self, _settings: &RouteSettings) {}

    /// The page is about to be covered or leave the screen
    fn will_disappear(&self, _settings: &RouteSettings) {}

    /// The page left the screen
    fn did_disappear(&self, _settings: &RouteSettings) {}
}

/// Observer of route removal
pub trait RouteObserver {
    /// A route was removed from its container
    ///
    /// `new_top` is the settings of the route now frontmost in that
    /// container, if any.
    fn did_remove(&self, _removed: &RouteSettings, _new_top: Option<&RouteSettings>) {}
}

/// Fan-out registry for [`PageObserver`] sinks
#[derive(Clone, Default)]
pub struct PageObservers {
    observers: Rc<RefCell<Vec<Rc<dyn PageObserver>>>>,
}

impl PageObservers {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer
    pub fn register(&self, observer: Rc<dyn PageObserver>) {
        self.observers.borrow_mut().push(observer);
    }

    /// Number of registered observers
    pub fn len(&self) -> usize {
        self.observers.borrow().len()
    }

    /// Check if no observers are registered
    pub fn is_empty(&self) -> bool {
        self.observers.borrow().is_empty()
    }

    /// Fan out a will-appear event
    pub fn will_appear(&self, settings: &RouteSettings) {
        for observer in self.observers.borrow().iter() {
            observer.will_appear(settings);
        }
    }

    /// Fan out a did-appear event
    pub fn did_appear(&self, settings: &RouteSettings) {
        for observer in self.observers.borrow().iter() {
            observer.did_appear(settings);
        }
    }

    /// Fan out a will-disappear event
    pub fn will_disappear(&self, settings: &RouteSettings) {
        for observer in self.observers.borrow().iter() {
            observer.will_disappear(settings);
        }
    }

    /// Fan out a did-disappear event
    pub fn did_disappear(&self, settings: &RouteSettings) {
        for observer in self.observers.borrow().iter() {
            observer.did_disappear(settings);
        }
    }
}

impl fmt::Debug for PageObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageObservers")
            .field("observers", &self.len())
            .finish()
    }
}

/// Fan-out registry for [`RouteObserver`] sinks
#[derive(Clone, Default)]
pub struct RouteObservers {
    observers: Rc<RefCell<Vec<Rc<dyn RouteObserver>>>>,
}

impl RouteObservers {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer
    pub fn register(&self, observer: Rc<dyn RouteObserver>) {
        self.observers.borrow_mut().push(observer);
    }

    /// Number of registered observers
    pub fn len(&self) -> usize {
        self.observers.borrow().len()
    }

    /// Check if no observers are registered
    pub fn is_empty(&self) -> bool {
        self.observers.borrow().is_empty()
    }

    /// Fan out a did-remove event
    pub fn did_remove(&self, removed: &RouteSettings, new_top: Option<&RouteSettings>) {
        for observer in self.observers.borrow().iter() {
            observer.did_remove(removed, new_top);
        }
    }
}

impl fmt::Debug for RouteObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteObservers")
            .field("observers", &self.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

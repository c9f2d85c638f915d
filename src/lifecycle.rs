//! Lifecycle reconciliation support
//!
//! OS-driven appear/disappear events that fire while a registry-driven
//! navigation operation is in flight are side effects of that operation and
//! must not be re-reported to observers. The [`OperationTracker`] gates
//! those events: every mutating registry operation holds an
//! [`OperationToken`] from request to terminal callback, and lifecycle
//! handlers only forward observer notifications while no token is
//! outstanding. Tokens are per-operation, so overlapping transitions (if a
//! platform ever issues them) each correlate to their own token instead of
//! fighting over a single shared flag.

use crate::platform::PageId;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Kind of mutating navigation operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationAction {
    /// Push a new route
    Push,
    /// Pop the frontmost route
    Pop,
    /// Pop back to an existing route
    PopTo,
    /// Remove an interior route
    Remove,
}

impl fmt::Display for NavigationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NavigationAction::Push => "push",
            NavigationAction::Pop => "pop",
            NavigationAction::PopTo => "pop_to",
            NavigationAction::Remove => "remove",
        };
        f.write_str(name)
    }
}

/// Tracker of registry-driven operations currently in flight
///
/// Cheaply cloneable; all clones share the same count.
#[derive(Clone, Default)]
pub struct OperationTracker {
    active: Rc<Cell<usize>>,
}

impl OperationTracker {
    /// Create a tracker with nothing in flight
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin an operation, returning its token
    ///
    /// The token is carried inside the operation's completion callback and
    /// releases when dropped, i.e. once the callback has run (or been
    /// discarded).
    pub fn begin(&self, action: NavigationAction) -> OperationToken {
        self.active.set(self.active.get() + 1);
        crate::trace_log!("{} operation started, {} in flight", action, self.active.get());
        OperationToken {
            active: self.active.clone(),
            action,
        }
    }

    /// Whether no operation is in flight
    pub fn idle(&self) -> bool {
        self.active.get() == 0
    }

    /// Number of operations currently in flight
    pub fn in_flight(&self) -> usize {
        self.active.get()
    }
}

impl fmt::Debug for OperationTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationTracker")
            .field("in_flight", &self.active.get())
            .finish()
    }
}

/// Correlation token for one in-flight operation
///
/// Releases its tracker slot on drop.
pub struct OperationToken {
    active: Rc<Cell<usize>>,
    action: NavigationAction,
}

impl OperationToken {
    /// The operation this token belongs to
    pub fn action(&self) -> NavigationAction {
        self.action
    }
}

impl Drop for OperationToken {
    fn drop(&mut self) {
        self.active.set(self.active.get().saturating_sub(1));
        crate::trace_log!("{} operation finished, {} in flight", self.action, self.active.get());
    }
}

impl fmt::Debug for OperationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationToken")
            .field("action", &self.action)
            .finish()
    }
}

/// Collaborator notified when a container is destroyed natively, out of
/// band of any registry-driven operation
pub trait DestroyListener {
    /// The container with this page id was closed by the platform
    fn did_destroy(&self, page_id: PageId);
}

// ============================================================================
// Tests
// ============================================================================

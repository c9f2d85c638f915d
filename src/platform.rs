//! Platform container collaborators and persisted identity
//!
//! A platform container is the native navigation host behind one OS-level
//! screen instance. The core never owns one: holders keep only a [`Weak`]
//! back-reference, and absence of the instance is a normal state, not an
//! error. Containers that accept framework-driven transitions expose a
//! [`TransitionChannel`]; containers without one are unmanaged and get the
//! degraded synchronous bookkeeping paths.
//!
//! [`Weak`]: std::rc::Weak

use crate::settings::Arguments;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stable container identity surviving OS-driven instance recreation
pub type PageId = i64;

/// Completion callback reporting success or failure of a transition
pub type BooleanCallback = Box<dyn FnOnce(bool)>;

/// Completion callback reporting the pushed route's index, or `None` on
/// failure
pub type IndexCallback = Box<dyn FnOnce(Option<usize>)>;

/// Fixed save-bundle key under which a container's page id is persisted
pub const PAGE_ID_KEY: &str = "page_navigator.page_id";

/// Framework-driven transition channel of a managed container
///
/// Each call requests a visual transition and reports the outcome through
/// its callback. The platform guarantees a terminal callback for every
/// request; the route list is mutated only after a positive acknowledgment.
pub trait TransitionChannel {
    /// Request a push transition
    fn on_push(&self, args: &Arguments, result: BooleanCallback);

    /// Request a pop transition
    fn on_pop(&self, args: &Arguments, result: BooleanCallback);

    /// Request a pop-to transition
    fn on_pop_to(&self, args: &Arguments, result: BooleanCallback);

    /// Request an interior-remove transition
    fn on_remove(&self, args: &Arguments, result: BooleanCallback);
}

/// One native container instance, as seen by the navigation core
///
/// Launch-parameter identity (`entrypoint`, `page_id`) plus liveness and
/// teardown. Implementations back `page_id` with interior mutability; the
/// registry writes a freshly allocated id back via [`assign_page_id`] the
/// first time it sees an instance without one.
///
/// [`assign_page_id`]: PlatformContainer::assign_page_id
pub trait PlatformContainer {
    /// Logical engine entrypoint recorded in the launch parameters
    fn entrypoint(&self) -> &str;

    /// Page identity from the launch parameters; `None` means the instance
    /// has not been claimed by the registry yet
    fn page_id(&self) -> Option<PageId>;

    /// Write a page identity back into the launch parameters
    fn assign_page_id(&self, page_id: PageId);

    /// Whether the platform has already torn this instance down
    fn is_destroyed(&self) -> bool;

    /// Whether the instance is on its way out (user-driven close), as
    /// opposed to merely backgrounded
    fn is_finishing(&self) -> bool;

    /// Request teardown of the whole container instance
    fn finish(&self);

    /// The framework-driven transition channel, if this container accepts
    /// push/pop round trips; `None` marks the container unmanaged
    fn transition_channel(&self) -> Option<&dyn TransitionChannel>;
}

/// Key-value bundle persisted through the platform's save/restore mechanism
///
/// Carries the container's page id (and whatever else the host wants to
/// stash) across OS-driven instance recreation. Serializable so hosts can
/// persist it across process restarts.
///
/// # Example
///
/// ```
/// use page_navigator::{SaveBundle, PAGE_ID_KEY};
///
/// let mut bundle = SaveBundle::new();
/// bundle.put_int(PAGE_ID_KEY, 7);
/// assert_eq!(bundle.int(PAGE_ID_KEY), Some(7));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveBundle {
    values: Map<String, Value>,
}

impl SaveBundle {
    /// Create an empty bundle
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an integer value
    pub fn put_int(&mut self, key: &str, value: i64) {
        self.values.insert(key.to_string(), Value::from(value));
    }

    /// Read an integer value
    pub fn int(&self, key: &str) -> Option<i64> {
        self.values.get(key)?.as_i64()
    }

    /// Store a boolean flag
    pub fn put_flag(&mut self, key: &str, value: bool) {
        self.values.insert(key.to_string(), Value::Bool(value));
    }

    /// Read a boolean flag; absent keys read as `false`
    pub fn flag(&self, key: &str) -> bool {
        self.values
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Remove a key, returning whether it was present
    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    /// Check if the bundle holds no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

//! # Page Navigator
//!
//! A cross-engine navigation-stack core. It keeps an in-process model of
//! pages synchronized with native platform containers and any number of
//! independent rendering-engine instances, each of which may own a disjoint
//! subset of the page stack:
//!
//! - **Containers** - one [`PageHolder`] per native container instance,
//!   holding the ordered routes pushed within it
//! - **Registry** - a single [`PageStack`] orchestrating push/pop/pop-to/
//!   remove/notify across containers
//! - **Lifecycle reconciliation** - OS-driven create/resume/save/destroy
//!   events keep the model consistent with asynchronous container
//!   destruction
//! - **Cross-engine fan-out** - pop/pop-to events are forwarded to the
//!   engines that did not directly witness a transition
//! - **Strict commit discipline** - route lists mutate only after the
//!   platform acknowledges a transition, never optimistically
//!
//! Rendering, layout, and gesture handling are out of scope: engines and
//! containers are external collaborators behind the [`EngineProvider`] and
//! [`PlatformContainer`] traits.
//!
//! # Quick Start
//!
//! ```
//! use page_navigator::{PageRoute, PageStack};
//! use serde_json::json;
//!
//! let stack = PageStack::builder().build();
//!
//! // Platform lifecycle events feed the registry; navigation calls enter
//! // through it. With a real host, `stack.on_created(&container, None)`
//! // runs when the platform creates a container, and pushes round-trip
//! // through the container's transition channel:
//! //
//! // stack.push(&container, PageRoute::new("/detail")
//! //     .with_params(json!({"id": 42}))
//! //     .on_popped(|params| { /* result of the popped page */ }),
//! //     Box::new(|index| { /* committed index, or None */ }));
//!
//! let route = PageRoute::new("/detail").with_params(json!({"id": 42}));
//! assert!(route.matches("/detail", Some(0)));
//! assert!(!stack.has_route(None, None));
//! ```
//!
//! # Navigation
//!
//! All mutating operations complete through callbacks, since a transition
//! may require an asynchronous round trip into the platform:
//!
//! ```ignore
//! stack.pop(Some(json!("result")), true, Box::new(|ok| { /* ... */ }));
//! stack.pop_to("/home", None, true, Box::new(|ok| { /* ... */ }));
//! stack.remove("/banner", None, false, Box::new(|ok| { /* ... */ }));
//! stack.notify("/cart", None, "refresh", None, Box::new(|matched| { /* ... */ }));
//! ```
//!
//! # Feature Flags
//!
//! - `log` (default) - Uses the standard `log` crate for logging
//! - `tracing` - Uses the `tracing` crate for structured logging (mutually exclusive with `log`)

#![doc(html_root_url = "https://docs.rs/page-navigator/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
// Lints are configured in Cargo.toml [lints] section

// Logging abstraction
pub mod logging;

// Core navigation modules
pub mod holder;
pub mod route;
pub mod settings;
pub mod stack;

// Lifecycle reconciliation
pub mod lifecycle;

// External collaborators
pub mod engine;
pub mod observers;
pub mod platform;

// Error handling
pub mod error;

// Re-export main types for convenient access
pub use engine::{
    CrossEngineNotifier, EngineChannel, EngineProvider, DEFAULT_ENTRYPOINT, NATIVE_ENTRYPOINT,
};
pub use error::NavigationError;
pub use holder::{HolderRef, PageHolder};
pub use lifecycle::{DestroyListener, NavigationAction, OperationToken, OperationTracker};
pub use observers::{PageObserver, PageObservers, RouteObserver, RouteObservers};
pub use platform::{
    BooleanCallback, IndexCallback, PageId, PlatformContainer, SaveBundle, TransitionChannel,
    PAGE_ID_KEY,
};
pub use route::{PageRoute, PoppedCallback};
pub use settings::{Arguments, RouteSettings};
pub use stack::{PageStack, PageStackBuilder};

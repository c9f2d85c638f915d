//! Error handling for the navigation core
//!
//! Provides the failure taxonomy for navigation operations. None of these
//! errors is fatal to the registry: every operation absorbs its failure
//! locally and surfaces it only as the boolean/optional result of the call.

use crate::lifecycle::NavigationAction;
use crate::platform::PageId;
use std::fmt;

/// Errors that can occur while resolving or committing a navigation operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    /// No live route matches the requested target
    RouteNotFound {
        url: Option<String>,
        index: Option<usize>,
    },

    /// The registry holds no containers at all
    EmptyStack,

    /// The platform container instance is gone or already torn down
    StaleContainer { page_id: PageId },

    /// The platform declined the requested visual transition
    PlatformRejected { action: NavigationAction },
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationError::RouteNotFound { url, index } => match (url, index) {
                (Some(url), Some(index)) => write!(f, "Route not found: {}/{}", url, index),
                (Some(url), None) => write!(f, "Route not found: {}", url),
                _ => write!(f, "Route not found"),
            },
            NavigationError::EmptyStack => {
                write!(f, "Navigation stack is empty")
            }
            NavigationError::StaleContainer { page_id } => {
                write!(f, "Container for page {} is no longer live", page_id)
            }
            NavigationError::PlatformRejected { action } => {
                write!(f, "Platform rejected {} transition", action)
            }
        }
    }
}

impl std::error::Error for NavigationError {}

impl NavigationError {
    /// Convenience constructor for a missing `(url, index)` target
    pub fn not_found(url: impl Into<String>, index: Option<usize>) -> Self {
        NavigationError::RouteNotFound {
            url: Some(url.into()),
            index,
        }
    }

    /// Check if this is a missing-target failure
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            NavigationError::RouteNotFound { .. } | NavigationError::EmptyStack
        )
    }

    /// Check if this is a dead-container failure
    pub fn is_stale(&self) -> bool {
        matches!(self, NavigationError::StaleContainer { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

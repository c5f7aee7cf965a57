//! Explicit add-on registration.
//!
//! Add-ons announce themselves with a registration call instead of being
//! discovered by naming convention.

use log::debug;

use super::constants::{SELF_ID, SELF_NAME};
use super::traits::AddOnRegistry;
use super::types::{AddOnDescriptor, SyncScope};

/// In-memory [`AddOnRegistry`] filled by explicit registration.
///
/// Registering an id twice replaces the earlier descriptor.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<AddOnDescriptor>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that already holds the tool's own descriptor.
    pub fn with_self() -> Self {
        let mut registry = Self::new();
        registry.register(SELF_ID, SELF_NAME, Some(SyncScope::RequireAll));
        registry
    }

    /// Register an add-on. `scope: None` means it does not declare a
    /// synchronization scope and is excluded from every comparison.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        scope: Option<SyncScope>,
    ) {
        let descriptor = match scope {
            Some(scope) => AddOnDescriptor::new(id, name, scope),
            None => AddOnDescriptor::undeclared(id, name),
        };
        debug!(
            "registered add-on {} ({}) scope={:?} declared={}",
            descriptor.name, descriptor.id, descriptor.scope, descriptor.declared
        );
        self.insert(descriptor);
    }

    /// Register a prepared descriptor.
    pub fn insert(&mut self, descriptor: AddOnDescriptor) {
        if let Some(existing) = self.entries.iter_mut().find(|d| d.id == descriptor.id) {
            *existing = descriptor;
        } else {
            self.entries.push(descriptor);
        }
    }

    /// Number of registered add-ons.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AddOnRegistry for Registry {
    fn list_local_add_ons(&self) -> Vec<AddOnDescriptor> {
        self.entries.clone()
    }
}

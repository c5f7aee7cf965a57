//! Mismatch comparator.
//!
//! Both sides are reduced to their declared `RequireAll` descriptors minus
//! the tool itself, then compared by id only.

use std::collections::BTreeMap;

use crate::core::AddOnDescriptor;

/// Descriptors that must agree across the session, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredSet {
    by_id: BTreeMap<String, AddOnDescriptor>,
}

impl RequiredSet {
    /// Filter `descriptors` down to what takes part in matching.
    pub fn from_descriptors<'a>(
        descriptors: impl IntoIterator<Item = &'a AddOnDescriptor>,
        self_id: &str,
    ) -> Self {
        let by_id = descriptors
            .into_iter()
            .filter(|d| d.requires_match(self_id))
            .map(|d| (d.id.clone(), d.clone()))
            .collect();
        Self { by_id }
    }

    /// Number of required descriptors.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether nothing is required.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Whether `id` is required.
    pub fn contains_id(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Whether a descriptor with this display name is required.
    pub fn contains_name(&self, name: &str) -> bool {
        self.by_id.values().any(|d| d.name == name)
    }

    /// Descriptors in id order.
    pub fn iter(&self) -> impl Iterator<Item = &AddOnDescriptor> {
        self.by_id.values()
    }

    /// Descriptors in id order, owned.
    pub fn to_vec(&self) -> Vec<AddOnDescriptor> {
        self.by_id.values().cloned().collect()
    }

    /// Comma-separated display names, for notifications.
    pub fn display_names(&self) -> String {
        join_names(self.by_id.values())
    }
}

/// Outcome of comparing a local and a peer set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    /// Required locally, absent on the peer (`L \ P`).
    pub missing_on_peer: Vec<AddOnDescriptor>,
    /// Required by the peer, absent locally (`P \ L`).
    pub missing_on_local: Vec<AddOnDescriptor>,
}

impl Comparison {
    /// Whether both sides agree.
    pub fn is_match(&self) -> bool {
        self.missing_on_peer.is_empty() && self.missing_on_local.is_empty()
    }

    /// Ids of the symmetric difference: peer-missing first, then local-missing.
    pub fn mismatched_ids(&self) -> Vec<String> {
        self.missing_on_peer
            .iter()
            .chain(&self.missing_on_local)
            .map(|d| d.id.clone())
            .collect()
    }

    /// Human-readable summary, e.g. `missing: A, B; extra: C`.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.missing_on_peer.is_empty() {
            parts.push(format!("missing: {}", join_names(&self.missing_on_peer)));
        }
        if !self.missing_on_local.is_empty() {
            parts.push(format!("extra: {}", join_names(&self.missing_on_local)));
        }
        parts.join("; ")
    }
}

/// Compare two required sets by id.
pub fn compare(local: &RequiredSet, peer: &RequiredSet) -> Comparison {
    let missing_on_peer = local
        .iter()
        .filter(|d| !peer.contains_id(&d.id))
        .cloned()
        .collect();
    let missing_on_local = peer
        .iter()
        .filter(|d| !local.contains_id(&d.id))
        .cloned()
        .collect();

    Comparison {
        missing_on_peer,
        missing_on_local,
    }
}

fn join_names<'a>(descriptors: impl IntoIterator<Item = &'a AddOnDescriptor>) -> String {
    descriptors
        .into_iter()
        .map(|d| d.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

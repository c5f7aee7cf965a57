//! Shared test host.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::VecDeque;

use modsync::core::{
    AddOnDescriptor, AddOnRegistry, ChatTransport, EvictError, LeaveKind, Notifier, Role, Roster,
    SessionId, SessionProvider, Severity, SyncScope, TransportError,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn required(id: &str, name: &str) -> AddOnDescriptor {
    AddOnDescriptor::new(id, name, SyncScope::RequireAll)
}

/// Scriptable host environment that records everything the session does.
#[derive(Debug, Default)]
pub struct MockHost {
    pub name: String,
    pub role: Role,
    pub session: Option<SessionId>,
    pub owner: Option<String>,
    pub gameplay: bool,
    pub add_ons: Vec<AddOnDescriptor>,
    pub roster: Vec<String>,
    /// Whether the session metadata lacks the owner's ModSync marker.
    pub owner_without_sync: bool,

    /// Number of upcoming sends that fail with `Unavailable`.
    pub unavailable_sends: usize,
    /// Number of upcoming evictions that fail with `NotFound`.
    pub unresolved_evictions: usize,

    pub sent: Vec<String>,
    pub notifications: Vec<(String, Severity)>,
    pub evictions: Vec<String>,
    pub leaves: Vec<LeaveKind>,
    pub advertised: bool,
    pub registry_calls: Cell<usize>,
}

impl MockHost {
    pub fn owner(name: &str, add_ons: Vec<AddOnDescriptor>) -> Self {
        Self {
            name: name.into(),
            role: Role::Owner,
            session: Some(SessionId(1)),
            owner: Some(name.into()),
            add_ons,
            roster: vec![name.into()],
            ..Self::default()
        }
    }

    pub fn participant(name: &str, owner: &str, add_ons: Vec<AddOnDescriptor>) -> Self {
        Self {
            name: name.into(),
            role: Role::Participant,
            session: Some(SessionId(1)),
            owner: Some(owner.into()),
            add_ons,
            roster: vec![owner.into(), name.into()],
            ..Self::default()
        }
    }

    /// Protocol lines sent so far, leaving them in place.
    pub fn protocol_lines(&self) -> Vec<String> {
        self.sent
            .iter()
            .filter(|l| l.starts_with("[MODSYNC]"))
            .cloned()
            .collect()
    }

    /// Take every sent line.
    pub fn drain_sent(&mut self) -> VecDeque<String> {
        self.sent.drain(..).collect()
    }

    pub fn has_notification(&self, needle: &str, severity: Severity) -> bool {
        self.notifications
            .iter()
            .any(|(m, s)| *s == severity && m.contains(needle))
    }
}

impl AddOnRegistry for MockHost {
    fn list_local_add_ons(&self) -> Vec<AddOnDescriptor> {
        self.registry_calls.set(self.registry_calls.get() + 1);
        self.add_ons.clone()
    }
}

impl SessionProvider for MockHost {
    fn session_id(&self) -> Option<SessionId> {
        self.session
    }

    fn role(&self) -> Role {
        self.role
    }

    fn local_name(&self) -> String {
        self.name.clone()
    }

    fn owner_name(&self) -> Option<String> {
        self.owner.clone()
    }

    fn gameplay_active(&self) -> bool {
        self.gameplay
    }

    fn owner_has_sync(&self) -> bool {
        !self.owner_without_sync
    }

    fn advertise_sync(&mut self) {
        self.advertised = true;
    }

    fn leave(&mut self, kind: LeaveKind) {
        self.leaves.push(kind);
        self.role = Role::Unaffiliated;
        self.session = None;
    }
}

impl ChatTransport for MockHost {
    fn send(&mut self, line: &str) -> Result<(), TransportError> {
        if self.unavailable_sends > 0 {
            self.unavailable_sends -= 1;
            return Err(TransportError::Unavailable);
        }
        self.sent.push(line.to_string());
        Ok(())
    }
}

impl Roster for MockHost {
    fn current_participants(&self) -> Vec<String> {
        self.roster.clone()
    }

    fn evict(&mut self, name: &str) -> Result<(), EvictError> {
        if self.unresolved_evictions > 0 {
            self.unresolved_evictions -= 1;
            return Err(EvictError::NotFound(name.to_string()));
        }
        self.evictions.push(name.to_string());
        self.roster.retain(|n| n != name);
        Ok(())
    }
}

impl Notifier for MockHost {
    fn notify(&mut self, message: &str, severity: Severity) {
        self.notifications.push((message.to_string(), severity));
    }
}

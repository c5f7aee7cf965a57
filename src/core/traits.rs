//! Contracts with the host environment.
//!
//! The core never talks to the game directly. Each collaborator is a trait;
//! [`HostEnvironment`] bundles them so a session can be driven with a single
//! `&mut env`.

use super::error::{EvictError, TransportError};
use super::types::{AddOnDescriptor, LeaveKind, Role, SessionId, Severity};

/// Enumerates locally loaded add-ons.
pub trait AddOnRegistry {
    /// All local add-ons, declared or not. Called once per role transition.
    fn list_local_add_ons(&self) -> Vec<AddOnDescriptor>;
}

/// Exposes the local participant's session affiliation.
pub trait SessionProvider {
    /// Current session identity, `None` outside any session.
    fn session_id(&self) -> Option<SessionId>;

    /// Current role of the local participant.
    fn role(&self) -> Role;

    /// Local display name, as other members see it in the roster.
    fn local_name(&self) -> String;

    /// Owner's display name, when known.
    fn owner_name(&self) -> Option<String>;

    /// Whether gameplay is currently running.
    fn gameplay_active(&self) -> bool;

    /// Whether the owner has advertised that it runs ModSync.
    ///
    /// Hosts without session metadata keep the default and always sync.
    fn owner_has_sync(&self) -> bool {
        true
    }

    /// Advertise, in session metadata, that the local owner runs ModSync.
    fn advertise_sync(&mut self) {}

    /// Remove the local participant from the session.
    fn leave(&mut self, kind: LeaveKind);
}

/// Shared, line-oriented text channel.
///
/// Delivery is best-effort and ordered per sender. Inbound lines are pushed
/// into [`SyncSession::on_receive`](crate::session::SyncSession::on_receive).
pub trait ChatTransport {
    /// Send one line to every member.
    fn send(&mut self, line: &str) -> Result<(), TransportError>;
}

/// Connected participants, as seen by the owner.
pub trait Roster {
    /// Display names of every connected member (the owner may be included).
    fn current_participants(&self) -> Vec<String>;

    /// Evict a participant by display name.
    fn evict(&mut self, name: &str) -> Result<(), EvictError>;
}

/// Transient on-screen notifications. Fire-and-forget.
pub trait Notifier {
    /// Show a message.
    fn notify(&mut self, message: &str, severity: Severity);
}

/// Everything a session needs from its host.
pub trait HostEnvironment: AddOnRegistry + SessionProvider + ChatTransport + Roster + Notifier {}

impl<T> HostEnvironment for T where T: AddOnRegistry + SessionProvider + ChatTransport + Roster + Notifier {}

//! Shared data types: add-on descriptors, roles and notification severities.

use std::fmt;
use std::str::FromStr;

/// Which members of a session need an add-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SyncScope {
    /// Only the local client needs it. Informational.
    ClientOnly,
    /// Only the host needs it. Informational.
    HostOnly,
    /// Every member must have it.
    RequireAll,
}

impl SyncScope {
    /// Token written on the wire.
    pub fn wire_token(self) -> &'static str {
        match self {
            SyncScope::ClientOnly => "Client",
            SyncScope::HostOnly => "Host",
            SyncScope::RequireAll => "All",
        }
    }

    /// Lenient, case-insensitive parse. Unknown tokens fall back to
    /// [`SyncScope::ClientOnly`], which never takes part in matching.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" | "requireall" | "require_all" => SyncScope::RequireAll,
            "host" | "hostonly" | "host_only" => SyncScope::HostOnly,
            _ => SyncScope::ClientOnly,
        }
    }
}

impl FromStr for SyncScope {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse_lenient(s))
    }
}

impl fmt::Display for SyncScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_token())
    }
}

/// One locally loaded (or peer-reported) add-on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddOnDescriptor {
    /// Globally unique, reverse-domain-like id. Authoritative for equality
    /// in every comparison.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Declared synchronization scope.
    pub scope: SyncScope,
    /// `false` when the add-on opts out of synchronization entirely.
    pub declared: bool,
}

impl AddOnDescriptor {
    /// Create a declared descriptor.
    pub fn new(id: impl Into<String>, name: impl Into<String>, scope: SyncScope) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            scope,
            declared: true,
        }
    }

    /// Create a descriptor that opts out of synchronization.
    pub fn undeclared(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            scope: SyncScope::ClientOnly,
            declared: false,
        }
    }

    /// Whether this descriptor takes part in matching, given the tool's own id.
    pub fn requires_match(&self, self_id: &str) -> bool {
        self.declared && self.scope == SyncScope::RequireAll && self.id != self_id
    }
}

/// Affiliation of the local participant with the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// Not in any session.
    #[default]
    Unaffiliated,
    /// Session owner (host).
    Owner,
    /// Regular participant.
    Participant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Unaffiliated => "unaffiliated",
            Role::Owner => "owner",
            Role::Participant => "participant",
        })
    }
}

/// Opaque session identity (e.g. a lobby id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Severity of an on-screen notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Neutral information.
    Info,
    /// Positive outcome.
    Success,
    /// Degraded but non-fatal outcome.
    Warning,
    /// Failed outcome.
    Error,
}

/// How a participant removes itself from the session.
///
/// The host environment treats these as different operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveKind {
    /// Leave the pre-game lobby.
    Lobby,
    /// Leave a game that is already running.
    ActiveGame,
}

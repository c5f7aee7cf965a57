//! # ModSync
//!
//! Add-on compatibility checks for multiplayer sessions, carried over the
//! session's shared text chat.
//!
//! Before gameplay starts, each participant reports the add-ons every member
//! must have; the session owner compares them with its own, answers with a
//! verdict and, when enforcement ("lobby lock") is on, evicts participants
//! that mismatch or never answer. The chat channel also carries ordinary
//! chat and display names may contain the protocol delimiter, so decoding
//! anchors sender names against the roster before falling back to the shape
//! of the payload.
//!
//! ## Feature Flags
//!
//! - `runtime` (default): tokio task driving a session on an interval
//!
//! ## Modules
//!
//! - [`core`]: Host contracts, descriptors, constants and errors
//! - [`sync`]: Messages, codec, comparator and the action list
//! - [`transport`]: Timer queue, send retry and echo suppression
//! - [`client`]: Participant role
//! - [`server`]: Owner role and enforcement
//! - [`session`]: [`SyncSession`] context and [`SyncConfig`]
//! - [`runtime`]: Async driver (requires `runtime` feature)
//!
//! ## Example Usage
//!
//! ```rust
//! use modsync::prelude::*;
//!
//! let mut registry = Registry::with_self();
//! registry.register("com.example.spells", "More Spells", Some(SyncScope::RequireAll));
//! registry.register("com.example.hud", "Better HUD", Some(SyncScope::ClientOnly));
//!
//! let required = RequiredSet::from_descriptors(&registry.list_local_add_ons(), SELF_ID);
//! assert_eq!(required.len(), 1);
//!
//! let line = SyncMessage::ClientMods {
//!     name: "Player:One".into(),
//!     entries: required.to_vec(),
//! }
//! .encode();
//!
//! let roster = vec!["Player:One".to_string()];
//! let decoded = decode(&line, &NameAnchors::roster(&roster)).unwrap();
//! assert_eq!(decoded.message.name(), "Player:One");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod client;
pub mod core;
pub mod server;
pub mod session;
pub mod sync;
pub mod transport;

// Async driver (feature-gated)
#[cfg(feature = "runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "runtime")))]
pub mod runtime;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;

    pub use crate::client::{ExchangePhase, Outcome, Participant};
    pub use crate::server::{Owner, ToggleOutcome};
    pub use crate::session::{SyncConfig, SyncConfigBuilder, SyncSession, SyncStatus};
    pub use crate::sync::{
        Action, Comparison, NameAnchors, RequiredSet, SyncMessage, compare, decode,
    };
    pub use crate::transport::{Delivery, TimerKey};

    #[cfg(feature = "runtime")]
    pub use crate::runtime::{Driver, DriverError, LineSender};
}

// Re-export commonly used items at crate root
pub use crate::core::{AddOnDescriptor, DecodeError, Registry, Role, SyncError, SyncScope};
pub use crate::session::{SyncConfig, SyncSession};

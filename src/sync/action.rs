//! Side effects requested by the role state machines.
//!
//! [`Participant`](crate::client::Participant) and [`Owner`](crate::server::Owner)
//! never touch the host directly. They return a list of actions which the
//! session applies in order.

use std::time::Duration;

use super::message::SyncMessage;
use crate::core::{LeaveKind, Severity};
use crate::transport::TimerKey;

/// One side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Encode and send a protocol message.
    Send(SyncMessage),
    /// Surface a notification.
    Notify {
        /// Text shown to the user.
        message: String,
        /// Severity.
        severity: Severity,
    },
    /// Arm (or re-arm) a timer relative to now.
    Schedule {
        /// Timer to arm.
        timer: TimerKey,
        /// Delay from now.
        after: Duration,
    },
    /// Disarm a timer. No-op if it is not armed.
    Cancel(TimerKey),
    /// Disarm every timer concerning one participant.
    CancelPeer(String),
    /// Evict a participant. The result is fed back to the owner.
    Evict {
        /// Display name.
        participant: String,
        /// 1 for the first try, 2 for the retry.
        attempt: u32,
    },
    /// Remove the local participant from the session.
    Leave(LeaveKind),
    /// Mark the session as running ModSync.
    Advertise,
}

impl Action {
    /// Shorthand for [`Action::Notify`].
    pub fn notify(message: impl Into<String>, severity: Severity) -> Self {
        Action::Notify {
            message: message.into(),
            severity,
        }
    }

    /// Shorthand for [`Action::Schedule`].
    pub fn schedule(timer: TimerKey, after: Duration) -> Self {
        Action::Schedule { timer, after }
    }
}

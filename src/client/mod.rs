//! Participant (requester) role.

mod participant;

pub use participant::*;

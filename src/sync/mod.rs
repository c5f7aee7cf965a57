//! ModSync - Sync Layer
//!
//! Implements:
//! - Message types and their line encoding
//! - Sender-name anchoring for ambiguous inbound lines
//! - Id-based comparison of required add-on sets
//! - The action list shared by both roles

mod action;
mod codec;
mod compare;
mod message;

pub use action::*;
pub use codec::*;
pub use compare::*;
pub use message::*;

//! ModSync - Owner Role
//!
//! Responder and enforcer for the session owner.

mod enforcement;
mod owner;
mod session;

pub use enforcement::*;
pub use owner::*;
pub use session::*;

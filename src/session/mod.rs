//! Session context and configuration.

mod config;
#[allow(clippy::module_inception)]
mod session;

pub use config::*;
pub use session::*;

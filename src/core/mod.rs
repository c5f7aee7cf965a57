//! Core types, contracts, constants and errors.

mod constants;
mod error;
mod registry;
mod traits;
mod types;

pub use constants::*;
pub use error::*;
pub use registry::*;
pub use traits::*;
pub use types::*;

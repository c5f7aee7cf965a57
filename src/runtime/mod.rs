//! Async driver (feature `runtime`).

mod driver;

pub use driver::*;

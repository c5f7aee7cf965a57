//! ModSync - Transport Glue
//!
//! The chat channel itself belongs to the host (see
//! [`ChatTransport`](crate::core::ChatTransport)). This module holds what the
//! protocol layers on top of it:
//!
//! - **Deadlines**: [`TimerQueue`] keyed by [`TimerKey`], polled per tick
//! - **Send retry**: [`Outbox`] for lines sent before the channel is ready
//! - **Echo suppression**: [`EchoGuard`] for channels that loop our lines back
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │     Participant / Owner roles           │
//! ├─────────────────────────────────────────┤
//! │     codec, comparator (sync)            │
//! ├─────────────────────────────────────────┤
//! │     timers, outbox, echo guard          │  ← This module
//! ├─────────────────────────────────────────┤
//! │     host chat channel                   │
//! └─────────────────────────────────────────┘
//! ```

mod outbox;
mod timing;

pub use outbox::*;
pub use timing::*;

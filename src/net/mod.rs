//! Raw socket subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → raw.rs (split socket; read half is the source, write half the sink)
//!     → relay::Transfer (compress until the peer half-closes)
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - No admission queue: the peer pairs with itself
//! - One task per connection

pub mod listener;
pub mod raw;

pub use listener::{ConnectionPermit, Listener, ListenerError};
pub use raw::RawCompressor;

//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, one supervised task per connection)
//!     → connection.rs (stream ownership, state machine)
//!     → Hand off to the forwarder
//! ```
//!
//! # Design Decisions
//! - Bounded accept backlog, no in-process queue
//! - A failed accept stops the loop
//! - No shared mutable state between connection tasks

pub mod connection;
pub mod listener;

pub use connection::{Connection, ConnectionId, ConnectionState, ConnectionTracker};
pub use listener::{Acceptor, ListenerError};

//! Observability subsystem.
//!
//! Operator-facing output is line-oriented `tracing` events. Each connection
//! runs inside a `connection` span carrying `connection_id` and `peer_addr`,
//! so every event below it is attributable.

pub mod logging;

pub use logging::init_logging;

//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Running (supervisor.rs):
//!     accept → track → spawn → (panic logged) → guard released
//!
//! Shutdown (signals.rs):
//!     SIGINT/SIGTERM → acceptor stops → listener closed → exit 0
//! ```
//!
//! # Design Decisions
//! - No draining: in-flight connections are not awaited on shutdown
//! - A panicking connection task never takes the acceptor down

pub mod signals;
pub mod supervisor;

pub use supervisor::Supervisor;

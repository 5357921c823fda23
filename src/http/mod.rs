//! Request forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! socket bytes (single read)
//!     → request.rs (tokenize: request line, header lines, body)
//!     → form.rs (POST body → key/value pairs)
//!     → upstream.rs (UpstreamRequest → reqwest call → response body)
//!     → forwarder.rs (relay body bytes, close)
//! ```
//!
//! # Design Decisions
//! - Only `User-Agent` crosses from client to upstream
//! - Every failure closes the client connection without a response
//! - No retries, no timeouts

pub mod error;
pub mod form;
pub mod forwarder;
pub mod request;
pub mod upstream;

pub use error::ForwardError;
pub use form::FormFields;
pub use forwarder::Forwarder;
pub use request::{Method, ParsedRequest, RawRequest};
pub use upstream::{UpstreamClient, UpstreamMethod, UpstreamRequest};

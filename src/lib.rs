//! Forwarding HTTP proxy.
//!
//! Accepts raw TCP connections, reads `<METHOD> /proxy/<URL> HTTP/...`, issues
//! the same GET or POST to `<URL>` with only the client's `User-Agent`, and
//! writes the upstream response body back before closing.
//!
//! ```text
//!   client ──▶ net::listener ──spawn──▶ http::forwarder ──▶ http::upstream ──▶ upstream
//!   client ◀──────────────── relay body, close ◀──────────────────────────────┘
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use http::Forwarder;
pub use net::Acceptor;

//! Connection state machine and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Own the client stream for exactly one exchange and close it once
//! - Track per-connection state (Accepted → ... → Closed)
//! - Count in-flight connections

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::RawRequest;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Per-connection state. Every path ends in `Closed`; nothing re-enters an
/// earlier state.
///
/// ```text
/// Accepted → Read → Parsed → DispatchGet  ─┬→ UpstreamOk → Relayed → Closed
///              │           → DispatchPost ─┤            └──────────→ Closed
///              │           → Unsupported   └→ UpstreamFail → Closed
///              └→ Malformed ← (bad POST body)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Accepted,
    Read,
    Parsed,
    DispatchGet,
    DispatchPost,
    Unsupported,
    Malformed,
    UpstreamOk,
    UpstreamFail,
    Relayed,
    Closed,
}

impl ConnectionState {
    pub fn can_advance_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        match (self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (Accepted, Read) => true,
            (Read, Parsed | Malformed) => true,
            (Parsed, DispatchGet | DispatchPost | Unsupported) => true,
            (DispatchGet, UpstreamOk | UpstreamFail) => true,
            (DispatchPost, UpstreamOk | UpstreamFail | Malformed) => true,
            (UpstreamOk, Relayed) => true,
            _ => false,
        }
    }
}

/// A client connection, owned by the task serving it.
///
/// [`Connection::close`] consumes the value, so a connection cannot be
/// closed twice.
#[derive(Debug)]
pub struct Connection<S> {
    id: ConnectionId,
    stream: S,
    state: ConnectionState,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(id: ConnectionId, stream: S) -> Self {
        Self {
            id,
            stream,
            state: ConnectionState::Accepted,
        }
    }

    pub fn advance(&mut self, next: ConnectionState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::trace!(connection_id = %self.id, from = ?self.state, to = ?next, "Connection state");
        self.state = next;
    }

    /// One read of at most `capacity` bytes. Whatever arrives is treated as
    /// the complete request.
    pub async fn read_request(&mut self, capacity: usize) -> std::io::Result<RawRequest> {
        let mut buf = vec![0u8; capacity];
        let n = self.stream.read(&mut buf).await?;
        self.advance(ConnectionState::Read);
        Ok(RawRequest::new(&buf[..n], capacity))
    }

    /// Write the upstream body verbatim.
    pub async fn relay(&mut self, body: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(body).await?;
        self.stream.flush().await?;
        self.advance(ConnectionState::Relayed);
        Ok(())
    }

    /// Shut down the write side and drop the stream.
    pub async fn close(mut self) -> ConnectionState {
        if let Err(e) = self.stream.shutdown().await {
            tracing::trace!(connection_id = %self.id, error = %e, "Shutdown on close failed");
        }
        self.advance(ConnectionState::Closed);
        self.state
    }
}

/// Tracks active connections so shutdown can report what it abandons.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    /// Current count of active connections.
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new active connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id: ConnectionId::new(),
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(connection_id = %self.id, "Connection task finished");
    }
}

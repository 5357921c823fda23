//! Connection Acceptor.
//!
//! # Responsibilities
//! - Resolve and bind the configured host/port with a bounded backlog
//! - Accept connections until interrupted
//! - Hand each connection to its own supervised task and keep accepting
//!
//! # Limitations
//! - A failed `accept` is fatal: the loop stops and the error is returned
//! - On interrupt, in-flight connections are abandoned to the runtime

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::{lookup_host, TcpListener, TcpSocket};
use tracing::Instrument;

use crate::config::{ListenerConfig, ProxyConfig};
use crate::http::Forwarder;
use crate::lifecycle::Supervisor;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Failed to resolve {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("No address found for {0}")]
    NoAddress(String),
    #[error("Failed to bind: {0}")]
    Bind(#[source] io::Error),
    #[error("Failed to accept: {0}")]
    Accept(#[source] io::Error),
    #[error("Failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Owns the listening socket. Built from an explicit configuration so several
/// instances can coexist in one process.
pub struct Acceptor {
    inner: TcpListener,
    forwarder: Arc<Forwarder>,
    supervisor: Supervisor,
}

impl Acceptor {
    /// Resolve, bind and listen.
    pub async fn bind(config: &ProxyConfig) -> Result<Self, ListenerError> {
        let addr = resolve(&config.listener).await?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(ListenerError::Bind)?;
        #[cfg(unix)]
        socket.set_reuseaddr(true).map_err(ListenerError::Bind)?;
        socket.bind(addr).map_err(ListenerError::Bind)?;
        let inner = socket
            .listen(config.listener.backlog)
            .map_err(ListenerError::Bind)?;

        let local_addr = inner.local_addr().map_err(ListenerError::Bind)?;
        tracing::info!(
            address = %local_addr,
            backlog = config.listener.backlog,
            max_request_bytes = config.listener.max_request_bytes,
            "Listener bound"
        );

        Ok(Self {
            inner,
            forwarder: Arc::new(Forwarder::new(config)?),
            supervisor: Supervisor::new(),
        })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, io::Error> {
        self.inner.local_addr()
    }

    /// Accept until `shutdown` completes or an accept fails. The listening
    /// socket is closed before this returns.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ListenerError>
    where
        F: Future<Output = ()>,
    {
        let Self {
            inner,
            forwarder,
            supervisor,
        } = self;
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break Ok(()),

                accepted = inner.accept() => match accepted {
                    Ok((stream, peer_addr)) => {
                        let guard = supervisor.track();
                        let id = guard.id();
                        tracing::debug!(connection_id = %id, peer_addr = %peer_addr, "Connection accepted");

                        let span = tracing::info_span!("connection", connection_id = %id, peer_addr = %peer_addr);
                        let forwarder = Arc::clone(&forwarder);
                        supervisor.spawn(
                            guard,
                            async move {
                                let _ = forwarder.serve(stream, id).await;
                            }
                            .instrument(span),
                        );
                    }
                    Err(e) => break Err(ListenerError::Accept(e)),
                },
            }
        };

        drop(inner);
        let in_flight = supervisor.in_flight();
        match &result {
            Ok(()) => tracing::info!(in_flight, "User requested an interrupt, server closed"),
            Err(e) => tracing::error!(error = %e, in_flight, "Accept failed, server closed"),
        }

        result
    }
}

/// First resolved address, IPv4 preferred.
async fn resolve(config: &ListenerConfig) -> Result<SocketAddr, ListenerError> {
    let address = config.display_address();
    let addrs: Vec<SocketAddr> = lookup_host((config.host.as_str(), config.port))
        .await
        .map_err(|source| ListenerError::Resolve {
            address: address.clone(),
            source,
        })?
        .collect();

    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or(ListenerError::NoAddress(address))
}

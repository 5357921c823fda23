//! Request Forwarder: one client connection in, at most one upstream
//! exchange, connection closed.
//!
//! ```text
//! read once → parse → dispatch (GET | POST | unsupported) → upstream call → relay body → close
//! ```
//!
//! Nothing is ever written to the client except the upstream response body.
//! Failures are reported to the operator log only.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::ProxyConfig;
use crate::http::error::ForwardError;
use crate::http::request::{Method, ParsedRequest};
use crate::http::upstream::{UpstreamClient, UpstreamMethod, UpstreamRequest};
use crate::net::connection::{Connection, ConnectionId, ConnectionState};

/// Stateless across connections; shared by every connection task.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: UpstreamClient,
    max_request_bytes: usize,
}

impl Forwarder {
    pub fn new(config: &ProxyConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(
            UpstreamClient::new(&config.upstream)?,
            config.listener.max_request_bytes,
        ))
    }

    pub fn with_client(client: UpstreamClient, max_request_bytes: usize) -> Self {
        Self {
            client,
            max_request_bytes,
        }
    }

    /// Serve one connection end-to-end and close it.
    ///
    /// Returns the number of bytes relayed. The result is informational: the
    /// outcome has already been logged and the connection is closed either way.
    pub async fn serve<S>(&self, stream: S, id: ConnectionId) -> Result<usize, ForwardError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut conn = Connection::new(id, stream);
        let result = self.forward(&mut conn).await;

        match &result {
            Ok((method, bytes)) => tracing::info!(%method, bytes, "Client request served"),
            Err(ForwardError::Unimplemented(method)) => {
                tracing::warn!(method = %method, "Request method unimplemented, try GET or POST")
            }
            Err(e) if e.is_malformed() => tracing::warn!(error = %e, "Client request not served"),
            Err(e) => tracing::error!(error = %e, "Client request not served"),
        }

        conn.close().await;
        result.map(|(_, bytes)| bytes)
    }

    async fn forward<S>(
        &self,
        conn: &mut Connection<S>,
    ) -> Result<(UpstreamMethod, usize), ForwardError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let raw = conn
            .read_request(self.max_request_bytes)
            .await
            .map_err(ForwardError::Read)?;
        tracing::info!(
            bytes = raw.len(),
            truncated = raw.is_truncated(),
            "Client request received"
        );
        if raw.is_empty() {
            tracing::debug!("Client closed without sending a request");
        } else if raw.is_truncated() {
            tracing::warn!(
                limit = self.max_request_bytes,
                "Request filled the read buffer and may be truncated"
            );
        }

        let parsed = match ParsedRequest::parse(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                conn.advance(ConnectionState::Malformed);
                return Err(e);
            }
        };
        conn.advance(ConnectionState::Parsed);
        tracing::info!(
            method = %parsed.method,
            target_url = %parsed.target_url,
            user_agent = %parsed.user_agent,
            "Client request parsed"
        );

        conn.advance(match parsed.method {
            Method::Get => ConnectionState::DispatchGet,
            Method::Post => ConnectionState::DispatchPost,
            Method::Other(_) => ConnectionState::Unsupported,
        });

        let request = match UpstreamRequest::from_parsed(parsed) {
            Ok(request) => request,
            Err(e) => {
                match &e {
                    ForwardError::Unimplemented(_) => {}
                    ForwardError::MalformedBody { .. } => {
                        conn.advance(ConnectionState::Malformed)
                    }
                    _ => conn.advance(ConnectionState::UpstreamFail),
                }
                return Err(e);
            }
        };
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            form_fields = request.form.as_ref().map_or(0, |f| f.len()),
            "Forwarding upstream"
        );

        let method = request.method;
        let body = match self.client.send(request).await {
            Ok(body) => body,
            Err(e) => {
                conn.advance(ConnectionState::UpstreamFail);
                return Err(e);
            }
        };
        conn.advance(ConnectionState::UpstreamOk);

        conn.relay(&body).await.map_err(ForwardError::Relay)?;
        Ok((method, body.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpstreamConfig;
    use crate::observability::logging::capture::{capture_logs, LogBuffer};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn exchange_logged(request: &[u8]) -> (Result<usize, ForwardError>, Vec<u8>, LogBuffer) {
        let (logs, _default) = capture_logs();
        let (result, received) = exchange(request).await;
        (result, received, logs)
    }

    fn forwarder() -> Forwarder {
        Forwarder::with_client(UpstreamClient::new(&UpstreamConfig::default()).unwrap(), 4096)
    }

    /// Feed `request` through a forwarder over an in-memory pipe and collect
    /// what the client would have received.
    async fn exchange(request: &[u8]) -> (Result<usize, ForwardError>, Vec<u8>) {
        let (mut client, server) = tokio::io::duplex(8192);
        client.write_all(request).await.unwrap();

        let result = forwarder().serve(server, ConnectionId::new()).await;

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        (result, received)
    }

    #[tokio::test]
    async fn missing_marker_closes_silently() {
        let (result, received) = exchange(b"GET /favicon.ico HTTP/1.1\r\n\r\n").await;
        assert!(matches!(
            result,
            Err(ForwardError::MissingProxyMarker { target }) if target == "/favicon.ico"
        ));
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn malformed_request_line_closes_silently() {
        let (result, received) = exchange(b"GARBAGE\r\n\r\n").await;
        assert!(matches!(result, Err(ForwardError::MalformedRequestLine { .. })));
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn unsupported_method_closes_silently() {
        let (result, received) =
            exchange(b"DELETE /proxy/http://127.0.0.1:9/x HTTP/1.1\r\n\r\n").await;
        assert!(matches!(result, Err(ForwardError::Unimplemented(m)) if m == "DELETE"));
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn malformed_post_body_closes_silently() {
        let (result, received) =
            exchange(b"POST /proxy/http://127.0.0.1:9/x HTTP/1.1\r\n\r\nnovalue").await;
        assert!(matches!(result, Err(ForwardError::MalformedBody { pair }) if pair == "novalue"));
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn invalid_target_url_closes_silently() {
        let (result, received) = exchange(b"GET /proxy/not-a-url HTTP/1.1\r\n\r\n").await;
        assert!(matches!(result, Err(ForwardError::InvalidTargetUrl { .. })));
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn client_that_sends_nothing_is_malformed() {
        let (client, server) = tokio::io::duplex(64);
        drop(client);

        let result = forwarder().serve(server, ConnectionId::new()).await;
        assert!(matches!(result, Err(ForwardError::MalformedRequestLine { .. })));
    }

    #[tokio::test]
    async fn missing_marker_is_logged_once_with_target() {
        let (result, received, logs) =
            exchange_logged(b"GET /favicon.ico HTTP/1.1\r\nUser-Agent: X\r\n\r\n").await;

        assert!(result.is_err());
        assert!(received.is_empty());

        let not_served = logs.lines_containing("Client request not served");
        assert_eq!(not_served.len(), 1, "{not_served:?}");
        assert!(not_served[0].contains("/favicon.ico"), "{}", not_served[0]);
        assert_eq!(logs.lines_containing("Client request received").len(), 1);
        assert!(logs.lines_containing("Client request parsed").is_empty());
        assert!(logs.lines_containing("Client request served").is_empty());
    }

    #[tokio::test]
    async fn unimplemented_method_is_logged_once() {
        let (result, received, logs) =
            exchange_logged(b"DELETE /proxy/http://127.0.0.1:9/x HTTP/1.1\r\n\r\n").await;

        assert!(matches!(result, Err(ForwardError::Unimplemented(_))));
        assert!(received.is_empty());

        let unimplemented = logs.lines_containing("Request method unimplemented");
        assert_eq!(unimplemented.len(), 1, "{unimplemented:?}");
        assert!(unimplemented[0].contains("DELETE"));
        assert_eq!(logs.lines_containing("Client request parsed").len(), 1);
        assert!(logs.lines_containing("Client request not served").is_empty());
    }

    #[tokio::test]
    async fn empty_read_is_reported_before_not_served() {
        let (client, server) = tokio::io::duplex(64);
        drop(client);

        let (logs, _default) = capture_logs();
        let result = forwarder().serve(server, ConnectionId::new()).await;

        assert!(result.is_err());
        assert_eq!(logs.lines_containing("Client closed without sending a request").len(), 1);
        assert_eq!(logs.lines_containing("Client request not served").len(), 1);
    }

    #[tokio::test]
    async fn served_event_names_method_and_size() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello")
                .await;
            let _ = socket.shutdown().await;
        });

        let (logs, _default) = capture_logs();
        let request = format!("GET /proxy/http://{addr}/ HTTP/1.1\r\n\r\n");
        let (result, received) = exchange(request.as_bytes()).await;

        assert_eq!(result.unwrap(), 5);
        assert_eq!(received, b"hello");

        let served = logs.lines_containing("Client request served");
        assert_eq!(served.len(), 1, "{served:?}");
        assert!(served[0].contains("method=GET"), "{}", served[0]);
        assert!(served[0].contains("bytes=5"), "{}", served[0]);
        assert!(logs.lines_containing("Client request not served").is_empty());
    }
}

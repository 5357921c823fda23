//! Outbound request construction and the HTTP client that sends it.

use std::fmt;

use bytes::Bytes;
use reqwest::header::{HeaderValue, USER_AGENT};
use url::Url;

use crate::config::UpstreamConfig;
use crate::http::error::ForwardError;
use crate::http::form::FormFields;
use crate::http::request::{Method, ParsedRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamMethod {
    Get,
    Post,
}

impl fmt::Display for UpstreamMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamMethod::Get => f.write_str("GET"),
            UpstreamMethod::Post => f.write_str("POST"),
        }
    }
}

/// What is sent upstream: one method, one absolute URL, one header and, for
/// POST, the form fields to encode as the body.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub method: UpstreamMethod,
    pub url: Url,
    pub user_agent: String,
    pub form: Option<FormFields>,
}

impl UpstreamRequest {
    /// Dispatch on the client's method. Unsupported methods are rejected
    /// before the body or the URL are looked at.
    pub fn from_parsed(request: ParsedRequest) -> Result<Self, ForwardError> {
        let (method, form) = match request.method {
            Method::Get => (UpstreamMethod::Get, None),
            Method::Post => {
                let body = request.body.as_deref().unwrap_or_default();
                (UpstreamMethod::Post, Some(FormFields::parse(body)?))
            }
            Method::Other(token) => return Err(ForwardError::Unimplemented(token)),
        };

        let url = Url::parse(&request.target_url).map_err(|source| {
            ForwardError::InvalidTargetUrl {
                url: request.target_url.clone(),
                source,
            }
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ForwardError::UnsupportedScheme(url.to_string()));
        }

        Ok(Self {
            method,
            url,
            user_agent: request.user_agent,
            form,
        })
    }
}

/// Thin wrapper over a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    inner: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            inner: builder.build()?,
        })
    }

    /// Perform the call and return the response body. Statuses 4xx/5xx are
    /// errors; redirects are followed by the client.
    pub async fn send(&self, request: UpstreamRequest) -> Result<Bytes, ForwardError> {
        let user_agent = HeaderValue::from_str(&request.user_agent)
            .map_err(|_| ForwardError::InvalidUserAgent(request.user_agent.clone()))?;

        let builder = match request.method {
            UpstreamMethod::Get => self.inner.get(request.url),
            UpstreamMethod::Post => self.inner.post(request.url),
        }
        .header(USER_AGENT, user_agent);

        let builder = match &request.form {
            Some(form) => builder.form(form.as_pairs()),
            None => builder,
        };

        let response = builder.send().await?.error_for_status()?;
        tracing::debug!(status = %response.status(), "Upstream responded");

        Ok(response.bytes().await?)
    }
}

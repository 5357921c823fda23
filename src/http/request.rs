//! Line-oriented tokenizer for the raw request text.
//!
//! The proxy never runs a full HTTP parser. It needs four things out of the
//! bytes it read: the method, the request target, one header and the body.
//! Each of those has a dedicated extractor here so edge cases (no blank line,
//! a buffer cut off mid-line, `\r\n` vs `\n`) are decided in one place.

use std::fmt;

use crate::http::error::ForwardError;

/// Marker separating the proxy's own path from the upstream URL.
pub const PROXY_MARKER: &str = "/proxy/";

/// The only header forwarded upstream.
pub const USER_AGENT: &str = "User-Agent";

/// The bytes obtained by the single read on a client connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRequest {
    text: String,
    len: usize,
    truncated: bool,
}

impl RawRequest {
    /// Decode what was read. `capacity` is the size of the read buffer; a read
    /// that filled it is flagged as possibly truncated.
    pub fn new(bytes: &[u8], capacity: usize) -> Self {
        Self {
            text: String::from_utf8_lossy(bytes).into_owned(),
            len: bytes.len(),
            truncated: bytes.len() >= capacity,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of bytes read from the socket.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

/// Request text split at line boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lines<'a> {
    /// First line, line terminator removed. Empty for an empty request.
    pub request_line: &'a str,
    /// Lines between the request line and the first blank line.
    pub headers: Vec<&'a str>,
    /// Everything after the first blank line, untouched. `None` when the
    /// text contains no blank line.
    pub body: Option<&'a str>,
}

/// Split on `\n`, dropping a trailing `\r` from each line.
pub fn tokenize(text: &str) -> Lines<'_> {
    let mut request_line = None;
    let mut headers = Vec::new();
    let mut body = None;
    let mut offset = 0;

    for segment in text.split_inclusive('\n') {
        offset += segment.len();
        let line = strip_line_end(segment);

        if request_line.is_none() {
            request_line = Some(line);
        } else if line.is_empty() {
            body = Some(&text[offset..]);
            break;
        } else {
            headers.push(line);
        }
    }

    Lines {
        request_line: request_line.unwrap_or(""),
        headers,
        body,
    }
}

fn strip_line_end(segment: &str) -> &str {
    let line = segment.strip_suffix('\n').unwrap_or(segment);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Method and target from the request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine<'a> {
    /// Uppercased method token.
    pub method: String,
    pub target: &'a str,
}

impl<'a> RequestLine<'a> {
    /// Split on single spaces; the first two tokens must be present and non-empty.
    pub fn parse(line: &'a str) -> Result<Self, ForwardError> {
        let mut tokens = line.split(' ');
        let method = tokens.next().filter(|t| !t.is_empty());
        let target = tokens.next().filter(|t| !t.is_empty());

        match (method, target) {
            (Some(method), Some(target)) => Ok(Self {
                method: method.to_uppercase(),
                target,
            }),
            _ => Err(ForwardError::MalformedRequestLine {
                line: line.to_string(),
            }),
        }
    }
}

/// Everything following [`PROXY_MARKER`] in the request target.
pub fn target_url(target: &str) -> Result<&str, ForwardError> {
    target
        .find(PROXY_MARKER)
        .map(|at| &target[at + PROXY_MARKER.len()..])
        .ok_or_else(|| ForwardError::MissingProxyMarker {
            target: target.to_string(),
        })
}

/// Value of the first header line that starts with `name:` (case-sensitive),
/// leading blanks after the colon and trailing whitespace removed.
pub fn header_value<'a>(headers: &[&'a str], name: &str) -> Option<&'a str> {
    headers.iter().copied().find_map(|line| {
        let rest = line.strip_prefix(name)?.strip_prefix(':')?;
        Some(rest.trim_start_matches(|c: char| c == ' ' || c == '\t').trim_end())
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other(String),
}

impl Method {
    /// Expects an already uppercased token.
    pub fn from_token(token: String) -> Self {
        match token.as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            _ => Method::Other(token),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
            Method::Other(token) => f.write_str(token),
        }
    }
}

/// The fields the forwarder needs out of one client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub method: Method,
    /// Substring after the proxy marker, not validated as a URL yet.
    pub target_url: String,
    /// Empty when the client sent no `User-Agent`.
    pub user_agent: String,
    pub body: Option<String>,
}

impl ParsedRequest {
    pub fn parse(raw: &RawRequest) -> Result<Self, ForwardError> {
        let lines = tokenize(raw.text());
        let request_line = RequestLine::parse(lines.request_line)?;
        let target_url = target_url(request_line.target)?;

        Ok(Self {
            method: Method::from_token(request_line.method),
            target_url: target_url.to_string(),
            user_agent: header_value(&lines.headers, USER_AGENT)
                .unwrap_or_default()
                .to_string(),
            body: lines.body.map(str::to_string),
        })
    }
}

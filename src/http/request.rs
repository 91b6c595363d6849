//! Raw HTTP Request Parser
//!
//! This module turns one connection's raw byte buffer into a structured
//! request. The framing model is deliberately simple: the dispatcher reads
//! once, we parse once. There is no incremental parsing, no pipelining and
//! no chunked encoding, just one best-effort request per connection.
//!
//! ## Parsing Rules
//!
//! 1. The header/body boundary is the first `\r\n\r\n`, or failing that the
//!    first `\n\n`. No boundary means the request is malformed.
//! 2. The request line must contain at least three whitespace-separated
//!    tokens: method, path, version.
//! 3. Header lines are kept verbatim, with no name/value splitting and no
//!    case normalization. The header block is bounded; lines that would
//!    overflow it are dropped silently rather than rejected.
//! 4. The body is everything after the boundary with leading CR/LF/space
//!    bytes skipped, truncated to the size limit rather than rejected.

use bytes::Bytes;
use thiserror::Error;

/// Maximum size of a single inbound request (1 MiB).
pub const MAX_REQUEST_SIZE: usize = 1024 * 1024;

/// Maximum size of the accumulated header block (4 KiB).
/// Header lines past this limit are dropped, not an error.
pub const MAX_HEADER_BLOCK: usize = 4096;

/// Errors that can occur while parsing a raw request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The byte stream is not a parsable HTTP request
    #[error("malformed request")]
    MalformedRequest,
}

/// A request parsed out of one connection's byte buffer.
///
/// Created once per connection, consumed by route dispatch and request
/// logging, then discarded with the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    /// Request method (e.g. `GET`, `POST`)
    pub method: String,
    /// Request path, possibly including a `?query` component
    pub path: String,
    /// Protocol version token (e.g. `HTTP/1.1`)
    pub version: String,
    /// Raw header lines joined by `\n`, excluding the terminating blank line
    pub headers: String,
    /// Request body with leading CR/LF/space stripped
    pub body: Bytes,
    /// Length of `body` in bytes
    pub body_length: usize,
}

impl ParsedRequest {
    /// Returns the path without its query component.
    pub fn clean_path(&self) -> &str {
        match self.path.find('?') {
            Some(pos) => &self.path[..pos],
            None => &self.path,
        }
    }

    /// Returns the raw query string of this request's path.
    pub fn query(&self) -> &str {
        extract_query(&self.path)
    }
}

/// Parses a raw request buffer into a [`ParsedRequest`].
///
/// # Errors
///
/// Returns [`ParseError::MalformedRequest`] when no header/body boundary is
/// present or the request line has fewer than three tokens. Oversized header
/// blocks and bodies are truncated, never rejected.
pub fn parse(raw: &[u8]) -> Result<ParsedRequest, ParseError> {
    let (head, body_start) = split_head(raw).ok_or(ParseError::MalformedRequest)?;

    // Header section is treated as text; invalid UTF-8 means we cannot
    // make sense of the request line.
    let head = std::str::from_utf8(head).map_err(|_| ParseError::MalformedRequest)?;

    let mut lines = head.lines();
    let request_line = lines.next().ok_or(ParseError::MalformedRequest)?;

    let mut tokens = request_line.split_ascii_whitespace();
    let method = tokens.next().ok_or(ParseError::MalformedRequest)?;
    let path = tokens.next().ok_or(ParseError::MalformedRequest)?;
    let version = tokens.next().ok_or(ParseError::MalformedRequest)?;

    // Accumulate header lines verbatim within the block limit. A line that
    // does not fit is skipped, not an error; later lines that fit are
    // still kept.
    let mut headers = String::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if headers.len() + line.len() + 1 > MAX_HEADER_BLOCK {
            continue;
        }
        headers.push_str(line);
        headers.push('\n');
    }

    let mut body = &raw[body_start..];
    while let [b'\r' | b'\n' | b' ', rest @ ..] = body {
        body = rest;
    }
    // Reserve one byte of the limit, matching the wire buffer bound.
    if body.len() >= MAX_REQUEST_SIZE {
        body = &body[..MAX_REQUEST_SIZE - 1];
    }

    Ok(ParsedRequest {
        method: method.to_string(),
        path: path.to_string(),
        version: version.to_string(),
        headers,
        body: Bytes::copy_from_slice(body),
        body_length: body.len(),
    })
}

/// Locates the header/body boundary.
///
/// Returns the header bytes (boundary excluded) and the offset where the
/// body starts, accepting either a canonical double-CRLF or a bare
/// double-newline.
fn split_head(raw: &[u8]) -> Option<(&[u8], usize)> {
    if let Some(pos) = find(raw, b"\r\n\r\n") {
        return Some((&raw[..pos], pos + 4));
    }
    if let Some(pos) = find(raw, b"\n\n") {
        return Some((&raw[..pos], pos + 2));
    }
    None
}

#[inline]
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Extracts the raw query string from a request path.
///
/// Everything after the first `?` is returned; a path without `?` (or with a
/// trailing bare `?`) yields the empty string. Total and idempotent, usable
/// independently of the parser for request logging.
pub fn extract_query(path: &str) -> &str {
    match path.find('?') {
        Some(pos) => &path[pos + 1..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_get() {
        let raw = b"GET /health HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let req = parse(raw).unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/health");
        assert_eq!(req.version, "HTTP/1.1");
        assert_eq!(req.headers, "Host: localhost\n");
        assert_eq!(req.body_length, 0);
    }

    #[test]
    fn test_parse_post_with_body() {
        let raw = b"POST /anything HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
        let req = parse(raw).unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.body.as_ref(), b"hello");
        assert_eq!(req.body_length, 5);
    }

    #[test]
    fn test_parse_bare_newline_boundary() {
        let raw = b"POST /a HTTP/1.0\nX-One: 1\n\npayload";
        let req = parse(raw).unwrap();
        assert_eq!(req.headers, "X-One: 1\n");
        assert_eq!(req.body.as_ref(), b"payload");
    }

    #[test]
    fn test_parse_missing_boundary_fails() {
        let raw = b"GET /health HTTP/1.1\r\nHost: localhost\r\n";
        assert_eq!(parse(raw), Err(ParseError::MalformedRequest));
    }

    #[test]
    fn test_parse_short_request_line_fails() {
        assert_eq!(parse(b"GET /only\r\n\r\n"), Err(ParseError::MalformedRequest));
        assert_eq!(parse(b"GET\r\n\r\n"), Err(ParseError::MalformedRequest));
        assert_eq!(parse(b"\r\n\r\n"), Err(ParseError::MalformedRequest));
    }

    #[test]
    fn test_parse_strips_leading_body_whitespace() {
        let raw = b"POST /x HTTP/1.1\r\n\r\n\r\n  hello";
        let req = parse(raw).unwrap();
        assert_eq!(req.body.as_ref(), b"hello");
    }

    #[test]
    fn test_parse_headers_kept_verbatim() {
        // No case normalization, no name/value splitting
        let raw = b"GET / HTTP/1.1\r\nx-WeIrD:  spaced   \r\nAnother: v\r\n\r\n";
        let req = parse(raw).unwrap();
        assert_eq!(req.headers, "x-WeIrD:  spaced   \nAnother: v\n");
    }

    #[test]
    fn test_parse_oversized_header_block_truncates() {
        let mut raw = Vec::from(&b"GET / HTTP/1.1\r\n"[..]);
        for i in 0..200 {
            raw.extend_from_slice(format!("X-Filler-{i}: {}\r\n", "y".repeat(60)).as_bytes());
        }
        raw.extend_from_slice(b"\r\nbody");

        let req = parse(&raw).unwrap();
        assert!(req.headers.len() <= MAX_HEADER_BLOCK);
        assert!(req.headers.starts_with("X-Filler-0:"));
        assert_eq!(req.body.as_ref(), b"body");
    }

    #[test]
    fn test_parse_keeps_short_header_after_oversized_one() {
        // A line too big for the block is skipped; a later short line that
        // still fits is kept.
        let mut raw = Vec::from(&b"GET / HTTP/1.1\r\n"[..]);
        raw.extend_from_slice(format!("X-Huge: {}\r\n", "z".repeat(MAX_HEADER_BLOCK)).as_bytes());
        raw.extend_from_slice(b"X-Small: 1\r\n\r\n");

        let req = parse(&raw).unwrap();
        assert!(!req.headers.contains("X-Huge"));
        assert_eq!(req.headers, "X-Small: 1\n");
    }

    #[test]
    fn test_parse_oversized_body_truncates() {
        let mut raw = Vec::from(&b"POST /big HTTP/1.1\r\n\r\n"[..]);
        raw.extend(std::iter::repeat(b'a').take(MAX_REQUEST_SIZE + 64));

        let req = parse(&raw).unwrap();
        assert_eq!(req.body_length, MAX_REQUEST_SIZE - 1);
    }

    #[test]
    fn test_extract_query() {
        assert_eq!(extract_query("/a/b"), "");
        assert_eq!(extract_query("/a?x=1&y=2"), "x=1&y=2");
        assert_eq!(extract_query("/a?"), "");
    }

    #[test]
    fn test_extract_query_idempotent() {
        let q = extract_query("/a?x=1");
        assert_eq!(extract_query(q), "");
    }

    #[test]
    fn test_clean_path() {
        let raw = b"GET /fakeapi?token=abc HTTP/1.1\r\n\r\n";
        let req = parse(raw).unwrap();
        assert_eq!(req.clean_path(), "/fakeapi");
        assert_eq!(req.query(), "token=abc");
    }
}

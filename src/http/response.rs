//! Minimal HTTP Response Builder
//!
//! Serializes a status code and message into a single complete response
//! buffer: status line, a fixed header set, and a small JSON body. The
//! dispatcher writes the buffer in one send and closes the connection, so
//! there is no header folding and no chunking.

use bytes::{BufMut, Bytes, BytesMut};
use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};

/// Builds a complete response buffer for the given status and message.
///
/// The body carries `status`, `message` and a unix timestamp. Content-Length
/// is always computed from the serialized body itself.
pub fn build(status: u16, message: &str) -> Bytes {
    let body = json!({
        "status": if status < 400 { "success" } else { "error" },
        "message": message,
        "timestamp": unix_timestamp(),
    })
    .to_string();

    let mut buf = BytesMut::with_capacity(128 + body.len());
    buf.put_slice(b"HTTP/1.1 ");
    buf.put_slice(status.to_string().as_bytes());
    buf.put_slice(b" ");
    buf.put_slice(reason_phrase(status).as_bytes());
    buf.put_slice(b"\r\nContent-Type: application/json\r\nContent-Length: ");
    buf.put_slice(body.len().to_string().as_bytes());
    buf.put_slice(b"\r\nConnection: close\r\n\r\n");
    buf.put_slice(body.as_bytes());
    buf.freeze()
}

/// Reason phrase for the handful of status codes the services emit.
fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Seconds since the unix epoch.
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn split(response: &Bytes) -> (String, Value) {
        let text = std::str::from_utf8(response).unwrap();
        let (head, body) = text.split_once("\r\n\r\n").unwrap();
        (head.to_string(), serde_json::from_str(body).unwrap())
    }

    #[test]
    fn test_build_ok_response() {
        let response = build(200, "processed");
        let (head, body) = split(&response);

        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(head.contains("Content-Type: application/json"));
        assert!(head.contains("Connection: close"));
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "processed");
        assert!(body["timestamp"].as_u64().unwrap() > 0);
    }

    #[test]
    fn test_build_bad_request() {
        let response = build(400, "Bad Request");
        let (head, body) = split(&response);

        assert!(head.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert_eq!(body["status"], "error");
    }

    #[test]
    fn test_content_length_matches_body() {
        let response = build(200, "a message with \"quotes\" and unicode: é");
        let text = std::str::from_utf8(&response).unwrap();
        let (head, body) = text.split_once("\r\n\r\n").unwrap();

        let declared: usize = head
            .lines()
            .find_map(|line| line.strip_prefix("Content-Length: "))
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(declared, body.len());
    }
}

//! HTTP/1.x wire format for cached responses
//!
//! A cached entry is the full response as it would appear on the wire:
//! status line, header block, blank line, then the buffered body. Hop-by-hop
//! headers are dropped because the body is always stored complete.

use bytes::{BufMut, Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue};
use http::{Response, StatusCode, Version};

use crate::client::is_hop_by_hop;
use crate::error::ProxyError;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

fn parse_version(s: &str) -> Result<Version, ProxyError> {
    match s {
        "HTTP/0.9" => Ok(Version::HTTP_09),
        "HTTP/1.0" => Ok(Version::HTTP_10),
        "HTTP/1.1" => Ok(Version::HTTP_11),
        "HTTP/2" | "HTTP/2.0" => Ok(Version::HTTP_2),
        "HTTP/3" | "HTTP/3.0" => Ok(Version::HTTP_3),
        other => Err(ProxyError::MalformedMessage(format!(
            "unknown protocol version: {}",
            other
        ))),
    }
}

/// Serialize a complete response into its wire representation
pub fn encode_response(response: &Response<Bytes>) -> Bytes {
    let status = response.status();
    let body = response.body();

    let mut buf = BytesMut::with_capacity(body.len() + 512);
    buf.put_slice(version_str(response.version()).as_bytes());
    buf.put_u8(b' ');
    buf.put_slice(status.as_str().as_bytes());
    buf.put_u8(b' ');
    buf.put_slice(status.canonical_reason().unwrap_or("").as_bytes());
    buf.put_slice(b"\r\n");

    for (name, value) in response.headers() {
        if is_hop_by_hop(name) {
            continue;
        }
        buf.put_slice(name.as_str().as_bytes());
        buf.put_slice(b": ");
        buf.put_slice(value.as_bytes());
        buf.put_slice(b"\r\n");
    }

    buf.put_slice(b"\r\n");
    buf.put_slice(body);
    buf.freeze()
}

/// Parse a response previously produced by [`encode_response`]
pub fn decode_response(data: Bytes) -> Result<Response<Bytes>, ProxyError> {
    let head_end = data
        .windows(HEADER_TERMINATOR.len())
        .position(|w| w == HEADER_TERMINATOR)
        .ok_or_else(|| ProxyError::MalformedMessage("missing header terminator".to_string()))?;

    let mut lines = data[..head_end]
        .split(|b| *b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line));

    let status_line = lines
        .next()
        .and_then(|line| std::str::from_utf8(line).ok())
        .ok_or_else(|| ProxyError::MalformedMessage("invalid status line".to_string()))?;

    let mut parts = status_line.splitn(3, ' ');
    let version = parse_version(parts.next().unwrap_or(""))?;
    let status = parts
        .next()
        .and_then(|code| StatusCode::from_bytes(code.as_bytes()).ok())
        .ok_or_else(|| {
            ProxyError::MalformedMessage(format!("invalid status line: {}", status_line))
        })?;

    let mut response = Response::new(data.slice(head_end + HEADER_TERMINATOR.len()..));
    *response.status_mut() = status;
    *response.version_mut() = version;

    let headers = response.headers_mut();
    for line in lines {
        let colon = line
            .iter()
            .position(|b| *b == b':')
            .ok_or_else(|| ProxyError::MalformedMessage("header without colon".to_string()))?;

        let name = HeaderName::from_bytes(line[..colon].trim_ascii())
            .map_err(|e| ProxyError::MalformedMessage(format!("invalid header name: {}", e)))?;
        let value = HeaderValue::from_bytes(line[colon + 1..].trim_ascii())
            .map_err(|e| ProxyError::MalformedMessage(format!("invalid header value: {}", e)))?;

        headers.append(name, value);
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response() -> Response<Bytes> {
        let mut response = Response::new(Bytes::from_static(b"{\"userId\":2,\"id\":5}"));
        *response.status_mut() = StatusCode::NOT_FOUND;
        let headers = response.headers_mut();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        response
    }

    #[test]
    fn test_encode_writes_status_line_and_drops_hop_by_hop() {
        let encoded = encode_response(&sample_response());
        let text = std::str::from_utf8(&encoded).unwrap();

        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("content-type: application/json\r\n"));
        assert!(!text.contains("transfer-encoding"));
        assert!(text.ends_with("\r\n\r\n{\"userId\":2,\"id\":5}"));
    }

    #[test]
    fn test_decode_restores_encoded_response() {
        let decoded = decode_response(encode_response(&sample_response())).unwrap();

        assert_eq!(decoded.status(), StatusCode::NOT_FOUND);
        assert_eq!(decoded.version(), Version::HTTP_11);
        assert_eq!(decoded.headers().get("content-type").unwrap(), "application/json");
        let cookies: Vec<_> = decoded.headers().get_all("set-cookie").iter().collect();
        assert_eq!(cookies.len(), 2);
        assert_eq!(decoded.body().as_ref(), b"{\"userId\":2,\"id\":5}");
    }

    #[test]
    fn test_decode_keeps_body_bytes_verbatim() {
        let raw = Bytes::from_static(b"HTTP/1.0 200 OK\r\nX-Test:  padded  \r\n\r\n\r\n\r\nbody");
        let decoded = decode_response(raw).unwrap();

        assert_eq!(decoded.version(), Version::HTTP_10);
        assert_eq!(decoded.headers().get("x-test").unwrap(), "padded");
        assert_eq!(decoded.body().as_ref(), b"\r\n\r\nbody");
    }

    #[test]
    fn test_decode_rejects_malformed_input() {
        assert!(decode_response(Bytes::from_static(b"")).is_err());
        assert!(decode_response(Bytes::from_static(b"HTTP/1.1 200 OK\r\n")).is_err());
        assert!(decode_response(Bytes::from_static(b"SPDY/9 200 OK\r\n\r\n")).is_err());
        assert!(decode_response(Bytes::from_static(b"HTTP/1.1 abc OK\r\n\r\n")).is_err());
        assert!(decode_response(Bytes::from_static(b"HTTP/1.1 200 OK\r\nbroken\r\n\r\n")).is_err());
    }
}

//! Raw request text parsing
//!
//! Turns an arbitrary pasted block of request text into a structured
//! [`RequestPayload`]. The parser never fails: malformed input degrades to
//! best-effort defaults, and callers reject payloads whose URL ends up
//! empty before dispatching them anywhere.

use gatewatch_common::RequestPayload;
use std::collections::BTreeMap;

/// Method tokens accepted on the request line
const RECOGNIZED_METHODS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS", "HEAD"];

/// Parse a pasted raw request.
///
/// The text is split on the first blank line into a header block and a body
/// (blank lines inside the body survive). The first non-empty line is the
/// request line: when it starts with a recognized method token the second
/// whitespace token becomes the URL (an `HTTP/1.1` trailer is dropped);
/// otherwise the whole line is taken as a bare URL with the method
/// defaulting to GET. Remaining lines split on the first colon; lines
/// without one are dropped silently, and later duplicate names overwrite
/// earlier ones.
pub fn parse_raw_request(input: &str) -> RequestPayload {
    let sanitized = input.replace('\r', "");
    let sanitized = sanitized.trim();
    if sanitized.is_empty() {
        return RequestPayload {
            method: "GET".to_string(),
            ..RequestPayload::default()
        };
    }

    let (header_block, body) = match sanitized.split_once("\n\n") {
        Some((head, rest)) => (head, rest.trim().to_string()),
        None => (sanitized, String::new()),
    };

    let mut lines = header_block.lines().filter(|line| !line.is_empty());
    let request_line = lines.next().unwrap_or("");

    let mut tokens = request_line.split_whitespace();
    let first = tokens.next().unwrap_or("").to_ascii_uppercase();
    let (method, url) = if RECOGNIZED_METHODS.contains(&first.as_str()) {
        (first, tokens.next().unwrap_or("").to_string())
    } else {
        ("GET".to_string(), request_line.trim().to_string())
    };

    let mut headers = BTreeMap::new();
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        headers.insert(name.to_string(), value.trim().to_string());
    }

    let url = absolute_url(&url, &headers);

    RequestPayload {
        method,
        url,
        headers,
        body,
    }
}

/// Best-effort absolute-URL reconstruction.
///
/// A URL already carrying an explicit scheme is used unchanged. Otherwise a
/// `Host` header (any case) is required; without one the raw value is
/// returned as-is and is unusable for dispatch. The scheme is guessed from
/// the host (`localhost` anywhere in it means `http`, everything else
/// `https`) — a heuristic, not a statement about the original scheme.
pub fn absolute_url(path_or_url: &str, headers: &BTreeMap<String, String>) -> String {
    if path_or_url.is_empty() {
        return String::new();
    }
    if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
        return path_or_url.to_string();
    }

    let Some(host) = host_header(headers) else {
        return path_or_url.to_string();
    };

    let scheme = if host.contains("localhost") {
        "http"
    } else {
        "https"
    };
    let separator = if path_or_url.starts_with('/') { "" } else { "/" };
    format!("{}://{}{}{}", scheme, host, separator, path_or_url)
}

fn host_header(headers: &BTreeMap<String, String>) -> Option<&str> {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("host"))
        .map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_path_without_host_is_kept_relative() {
        let parsed = parse_raw_request("GET /api/users?id=123");
        assert_eq!(parsed.method, "GET");
        assert_eq!(parsed.url, "/api/users?id=123");
        assert!(parsed.headers.is_empty());
        assert_eq!(parsed.body, "");
    }

    #[test]
    fn test_full_request_with_host_and_body() {
        let parsed = parse_raw_request(
            "POST /login\nHost: example.com\nContent-Type: application/json\n\n{\"u\":\"a\"}",
        );
        assert_eq!(parsed.method, "POST");
        assert_eq!(parsed.url, "https://example.com/login");
        assert_eq!(parsed.headers["Host"], "example.com");
        assert_eq!(parsed.headers["Content-Type"], "application/json");
        assert_eq!(parsed.body, "{\"u\":\"a\"}");
    }

    #[test]
    fn test_localhost_host_selects_http() {
        let parsed = parse_raw_request("GET /health\nHost: localhost:8080");
        assert_eq!(parsed.url, "http://localhost:8080/health");
    }

    #[test]
    fn test_no_blank_line_means_empty_body() {
        let parsed = parse_raw_request("GET /a\nHost: x.dev\nAccept: */*");
        assert_eq!(parsed.body, "");
        assert_eq!(parsed.headers.len(), 2);
    }

    #[test]
    fn test_body_keeps_interior_blank_lines() {
        let parsed = parse_raw_request("POST /p\nHost: x.dev\n\nline one\n\nline two");
        assert_eq!(parsed.body, "line one\n\nline two");
    }

    #[test]
    fn test_lines_without_colon_are_dropped() {
        let parsed = parse_raw_request("GET /a\nHost: x.dev\nthis is not a header");
        assert_eq!(parsed.headers.len(), 1);
    }

    #[test]
    fn test_duplicate_headers_last_wins() {
        let parsed = parse_raw_request("GET /a\nHost: x.dev\nX-Tag: one\nX-Tag: two");
        assert_eq!(parsed.headers["X-Tag"], "two");
    }

    #[test]
    fn test_bare_url_defaults_to_get() {
        let parsed = parse_raw_request("https://example.com/search?q=term");
        assert_eq!(parsed.method, "GET");
        assert_eq!(parsed.url, "https://example.com/search?q=term");
    }

    #[test]
    fn test_empty_input_degrades_to_defaults() {
        let parsed = parse_raw_request("   \r\n  ");
        assert_eq!(parsed.method, "GET");
        assert_eq!(parsed.url, "");
        assert!(parsed.headers.is_empty());
        assert_eq!(parsed.body, "");
    }

    #[test]
    fn test_path_without_leading_slash_gets_one() {
        let parsed = parse_raw_request("GET api/users\nHost: example.com");
        assert_eq!(parsed.url, "https://example.com/api/users");
    }

    #[test]
    fn test_method_is_case_insensitive_and_http_trailer_dropped() {
        let parsed = parse_raw_request("post /login HTTP/1.1\nHost: example.com");
        assert_eq!(parsed.method, "POST");
        assert_eq!(parsed.url, "https://example.com/login");
    }

    #[test]
    fn test_explicit_scheme_is_untouched_by_host() {
        let parsed = parse_raw_request("GET http://insecure.example.com/x\nHost: other.com");
        assert_eq!(parsed.url, "http://insecure.example.com/x");
    }

    #[test]
    fn test_carriage_returns_are_stripped() {
        let parsed = parse_raw_request("GET /a\r\nHost: x.dev\r\n\r\nbody");
        assert_eq!(parsed.url, "https://x.dev/a");
        assert_eq!(parsed.body, "body");
    }
}

//! Canonical request building for AWS Signature V4.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::{BTreeMap, BTreeSet};

/// Characters that should NOT be percent-encoded in URI paths.
const URI_PATH_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Characters that should NOT be percent-encoded in query strings.
const QUERY_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// URI-encode a raw path, keeping `/` separators.
pub fn uri_encode_path(path: &str) -> String {
    utf8_percent_encode(path, URI_PATH_SET).to_string()
}

/// URI-encode a query parameter name or value.
pub fn uri_encode_query(value: &str) -> String {
    utf8_percent_encode(value, QUERY_SET).to_string()
}

/// Build the canonical URI from a raw absolute path.
///
/// Each segment is encoded exactly once; an empty path becomes `/`.
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    uri_encode_path(path)
}

/// Build the canonical query string from raw parameters.
///
/// Names and values are encoded, then sorted by encoded name. A parameter
/// without a value is rendered as `name=`.
pub fn build_canonical_query_string(params: &BTreeMap<String, String>) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (uri_encode_query(k), uri_encode_query(v)))
        .collect();
    encoded.sort();

    encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical headers string.
///
/// Headers are lowercased, trimmed, sorted by name, and joined with newlines.
/// Multiple values for the same header are comma-separated.
pub fn build_canonical_headers(headers: &[(String, String)]) -> String {
    let mut header_map: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (name, value) in headers {
        let name_lower = name.to_lowercase();
        if !super::should_sign_header(&name_lower) {
            continue;
        }

        let trimmed = value.split_whitespace().collect::<Vec<_>>().join(" ");
        header_map.entry(name_lower).or_default().push(trimmed);
    }

    header_map
        .iter()
        .map(|(name, values)| format!("{}:{}\n", name, values.join(",")))
        .collect()
}

/// Build the signed headers string.
///
/// Returns a semicolon-separated list of lowercase header names.
pub fn build_signed_headers(headers: &[(String, String)]) -> String {
    let names: BTreeSet<String> = headers
        .iter()
        .map(|(name, _)| name.to_lowercase())
        .filter(|name| super::should_sign_header(name))
        .collect();

    names.into_iter().collect::<Vec<_>>().join(";")
}

/// Build the canonical request string.
///
/// Format:
/// ```text
/// HTTPMethod\n
/// CanonicalURI\n
/// CanonicalQueryString\n
/// CanonicalHeaders\n
/// SignedHeaders\n
/// HashedPayload
/// ```
pub fn build_canonical_request(
    method: &str,
    path: &str,
    query: &BTreeMap<String, String>,
    headers: &[(String, String)],
    payload_hash: &str,
) -> String {
    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method.to_uppercase(),
        build_canonical_uri(path),
        build_canonical_query_string(query),
        build_canonical_headers(headers),
        build_signed_headers(headers),
        payload_hash
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_uri_encode_path() {
        assert_eq!(uri_encode_path("/"), "/");
        assert_eq!(uri_encode_path("/foo/bar"), "/foo/bar");
        assert_eq!(uri_encode_path("/foo bar/baz"), "/foo%20bar/baz");
        assert_eq!(uri_encode_path("/b/caf\u{e9}"), "/b/caf%C3%A9");
    }

    #[test]
    fn test_uri_encode_query() {
        assert_eq!(uri_encode_query("foo"), "foo");
        assert_eq!(uri_encode_query("foo bar"), "foo%20bar");
        assert_eq!(uri_encode_query("foo=bar"), "foo%3Dbar");
        assert_eq!(uri_encode_query("a/"), "a%2F");
    }

    #[test]
    fn test_build_canonical_uri() {
        assert_eq!(build_canonical_uri(""), "/");
        assert_eq!(build_canonical_uri("/"), "/");
        assert_eq!(build_canonical_uri("/foo/bar"), "/foo/bar");
    }

    #[test]
    fn test_build_canonical_query_string() {
        assert_eq!(build_canonical_query_string(&query(&[])), "");
        assert_eq!(build_canonical_query_string(&query(&[("a", "1")])), "a=1");
        assert_eq!(
            build_canonical_query_string(&query(&[("prefix", "J"), ("max-keys", "2")])),
            "max-keys=2&prefix=J"
        );
        assert_eq!(
            build_canonical_query_string(&query(&[("location", "")])),
            "location="
        );
    }

    #[test]
    fn test_build_signed_headers() {
        let headers = vec![
            ("Host".to_string(), "example.com".to_string()),
            ("X-Amz-Date".to_string(), "20231215T103045Z".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("If-None-Match".to_string(), "\"abc\"".to_string()),
        ];

        assert_eq!(
            build_signed_headers(&headers),
            "content-type;host;x-amz-date"
        );
    }

    #[test]
    fn test_headers_whitespace_normalization() {
        let headers = vec![
            ("Host".to_string(), "  example.com  ".to_string()),
            ("X-Amz-Meta-Test".to_string(), "value  with   spaces".to_string()),
        ];

        let result = build_canonical_headers(&headers);
        assert!(result.contains("host:example.com\n"));
        assert!(result.contains("x-amz-meta-test:value with spaces\n"));
    }

    #[test]
    fn test_build_canonical_request() {
        let empty = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        let headers = vec![
            ("host".to_string(), "examplebucket.s3.amazonaws.com".to_string()),
            ("x-amz-date".to_string(), "20130524T000000Z".to_string()),
            ("x-amz-content-sha256".to_string(), empty.to_string()),
        ];

        let result = build_canonical_request(
            "GET",
            "/",
            &query(&[("max-keys", "2"), ("prefix", "J")]),
            &headers,
            empty,
        );

        let expected = format!(
            "GET\n/\nmax-keys=2&prefix=J\nhost:examplebucket.s3.amazonaws.com\nx-amz-content-sha256:{empty}\nx-amz-date:20130524T000000Z\n\nhost;x-amz-content-sha256;x-amz-date\n{empty}"
        );
        assert_eq!(result, expected);
    }
}

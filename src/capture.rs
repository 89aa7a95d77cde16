//! Default capture of request metadata before the handler runs
//!
//! Capture is best-effort and transparent: the body of a write request is
//! buffered and handed back unconsumed, headers are never mutated, and any
//! failure degrades to an empty `condition` instead of touching the request.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Request},
    http::{header, HeaderMap, Method},
};
use futures::stream;
use http_body_util::BodyExt;
use tracing::warn;

use crate::record::AuditRecord;

/// Build the default record for an auditable request.
///
/// Returns the request with a restored, unconsumed body alongside the
/// record. Only called for GET/POST/PUT/DELETE/PATCH; the middleware filters
/// other methods upstream.
pub(crate) async fn capture_default(
    request: Request,
    multipart_limit: Option<u64>,
) -> (Request, AuditRecord) {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.to_string())
        .unwrap_or_default();

    let mut record = AuditRecord {
        method: method.as_str().to_owned(),
        path: uri.path().to_owned(),
        remote_addr: strip_port(&peer),
        real_ip: resolve_real_ip(request.headers(), &peer),
        ..AuditRecord::default()
    };

    if method == Method::GET {
        record.condition = uri.query().unwrap_or_default().to_owned();
        return (request, record);
    }

    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();

    let (parts, body) = request.into_parts();
    let body_bytes = match body.collect().await {
        Ok(collected) => Some(collected.to_bytes()),
        Err(e) => {
            warn!(
                method = %method,
                path = %uri.path(),
                error = %e,
                "failed to read request body during audit capture"
            );
            None
        },
    };

    if let Some(bytes) = &body_bytes {
        if content_type.contains("multipart/form-data") {
            match multipart_fields(&content_type, bytes.clone(), multipart_limit).await {
                Ok(json) => record.condition = format!("multipart/form-data {json}"),
                Err(e) => {
                    warn!(
                        path = %uri.path(),
                        error = %e,
                        "failed to parse multipart form during audit capture"
                    );
                },
            }
        } else {
            record.condition = format!("{} {}", content_type, String::from_utf8_lossy(bytes));
        }
    }

    // Hand the handler back an unconsumed body.
    let request = Request::from_parts(parts, Body::from(body_bytes.unwrap_or_default()));
    (request, record)
}

/// JSON encoding of the non-file multipart fields, keyed by field name.
///
/// File parts are deliberately left out of the audit trail; only their
/// absence is observable. `limit` caps the number of body bytes the parser
/// will consume before giving up.
async fn multipart_fields(
    content_type: &str,
    bytes: Bytes,
    limit: Option<u64>,
) -> Result<String, multer::Error> {
    let boundary = multer::parse_boundary(content_type)?;

    let mut constraints = multer::Constraints::new();
    if let Some(limit) = limit {
        constraints = constraints.size_limit(multer::SizeLimit::new().whole_stream(limit));
    }

    let stream = stream::once(async move { Ok::<_, std::convert::Infallible>(bytes) });
    let mut multipart = multer::Multipart::with_constraints(stream, boundary, constraints);

    let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
    while let Some(field) = multipart.next_field().await? {
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        let value = field.text().await?;
        fields.entry(name).or_default().push(value);
    }

    Ok(serde_json::to_string(&fields).unwrap_or_default())
}

/// Strip the port suffix from a peer address, leaving anything that is not
/// a full socket address unchanged.
fn strip_port(addr: &str) -> String {
    match addr.parse::<SocketAddr>() {
        Ok(sock) => sock.ip().to_string(),
        Err(_) => addr.to_owned(),
    }
}

/// Resolve the client address by proxy-header precedence:
/// `x-real-ip`, then `x-forwarded-for`, then the raw peer address.
fn resolve_real_ip(headers: &HeaderMap, peer: &str) -> String {
    for name in ["x-real-ip", "x-forwarded-for"] {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            if !value.is_empty() {
                return value.to_owned();
            }
        }
    }
    peer.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(request: &mut Request, addr: [u8; 4], port: u16) {
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((addr, port))));
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("10.0.0.1:5555"), "10.0.0.1");
        assert_eq!(strip_port("10.0.0.1"), "10.0.0.1");
        assert_eq!(strip_port("[::1]:8080"), "::1");
        assert_eq!(strip_port(""), "");
    }

    #[test]
    fn test_real_ip_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "198.51.100.1".parse().unwrap());
        headers.insert("x-forwarded-for", "198.51.100.2".parse().unwrap());
        assert_eq!(resolve_real_ip(&headers, "10.0.0.1:5555"), "198.51.100.1");

        headers.remove("x-real-ip");
        assert_eq!(resolve_real_ip(&headers, "10.0.0.1:5555"), "198.51.100.2");

        headers.remove("x-forwarded-for");
        assert_eq!(resolve_real_ip(&headers, "10.0.0.1:5555"), "10.0.0.1:5555");
    }

    #[test]
    fn test_real_ip_ignores_empty_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "".parse().unwrap());
        headers.insert("x-forwarded-for", "198.51.100.2".parse().unwrap());
        assert_eq!(resolve_real_ip(&headers, "10.0.0.1:5555"), "198.51.100.2");
    }

    #[tokio::test]
    async fn test_get_capture_reads_query_not_body() {
        let mut request = Request::builder()
            .method(Method::GET)
            .uri("/items?x=1")
            .body(Body::empty())
            .unwrap();
        peer(&mut request, [10, 0, 0, 1], 5555);

        let (_request, record) = capture_default(request, None).await;
        assert_eq!(record.method, "GET");
        assert_eq!(record.path, "/items");
        assert_eq!(record.condition, "x=1");
        assert_eq!(record.remote_addr, "10.0.0.1");
        assert_eq!(record.real_ip, "10.0.0.1:5555");
    }

    #[tokio::test]
    async fn test_get_capture_without_query() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/items")
            .body(Body::empty())
            .unwrap();

        let (_request, record) = capture_default(request, None).await;
        assert_eq!(record.condition, "");
        assert_eq!(record.remote_addr, "");
    }

    #[tokio::test]
    async fn test_post_capture_restores_body() {
        let mut request = Request::builder()
            .method(Method::POST)
            .uri("/items")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"a":1}"#))
            .unwrap();
        peer(&mut request, [10, 0, 0, 1], 5555);

        let (request, record) = capture_default(request, None).await;
        assert_eq!(record.condition, r#"application/json {"a":1}"#);

        let bytes = request.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], br#"{"a":1}"#.as_slice());
    }

    #[tokio::test]
    async fn test_post_capture_without_content_type() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/items")
            .body(Body::from("raw-payload"))
            .unwrap();

        let (_request, record) = capture_default(request, None).await;
        assert_eq!(record.condition, " raw-payload");
    }

    #[tokio::test]
    async fn test_multipart_capture_collects_non_file_fields() {
        let boundary = "audit-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"name\"\r\n\r\n\
             foo\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"name\"\r\n\r\n\
             bar\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"upload\"; filename=\"a.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             file-bytes\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let (_request, record) = capture_default(request, None).await;
        assert_eq!(
            record.condition,
            r#"multipart/form-data {"name":["foo","bar"]}"#
        );
    }

    #[tokio::test]
    async fn test_malformed_multipart_degrades_to_empty_condition() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header("content-type", "multipart/form-data; boundary=b")
            .body(Body::from("not a multipart body"))
            .unwrap();

        let (_request, record) = capture_default(request, None).await;
        assert_eq!(record.condition, "");
    }

    #[tokio::test]
    async fn test_multipart_over_limit_degrades_to_empty_condition() {
        let boundary = "audit-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"name\"\r\n\r\n\
             foo\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let (_request, record) = capture_default(request, Some(8)).await;
        assert_eq!(record.condition, "");
    }
}

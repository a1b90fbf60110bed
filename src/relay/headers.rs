use axum::http::{HeaderMap, HeaderName, HeaderValue, header};

use crate::relay::rewrite::{relativize_urls, strip_cookie_domain};

/// Connection-scoped headers that must not cross the proxy (RFC 9110 §7.6.1).
const HOP_BY_HOP: &[HeaderName] = &[
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name) || name.as_str() == "keep-alive" || name.as_str() == "proxy-connection"
}

/// Headers for the upstream request. `host` is set by the HTTP client from the URL and
/// `accept-encoding` is pinned to identity so HTML bodies arrive rewritable.
pub fn upstream_request_headers(incoming: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(incoming.len());
    for (name, value) in incoming {
        if is_hop_by_hop(name)
            || name == header::HOST
            || name == header::ACCEPT_ENCODING
            || name == header::CONTENT_LENGTH
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    headers
}

/// Whether the upstream body is still compressed despite `accept-encoding: identity`.
pub fn is_encoded(upstream: &HeaderMap) -> bool {
    upstream
        .get_all(header::CONTENT_ENCODING)
        .iter()
        .any(|v| !v.as_bytes().trim_ascii().eq_ignore_ascii_case(b"identity"))
}

/// Headers for the relayed response.
///
/// Length is recomputed by the server after rewriting. A real `content-encoding`
/// is kept since such bodies are passed through untouched. CSP and frame options
/// are dropped because they would block the injected script. Redirects and
/// cookies are re-pointed at the relay.
pub fn relayed_response_headers(upstream: &HeaderMap, target_host: &str) -> HeaderMap {
    let encoded = is_encoded(upstream);
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if is_hop_by_hop(name)
            || name == header::CONTENT_LENGTH
            || (name == header::CONTENT_ENCODING && !encoded)
            || name == header::CONTENT_SECURITY_POLICY
            || name == header::X_FRAME_OPTIONS
        {
            continue;
        }
        let value = if name == header::LOCATION {
            rewrite_value(value, |v| relativize_urls(v, target_host))
        } else if name == header::SET_COOKIE {
            rewrite_value(value, strip_cookie_domain)
        } else {
            value.clone()
        };
        headers.append(name.clone(), value);
    }
    headers
}

/// Apply a textual rewrite, keeping the original value when it is not visible ASCII.
fn rewrite_value(value: &HeaderValue, rewrite: impl Fn(&str) -> String) -> HeaderValue {
    value
        .to_str()
        .ok()
        .and_then(|v| HeaderValue::from_str(&rewrite(v)).ok())
        .unwrap_or_else(|| value.clone())
}

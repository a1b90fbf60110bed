//! Reverse proxy to the target site: forwarding, HTML rewriting, content-type
//! correction and the optional static asset cache.

pub mod cache;
pub mod headers;
pub mod mime;
pub mod rewrite;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use reqwest::Client;

use crate::relay::cache::AssetCache;

/// Marks whether an asset came from the disk cache.
pub const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-familystream-cache");

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid target URL {url}: {reason}")]
    InvalidTarget { url: String, reason: String },
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

/// Forwards requests to the target site and rewrites what comes back.
#[derive(Debug, Clone)]
pub struct Relay {
    client: Client,
    /// Scheme + authority without trailing slash, e.g. `https://www.familystream.com`.
    base_url: String,
    /// Authority as it appears in absolute URLs inside pages (`host[:port]`).
    target_host: String,
    cache: Option<AssetCache>,
}

impl Relay {
    pub fn new(client: Client, target_url: &str, cache: Option<AssetCache>) -> Result<Self, RelayError> {
        let invalid = |reason: String| RelayError::InvalidTarget {
            url: target_url.to_string(),
            reason,
        };
        let parsed = reqwest::Url::parse(target_url).map_err(|e| invalid(e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| invalid("no host".to_string()))?;
        let target_host = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Ok(Relay {
            client,
            base_url: target_url.trim_end_matches('/').to_string(),
            target_host,
            cache,
        })
    }

    /// Relay one request: serve from cache when possible, otherwise forward,
    /// rewrite and (for cacheable assets) store the result.
    pub async fn forward(
        &self,
        method: Method,
        uri: &Uri,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Response, RelayError> {
        let path = uri.path();
        let is_head = method == Method::HEAD;
        let cache = self.cache.as_ref().filter(|_| method == Method::GET);

        if let Some(cache) = cache {
            if let Some(hit) = cache.lookup(path).await {
                tracing::debug!("Cache hit: {}", path);
                return Ok((
                    StatusCode::OK,
                    [
                        (header::CONTENT_TYPE, HeaderValue::from_static(hit.content_type)),
                        (CACHE_STATUS_HEADER, HeaderValue::from_static("hit")),
                    ],
                    Body::from(hit.body),
                )
                    .into_response());
            }
        }

        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        let url = format!("{}{}", self.base_url, path_and_query);
        let upstream = self
            .client
            .request(method, &url)
            .headers(headers::upstream_request_headers(headers))
            .body(body)
            .send()
            .await?;

        let status = upstream.status();
        let encoded = headers::is_encoded(upstream.headers());
        let upstream_type = upstream
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let mut response_headers = headers::relayed_response_headers(upstream.headers(), &self.target_host);
        let content_type = match mime::corrected_content_type(path, upstream_type.as_deref()) {
            Some(corrected) => {
                tracing::debug!(
                    "Correcting content-type of {} from {:?} to {}",
                    path,
                    upstream_type,
                    corrected
                );
                response_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(corrected));
                Some(corrected.to_string())
            }
            None => upstream_type,
        };

        let raw = upstream.bytes().await?;
        let rewritable = !is_head
            && !encoded
            && !raw.is_empty()
            && status_has_body(status)
            && content_type.as_deref().is_some_and(mime::is_html);
        let body = if rewritable {
            match std::str::from_utf8(&raw) {
                Ok(html) => Bytes::from(rewrite::rewrite_html(html, &self.target_host)),
                Err(_) => {
                    tracing::debug!("Not rewriting {}: body is not UTF-8", path);
                    raw
                }
            }
        } else {
            raw
        };

        if let Some(cache) = cache {
            if status == StatusCode::OK && !encoded && cache::cache_key(path).is_some() {
                cache.store(path, &body).await;
                response_headers.insert(CACHE_STATUS_HEADER, HeaderValue::from_static("miss"));
            }
        }

        Ok((status, response_headers, Body::from(body)).into_response())
    }
}

/// 1xx, 204 and 304 responses never carry a body.
fn status_has_body(status: StatusCode) -> bool {
    !(status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

//! Network side of the gateway: the request/response values that flow
//! through the cache router and the client that reaches the GEB origin.

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

use crate::{config::OriginConfig, error::AppError, metrics};

/// Headers that describe a single hop and must not be forwarded or stored
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

/// Request headers that tie a response to one client
const CREDENTIAL_HEADERS: [HeaderName; 2] = [header::AUTHORIZATION, header::COOKIE];

/// Kind of resource a browser is fetching, taken from `Sec-Fetch-Dest`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Document,
    Image,
    Style,
    Script,
    Font,
    Empty,
    Other,
}

impl Destination {
    fn from_header(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("document") => Self::Document,
            Some("image") => Self::Image,
            Some("style") => Self::Style,
            Some("script") => Self::Script,
            Some("font") => Self::Font,
            Some("empty") | None => Self::Empty,
            Some(_) => Self::Other,
        }
    }

    /// Build-time assets served cache-first
    pub fn is_static_asset(self) -> bool {
        matches!(self, Self::Image | Self::Style | Self::Script | Self::Font)
    }
}

/// Key a response is stored under: the path and query of a GET request.
///
/// Responses to credentialed requests are private to the client that made
/// them and carry a fingerprint of its credentials; shared entries have none.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    url: String,
    client: Option<String>,
}

impl CacheKey {
    pub fn new(path_and_query: impl Into<String>) -> Self {
        Self {
            url: path_and_query.into(),
            client: None,
        }
    }

    pub fn private(path_and_query: impl Into<String>, client: impl Into<String>) -> Self {
        Self {
            url: path_and_query.into(),
            client: Some(client.into()),
        }
    }

    /// The URL part of the key
    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn is_private(&self) -> bool {
        self.client.is_some()
    }

    /// The shared key for the same URL
    pub fn shared(&self) -> CacheKey {
        CacheKey::new(self.url.clone())
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.client {
            Some(client) => write!(f, "{} [client {}]", self.url, &client[..client.len().min(12)]),
            None => f.write_str(&self.url),
        }
    }
}

/// A request as seen by the cache router
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    /// Path plus optional query, always starting with `/`
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchRequest {
    pub fn new(method: Method, path_and_query: impl Into<String>) -> Self {
        let mut path_and_query = path_and_query.into();
        if !path_and_query.starts_with('/') {
            path_and_query.insert(0, '/');
        }
        Self {
            method,
            path_and_query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn get(path_and_query: impl Into<String>) -> Self {
        Self::new(Method::GET, path_and_query)
    }

    pub fn with_header(mut self, name: HeaderName, value: &'static str) -> Self {
        self.headers.insert(name, HeaderValue::from_static(value));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Path without the query string
    pub fn path(&self) -> &str {
        self.path_and_query
            .split_once('?')
            .map_or(self.path_and_query.as_str(), |(path, _)| path)
    }

    pub fn destination(&self) -> Destination {
        Destination::from_header(
            self.headers
                .get("sec-fetch-dest")
                .and_then(|v| v.to_str().ok()),
        )
    }

    /// Full-page load (`Sec-Fetch-Mode: navigate`)
    pub fn is_navigation(&self) -> bool {
        self.headers
            .get("sec-fetch-mode")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|mode| mode.eq_ignore_ascii_case("navigate"))
    }

    /// SHA-256 of the credential headers, `None` for an anonymous request
    pub fn client_fingerprint(&self) -> Option<String> {
        let mut hasher = Sha256::new();
        let mut credentialed = false;
        for name in &CREDENTIAL_HEADERS {
            for value in self.headers.get_all(name) {
                hasher.update(name.as_str().as_bytes());
                hasher.update(b":");
                hasher.update(value.as_bytes());
                hasher.update(b"\n");
                credentialed = true;
            }
        }
        credentialed.then(|| hex_encode(&hasher.finalize()))
    }

    pub fn cache_key(&self) -> CacheKey {
        match self.client_fingerprint() {
            Some(client) => CacheKey::private(self.path_and_query.clone(), client),
            None => CacheKey::new(self.path_and_query.clone()),
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// A fully buffered response, either fresh from the origin, read from a
/// cache, or synthesized as an offline fallback
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchedResponse {
    pub fn new(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Mirrors `Response.ok`: status in 200..=299
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Whether `Cache-Control` lists `directive`
    pub fn has_cache_directive(&self, directive: &str) -> bool {
        self.headers
            .get_all(header::CACHE_CONTROL)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .filter_map(|d| d.split('=').next())
            .any(|name| name.trim().eq_ignore_ascii_case(directive))
    }

    /// Meant for one client only: sets a cookie or is marked private
    pub fn is_client_specific(&self) -> bool {
        self.headers.contains_key(header::SET_COOKIE) || self.has_cache_directive("private")
    }

    /// Copy to keep in a cache; cookies set by the origin are never replayed
    pub fn for_storage(&self) -> FetchedResponse {
        let mut stored = self.clone();
        stored.headers.remove(header::SET_COOKIE);
        stored
    }
}

impl IntoResponse for FetchedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Anything that can perform a network fetch on behalf of the router
#[async_trait]
pub trait Origin: Send + Sync {
    /// Fetch `request` from the network.
    ///
    /// An `Err` means the network was unreachable. An HTTP error status is a
    /// successful fetch and comes back as `Ok`.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedResponse, AppError>;
}

/// reqwest-backed client for the GEB origin server
pub struct HttpOrigin {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOrigin {
    pub fn new(config: &OriginConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Origin for HttpOrigin {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedResponse, AppError> {
        let url = format!("{}{}", self.base_url, request.path_and_query);
        let started = Instant::now();

        let result = async {
            let response = self
                .client
                .request(request.method.clone(), &url)
                .headers(strip_hop_by_hop(&request.headers))
                .body(request.body.clone())
                .send()
                .await?;

            let status = response.status();
            let headers = strip_hop_by_hop(response.headers());
            let body = response.bytes().await?;

            Ok::<_, AppError>(FetchedResponse {
                status,
                headers,
                body,
            })
        }
        .await;

        metrics::record_origin_fetch(result.is_ok(), started.elapsed());

        match &result {
            Ok(response) => tracing::debug!(
                method = %request.method,
                url = %url,
                status = response.status.as_u16(),
                "Origin fetch completed"
            ),
            Err(e) => tracing::debug!(
                method = %request.method,
                url = %url,
                error = %e,
                "Origin fetch failed"
            ),
        }

        result
    }
}

fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut out = headers.clone();
    for name in HOP_BY_HOP {
        out.remove(*name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_strips_query() {
        let req = FetchRequest::get("/api/products?page=2");
        assert_eq!(req.path(), "/api/products");
        assert_eq!(req.cache_key().as_str(), "/api/products?page=2");
    }

    #[test]
    fn test_relative_path_is_normalized() {
        let req = FetchRequest::get("manifest.json");
        assert_eq!(req.path_and_query, "/manifest.json");
    }

    #[test]
    fn test_destination_from_sec_fetch_dest() {
        let req = FetchRequest::get("/logo.svg")
            .with_header(HeaderName::from_static("sec-fetch-dest"), "image");
        assert_eq!(req.destination(), Destination::Image);
        assert!(req.destination().is_static_asset());

        let req = FetchRequest::get("/api/x");
        assert_eq!(req.destination(), Destination::Empty);
        assert!(!req.destination().is_static_asset());

        let req = FetchRequest::get("/video.mp4")
            .with_header(HeaderName::from_static("sec-fetch-dest"), "video");
        assert_eq!(req.destination(), Destination::Other);
    }

    #[test]
    fn test_navigation_detection() {
        let req = FetchRequest::get("/dashboard")
            .with_header(HeaderName::from_static("sec-fetch-mode"), "navigate");
        assert!(req.is_navigation());
        assert!(!FetchRequest::get("/dashboard").is_navigation());
    }

    #[test]
    fn test_hop_by_hop_headers_removed() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::HOST, HeaderValue::from_static("geb.local"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let stripped = strip_hop_by_hop(&headers);
        assert!(stripped.get(header::CONNECTION).is_none());
        assert!(stripped.get(header::HOST).is_none());
        assert_eq!(stripped.get(header::ACCEPT).unwrap(), "application/json");
    }

    #[test]
    fn test_credentials_make_the_key_private() {
        let anonymous = FetchRequest::get("/api/customers");
        assert!(anonymous.client_fingerprint().is_none());
        assert!(!anonymous.cache_key().is_private());

        let alice = FetchRequest::get("/api/customers")
            .with_header(header::AUTHORIZATION, "Bearer alice");
        let bob = FetchRequest::get("/api/customers")
            .with_header(header::AUTHORIZATION, "Bearer bob");
        let cookie = FetchRequest::get("/api/customers")
            .with_header(header::COOKIE, "sessionid=alice");

        assert!(alice.cache_key().is_private());
        assert_ne!(alice.cache_key(), bob.cache_key());
        assert_ne!(alice.cache_key(), cookie.cache_key());
        assert_eq!(alice.cache_key(), alice.clone().cache_key());
        assert_eq!(alice.cache_key().as_str(), "/api/customers");
        assert_eq!(alice.cache_key().shared(), anonymous.cache_key());
        assert!(alice.cache_key().to_string().starts_with("/api/customers [client "));
    }

    #[test]
    fn test_cache_control_directives() {
        let mut response = FetchedResponse::new(StatusCode::OK, "application/json", "{}");
        assert!(!response.is_client_specific());

        response.headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("max-age=60, Private"),
        );
        assert!(response.has_cache_directive("private"));
        assert!(response.has_cache_directive("max-age"));
        assert!(!response.has_cache_directive("no-store"));
        assert!(response.is_client_specific());
    }

    #[test]
    fn test_stored_copy_drops_set_cookie() {
        let mut response = FetchedResponse::new(StatusCode::OK, "text/html", "<html/>");
        response
            .headers
            .insert(header::SET_COOKIE, HeaderValue::from_static("sessionid=abc"));
        assert!(response.is_client_specific());

        let stored = response.for_storage();
        assert!(stored.headers.get(header::SET_COOKIE).is_none());
        assert_eq!(stored.content_type(), Some("text/html"));
    }

    #[tokio::test]
    async fn test_fetched_response_into_response() {
        let fetched = FetchedResponse::new(StatusCode::CREATED, "text/plain", "done");
        let response = fetched.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain"
        );
    }
}

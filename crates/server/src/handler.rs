//! Proxy request handler.
//!
//! Every GET request is keyed, looked up in the active cache backend and
//! either served from the cache or forwarded upstream and written back.
//! Cache errors are logged and treated as misses so the upstream still
//! answers when the cache cannot.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use stash_client::Upstream;
use stash_core::{CacheEntry, CacheHandle, cache::cache_key};

use crate::error::ProxyError;

/// Response header reporting whether the cache answered.
pub const X_CACHE: &str = "x-cache";

/// Shared state for the proxy handler.
#[derive(Clone)]
pub struct AppState {
    pub cache: CacheHandle,
    pub upstream: Arc<dyn Upstream>,
    pub secret_params: Arc<[String]>,
}

impl AppState {
    pub fn new(cache: CacheHandle, upstream: Arc<dyn Upstream>, secret_params: Vec<String>) -> Self {
        Self { cache, upstream, secret_params: secret_params.into() }
    }
}

/// Build the proxy router. Every path goes to [`proxy`].
pub fn router(state: AppState) -> Router {
    Router::new().fallback(proxy).with_state(state)
}

/// Serve from the cache or forward upstream.
#[tracing::instrument(skip_all, fields(method = %method, path = %uri.path()))]
pub async fn proxy(State(state): State<AppState>, method: Method, uri: Uri) -> Result<Response, ProxyError> {
    if method != Method::GET {
        return Err(ProxyError::MethodNotAllowed(method.to_string()));
    }

    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
    let key = cache_key(method.as_str(), path_and_query, &state.secret_params);

    match state.cache.lookup(&key).await {
        Ok(Some(entry)) => {
            tracing::debug!(cache = "hit", "serving cached response");
            return Ok(entry_response(&entry, "HIT"));
        }
        Ok(None) => tracing::debug!(cache = "miss", "forwarding upstream"),
        Err(e) => tracing::warn!(error = %e, "cache lookup failed, forwarding upstream"),
    }

    let upstream = state.upstream.forward(method.as_str(), path_and_query).await?;
    let entry = CacheEntry::new(upstream.data, upstream.status);

    if let Err(e) = state.cache.store(&key, entry.clone()).await {
        tracing::warn!(error = %e, "cache write-back failed");
    }

    Ok(entry_response(&entry, "MISS"))
}

/// Render a cache entry as a JSON response.
fn entry_response(entry: &CacheEntry, cache_status: &'static str) -> Response {
    let status = StatusCode::from_u16(entry.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let body = entry.data.as_ref().map_or("null", |d| d.as_str()).to_owned();

    let mut response = (status, body).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(X_CACHE, HeaderValue::from_static(cache_status));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use stash_client::{ClientError, UpstreamResponse};
    use stash_core::cache::FileBackend;
    use stash_core::{CacheBackend, Payload};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const TTL: Duration = Duration::from_secs(1800);

    /// Upstream stub that records every forwarded path.
    #[derive(Default)]
    struct RecordingUpstream {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingUpstream {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Upstream for RecordingUpstream {
        async fn forward(&self, _method: &str, path_and_query: &str) -> Result<UpstreamResponse, ClientError> {
            self.calls.lock().unwrap().push(path_and_query.to_string());
            if self.fail {
                return Err(ClientError::Timeout);
            }
            Ok(UpstreamResponse { status: 200, data: Some(Payload::from_json(r#"{"id":1}"#).unwrap()) })
        }
    }

    struct Harness {
        app: Router,
        cache: CacheHandle,
        upstream: Arc<RecordingUpstream>,
        _dir: TempDir,
    }

    async fn harness(install: bool, fail: bool) -> Harness {
        let dir = TempDir::new().unwrap();
        let cache = CacheHandle::new(TTL);
        if install {
            let backend = FileBackend::open(dir.path().join("cache.json")).await.unwrap();
            cache.install(Arc::new(backend)).unwrap();
        }
        let upstream = Arc::new(RecordingUpstream { fail, ..Default::default() });
        let state = AppState::new(cache.clone(), upstream.clone(), vec!["apiKey".to_string()]);
        Harness { app: router(state), cache, upstream, _dir: dir }
    }

    async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Option<String>, String) {
        let request = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let x_cache = response
            .headers()
            .get(X_CACHE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, x_cache, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let h = harness(true, false).await;

        let (status, x_cache, body) = send(&h.app, Method::GET, "/recipes?query=pasta").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(x_cache.as_deref(), Some("MISS"));
        assert_eq!(body, r#"{"id":1}"#);

        let (status, x_cache, body) = send(&h.app, Method::GET, "/recipes?query=pasta").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(x_cache.as_deref(), Some("HIT"));
        assert_eq!(body, r#"{"id":1}"#);

        assert_eq!(h.upstream.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_credentials_share_cache_entry() {
        let h = harness(true, false).await;

        send(&h.app, Method::GET, "/recipes?query=pasta&apiKey=alice").await;
        let (_, x_cache, _) = send(&h.app, Method::GET, "/recipes?query=pasta&apiKey=bob").await;

        assert_eq!(x_cache.as_deref(), Some("HIT"));
        let backend = h.cache.backend().unwrap();
        assert!(backend.contains("GET /recipes?query=pasta").await.unwrap());
    }

    #[tokio::test]
    async fn test_stale_entry_goes_upstream() {
        let h = harness(true, false).await;
        let backend = h.cache.backend().unwrap();
        let stale = CacheEntry {
            data: Some(Payload::from_json(r#"{"old":true}"#).unwrap()),
            time_stored: stash_core::cache::now_millis() - TTL.as_millis() as i64 - 1,
            status: 200,
        };
        backend.set("GET /recipes?query=pasta", stale).await.unwrap();

        let (_, x_cache, body) = send(&h.app, Method::GET, "/recipes?query=pasta").await;
        assert_eq!(x_cache.as_deref(), Some("MISS"));
        assert_eq!(body, r#"{"id":1}"#);
        assert_eq!(h.upstream.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_forced_miss_before_backend_ready() {
        let h = harness(false, false).await;

        send(&h.app, Method::GET, "/recipes").await;
        let (_, x_cache, _) = send(&h.app, Method::GET, "/recipes").await;

        assert_eq!(x_cache.as_deref(), Some("MISS"));
        assert_eq!(h.upstream.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_upstream_failure_not_cached() {
        let h = harness(true, true).await;

        let (status, _, body) = send(&h.app, Method::GET, "/recipes").await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(body.contains("UPSTREAM_TIMEOUT"));

        let backend = h.cache.backend().unwrap();
        assert!(!backend.contains("GET /recipes").await.unwrap());
    }

    #[tokio::test]
    async fn test_non_get_rejected() {
        let h = harness(true, false).await;

        let (status, _, body) = send(&h.app, Method::POST, "/recipes").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert!(body.contains("METHOD_NOT_ALLOWED"));
        assert!(h.upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_null_data_served_as_json_null() {
        let h = harness(true, false).await;
        let backend = h.cache.backend().unwrap();
        backend.set("GET /broken", CacheEntry::new(None, 500)).await.unwrap();

        let (status, x_cache, body) = send(&h.app, Method::GET, "/broken").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(x_cache.as_deref(), Some("HIT"));
        assert_eq!(body, "null");
    }
}

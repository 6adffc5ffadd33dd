//! HTTP relay and dashboard server.
//!
//! Browsers cannot read the JKM API directly because it sends no CORS
//! headers. This server re-requests the API server-side and forwards the
//! record array, and also serves the aggregated statistics, a server-rendered
//! dashboard, and static files for a client-side dashboard.
//!
//! Routes:
//! - `GET /api/flood-data`  relayed JSON array of PPS records
//! - `GET /api/statistics`  aggregated `Statistics` (`?sort=shelters` etc.)
//! - `GET /dashboard`       server-rendered HTML dashboard
//! - anything else          static files from `proxy.static_dir`

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{Method, StatusCode, header::CONTENT_TYPE},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::analysis;
use crate::ingest::{FetchedRecords, RecordSource};
use crate::logging::{self, Component};
use crate::model::{FetchError, FieldMapping, StateOrder};
use crate::render;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            ProxyError::Fetch(err) => {
                let details = match &err {
                    FetchError::Http(status) => json!({ "status": status }),
                    FetchError::Relay { status, .. } => json!({ "status": status }),
                    _ => Value::Null,
                };
                let body = json!({
                    "error": "Failed to fetch data",
                    "message": err.to_string(),
                    "details": details,
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            ProxyError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": other.to_string() })),
            )
                .into_response(),
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

pub struct AppState {
    pub upstream: Arc<dyn RecordSource>,
    pub fields: FieldMapping,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(upstream: Arc<dyn RecordSource>, fields: FieldMapping, static_dir: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            upstream,
            fields,
            static_dir,
        })
    }
}

/// Runs the blocking upstream fetch off the async worker threads.
///
/// Failures are not logged here; `FallbackSource` has already logged them.
async fn fetch_upstream(state: &Arc<AppState>) -> Result<FetchedRecords, ProxyError> {
    let upstream = Arc::clone(&state.upstream);
    let fetched = tokio::task::spawn_blocking(move || upstream.fetch_records())
        .await
        .map_err(|e| ProxyError::Internal(e.to_string()))?;
    Ok(fetched?)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn flood_data_handler(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ProxyError> {
    logging::info(Component::Proxy, Some("/api/flood-data"), "fetching data from JKM API");
    let fetched = fetch_upstream(&state).await?;

    // Browsers get an array no matter what the upstream sent.
    let records = match fetched.records {
        Value::Array(records) => records,
        _ => Vec::new(),
    };
    logging::info(
        Component::Proxy,
        Some("/api/flood-data"),
        &format!("relayed {} records", records.len()),
    );
    Ok(Json(Value::Array(records)))
}

#[derive(Debug, Deserialize)]
pub struct SortQuery {
    sort: Option<String>,
}

impl SortQuery {
    fn order(&self) -> Result<StateOrder, ProxyError> {
        match &self.sort {
            Some(raw) => raw.parse().map_err(ProxyError::BadRequest),
            None => Ok(StateOrder::FirstSeen),
        }
    }
}

pub async fn statistics_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SortQuery>,
) -> Result<impl IntoResponse, ProxyError> {
    let order = query.order()?;
    let fetched = fetch_upstream(&state).await?;
    let stats = analysis::aggregate(&fetched.records, &state.fields).sorted_by(order);
    Ok(Json(stats))
}

pub async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SortQuery>,
) -> Result<Html<String>, ProxyError> {
    let order = query.order()?;
    let fetched = fetch_upstream(&state).await?;
    let stats = analysis::aggregate(&fetched.records, &state.fields).sorted_by(order);
    let view = render::build_view(&stats, fetched.origin, chrono::Utc::now());
    Ok(Html(render::render_html(&view)))
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let static_files = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/api/flood-data", get(flood_data_handler))
        .route("/api/statistics", get(statistics_handler))
        .route("/dashboard", get(dashboard_handler))
        .fallback_service(static_files)
        .layer(cors)
        .with_state(state)
}

/// Serves until Ctrl+C or SIGTERM.
pub async fn run(listener: TcpListener, state: Arc<AppState>) -> Result<(), ProxyError> {
    let address = listener.local_addr()?;
    logging::info(
        Component::Proxy,
        None,
        &format!("Server running on http://{}", address),
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    logging::info(Component::Proxy, None, "Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            logging::error(Component::Proxy, None, &format!("Ctrl+C handler failed: {}", e));
            std::future::pending::<()>().await;
        }
        logging::info(Component::Proxy, None, "Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                logging::info(Component::Proxy, None, "Received terminate signal, shutting down");
            }
            Err(e) => {
                logging::error(Component::Proxy, None, &format!("SIGTERM handler failed: {}", e));
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FailurePolicy;
    use crate::ingest::{FallbackSource, SampleSource};
    use crate::logging::test_support::CapturedLogs;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    struct DownSource;

    impl RecordSource for DownSource {
        fn component(&self) -> Component {
            Component::Jkm
        }
        fn describe(&self) -> String {
            "down".to_string()
        }
        fn fetch_records(&self) -> Result<FetchedRecords, FetchError> {
            Err(FetchError::Http(503))
        }
    }

    struct EnvelopeSource;

    impl RecordSource for EnvelopeSource {
        fn component(&self) -> Component {
            Component::Relay
        }
        fn describe(&self) -> String {
            "envelope".to_string()
        }
        fn fetch_records(&self) -> Result<FetchedRecords, FetchError> {
            Ok(FetchedRecords {
                records: json!({"data": "not-an-array"}),
                origin: Component::Relay,
            })
        }
    }

    fn app(upstream: Arc<dyn RecordSource>, static_dir: PathBuf) -> Router {
        router(AppState::new(upstream, FieldMapping::default(), static_dir))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_flood_data_relays_record_array() {
        let (status, body) = get_json(app(Arc::new(SampleSource::new()), ".".into()), "/api/flood-data").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 14);
    }

    #[tokio::test]
    async fn test_upstream_failure_returns_error_body() {
        let (status, body) = get_json(app(Arc::new(DownSource), ".".into()), "/api/flood-data").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to fetch data");
        assert_eq!(body["message"], "HTTP error: 503");
        assert_eq!(body["details"]["status"], 503);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_logged_once() {
        let logs = CapturedLogs::default();
        let _guard = tracing::subscriber::set_default(logs.subscriber());

        let upstream = FallbackSource::new(Box::new(DownSource), FailurePolicy::Error);
        // The failing fetch runs on a blocking thread with no default
        // subscriber, so run it here first to count the source's own event.
        assert!(upstream.fetch_records().is_err());
        assert_eq!(logs.count("fetch failed"), 1);

        let (status, body) = get_json(app(Arc::new(upstream), ".".into()), "/api/flood-data").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "HTTP error: 503");
        assert_eq!(logs.count("fetching data from JKM API"), 1);
        assert_eq!(logs.count("fetch failed"), 1);
    }

    #[tokio::test]
    async fn test_non_array_upstream_is_relayed_as_empty_array() {
        let (status, body) = get_json(app(Arc::new(EnvelopeSource), ".".into()), "/api/flood-data").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_statistics_endpoint_aggregates_and_sorts() {
        let (status, body) = get_json(
            app(Arc::new(SampleSource::new()), ".".into()),
            "/api/statistics?sort=shelters",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalShelterCount"], 14);
        assert_eq!(body["totalVictimCount"], 931);
        // KELANTAN and JOHOR both have 3; stable sort keeps KELANTAN first.
        assert_eq!(body["byState"][0]["state"], "KELANTAN");
        assert_eq!(body["byState"][1]["state"], "JOHOR");
    }

    #[tokio::test]
    async fn test_statistics_flags_invalid_upstream_shape() {
        let (status, body) = get_json(app(Arc::new(EnvelopeSource), ".".into()), "/api/statistics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["inputShape"], "invalid");
        assert_eq!(body["totalShelterCount"], 0);
    }

    #[tokio::test]
    async fn test_unknown_sort_is_bad_request() {
        let (status, body) = get_json(
            app(Arc::new(SampleSource::new()), ".".into()),
            "/api/statistics?sort=random",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("random"));
    }

    #[tokio::test]
    async fn test_dashboard_is_rendered_html() {
        let response = app(Arc::new(SampleSource::new()), ".".into())
            .oneshot(Request::builder().uri("/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("PPS Count by State"));
        assert!(html.contains("KELANTAN"));
        assert!(html.contains("sample data"));
    }

    #[tokio::test]
    async fn test_static_files_are_served_from_static_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>client dashboard</h1>").unwrap();

        let response = app(Arc::new(SampleSource::new()), dir.path().to_path_buf())
            .oneshot(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"<h1>client dashboard</h1>");
    }

    #[tokio::test]
    async fn test_cors_header_is_present() {
        let response = app(Arc::new(SampleSource::new()), ".".into())
            .oneshot(
                Request::builder()
                    .uri("/api/flood-data")
                    .header("Origin", "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }
}

/// Integration tests for the full relay pipeline
///
/// Tests verify:
/// 1. The proxy re-requests the JKM endpoint and relays its records
/// 2. A RelaySource reading from the proxy aggregates the same totals
///    as a direct JkmSource
/// 3. Upstream failures surface as the relay's JSON error body, and the
///    sample failure policy replaces them
///
/// The JKM API is replaced by an httpmock server; no network access is needed.

use std::sync::Arc;

use httpmock::prelude::*;
use serde_json::json;

use pps_dashboard::config::{FailurePolicy, SourceConfig};
use pps_dashboard::ingest::{self, FallbackSource, JkmSource, RecordSource, RelaySource};
use pps_dashboard::logging::Component;
use pps_dashboard::model::{FetchError, FieldMapping};
use pps_dashboard::proxy;

const JKM_PATH: &str = "/api/data-dashboard-table-pps.php";

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// A proxy running on its own runtime thread. Dropping the runtime stops it.
struct RunningProxy {
    _runtime: tokio::runtime::Runtime,
    base_url: String,
}

fn start_proxy(upstream: Arc<dyn RecordSource>) -> RunningProxy {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let listener = runtime
        .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    let state = proxy::AppState::new(upstream, FieldMapping::default(), ".".into());
    runtime.spawn(async move {
        let _ = axum::serve(listener, proxy::router(state)).await;
    });

    RunningProxy {
        _runtime: runtime,
        base_url: format!("http://{}", addr),
    }
}

fn jkm_config(server: &MockServer) -> SourceConfig {
    SourceConfig {
        api_url: server.url(JKM_PATH),
        timeout_secs: 5,
        ..SourceConfig::default()
    }
}

fn relay_config(proxy: &RunningProxy) -> SourceConfig {
    SourceConfig {
        relay_url: format!("{}/api/flood-data", proxy.base_url),
        timeout_secs: 5,
        ..SourceConfig::default()
    }
}

fn mock_jkm_records(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(GET).path(JKM_PATH).query_param("seasonmain_id", "208");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "data": [
                    {"negeri": "KELANTAN", "nama_pps": "SK KAMPUNG SIREH", "jumlah_mangsa": "156"},
                    {"negeri": "TERENGGANU", "nama_pps": "SK CHUKAI", "jumlah_mangsa": "98"},
                    {"negeri": "KELANTAN", "nama_pps": "SMK SRI KIAMBANG", "jumlah_mangsa": "233"},
                    {"negeri": "", "nama_pps": "PPS SEMENTARA", "jumlah_mangsa": "x"}
                ]
            }));
    })
}

// ---------------------------------------------------------------------------
// Relay Tests
// ---------------------------------------------------------------------------

#[test]
fn test_relay_and_direct_sources_agree() {
    let jkm = MockServer::start();
    let mock = mock_jkm_records(&jkm);

    let direct = JkmSource::new(&jkm_config(&jkm)).expect("direct client");
    let direct_stats = ingest::load_statistics(&direct, &FieldMapping::default())
        .expect("direct fetch");

    let proxy = start_proxy(Arc::new(JkmSource::new(&jkm_config(&jkm)).unwrap()));
    let relay = RelaySource::new(&relay_config(&proxy)).expect("relay client");
    let relay_stats = ingest::load_statistics(&relay, &FieldMapping::default())
        .expect("relay fetch");

    mock.assert_calls(2);
    assert_eq!(direct_stats.statistics, relay_stats.statistics);
    assert_eq!(relay_stats.origin, Component::Relay);

    let stats = relay_stats.statistics;
    assert_eq!(stats.total_shelter_count, 4);
    assert_eq!(stats.total_victim_count, 487);
    let names: Vec<_> = stats.by_state.iter().map(|s| s.state.as_str()).collect();
    assert_eq!(names, ["KELANTAN", "TERENGGANU", "Unknown"]);
}

#[test]
fn test_upstream_failure_reaches_relay_client_as_relay_error() {
    let jkm = MockServer::start();
    jkm.mock(|when, then| {
        when.method(GET).path(JKM_PATH);
        then.status(503).body("Service Unavailable");
    });

    let proxy = start_proxy(Arc::new(JkmSource::new(&jkm_config(&jkm)).unwrap()));
    let relay = RelaySource::new(&relay_config(&proxy)).unwrap();

    let err = relay.fetch_records().unwrap_err();
    assert_eq!(
        err,
        FetchError::Relay {
            status: 500,
            message: "Failed to fetch data: HTTP error: 503".to_string(),
        }
    );
}

#[test]
fn test_sample_policy_on_proxy_keeps_dashboard_populated() {
    let jkm = MockServer::start();
    jkm.mock(|when, then| {
        when.method(GET).path(JKM_PATH);
        then.status(500);
    });

    let upstream = FallbackSource::new(
        Box::new(JkmSource::new(&jkm_config(&jkm)).unwrap()),
        FailurePolicy::Sample,
    );
    let proxy = start_proxy(Arc::new(upstream));

    let relay = RelaySource::new(&relay_config(&proxy)).unwrap();
    let loaded = ingest::load_statistics(&relay, &FieldMapping::default()).unwrap();
    assert_eq!(loaded.statistics.total_shelter_count, 14);
    assert_eq!(loaded.statistics.total_victim_count, 931);
}

#[test]
fn test_statistics_endpoint_over_http() {
    let jkm = MockServer::start();
    mock_jkm_records(&jkm);

    let proxy = start_proxy(Arc::new(JkmSource::new(&jkm_config(&jkm)).unwrap()));
    let text = reqwest::blocking::get(format!(
        "{}/api/statistics?sort=victims",
        proxy.base_url
    ))
    .expect("statistics request")
    .text()
    .expect("statistics body");
    let body: serde_json::Value = serde_json::from_str(&text).expect("statistics json");

    assert_eq!(body["totalShelterCount"], 4);
    assert_eq!(body["byState"][0]["state"], "KELANTAN");
    assert_eq!(body["byState"][0]["victimTotal"], 389);
    assert_eq!(body["byState"][1]["state"], "TERENGGANU");
}

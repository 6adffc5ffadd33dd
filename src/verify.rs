//! Data Source Verification Module
//!
//! Probes the configured JKM endpoint and relay to determine which of them
//! are reachable and returning usable records. Run with
//! `pps-dashboard verify` before pointing a dashboard at a new season or
//! relay deployment.

use chrono::Utc;
use serde::Serialize;

use crate::analysis;
use crate::config::DashboardConfig;
use crate::ingest::{JkmSource, RecordSource, RelaySource};
use crate::model::{FetchError, FieldMapping, UNKNOWN_STATE};

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum VerificationStatus {
    /// Reachable and returned at least one record.
    Success,
    /// Reachable but returned no records, or only records without a state.
    PartialSuccess,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceVerification {
    pub name: String,
    pub location: String,
    pub status: VerificationStatus,
    pub responsive: bool,
    pub record_count: u64,
    pub states_seen: usize,
    pub records_without_state: u64,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub results: Vec<SourceVerification>,
    pub working: usize,
    pub failed: usize,
}

// ============================================================================
// Verification
// ============================================================================

/// Fetches once from `source` and grades the response.
pub fn verify_source(name: &str, source: &dyn RecordSource, fields: &FieldMapping) -> SourceVerification {
    let mut result = SourceVerification {
        name: name.to_string(),
        location: source.describe(),
        status: VerificationStatus::Failed,
        responsive: false,
        record_count: 0,
        states_seen: 0,
        records_without_state: 0,
        error_message: None,
    };

    match source.fetch_records() {
        Ok(fetched) => {
            result.responsive = true;
            let stats = analysis::aggregate(&fetched.records, fields);
            result.record_count = stats.total_shelter_count;
            result.states_seen = stats
                .by_state
                .iter()
                .filter(|s| s.state != UNKNOWN_STATE)
                .count();
            result.records_without_state = stats
                .find_state(UNKNOWN_STATE)
                .map(|s| s.shelter_count)
                .unwrap_or(0);

            if !stats.is_valid_input() {
                result.error_message = Some("Response was not a JSON array".to_string());
            } else if result.states_seen > 0 {
                result.status = VerificationStatus::Success;
            } else {
                result.status = VerificationStatus::PartialSuccess;
            }
        }
        Err(e) => {
            result.error_message = Some(e.to_string());
        }
    }

    result
}

/// Verifies the direct endpoint and, when `include_relay` is set, the relay.
pub fn run_verification(
    config: &DashboardConfig,
    include_relay: bool,
) -> Result<VerificationReport, FetchError> {
    let mut results = Vec::new();

    let direct = JkmSource::new(&config.source)?;
    results.push(verify_source("JKM API", &direct, &config.fields));

    if include_relay {
        let relay = RelaySource::new(&config.source)?;
        results.push(verify_source("Relay", &relay, &config.fields));
    }

    let failed = results
        .iter()
        .filter(|r| r.status == VerificationStatus::Failed)
        .count();

    Ok(VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        working: results.len() - failed,
        failed,
        results,
    })
}

pub fn print_summary(report: &VerificationReport) {
    println!("\n═══════════════════════════════════════════════════════════");
    println!("📊 DATA SOURCE VERIFICATION");
    println!("═══════════════════════════════════════════════════════════");
    for result in &report.results {
        let status = match result.status {
            VerificationStatus::Success => "✓ OK",
            VerificationStatus::PartialSuccess => "⚠ Partial",
            VerificationStatus::Failed => "✗ FAILED",
        };
        println!("\n{} ({})", result.name, result.location);
        println!("  Status:  {}", status);
        println!(
            "  Records: {} across {} states ({} without state)",
            result.record_count, result.states_seen, result.records_without_state
        );
        if let Some(error) = &result.error_message {
            println!("  Error:   {}", error);
        }
    }
    println!("\n{}/{} sources working", report.working, report.results.len());
    println!("═══════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{FetchedRecords, SampleSource};
    use crate::logging::Component;
    use serde_json::{Value, json};

    struct StaticSource(Result<Value, FetchError>);

    impl RecordSource for StaticSource {
        fn component(&self) -> Component {
            Component::Jkm
        }
        fn describe(&self) -> String {
            "static".to_string()
        }
        fn fetch_records(&self) -> Result<FetchedRecords, FetchError> {
            self.0.clone().map(|records| FetchedRecords { records, origin: Component::Jkm })
        }
    }

    #[test]
    fn test_sample_source_verifies_successfully() {
        let result = verify_source("sample", &SampleSource::new(), &FieldMapping::default());
        assert_eq!(result.status, VerificationStatus::Success);
        assert_eq!(result.record_count, 14);
        assert_eq!(result.states_seen, 7);
        assert_eq!(result.records_without_state, 1);
    }

    #[test]
    fn test_empty_response_is_partial() {
        let result = verify_source("empty", &StaticSource(Ok(json!([]))), &FieldMapping::default());
        assert!(result.responsive);
        assert_eq!(result.status, VerificationStatus::PartialSuccess);
    }

    #[test]
    fn test_stateless_records_are_partial() {
        let source = StaticSource(Ok(json!([{"jumlah_mangsa": "4"}])));
        let result = verify_source("stateless", &source, &FieldMapping::default());
        assert_eq!(result.status, VerificationStatus::PartialSuccess);
        assert_eq!(result.records_without_state, 1);
    }

    #[test]
    fn test_non_array_response_fails() {
        let source = StaticSource(Ok(json!({"data": null})));
        let result = verify_source("object", &source, &FieldMapping::default());
        assert_eq!(result.status, VerificationStatus::Failed);
        assert!(result.responsive);
        assert!(result.error_message.unwrap().contains("JSON array"));
    }

    #[test]
    fn test_fetch_error_fails_with_message() {
        let source = StaticSource(Err(FetchError::Http(500)));
        let result = verify_source("down", &source, &FieldMapping::default());
        assert_eq!(result.status, VerificationStatus::Failed);
        assert!(!result.responsive);
        assert_eq!(result.error_message.as_deref(), Some("HTTP error: 500"));
    }
}

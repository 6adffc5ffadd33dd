//! Live JKM API checks
//!
//! These tests call the real InfoBencana endpoint configured by default and
//! report what it returns. They are ignored by default because the endpoint
//! is outside our control and is often empty between flood seasons.
//!
//! Run with: cargo test --test live_api -- --ignored --nocapture

use pps_dashboard::config::{DashboardConfig, SourceConfig};
use pps_dashboard::ingest::{self, JkmSource};
use pps_dashboard::model::FieldMapping;
use pps_dashboard::verify::{self, VerificationStatus};

#[test]
#[ignore] // Only run manually - makes real API calls
fn test_jkm_api_returns_record_list() {
    let source = JkmSource::new(&SourceConfig::default()).unwrap();
    let loaded = ingest::load_statistics(&source, &FieldMapping::default())
        .expect("JKM API should answer");

    println!("\n🔍 JKM API:");
    println!("  PPS:     {}", loaded.statistics.total_shelter_count);
    println!("  Victims: {}", loaded.statistics.total_victim_count);
    for state in &loaded.statistics.by_state {
        println!("  {:<20} {:>5} {:>8}", state.state, state.shelter_count, state.victim_total);
    }

    assert!(
        loaded.statistics.is_valid_input(),
        "JKM API answered with something other than a record list"
    );
}

#[test]
#[ignore] // Only run manually - makes real API calls
fn test_jkm_api_verification() {
    let report = verify::run_verification(&DashboardConfig::default(), false).unwrap();
    verify::print_summary(&report);

    let direct = &report.results[0];
    assert!(direct.responsive, "JKM API unreachable: {:?}", direct.error_message);
    assert_ne!(direct.status, VerificationStatus::Failed);
}

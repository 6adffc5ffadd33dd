//! JKM (Jabatan Kebajikan Masyarakat) PPS API client.
//!
//! Retrieves the PPS dashboard table from the InfoBencana JKM API. The
//! endpoint answers with a bare JSON array of PPS records, but has also been
//! seen wrapping the array in a `{ "data": [...] }` envelope; both shapes are
//! unwrapped here.
//!
//! Endpoint: https://infobencanajkmv2.jkm.gov.my/api/data-dashboard-table-pps.php

use serde_json::Value;

use crate::config::SourceConfig;
use crate::ingest::{FetchedRecords, RecordSource, build_client};
use crate::logging::{self, Component};
use crate::model::FetchError;

/// Direct client for the JKM PPS table endpoint.
pub struct JkmSource {
    client: reqwest::blocking::Client,
    api_url: String,
    season_id: u32,
    state_id: String,
}

impl JkmSource {
    pub fn new(config: &SourceConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(config)?,
            api_url: config.api_url.clone(),
            season_id: config.season_id,
            state_id: config.state_id.clone(),
        })
    }

    /// Query parameters the endpoint expects. `a` and `b` are always 0 for
    /// the dashboard table; an empty `seasonnegeri_id` selects every state.
    pub fn query_params(&self) -> [(&'static str, String); 4] {
        [
            ("a", "0".to_string()),
            ("b", "0".to_string()),
            ("seasonmain_id", self.season_id.to_string()),
            ("seasonnegeri_id", self.state_id.clone()),
        ]
    }

    /// Fetches the raw response body as JSON, without unwrapping.
    pub fn fetch_raw(&self) -> Result<Value, FetchError> {
        logging::debug(Component::Jkm, Some(&self.describe()), "requesting PPS table");

        let response = self
            .client
            .get(&self.api_url)
            .query(&self.query_params())
            .header("Accept", "application/json")
            .send()?;

        let status = response.status();
        logging::debug(
            Component::Jkm,
            Some(&self.describe()),
            &format!("response status {}", status),
        );
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }

        let body = response.text()?;
        serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

impl RecordSource for JkmSource {
    fn component(&self) -> Component {
        Component::Jkm
    }

    fn describe(&self) -> String {
        format!("{}?seasonmain_id={}", self.api_url, self.season_id)
    }

    fn fetch_records(&self) -> Result<FetchedRecords, FetchError> {
        let records = unwrap_records(self.fetch_raw()?);
        logging::info(
            Component::Jkm,
            Some(&self.describe()),
            &format!("received {} records", records.len()),
        );
        Ok(FetchedRecords {
            records: Value::Array(records),
            origin: Component::Jkm,
        })
    }
}

/// Extracts the record array from a JKM response body.
///
/// A bare array is returned as-is, an object's `data` array is unwrapped,
/// and any other shape yields an empty list.
pub fn unwrap_records(body: Value) -> Vec<Value> {
    match body {
        Value::Array(records) => records,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(records)) => records,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Client for a local relay (typically this crate's own `serve` command)
//! that re-exposes the JKM API at `/api/flood-data`.
//!
//! The relay has already unwrapped the JKM envelope, so its body is passed
//! through untouched. A non-array body reaches the aggregator as-is and is
//! reported there as an invalid input shape.

use serde::Deserialize;
use serde_json::Value;

use crate::config::SourceConfig;
use crate::ingest::{FetchedRecords, RecordSource, build_client};
use crate::logging::{self, Component};
use crate::model::FetchError;

/// Error body the relay sends with a 500.
#[derive(Debug, Deserialize)]
struct RelayErrorBody {
    error: String,
    message: Option<String>,
}

pub struct RelaySource {
    client: reqwest::blocking::Client,
    url: String,
}

impl RelaySource {
    pub fn new(config: &SourceConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(config)?,
            url: config.relay_url.clone(),
        })
    }
}

impl RecordSource for RelaySource {
    fn component(&self) -> Component {
        Component::Relay
    }

    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch_records(&self) -> Result<FetchedRecords, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()?;

        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            let message = match serde_json::from_str::<RelayErrorBody>(&body) {
                Ok(err) => match err.message {
                    Some(detail) => format!("{}: {}", err.error, detail),
                    None => err.error,
                },
                Err(_) => body.trim().chars().take(200).collect(),
            };
            return Err(FetchError::Relay {
                status: status.as_u16(),
                message,
            });
        }

        let records: Value =
            serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))?;
        if let Some(list) = records.as_array() {
            logging::info(
                Component::Relay,
                Some(&self.url),
                &format!("received {} records", list.len()),
            );
        }

        Ok(FetchedRecords {
            records,
            origin: Component::Relay,
        })
    }
}

//! Core data types for the PPS (temporary evacuation centre) dashboard.
//!
//! This module defines the shared domain model imported by all other modules.
//! It contains no I/O, only types and their small accessors.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Field names
// ---------------------------------------------------------------------------

/// JKM field holding the state (negeri) a PPS belongs to.
pub const FIELD_STATE: &str = "negeri";

/// JKM field holding the number of victims sheltered at a PPS.
pub const FIELD_VICTIMS: &str = "jumlah_mangsa";

/// JKM field holding the PPS name. Informational only.
pub const FIELD_SHELTER_NAME: &str = "nama_pps";

/// Grouping key used when a record carries no usable state.
pub const UNKNOWN_STATE: &str = "Unknown";

/// Which JSON keys of a raw record carry the fields the aggregator reads.
///
/// Defaults match the JKM dashboard table endpoint. Tests and alternative
/// feeds can point the aggregator at differently named keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMapping {
    pub state: String,
    pub victims: String,
    pub shelter_name: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            state: FIELD_STATE.to_string(),
            victims: FIELD_VICTIMS.to_string(),
            shelter_name: FIELD_SHELTER_NAME.to_string(),
        }
    }
}

impl FieldMapping {
    pub fn new(state: &str, victims: &str, shelter_name: &str) -> Self {
        Self {
            state: state.to_string(),
            victims: victims.to_string(),
            shelter_name: shelter_name.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate types
// ---------------------------------------------------------------------------

/// Per-state totals. One entry per distinct state observed in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateAggregate {
    pub state: String,
    pub shelter_count: u64,
    pub victim_total: u64,
}

impl StateAggregate {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            shelter_count: 0,
            victim_total: 0,
        }
    }
}

/// Whether the aggregator was handed something it could iterate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputShape {
    /// Input was a JSON array (possibly empty).
    Sequence,
    /// Input was not an array; totals are zero and `by_state` is empty.
    Invalid,
}

/// Dashboard-wide totals plus the per-state breakdown.
///
/// `by_state` is in first-seen order unless the caller re-sorted it with
/// [`Statistics::sorted_by`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_shelter_count: u64,
    pub total_victim_count: u64,
    pub by_state: Vec<StateAggregate>,
    pub input_shape: InputShape,
}

impl Statistics {
    /// Zero-valued statistics for an empty sequence.
    pub fn empty() -> Self {
        Self {
            total_shelter_count: 0,
            total_victim_count: 0,
            by_state: Vec::new(),
            input_shape: InputShape::Sequence,
        }
    }

    /// Zero-valued statistics signalling that the input was not a sequence.
    pub fn invalid() -> Self {
        Self {
            input_shape: InputShape::Invalid,
            ..Self::empty()
        }
    }

    pub fn is_valid_input(&self) -> bool {
        self.input_shape == InputShape::Sequence
    }

    pub fn find_state(&self, state: &str) -> Option<&StateAggregate> {
        self.by_state.iter().find(|s| s.state == state)
    }

    /// Largest per-state shelter count, or 0 when there are no states.
    pub fn max_shelter_count(&self) -> u64 {
        self.by_state.iter().map(|s| s.shelter_count).max().unwrap_or(0)
    }

    /// Returns a copy with `by_state` reordered. Sorts are stable, so ties
    /// keep first-seen order.
    pub fn sorted_by(&self, order: StateOrder) -> Statistics {
        let mut sorted = self.clone();
        match order {
            StateOrder::FirstSeen => {}
            StateOrder::ShelterCountDesc => sorted
                .by_state
                .sort_by(|a, b| b.shelter_count.cmp(&a.shelter_count)),
            StateOrder::VictimTotalDesc => sorted
                .by_state
                .sort_by(|a, b| b.victim_total.cmp(&a.victim_total)),
            StateOrder::StateName => sorted.by_state.sort_by(|a, b| a.state.cmp(&b.state)),
        }
        sorted
    }
}

/// Caller-selected ordering for `Statistics::by_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StateOrder {
    #[default]
    FirstSeen,
    ShelterCountDesc,
    VictimTotalDesc,
    StateName,
}

impl std::str::FromStr for StateOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first-seen" | "first_seen" => Ok(StateOrder::FirstSeen),
            "shelters" | "shelter-count" => Ok(StateOrder::ShelterCountDesc),
            "victims" | "victim-total" => Ok(StateOrder::VictimTotalDesc),
            "state" | "name" => Ok(StateOrder::StateName),
            other => Err(format!(
                "unknown sort order '{}' (expected first-seen, shelters, victims or state)",
                other
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching PPS records from a data source.
///
/// Malformed fields inside records are never errors; they are coerced by
/// `analysis::normalize`. These variants cover transport-level failures only.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    /// Non-2xx HTTP response from the JKM API.
    #[error("HTTP error: {0}")]
    Http(u16),
    /// Connection or TLS failure before a response arrived.
    #[error("Transport error: {0}")]
    Transport(String),
    /// No response within `timeout_secs`.
    #[error("Transport error: request timed out")]
    Timeout,
    /// The response body was not JSON.
    #[error("Parse error: {0}")]
    Parse(String),
    /// The local relay answered with its JSON error body.
    #[error("Relay error {status}: {message}")]
    Relay { status: u16, message: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            FetchError::Http(status.as_u16())
        } else if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

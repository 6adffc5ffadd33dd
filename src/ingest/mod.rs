//! Data sources for PPS records.
//!
//! Every variant of the dashboard reads records through [`RecordSource`]:
//! the JKM API directly, a local relay that re-exposes it, or the bundled
//! sample set. [`FallbackSource`] wraps a remote source and, depending on the
//! configured [`FailurePolicy`], either surfaces its errors or swaps in the
//! sample records.

pub mod jkm;
pub mod relay;
pub mod sample;

use serde_json::Value;

use crate::analysis;
use crate::config::{FailurePolicy, SourceConfig, SourceKind};
use crate::logging::{self, Component};
use crate::model::{FetchError, FieldMapping, Statistics};

pub use jkm::JkmSource;
pub use relay::RelaySource;
pub use sample::SampleSource;

/// Records as returned by a source, tagged with where they actually came
/// from (a fallback may have replaced the primary).
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedRecords {
    pub records: Value,
    pub origin: Component,
}

impl FetchedRecords {
    pub fn is_sample(&self) -> bool {
        self.origin == Component::Sample
    }
}

/// Anything that can produce one batch of raw PPS records.
///
/// Implementations block; async callers go through `spawn_blocking`.
pub trait RecordSource: Send + Sync {
    fn component(&self) -> Component;

    /// Human-readable location of the source, used as the log target.
    fn describe(&self) -> String;

    fn fetch_records(&self) -> Result<FetchedRecords, FetchError>;
}

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

/// Wraps a primary source with the sample set as a safety net.
pub struct FallbackSource {
    primary: Box<dyn RecordSource>,
    fallback: SampleSource,
    policy: FailurePolicy,
}

impl FallbackSource {
    pub fn new(primary: Box<dyn RecordSource>, policy: FailurePolicy) -> Self {
        Self {
            primary,
            fallback: SampleSource::new(),
            policy,
        }
    }
}

impl RecordSource for FallbackSource {
    fn component(&self) -> Component {
        self.primary.component()
    }

    fn describe(&self) -> String {
        self.primary.describe()
    }

    fn fetch_records(&self) -> Result<FetchedRecords, FetchError> {
        match self.primary.fetch_records() {
            Ok(fetched) => Ok(fetched),
            Err(err) => {
                logging::log_fetch_failure(self.primary.component(), &self.primary.describe(), &err);
                match self.policy {
                    FailurePolicy::Error => Err(err),
                    FailurePolicy::Sample => {
                        logging::warn(
                            Component::Sample,
                            None,
                            "serving bundled sample records in place of live data",
                        );
                        self.fallback.fetch_records()
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Builds the source described by `config`, wrapped in the configured
/// failure policy. The sample source never fails and is returned bare.
pub fn from_config(config: &SourceConfig) -> Result<Box<dyn RecordSource>, FetchError> {
    let primary: Box<dyn RecordSource> = match config.kind {
        SourceKind::Direct => Box::new(JkmSource::new(config)?),
        SourceKind::Relay => Box::new(RelaySource::new(config)?),
        SourceKind::Sample => return Ok(Box::new(SampleSource::new())),
    };
    Ok(Box::new(FallbackSource::new(primary, config.on_failure)))
}

/// Shared reqwest client settings for the remote sources.
pub(crate) fn build_client(config: &SourceConfig) -> Result<reqwest::blocking::Client, FetchError> {
    reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(FetchError::from)
}

/// Result of one dashboard load: the statistics and where the records came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedStatistics {
    pub statistics: Statistics,
    pub origin: Component,
}

/// Fetches one batch from `source` and aggregates it.
pub fn load_statistics(
    source: &dyn RecordSource,
    fields: &FieldMapping,
) -> Result<LoadedStatistics, FetchError> {
    let fetched = source.fetch_records()?;
    let statistics = analysis::aggregate(&fetched.records, fields);

    if !statistics.is_valid_input() {
        logging::warn(
            fetched.origin,
            Some(&source.describe()),
            "response was not a JSON array; reporting zero totals",
        );
    }
    logging::log_fetch_summary(
        fetched.origin,
        statistics.total_shelter_count,
        statistics.by_state.len(),
        statistics.total_victim_count,
    );

    Ok(LoadedStatistics {
        statistics,
        origin: fetched.origin,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

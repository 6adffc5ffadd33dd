//! Groups a flat list of raw PPS records into per-state statistics.
//!
//! This is the single place where shelter and victim totals are computed.
//! Every data source (direct, relayed, sample) feeds the same function.

use std::collections::HashMap;

use serde_json::Value;

use crate::analysis::normalize::NormalizedRecord;
use crate::model::{FieldMapping, InputShape, StateAggregate, Statistics};

/// Aggregates a JSON value that should be an array of records.
///
/// A non-array input yields `Statistics::invalid()` rather than an error:
/// zero totals, no states, `input_shape == InputShape::Invalid`.
pub fn aggregate(input: &Value, fields: &FieldMapping) -> Statistics {
    match input.as_array() {
        Some(records) => aggregate_records(records, fields),
        None => Statistics::invalid(),
    }
}

/// Aggregates an already-unwrapped record slice in a single pass.
///
/// `by_state` is emitted in the order each state was first seen. The input
/// is only borrowed, and repeated calls on the same slice are identical.
pub fn aggregate_records(records: &[Value], fields: &FieldMapping) -> Statistics {
    let mut by_state: Vec<StateAggregate> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut total_shelter_count: u64 = 0;
    let mut total_victim_count: u64 = 0;

    for record in records {
        let normalized = NormalizedRecord::from_value(record, fields);

        let slot = match index.get(&normalized.state) {
            Some(&i) => i,
            None => {
                by_state.push(StateAggregate::new(normalized.state.clone()));
                index.insert(normalized.state, by_state.len() - 1);
                by_state.len() - 1
            }
        };

        let group = &mut by_state[slot];
        group.shelter_count += 1;
        group.victim_total = group.victim_total.saturating_add(normalized.victims);

        total_shelter_count += 1;
        total_victim_count = total_victim_count.saturating_add(normalized.victims);
    }

    Statistics {
        total_shelter_count,
        total_victim_count,
        by_state,
        input_shape: InputShape::Sequence,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

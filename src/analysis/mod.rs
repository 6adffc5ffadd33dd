//! Data organization utilities for the PPS dashboard.
//!
//! This module turns the raw JSON records served by the JKM API into the
//! per-state totals the dashboard displays. It performs no I/O.
//!
//! Submodules:
//! - `normalize`: coerces one record's loosely typed fields.
//! - `groupings`: groups a flat record list into per-state aggregates.

pub mod groupings;
pub mod normalize;

pub use groupings::{aggregate, aggregate_records};

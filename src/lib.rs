//! PPS dashboard: fetches temporary evacuation centre (PPS) records from the
//! JKM InfoBencana API, aggregates them by state, and renders a dashboard.
//!
//! Modules, leaves first:
//! - `model`     shared types and errors
//! - `analysis`  record normalization and per-state aggregation
//! - `ingest`    data sources (direct, relay, bundled sample)
//! - `render`    statistics to view description to HTML/SVG
//! - `proxy`     HTTP relay and dashboard server
//! - `config`, `logging`, `verify`

pub mod analysis;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod proxy;
pub mod render;
pub mod verify;

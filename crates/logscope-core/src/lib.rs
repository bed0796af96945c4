//! # Logscope
//!
//! Log-file analytics for web service monitoring.
//!
//! Logscope derives operational metrics (request counts, error rates,
//! latency percentiles, per-endpoint breakdowns, traffic histograms)
//! directly from an append-only JSONL log file, with no database.
//!
//! ## Architecture
//!
//! - **Engine**: normalization, windowing, and aggregation over the log file
//! - **Store**: the on-disk append-only JSONL file
//! - **API**: REST API exposing the engine's metric views
//!
//! ## Quick Start
//!
//! ```bash
//! # Start the API server
//! LOGSCOPE_LOG__PATH=./data/monitoring.jsonl logscope serve
//!
//! # One-shot health check
//! LOGSCOPE_LOG__PATH=./data/monitoring.jsonl logscope health
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::engine::{Engine, LogStore, Window};
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
}

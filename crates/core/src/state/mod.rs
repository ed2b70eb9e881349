//! # State
//!
//! Persistence of finished runs.

pub mod run_report;

pub use run_report::RunReport;

//! # Pipeline Stages
//!
//! One module per stage, each exposing a `run` entry point that takes its
//! input and output locations explicitly and returns a serializable report.
//!
//! - `generate`: synthetic interactions to CSV
//! - `ingest`: CSV to the raw (nullable) table
//! - `clean`: raw table to the typed, null-free table
//! - `transform`: cleaned table to the echoed table plus three derived views

pub mod clean;
pub mod generate;
pub mod ingest;
pub mod transform;

pub use clean::CleanReport;
pub use generate::GenerateReport;
pub use ingest::IngestReport;
pub use transform::TransformReport;

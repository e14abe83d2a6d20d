//! # Tally
//!
//! The pipeline application around `tally-core`: configuration, the four
//! stages, the run driver and the CLI.
//!
//! ```text
//! generate ──> data.csv ──> ingest ──> raw table ──> clean ──> cleaned table
//!                                                                   │
//!                                                               transform
//!                                                                   ▼
//!          echo table + interactions_count + interactions_per_day + top_5_users
//! ```

pub mod cli;
pub mod config;
pub mod digest;
pub mod pipeline;
pub mod stages;

pub use config::{GenerateConfig, PipelineConfig, TableLocation};
pub use pipeline::{RunLock, Stage, StageReport};

//! # Pipeline Configuration
//!
//! Every store location and table name the pipeline touches is explicit
//! configuration, threaded into each stage; nothing falls back to a
//! process-wide default once a `PipelineConfig` has been built.
//!
//! Each section names the OUTPUT of one stage. A stage's input is the output
//! of its predecessor: ingest reads `generate.file_path`, clean reads
//! `ingest`, transform reads `clean`.
//!
//! ```toml
//! [generate]
//! num_rows = 1000
//! file_path = "data.csv"
//! seed = 42
//!
//! [ingest]
//! db_path = "rep_db.db"
//! table_name = "rep_interaction"
//!
//! [clean]
//! db_path = "raw_db.db"
//! table_name = "raw_interaction"
//!
//! [transform]
//! db_path = "pub_db.db"
//! table_name = "pub_interaction"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tally_core::TallyError;
use tally_core::primitives::DEFAULT_NUM_ROWS;

// =============================================================================
// SECTIONS
// =============================================================================

/// A table inside a SQLite database file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableLocation {
    /// Path of the database file.
    pub db_path: PathBuf,
    /// Name of the table inside it.
    pub table_name: String,
}

impl TableLocation {
    /// Create a new location.
    #[must_use]
    pub fn new(db_path: impl Into<PathBuf>, table_name: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            table_name: table_name.into(),
        }
    }

    /// Replace the path and/or table name where given.
    #[must_use]
    pub fn with_overrides(&self, db_path: Option<PathBuf>, table_name: Option<String>) -> Self {
        Self {
            db_path: db_path.unwrap_or_else(|| self.db_path.clone()),
            table_name: table_name.unwrap_or_else(|| self.table_name.clone()),
        }
    }
}

impl std::fmt::Display for TableLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.db_path.display(), self.table_name)
    }
}

/// Settings of the synthetic data generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerateConfig {
    /// Number of interactions to generate.
    pub num_rows: usize,
    /// CSV file the generated data is written to.
    pub file_path: PathBuf,
    /// Fixed RNG seed; entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            num_rows: DEFAULT_NUM_ROWS,
            file_path: PathBuf::from("data.csv"),
            seed: None,
        }
    }
}

// =============================================================================
// PIPELINE CONFIG
// =============================================================================

/// Full pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub generate: GenerateConfig,
    /// Output of the ingest stage (raw table).
    pub ingest: TableLocation,
    /// Output of the clean stage (cleaned table).
    pub clean: TableLocation,
    /// Echo output of the transform stage; the derived views land in the
    /// same database under fixed names.
    pub transform: TableLocation,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            generate: GenerateConfig::default(),
            ingest: TableLocation::new("rep_db.db", "rep_interaction"),
            clean: TableLocation::new("raw_db.db", "raw_interaction"),
            transform: TableLocation::new("pub_db.db", "pub_interaction"),
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from TOML text. Missing sections take defaults.
    pub fn from_toml(text: &str) -> Result<Self, TallyError> {
        let config: Self =
            toml::from_str(text).map_err(|e| TallyError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, TallyError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            TallyError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    /// Load `path` if given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, TallyError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Check that every section names something.
    pub fn validate(&self) -> Result<(), TallyError> {
        if self.generate.file_path.as_os_str().is_empty() {
            return Err(TallyError::ConfigError(
                "generate.file_path is empty".to_string(),
            ));
        }

        for (section, location) in [
            ("ingest", &self.ingest),
            ("clean", &self.clean),
            ("transform", &self.transform),
        ] {
            if location.db_path.as_os_str().is_empty() {
                return Err(TallyError::ConfigError(format!(
                    "{}.db_path is empty",
                    section
                )));
            }
            if location.table_name.trim().is_empty() {
                return Err(TallyError::ConfigError(format!(
                    "{}.table_name is empty",
                    section
                )));
            }
        }

        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

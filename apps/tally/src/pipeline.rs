//! # Pipeline Runner
//!
//! Runs the stages in order (generate, ingest, clean, transform), starting
//! from any of them. Stages communicate only through their stores: each
//! stage reads what its predecessor wrote, as named by `PipelineConfig`.
//!
//! A run holds an exclusive lock file next to the transform output so two
//! runs cannot interleave their full-replace writes.

use crate::config::PipelineConfig;
use crate::stages::{self, CleanReport, GenerateReport, IngestReport, TransformReport};
use serde::Serialize;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tally_core::TallyError;

// =============================================================================
// STAGE
// =============================================================================

/// A pipeline stage, in execution order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Generate,
    Ingest,
    Clean,
    Transform,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 4] = [Stage::Generate, Stage::Ingest, Stage::Clean, Stage::Transform];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Generate => "generate",
            Stage::Ingest => "ingest",
            Stage::Clean => "clean",
            Stage::Transform => "transform",
        }
    }

    /// The stage whose output this one reads.
    #[must_use]
    pub fn predecessor(&self) -> Option<Stage> {
        match self {
            Stage::Generate => None,
            Stage::Ingest => Some(Stage::Generate),
            Stage::Clean => Some(Stage::Ingest),
            Stage::Transform => Some(Stage::Clean),
        }
    }

    /// This stage and every later one.
    pub fn from_here(self) -> impl Iterator<Item = Stage> {
        Stage::ALL.into_iter().filter(move |s| *s >= self)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// STAGE REPORT
// =============================================================================

/// What one stage did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "lowercase")]
pub enum StageReport {
    Generate(GenerateReport),
    Ingest(IngestReport),
    Clean(CleanReport),
    Transform(TransformReport),
}

impl StageReport {
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            StageReport::Generate(_) => Stage::Generate,
            StageReport::Ingest(_) => Stage::Ingest,
            StageReport::Clean(_) => Stage::Clean,
            StageReport::Transform(_) => Stage::Transform,
        }
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageReport::Generate(r) => write!(f, "generate: {} rows -> {}", r.rows, r.file_path),
            StageReport::Ingest(r) => write!(f, "ingest: {} rows -> {}", r.rows, r.table),
            StageReport::Clean(r) => write!(
                f,
                "clean: {} kept, {} dropped -> {}",
                r.kept, r.dropped, r.table
            ),
            StageReport::Transform(r) => write!(
                f,
                "transform: {} rows, {} days, {} top users -> {}",
                r.echoed, r.daily_totals, r.top_users, r.table
            ),
        }
    }
}

// =============================================================================
// RUN LOCK
// =============================================================================

/// Exclusive lock file held for the duration of a run.
///
/// Created with `create_new`, so a second run fails while the first holds
/// it. Removed on drop, including when a stage fails. A lock left behind by
/// a process that no longer exists is replaced.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    _file: File,
}

impl RunLock {
    /// Acquire the lock at `path`, recording the current process id.
    ///
    /// # Errors
    /// - `RunInProgress` if the lock file exists and its recorded process is
    ///   alive, or its contents cannot be read as a process id
    /// - `IoError` if it cannot be created or a stale lock cannot be removed
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, TallyError> {
        let path = path.into();

        match Self::create(&path) {
            Err(TallyError::RunInProgress(holder)) => {
                let Some(pid) = read_pid(&path).filter(|pid| !process_exists(*pid)) else {
                    return Err(TallyError::RunInProgress(holder));
                };

                tracing::warn!(lock = %path.display(), pid, "Replacing stale run lock");
                match std::fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => {
                        return Err(TallyError::IoError(format!(
                            "Cannot remove stale lock '{}': {}",
                            path.display(),
                            e
                        )));
                    }
                }
                Self::create(&path)
            }
            other => other,
        }
    }

    fn create(path: &Path) -> Result<Self, TallyError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => TallyError::RunInProgress(path.display().to_string()),
                _ => TallyError::IoError(format!(
                    "Cannot create lock '{}': {}",
                    path.display(),
                    e
                )),
            })?;

        // Written before the guard exists: on failure the file must go too.
        if let Err(e) = writeln!(file, "{}", std::process::id()) {
            let _ = std::fs::remove_file(path);
            return Err(TallyError::IoError(format!(
                "Cannot write lock '{}': {}",
                path.display(),
                e
            )));
        }

        tracing::debug!(lock = %path.display(), "Acquired run lock");
        Ok(Self {
            path: path.to_path_buf(),
            _file: file,
        })
    }

    /// Lock path used for runs writing to `db_path`.
    #[must_use]
    pub fn path_for(db_path: &Path) -> PathBuf {
        let mut path = db_path.as_os_str().to_owned();
        path.push(".lock");
        PathBuf::from(path)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(lock = %self.path.display(), error = %e, "Failed to remove run lock");
        }
    }
}

/// Process id recorded in a lock file, if it holds one.
fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path)
        .ok()?
        .trim()
        .parse()
        .ok()
        .filter(|pid| *pid != 0)
}

#[cfg(unix)]
fn process_exists(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: signal 0 only checks that the process exists and may be signalled.
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

// Without a liveness check a recorded holder is assumed alive.
#[cfg(not(unix))]
fn process_exists(_pid: u32) -> bool {
    true
}

// =============================================================================
// RUN
// =============================================================================

/// Run one stage against `config`.
pub fn run_stage(config: &PipelineConfig, stage: Stage) -> Result<StageReport, TallyError> {
    let _span = tracing::info_span!("stage", name = stage.name()).entered();

    match stage {
        Stage::Generate => stages::generate::run(&config.generate).map(StageReport::Generate),
        Stage::Ingest => stages::ingest::run(&config.generate.file_path, &config.ingest)
            .map(StageReport::Ingest),
        Stage::Clean => stages::clean::run(&config.ingest, &config.clean).map(StageReport::Clean),
        Stage::Transform => {
            stages::transform::run(&config.clean, &config.transform).map(StageReport::Transform)
        }
    }
}

/// Run the pipeline from `from` through transform.
///
/// Stops at the first failing stage; stages before it keep their output.
pub fn run(config: &PipelineConfig, from: Stage) -> Result<Vec<StageReport>, TallyError> {
    config.validate()?;
    let _lock = RunLock::acquire(RunLock::path_for(&config.transform.db_path))?;

    tracing::info!(from = %from, "Starting pipeline run");

    let mut reports = Vec::with_capacity(Stage::ALL.len());
    for stage in from.from_here() {
        tracing::debug!(stage = %stage, after = ?stage.predecessor(), "Running stage");
        let report = run_stage(config, stage).map_err(|e| {
            tracing::error!(stage = %stage, error = %e, "Stage failed");
            e
        })?;
        reports.push(report);
    }

    tracing::info!(stages = reports.len(), "Pipeline run complete");
    Ok(reports)
}

// =============================================================================
// TESTS
// =============================================================================

//! Durable per-stage completion logs.
//!
//! Each checkpointed stage owns one append-only file next to the source. At
//! startup the file is created with its header, or read fully into an
//! in-memory map keyed by identity name; that map alone answers "already
//! done?" for the rest of the run.

pub mod codec;
pub mod log;

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::domain::Record;
use crate::error::{ListerError, Result};
use crate::observability::metrics;
use crate::pipeline::policy::{Stage, StagePlan};
pub use codec::Projection;

#[derive(Debug)]
struct StageLog {
    path: PathBuf,
    entries: HashMap<String, Projection>,
}

#[derive(Debug, Default)]
pub struct CheckpointStore {
    logs: BTreeMap<Stage, StageLog>,
}

/// Progress of one checkpointed stage, as reported by `status`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageStatus {
    pub stage: Stage,
    pub path: PathBuf,
    pub exists: bool,
    pub completed: usize,
}

impl CheckpointStore {
    /// Opens (creating when missing) the checkpoint file of every requested
    /// checkpointed stage.
    pub fn open(plan: &StagePlan) -> Result<Self> {
        let mut logs = BTreeMap::new();
        for (stage, path) in plan.checkpoints() {
            let created = log::ensure_with_header(path, &codec::header(stage))
                .map_err(|e| checkpoint_error(path, e))?;
            let entries = if created {
                HashMap::new()
            } else {
                load_entries(path)?
            };
            metrics::checkpoint::entries_loaded(stage.as_str(), entries.len());
            info!(
                stage = %stage,
                path = %path.display(),
                created,
                completed = entries.len(),
                "Checkpoint opened"
            );
            logs.insert(
                stage,
                StageLog {
                    path: path.to_path_buf(),
                    entries,
                },
            );
        }
        Ok(Self { logs })
    }

    /// Loads whatever checkpoint files already exist, creating none.
    pub fn load_existing(plan: &StagePlan) -> Result<Self> {
        let mut logs = BTreeMap::new();
        for (stage, path) in plan.checkpoints() {
            let entries = if path.exists() {
                load_entries(path)?
            } else {
                HashMap::new()
            };
            logs.insert(
                stage,
                StageLog {
                    path: path.to_path_buf(),
                    entries,
                },
            );
        }
        Ok(Self { logs })
    }

    /// Reads checkpoint progress without creating anything.
    pub fn status(plan: &StagePlan) -> Result<Vec<StageStatus>> {
        plan.checkpoints()
            .map(|(stage, path)| {
                let exists = path.exists();
                let completed = if exists { load_entries(path)?.len() } else { 0 };
                Ok(StageStatus {
                    stage,
                    path: path.to_path_buf(),
                    exists,
                    completed,
                })
            })
            .collect()
    }

    /// Always false for stages without a checkpoint file.
    pub fn has_completed(&self, stage: Stage, name: &str) -> bool {
        self.logs
            .get(&stage)
            .map(|log| log.entries.contains_key(name))
            .unwrap_or(false)
    }

    pub fn projection(&self, stage: Stage, name: &str) -> Option<&Projection> {
        self.logs.get(&stage)?.entries.get(name)
    }

    /// Appends the record to the stage's file and marks it done in memory.
    /// A no-op for stages without a checkpoint file.
    pub fn record_completion(&mut self, stage: Stage, record: &Record) -> Result<()> {
        let Some(log) = self.logs.get_mut(&stage) else {
            return Ok(());
        };
        let line = codec::encode(record);
        if let Err(e) = log::append_line(&log.path, &line) {
            metrics::checkpoint::write_error(stage.as_str());
            return Err(checkpoint_error(&log.path, e));
        }
        metrics::checkpoint::write_success(stage.as_str());
        debug!(stage = %stage, name = %record.name, "Checkpoint entry written");
        log.entries
            .insert(record.name.clone(), Projection::of(record));
        Ok(())
    }

    /// Drops `name` from the in-memory set only; the file is untouched.
    pub fn forget(&mut self, stage: Stage, name: &str) -> bool {
        self.logs
            .get_mut(&stage)
            .map(|log| log.entries.remove(name).is_some())
            .unwrap_or(false)
    }

    pub fn completed_count(&self, stage: Stage) -> Option<usize> {
        self.logs.get(&stage).map(|log| log.entries.len())
    }
}

fn load_entries(path: &Path) -> Result<HashMap<String, Projection>> {
    let lines = log::read_entries(path).map_err(|e| checkpoint_error(path, e))?;
    Ok(lines
        .iter()
        .filter_map(|line| codec::parse_projection(line))
        .map(|projection| (projection.name.clone(), projection))
        .collect())
}

fn checkpoint_error(path: &Path, source: std::io::Error) -> ListerError {
    ListerError::Checkpoint {
        path: path.display().to_string(),
        source,
    }
}

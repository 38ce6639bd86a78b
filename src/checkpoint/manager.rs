use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::checkpoint::format::{Checkpoint, CheckpointFormat};
use crate::error::CheckpointError;
use crate::registry::Checkpointables;

const FILE_PREFIX: &str = "checkpoint_";
const BEST_STEM: &str = "checkpoint_best";

/// Configuration for the checkpoint manager.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CheckpointManagerConfig {
    pub checkpoint_dir: PathBuf,
    /// Number of most recent per-iteration checkpoints kept on disk.
    pub keep_recent: usize,
    pub format: CheckpointFormat,
}

impl Default for CheckpointManagerConfig {
    fn default() -> Self {
        CheckpointManagerConfig {
            checkpoint_dir: PathBuf::from("checkpoints"),
            keep_recent: 10,
            format: CheckpointFormat::Json,
        }
    }
}

/// Best snapshot observed so far.
#[derive(Debug, Clone)]
pub struct BestCheckpoint {
    pub metric: f64,
    pub checkpoint: Checkpoint,
}

/// Serializes checkpointables every step, keeps the best snapshot by a
/// "higher is better" metric, and prunes all but the most recent files.
///
/// Flip the sign of the metric when lower is better (e.g. pass `-val_loss`).
pub struct CheckpointManager {
    config: CheckpointManagerConfig,
    best: Option<BestCheckpoint>,
    recent_iterations: VecDeque<u64>,
}

impl CheckpointManager {
    pub fn new(config: CheckpointManagerConfig) -> Result<Self, CheckpointError> {
        fs::create_dir_all(&config.checkpoint_dir)?;
        Ok(CheckpointManager {
            config,
            best: None,
            recent_iterations: VecDeque::new(),
        })
    }

    pub fn config(&self) -> &CheckpointManagerConfig {
        &self.config
    }

    /// Path of the per-iteration checkpoint file.
    pub fn checkpoint_path(&self, iteration: u64) -> PathBuf {
        self.config.checkpoint_dir.join(format!(
            "{FILE_PREFIX}{iteration}.{}",
            self.config.format.extension()
        ))
    }

    /// Path of the best checkpoint file.
    pub fn best_path(&self) -> PathBuf {
        self.config
            .checkpoint_dir
            .join(format!("{BEST_STEM}.{}", self.config.format.extension()))
    }

    pub fn best(&self) -> Option<&BestCheckpoint> {
        self.best.as_ref()
    }

    pub fn best_metric(&self) -> Option<f64> {
        self.best.as_ref().map(|b| b.metric)
    }

    /// Iterations whose files are currently retained, oldest first.
    pub fn recent_iterations(&self) -> impl Iterator<Item = u64> + '_ {
        self.recent_iterations.iter().copied()
    }

    /// Serialize every checkpointable for `iteration`, update the best checkpoint
    /// when `metric` beats it, and evict the oldest file beyond `keep_recent`.
    /// Returns the path of the per-iteration file.
    pub fn step(
        &mut self,
        checkpointables: &Checkpointables<'_>,
        iteration: u64,
        metric: Option<f64>,
    ) -> Result<PathBuf, CheckpointError> {
        let mut entries = BTreeMap::new();
        for (name, item) in checkpointables.iter() {
            entries.insert(name.to_string(), item.state_dict()?);
        }
        let checkpoint = Checkpoint {
            iteration: Some(iteration),
            metric,
            entries,
        };

        let path = self.checkpoint_path(iteration);
        checkpoint.write(&path, self.config.format)?;
        debug!(iteration, path = %path.display(), "checkpoint saved");

        // A repeated iteration overwrote its file; keep one queue slot for it.
        self.recent_iterations.retain(|&it| it != iteration);
        self.recent_iterations.push_back(iteration);

        match metric {
            Some(metric) if metric.is_nan() => {
                warn!(iteration, "NaN metric is never taken as the best");
            }
            Some(metric) if self.best_metric().map_or(true, |best| metric > best) => {
                checkpoint.write(&self.best_path(), self.config.format)?;
                info!(iteration, metric, "new best checkpoint");
                self.best = Some(BestCheckpoint { metric, checkpoint });
            }
            _ => {}
        }

        while self.recent_iterations.len() > self.config.keep_recent {
            self.remove_earliest_checkpoint()?;
        }

        Ok(path)
    }

    /// Remove the earliest retained per-iteration checkpoint from disk.
    fn remove_earliest_checkpoint(&mut self) -> Result<(), CheckpointError> {
        let Some(earliest) = self.recent_iterations.pop_front() else {
            return Ok(());
        };
        let path = self.checkpoint_path(earliest);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(iteration = earliest, "evicted checkpoint");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "checkpoint to evict was already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Decode a checkpoint file without loading it into anything.
    pub fn read_checkpoint(&self, path: &Path) -> Result<Checkpoint, CheckpointError> {
        Checkpoint::read(path)
    }

    /// Restore every registered checkpointable whose name appears in the file.
    /// Registered objects missing from the file are left untouched. Returns the
    /// stored iteration, or `None` when the file carries none.
    pub fn load(
        &self,
        checkpointables: &mut Checkpointables<'_>,
        path: &Path,
    ) -> Result<Option<u64>, CheckpointError> {
        load_into(checkpointables, path)
    }

    /// Load the checkpoint with the highest iteration found in the directory.
    pub fn load_latest(
        &self,
        checkpointables: &mut Checkpointables<'_>,
    ) -> Result<Option<u64>, CheckpointError> {
        let latest = self
            .list_checkpoints()?
            .pop()
            .ok_or_else(|| CheckpointError::NoCheckpoints(self.config.checkpoint_dir.clone()))?;
        self.load(checkpointables, &latest.1)
    }

    /// List per-iteration checkpoints of this manager's format, sorted by iteration
    /// (ascending). The best checkpoint and temporary files are skipped.
    pub fn list_checkpoints(&self) -> Result<Vec<(u64, PathBuf)>, CheckpointError> {
        list_checkpoints(&self.config.checkpoint_dir, Some(self.config.format))
    }
}

/// Load a checkpoint file into `checkpointables`. See [`CheckpointManager::load`].
pub fn load_into(
    checkpointables: &mut Checkpointables<'_>,
    path: &Path,
) -> Result<Option<u64>, CheckpointError> {
    info!(path = %path.display(), "loading checkpoint");
    let checkpoint = Checkpoint::read(path)?;

    let mut loaded: Vec<String> = Vec::new();
    for (name, state) in checkpoint.entries {
        match checkpointables.get_mut(&name) {
            Some(item) => {
                info!(name = %name, "loading state");
                item.load_state_dict(state)?;
                loaded.push(name);
            }
            None => info!(name = %name, "entry is not a registered checkpointable"),
        }
    }

    let not_loaded: Vec<&str> = checkpointables
        .names()
        .filter(|n| !loaded.iter().any(|l| l == n))
        .collect();
    if !not_loaded.is_empty() {
        info!(?not_loaded, "checkpointables not found in file");
    }

    Ok(checkpoint.iteration)
}

/// List per-iteration checkpoint files in `dir`, sorted by iteration. When `format`
/// is `None` every recognized extension is accepted.
pub fn list_checkpoints(
    dir: &Path,
    format: Option<CheckpointFormat>,
) -> Result<Vec<(u64, PathBuf)>, CheckpointError> {
    if !dir.is_dir() {
        return Err(CheckpointError::DirNotFound(dir.to_path_buf()));
    }
    let mut results = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Ok(file_format) = CheckpointFormat::from_path(&path) else {
            continue;
        };
        if format.is_some_and(|f| f != file_format) {
            continue;
        }
        let iteration = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_prefix(FILE_PREFIX))
            .and_then(|s| s.parse::<u64>().ok());
        if let Some(iteration) = iteration {
            results.push((iteration, path));
        }
    }
    results.sort_by_key(|(it, _)| *it);
    Ok(results)
}

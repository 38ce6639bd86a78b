use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::checkpoint::state::StateDict;
use crate::error::{BoxError, CheckpointError};

/// On-disk encoding of a checkpoint file, selected by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointFormat {
    #[default]
    Json,
    Bincode,
}

impl CheckpointFormat {
    pub fn extension(self) -> &'static str {
        match self {
            CheckpointFormat::Json => "json",
            CheckpointFormat::Bincode => "bin",
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, CheckpointError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(CheckpointFormat::Json),
            Some("bin") => Ok(CheckpointFormat::Bincode),
            _ => Err(CheckpointError::UnknownFormat(path.to_path_buf())),
        }
    }

    pub fn encode(self, checkpoint: &Checkpoint) -> Result<Vec<u8>, CheckpointError> {
        match self {
            CheckpointFormat::Json => {
                serde_json::to_vec_pretty(checkpoint).map_err(|e| CheckpointError::Encode(e.into()))
            }
            CheckpointFormat::Bincode => {
                bincode::serialize(checkpoint).map_err(|e| CheckpointError::Encode(e))
            }
        }
    }

    pub fn decode(self, bytes: &[u8], path: &Path) -> Result<Checkpoint, CheckpointError> {
        let decoded: Result<Checkpoint, BoxError> = match self {
            CheckpointFormat::Json => serde_json::from_slice(bytes).map_err(Into::into),
            CheckpointFormat::Bincode => bincode::deserialize(bytes).map_err(|e| e as BoxError),
        };
        decoded.map_err(|source| CheckpointError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Contents of one checkpoint file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Training iteration the snapshot was taken at.
    #[serde(default)]
    pub iteration: Option<u64>,
    /// Metric observed at that iteration, if one was supplied.
    #[serde(default, with = "crate::checkpoint::float::option")]
    pub metric: Option<f64>,
    /// State dict per checkpointable name.
    pub entries: BTreeMap<String, StateDict>,
}

impl Checkpoint {
    /// Read and decode a checkpoint, choosing the format from the file extension.
    pub fn read(path: &Path) -> Result<Self, CheckpointError> {
        let format = CheckpointFormat::from_path(path)?;
        let bytes = fs::read(path).map_err(|e| CheckpointError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        format.decode(&bytes, path)
    }

    /// Encode and write atomically: the bytes land in a sibling `.tmp` file that is
    /// then renamed over `path`.
    pub fn write(&self, path: &Path, format: CheckpointFormat) -> Result<(), CheckpointError> {
        let bytes = format.encode(self)?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

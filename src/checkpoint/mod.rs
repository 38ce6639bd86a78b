//! Checkpoint persistence: state dicts, file formats, and the retention-aware manager.

mod float;
mod format;
mod manager;
mod module;
mod state;

pub use format::{Checkpoint, CheckpointFormat};
pub use manager::{
    list_checkpoints, load_into, BestCheckpoint, CheckpointManager, CheckpointManagerConfig,
};
pub use module::ModuleCheckpoint;
pub use state::{Checkpointable, StateDict, StateValue, TensorState};

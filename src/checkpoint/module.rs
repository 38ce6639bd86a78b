use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkBytesRecorder, Recorder};
use burn::tensor::backend::Backend;

use crate::checkpoint::state::{Checkpointable, StateDict};
use crate::error::CheckpointError;

const RECORD_KEY: &str = "record";

/// Checkpointable adapter for a burn [`Module`].
///
/// The module record is serialized with burn's named MessagePack recorder at full
/// precision and stored as opaque bytes under the `record` key.
#[derive(Debug)]
pub struct ModuleCheckpoint<B: Backend, M: Module<B>> {
    module: M,
    device: B::Device,
}

impl<B: Backend, M: Module<B>> ModuleCheckpoint<B, M> {
    pub fn new(module: M, device: B::Device) -> Self {
        ModuleCheckpoint { module, device }
    }

    pub fn module(&self) -> &M {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut M {
        &mut self.module
    }

    pub fn into_inner(self) -> M {
        self.module
    }
}

impl<B: Backend, M: Module<B>> Checkpointable for ModuleCheckpoint<B, M> {
    fn state_dict(&self) -> Result<StateDict, CheckpointError> {
        let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::default();
        let bytes = Recorder::<B>::record(&recorder, self.module.clone().into_record(), ())
            .map_err(|e| CheckpointError::ModuleRecord(e.to_string()))?;
        Ok(StateDict::new().with(RECORD_KEY, bytes))
    }

    fn load_state_dict(&mut self, state: StateDict) -> Result<(), CheckpointError> {
        let bytes = state.bytes(RECORD_KEY)?.to_vec();
        let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::default();
        let record: M::Record = Recorder::<B>::load(&recorder, bytes, &self.device)
            .map_err(|e| CheckpointError::ModuleRecord(e.to_string()))?;
        self.module = self.module.clone().load_record(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::nn::{Linear, LinearConfig};

    type TestBackend = NdArray<f32>;

    fn weights(linear: &Linear<TestBackend>) -> Vec<f32> {
        linear.weight.val().into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_module_state_roundtrip() {
        let device = Default::default();
        let source = ModuleCheckpoint::<TestBackend, _>::new(
            LinearConfig::new(4, 3).init::<TestBackend>(&device),
            device,
        );
        let expected = weights(source.module());
        let state = source.state_dict().unwrap();
        assert!(!state.bytes(RECORD_KEY).unwrap().is_empty());

        let mut target = ModuleCheckpoint::<TestBackend, _>::new(
            LinearConfig::new(4, 3).init::<TestBackend>(&device),
            device,
        );
        assert_ne!(expected, weights(target.module()));

        target.load_state_dict(state).unwrap();
        assert_eq!(expected, weights(target.module()));
    }

    #[test]
    fn test_module_through_manager() {
        use crate::checkpoint::{CheckpointFormat, CheckpointManager, CheckpointManagerConfig};
        use crate::registry::Checkpointables;

        let dir = tempfile::tempdir().unwrap();
        let mut manager = CheckpointManager::new(CheckpointManagerConfig {
            checkpoint_dir: dir.path().to_path_buf(),
            keep_recent: 2,
            format: CheckpointFormat::Bincode,
        })
        .unwrap();

        let device = Default::default();
        let mut source = ModuleCheckpoint::<TestBackend, _>::new(
            LinearConfig::new(3, 2).init::<TestBackend>(&device),
            device,
        );
        let expected = weights(source.module());
        let path = {
            let registry = Checkpointables::new().with("model", &mut source);
            manager.step(&registry, 8, Some(0.9)).unwrap()
        };

        let mut target = ModuleCheckpoint::<TestBackend, _>::new(
            LinearConfig::new(3, 2).init::<TestBackend>(&device),
            device,
        );
        let iteration = {
            let mut registry = Checkpointables::new().with("model", &mut target);
            manager.load(&mut registry, &path).unwrap()
        };
        assert_eq!(iteration, Some(8));
        assert_eq!(expected, weights(target.module()));
    }

    #[test]
    fn test_load_without_record_fails() {
        let device = Default::default();
        let mut target = ModuleCheckpoint::<TestBackend, _>::new(
            LinearConfig::new(2, 2).init::<TestBackend>(&device),
            device,
        );
        let err = target.load_state_dict(StateDict::new()).unwrap_err();
        assert!(matches!(err, CheckpointError::StateDict(_)));
    }
}

use std::sync::Arc;

use burn::data::dataloader::DataLoader;

/// A re-iterable source of validation batches.
pub trait BatchSource {
    type Batch;

    /// Iterate the batches from the start.
    fn batches(&self) -> Box<dyn Iterator<Item = Self::Batch> + '_>;

    /// Number of batches a full pass yields, when known.
    fn len_hint(&self) -> Option<usize> {
        None
    }
}

impl<T: Clone> BatchSource for Vec<T> {
    type Batch = T;

    fn batches(&self) -> Box<dyn Iterator<Item = T> + '_> {
        Box::new(self.iter().cloned())
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl<S: BatchSource + ?Sized> BatchSource for &S {
    type Batch = S::Batch;

    fn batches(&self) -> Box<dyn Iterator<Item = S::Batch> + '_> {
        (**self).batches()
    }

    fn len_hint(&self) -> Option<usize> {
        (**self).len_hint()
    }
}

/// Adapts a closure producing a fresh iterator into a [`BatchSource`].
pub struct FnSource<F> {
    make: F,
}

impl<F> FnSource<F> {
    pub fn new(make: F) -> Self {
        FnSource { make }
    }
}

impl<F, I> BatchSource for FnSource<F>
where
    F: Fn() -> I,
    I: Iterator + 'static,
{
    type Batch = I::Item;

    fn batches(&self) -> Box<dyn Iterator<Item = I::Item> + '_> {
        Box::new((self.make)())
    }
}

/// A burn data loader yields its batches directly. The loader only knows its item
/// count, so no batch count is reported; see [`LoaderSource`] for that.
impl<O: 'static> BatchSource for Arc<dyn DataLoader<O>> {
    type Batch = O;

    fn batches(&self) -> Box<dyn Iterator<Item = O> + '_> {
        Box::new(self.iter())
    }
}

/// A burn data loader together with the batch size it was built with, so a full
/// pass has a known number of batches.
pub struct LoaderSource<O> {
    loader: Arc<dyn DataLoader<O>>,
    batch_size: usize,
}

impl<O> LoaderSource<O> {
    pub fn new(loader: Arc<dyn DataLoader<O>>, batch_size: usize) -> Self {
        LoaderSource {
            loader,
            batch_size: batch_size.max(1),
        }
    }

    pub fn loader(&self) -> &Arc<dyn DataLoader<O>> {
        &self.loader
    }
}

impl<O: 'static> BatchSource for LoaderSource<O> {
    type Batch = O;

    fn batches(&self) -> Box<dyn Iterator<Item = O> + '_> {
        Box::new(self.loader.iter())
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.loader.num_items().div_ceil(self.batch_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::data::dataloader::batcher::Batcher;
    use burn::data::dataloader::DataLoaderBuilder;
    use burn::data::dataset::InMemDataset;
    use burn::tensor::{Tensor, TensorData};

    use crate::error::BoxError;
    use crate::evaluation::{
        Evaluable, Evaluator, EvaluatorConfig, Forward, MetricTracker, Metrics, Mode,
    };
    use crate::registry::ModelRegistry;

    type TestBackend = NdArray<f32>;

    /// Stacks scalar samples into a 1-d tensor.
    #[derive(Clone)]
    struct StackBatcher {
        device: <TestBackend as burn::tensor::backend::Backend>::Device,
    }

    impl Batcher<f32, Tensor<TestBackend, 1>> for StackBatcher {
        fn batch(&self, items: Vec<f32>) -> Tensor<TestBackend, 1> {
            let len = items.len();
            Tensor::from_data(TensorData::new(items, [len]), &self.device)
        }
    }

    fn tensor_loader(
        items: Vec<f32>,
        batch_size: usize,
    ) -> Arc<dyn DataLoader<Tensor<TestBackend, 1>>> {
        DataLoaderBuilder::new(StackBatcher {
            device: Default::default(),
        })
        .batch_size(batch_size)
        .build(InMemDataset::new(items))
    }

    #[test]
    fn test_burn_loader_source() {
        let loader = tensor_loader(vec![1.0, 2.0, 3.0, 4.0, 5.0], 2);
        let sizes: Vec<usize> = loader.batches().map(|t| t.dims()[0]).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        // Re-iterable: a second pass sees every item again.
        let total: f32 = loader.batches().map(|t| t.sum().into_scalar()).sum();
        assert_eq!(total, 15.0);
        assert_eq!(loader.len_hint(), None);
    }

    #[test]
    fn test_loader_source_reports_batch_count() {
        let source = LoaderSource::new(tensor_loader(vec![0.5; 7], 3), 3);
        assert_eq!(source.len_hint(), Some(3));
        assert_eq!(source.batches().count(), 3);
        assert_eq!(source.loader().num_items(), 7);
    }

    /// Accumulates the mean of every value it is fed.
    struct MeanRecorder {
        mode: Mode,
        tracker: MetricTracker,
    }

    impl Evaluable for MeanRecorder {
        fn mode(&self) -> Mode {
            self.mode
        }

        fn set_mode(&mut self, mode: Mode) {
            self.mode = mode;
        }

        fn metrics(&mut self) -> Option<Metrics> {
            Some(self.tracker.snapshot(true))
        }
    }

    impl Forward<Tensor<TestBackend, 1>> for MeanRecorder {
        fn forward(&mut self, batch: &Tensor<TestBackend, 1>) -> Result<(), BoxError> {
            let values = batch.to_data().to_vec::<f32>().map_err(|e| format!("{e:?}"))?;
            for value in values {
                self.tracker.record("mean", value as f64);
            }
            Ok(())
        }
    }

    #[test]
    fn test_evaluator_runs_over_burn_loader() {
        let mut recorder = MeanRecorder {
            mode: Mode::Train,
            tracker: MetricTracker::new(),
        };
        let mut models: ModelRegistry<'_, MeanRecorder> =
            ModelRegistry::new().with("model", &mut recorder);
        let source = LoaderSource::new(tensor_loader(vec![1.0, 2.0, 3.0, 6.0], 3), 3);
        let evaluator = Evaluator::new(source, EvaluatorConfig::default());

        let metrics = evaluator.evaluate(&mut models, None).unwrap();
        assert!((metrics["model"]["mean"] - 3.0).abs() < 1e-9);

        // A limit of one batch only sees the first three items.
        let metrics = evaluator.evaluate(&mut models, Some(1)).unwrap();
        assert!((metrics["model"]["mean"] - 2.0).abs() < 1e-9);
        assert_eq!(models.get("model").unwrap().mode(), Mode::Train);
    }

    #[test]
    fn test_vec_source_is_reiterable() {
        let source = vec![1, 2, 3];
        assert_eq!(source.batches().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(source.batches().count(), 3);
        assert_eq!(source.len_hint(), Some(3));
    }

    #[test]
    fn test_fn_source() {
        let source = FnSource::new(|| (0..4).map(|i| i * 10));
        assert_eq!(source.batches().collect::<Vec<_>>(), vec![0, 10, 20, 30]);
        assert_eq!(source.len_hint(), None);
    }
}

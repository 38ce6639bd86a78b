use std::collections::BTreeMap;

use crate::error::BoxError;

/// Metrics reported by one model, keyed by metric name.
pub type Metrics = BTreeMap<String, f64>;

/// Metrics for every model that reports any, keyed by model name.
pub type EvalMetrics = BTreeMap<String, Metrics>;

/// Whether a model runs with training-time behavior (dropout, batch statistics,
/// exploration) or deterministic inference behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Train,
    Eval,
}

/// A model the evaluator can switch between modes and query for metrics.
pub trait Evaluable {
    fn mode(&self) -> Mode;

    fn set_mode(&mut self, mode: Mode);

    /// Metrics accumulated since the last call. Models that record none keep the
    /// default and are left out of the evaluation result.
    fn metrics(&mut self) -> Option<Metrics> {
        None
    }
}

/// Inference step used by the evaluator's default per-batch iteration.
pub trait Forward<B>: Evaluable {
    fn forward(&mut self, batch: &B) -> Result<(), BoxError>;
}

impl<T: Evaluable + ?Sized> Evaluable for Box<T> {
    fn mode(&self) -> Mode {
        (**self).mode()
    }

    fn set_mode(&mut self, mode: Mode) {
        (**self).set_mode(mode)
    }

    fn metrics(&mut self) -> Option<Metrics> {
        (**self).metrics()
    }
}

impl<B, T: Forward<B> + ?Sized> Forward<B> for Box<T> {
    fn forward(&mut self, batch: &B) -> Result<(), BoxError> {
        (**self).forward(batch)
    }
}

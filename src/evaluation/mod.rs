//! Multi-model evaluation: mode switching, the per-batch driver, and metric helpers.

pub mod evaluator;
pub mod metrics;
pub mod model;
pub mod source;

pub use evaluator::{Evaluator, EvaluatorConfig};
pub use metrics::{Average, MetricTracker};
pub use model::{EvalMetrics, Evaluable, Forward, Metrics, Mode};
pub use source::{BatchSource, FnSource, LoaderSource};

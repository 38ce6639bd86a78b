use tracing::{debug, info};

use crate::error::EvalError;
use crate::evaluation::model::{EvalMetrics, Evaluable, Forward, Mode};
use crate::evaluation::source::BatchSource;
use crate::registry::ModelRegistry;

/// Evaluator configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Batches per evaluation; `None` runs a full pass over the source.
    pub num_batches: Option<usize>,
    /// Log progress every this many batches.
    pub log_interval: usize,
    /// Model the default iteration forwards each batch through.
    pub primary_model: String,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        EvaluatorConfig {
            num_batches: None,
            log_interval: 100,
            primary_model: "model".to_string(),
        }
    }
}

/// Runs inference passes over a validation source for a registry of models and
/// gathers the metrics each model reports.
pub struct Evaluator<S: BatchSource> {
    source: S,
    config: EvaluatorConfig,
}

impl<S: BatchSource> Evaluator<S> {
    pub fn new(source: S, config: EvaluatorConfig) -> Self {
        Evaluator { source, config }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Evaluate with the default iteration: each batch is forwarded through the
    /// primary model only. `num_batches` overrides the configured limit.
    pub fn evaluate<M>(
        &self,
        models: &mut ModelRegistry<'_, M>,
        num_batches: Option<usize>,
    ) -> Result<EvalMetrics, EvalError>
    where
        M: Forward<S::Batch> + ?Sized,
    {
        let primary = self.config.primary_model.as_str();
        self.evaluate_with(models, num_batches, |models, batch| {
            let model = models
                .get_mut(primary)
                .ok_or_else(|| EvalError::MissingModel(primary.to_string()))?;
            model.forward(&batch).map_err(|source| EvalError::Forward {
                model: primary.to_string(),
                source,
            })
        })
    }

    /// Evaluate with a caller-supplied iteration, for evaluations where several
    /// models interact on each batch.
    ///
    /// Every model is switched to [`Mode::Eval`] for the pass and returned to the
    /// mode it had before the call, also when `step` fails or panics.
    pub fn evaluate_with<'m, M, F>(
        &self,
        models: &mut ModelRegistry<'m, M>,
        num_batches: Option<usize>,
        mut step: F,
    ) -> Result<EvalMetrics, EvalError>
    where
        M: Evaluable + ?Sized,
        F: FnMut(&mut ModelRegistry<'m, M>, S::Batch) -> Result<(), EvalError>,
    {
        let limit = num_batches.or(self.config.num_batches);

        let mut guard = ModeGuard::enter(models);
        let batches = self.run_batches(&mut *guard.models, limit, &mut step)?;

        let mut metrics = EvalMetrics::new();
        for (name, model) in guard.models.iter_mut() {
            if let Some(model_metrics) = model.metrics() {
                metrics.insert(name.to_string(), model_metrics);
            }
        }
        drop(guard);

        info!(batches, reporting = metrics.len(), "evaluation finished");
        Ok(metrics)
    }

    fn run_batches<'m, M, F>(
        &self,
        models: &mut ModelRegistry<'m, M>,
        limit: Option<usize>,
        step: &mut F,
    ) -> Result<usize, EvalError>
    where
        M: Evaluable + ?Sized,
        F: FnMut(&mut ModelRegistry<'m, M>, S::Batch) -> Result<(), EvalError>,
    {
        let total = match (limit, self.source.len_hint()) {
            (Some(l), Some(n)) => Some(l.min(n)),
            (l, n) => l.or(n),
        };
        let log_interval = self.config.log_interval.max(1);

        let mut batches = 0usize;
        for batch in self.source.batches().take(limit.unwrap_or(usize::MAX)) {
            step(&mut *models, batch)?;
            batches += 1;
            if batches % log_interval == 0 {
                debug!(batches, total = ?total, "validation");
            }
        }
        Ok(batches)
    }
}

/// Puts every model in [`Mode::Eval`] and returns each to its prior mode on drop,
/// so unwinding out of a step restores modes too.
struct ModeGuard<'r, 'm, M: Evaluable + ?Sized> {
    models: &'r mut ModelRegistry<'m, M>,
    prior: Vec<Mode>,
}

impl<'r, 'm, M: Evaluable + ?Sized> ModeGuard<'r, 'm, M> {
    fn enter(models: &'r mut ModelRegistry<'m, M>) -> Self {
        let prior = models.iter().map(|(_, model)| model.mode()).collect();
        for (_, model) in models.iter_mut() {
            model.set_mode(Mode::Eval);
        }
        ModeGuard { models, prior }
    }
}

impl<M: Evaluable + ?Sized> Drop for ModeGuard<'_, '_, M> {
    fn drop(&mut self) {
        for ((_, model), mode) in self.models.iter_mut().zip(self.prior.iter().copied()) {
            model.set_mode(mode);
        }
    }
}

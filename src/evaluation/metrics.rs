use std::collections::BTreeMap;

use crate::evaluation::model::Metrics;

/// Running mean of every value recorded since the last reset.
#[derive(Debug, Clone, Default)]
pub struct Average {
    total: f64,
    count: usize,
}

impl Average {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, value: f64) {
        self.total += value;
        self.count += 1;
    }

    /// Mean of the recorded values, 0.0 when nothing was recorded.
    pub fn value(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.total / self.count as f64
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn reset(&mut self) {
        self.total = 0.0;
        self.count = 0;
    }
}

/// A set of named [`Average`]s. Models embed one, record into it during forward
/// passes and hand out a snapshot from [`Evaluable::metrics`].
///
/// [`Evaluable::metrics`]: crate::evaluation::Evaluable::metrics
#[derive(Debug, Clone, Default)]
pub struct MetricTracker {
    averages: BTreeMap<String, Average>,
}

impl MetricTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: &str, value: f64) {
        self.averages
            .entry(name.to_string())
            .or_default()
            .record(value);
    }

    pub fn is_empty(&self) -> bool {
        self.averages.values().all(|a| a.count() == 0)
    }

    /// Current mean of every tracked metric; clears the averages when `reset`.
    pub fn snapshot(&mut self, reset: bool) -> Metrics {
        let metrics = self
            .averages
            .iter()
            .map(|(name, avg)| (name.clone(), avg.value()))
            .collect();
        if reset {
            self.averages.values_mut().for_each(Average::reset);
        }
        metrics
    }
}

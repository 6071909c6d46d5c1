//! Module aggregation
//!
//! This module turns standardized metrics into one score per athlete per module:
//! - Precision/Pressure: attempts are averaged per (athlete, task), standardized
//!   per task, combined per task, then summed with the task weights
//! - Rally: each attempt is standardized per task on its own and the athlete's
//!   attempt scores are averaged
//!
//! Skipped tasks contribute nothing; task weights are not renormalized.

use crate::standardizer::{standardize_by_group, Dispersion};
use crate::types::{
    AthleteScore, HittingAttempt, ModuleScores, RallyAttempt, StandardizedRallyAttempt,
    StandardizedTask, TaskAggregate, TestModule,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Diagonal-cross task label as written on the test sheet
pub const TASK_CROSS: &str = "斜线";
/// Straight (down-the-line) task label
pub const TASK_LINE: &str = "直线";
/// Short-diagonal task label
pub const TASK_SHORT_CROSS: &str = "小斜线";

/// Weight applied to any task label not present in the table
pub const DEFAULT_TASK_WEIGHT: f64 = 0.3;

fn default_task_weight() -> f64 {
    DEFAULT_TASK_WEIGHT
}

/// Outcome of a task weight lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaskWeightLookup {
    Known(f64),
    /// Label not in the table; the default weight applies
    Fallback(f64),
}

impl TaskWeightLookup {
    pub fn weight(&self) -> f64 {
        match self {
            TaskWeightLookup::Known(w) | TaskWeightLookup::Fallback(w) => *w,
        }
    }
}

/// Task label -> weight table with an explicit fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskWeights {
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    #[serde(default = "default_task_weight")]
    pub default_weight: f64,
}

impl Default for TaskWeights {
    fn default() -> Self {
        Self::canonical()
    }
}

impl TaskWeights {
    /// Cross 0.4, line 0.3, short cross 0.3 (sheet labels and English aliases)
    pub fn canonical() -> Self {
        let weights = [
            (TASK_CROSS, 0.4),
            (TASK_LINE, 0.3),
            (TASK_SHORT_CROSS, 0.3),
            ("cross", 0.4),
            ("line", 0.3),
            ("short_cross", 0.3),
        ]
        .into_iter()
        .map(|(label, w)| (label.to_string(), w))
        .collect();

        Self {
            weights,
            default_weight: DEFAULT_TASK_WEIGHT,
        }
    }

    pub fn lookup(&self, task_label: &str) -> TaskWeightLookup {
        match self.weights.get(task_label.trim()) {
            Some(w) => TaskWeightLookup::Known(*w),
            None => TaskWeightLookup::Fallback(self.default_weight),
        }
    }

}

/// Metric weights inside a precision/pressure task
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HittingMetricWeights {
    pub inbound_rate: f64,
    pub high_quality_rate: f64,
}

impl Default for HittingMetricWeights {
    fn default() -> Self {
        Self {
            inbound_rate: 0.3,
            high_quality_rate: 0.7,
        }
    }
}

impl HittingMetricWeights {
    pub fn combine(&self, z_inbound: f64, z_high_quality: f64) -> f64 {
        self.inbound_rate * z_inbound + self.high_quality_rate * z_high_quality
    }
}

/// Metric weights of a rally attempt; errors always count against the athlete
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RallyMetricWeights {
    pub shot_volume: f64,
    pub error_count: f64,
    pub high_quality_rate: f64,
    pub consecutive_high_quality: f64,
}

impl Default for RallyMetricWeights {
    fn default() -> Self {
        Self {
            shot_volume: 0.15,
            error_count: 0.15,
            high_quality_rate: 0.30,
            consecutive_high_quality: 0.40,
        }
    }
}

impl RallyMetricWeights {
    pub fn combine(&self, z_volume: f64, z_errors: f64, z_high_quality: f64, z_consecutive: f64) -> f64 {
        self.shot_volume * z_volume - self.error_count * z_errors
            + self.high_quality_rate * z_high_quality
            + self.consecutive_high_quality * z_consecutive
    }
}

/// Scored precision or pressure module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HittingModuleResult {
    pub tasks: Vec<StandardizedTask>,
    pub scores: ModuleScores,
    /// Task labels that fell back to the default weight
    pub fallback_tasks: Vec<String>,
    pub degenerate_groups: usize,
}

/// Scored rally module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RallyModuleResult {
    pub attempts: Vec<StandardizedRallyAttempt>,
    pub scores: ModuleScores,
    pub degenerate_groups: usize,
}

/// Average attempts into one aggregate per (athlete, task), first-appearance order.
///
/// Missing metric values are skipped; a pair with no values keeps `None`.
pub fn aggregate_tasks(attempts: &[HittingAttempt]) -> Vec<TaskAggregate> {
    struct Acc {
        attempts: usize,
        inbound: (f64, usize),
        high_quality: (f64, usize),
    }

    fn mean((sum, n): (f64, usize)) -> Option<f64> {
        (n > 0).then(|| sum / n as f64)
    }

    let mut order: Vec<(&str, &str)> = Vec::new();
    let mut accs: HashMap<(&str, &str), Acc> = HashMap::new();

    for attempt in attempts {
        let key = (attempt.athlete_id.as_str(), attempt.task_label.as_str());
        let acc = accs.entry(key).or_insert_with(|| {
            order.push(key);
            Acc {
                attempts: 0,
                inbound: (0.0, 0),
                high_quality: (0.0, 0),
            }
        });
        acc.attempts += 1;
        if let Some(v) = attempt.inbound_rate {
            acc.inbound.0 += v;
            acc.inbound.1 += 1;
        }
        if let Some(v) = attempt.high_quality_rate {
            acc.high_quality.0 += v;
            acc.high_quality.1 += 1;
        }
    }

    order
        .into_iter()
        .map(|key| {
            let acc = &accs[&key];
            TaskAggregate {
                athlete_id: key.0.to_string(),
                task_label: key.1.to_string(),
                attempts: acc.attempts,
                inbound_rate: mean(acc.inbound),
                high_quality_rate: mean(acc.high_quality),
            }
        })
        .collect()
}

/// Module aggregator bound to the scoring weights
pub struct ModuleAggregator<'a> {
    task_weights: &'a TaskWeights,
    hitting: HittingMetricWeights,
    rally: RallyMetricWeights,
    dispersion: Dispersion,
}

impl<'a> ModuleAggregator<'a> {
    pub fn new(
        task_weights: &'a TaskWeights,
        hitting: HittingMetricWeights,
        rally: RallyMetricWeights,
        dispersion: Dispersion,
    ) -> Self {
        Self {
            task_weights,
            hitting,
            rally,
            dispersion,
        }
    }

    /// Score the precision or pressure module
    pub fn score_hitting(&self, module: TestModule, attempts: &[HittingAttempt]) -> HittingModuleResult {
        let aggregates = aggregate_tasks(attempts);

        let keys: Vec<&str> = aggregates.iter().map(|a| a.task_label.as_str()).collect();
        let inbound: Vec<Option<f64>> = aggregates.iter().map(|a| a.inbound_rate).collect();
        let high_quality: Vec<Option<f64>> = aggregates.iter().map(|a| a.high_quality_rate).collect();

        let z_inbound = standardize_by_group(&keys, &inbound, self.dispersion);
        let z_high_quality = standardize_by_group(&keys, &high_quality, self.dispersion);
        let degenerate_groups = z_inbound.degenerate_groups + z_high_quality.degenerate_groups;

        let mut fallback_tasks: Vec<String> = Vec::new();
        let mut scores = ModuleScores::new(module);
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut tasks = Vec::with_capacity(aggregates.len());

        for (i, aggregate) in aggregates.into_iter().enumerate() {
            let lookup = self.task_weights.lookup(&aggregate.task_label);
            if matches!(lookup, TaskWeightLookup::Fallback(_))
                && !fallback_tasks.contains(&aggregate.task_label)
            {
                fallback_tasks.push(aggregate.task_label.clone());
            }

            let task_weight = lookup.weight();
            let task_z = self.hitting.combine(z_inbound.z[i], z_high_quality.z[i]);

            let slot = *index.entry(aggregate.athlete_id.clone()).or_insert_with(|| {
                scores.scores.push(AthleteScore {
                    athlete_id: aggregate.athlete_id.clone(),
                    score: 0.0,
                });
                scores.scores.len() - 1
            });
            scores.scores[slot].score += task_z * task_weight;

            tasks.push(StandardizedTask {
                aggregate,
                z_inbound_rate: z_inbound.z[i],
                z_high_quality_rate: z_high_quality.z[i],
                task_z,
                task_weight,
            });
        }

        if !fallback_tasks.is_empty() {
            tracing::warn!(
                module = module.as_str(),
                tasks = ?fallback_tasks,
                weight = self.task_weights.default_weight,
                "unrecognized task labels use the default weight"
            );
        }
        if degenerate_groups > 0 {
            tracing::warn!(
                module = module.as_str(),
                groups = degenerate_groups,
                "zero-variance task groups standardized to 0"
            );
        }
        tracing::debug!(
            module = module.as_str(),
            tasks = tasks.len(),
            athletes = scores.len(),
            "scored hitting module"
        );

        HittingModuleResult {
            tasks,
            scores,
            fallback_tasks,
            degenerate_groups,
        }
    }

    /// Score the rally module; every attempt is standardized on its own
    pub fn score_rally(&self, attempts: &[RallyAttempt]) -> RallyModuleResult {
        let keys: Vec<&str> = attempts.iter().map(|a| a.task_label.as_str()).collect();
        let column = |f: fn(&RallyAttempt) -> f64| -> Vec<Option<f64>> {
            attempts.iter().map(|a| Some(f(a))).collect()
        };

        let z_volume = standardize_by_group(&keys, &column(|a| a.shot_volume), self.dispersion);
        let z_errors = standardize_by_group(&keys, &column(|a| a.error_count), self.dispersion);
        let z_high_quality =
            standardize_by_group(&keys, &column(|a| a.high_quality_rate), self.dispersion);
        let z_consecutive = standardize_by_group(
            &keys,
            &column(|a| a.consecutive_high_quality_count),
            self.dispersion,
        );
        let degenerate_groups = z_volume.degenerate_groups
            + z_errors.degenerate_groups
            + z_high_quality.degenerate_groups
            + z_consecutive.degenerate_groups;

        let mut standardized = Vec::with_capacity(attempts.len());
        let mut order: Vec<&str> = Vec::new();
        let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();

        for (i, attempt) in attempts.iter().enumerate() {
            let task_z = self.rally.combine(
                z_volume.z[i],
                z_errors.z[i],
                z_high_quality.z[i],
                z_consecutive.z[i],
            );

            let entry = sums.entry(attempt.athlete_id.as_str()).or_insert_with(|| {
                order.push(attempt.athlete_id.as_str());
                (0.0, 0)
            });
            entry.0 += task_z;
            entry.1 += 1;

            standardized.push(StandardizedRallyAttempt {
                attempt: attempt.clone(),
                z_shot_volume: z_volume.z[i],
                z_error_count: z_errors.z[i],
                z_high_quality_rate: z_high_quality.z[i],
                z_consecutive_high_quality: z_consecutive.z[i],
                task_z,
            });
        }

        let scores = ModuleScores {
            module: TestModule::Rally,
            scores: order
                .into_iter()
                .map(|athlete| {
                    let (sum, n) = sums[athlete];
                    AthleteScore {
                        athlete_id: athlete.to_string(),
                        score: sum / n as f64,
                    }
                })
                .collect(),
        };

        if degenerate_groups > 0 {
            tracing::warn!(
                module = "rally",
                groups = degenerate_groups,
                "zero-variance task groups standardized to 0"
            );
        }
        tracing::debug!(
            attempts = standardized.len(),
            athletes = scores.len(),
            "scored rally module"
        );

        RallyModuleResult {
            attempts: standardized,
            scores,
            degenerate_groups,
        }
    }
}

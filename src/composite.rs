//! Composite merging
//!
//! Module scores are outer-joined on athlete identity. An athlete missing a
//! module receives that module's worst observed score, never a neutral value
//! and never an exclusion. The composite is the weighted sum of the three
//! module scores; weights are not required to sum to 1.

use crate::extractor::ModuleCounts;
use crate::types::{CompositeRecord, ModuleScores, ModuleValue, TestModule};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Tolerance of the advisory sum-to-one check
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Composite weights of the three modules
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleWeights {
    pub rally: f64,
    pub pressure: f64,
    pub precision: f64,
}

impl Default for ModuleWeights {
    fn default() -> Self {
        Self {
            rally: 0.5,
            pressure: 0.3,
            precision: 0.2,
        }
    }
}

impl ModuleWeights {
    /// One third each
    pub fn equal() -> Self {
        Self {
            rally: 1.0 / 3.0,
            pressure: 1.0 / 3.0,
            precision: 1.0 / 3.0,
        }
    }

    pub fn sum(&self) -> f64 {
        self.rally + self.pressure + self.precision
    }

    /// Advisory only: out-of-range weights are accepted and scale the result
    pub fn sums_to_one(&self) -> bool {
        (self.sum() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE
    }

    pub fn combine(&self, precision: f64, pressure: f64, rally: f64) -> f64 {
        let mut composite = 0.0;
        // skip zero weights: 0 * inf is NaN
        for (weight, score) in [(self.rally, rally), (self.pressure, pressure), (self.precision, precision)] {
            if weight != 0.0 {
                composite += weight * score;
            }
        }
        composite
    }
}

/// Result of the outer join
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub records: Vec<CompositeRecord>,
    /// Number of athletes whose score was imputed, per module
    pub imputed: ModuleCounts,
    /// Modules nobody reported; every athlete gets 0.0 for them
    pub empty_modules: Vec<TestModule>,
}

/// Outer-join the module scores and compute the weighted composite.
///
/// Athletes are ordered by first appearance across precision, pressure, rally.
pub fn merge_modules<'a>(
    precision: &'a ModuleScores,
    pressure: &'a ModuleScores,
    rally: &'a ModuleScores,
    weights: &ModuleWeights,
) -> MergeOutcome {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut athletes: Vec<&str> = Vec::new();
    for module in [precision, pressure, rally] {
        for score in &module.scores {
            if seen.insert(score.athlete_id.as_str()) {
                athletes.push(score.athlete_id.as_str());
            }
        }
    }

    let mut empty_modules = Vec::new();
    let mut fill_values = [0.0; 3];
    for (slot, module) in [precision, pressure, rally].into_iter().enumerate() {
        match module.min_observed() {
            Some(min) => fill_values[slot] = min,
            None => {
                if !athletes.is_empty() {
                    tracing::warn!(module = module.module.as_str(), "no athlete reported this module; scoring it as 0");
                }
                empty_modules.push(module.module);
            }
        }
    }

    let index = |module: &'a ModuleScores| -> HashMap<&'a str, f64> {
        module
            .scores
            .iter()
            .map(|s| (s.athlete_id.as_str(), s.score))
            .collect()
    };
    let lookups = [index(precision), index(pressure), index(rally)];

    let mut imputed = ModuleCounts::default();
    let mut value = |slot: usize, module: TestModule, athlete: &str| match lookups[slot].get(athlete) {
        Some(score) => ModuleValue::observed(*score),
        None => {
            imputed.increment(module);
            ModuleValue::imputed(fill_values[slot])
        }
    };

    let records: Vec<CompositeRecord> = athletes
        .iter()
        .map(|&athlete| {
            let precision_value = value(0, TestModule::Precision, athlete);
            let pressure_value = value(1, TestModule::Pressure, athlete);
            let rally_value = value(2, TestModule::Rally, athlete);
            CompositeRecord {
                athlete_id: athlete.to_string(),
                precision: precision_value,
                pressure: pressure_value,
                rally: rally_value,
                composite: weights.combine(precision_value.score, pressure_value.score, rally_value.score),
            }
        })
        .collect();

    if imputed.total() > 0 {
        tracing::info!(
            precision = imputed.precision,
            pressure = imputed.pressure,
            rally = imputed.rally,
            "imputed missing module scores with the module minimum"
        );
    }

    MergeOutcome {
        records,
        imputed,
        empty_modules,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AthleteScore;

    fn module(module: TestModule, values: &[(&str, f64)]) -> ModuleScores {
        ModuleScores {
            module,
            scores: values
                .iter()
                .map(|(id, score)| AthleteScore {
                    athlete_id: id.to_string(),
                    score: *score,
                })
                .collect(),
        }
    }

    #[test]
    fn test_outer_join_imputes_module_minimum() {
        let precision = module(TestModule::Precision, &[("A", 1.0), ("B", -1.0)]);
        let pressure = module(TestModule::Pressure, &[("A", 0.5), ("C", -0.2)]);
        let rally = module(TestModule::Rally, &[("B", 0.3), ("C", 0.1)]);

        let outcome = merge_modules(&precision, &pressure, &rally, &ModuleWeights::equal());
        let ids: Vec<&str> = outcome.records.iter().map(|r| r.athlete_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);

        let b = &outcome.records[1];
        assert_eq!(b.pressure, ModuleValue::imputed(-0.2));
        let a = &outcome.records[0];
        assert_eq!(a.rally, ModuleValue::imputed(0.1));
        let c = &outcome.records[2];
        assert_eq!(c.precision, ModuleValue::imputed(-1.0));

        assert_eq!(outcome.imputed.total(), 3);
        assert!(outcome.empty_modules.is_empty());
    }

    #[test]
    fn test_composite_weighted_sum() {
        let precision = module(TestModule::Precision, &[("A", 1.0)]);
        let pressure = module(TestModule::Pressure, &[("A", 2.0)]);
        let rally = module(TestModule::Rally, &[("A", 3.0)]);

        let outcome = merge_modules(&precision, &pressure, &rally, &ModuleWeights::default());
        let expected = 0.2 * 1.0 + 0.3 * 2.0 + 0.5 * 3.0;
        assert!((outcome.records[0].composite - expected).abs() < 1e-12);
    }

    #[test]
    fn test_zero_weight_removes_module() {
        let precision = module(TestModule::Precision, &[("A", 1.0), ("B", 0.0)]);
        let pressure = module(TestModule::Pressure, &[("A", 0.0), ("B", 0.0)]);
        let weights = ModuleWeights {
            rally: 0.0,
            pressure: 0.5,
            precision: 0.5,
        };

        let rally_low = module(TestModule::Rally, &[("A", -5.0), ("B", 5.0)]);
        let rally_high = module(TestModule::Rally, &[("A", 5.0), ("B", -5.0)]);
        let low = merge_modules(&precision, &pressure, &rally_low, &weights);
        let high = merge_modules(&precision, &pressure, &rally_high, &weights);

        for (l, h) in low.records.iter().zip(high.records.iter()) {
            assert_eq!(l.composite, h.composite);
        }
    }

    #[test]
    fn test_empty_module_scores_zero() {
        let precision = module(TestModule::Precision, &[("A", 1.0), ("B", -1.0)]);
        let empty_pressure = ModuleScores::new(TestModule::Pressure);
        let empty_rally = ModuleScores::new(TestModule::Rally);

        let outcome = merge_modules(&precision, &empty_pressure, &empty_rally, &ModuleWeights::equal());
        assert_eq!(outcome.empty_modules, vec![TestModule::Pressure, TestModule::Rally]);
        for record in &outcome.records {
            assert_eq!(record.pressure.score, 0.0);
            assert_eq!(record.rally.score, 0.0);
            assert!(record.composite.is_finite());
        }
    }

    #[test]
    fn test_large_population_join() {
        let ids: Vec<String> = (0..2000).map(|i| format!("athlete-{}", i)).collect();
        let precision = ModuleScores {
            module: TestModule::Precision,
            scores: ids
                .iter()
                .enumerate()
                .map(|(i, id)| AthleteScore {
                    athlete_id: id.clone(),
                    score: i as f64,
                })
                .collect(),
        };
        let pressure = ModuleScores {
            module: TestModule::Pressure,
            scores: ids
                .iter()
                .step_by(2)
                .map(|id| AthleteScore {
                    athlete_id: id.clone(),
                    score: 1.0,
                })
                .collect(),
        };
        let rally = ModuleScores::new(TestModule::Rally);

        let outcome = merge_modules(&precision, &pressure, &rally, &ModuleWeights::default());
        assert_eq!(outcome.records.len(), 2000);
        assert_eq!(outcome.imputed.pressure, 1000);
        assert_eq!(outcome.imputed.rally, 2000);
        assert_eq!(outcome.records[1999].precision, ModuleValue::observed(1999.0));
        assert_eq!(outcome.records[1].pressure, ModuleValue::imputed(1.0));
        assert_eq!(outcome.records[2].pressure, ModuleValue::observed(1.0));
    }

    #[test]
    fn test_weight_sum_is_advisory() {
        let weights = ModuleWeights {
            rally: 1.0,
            pressure: 1.0,
            precision: 1.0,
        };
        assert!(!weights.sums_to_one());
        assert!(ModuleWeights::default().sums_to_one());
        assert!((weights.combine(1.0, 1.0, 1.0) - 3.0).abs() < 1e-12);
    }
}

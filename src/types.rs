//! Core types for the Groundstroke pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: attempt records, task aggregates, standardized aggregates, module
//! scores, composite records, and leaderboard rows.

use serde::{Deserialize, Serialize};

/// Test module identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestModule {
    Precision,
    Pressure,
    Rally,
}

impl TestModule {
    pub const ALL: [TestModule; 3] = [TestModule::Precision, TestModule::Pressure, TestModule::Rally];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestModule::Precision => "precision",
            TestModule::Pressure => "pressure",
            TestModule::Rally => "rally",
        }
    }
}

impl std::fmt::Display for TestModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One measured trial of the precision or pressure module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HittingAttempt {
    /// Canonical athlete identity
    pub athlete_id: String,
    /// Task label (hitting direction)
    pub task_label: String,
    /// Dominant hand as recorded; informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dominant_hand: Option<String>,
    /// Fraction of shots landing in (0-1); `None` when the cell was blank
    pub inbound_rate: Option<f64>,
    /// Fraction of high-quality shots (0-1); `None` when the cell was blank
    pub high_quality_rate: Option<f64>,
}

/// One measured rally attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RallyAttempt {
    pub athlete_id: String,
    pub task_label: String,
    /// Total shots in the rally
    pub shot_volume: f64,
    /// Errors committed
    pub error_count: f64,
    /// Fraction of high-quality shots (0-1)
    pub high_quality_rate: f64,
    /// Longest run of consecutive high-quality shots
    pub consecutive_high_quality_count: f64,
}

/// Mean metrics for one (athlete, task) pair within a hitting module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAggregate {
    pub athlete_id: String,
    pub task_label: String,
    /// Number of attempts averaged into this aggregate
    pub attempts: usize,
    pub inbound_rate: Option<f64>,
    pub high_quality_rate: Option<f64>,
}

/// Task aggregate with z-scores taken against the same-task population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardizedTask {
    pub aggregate: TaskAggregate,
    pub z_inbound_rate: f64,
    pub z_high_quality_rate: f64,
    /// Weighted combination of the metric z-scores
    pub task_z: f64,
    /// Weight of this task in the module score
    pub task_weight: f64,
}

/// Rally attempt with z-scores taken against the same-task population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardizedRallyAttempt {
    pub attempt: RallyAttempt,
    pub z_shot_volume: f64,
    pub z_error_count: f64,
    pub z_high_quality_rate: f64,
    pub z_consecutive_high_quality: f64,
    pub task_z: f64,
}

/// Score of one athlete in one module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteScore {
    pub athlete_id: String,
    pub score: f64,
}

/// Per-athlete scores for one module, in first-appearance order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleScores {
    pub module: TestModule,
    pub scores: Vec<AthleteScore>,
}

impl ModuleScores {
    pub fn new(module: TestModule) -> Self {
        Self {
            module,
            scores: Vec::new(),
        }
    }

    pub fn get(&self, athlete_id: &str) -> Option<f64> {
        self.scores
            .iter()
            .find(|s| s.athlete_id == athlete_id)
            .map(|s| s.score)
    }

    /// Lowest observed score, `None` when nobody reported this module
    pub fn min_observed(&self) -> Option<f64> {
        self.scores.iter().map(|s| s.score).reduce(f64::min)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// A module score that may have been imputed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModuleValue {
    pub score: f64,
    /// True when the athlete did not report this module
    pub imputed: bool,
}

impl ModuleValue {
    pub fn observed(score: f64) -> Self {
        Self {
            score,
            imputed: false,
        }
    }

    pub fn imputed(score: f64) -> Self {
        Self {
            score,
            imputed: true,
        }
    }
}

/// One athlete after the outer join of all modules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeRecord {
    pub athlete_id: String,
    pub precision: ModuleValue,
    pub pressure: ModuleValue,
    pub rally: ModuleValue,
    /// Weighted composite before display mapping
    pub composite: f64,
}

impl CompositeRecord {
    pub fn module(&self, module: TestModule) -> ModuleValue {
        match module {
            TestModule::Precision => self.precision,
            TestModule::Pressure => self.pressure,
            TestModule::Rally => self.rally,
        }
    }
}

/// One row of the final leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub rank: u32,
    pub name: String,
    pub display_score: f64,
    pub module_precision_score: f64,
    pub module_pressure_score: f64,
    pub module_rally_score: f64,
    pub composite: f64,
    /// Modules this athlete did not report (scores were imputed)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imputed_modules: Vec<TestModule>,
}

/// Ranked leaderboard, sorted by descending display score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub rows: Vec<LeaderboardRow>,
}

impl Leaderboard {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&LeaderboardRow> {
        self.rows.iter().find(|r| r.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(values: &[(&str, f64)]) -> ModuleScores {
        ModuleScores {
            module: TestModule::Rally,
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
    fn test_min_observed() {
        let module = scores(&[("a", 0.4), ("b", -1.2), ("c", 0.0)]);
        assert_eq!(module.min_observed(), Some(-1.2));
        assert_eq!(ModuleScores::new(TestModule::Pressure).min_observed(), None);
    }

    #[test]
    fn test_module_lookup() {
        let module = scores(&[("a", 0.4)]);
        assert_eq!(module.get("a"), Some(0.4));
        assert_eq!(module.get("z"), None);
    }

    #[test]
    fn test_module_serializes_lowercase() {
        let json = serde_json::to_string(&TestModule::Pressure).unwrap();
        assert_eq!(json, "\"pressure\"");
    }
}

//! Score mapping
//!
//! This module maps the zero-centered composite onto the reporting scale and
//! ranks athletes.
//! - Bounded: min-max rescale onto `[floor, floor + width]`
//! - Affine: `center + scale * composite`, independent of the population
//!
//! Ranks run 1..=n by descending display score; ties keep input order.

use crate::types::{CompositeRecord, Leaderboard, LeaderboardRow, TestModule};
use serde::{Deserialize, Serialize};

/// Relative spread below which the bounded rescale treats everyone as tied
const TIE_EPSILON: f64 = 1e-12;

/// Display scale selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    #[default]
    Bounded,
    Affine,
}

impl ScaleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleMode::Bounded => "bounded",
            ScaleMode::Affine => "affine",
        }
    }
}

/// Min-max rescale parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundedScale {
    pub floor: f64,
    pub width: f64,
}

impl Default for BoundedScale {
    fn default() -> Self {
        Self {
            floor: 60.0,
            width: 40.0,
        }
    }
}

impl BoundedScale {
    /// Display value used when the population has no spread (single athlete or all tied)
    pub fn tie_value(&self) -> f64 {
        self.floor + self.width / 2.0
    }

    pub fn map(&self, composite: f64, min: f64, max: f64) -> f64 {
        let spread = max - min;
        if !(spread > TIE_EPSILON * max.abs().max(min.abs()).max(1.0)) {
            return self.tie_value();
        }
        self.floor + (composite - min) / spread * self.width
    }
}

/// T-score style affine parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffineScale {
    pub center: f64,
    pub scale: f64,
}

impl Default for AffineScale {
    fn default() -> Self {
        Self {
            center: 50.0,
            scale: 10.0,
        }
    }
}

impl AffineScale {
    pub fn map(&self, composite: f64) -> f64 {
        self.center + self.scale * composite
    }
}

/// Maps composites to display scores and ranks the leaderboard
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreMapper {
    pub mode: ScaleMode,
    pub bounded: BoundedScale,
    pub affine: AffineScale,
}

impl ScoreMapper {
    pub fn new(mode: ScaleMode, bounded: BoundedScale, affine: AffineScale) -> Self {
        Self {
            mode,
            bounded,
            affine,
        }
    }

    /// Display score of every composite, in input order
    pub fn display_scores(&self, composites: &[f64]) -> Vec<f64> {
        match self.mode {
            ScaleMode::Affine => composites.iter().map(|c| self.affine.map(*c)).collect(),
            ScaleMode::Bounded => {
                let min = composites.iter().copied().fold(f64::INFINITY, f64::min);
                let max = composites.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                composites
                    .iter()
                    .map(|c| self.bounded.map(*c, min, max))
                    .collect()
            }
        }
    }

    /// Build the ranked leaderboard from composite records
    pub fn rank(&self, records: &[CompositeRecord]) -> Leaderboard {
        let composites: Vec<f64> = records.iter().map(|r| r.composite).collect();
        let display = self.display_scores(&composites);

        let mut order: Vec<usize> = (0..records.len()).collect();
        // stable: equal display scores keep input order
        order.sort_by(|&a, &b| display[b].total_cmp(&display[a]));

        let rows = order
            .into_iter()
            .enumerate()
            .map(|(position, idx)| {
                let record = &records[idx];
                let imputed_modules = TestModule::ALL
                    .into_iter()
                    .filter(|m| record.module(*m).imputed)
                    .collect();
                LeaderboardRow {
                    rank: (position + 1) as u32,
                    name: record.athlete_id.clone(),
                    display_score: display[idx],
                    module_precision_score: record.precision.score,
                    module_pressure_score: record.pressure.score,
                    module_rally_score: record.rally.score,
                    composite: record.composite,
                    imputed_modules,
                }
            })
            .collect();

        Leaderboard { rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModuleValue;

    fn record(id: &str, composite: f64) -> CompositeRecord {
        CompositeRecord {
            athlete_id: id.to_string(),
            precision: ModuleValue::observed(composite),
            pressure: ModuleValue::observed(0.0),
            rally: ModuleValue::imputed(0.0),
            composite,
        }
    }

    #[test]
    fn test_bounded_rescale_endpoints() {
        let mapper = ScoreMapper::default();
        let display = mapper.display_scores(&[-1.0, 0.0, 1.0]);
        assert!((display[0] - 60.0).abs() < 1e-9);
        assert!((display[1] - 80.0).abs() < 1e-9);
        assert!((display[2] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_athlete_gets_tie_value() {
        let mapper = ScoreMapper::default();
        let display = mapper.display_scores(&[0.42]);
        assert_eq!(display, vec![80.0]);
    }

    #[test]
    fn test_all_tied_gets_tie_value() {
        let mapper = ScoreMapper::default();
        let display = mapper.display_scores(&[0.1, 0.1, 0.1]);
        assert!(display.iter().all(|d| *d == 80.0));
    }

    #[test]
    fn test_affine_is_population_independent() {
        let mapper = ScoreMapper::new(ScaleMode::Affine, BoundedScale::default(), AffineScale::default());
        let small = mapper.display_scores(&[0.5, -0.5]);
        let large = mapper.display_scores(&[0.5, -0.5, 3.0]);
        assert_eq!(small[0], large[0]);
        assert!((small[0] - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_rank_descending_with_stable_ties() {
        let mapper = ScoreMapper::default();
        let records = vec![
            record("low", -1.0),
            record("tie-first", 0.5),
            record("top", 2.0),
            record("tie-second", 0.5),
        ];
        let board = mapper.rank(&records);

        let names: Vec<&str> = board.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["top", "tie-first", "tie-second", "low"]);
        let ranks: Vec<u32> = board.rows.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
        assert_eq!(board.rows[0].imputed_modules, vec![TestModule::Rally]);
    }

    #[test]
    fn test_empty_population() {
        let board = ScoreMapper::default().rank(&[]);
        assert!(board.is_empty());
    }
}

//! Scoring configuration
//!
//! Every section has a default, so an empty JSON object is a complete config.
//! Module weights are advisory: a sum other than 1 is reported, never rejected.

use crate::aggregator::{HittingMetricWeights, RallyMetricWeights, TaskWeights};
use crate::alias::AliasTable;
use crate::composite::ModuleWeights;
use crate::error::ScoreError;
use crate::mapper::{AffineScale, BoundedScale, ScaleMode, ScoreMapper};
use crate::schema::ColumnLayout;
use crate::standardizer::Dispersion;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration of one scoring run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub module_weights: ModuleWeights,
    pub scale_mode: ScaleMode,
    pub bounded: BoundedScale,
    pub affine: AffineScale,
    pub task_weights: TaskWeights,
    pub hitting_metrics: HittingMetricWeights,
    pub rally_metrics: RallyMetricWeights,
    pub dispersion: Dispersion,
    pub aliases: AliasTable,
    pub layout: ColumnLayout,
}

impl ScoringConfig {
    /// Load configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ScoreError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load configuration from a JSON file
    pub fn from_path(path: &Path) -> Result<Self, ScoreError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, ScoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_module_weights(mut self, weights: ModuleWeights) -> Self {
        self.module_weights = weights;
        self
    }

    pub fn with_scale_mode(mut self, mode: ScaleMode) -> Self {
        self.scale_mode = mode;
        self
    }

    pub fn mapper(&self) -> ScoreMapper {
        ScoreMapper::new(self.scale_mode, self.bounded, self.affine)
    }

    /// Reject values that would leak NaN into the leaderboard.
    ///
    /// Returns advisory warnings for accepted-but-unusual settings.
    pub fn validate(&self) -> Result<Vec<String>, ScoreError> {
        let numbers = [
            ("module_weights.rally", self.module_weights.rally),
            ("module_weights.pressure", self.module_weights.pressure),
            ("module_weights.precision", self.module_weights.precision),
            ("bounded.floor", self.bounded.floor),
            ("bounded.width", self.bounded.width),
            ("affine.center", self.affine.center),
            ("affine.scale", self.affine.scale),
            ("task_weights.default_weight", self.task_weights.default_weight),
            ("hitting_metrics.inbound_rate", self.hitting_metrics.inbound_rate),
            ("hitting_metrics.high_quality_rate", self.hitting_metrics.high_quality_rate),
            ("rally_metrics.shot_volume", self.rally_metrics.shot_volume),
            ("rally_metrics.error_count", self.rally_metrics.error_count),
            ("rally_metrics.high_quality_rate", self.rally_metrics.high_quality_rate),
            (
                "rally_metrics.consecutive_high_quality",
                self.rally_metrics.consecutive_high_quality,
            ),
        ];
        for (name, value) in numbers {
            if !value.is_finite() {
                return Err(ScoreError::InvalidConfig(format!("{} must be finite", name)));
            }
        }
        if let Some((task, _)) = self.task_weights.weights.iter().find(|(_, w)| !w.is_finite()) {
            return Err(ScoreError::InvalidConfig(format!(
                "task weight for {:?} must be finite",
                task
            )));
        }
        if let Some(alias) = self.aliases.blank_targets().next() {
            return Err(ScoreError::InvalidConfig(format!(
                "alias {:?} maps to a blank athlete name",
                alias
            )));
        }
        if self.bounded.width < 0.0 {
            return Err(ScoreError::InvalidConfig(
                "bounded.width must not be negative".to_string(),
            ));
        }

        let mut warnings = Vec::new();
        if !self.module_weights.sums_to_one() {
            warnings.push(format!(
                "module weights sum to {:.4}, not 1; composite is scaled accordingly",
                self.module_weights.sum()
            ));
        }
        for (name, w) in [
            ("rally", self.module_weights.rally),
            ("pressure", self.module_weights.pressure),
            ("precision", self.module_weights.precision),
        ] {
            if w < 0.0 {
                warnings.push(format!("{} weight is negative ({})", name, w));
            }
        }
        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnBinding;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_json_is_default() {
        let config = ScoringConfig::from_json("{}").unwrap();
        assert_eq!(config, ScoringConfig::default());
        assert_eq!(config.module_weights, ModuleWeights::default());
        assert_eq!(config.scale_mode, ScaleMode::Bounded);
        assert_eq!(config.layout, ColumnLayout::standard());
    }

    #[test]
    fn test_partial_sections() {
        let json = r#"{
            "module_weights": { "rally": 0.6 },
            "scale_mode": "affine",
            "dispersion": "sample",
            "aliases": { "Jon": "John" }
        }"#;
        let config = ScoringConfig::from_json(json).unwrap();

        assert_eq!(config.module_weights.rally, 0.6);
        assert_eq!(config.module_weights.pressure, 0.3);
        assert_eq!(config.scale_mode, ScaleMode::Affine);
        assert_eq!(config.dispersion, Dispersion::Sample);
        assert_eq!(config.aliases.canonicalize("Jon"), "John");
    }

    #[test]
    fn test_layout_override_by_header() {
        let json = r#"{
            "layout": {
                "precision": { "athlete": "Name", "task": 2, "hand": 3, "inbound_rate": 4, "high_quality_rate": 5 },
                "pressure": { "athlete": 7, "task": 9, "hand": 10, "inbound_rate": 11, "high_quality_rate": 12 },
                "rally": { "athlete": 14, "task": 16, "shot_volume": 17, "error_count": 18,
                           "high_quality_rate": 19, "consecutive_high_quality": 20 }
            }
        }"#;
        let config = ScoringConfig::from_json(json).unwrap();
        assert_eq!(
            config.layout.precision.athlete,
            ColumnBinding::Header("Name".to_string())
        );
    }

    #[test]
    fn test_round_trip_json() {
        let config = ScoringConfig::default().with_scale_mode(ScaleMode::Affine);
        let json = config.to_json().unwrap();
        assert_eq!(ScoringConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_weight_sum_is_a_warning() {
        let config = ScoringConfig::default().with_module_weights(ModuleWeights {
            rally: 1.0,
            pressure: 1.0,
            precision: 0.5,
        });
        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("2.5000"));
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut config = ScoringConfig::default();
        config.affine.scale = f64::NAN;
        assert!(matches!(config.validate(), Err(ScoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_blank_alias_target_rejected() {
        let config = ScoringConfig::from_json(r#"{"aliases": {"Jon": ""}}"#).unwrap();
        assert!(matches!(config.validate(), Err(ScoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_default_validates_cleanly() {
        assert!(ScoringConfig::default().validate().unwrap().is_empty());
    }
}

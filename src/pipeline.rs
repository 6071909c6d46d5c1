//! Pipeline orchestration
//!
//! This module provides the public scoring API. It runs the full pipeline from
//! a raw bulk table to a ranked leaderboard.

use crate::aggregator::{HittingModuleResult, ModuleAggregator, RallyModuleResult};
use crate::composite::merge_modules;
use crate::config::ScoringConfig;
use crate::error::ScoreError;
use crate::extractor::{ExtractedTables, ExtractionStats, ModuleCounts, RowExtractor};
use crate::schema::RawTable;
use crate::types::{CompositeRecord, Leaderboard, TestModule};
use serde::{Deserialize, Serialize};

/// What the run recovered from without failing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub extraction: ExtractionStats,
    /// Athletes with an observed score, per module
    pub athletes_per_module: ModuleCounts,
    /// Athletes whose module score was imputed, per module
    pub imputed: ModuleCounts,
    /// Modules with no observed score at all
    pub empty_modules: Vec<TestModule>,
    /// Standardization groups with zero spread (all z = 0)
    pub degenerate_groups: usize,
    /// Task labels scored with the default task weight
    pub fallback_tasks: Vec<String>,
    pub module_weight_sum: f64,
    pub warnings: Vec<String>,
}

/// Everything one scoring run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRun {
    pub leaderboard: Leaderboard,
    pub composites: Vec<CompositeRecord>,
    pub precision: HittingModuleResult,
    pub pressure: HittingModuleResult,
    pub rally: RallyModuleResult,
    pub diagnostics: RunDiagnostics,
}

/// Stateless scorer bound to one configuration
#[derive(Debug, Clone)]
pub struct Scorer {
    config: ScoringConfig,
    warnings: Vec<String>,
}

impl Scorer {
    /// Create a scorer, rejecting configurations that could produce NaN
    pub fn new(config: ScoringConfig) -> Result<Self, ScoreError> {
        let warnings = config.validate()?;
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }
        Ok(Self { config, warnings })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Extract the module sub-tables without scoring
    pub fn extract(&self, table: &RawTable) -> Result<ExtractedTables, ScoreError> {
        RowExtractor::new(&self.config.layout, &self.config.aliases).extract(table)
    }

    /// Score a raw bulk table
    pub fn score_table(&self, table: &RawTable) -> Result<ScoreRun, ScoreError> {
        // Stage 1: Slice the table into module sub-tables
        let tables = self.extract(table)?;
        Ok(self.score_attempts(tables))
    }

    /// Score already-typed attempt records
    pub fn score_attempts(&self, tables: ExtractedTables) -> ScoreRun {
        let config = &self.config;
        let aggregator = ModuleAggregator::new(
            &config.task_weights,
            config.hitting_metrics,
            config.rally_metrics,
            config.dispersion,
        );

        // Stage 2-3: Standardize per task and aggregate per module
        let precision = aggregator.score_hitting(TestModule::Precision, &tables.precision);
        let pressure = aggregator.score_hitting(TestModule::Pressure, &tables.pressure);
        let rally = aggregator.score_rally(&tables.rally);

        // Stage 4: Outer join, impute, weight
        let merged = merge_modules(
            &precision.scores,
            &pressure.scores,
            &rally.scores,
            &config.module_weights,
        );

        // Stage 5: Map to the display scale and rank
        let leaderboard = config.mapper().rank(&merged.records);

        let mut fallback_tasks = precision.fallback_tasks.clone();
        for task in &pressure.fallback_tasks {
            if !fallback_tasks.contains(task) {
                fallback_tasks.push(task.clone());
            }
        }

        let mut warnings = self.warnings.clone();
        for module in &merged.empty_modules {
            if !merged.records.is_empty() {
                warnings.push(format!("no athlete reported the {} module; scored as 0", module));
            }
        }

        let diagnostics = RunDiagnostics {
            extraction: tables.stats,
            athletes_per_module: ModuleCounts {
                precision: precision.scores.len(),
                pressure: pressure.scores.len(),
                rally: rally.scores.len(),
            },
            imputed: merged.imputed,
            empty_modules: merged.empty_modules,
            degenerate_groups: precision.degenerate_groups
                + pressure.degenerate_groups
                + rally.degenerate_groups,
            fallback_tasks,
            module_weight_sum: config.module_weights.sum(),
            warnings,
        };

        tracing::info!(
            athletes = leaderboard.len(),
            scale = config.scale_mode.as_str(),
            "scoring run complete"
        );

        ScoreRun {
            leaderboard,
            composites: merged.records,
            precision,
            pressure,
            rally,
            diagnostics,
        }
    }
}

/// Score comma-delimited text in one call
pub fn score_csv(text: &str, config: &ScoringConfig) -> Result<ScoreRun, ScoreError> {
    let table = RawTable::from_csv_str(text)?;
    Scorer::new(config.clone())?.score_table(&table)
}

//! Row extraction
//!
//! This module slices the bulk table into the three typed module sub-tables.
//! - Columns come from the resolved layout, never from ad-hoc indexing
//! - Rows without an athlete identity (or task) are dropped per block
//! - Rally numeric cells that fail to parse are coerced to zero
//! - Precision/pressure numeric cells must parse or be blank

use crate::alias::AliasTable;
use crate::error::ScoreError;
use crate::schema::{ColumnLayout, RawTable, ResolvedHitting, ResolvedRally};
use crate::types::{HittingAttempt, RallyAttempt, TestModule};
use serde::{Deserialize, Serialize};

/// Per-module counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleCounts {
    pub precision: usize,
    pub pressure: usize,
    pub rally: usize,
}

impl ModuleCounts {
    pub fn get(&self, module: TestModule) -> usize {
        match module {
            TestModule::Precision => self.precision,
            TestModule::Pressure => self.pressure,
            TestModule::Rally => self.rally,
        }
    }

    pub fn increment(&mut self, module: TestModule) {
        match module {
            TestModule::Precision => self.precision += 1,
            TestModule::Pressure => self.pressure += 1,
            TestModule::Rally => self.rally += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.precision + self.pressure + self.rally
    }
}

/// What extraction skipped or repaired
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Data rows in the table (excluding the header)
    pub rows_scanned: usize,
    /// Block rows discarded because the athlete cell was empty
    pub dropped_missing_identity: ModuleCounts,
    /// Block rows discarded because the task cell was empty
    pub dropped_missing_task: ModuleCounts,
    /// Rally numeric cells replaced by 0.0
    pub coerced_rally_cells: usize,
}

/// The three typed module sub-tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTables {
    pub precision: Vec<HittingAttempt>,
    pub pressure: Vec<HittingAttempt>,
    pub rally: Vec<RallyAttempt>,
    pub stats: ExtractionStats,
}

impl ExtractedTables {
    pub fn is_empty(&self) -> bool {
        self.precision.is_empty() && self.pressure.is_empty() && self.rally.is_empty()
    }
}

/// Extractor bound to a column layout and alias table
pub struct RowExtractor<'a> {
    layout: &'a ColumnLayout,
    aliases: &'a AliasTable,
}

impl<'a> RowExtractor<'a> {
    pub fn new(layout: &'a ColumnLayout, aliases: &'a AliasTable) -> Self {
        Self { layout, aliases }
    }

    /// Extract all three sub-tables, or fail without partial results
    pub fn extract(&self, table: &RawTable) -> Result<ExtractedTables, ScoreError> {
        let resolved = self.layout.resolve(table.headers(), table.width())?;

        let mut out = ExtractedTables {
            stats: ExtractionStats {
                rows_scanned: table.row_count(),
                ..Default::default()
            },
            ..Default::default()
        };

        for row in 0..table.row_count() {
            if let Some(attempt) =
                self.extract_hitting(table, row, TestModule::Precision, &resolved.precision, &mut out.stats)?
            {
                out.precision.push(attempt);
            }
            if let Some(attempt) =
                self.extract_hitting(table, row, TestModule::Pressure, &resolved.pressure, &mut out.stats)?
            {
                out.pressure.push(attempt);
            }
            if let Some(attempt) = self.extract_rally(table, row, &resolved.rally, &mut out.stats) {
                out.rally.push(attempt);
            }
        }

        if out.stats.coerced_rally_cells > 0 {
            tracing::warn!(
                cells = out.stats.coerced_rally_cells,
                "non-numeric rally cells coerced to 0"
            );
        }
        tracing::debug!(
            precision = out.precision.len(),
            pressure = out.pressure.len(),
            rally = out.rally.len(),
            dropped = out.stats.dropped_missing_identity.total(),
            "extracted module rows"
        );

        Ok(out)
    }

    /// Returns the identity and task of a block row, recording why it was skipped
    fn identify(
        &self,
        table: &RawTable,
        row: usize,
        module: TestModule,
        athlete_col: usize,
        task_col: usize,
        stats: &mut ExtractionStats,
    ) -> Option<(String, String)> {
        let athlete = self.aliases.canonicalize(table.cell(row, athlete_col));
        if athlete.is_empty() {
            stats.dropped_missing_identity.increment(module);
            return None;
        }
        let task = table.cell(row, task_col);
        if task.is_empty() {
            stats.dropped_missing_task.increment(module);
            return None;
        }
        Some((athlete, task.to_string()))
    }

    fn extract_hitting(
        &self,
        table: &RawTable,
        row: usize,
        module: TestModule,
        cols: &ResolvedHitting,
        stats: &mut ExtractionStats,
    ) -> Result<Option<HittingAttempt>, ScoreError> {
        let Some((athlete_id, task_label)) =
            self.identify(table, row, module, cols.athlete, cols.task, stats)
        else {
            return Ok(None);
        };

        let hand = table.cell(row, cols.hand);
        Ok(Some(HittingAttempt {
            athlete_id,
            task_label,
            dominant_hand: (!hand.is_empty()).then(|| hand.to_string()),
            inbound_rate: parse_hitting_metric(table, row, cols.inbound_rate, module)?,
            high_quality_rate: parse_hitting_metric(table, row, cols.high_quality_rate, module)?,
        }))
    }

    fn extract_rally(
        &self,
        table: &RawTable,
        row: usize,
        cols: &ResolvedRally,
        stats: &mut ExtractionStats,
    ) -> Option<RallyAttempt> {
        let (athlete_id, task_label) =
            self.identify(table, row, TestModule::Rally, cols.athlete, cols.task, stats)?;

        let mut coerce = |col: usize| match parse_number(table.cell(row, col)) {
            Some(value) => value,
            None => {
                stats.coerced_rally_cells += 1;
                0.0
            }
        };

        Some(RallyAttempt {
            athlete_id,
            task_label,
            shot_volume: coerce(cols.shot_volume),
            error_count: coerce(cols.error_count),
            high_quality_rate: coerce(cols.high_quality_rate),
            consecutive_high_quality_count: coerce(cols.consecutive_high_quality),
        })
    }
}

/// Parse a finite number, accepting a trailing percent sign ("85%" -> 0.85)
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    let value = match text.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f64>().ok()? / 100.0,
        None => text.parse::<f64>().ok()?,
    };
    value.is_finite().then_some(value)
}

fn parse_hitting_metric(
    table: &RawTable,
    row: usize,
    col: usize,
    module: TestModule,
) -> Result<Option<f64>, ScoreError> {
    let text = table.cell(row, col);
    if text.is_empty() {
        return Ok(None);
    }
    match parse_number(text) {
        Some(value) => Ok(Some(value)),
        None => Err(ScoreError::MalformedInput(format!(
            "{} metric at line {}, column #{} is not a number: {:?}",
            module,
            row + 2,
            col,
            text
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Build a 21-column standard sheet from (precision, pressure, rally) blocks
    fn sheet(rows: &[(&[&str; 5], &[&str; 5], &[&str; 6])]) -> RawTable {
        let headers = (0..21).map(|i| format!("h{}", i)).collect();
        let rows = rows
            .iter()
            .map(|(prec, press, rally)| {
                let mut row = vec![String::new(); 21];
                for (slot, value) in [0, 2, 3, 4, 5].iter().zip(prec.iter()) {
                    row[*slot] = value.to_string();
                }
                for (slot, value) in [7, 9, 10, 11, 12].iter().zip(press.iter()) {
                    row[*slot] = value.to_string();
                }
                for (slot, value) in [14, 16, 17, 18, 19, 20].iter().zip(rally.iter()) {
                    row[*slot] = value.to_string();
                }
                row
            })
            .collect();
        RawTable::new(headers, rows)
    }

    const EMPTY5: [&str; 5] = ["", "", "", "", ""];
    const EMPTY6: [&str; 6] = ["", "", "", "", "", ""];

    #[test]
    fn test_extracts_blocks_independently() {
        let table = sheet(&[
            (
                &["Ann", "cross", "R", "0.8", "0.5"],
                &["Bo", "line", "L", "0.6", "0.2"],
                &["Cy", "deep", "20", "2", "0.4", "5"],
            ),
            (&["Ann", "line", "R", "0.7", "0.4"], &EMPTY5, &EMPTY6),
        ]);

        let layout = ColumnLayout::standard();
        let aliases = AliasTable::new();
        let out = RowExtractor::new(&layout, &aliases).extract(&table).unwrap();

        assert_eq!(out.precision.len(), 2);
        assert_eq!(out.pressure.len(), 1);
        assert_eq!(out.rally.len(), 1);
        assert_eq!(out.stats.dropped_missing_identity.pressure, 1);
        assert_eq!(out.stats.dropped_missing_identity.rally, 1);
        assert_eq!(
            out.rally[0],
            RallyAttempt {
                athlete_id: "Cy".to_string(),
                task_label: "deep".to_string(),
                shot_volume: 20.0,
                error_count: 2.0,
                high_quality_rate: 0.4,
                consecutive_high_quality_count: 5.0,
            }
        );
        assert_eq!(out.precision[0].dominant_hand.as_deref(), Some("R"));
    }

    #[test]
    fn test_rally_non_numeric_coerced_to_zero() {
        let table = sheet(&[(&EMPTY5, &EMPTY5, &["Cy", "deep", "n/a", "2", "", "x"])]);
        let layout = ColumnLayout::standard();
        let aliases = AliasTable::new();
        let out = RowExtractor::new(&layout, &aliases).extract(&table).unwrap();

        assert_eq!(out.rally[0].shot_volume, 0.0);
        assert_eq!(out.rally[0].high_quality_rate, 0.0);
        assert_eq!(out.rally[0].consecutive_high_quality_count, 0.0);
        assert_eq!(out.stats.coerced_rally_cells, 3);
    }

    #[test]
    fn test_hitting_non_numeric_is_fatal() {
        let table = sheet(&[(&["Ann", "cross", "R", "high", "0.5"], &EMPTY5, &EMPTY6)]);
        let layout = ColumnLayout::standard();
        let aliases = AliasTable::new();
        let err = RowExtractor::new(&layout, &aliases).extract(&table).unwrap_err();
        assert!(err.is_malformed_input());
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_hitting_blank_metric_is_missing() {
        let table = sheet(&[(&["Ann", "cross", "", "", "50%"], &EMPTY5, &EMPTY6)]);
        let layout = ColumnLayout::standard();
        let aliases = AliasTable::new();
        let out = RowExtractor::new(&layout, &aliases).extract(&table).unwrap();

        assert_eq!(out.precision[0].inbound_rate, None);
        assert_eq!(out.precision[0].high_quality_rate, Some(0.5));
        assert_eq!(out.precision[0].dominant_hand, None);
    }

    #[test]
    fn test_aliases_applied_before_grouping() {
        let table = sheet(&[
            (&["Jon", "cross", "R", "0.8", "0.5"], &EMPTY5, &EMPTY6),
            (&["John", "line", "R", "0.8", "0.5"], &EMPTY5, &EMPTY6),
        ]);
        let layout = ColumnLayout::standard();
        let aliases: AliasTable = [("Jon", "John")].into_iter().collect();
        let out = RowExtractor::new(&layout, &aliases).extract(&table).unwrap();

        assert!(out.precision.iter().all(|a| a.athlete_id == "John"));
    }

    #[test]
    fn test_alias_to_blank_identity_dropped() {
        let table = sheet(&[
            (&["Jon", "cross", "R", "0.8", "0.5"], &EMPTY5, &["Jon", "deep", "20", "2", "0.4", "5"]),
            (&["Bo", "cross", "R", "0.6", "0.3"], &EMPTY5, &EMPTY6),
        ]);
        let layout = ColumnLayout::standard();
        let aliases: AliasTable = [("Jon", "")].into_iter().collect();
        let out = RowExtractor::new(&layout, &aliases).extract(&table).unwrap();

        assert_eq!(out.precision.len(), 1);
        assert_eq!(out.precision[0].athlete_id, "Bo");
        assert!(out.rally.is_empty());
        assert_eq!(out.stats.dropped_missing_identity.precision, 1);
        assert_eq!(out.stats.dropped_missing_identity.rally, 2);
    }

    #[test]
    fn test_missing_task_dropped() {
        let table = sheet(&[(&["Ann", "", "R", "0.8", "0.5"], &EMPTY5, &EMPTY6)]);
        let layout = ColumnLayout::standard();
        let aliases = AliasTable::new();
        let out = RowExtractor::new(&layout, &aliases).extract(&table).unwrap();

        assert!(out.precision.is_empty());
        assert_eq!(out.stats.dropped_missing_task.precision, 1);
    }

    #[test]
    fn test_narrow_table_fails_without_partial_results() {
        let table = RawTable::new(
            (0..14).map(|i| format!("h{}", i)).collect(),
            vec![vec!["Ann".to_string(); 14]],
        );
        let layout = ColumnLayout::standard();
        let aliases = AliasTable::new();
        let err = RowExtractor::new(&layout, &aliases).extract(&table).unwrap_err();
        assert!(matches!(err, ScoreError::MissingColumn { .. }));
    }

    #[test]
    fn test_parse_number_forms() {
        assert_eq!(parse_number("0.25"), Some(0.25));
        assert_eq!(parse_number("85%"), Some(0.85));
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number(""), None);
    }
}

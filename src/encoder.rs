//! Leaderboard encoding
//!
//! This module writes the ranked leaderboard as delimited text (with a UTF-8
//! byte-order mark so spreadsheet tools read non-ASCII names correctly), as
//! JSON, or as a JSON report envelope carrying run provenance.

use crate::composite::ModuleWeights;
use crate::error::ScoreError;
use crate::mapper::ScaleMode;
use crate::pipeline::{RunDiagnostics, ScoreRun};
use crate::types::{Leaderboard, LeaderboardRow};
use crate::{PRODUCER_NAME, VERSION};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io::Write;
use uuid::Uuid;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Leaderboard CSV header, in column order
pub const CSV_HEADER: [&str; 6] = [
    "rank",
    "name",
    "display_score",
    "module_precision_score",
    "module_pressure_score",
    "module_rally_score",
];

/// Options for delimited output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub bom: bool,
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            bom: true,
            delimiter: b',',
        }
    }
}

/// Write the leaderboard as delimited text.
///
/// Display scores are rounded to one decimal, module scores to four.
pub fn write_csv<W: Write>(board: &Leaderboard, mut writer: W, options: CsvOptions) -> Result<(), ScoreError> {
    if options.bom {
        writer.write_all(UTF8_BOM)?;
    }

    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(writer);

    csv_writer.write_record(CSV_HEADER)?;
    for row in &board.rows {
        csv_writer.write_record([
            row.rank.to_string(),
            row.name.clone(),
            format!("{:.1}", row.display_score),
            format!("{:.4}", row.module_precision_score),
            format!("{:.4}", row.module_pressure_score),
            format!("{:.4}", row.module_rally_score),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Encode the leaderboard as delimited text in memory
pub fn to_csv(board: &Leaderboard, options: CsvOptions) -> Result<Vec<u8>, ScoreError> {
    let mut buffer = Vec::new();
    write_csv(board, &mut buffer, options)?;
    Ok(buffer)
}

/// Leaderboard rows as a JSON array
pub fn to_json(board: &Leaderboard) -> Result<String, ScoreError> {
    Ok(serde_json::to_string(&board.rows)?)
}

/// Leaderboard rows as a pretty-printed JSON array
pub fn to_json_pretty(board: &Leaderboard) -> Result<String, ScoreError> {
    Ok(serde_json::to_string_pretty(&board.rows)?)
}

/// One JSON row per line
pub fn to_ndjson(board: &Leaderboard) -> Result<String, ScoreError> {
    let mut lines: Vec<String> = Vec::with_capacity(board.rows.len());
    for row in &board.rows {
        lines.push(serde_json::to_string(row)?);
    }
    Ok(lines.join("\n") + "\n")
}

/// Producer metadata stamped on reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
}

/// Report envelope: leaderboard plus run provenance and diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub producer: ReportProducer,
    pub run_id: String,
    pub computed_at_utc: String,
    pub scale_mode: ScaleMode,
    pub module_weights: ModuleWeights,
    pub diagnostics: RunDiagnostics,
    pub rows: Vec<LeaderboardRow>,
}

impl ScoreReport {
    /// Wrap a finished run, stamping a fresh run id and timestamp
    pub fn new(run: &ScoreRun, scale_mode: ScaleMode, module_weights: ModuleWeights) -> Self {
        Self {
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: VERSION.to_string(),
            },
            run_id: Uuid::new_v4().to_string(),
            computed_at_utc: Utc::now().to_rfc3339(),
            scale_mode,
            module_weights,
            diagnostics: run.diagnostics.clone(),
            rows: run.leaderboard.rows.clone(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, ScoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TestModule;

    fn board() -> Leaderboard {
        Leaderboard {
            rows: vec![
                LeaderboardRow {
                    rank: 1,
                    name: "张三".to_string(),
                    display_score: 100.0,
                    module_precision_score: 0.4,
                    module_pressure_score: -0.123456,
                    module_rally_score: 0.0,
                    composite: 0.3,
                    imputed_modules: vec![],
                },
                LeaderboardRow {
                    rank: 2,
                    name: "Li, Si".to_string(),
                    display_score: 60.04,
                    module_precision_score: -0.4,
                    module_pressure_score: 0.0,
                    module_rally_score: 0.0,
                    composite: -0.3,
                    imputed_modules: vec![TestModule::Rally],
                },
            ],
        }
    }

    #[test]
    fn test_csv_has_bom_and_header() {
        let bytes = to_csv(&board(), CsvOptions::default()).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));

        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "rank,name,display_score,module_precision_score,module_pressure_score,module_rally_score"
        );
        assert_eq!(lines.next().unwrap(), "1,张三,100.0,0.4000,-0.1235,0.0000");
        assert_eq!(lines.next().unwrap(), "2,\"Li, Si\",60.0,-0.4000,0.0000,0.0000");
    }

    #[test]
    fn test_csv_without_bom() {
        let bytes = to_csv(&board(), CsvOptions { bom: false, delimiter: b'\t' }).unwrap();
        assert!(bytes.starts_with(b"rank\tname"));
    }

    #[test]
    fn test_json_forms() {
        let json = to_json(&board()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["name"], "张三");
        assert!(value[0].get("imputed_modules").is_none());
        assert_eq!(value[1]["imputed_modules"][0], "rally");

        let ndjson = to_ndjson(&board()).unwrap();
        assert_eq!(ndjson.lines().count(), 2);
    }
}

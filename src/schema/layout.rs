//! Column layout for the bulk test sheet
//!
//! The standard sheet places the three module blocks side by side:
//! - columns 0, 2-5: precision (athlete, task, hand, inbound rate, high-quality rate)
//! - columns 7, 9-12: pressure (same shape)
//! - columns 14, 16-20: rally (athlete, task, shot volume, errors, high-quality rate, consecutive)
//!
//! Columns 1, 6, 8, 13 and 15 are spacers. Any field may instead be bound by
//! header name.

use crate::error::ScoreError;
use crate::types::TestModule;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binding of one logical field to a physical column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnBinding {
    /// Zero-based column position
    Index(usize),
    /// Exact header text (compared after trimming)
    Header(String),
}

impl ColumnBinding {
    fn resolve(&self, headers: &[String], width: usize) -> Option<usize> {
        match self {
            ColumnBinding::Index(idx) if *idx < width => Some(*idx),
            ColumnBinding::Index(_) => None,
            ColumnBinding::Header(name) => {
                let name = name.trim();
                headers.iter().position(|h| h.trim() == name)
            }
        }
    }
}

impl fmt::Display for ColumnBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnBinding::Index(idx) => write!(f, "column #{}", idx),
            ColumnBinding::Header(name) => write!(f, "header \"{}\"", name),
        }
    }
}

/// Column bindings of a precision or pressure block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HittingColumns {
    pub athlete: ColumnBinding,
    pub task: ColumnBinding,
    pub hand: ColumnBinding,
    pub inbound_rate: ColumnBinding,
    pub high_quality_rate: ColumnBinding,
}

impl HittingColumns {
    /// Standard block starting at `first` (athlete), with a spacer at `first + 1`
    pub fn starting_at(first: usize) -> Self {
        Self {
            athlete: ColumnBinding::Index(first),
            task: ColumnBinding::Index(first + 2),
            hand: ColumnBinding::Index(first + 3),
            inbound_rate: ColumnBinding::Index(first + 4),
            high_quality_rate: ColumnBinding::Index(first + 5),
        }
    }

    fn bindings(&self) -> [(&'static str, &ColumnBinding); 5] {
        [
            ("athlete", &self.athlete),
            ("task", &self.task),
            ("hand", &self.hand),
            ("inbound_rate", &self.inbound_rate),
            ("high_quality_rate", &self.high_quality_rate),
        ]
    }
}

/// Column bindings of the rally block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RallyColumns {
    pub athlete: ColumnBinding,
    pub task: ColumnBinding,
    pub shot_volume: ColumnBinding,
    pub error_count: ColumnBinding,
    pub high_quality_rate: ColumnBinding,
    pub consecutive_high_quality: ColumnBinding,
}

impl RallyColumns {
    pub fn starting_at(first: usize) -> Self {
        Self {
            athlete: ColumnBinding::Index(first),
            task: ColumnBinding::Index(first + 2),
            shot_volume: ColumnBinding::Index(first + 3),
            error_count: ColumnBinding::Index(first + 4),
            high_quality_rate: ColumnBinding::Index(first + 5),
            consecutive_high_quality: ColumnBinding::Index(first + 6),
        }
    }

    fn bindings(&self) -> [(&'static str, &ColumnBinding); 6] {
        [
            ("athlete", &self.athlete),
            ("task", &self.task),
            ("shot_volume", &self.shot_volume),
            ("error_count", &self.error_count),
            ("high_quality_rate", &self.high_quality_rate),
            ("consecutive_high_quality", &self.consecutive_high_quality),
        ]
    }
}

/// Complete column contract of the bulk sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub precision: HittingColumns,
    pub pressure: HittingColumns,
    pub rally: RallyColumns,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self::standard()
    }
}

impl ColumnLayout {
    /// The positional layout produced by the standard test sheet
    pub fn standard() -> Self {
        Self {
            precision: HittingColumns::starting_at(0),
            pressure: HittingColumns::starting_at(7),
            rally: RallyColumns::starting_at(14),
        }
    }

    /// Every binding as (module, field, binding), in sheet order
    pub fn fields(&self) -> Vec<(TestModule, &'static str, &ColumnBinding)> {
        let mut fields = Vec::with_capacity(16);
        for (field, binding) in self.precision.bindings() {
            fields.push((TestModule::Precision, field, binding));
        }
        for (field, binding) in self.pressure.bindings() {
            fields.push((TestModule::Pressure, field, binding));
        }
        for (field, binding) in self.rally.bindings() {
            fields.push((TestModule::Rally, field, binding));
        }
        fields
    }

    /// Minimum table width needed by the positional bindings
    pub fn required_width(&self) -> usize {
        self.fields()
            .iter()
            .filter_map(|(_, _, binding)| match binding {
                ColumnBinding::Index(idx) => Some(idx + 1),
                ColumnBinding::Header(_) => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Resolve every binding against a table's headers and width
    pub fn resolve(&self, headers: &[String], width: usize) -> Result<ResolvedLayout, ScoreError> {
        let resolve = |module: TestModule, field: &'static str, binding: &ColumnBinding| {
            binding
                .resolve(headers, width)
                .ok_or_else(|| ScoreError::MissingColumn {
                    module: module.as_str(),
                    field,
                    binding: binding.to_string(),
                    width,
                })
        };

        let hitting = |module: TestModule, cols: &HittingColumns| -> Result<ResolvedHitting, ScoreError> {
            Ok(ResolvedHitting {
                athlete: resolve(module, "athlete", &cols.athlete)?,
                task: resolve(module, "task", &cols.task)?,
                hand: resolve(module, "hand", &cols.hand)?,
                inbound_rate: resolve(module, "inbound_rate", &cols.inbound_rate)?,
                high_quality_rate: resolve(module, "high_quality_rate", &cols.high_quality_rate)?,
            })
        };

        let precision = hitting(TestModule::Precision, &self.precision)?;
        let pressure = hitting(TestModule::Pressure, &self.pressure)?;

        let rally_module = TestModule::Rally;
        let rally = ResolvedRally {
            athlete: resolve(rally_module, "athlete", &self.rally.athlete)?,
            task: resolve(rally_module, "task", &self.rally.task)?,
            shot_volume: resolve(rally_module, "shot_volume", &self.rally.shot_volume)?,
            error_count: resolve(rally_module, "error_count", &self.rally.error_count)?,
            high_quality_rate: resolve(rally_module, "high_quality_rate", &self.rally.high_quality_rate)?,
            consecutive_high_quality: resolve(
                rally_module,
                "consecutive_high_quality",
                &self.rally.consecutive_high_quality,
            )?,
        };

        Ok(ResolvedLayout {
            precision,
            pressure,
            rally,
        })
    }
}

/// Physical column indices of a hitting block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedHitting {
    pub athlete: usize,
    pub task: usize,
    pub hand: usize,
    pub inbound_rate: usize,
    pub high_quality_rate: usize,
}

/// Physical column indices of the rally block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRally {
    pub athlete: usize,
    pub task: usize,
    pub shot_volume: usize,
    pub error_count: usize,
    pub high_quality_rate: usize,
    pub consecutive_high_quality: usize,
}

/// Layout with every binding checked against a concrete table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLayout {
    pub precision: ResolvedHitting,
    pub pressure: ResolvedHitting,
    pub rally: ResolvedRally,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("c{}", i)).collect()
    }

    #[test]
    fn test_standard_layout_indices() {
        let layout = ColumnLayout::standard();
        assert_eq!(layout.required_width(), 21);

        let resolved = layout.resolve(&headers(21), 21).unwrap();
        assert_eq!(resolved.precision.athlete, 0);
        assert_eq!(resolved.precision.high_quality_rate, 5);
        assert_eq!(resolved.pressure.athlete, 7);
        assert_eq!(resolved.pressure.task, 9);
        assert_eq!(resolved.rally.athlete, 14);
        assert_eq!(resolved.rally.consecutive_high_quality, 20);
    }

    #[test]
    fn test_narrow_table_reports_first_missing_column() {
        let err = ColumnLayout::standard().resolve(&headers(20), 20).unwrap_err();
        match err {
            ScoreError::MissingColumn {
                module,
                field,
                width,
                ..
            } => {
                assert_eq!(module, "rally");
                assert_eq!(field, "consecutive_high_quality");
                assert_eq!(width, 20);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_header_binding() {
        let mut layout = ColumnLayout::standard();
        layout.rally.consecutive_high_quality = ColumnBinding::Header("Streak".to_string());

        let mut hdrs = headers(21);
        hdrs[20] = " Streak ".to_string();
        let resolved = layout.resolve(&hdrs, 21).unwrap();
        assert_eq!(resolved.rally.consecutive_high_quality, 20);

        hdrs[20] = "Other".to_string();
        assert!(layout.resolve(&hdrs, 21).is_err());
    }

    #[test]
    fn test_binding_json_forms() {
        let index: ColumnBinding = serde_json::from_str("3").unwrap();
        assert_eq!(index, ColumnBinding::Index(3));
        let header: ColumnBinding = serde_json::from_str("\"Name\"").unwrap();
        assert_eq!(header, ColumnBinding::Header("Name".to_string()));
    }

    #[test]
    fn test_fields_cover_all_blocks() {
        let layout = ColumnLayout::standard();
        let fields = layout.fields();
        assert_eq!(fields.len(), 16);
        assert_eq!(fields[0].0, TestModule::Precision);
        assert_eq!(fields[15].1, "consecutive_high_quality");
    }
}

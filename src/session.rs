//! Interactive entry session
//!
//! This module accumulates attempts entered one at a time on court. The session
//! is an owned value: the caller creates it, passes it to the entry interface,
//! and converts it into attempt records when the athlete is done.

use crate::error::ScoreError;
use crate::types::{HittingAttempt, RallyAttempt};
use serde::{Deserialize, Serialize};

/// Points awarded to one hitting-test shot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ShotScore {
    Out,
    In,
    Deep,
    /// High-quality shot
    Target,
}

impl ShotScore {
    pub fn points(&self) -> u8 {
        match self {
            ShotScore::Out => 0,
            ShotScore::In => 1,
            ShotScore::Deep => 2,
            ShotScore::Target => 4,
        }
    }

    pub fn is_inbound(&self) -> bool {
        !matches!(self, ShotScore::Out)
    }

    pub fn is_high_quality(&self) -> bool {
        matches!(self, ShotScore::Target)
    }
}

impl TryFrom<u8> for ShotScore {
    type Error = ScoreError;

    fn try_from(points: u8) -> Result<Self, Self::Error> {
        match points {
            0 => Ok(ShotScore::Out),
            1 => Ok(ShotScore::In),
            2 => Ok(ShotScore::Deep),
            4 => Ok(ShotScore::Target),
            other => Err(ScoreError::InvalidEntry(format!(
                "shot score must be 0, 1, 2 or 4 (got {})",
                other
            ))),
        }
    }
}

impl From<ShotScore> for u8 {
    fn from(score: ShotScore) -> u8 {
        score.points()
    }
}

/// One rally attempt as entered on court
///
/// Counts are checked on construction and on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RallyEntryFields")]
pub struct RallyEntry {
    shot_count: u32,
    /// True when the rally ended on the athlete's error
    error_flag: bool,
    hq_count: u32,
    consecutive_hq_count: u32,
}

#[derive(Deserialize)]
struct RallyEntryFields {
    shot_count: u32,
    error_flag: bool,
    hq_count: u32,
    consecutive_hq_count: u32,
}

impl TryFrom<RallyEntryFields> for RallyEntry {
    type Error = ScoreError;

    fn try_from(fields: RallyEntryFields) -> Result<Self, Self::Error> {
        RallyEntry::new(
            fields.shot_count,
            fields.error_flag,
            fields.hq_count,
            fields.consecutive_hq_count,
        )
    }
}

impl RallyEntry {
    pub fn new(
        shot_count: u32,
        error_flag: bool,
        hq_count: u32,
        consecutive_hq_count: u32,
    ) -> Result<Self, ScoreError> {
        if hq_count > shot_count {
            return Err(ScoreError::InvalidEntry(format!(
                "high-quality count {} exceeds shot count {}",
                hq_count, shot_count
            )));
        }
        if consecutive_hq_count > shot_count {
            return Err(ScoreError::InvalidEntry(format!(
                "consecutive high-quality count {} exceeds shot count {}",
                consecutive_hq_count, shot_count
            )));
        }
        Ok(Self {
            shot_count,
            error_flag,
            hq_count,
            consecutive_hq_count,
        })
    }

    pub fn shot_count(&self) -> u32 {
        self.shot_count
    }

    pub fn error_flag(&self) -> bool {
        self.error_flag
    }

    pub fn hq_count(&self) -> u32 {
        self.hq_count
    }

    pub fn consecutive_hq_count(&self) -> u32 {
        self.consecutive_hq_count
    }

    pub fn high_quality_rate(&self) -> f64 {
        if self.shot_count == 0 {
            return 0.0;
        }
        self.hq_count as f64 / self.shot_count as f64
    }
}

/// One buffered entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
    Shot { score: ShotScore },
    Rally(RallyEntry),
}

/// Summary of the buffered hitting shots
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShotSummary {
    pub count: usize,
    pub inbound_rate: f64,
    pub high_quality_rate: f64,
    pub total_points: u64,
}

/// Summary of the buffered rally attempts
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RallySummary {
    pub attempts: usize,
    pub total_shots: u64,
    pub errors: usize,
    pub high_quality_rate: f64,
    pub best_consecutive: u32,
}

/// Summary of the whole buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub shots: ShotSummary,
    pub rallies: RallySummary,
}

/// Append-only entry buffer with undo and clear
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntrySession {
    entries: Vec<Entry>,
}

impl EntrySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_shot(&mut self, score: ShotScore) {
        self.entries.push(Entry::Shot { score });
    }

    /// Append a shot from its raw point value
    pub fn push_points(&mut self, points: u8) -> Result<(), ScoreError> {
        self.push_shot(ShotScore::try_from(points)?);
        Ok(())
    }

    pub fn push_rally(&mut self, rally: RallyEntry) {
        self.entries.push(Entry::Rally(rally));
    }

    /// Remove and return the most recent entry of either kind
    pub fn undo_last(&mut self) -> Option<Entry> {
        self.entries.pop()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn shots(&self) -> impl Iterator<Item = ShotScore> + '_ {
        self.entries.iter().filter_map(|e| match e {
            Entry::Shot { score } => Some(*score),
            Entry::Rally(_) => None,
        })
    }

    fn rallies(&self) -> impl Iterator<Item = &RallyEntry> + '_ {
        self.entries.iter().filter_map(|e| match e {
            Entry::Rally(rally) => Some(rally),
            Entry::Shot { .. } => None,
        })
    }

    /// Summarize the buffer; rates of an empty buffer are 0
    pub fn summarize(&self) -> SessionSummary {
        let mut shots = ShotSummary::default();
        let mut inbound = 0usize;
        let mut high_quality = 0usize;
        for shot in self.shots() {
            shots.count += 1;
            shots.total_points += u64::from(shot.points());
            inbound += usize::from(shot.is_inbound());
            high_quality += usize::from(shot.is_high_quality());
        }
        if shots.count > 0 {
            shots.inbound_rate = inbound as f64 / shots.count as f64;
            shots.high_quality_rate = high_quality as f64 / shots.count as f64;
        }

        let mut rallies = RallySummary::default();
        let mut hq_total = 0u64;
        for rally in self.rallies() {
            rallies.attempts += 1;
            rallies.total_shots += u64::from(rally.shot_count);
            rallies.errors += usize::from(rally.error_flag);
            rallies.best_consecutive = rallies.best_consecutive.max(rally.consecutive_hq_count);
            hq_total += u64::from(rally.hq_count);
        }
        if rallies.total_shots > 0 {
            rallies.high_quality_rate = hq_total as f64 / rallies.total_shots as f64;
        }

        SessionSummary { shots, rallies }
    }

    /// The buffered shots as one precision/pressure attempt; `None` without shots
    pub fn to_hitting_attempt(&self, athlete_id: &str, task_label: &str, hand: Option<&str>) -> Option<HittingAttempt> {
        let summary = self.summarize().shots;
        if summary.count == 0 {
            return None;
        }
        Some(HittingAttempt {
            athlete_id: athlete_id.trim().to_string(),
            task_label: task_label.trim().to_string(),
            dominant_hand: hand.map(|h| h.trim().to_string()),
            inbound_rate: Some(summary.inbound_rate),
            high_quality_rate: Some(summary.high_quality_rate),
        })
    }

    /// The buffered rallies as rally attempt records, in entry order
    pub fn to_rally_attempts(&self, athlete_id: &str, task_label: &str) -> Vec<RallyAttempt> {
        self.rallies()
            .map(|rally| RallyAttempt {
                athlete_id: athlete_id.trim().to_string(),
                task_label: task_label.trim().to_string(),
                shot_volume: rally.shot_count as f64,
                error_count: if rally.error_flag { 1.0 } else { 0.0 },
                high_quality_rate: rally.high_quality_rate(),
                consecutive_high_quality_count: rally.consecutive_hq_count as f64,
            })
            .collect()
    }

    /// Load a session from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the session to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

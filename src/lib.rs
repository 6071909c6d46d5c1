//! Groundstroke - Scoring engine for tennis baseline hitting tests
//!
//! Groundstroke turns a bulk test sheet into a ranked leaderboard through a
//! deterministic pipeline: row extraction → per-task standardization → module
//! aggregation → composite merge → display-score mapping.
//!
//! ## Modules
//!
//! - **Precision / Pressure**: Hitting tests scored from inbound and high-quality rates
//! - **Rally**: Sustained baseline rallies scored per attempt
//! - **Entry session**: Court-side accumulator for one athlete's attempts

pub mod aggregator;
pub mod alias;
pub mod composite;
pub mod config;
pub mod encoder;
pub mod error;
pub mod extractor;
pub mod mapper;
pub mod pipeline;
pub mod schema;
pub mod session;
pub mod standardizer;
pub mod types;

pub use composite::ModuleWeights;
pub use config::ScoringConfig;
pub use error::ScoreError;
pub use mapper::{ScaleMode, ScoreMapper};
pub use pipeline::{score_csv, RunDiagnostics, ScoreRun, Scorer};

// Schema exports
pub use schema::{ColumnLayout, RawTable};

// Entry exports
pub use session::{EntrySession, RallyEntry, ShotScore};

pub use types::{Leaderboard, LeaderboardRow, TestModule};

/// Groundstroke version embedded in reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "groundstroke";

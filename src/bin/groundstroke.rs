//! Groundstroke CLI - Command-line interface for the Groundstroke scoring engine
//!
//! Commands:
//! - score: Score a bulk test sheet into a ranked leaderboard
//! - validate: Check a sheet against the column contract without scoring
//! - record: Court-side entry of one athlete's attempts
//! - layout: Print the column contract

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use groundstroke::alias::AliasTable;
use groundstroke::encoder::{self, CsvOptions, ScoreReport};
use groundstroke::extractor::ExtractionStats;
use groundstroke::schema::{ColumnBinding, ColumnLayout, RawTable};
use groundstroke::session::{EntrySession, RallyEntry, SessionSummary};
use groundstroke::standardizer::Dispersion;
use groundstroke::types::{HittingAttempt, RallyAttempt, TestModule};
use groundstroke::{ScaleMode, ScoreError, Scorer, ScoringConfig, PRODUCER_NAME, VERSION};

/// Groundstroke - Scoring engine for tennis baseline hitting tests
#[derive(Parser)]
#[command(name = "groundstroke")]
#[command(version = VERSION)]
#[command(about = "Score baseline hitting tests into a ranked leaderboard", long_about = None)]
struct Cli {
    /// Log pipeline progress (info level) to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a bulk test sheet
    Score {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "csv")]
        format: OutputFormat,

        /// Scoring configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Display scale
        #[arg(long)]
        scale_mode: Option<ScaleArg>,

        /// Rally module weight
        #[arg(long)]
        w_rally: Option<f64>,

        /// Pressure module weight
        #[arg(long)]
        w_pressure: Option<f64>,

        /// Precision module weight
        #[arg(long)]
        w_precision: Option<f64>,

        /// Identity alias as OLD=NEW (repeatable)
        #[arg(long)]
        alias: Vec<String>,

        /// Standard deviation denominator
        #[arg(long)]
        dispersion: Option<DispersionArg>,

        /// Field delimiter of the input and CSV output
        #[arg(long, default_value = ",")]
        delimiter: char,

        /// Omit the UTF-8 byte-order mark from CSV output
        #[arg(long)]
        no_bom: bool,
    },

    /// Check a sheet against the column contract
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Scoring configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Field delimiter
        #[arg(long, default_value = ",")]
        delimiter: char,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record attempts from stdin, one entry per line
    Record {
        /// Resume a saved session
        #[arg(long)]
        load: Option<PathBuf>,

        /// Save the session on exit
        #[arg(long)]
        save: Option<PathBuf>,

        /// Athlete name for converted attempt records
        #[arg(long)]
        athlete: Option<String>,

        /// Task label for converted attempt records
        #[arg(long)]
        task: Option<String>,

        /// Dominant hand for converted hitting attempts
        #[arg(long)]
        hand: Option<String>,

        /// Module the entries belong to
        #[arg(long)]
        module: Option<ModuleArg>,
    },

    /// Print the column contract
    Layout {
        /// Scoring configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Delimited leaderboard
    Csv,
    /// JSON array of leaderboard rows
    Json,
    /// Pretty-printed JSON array
    JsonPretty,
    /// Newline-delimited JSON (one row per line)
    Ndjson,
    /// Report envelope with run provenance and diagnostics
    Report,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScaleArg {
    Bounded,
    Affine,
}

impl From<ScaleArg> for ScaleMode {
    fn from(arg: ScaleArg) -> Self {
        match arg {
            ScaleArg::Bounded => ScaleMode::Bounded,
            ScaleArg::Affine => ScaleMode::Affine,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DispersionArg {
    Population,
    Sample,
}

impl From<DispersionArg> for Dispersion {
    fn from(arg: DispersionArg) -> Self {
        match arg {
            DispersionArg::Population => Dispersion::Population,
            DispersionArg::Sample => Dispersion::Sample,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModuleArg {
    Precision,
    Pressure,
    Rally,
}

impl From<ModuleArg> for TestModule {
    fn from(arg: ModuleArg) -> Self {
        match arg {
            ModuleArg::Precision => TestModule::Precision,
            ModuleArg::Pressure => TestModule::Pressure,
            ModuleArg::Rally => TestModule::Rally,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "groundstroke=info" } else { "groundstroke=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliFailure> {
    match cli.command {
        Commands::Score {
            input,
            output,
            format,
            config,
            scale_mode,
            w_rally,
            w_pressure,
            w_precision,
            alias,
            dispersion,
            delimiter,
            no_bom,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(mode) = scale_mode {
                config.scale_mode = mode.into();
            }
            if let Some(w) = w_rally {
                config.module_weights.rally = w;
            }
            if let Some(w) = w_pressure {
                config.module_weights.pressure = w;
            }
            if let Some(w) = w_precision {
                config.module_weights.precision = w;
            }
            if let Some(d) = dispersion {
                config.dispersion = d.into();
            }
            config.aliases.extend(&parse_aliases(&alias)?);

            let delimiter = delimiter_byte(delimiter)?;
            cmd_score(&input, &output, format, config, delimiter, !no_bom)
        }

        Commands::Validate {
            input,
            config,
            delimiter,
            json,
        } => {
            let config = load_config(config.as_deref())?;
            cmd_validate(&input, config, delimiter_byte(delimiter)?, json)
        }

        Commands::Record {
            load,
            save,
            athlete,
            task,
            hand,
            module,
        } => cmd_record(
            load.as_deref(),
            save.as_deref(),
            athlete.as_deref(),
            task.as_deref(),
            hand.as_deref(),
            module.map(TestModule::from),
        ),

        Commands::Layout { config, json } => {
            let config = load_config(config.as_deref())?;
            cmd_layout(&config.layout, json)
        }
    }
}

fn cmd_score(
    input: &Path,
    output: &Path,
    format: OutputFormat,
    config: ScoringConfig,
    delimiter: u8,
    bom: bool,
) -> Result<(), CliFailure> {
    let table = read_table(input, delimiter)?;
    let scale_mode = config.scale_mode;
    let module_weights = config.module_weights;

    let scorer = Scorer::new(config)?;
    let run = scorer.score_table(&table)?;

    let output_data = match format {
        OutputFormat::Csv => encoder::to_csv(&run.leaderboard, CsvOptions { bom, delimiter })?,
        OutputFormat::Json => encoder::to_json(&run.leaderboard)?.into_bytes(),
        OutputFormat::JsonPretty => encoder::to_json_pretty(&run.leaderboard)?.into_bytes(),
        OutputFormat::Ndjson => encoder::to_ndjson(&run.leaderboard)?.into_bytes(),
        OutputFormat::Report => ScoreReport::new(&run, scale_mode, module_weights)
            .to_json_pretty()?
            .into_bytes(),
    };

    write_output(output, &output_data)
}

fn cmd_validate(input: &Path, config: ScoringConfig, delimiter: u8, json: bool) -> Result<(), CliFailure> {
    let table = read_table(input, delimiter)?;
    let scorer = Scorer::new(config)?;
    let tables = scorer.extract(&table)?;

    let report = ValidationReport {
        rows: table.row_count(),
        columns: table.width(),
        required_columns: scorer.config().layout.required_width(),
        precision_attempts: tables.precision.len(),
        pressure_attempts: tables.pressure.len(),
        rally_attempts: tables.rally.len(),
        extraction: tables.stats,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Rows:               {}", report.rows);
        println!("Columns:            {} (layout needs {})", report.columns, report.required_columns);
        println!("Precision attempts: {}", report.precision_attempts);
        println!("Pressure attempts:  {}", report.pressure_attempts);
        println!("Rally attempts:     {}", report.rally_attempts);

        let stats = &report.extraction;
        if stats.dropped_missing_identity.total() > 0 || stats.dropped_missing_task.total() > 0 {
            println!("\nDropped rows:");
            for module in TestModule::ALL {
                println!(
                    "  - {}: {} without athlete, {} without task",
                    module,
                    stats.dropped_missing_identity.get(module),
                    stats.dropped_missing_task.get(module)
                );
            }
        }
        if stats.coerced_rally_cells > 0 {
            println!("\nRally cells read as 0: {}", stats.coerced_rally_cells);
        }
    }

    Ok(())
}

fn cmd_record(
    load: Option<&Path>,
    save: Option<&Path>,
    athlete: Option<&str>,
    task: Option<&str>,
    hand: Option<&str>,
    module: Option<TestModule>,
) -> Result<(), CliFailure> {
    let mut session = match load {
        Some(path) => EntrySession::from_json(&fs::read_to_string(path)?)?,
        None => EntrySession::new(),
    };

    let interactive = atty::is(atty::Stream::Stdin);
    if interactive {
        eprintln!("Enter 0, 1, 2 or 4 per shot; `rally N E H C`; `undo`; `clear`; `summary`. Ctrl-D to finish.");
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();
    loop {
        if interactive {
            eprint!("> ");
            io::stderr().flush()?;
        }
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        match apply_entry(&mut session, line.trim()) {
            Ok(EntryOutcome::Summary) => {
                writeln!(stdout, "{}", serde_json::to_string(&session.summarize())?)?;
                stdout.flush()?;
            }
            Ok(EntryOutcome::Applied) => {}
            Err(e) if interactive => eprintln!("{}", e),
            Err(e) => return Err(e.into()),
        }
    }

    if let Some(path) = save {
        fs::write(path, session.to_json()?)?;
    }

    let mut record = RecordOutput {
        summary: session.summarize(),
        module,
        hitting: None,
        rally: Vec::new(),
    };
    if let (Some(athlete), Some(task), Some(module)) = (athlete, task, module) {
        match module {
            TestModule::Rally => record.rally = session.to_rally_attempts(athlete, task),
            TestModule::Precision | TestModule::Pressure => {
                record.hitting = session.to_hitting_attempt(athlete, task, hand)
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

enum EntryOutcome {
    Applied,
    Summary,
}

fn apply_entry(session: &mut EntrySession, line: &str) -> Result<EntryOutcome, ScoreError> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(EntryOutcome::Applied);
    };

    match head {
        "undo" => {
            if session.undo_last().is_none() {
                tracing::info!("nothing to undo");
            }
        }
        "clear" => session.clear(),
        "summary" => return Ok(EntryOutcome::Summary),
        "rally" => {
            let fields: Vec<&str> = parts.collect();
            let [shots, error, hq, consecutive] = fields.as_slice() else {
                return Err(ScoreError::InvalidEntry(format!(
                    "expected `rally <shots> <error 0|1> <hq> <consecutive>`, got {:?}",
                    line
                )));
            };
            let error_flag = match *error {
                "0" => false,
                "1" => true,
                other => {
                    return Err(ScoreError::InvalidEntry(format!(
                        "rally error flag must be 0 or 1 (got {:?})",
                        other
                    )))
                }
            };
            session.push_rally(RallyEntry::new(
                parse_count(shots)?,
                error_flag,
                parse_count(hq)?,
                parse_count(consecutive)?,
            )?);
        }
        points => {
            let points: u8 = points
                .parse()
                .map_err(|_| ScoreError::InvalidEntry(format!("unrecognized entry {:?}", line)))?;
            session.push_points(points)?;
        }
    }
    Ok(EntryOutcome::Applied)
}

fn parse_count(text: &str) -> Result<u32, ScoreError> {
    text.parse()
        .map_err(|_| ScoreError::InvalidEntry(format!("expected a whole number, got {:?}", text)))
}

fn cmd_layout(layout: &ColumnLayout, json: bool) -> Result<(), CliFailure> {
    if json {
        println!("{}", serde_json::to_string_pretty(layout)?);
        return Ok(());
    }

    println!("Column Contract");
    println!("===============");
    for (module, field, binding) in layout.fields() {
        let location = match binding {
            ColumnBinding::Index(idx) => format!("column #{}", idx),
            ColumnBinding::Header(name) => format!("header {:?}", name),
        };
        println!("{:<10} {:<26} {}", module.as_str(), field, location);
    }
    println!("\nMinimum width: {} columns", layout.required_width());
    Ok(())
}

// Helpers

fn is_stdio(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn load_config(path: Option<&Path>) -> Result<ScoringConfig, CliFailure> {
    match path {
        Some(path) => Ok(ScoringConfig::from_path(path)?),
        None => Ok(ScoringConfig::default()),
    }
}

fn read_table(input: &Path, delimiter: u8) -> Result<RawTable, CliFailure> {
    if is_stdio(input) {
        Ok(RawTable::from_reader(io::stdin().lock(), delimiter)?)
    } else {
        Ok(RawTable::from_path(input, delimiter)?)
    }
}

fn write_output(output: &Path, data: &[u8]) -> Result<(), CliFailure> {
    if is_stdio(output) {
        let mut stdout = io::stdout();
        stdout.write_all(data)?;
        stdout.flush()?;
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn delimiter_byte(delimiter: char) -> Result<u8, CliFailure> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| CliFailure::Usage(format!("delimiter must be a single ASCII character (got {:?})", delimiter)))
}

fn parse_aliases(pairs: &[String]) -> Result<AliasTable, CliFailure> {
    let mut table = AliasTable::new();
    for pair in pairs {
        let (alias, canonical) = AliasTable::parse_pair(pair)
            .ok_or_else(|| CliFailure::Usage(format!("alias must look like OLD=NEW (got {:?})", pair)))?;
        table.insert(alias, canonical);
    }
    Ok(table)
}

// Error types

#[derive(Debug)]
enum CliFailure {
    Io(io::Error),
    Score(ScoreError),
    Json(serde_json::Error),
    Usage(String),
}

impl From<io::Error> for CliFailure {
    fn from(e: io::Error) -> Self {
        CliFailure::Io(e)
    }
}

impl From<ScoreError> for CliFailure {
    fn from(e: ScoreError) -> Self {
        CliFailure::Score(e)
    }
}

impl From<serde_json::Error> for CliFailure {
    fn from(e: serde_json::Error) -> Self {
        CliFailure::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CliFailure> for CliError {
    fn from(e: CliFailure) -> Self {
        match e {
            CliFailure::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CliFailure::Score(e) if e.is_malformed_input() => CliError {
                code: "MALFORMED_INPUT".to_string(),
                message: e.to_string(),
                hint: Some(format!("Compare the sheet with '{} layout'", PRODUCER_NAME)),
            },
            CliFailure::Score(ScoreError::InvalidConfig(msg)) => CliError {
                code: "INVALID_CONFIG".to_string(),
                message: msg,
                hint: Some("All weights and scale parameters must be finite".to_string()),
            },
            CliFailure::Score(ScoreError::InvalidEntry(msg)) => CliError {
                code: "INVALID_ENTRY".to_string(),
                message: msg,
                hint: Some("Shots are 0, 1, 2 or 4; rallies are `rally N E H C`".to_string()),
            },
            CliFailure::Score(e) => CliError {
                code: "SCORE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            CliFailure::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CliFailure::Usage(msg) => CliError {
                code: "USAGE_ERROR".to_string(),
                message: msg,
                hint: Some(format!("Run '{} --help'", PRODUCER_NAME)),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct ValidationReport {
    rows: usize,
    columns: usize,
    required_columns: usize,
    precision_attempts: usize,
    pressure_attempts: usize,
    rally_attempts: usize,
    extraction: ExtractionStats,
}

#[derive(Serialize)]
struct RecordOutput {
    summary: SessionSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    module: Option<TestModule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hitting: Option<HittingAttempt>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    rally: Vec<RallyAttempt>,
}

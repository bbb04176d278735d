//! CLI entrypoint for the memops conformance harness.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use memops_core::{FillSweep, MemorySpaceKind};
use memops_harness::config::parse_fill_arg;
use memops_harness::structured_log::{
    ArtifactIndex, LogEmitter, LogEntry, LogLevel, Outcome, StreamKind, now_utc, validate_log_file,
};
use memops_harness::verify::VerificationResult;
use memops_harness::{
    ConformanceReport, HarnessConfig, HarnessError, RunReport, TestRunner, copiers, scenarios,
};

const SUITE: &str = "memops";

/// Conformance tooling for replaceable memcpy routines.
#[derive(Debug, Parser)]
#[command(name = "memops-harness")]
#[command(about = "Differential conformance harness for replaceable memcpy routines")]
struct Cli {
    /// Show debug records from the patcher and engine (RUST_LOG also applies).
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the full case space for one candidate.
    Run {
        /// Copier under test (see `list`).
        #[arg(long, default_value = "wordwise")]
        candidate: String,
        /// Copier to compare against (default: the byte-wise reference).
        #[arg(long)]
        reference: Option<String>,
        /// Fill sweep; overrides MEMOPS_FILL_SWEEP.
        #[arg(long)]
        fill: Option<String>,
        /// Parallel shards; overrides MEMOPS_SHARDS.
        #[arg(long)]
        shards: Option<u64>,
        /// Output report path (markdown); JSON is written alongside.
        #[arg(long)]
        report: Option<PathBuf>,
        /// Structured JSONL log path.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Optional fixed timestamp string for deterministic report generation.
        #[arg(long)]
        timestamp: Option<String>,
    },
    /// Run the four seed scenarios.
    Scenarios {
        #[arg(long, default_value = "wordwise")]
        candidate: String,
        /// Structured JSONL log path.
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// List copiers, fill sweeps and memory spaces.
    List,
    /// Validate a structured JSONL log.
    ValidateLog {
        #[arg(long)]
        log: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();
}

fn run_id() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("run-{secs}-{}", std::process::id())
}

fn log_run(
    path: &Path,
    runner: &TestRunner,
    report: &RunReport,
    artifacts: &[PathBuf],
) -> Result<(), HarnessError> {
    let id = run_id();
    let mut emitter = LogEmitter::to_file(path, SUITE, &id)?;
    let fill = runner.config.fill;
    emitter.emit_entry(
        LogEntry::new("", LogLevel::Info, "run_start")
            .with_stream(StreamKind::Conformance)
            .with_gate("run")
            .with_copier(runner.candidate_name())
            .with_fill(fill)
            .with_case_count(runner.case_space().len())
            .with_details(serde_json::json!({
                "reference": runner.reference_name(),
                "shards": runner.config.shards,
            })),
    )?;

    for result in &report.summary.results {
        // A space cut short by another space's failure is a warning.
        let level = match (result.passed, &result.failure) {
            (true, _) => LogLevel::Info,
            (false, Some(_)) => LogLevel::Error,
            (false, None) => LogLevel::Warn,
        };
        let mut entry = LogEntry::new("", level, "space_done")
            .with_stream(StreamKind::Conformance)
            .with_gate("run")
            .with_copier(runner.candidate_name())
            .with_fill(fill)
            .with_case_count(result.cases_passed)
            .with_outcome(if result.passed { Outcome::Pass } else { Outcome::Fail });
        if let Some(kind) = MemorySpaceKind::from_str_loose(&result.case_name) {
            entry = entry.with_space(kind);
        }
        if !result.passed {
            entry = entry.with_details(serde_json::to_value(result)?);
        }
        emitter.emit_entry(entry)?;
    }

    let mut end = LogEntry::new("", LogLevel::Info, "run_end")
        .with_stream(StreamKind::Conformance)
        .with_gate("run")
        .with_copier(runner.candidate_name())
        .with_case_count(report.tally.total())
        .with_duration_ms(report.duration_ms)
        .with_artifacts(artifacts.iter().map(|p| p.display().to_string()).collect());
    end = match &report.mismatch {
        None => end.with_outcome(Outcome::Pass),
        Some(mismatch) => end
            .with_outcome(Outcome::Fail)
            .with_details(serde_json::json!({ "mismatch": mismatch.to_string() })),
    };
    emitter.emit_entry(end)?;
    emitter.flush()?;

    if !artifacts.is_empty() {
        let mut index = ArtifactIndex::new(id);
        for artifact in artifacts {
            let kind = artifact
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or("file")
                .to_string();
            index.add_file(artifact, kind)?;
        }
        index.add_file(path, "log")?;
        let index_path = path.with_extension("artifacts.json");
        std::fs::write(&index_path, index.to_json()?)?;
        eprintln!("Wrote artifact index to {}", index_path.display());
    }
    Ok(())
}

fn log_scenarios(
    path: &Path,
    candidate: &str,
    results: &[VerificationResult],
) -> Result<(), HarnessError> {
    let mut emitter = LogEmitter::to_file(path, SUITE, &run_id())?;
    for result in results {
        let mut entry = LogEntry::new(
            "",
            if result.passed { LogLevel::Info } else { LogLevel::Error },
            "scenario_done",
        )
        .with_stream(StreamKind::Scenario)
        .with_gate("scenarios")
        .with_copier(candidate)
        .with_case_count(result.cases_passed)
        .with_outcome(if result.passed { Outcome::Pass } else { Outcome::Fail })
        .with_details(serde_json::to_value(result)?);
        if let Some(scenario) = scenarios::SEED_SCENARIOS
            .iter()
            .find(|s| s.name == result.case_name)
        {
            entry = entry.with_space(scenario.space);
        }
        emitter.emit_entry(entry)?;
    }
    emitter.flush()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run {
            candidate,
            reference,
            fill,
            shards,
            report,
            log,
            timestamp,
        } => {
            let fill = fill.as_deref().map(parse_fill_arg).transpose()?;
            let config = HarnessConfig::from_env().with_overrides(fill, shards);
            let runner = TestRunner::from_names(reference.as_deref(), &candidate, config)?;
            eprintln!(
                "Running {} against {}: fill={}, shards={}, cases={}",
                runner.candidate_name(),
                runner.reference_name(),
                runner.config.fill,
                runner.config.shards,
                runner.case_space().len()
            );

            let run = runner.run()?;
            let mut cumulative = 0;
            for result in &run.summary.results {
                cumulative += result.cases_passed;
                eprintln!("Memory space: {}", result.case_name);
                if result.passed {
                    eprintln!("{cumulative} tests Ok");
                } else if let Some(failure) = &result.failure {
                    eprintln!("FAILED {}", failure.message);
                } else {
                    eprintln!(
                        "{} of {} cases run before the stop",
                        result.cases_passed, result.cases_planned
                    );
                }
            }

            let report_doc = ConformanceReport {
                title: String::from("memcpy Conformance Report"),
                candidate: runner.candidate_name().to_string(),
                reference: runner.reference_name().to_string(),
                fill: runner.config.fill.to_string(),
                shards: runner.config.shards,
                timestamp: timestamp.unwrap_or_else(now_utc),
                summary: run.summary.clone(),
            };

            let mut artifacts = Vec::new();
            if let Some(report_path) = report {
                eprintln!("Writing report to {}", report_path.display());
                std::fs::write(&report_path, report_doc.to_markdown())?;
                let json_path = report_path.with_extension("json");
                std::fs::write(&json_path, report_doc.to_json())?;
                artifacts.push(report_path);
                artifacts.push(json_path);
            }
            if let Some(log_path) = log {
                log_run(&log_path, &runner, &run, &artifacts)?;
                eprintln!("Wrote structured log to {}", log_path.display());
            }

            eprintln!(
                "Conformance complete in {} ms: cases passed={}, spaces passed={}/{}",
                run.duration_ms,
                run.tally.total(),
                report_doc.summary.passed,
                report_doc.summary.total
            );
            if let Some(mismatch) = run.mismatch {
                return Err(HarnessError::Mismatch(mismatch).into());
            }
        }
        Command::Scenarios { candidate, log } => {
            let copier = copiers::lookup(&candidate)?;
            let results = scenarios::run_scenarios(copier);
            for result in &results {
                let status = if result.passed { "PASS" } else { "FAIL" };
                eprintln!("{status} {}", result.case_name);
                if let Some(failure) = &result.failure {
                    eprintln!("  {}", failure.message);
                }
                if let Some(diff) = &result.diff {
                    eprintln!("{diff}");
                }
            }
            if let Some(log_path) = log {
                log_scenarios(&log_path, &candidate, &results)?;
            }
            if results.iter().any(|r| !r.passed) {
                return Err("Seed scenarios failed".into());
            }
        }
        Command::List => {
            println!("Copiers:");
            for info in copiers::registry() {
                let tag = if info.faulty { " [faulty]" } else { "" };
                println!("  {:<16} {}{tag}", info.name, info.description);
            }
            println!("Fill sweeps:");
            for sweep in FillSweep::ALL {
                let marker = if sweep == FillSweep::default() { " (default)" } else { "" };
                println!("  {:<16} {} values{marker}", sweep.name(), sweep.len());
            }
            println!("Memory spaces:");
            for kind in MemorySpaceKind::ALL {
                println!("  {:<16} {}", kind.slug(), kind.name());
            }
        }
        Command::ValidateLog { log } => {
            let (lines, errors) = validate_log_file(&log)?;
            for error in &errors {
                eprintln!("{error}");
            }
            if !errors.is_empty() {
                return Err(HarnessError::InvalidLog {
                    lines,
                    errors: errors.len(),
                }
                .into());
            }
            eprintln!("{} valid log line(s) in {}", lines, log.display());
        }
    }

    Ok(())
}

//! SGEN command line
//!
//! - `sgen correct <FILE>` prints the auto-corrected script body
//! - `sgen validate <FILE> [--json]` lists residual defects, exiting 1 if any
//! - `sgen replay <FILE>` streams a recorded generator output through a full
//!   session and prints the finished artifact

#![allow(missing_docs)]

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde::Serialize;
use sgen_core::{GenerationReport, GenerationSession, Notice, ReplayGenerator, SessionConfig};
use sgen_correct::{correct, strip_code_fence, validate, ValidationReport};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Command definition
#[must_use]
pub fn build_cli() -> Command {
    Command::new("sgen")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Correct, validate and replay generated SQL scripts")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines on stderr"),
        )
        .subcommand(
            Command::new("correct")
                .about("Print the auto-corrected script body")
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("validate")
                .about("Report residual defects (exit status 1 when any are found)")
                .arg(file_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("replay")
                .about("Stream a recorded generator output through a session")
                .arg(file_arg())
                .arg(
                    Arg::new("chunk-size")
                        .long("chunk-size")
                        .default_value("16")
                        .value_parser(value_parser!(usize))
                        .help("Characters per replayed fragment"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Session configuration (TOML)"),
                )
                .arg(
                    Arg::new("source")
                        .long("source")
                        .default_value("replayed generator output")
                        .help("Source text recorded with the session"),
                )
                .arg(json_arg()),
        )
}

fn file_arg() -> Arg {
    Arg::new("file")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Script file")
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output as JSON")
}

/// Install the global subscriber; `RUST_LOG` overrides the `info` default
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    // Ignore a second installation (tests)
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Dispatch parsed arguments
///
/// # Errors
/// Unreadable input or configuration files
pub async fn run(matches: &ArgMatches) -> Result<ExitCode> {
    match matches.subcommand() {
        Some(("correct", args)) => {
            let text = read_file(args)?;
            print!("{}", correct_text(&text));
            Ok(ExitCode::SUCCESS)
        }
        Some(("validate", args)) => {
            let text = read_file(args)?;
            let report = validate(&text);
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.is_clean() {
                println!("No defects found");
            } else {
                print!("{report}");
            }
            Ok(if report.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Some(("replay", args)) => {
            let recorded = read_file(args)?;
            let config = match args.get_one::<PathBuf>("config") {
                Some(path) => load_config(path)?,
                None => SessionConfig::default(),
            };
            let chunk_size = args.get_one::<usize>("chunk-size").copied().unwrap_or(16);
            let source = args
                .get_one::<String>("source")
                .map_or("replayed generator output", String::as_str);

            let summary = replay(&recorded, chunk_size, config, source).await?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", summary.render_text());
            }
            Ok(ExitCode::SUCCESS)
        }
        _ => Ok(ExitCode::FAILURE),
    }
}

fn read_file(args: &ArgMatches) -> Result<String> {
    let path = args
        .get_one::<PathBuf>("file")
        .context("missing script file")?;
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Strip any code fence, then auto-correct
#[must_use]
pub fn correct_text(raw: &str) -> String {
    correct(strip_code_fence(raw))
}

/// Load a session configuration file
///
/// # Errors
/// Unreadable file or invalid TOML
pub fn load_config(path: &Path) -> Result<SessionConfig> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_config(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Parse a session configuration; missing keys take their defaults
///
/// # Errors
/// Invalid TOML or mistyped values
pub fn parse_config(text: &str) -> Result<SessionConfig> {
    Ok(toml::from_str(text)?)
}

/// What a replayed session ended with
#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    pub artifact: String,
    pub tag: Option<String>,
    pub progress: u8,
    pub defects: ValidationReport,
    pub notices: Vec<Notice>,
}

impl ReplaySummary {
    fn from_session(session: &GenerationSession, report: GenerationReport) -> Self {
        Self {
            artifact: session.current_artifact().text(),
            tag: report.tag,
            progress: session.current_progress(),
            defects: report.validation,
            notices: report.notices,
        }
    }

    /// Human-readable rendering
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = self.artifact.clone();
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&format!(
            "-- tag: {}\n",
            self.tag.as_deref().unwrap_or("(none)")
        ));
        for defect in self.defects.messages() {
            out.push_str(&format!("-- defect: {defect}\n"));
        }
        for notice in &self.notices {
            out.push_str(&format!("-- notice: {notice}\n"));
        }
        out
    }
}

/// Run `recorded` through a session as if a generator had produced it
///
/// # Errors
/// Rejections from the session (e.g. blank source text)
pub async fn replay(
    recorded: &str,
    chunk_size: usize,
    config: SessionConfig,
    source: &str,
) -> Result<ReplaySummary> {
    let generator = Arc::new(ReplayGenerator::new(recorded, chunk_size));
    let mut session = GenerationSession::builder(generator)
        .with_config(config)
        .build();
    tracing::info!(session = %session.id(), chunk_size, "replaying recorded output");

    let report = session.start_generation(source).await?;
    Ok(ReplaySummary::from_session(&session, report))
}

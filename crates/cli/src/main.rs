// ledgermatch - processor-export / exchange-ledger reconciliation

mod exit_codes;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use ledgermatch_engine::{extract, report, store, Matcher, MatchError, RunConfig};

use exit_codes::{exit_code_for, EXIT_INVALID_CONFIG, EXIT_SUCCESS};

#[derive(Parser)]
#[command(name = "ledgermatch")]
#[command(about = "Match payment-processor exports against the internal exchange ledger")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full reconciliation pass and write the CSV reports
    #[command(after_help = "\
Examples:
  ledgermatch run audit.toml
  ledgermatch run audit.toml --output audits/june
  ledgermatch run audit.toml --assume-yes")]
    Run {
        /// TOML run configuration
        config: PathBuf,

        /// Override the configured output directory
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// On a fatal mid-scan error, dump partial results without asking
        #[arg(long, short = 'y')]
        assume_yes: bool,
    },

    /// Parse and validate a run configuration without touching the data
    Validate {
        /// TOML run configuration
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, output, assume_yes } => cmd_run(config, output, assume_yes),
        Commands::Validate { config } => cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INVALID_CONFIG, message: msg.into(), hint: None }
    }
}

impl From<MatchError> for CliError {
    fn from(err: MatchError) -> Self {
        Self { code: exit_code_for(&err), message: err.to_string(), hint: None }
    }
}

fn load_config(path: &PathBuf) -> Result<RunConfig, CliError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| CliError::config(format!("cannot read {}: {e}", path.display())))?;
    Ok(RunConfig::from_toml(&raw)?)
}

fn cmd_validate(path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&path)?;
    println!("{} ok", config.name);
    Ok(())
}

fn cmd_run(path: PathBuf, output: Option<PathBuf>, assume_yes: bool) -> Result<(), CliError> {
    let config = load_config(&path)?;
    let out_dir = output.unwrap_or_else(|| config.output.dir.clone());

    eprint!("Loading transactions ... ");
    let transactions = extract::load_transactions(&config.sources.transactions_root)?;
    eprintln!("we have {} transactions to match!", transactions.len());

    eprint!("Loading exchanges ... ");
    let conn = store::open(&config.sources.exchanges_db)?;
    let exchanges = store::load_exchanges(&conn)?;
    eprintln!("we have {} exchanges to match!", exchanges.len());

    // Ctrl-C lands in the same partial-dump flow as a fatal engine error.
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        let _ = ctrlc::set_handler(move || interrupted.store(true, Ordering::Relaxed));
    }

    let mut matcher = Matcher::new(transactions, exchanges, config.tolerance.clone())
        .with_cancel_flag(interrupted);
    let outcome = matcher.run(|p| {
        eprint!("\r{}", p.status_line());
        let _ = io::stderr().flush();
    });

    match outcome {
        Ok(()) => {
            eprintln!("\nWe found {} matches!", matcher.matches.len());
            report::dump(&matcher.matches, &matcher.unmatchable, &out_dir)?;
            summarize(&matcher, &out_dir);
            Ok(())
        }
        Err(err) => {
            eprintln!("\nerror: {err}");
            if assume_yes || confirm_dump()? {
                report::dump(&matcher.matches, &matcher.unmatchable, &out_dir)?;
                summarize(&matcher, &out_dir);
            }
            Err(err.into())
        }
    }
}

fn summarize(matcher: &Matcher, out_dir: &std::path::Path) {
    eprintln!(
        "{} matched, {} transactions and {} exchanges unmatchable -> {}",
        matcher.matches.len(),
        matcher.unmatchable.transaction_total(),
        matcher.unmatchable.exchanges.len(),
        out_dir.display(),
    );
}

fn confirm_dump() -> Result<bool, CliError> {
    eprint!("Dump data so far? (y/N) ");
    let _ = io::stderr().flush();
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(|e| CliError::from(MatchError::Io(e.to_string())))?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_config_reports_missing_file_as_config_error() {
        let err = load_config(&PathBuf::from("/nonexistent/audit.toml")).unwrap_err();
        assert_eq!(err.code, EXIT_INVALID_CONFIG);
        assert!(err.message.contains("audit.toml"));
    }

    #[test]
    fn load_config_round_trips_a_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.toml");
        fs::write(
            &path,
            r#"
name = "June close"

[sources]
transactions_root = "exports"
exchanges_db = "exchanges.db"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.name, "June close");
        assert_eq!(config.output.dir, PathBuf::from("out"));
    }

    #[test]
    fn engine_errors_carry_their_exit_codes() {
        let err = CliError::from(MatchError::Integrity("gap".into()));
        assert_eq!(err.code, exit_codes::EXIT_INTEGRITY);
    }
}

//! Workflow link checker CLI.
//!
//! Provides the `linkmend` binary. `check` reads a workflow JSON file,
//! reports every link inconsistency it finds, and with `--fix` writes a
//! repaired copy that has been re-verified clean.
//!
//! Logging goes through `tracing`; set `LINKMEND_LOG` (e.g. `debug`) or pass
//! `-v`/`-vv` to see engine decisions as they are made.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use linkmend_repair::{repair_str, RepairError, RepairOptions, RepairOutcome, RepairReport};

/// Exit code: no bad links, or bad links fixed and re-verified.
const EXIT_OK: i32 = 0;
/// Exit code: bad links found during a dry run.
const EXIT_BAD_LINKS: i32 = 1;
/// Exit code: the fix did not converge or the engine caught itself diverging.
const EXIT_NOT_FIXED: i32 = 2;
/// Exit code: the input could not be read or parsed, or output could not be written.
const EXIT_IO: i32 = 3;
/// Exit code: bad links fixed and written, but `--no-confirm` skipped re-verification.
const EXIT_UNVERIFIED: i32 = 4;

/// Graph workflow link checker.
#[derive(Parser)]
#[command(name = "linkmend", about = "Check and repair link consistency in graph workflow files")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug). Overrides LINKMEND_LOG.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Check a workflow file for inconsistent links.
    Check {
        /// Path to the workflow JSON file.
        file: PathBuf,

        /// Repair the links and write the result.
        #[arg(long)]
        fix: bool,

        /// Where to write the repaired workflow (default: <name>_fixed.json
        /// next to the input).
        #[arg(short, long, requires = "fix")]
        out: Option<PathBuf>,

        /// Skip re-verifying the repaired document. A fix written this way
        /// exits with 4 instead of 0.
        #[arg(long, requires = "fix")]
        no_confirm: bool,

        /// Do not print the decision log.
        #[arg(short, long)]
        quiet: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Check {
            file,
            fix,
            out,
            no_confirm,
            quiet,
        } => {
            let options = RepairOptions {
                apply: fix,
                confirm: !no_confirm,
            };
            let exit_code = run_check(&file, options, out, quiet);
            process::exit(exit_code);
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env("LINKMEND_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Execute the check subcommand.
///
/// Returns exit code: 0 = clean, or fixed and re-verified, 1 = bad links
/// found (dry run), 2 = fix did not converge, 3 = I/O or parse error,
/// 4 = fixed without re-verification.
fn run_check(file: &Path, options: RepairOptions, out: Option<PathBuf>, quiet: bool) -> i32 {
    let text = match fs::read_to_string(file) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", file.display(), e);
            return EXIT_IO;
        }
    };

    let report = match repair_str(&text, options) {
        Ok(report) => report,
        Err(RepairError::Core(e)) => {
            eprintln!("Error: '{}' is not a usable workflow: {}", file.display(), e);
            return EXIT_IO;
        }
        Err(e @ RepairError::NotConverged { .. }) => {
            eprintln!("Error: {}", e);
            eprintln!("The repaired workflow was not written. Please inspect it manually.");
            return EXIT_NOT_FIXED;
        }
        Err(e @ RepairError::LedgerDivergence { .. }) => {
            eprintln!("Error: {}", e);
            return EXIT_NOT_FIXED;
        }
    };

    if !quiet {
        for event in &report.events {
            eprintln!("{}", event);
        }
    }

    // Print the summary as JSON to stdout for machine-readable output
    let summary = serde_json::to_string_pretty(&report.summary())
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize summary: {}\"}}", e));
    println!("{}", summary);

    match report.outcome() {
        RepairOutcome::Clean => {
            eprintln!("No bad links detected in '{}'.", file.display());
            EXIT_OK
        }
        RepairOutcome::WouldFix => {
            eprintln!(
                "Found bad links: {} node(s) would be patched and {} link(s) removed. Re-run with --fix to repair.",
                report.patched_node_count, report.deleted_link_count
            );
            EXIT_BAD_LINKS
        }
        RepairOutcome::Fixed => {
            let out = out.unwrap_or_else(|| fixed_output_path(file));
            match write_document(&report, &out) {
                Ok(()) if options.confirm => {
                    eprintln!(
                        "Workflow fixed and written to '{}'. Please load it and double check linking.",
                        out.display()
                    );
                    EXIT_OK
                }
                Ok(()) => {
                    eprintln!(
                        "Workflow fixed and written to '{}' without re-verification.",
                        out.display()
                    );
                    EXIT_UNVERIFIED
                }
                Err(msg) => {
                    eprintln!("Error: {}", msg);
                    EXIT_IO
                }
            }
        }
    }
}

fn write_document(report: &RepairReport, out: &Path) -> Result<(), String> {
    let json = report
        .document
        .to_json_string_pretty()
        .map_err(|e| format!("failed to serialize workflow: {}", e))?;
    fs::write(out, json).map_err(|e| format!("failed to write '{}': {}", out.display(), e))
}

/// `dir/name.json` -> `dir/name_fixed.json`.
fn fixed_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workflow".to_string());
    input.with_file_name(format!("{}_fixed.json", stem))
}

//! SDFG translator CLI.
//!
//! Provides the `sdfgc` binary. The `translate` subcommand reads a program
//! tree as JSON (from a file or stdin), lowers it to an SDFG and writes the
//! SDFG JSON document to stdout or a file.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sdfg_translate::ir::Program;
use sdfg_translate::TranslateOptions;

/// Dataflow program to SDFG translator.
#[derive(Parser)]
#[command(name = "sdfgc", about = "Dataflow program to SDFG translator")]
struct Cli {
    /// Log translation steps (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a program tree into an SDFG document.
    Translate {
        /// Input program JSON, or `-` for stdin.
        input: String,

        /// Output file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the output.
        #[arg(long)]
        pretty: bool,

        /// Embed tasklet source text instead of lifting it to Python.
        #[arg(long)]
        no_lift: bool,

        /// Omit debuginfo attributes.
        #[arg(long)]
        no_debuginfo: bool,

        /// Name of the top-level SDFG.
        #[arg(long)]
        name: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Translate {
            input,
            output,
            pretty,
            no_lift,
            no_debuginfo,
            name,
        } => {
            let options = TranslateOptions {
                lift_tasklets: !no_lift,
                emit_debuginfo: !no_debuginfo,
                sdfg_name: name,
            };
            let exit_code = run_translate(&input, output, pretty, &options);
            process::exit(exit_code);
        }
    }
}

/// Execute the translate subcommand.
///
/// Returns exit code: 0 = success, 1 = translation error, 3 = I/O or
/// parse error.
fn run_translate(
    input: &str,
    output: Option<PathBuf>,
    pretty: bool,
    options: &TranslateOptions,
) -> i32 {
    let text = match read_input(input) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", input, e);
            return 3;
        }
    };

    let program: Program = match serde_json::from_str(&text) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: failed to parse program '{}': {}", input, e);
            return 3;
        }
    };

    let document = match sdfg_translate::translate(&program, options) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!(kind = ?e.kind(), "translation failed");
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let rendered = if pretty {
        serde_json::to_string_pretty(&document)
    } else {
        serde_json::to_string(&document)
    };
    let rendered = match rendered {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to serialize sdfg: {}", e);
            return 3;
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = fs::write(&path, rendered + "\n") {
                eprintln!("Error: failed to write '{}': {}", path.display(), e);
                return 3;
            }
        }
        None => println!("{}", rendered),
    }
    0
}

fn read_input(input: &str) -> io::Result<String> {
    if input == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        fs::read_to_string(input)
    }
}

//! Omni MIR driver CLI.
//!
//! Provides the `omni` binary with subcommands for working with Omni MIR
//! modules: `run` executes a module through the tree-walking evaluator,
//! `print` renders a module's canonical text form, `verify` checks
//! structural soundness without executing anything.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use omni_mir::{json, Module, Pass, Pipeline};

/// Omni MIR driver and tools.
#[derive(Parser)]
#[command(name = "omni", about = "Omni MIR driver and tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run a MIR module's entry function through the evaluator.
    Run {
        /// Path to a MIR JSON file.
        path: PathBuf,

        /// Entry function name (default: main).
        #[arg(long)]
        entry: Option<String>,

        /// Run as a test harness: print the suite-0 summary and exit with
        /// its failure count.
        #[arg(long)]
        test: bool,

        /// Passthrough `--name`/`--name=value` flags and positional
        /// arguments, surfaced to the program via `std.os.*`.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        program_args: Vec<String>,
    },

    /// Print a module's canonical text form after running the default pass
    /// pipeline (verify, constant-fold, verify).
    Print {
        /// Path to a MIR JSON file.
        path: PathBuf,
    },

    /// Verify a module's structural soundness without folding or executing.
    Verify {
        /// Path to a MIR JSON file.
        path: PathBuf,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed MIR wire format: {0}")]
    Wire(#[from] omni_mir::JsonError),

    #[error("verification failed: {0}")]
    Verify(#[from] omni_mir::VerifyError),

    #[error("evaluator error: {0}")]
    Eval(#[from] omni_eval::EvalError),

    #[error("failed to start evaluator runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Run { path, entry, test, program_args } => run_command(&path, entry, test, program_args),
        Commands::Print { path } => print_command(&path),
        Commands::Verify { path } => verify_command(&path),
    };
    process::exit(exit_code);
}

fn load_module(path: &Path) -> Result<Module, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Io { path: path.to_path_buf(), source })?;
    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|source| CliError::Json { path: path.to_path_buf(), source })?;
    Ok(json::from_json(&value)?)
}

fn load_and_pipeline(path: &Path) -> Result<Module, CliError> {
    let module = load_module(path)?;
    Ok(Pipeline::default_pipeline().run(module)?)
}

/// Exit code: 0 success, non-zero = `Exit` code from `std.os.exit`/
/// `std.testing.exit`, 1 unrecoverable evaluator error, 2 verification
/// failure before execution.
fn run_command(path: &Path, entry: Option<String>, test: bool, program_args: Vec<String>) -> i32 {
    let module = match load_and_pipeline(path) {
        Ok(module) => module,
        Err(err) => return report(err),
    };

    let entry_name = entry.unwrap_or_else(|| "main".to_string());
    let cli_args = omni_eval::CliArgs::parse(&program_args);
    let ctx = match omni_eval::EvalContext::new(module, cli_args) {
        Ok(ctx) => ctx,
        Err(source) => return report(CliError::Runtime(source)),
    };

    match omni_eval::execute(ctx.clone(), &entry_name) {
        Ok(omni_eval::EvalOutcome::Exited(code)) => code,
        Ok(omni_eval::EvalOutcome::Returned(result)) => {
            if test {
                println!("{}", ctx.state.testing.summary(0));
                ctx.state.testing.failures(0) as i32
            } else {
                tracing::debug!(?result, "entry function returned");
                0
            }
        }
        Err(err) => report(CliError::Eval(err)),
    }
}

fn print_command(path: &Path) -> i32 {
    match load_and_pipeline(path) {
        Ok(module) => {
            print!("{}", omni_mir::printer::print_module(&module));
            0
        }
        Err(err) => report(err),
    }
}

fn verify_command(path: &Path) -> i32 {
    let result = load_module(path).and_then(|module| Ok(Pipeline::new(vec![Pass::Verify]).run(module)?));
    match result {
        Ok(_) => {
            println!("ok");
            0
        }
        Err(err) => report(err),
    }
}

fn report(err: CliError) -> i32 {
    match err {
        CliError::Verify(_) => {
            eprintln!("{err}");
            2
        }
        other => {
            eprintln!("{other}");
            1
        }
    }
}

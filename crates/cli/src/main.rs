//! This is the CLI for working with the element lowering process. For more
//! detail, please see the documentation for the [`clift_driver`] crate.

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming
#![allow(clippy::multiple_crate_versions)] // Enforced by our dependencies

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use clift_driver::{load_inputs, lower_store, render_function, render_module};
use clift_errors::{load, lower::Result};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clift")]
#[command(about = "Lifts LLVM IR of packet-processing elements into the clift HIR")]
#[command(version)]
struct Cli {
    /// Raises the log verbosity. Repeat for more detail.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lists the elements defined by the given modules.
    Elements {
        /// Serialized module files, or directories containing them.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Also scans subdirectories of the given directories.
        #[arg(short, long)]
        recursive: bool,
    },

    /// Lowers every discovered element and prints a per-element summary.
    Lower {
        /// Serialized module files, or directories containing them.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Also scans subdirectories of the given directories.
        #[arg(short, long)]
        recursive: bool,
    },

    /// Lowers every discovered element and prints the resulting functions.
    Print {
        /// Serialized module files, or directories containing them.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Also scans subdirectories of the given directories.
        #[arg(short, long)]
        recursive: bool,

        /// Prints only the function with this exact lowered name.
        #[arg(short, long)]
        function: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Elements { inputs, recursive } => cmd_elements(&inputs, recursive),
        Command::Lower { inputs, recursive } => cmd_lower(&inputs, recursive),
        Command::Print {
            inputs,
            recursive,
            function,
        } => cmd_print(&inputs, recursive, function.as_deref()),
    };

    if let Err(error) = result {
        error!("{error}");
        std::process::exit(1);
    }
}

/// Lists each discovered element together with its entry symbol.
fn cmd_elements(inputs: &[PathBuf], recursive: bool) -> Result<()> {
    let store = load_inputs(inputs, recursive)?;
    for (element, entry) in store.elements() {
        println!("{element}  {entry}");
    }

    Ok(())
}

/// Lowers every element and reports what each one produced.
fn cmd_lower(inputs: &[PathBuf], recursive: bool) -> Result<()> {
    let store = load_inputs(inputs, recursive)?;
    let module = lower_store(&store)?;

    for element in module.elements.values() {
        println!(
            "{}: {} functions, {} state slots",
            element.name,
            element.funcs.len(),
            element.states.len()
        );
    }

    Ok(())
}

/// Lowers every element and prints the result, or only the function named
/// by `function` when one is requested.
fn cmd_print(inputs: &[PathBuf], recursive: bool, function: Option<&str>) -> Result<()> {
    let store = load_inputs(inputs, recursive)?;
    let module = lower_store(&store)?;

    match function {
        Some(name) => {
            let rendered = render_function(&module, name)
                .ok_or_else(|| load::Error::UnknownFunction(name.to_string()))?;
            print!("{rendered}");
        }
        None => print!("{}", render_module(&module)),
    }

    Ok(())
}

/// Initializes the process-wide tracing subscriber.
///
/// Logs go to standard error, keeping standard output clean for the printed
/// results. The filter level follows the `--verbose` count.
fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::new("info"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

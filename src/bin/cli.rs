//! Command-line interface for the SBML import library
//!
//! # Usage
//!
//! ```bash
//! # Show the variables of an imported model
//! sbml-import inspect model.xml --strict
//!
//! # Re-write a document as SBML Level 3 Version 2
//! sbml-import convert model.xml --output model-l3v2.xml
//!
//! # Save the imported model as JSON
//! sbml-import json model.xml --output model.json
//! ```

use std::{path::PathBuf, process::exit};

use clap::{Parser, Subcommand};
use colored::Colorize;
use sbml_import::prelude::*;

/// Main CLI configuration struct
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Import an SBML file and print its variables
    Inspect {
        /// Path to the SBML file
        path: PathBuf,

        /// Reject documents that are not SBML Level 3 Version 2
        #[arg(long, help = "Reject documents that do not follow the standard")]
        strict: bool,
    },
    /// Import an SBML file and write it back as SBML Level 3 Version 2
    Convert {
        /// Path to the SBML file
        path: PathBuf,

        /// Path to the output file
        #[arg(short, long, help = "Path to save the converted document to")]
        output: PathBuf,
    },
    /// Import an SBML file and save the model as JSON
    Json {
        /// Path to the SBML file
        path: PathBuf,

        /// Path to the output file
        #[arg(short, long, help = "Path to save the model to")]
        output: PathBuf,
    },
}

/// Imports a file, printing the warnings and exiting on error.
fn import(path: &PathBuf, parser: &SBMLParser) -> Model {
    let mut warnings = WarningCollector::new();
    let result = parser.parse_file(path, &mut warnings);

    for message in warnings.messages() {
        eprintln!("{} {}", "warning:".yellow().bold(), message);
    }

    match result {
        Ok(model) => model,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            exit(1);
        }
    }
}

/// Main entry point for the CLI application
pub fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Inspect { path, strict } => {
            let parser = if *strict {
                SBMLParser::strict()
            } else {
                SBMLParser::lenient()
            };
            let model = import(path, &parser);
            println!("{}", model);
        }
        Commands::Convert { path, output } => {
            let model = import(path, &SBMLParser::lenient());
            if let Err(e) = write_sbml_file(&model, output) {
                eprintln!("{} {}", "error:".red().bold(), e);
                exit(1);
            }
            println!("{} {}", "Wrote".green(), output.display());
        }
        Commands::Json { path, output } => {
            let model = import(path, &SBMLParser::lenient());
            if let Err(e) = save_model(output, &model) {
                eprintln!("{} {}", "error:".red().bold(), e);
                exit(1);
            }
            println!("{} {}", "Wrote".green(), output.display());
        }
    }
}

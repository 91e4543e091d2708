//! Command-line interface implementation for Plinth.
//! Provides argument parsing and help text formatting using clap.

use clap::{error::ErrorKind, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::constants::DEFAULT_OUTPUT_DIR;
use crate::engine::Mode;

/// Command-line arguments structure for Plinth.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Plinth: placeholder substitution and dry-run validation for plugin scaffolds",
    long_about = None
)]
pub struct Args {
    /// Registry document (JSON or YAML). Defaults to plinth.{json,yml,yaml}
    /// in the current directory, then the built-in registry
    #[arg(long, global = true, value_name = "FILE")]
    pub registry: Option<PathBuf>,

    /// Configuration values (JSON or YAML)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the effective configuration: configured values over registry
    /// defaults over dry-run stand-ins
    EmitConfig {
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// Ask for every variable interactively
        #[arg(short, long)]
        interactive: bool,
    },

    /// Print the value a dry run would use for one variable
    GetValue {
        #[arg(value_name = "KEY")]
        key: String,

        /// Value to print when neither configuration nor registry has one
        #[arg(short, long, value_name = "VALUE")]
        default: Option<String>,
    },

    /// List files that still contain placeholder tokens
    ListFilesWithPlaceholders {
        /// Glob patterns, relative to the root, restricting the files scanned
        #[arg(value_name = "PATTERN")]
        patterns: Vec<String>,

        #[arg(long, default_value = ".", value_name = "DIR")]
        root: PathBuf,

        /// Print a JSON list of {file, line, token}
        #[arg(long)]
        json: bool,

        /// Fail when a token names a variable unknown to the registry
        #[arg(long)]
        check: bool,
    },

    /// Substitute one file and print the result
    SubstituteFile {
        #[arg(value_name = "PATH")]
        path: PathBuf,

        #[arg(long, value_enum, default_value_t = Mode::DryRun)]
        mode: Mode,

        /// Write the result here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Write a substituted copy of the template tree
    RunDryRun {
        /// Files relative to the root; all files under the root when omitted
        #[arg(value_name = "FILES")]
        files: Vec<PathBuf>,

        #[arg(long, default_value = ".", value_name = "DIR")]
        root: PathBuf,

        #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR, value_name = "DIR")]
        output_dir: PathBuf,

        #[arg(long, value_enum, default_value_t = Mode::DryRun)]
        mode: Mode,

        /// Remove the output directory first
        #[arg(long)]
        clean: bool,
    },

    /// Validate the configuration against a schema
    Validate {
        /// Schema document; defaults to the schema derived from the registry
        #[arg(long, value_name = "FILE")]
        schema: Option<PathBuf>,

        /// Validate the schema document itself against the meta-schema
        #[arg(long, requires = "schema")]
        schema_document: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Yaml,
}

/// Parses command line arguments and returns the Args structure.
///
/// # Exits
/// * With status code 1 and the usage on stderr if a required argument is missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument {
                eprintln!("{}", e.render());
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}

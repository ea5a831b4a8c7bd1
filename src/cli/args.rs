//! CLI argument definitions using clap.
//!
//! ## Commands
//!
//! - `extract`: Extract functions, classes and comment blocks from Python files
//! - `init`: Initialize a featmap configuration file

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Arguments {
    /// Check if a command was provided, otherwise print help and return None.
    pub fn with_command_or_help(self) -> Option<Self> {
        if self.command.is_none() {
            Self::command().print_help().ok();
            None
        } else {
            Some(self)
        }
    }

    /// Get the verbose flag from the command's common args.
    pub fn verbose(&self) -> bool {
        match &self.command {
            Some(Command::Extract(cmd)) => cmd.args.common.verbose,
            Some(Command::Init) | None => false,
        }
    }
}

/// Common arguments shared by commands that read a source tree.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Source root to scan and to start config discovery from
    #[arg(long, env = "FEATMAP_SOURCE_ROOT")]
    pub source_root: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Output format of the `extract` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored outline with diagnostics
    #[default]
    Text,
    /// Full result: records, failures and diagnostics
    Json,
    /// Compact path to feature list mapping
    Features,
}

#[derive(Debug, Parser)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Tab stop width for indentation (overrides config file)
    #[arg(long)]
    pub tab_width: Option<usize>,

    /// Only scan the top level of the source root
    #[arg(long)]
    pub no_recursive: bool,
}

#[derive(Debug, Args)]
pub struct ExtractCommand {
    /// Files to extract; the source root is scanned when omitted
    pub paths: Vec<PathBuf>,
    #[command(flatten)]
    pub args: ExtractArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract functions, classes and comment blocks from Python sources
    Extract(ExtractCommand),
    /// Initialize a new .featmaprc.json configuration file
    Init,
}

use crate::{cli::args::OutputFormat, cli::exit_status::ExitStatus, core::DirectoryResult};

#[derive(Debug)]
pub enum CommandSummary {
    Extract(ExtractSummary),
    Init(InitSummary),
}

#[derive(Debug)]
pub struct ExtractSummary {
    pub result: DirectoryResult,
    pub format: OutputFormat,
}

#[derive(Debug)]
pub struct InitSummary {
    /// False when a config file already existed.
    pub created: bool,
}

/// Result of running featmap commands
#[derive(Debug)]
pub struct CommandResult {
    pub summary: CommandSummary,
    /// Unreadable files, or a refused `init`.
    pub error_count: usize,
    /// Source diagnostics (malformed or ambiguous structure).
    pub warning_count: usize,
}

impl CommandResult {
    pub fn exit_status(&self) -> ExitStatus {
        if self.error_count > 0 {
            ExitStatus::Failure
        } else {
            ExitStatus::Success
        }
    }
}

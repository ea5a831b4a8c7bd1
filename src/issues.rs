//! Issue types for extraction results.
//!
//! Nothing here aborts an extraction run. Every malformed or ambiguous
//! condition the engine meets is recorded as an issue on the affected source
//! file and surfaced to the reporter (CLI text output, JSON output).

use enum_dispatch::enum_dispatch;
use serde::Serialize;

// ============================================================
// Severity and Rule
// ============================================================

/// Severity level of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Rule identifier for each issue type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    UnreadableSource,
    MalformedDefinition,
    AmbiguousNesting,
    UnterminatedBlock,
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rule::UnreadableSource => write!(f, "unreadable-source"),
            Rule::MalformedDefinition => write!(f, "malformed-definition"),
            Rule::AmbiguousNesting => write!(f, "ambiguous-nesting"),
            Rule::UnterminatedBlock => write!(f, "unterminated-block"),
        }
    }
}

// ============================================================
// Issue Types
// ============================================================

/// File could not be opened or decoded.
///
/// The file still gets an entry in the directory result, with an empty
/// feature registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadableSourceIssue {
    pub reason: String,
}

impl UnreadableSourceIssue {
    pub fn severity() -> Severity {
        Severity::Error
    }

    pub fn rule() -> Rule {
        Rule::UnreadableSource
    }
}

/// A definition header whose parameter list never closes before end-of-file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedDefinitionIssue {
    /// Line of the `def`/`class` keyword.
    pub line: usize,
    pub name: String,
}

impl MalformedDefinitionIssue {
    pub fn severity() -> Severity {
        Severity::Warning
    }

    pub fn rule() -> Rule {
        Rule::MalformedDefinition
    }
}

/// A dedent that lands on no enclosing indentation level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousNestingIssue {
    pub line: usize,
    /// Indentation depth of the offending line, in columns.
    pub depth: usize,
}

impl AmbiguousNestingIssue {
    pub fn severity() -> Severity {
        Severity::Warning
    }

    pub fn rule() -> Rule {
        Rule::AmbiguousNesting
    }
}

/// A string, docstring or bracket still open at end-of-file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnterminatedBlockIssue {
    /// First line of the logical line that never ended.
    pub line: usize,
}

impl UnterminatedBlockIssue {
    pub fn severity() -> Severity {
        Severity::Warning
    }

    pub fn rule() -> Rule {
        Rule::UnterminatedBlock
    }
}

// ============================================================
// Issue Enum
// ============================================================

/// An issue found while extracting one source file.
#[enum_dispatch(Report)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    UnreadableSource(UnreadableSourceIssue),
    MalformedDefinition(MalformedDefinitionIssue),
    AmbiguousNesting(AmbiguousNestingIssue),
    UnterminatedBlock(UnterminatedBlockIssue),
}

impl Issue {
    pub fn severity(&self) -> Severity {
        match self {
            Issue::UnreadableSource(_) => UnreadableSourceIssue::severity(),
            Issue::MalformedDefinition(_) => MalformedDefinitionIssue::severity(),
            Issue::AmbiguousNesting(_) => AmbiguousNestingIssue::severity(),
            Issue::UnterminatedBlock(_) => UnterminatedBlockIssue::severity(),
        }
    }

    pub fn rule(&self) -> Rule {
        match self {
            Issue::UnreadableSource(_) => UnreadableSourceIssue::rule(),
            Issue::MalformedDefinition(_) => MalformedDefinitionIssue::rule(),
            Issue::AmbiguousNesting(_) => AmbiguousNestingIssue::rule(),
            Issue::UnterminatedBlock(_) => UnterminatedBlockIssue::rule(),
        }
    }
}

impl Serialize for Issue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Issue", 4)?;
        state.serialize_field("rule", &self.rule())?;
        state.serialize_field("severity", &self.severity())?;
        state.serialize_field("line", &self.line())?;
        state.serialize_field("message", &self.message())?;
        state.end()
    }
}

// ============================================================
// Report Trait (for CLI output)
// ============================================================

/// Trait for types that can be reported to CLI.
#[enum_dispatch]
pub trait Report {
    /// 1-based line the issue points at, if it points at one.
    fn line(&self) -> Option<usize>;

    /// Primary message to display.
    fn message(&self) -> String;

    /// Optional details for the "= note:" line.
    fn details(&self) -> Option<String> {
        None
    }
}

// ============================================================
// Report Implementations
// ============================================================

impl Report for UnreadableSourceIssue {
    fn line(&self) -> Option<usize> {
        None
    }

    fn message(&self) -> String {
        self.reason.clone()
    }
}

impl Report for MalformedDefinitionIssue {
    fn line(&self) -> Option<usize> {
        Some(self.line)
    }

    fn message(&self) -> String {
        format!("definition '{}' never closes its parameter list", self.name)
    }

    fn details(&self) -> Option<String> {
        Some("feature extends to end of file".to_string())
    }
}

impl Report for AmbiguousNestingIssue {
    fn line(&self) -> Option<usize> {
        Some(self.line)
    }

    fn message(&self) -> String {
        format!(
            "indentation of {} column(s) matches no enclosing level",
            self.depth
        )
    }

    fn details(&self) -> Option<String> {
        Some("attached to the nearest enclosing definition".to_string())
    }
}

impl Report for UnterminatedBlockIssue {
    fn line(&self) -> Option<usize> {
        Some(self.line)
    }

    fn message(&self) -> String {
        "string, docstring or bracket is never closed".to_string()
    }
}

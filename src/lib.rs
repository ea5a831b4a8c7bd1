//! featmap - feature extraction for Python source trees
//!
//! featmap walks Python files and extracts their structure (functions,
//! classes, comment blocks) with line ranges, nesting and documentation,
//! without parsing a full syntax tree. The result feeds documentation and
//! summary generators as JSON.
//!
//! ## Module Structure
//!
//! - `cli`: Command-line interface layer
//! - `config`: Configuration file loading and parsing
//! - `core`: Extraction engine (tokenizer, builder, registry, driver)
//! - `issues`: Diagnostic types and reporting

pub mod cli;
pub mod config;
pub mod core;
pub mod issues;

//! Extraction engine.
//!
//! Pipeline per file: [`tokenizer`] classifies physical lines, [`builder`]
//! groups them into records held by a [`registry`]. The [`driver`] runs the
//! pipeline over many files and aggregates a [`result::DirectoryResult`].

pub mod builder;
pub mod driver;
pub mod file_scanner;
pub mod registry;
pub mod result;
pub mod source;
pub mod tokenizer;

pub use builder::{BuildOutput, FeatureBuilder, build_features};
pub use driver::{CancelToken, ExtractError, ExtractOptions, Extractor};
pub use registry::{FeatureFlag, FeatureId, FeatureKind, FeatureRecord, FeatureRegistry};
pub use result::{DirectoryResult, FeaturesView, FileEntry};
pub use source::{Language, SourceError, SourceUnit};
pub use tokenizer::{ClassifiedLine, CommentStyle, DefHeader, DefKeyword, LineClassifier, LineRole};

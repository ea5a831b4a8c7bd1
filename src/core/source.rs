use std::{fs, io, path::Path, string::FromUtf8Error};

use thiserror::Error;

/// Language of a source unit. Only Python is recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Python,
}

/// Why a source file could not be turned into text.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read file: {0}")]
    Io(#[from] io::Error),
    #[error("file is not valid UTF-8: {0}")]
    Decode(#[from] FromUtf8Error),
}

/// One input file: its path, full text and language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub path: String,
    pub text: String,
    pub language: Language,
}

impl SourceUnit {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        let mut text = text.into();
        if text.starts_with('\u{feff}') {
            text.drain(..'\u{feff}'.len_utf8());
        }
        Self {
            path: path.into(),
            text,
            language: Language::Python,
        }
    }

    /// Read a file fully into memory; the handle is released on return.
    pub fn read(path: &str) -> Result<Self, SourceError> {
        let bytes = fs::read(Path::new(path))?;
        let text = String::from_utf8(bytes)?;
        Ok(Self::new(path, text))
    }
}

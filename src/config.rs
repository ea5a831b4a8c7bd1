use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::core::tokenizer::DEFAULT_TAB_WIDTH;

pub const CONFIG_FILE_NAME: &str = ".featmaprc.json";

pub const DEFAULT_SUMMARY_MARKER: &str = "Application Builder File Summary";

pub const TEST_FILE_PATTERNS: &[&str] = &[
    "**/test_*.py",
    "**/*_test.py",
    "**/tests/**",
    "**/conftest.py",
];

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_ignores")]
    pub ignores: Vec<String>,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_source_root")]
    pub source_root: String,
    #[serde(default)]
    pub ignore_test_files: bool,
    #[serde(default = "default_recursive")]
    pub recursive: bool,
    #[serde(default = "default_tab_width")]
    pub tab_width: usize,
    #[serde(default = "default_summary_marker")]
    pub summary_marker: String,
}

fn default_ignores() -> Vec<String> {
    ["**/__pycache__/**", "**/.venv/**", "**/venv/**", "**/.git/**"]
        .map(String::from)
        .to_vec()
}

fn default_extensions() -> Vec<String> {
    vec!["py".to_string()]
}

fn default_source_root() -> String {
    "./".to_string()
}

fn default_recursive() -> bool {
    true
}

fn default_tab_width() -> usize {
    DEFAULT_TAB_WIDTH
}

fn default_summary_marker() -> String {
    DEFAULT_SUMMARY_MARKER.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignores: default_ignores(),
            includes: Vec::new(),
            extensions: default_extensions(),
            source_root: default_source_root(),
            ignore_test_files: false,
            recursive: default_recursive(),
            tab_width: default_tab_width(),
            summary_marker: default_summary_marker(),
        }
    }
}

impl Config {
    /// Validate configuration values.
    ///
    /// Returns an error for invalid glob patterns in `ignores` or `includes`,
    /// or a zero tab width.
    pub fn validate(&self) -> Result<()> {
        for pattern in &self.ignores {
            Pattern::new(pattern)
                .with_context(|| format!("Invalid glob pattern in 'ignores': \"{}\"", pattern))?;
        }

        // Patterns without wildcards are literal directory paths.
        for pattern in &self.includes {
            if pattern.contains('*') || pattern.contains('?') {
                Pattern::new(pattern).with_context(|| {
                    format!("Invalid glob pattern in 'includes': \"{}\"", pattern)
                })?;
            }
        }

        if self.tab_width == 0 {
            bail!("Invalid 'tabWidth': must be at least 1");
        }

        Ok(())
    }
}

pub fn default_config_json() -> Result<String> {
    let config = Config::default();
    serde_json::to_string_pretty(&config).context("Failed to generate default config.")
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if current.join(".git").exists() {
            return None;
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Result of loading configuration.
pub struct ConfigLoadResult {
    pub config: Config,
    /// True if config was loaded from a file, false if using defaults.
    pub from_file: bool,
}

pub fn load_config(start_dir: &Path) -> Result<ConfigLoadResult> {
    match find_config_file(start_dir) {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            config.validate()?;
            Ok(ConfigLoadResult {
                config,
                from_file: true,
            })
        }
        None => Ok(ConfigLoadResult {
            config: Config::default(),
            from_file: false,
        }),
    }
}

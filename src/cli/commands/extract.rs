use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing::debug;

use super::{CommandResult, CommandSummary, ExtractSummary};
use crate::{
    cli::args::ExtractCommand,
    config::{Config, load_config},
    core::{CancelToken, ExtractOptions, Extractor, file_scanner::scan_files},
};

pub fn extract(cmd: ExtractCommand) -> Result<CommandResult> {
    let args = &cmd.args;
    let verbose = args.common.verbose;
    let source_root = args
        .common
        .source_root
        .clone()
        .unwrap_or_else(|| PathBuf::from("./"));

    let config = resolve_config(&source_root, args.tab_width, args.no_recursive)?;

    let paths: Vec<String> = if cmd.paths.is_empty() {
        let scan = scan_files(&source_root, &config, verbose);
        if scan.skipped_count > 0 {
            debug!(skipped = scan.skipped_count, "paths skipped during scan");
        }
        scan.files
    } else {
        cmd.paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    };

    let extractor = Extractor::new(ExtractOptions::from_config(&config));
    let result = extractor
        .extract_paths(&paths, &CancelToken::new())
        .with_context(|| format!("Nothing to extract under {}", source_root.display()))?;

    Ok(CommandResult {
        error_count: result.failed_count(),
        warning_count: result.diagnostic_count(),
        summary: CommandSummary::Extract(ExtractSummary {
            result,
            format: args.format,
        }),
    })
}

/// Config file settings with CLI overrides applied.
fn resolve_config(source_root: &Path, tab_width: Option<usize>, no_recursive: bool) -> Result<Config> {
    let lookup_dir = fs::canonicalize(source_root)
        .with_context(|| format!("Source root not found: {}", source_root.display()))?;
    let loaded = load_config(&lookup_dir)?;
    debug!(from_file = loaded.from_file, "configuration loaded");

    let mut config = loaded.config;
    if let Some(tab_width) = tab_width {
        config.tab_width = tab_width;
    }
    if no_recursive {
        config.recursive = false;
    }
    config.validate()?;
    Ok(config)
}

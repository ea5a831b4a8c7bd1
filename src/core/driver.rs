//! Extraction driver: turns a set of paths into a [`DirectoryResult`].
//!
//! Files are extracted on rayon's pool. Each file gets its own builder, so
//! no state is shared between files; aggregation happens after the parallel
//! step, in input order.

use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    config::{Config, DEFAULT_SUMMARY_MARKER},
    core::{
        builder::build_features,
        registry::FeatureRegistry,
        result::{DirectoryResult, FileEntry},
        source::SourceUnit,
        tokenizer::DEFAULT_TAB_WIDTH,
    },
};

/// Errors returned to callers of [`Extractor::extract_paths`].
///
/// Per-file problems never surface here; they are recorded on the file's
/// entry instead.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no source files to extract")]
    NoInput,
}

/// Knobs shared by every file of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub tab_width: usize,
    /// Comment blocks starting with this text are flagged as generated
    /// summaries. `None` disables the flag.
    pub summary_marker: Option<String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            tab_width: DEFAULT_TAB_WIDTH,
            summary_marker: Some(DEFAULT_SUMMARY_MARKER.to_string()),
        }
    }
}

impl ExtractOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tab_width: config.tab_width,
            summary_marker: Some(config.summary_marker.clone()).filter(|m| !m.is_empty()),
        }
    }
}

/// Cooperative cancellation flag, cheap to clone and share across threads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// No new file extraction starts after this call.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Extractor {
    options: ExtractOptions,
}

impl Extractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract an in-memory source unit.
    pub fn extract_source(&self, path: &str, text: &str) -> FileEntry {
        self.extract_unit(&SourceUnit::new(path, text))
    }

    pub fn extract_unit(&self, unit: &SourceUnit) -> FileEntry {
        let output = build_features(&unit.text, &self.options);
        debug!(
            path = %unit.path,
            features = output.registry.len(),
            issues = output.issues.len(),
            "extracted source"
        );
        FileEntry {
            path: unit.path.clone(),
            registry: output.registry,
            failure: None,
            diagnostics: output.issues,
        }
    }

    /// Read and extract one file. A read failure yields an entry with an
    /// empty registry and the failure reason.
    pub fn extract_file(&self, path: &str) -> FileEntry {
        match SourceUnit::read(path) {
            Ok(unit) => self.extract_unit(&unit),
            Err(e) => {
                warn!(path, error = %e, "unreadable source");
                FileEntry {
                    path: path.to_string(),
                    registry: FeatureRegistry::default(),
                    failure: Some(e.to_string()),
                    diagnostics: Vec::new(),
                }
            }
        }
    }

    /// Extract every path, preserving input order. Repeated paths are
    /// extracted once, at their first position.
    pub fn extract_paths<P>(
        &self,
        paths: &[P],
        cancel: &CancelToken,
    ) -> Result<DirectoryResult, ExtractError>
    where
        P: AsRef<str> + Sync,
    {
        if paths.is_empty() {
            return Err(ExtractError::NoInput);
        }

        let mut seen = HashSet::new();
        let unique: Vec<&str> = paths
            .iter()
            .map(AsRef::as_ref)
            .filter(|path| seen.insert(*path))
            .collect();
        debug!(
            requested = paths.len(),
            files = unique.len(),
            "starting extraction"
        );

        let extracted: Vec<Option<FileEntry>> = unique
            .par_iter()
            .map(|path| self.extract_unless_cancelled(path, cancel))
            .collect();

        Ok(collect_completed(extracted))
    }

    /// `None` when cancellation was requested before this file started.
    fn extract_unless_cancelled(&self, path: &str, cancel: &CancelToken) -> Option<FileEntry> {
        (!cancel.is_cancelled()).then(|| self.extract_file(path))
    }
}

/// Keep completed entries in input order. Any skipped file marks the result
/// as cancelled.
fn collect_completed(extracted: Vec<Option<FileEntry>>) -> DirectoryResult {
    let requested = extracted.len();
    let cancelled = extracted.iter().any(Option::is_none);
    let entries: Vec<FileEntry> = extracted.into_iter().flatten().collect();
    if cancelled {
        warn!(
            completed = entries.len(),
            requested,
            "extraction cancelled"
        );
    }

    DirectoryResult::new(entries, cancelled)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;
    use crate::core::registry::FeatureKind;

    fn write(dir: &std::path::Path, name: &str, content: &[u8]) -> String {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_no_input_is_error() {
        let extractor = Extractor::default();
        let paths: Vec<String> = Vec::new();
        let err = extractor
            .extract_paths(&paths, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, ExtractError::NoInput));
    }

    #[test]
    fn test_entries_follow_input_order_and_include_failures() {
        let dir = tempdir().unwrap();
        let b = write(dir.path(), "b.py", b"def b():\n    pass\n");
        let a = write(dir.path(), "a.py", b"class A:\n    pass\n");
        let bad = write(dir.path(), "bad.py", b"x = '\xff'\n");
        let missing = dir.path().join("missing.py").to_string_lossy().into_owned();

        let paths = vec![b.clone(), bad.clone(), a.clone(), missing.clone()];
        let result = Extractor::default()
            .extract_paths(&paths, &CancelToken::new())
            .unwrap();

        let order: Vec<&str> = result.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(order, vec![b.as_str(), bad.as_str(), a.as_str(), missing.as_str()]);
        assert_eq!(result.len(), 4);
        assert!(!result.is_cancelled());

        let bad_entry = result.get(&bad).unwrap();
        assert!(bad_entry.registry.is_empty());
        assert!(bad_entry.failure.as_deref().unwrap().contains("UTF-8"));
        assert!(result.get(&missing).unwrap().failure.is_some());
        assert_eq!(result.get(&a).unwrap().registry.records()[0].kind, FeatureKind::Class);
        assert_eq!(result.failed_count(), 2);
    }

    #[test]
    fn test_duplicate_paths_collapse() {
        let dir = tempdir().unwrap();
        let a = write(dir.path(), "a.py", b"def a():\n    pass\n");
        let b = write(dir.path(), "b.py", b"def b():\n    pass\n");

        let paths = vec![a.clone(), b.clone(), a.clone()];
        let result = Extractor::default()
            .extract_paths(&paths, &CancelToken::new())
            .unwrap();

        let order: Vec<&str> = result.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(order, vec![a.as_str(), b.as_str()]);
    }

    #[test]
    fn test_records_do_not_cross_files() {
        let dir = tempdir().unwrap();
        let a = write(dir.path(), "a.py", b"class A:\n    def m(self):\n        pass\n");
        let b = write(dir.path(), "b.py", b"    def stray():\n        pass\n");

        let result = Extractor::default()
            .extract_paths(&[a, b.clone()], &CancelToken::new())
            .unwrap();

        let stray = result.get(&b).unwrap().registry.find("stray").unwrap();
        assert_eq!(stray.parent, None);
    }

    #[test]
    fn test_cancelled_before_start_returns_no_entries() {
        let dir = tempdir().unwrap();
        let a = write(dir.path(), "a.py", b"def a():\n    pass\n");

        let cancel = CancelToken::new();
        cancel.cancel();
        let result = Extractor::default().extract_paths(&[a], &cancel).unwrap();

        assert!(result.is_cancelled());
        assert!(result.is_empty());
    }

    #[test]
    fn test_cancel_mid_run_keeps_completed_entries_in_order() {
        let dir = tempdir().unwrap();
        let paths: Vec<String> = (0..5)
            .map(|i| write(dir.path(), &format!("m{}.py", i), b"def run():\n    pass\n"))
            .collect();

        let extractor = Extractor::default();
        let cancel = CancelToken::new();
        let extracted: Vec<Option<FileEntry>> = paths
            .iter()
            .enumerate()
            .map(|(i, path)| {
                let entry = extractor.extract_unless_cancelled(path, &cancel);
                if i == 1 {
                    cancel.cancel();
                }
                entry
            })
            .collect();
        let result = collect_completed(extracted);

        assert!(result.is_cancelled());
        let order: Vec<&str> = result.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(order, vec![paths[0].as_str(), paths[1].as_str()]);
        for entry in &result {
            assert!(!entry.is_failed());
            assert_eq!(entry.registry.find("run").unwrap().end_line, 2);
        }
    }

    #[test]
    fn test_out_of_order_completion_is_reordered() {
        let extractor = Extractor::default();
        let extracted = vec![
            None,
            Some(extractor.extract_source("b.py", "def b():\n    pass\n")),
            None,
            Some(extractor.extract_source("d.py", "class D:\n    pass\n")),
        ];
        let result = collect_completed(extracted);

        assert!(result.is_cancelled());
        let order: Vec<&str> = result.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(order, vec!["b.py", "d.py"]);
        assert_eq!(result.feature_count(), 2);
    }

    #[test]
    fn test_concurrent_cancel_returns_ordered_subset() {
        let dir = tempdir().unwrap();
        let paths: Vec<String> = (0..64)
            .map(|i| {
                let source = format!("class C{}:\n    def m(self):\n        pass\n", i);
                write(dir.path(), &format!("c{:02}.py", i), source.as_bytes())
            })
            .collect();

        let extractor = Extractor::default();
        let cancel = CancelToken::new();
        let result = std::thread::scope(|scope| {
            let handle = scope.spawn(|| extractor.extract_paths(&paths, &cancel));
            cancel.cancel();
            handle.join().unwrap().unwrap()
        });

        assert_eq!(result.is_cancelled(), result.len() < paths.len());
        let mut remaining = paths.iter();
        for entry in &result {
            assert!(remaining.any(|path| *path == entry.path), "{} out of order", entry.path);
            let method = entry.registry.find("m").unwrap();
            assert_eq!(entry.registry.parent_of(method).unwrap().kind, FeatureKind::Class);
        }
    }

    #[test]
    fn test_extract_source_is_deterministic() {
        let extractor = Extractor::default();
        let text = "# doc\ndef f(a,\n      b):\n    return a\n";
        let first = extractor.extract_source("mem.py", text);
        let second = extractor.extract_source("mem.py", text);
        assert_eq!(first.registry, second.registry);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_options_from_config() {
        let config = Config {
            tab_width: 4,
            summary_marker: String::new(),
            ..Default::default()
        };
        let options = ExtractOptions::from_config(&config);
        assert_eq!(options.tab_width, 4);
        assert_eq!(options.summary_marker, None);
    }
}

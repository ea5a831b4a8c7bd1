//! Aggregated extraction output.
//!
//! [`DirectoryResult`] keeps entries in the order the paths were supplied.
//! Two serialized shapes are offered: the full result (records, failures,
//! diagnostics) and [`FeaturesView`], the compact per-file feature listing.

use serde::{
    Serialize, Serializer,
    ser::{SerializeMap, SerializeStruct},
};

use crate::{
    core::registry::{FeatureFlag, FeatureKind, FeatureRecord, FeatureRegistry},
    issues::{Issue, UnreadableSourceIssue},
};

/// Outcome of one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub registry: FeatureRegistry,
    /// Set when the file could not be read; the registry is then empty.
    pub failure: Option<String>,
    pub diagnostics: Vec<Issue>,
}

impl FileEntry {
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Failure and diagnostics as issues, failure first.
    pub fn issues(&self) -> Vec<Issue> {
        let failure = self.failure.iter().map(|reason| {
            Issue::from(UnreadableSourceIssue {
                reason: reason.clone(),
            })
        });
        failure.chain(self.diagnostics.iter().cloned()).collect()
    }
}

impl Serialize for FileEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FileEntry", 3)?;
        state.serialize_field("features", &self.registry)?;
        state.serialize_field("failure", &self.failure)?;
        state.serialize_field("diagnostics", &self.diagnostics)?;
        state.end()
    }
}

/// Every file of a run mapped to its entry, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryResult {
    entries: Vec<FileEntry>,
    cancelled: bool,
}

impl DirectoryResult {
    pub(crate) fn new(entries: Vec<FileEntry>, cancelled: bool) -> Self {
        Self { entries, cancelled }
    }

    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.entries.iter().find(|entry| entry.path == path)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Extraction stopped early; only completed files are present.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_failed()).count()
    }

    pub fn feature_count(&self) -> usize {
        self.entries.iter().map(|e| e.registry.len()).sum()
    }

    pub fn diagnostic_count(&self) -> usize {
        self.entries.iter().map(|e| e.diagnostics.len()).sum()
    }

    pub fn features_view(&self) -> FeaturesView<'_> {
        FeaturesView(self)
    }
}

impl<'a> IntoIterator for &'a DirectoryResult {
    type Item = &'a FileEntry;
    type IntoIter = std::slice::Iter<'a, FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

struct Files<'a>(&'a [FileEntry]);

impl Serialize for Files<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in self.0 {
            map.serialize_entry(&entry.path, entry)?;
        }
        map.end()
    }
}

impl Serialize for DirectoryResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DirectoryResult", 2)?;
        state.serialize_field("files", &Files(&self.entries))?;
        state.serialize_field("cancelled", &self.cancelled)?;
        state.end()
    }
}

/// Path to feature list, without ids or diagnostics.
pub struct FeaturesView<'a>(&'a DirectoryResult);

impl Serialize for FeaturesView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in &self.0.entries {
            let features: Vec<FeatureView<'_>> = entry
                .registry
                .iter()
                .map(|record| FeatureView::new(&entry.registry, record))
                .collect();
            map.serialize_entry(&entry.path, &features)?;
        }
        map.end()
    }
}

#[derive(Serialize)]
struct FeatureView<'a> {
    kind: FeatureKind,
    name: &'a str,
    start_line: usize,
    end_line: usize,
    doc_text: &'a str,
    parent: Option<&'a str>,
    #[serde(skip_serializing_if = "str::is_empty")]
    signature: &'a str,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    decorators: &'a [String],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    flags: &'a [FeatureFlag],
}

impl<'a> FeatureView<'a> {
    fn new(registry: &'a FeatureRegistry, record: &'a FeatureRecord) -> Self {
        Self {
            kind: record.kind,
            name: &record.name,
            start_line: record.start_line,
            end_line: record.end_line,
            doc_text: &record.doc_text,
            parent: registry.parent_of(record).map(|p| p.name.as_str()),
            signature: &record.signature,
            decorators: &record.decorators,
            flags: &record.flags,
        }
    }
}

//! Feature records and the per-file registry that owns them.
//!
//! A [`FeatureRegistry`] is built once by the feature builder and is
//! read-only afterwards. Records refer to their parent by [`FeatureId`], an
//! index into the same registry, so a registry can be serialized and handed
//! across a process boundary without any pointer fix-ups.

use serde::Serialize;

/// Index of a record inside its [`FeatureRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FeatureId(pub(crate) usize);

impl FeatureId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Kind of structural unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureKind {
    Function,
    Class,
    ModuleComment,
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureKind::Function => write!(f, "function"),
            FeatureKind::Class => write!(f, "class"),
            FeatureKind::ModuleComment => write!(f, "module-comment"),
        }
    }
}

/// Condition recorded on a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureFlag {
    /// Header never closed its parameter list; the record runs to end-of-file.
    MalformedDefinition,
    /// Indentation matched no open level and was attached to the nearest
    /// enclosing one.
    AmbiguousNesting,
    /// Comment block carrying the summary marker of a generated file overview.
    GeneratedSummary,
}

impl std::fmt::Display for FeatureFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureFlag::MalformedDefinition => write!(f, "malformed"),
            FeatureFlag::AmbiguousNesting => write!(f, "ambiguous-nesting"),
            FeatureFlag::GeneratedSummary => write!(f, "generated-summary"),
        }
    }
}

/// A named unit of structure: a function, a class, or a comment block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureRecord {
    pub id: FeatureId,
    pub kind: FeatureKind,
    /// Empty for module comments.
    pub name: String,
    /// 1-based, inclusive.
    pub start_line: usize,
    /// 1-based, inclusive.
    pub end_line: usize,
    pub parent: Option<FeatureId>,
    pub doc_text: String,
    /// Definition header with continuation lines joined, without the
    /// trailing colon. Empty for module comments.
    pub signature: String,
    pub decorators: Vec<String>,
    pub flags: Vec<FeatureFlag>,
}

impl FeatureRecord {
    pub fn has_flag(&self, flag: FeatureFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn is_definition(&self) -> bool {
        matches!(self.kind, FeatureKind::Function | FeatureKind::Class)
    }

    /// Whether `other` lies within this record's line range.
    pub fn contains(&self, other: &FeatureRecord) -> bool {
        self.start_line <= other.start_line && other.end_line <= self.end_line
    }

    pub(crate) fn add_flag(&mut self, flag: FeatureFlag) {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }
}

/// Ordered, read-only collection of the records of one source file.
///
/// Records are stored in source order (ascending start line). A record's id is
/// its position in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FeatureRegistry {
    records: Vec<FeatureRecord>,
}

impl FeatureRegistry {
    /// Records must already be in source order with ids matching positions.
    pub(crate) fn from_records(records: Vec<FeatureRecord>) -> Self {
        debug_assert!(records.iter().enumerate().all(|(i, r)| r.id.0 == i));
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FeatureRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    pub fn get(&self, id: FeatureId) -> Option<&FeatureRecord> {
        self.records.get(id.0)
    }

    /// First record with this name, in source order.
    ///
    /// Module comments have an empty name and are never returned, so
    /// `find("")` is always `None`.
    pub fn find(&self, name: &str) -> Option<&FeatureRecord> {
        self.records
            .iter()
            .find(|r| r.is_definition() && r.name == name)
    }

    /// Resolve a dotted path such as `Outer.Inner.method` through parent links.
    pub fn find_qualified(&self, path: &str) -> Option<&FeatureRecord> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self
            .top_level()
            .find(|r| r.is_definition() && r.name == first)?;
        for segment in segments {
            current = self
                .children(current.id)
                .find(|r| r.is_definition() && r.name == segment)?;
        }
        Some(current)
    }

    /// All records of a kind, in source order.
    pub fn by_kind(&self, kind: FeatureKind) -> impl Iterator<Item = &FeatureRecord> {
        self.records.iter().filter(move |r| r.kind == kind)
    }

    pub fn parent_of(&self, record: &FeatureRecord) -> Option<&FeatureRecord> {
        record.parent.and_then(|id| self.get(id))
    }

    /// Direct children of a record, in source order.
    pub fn children(&self, id: FeatureId) -> impl Iterator<Item = &FeatureRecord> {
        self.records.iter().filter(move |r| r.parent == Some(id))
    }

    pub fn top_level(&self) -> impl Iterator<Item = &FeatureRecord> {
        self.records.iter().filter(|r| r.parent.is_none())
    }

    /// Dotted name through enclosing definitions, e.g. `Outer.method`.
    pub fn qualified_name(&self, id: FeatureId) -> Option<String> {
        let mut record = self.get(id)?;
        let mut parts = vec![record.name.as_str()];
        while let Some(parent) = self.parent_of(record) {
            parts.push(parent.name.as_str());
            record = parent;
        }
        parts.reverse();
        Some(parts.join("."))
    }

    /// Nesting depth of a record; top-level records are at 0.
    pub fn nesting_level(&self, record: &FeatureRecord) -> usize {
        let mut level = 0;
        let mut current = record;
        while let Some(parent) = self.parent_of(current) {
            level += 1;
            current = parent;
        }
        level
    }
}

impl<'a> IntoIterator for &'a FeatureRegistry {
    type Item = &'a FeatureRecord;
    type IntoIter = std::slice::Iter<'a, FeatureRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

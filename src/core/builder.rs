//! Groups classified lines into feature records.
//!
//! The builder keeps a stack of open definitions keyed by indentation depth.
//! A significant line (definition, decorator, plain code) closes every open
//! definition whose depth is greater than or equal to its own. Comment lines
//! are held back as blocks until the next significant line shows where they
//! belong: the block directly above a definition becomes its documentation,
//! a docstring opening a definition body joins that definition's
//! documentation, and every other block becomes a module-comment record.

use std::mem;

use crate::{
    core::{
        driver::ExtractOptions,
        registry::{FeatureFlag, FeatureId, FeatureKind, FeatureRecord, FeatureRegistry},
        tokenizer::{ClassifiedLine, CommentStyle, DefHeader, DefKeyword, LineClassifier, LineRole},
    },
    issues::{AmbiguousNestingIssue, Issue, MalformedDefinitionIssue, UnterminatedBlockIssue},
};

/// Records and issues produced for one source text.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub registry: FeatureRegistry,
    pub issues: Vec<Issue>,
}

/// Run the tokenizer and builder over a whole source text.
pub fn build_features(source: &str, options: &ExtractOptions) -> BuildOutput {
    let mut builder = FeatureBuilder::new(options);
    for line in LineClassifier::new(source, options.tab_width) {
        builder.push(line);
    }
    builder.finish()
}

#[derive(Debug)]
struct OpenDefinition {
    id: FeatureId,
    depth: usize,
    /// Indentation of the first statement of the body, once seen.
    body_depth: Option<usize>,
    /// The header's brackets are still open.
    header_open: bool,
}

#[derive(Debug)]
struct CommentBlock<'a> {
    start: usize,
    end: usize,
    depth: usize,
    style: CommentStyle,
    lines: Vec<&'a str>,
    /// A blank line followed the block.
    closed: bool,
}

/// What the significant line being settled is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Definition,
    Decorator,
    Other,
}

/// Incremental builder: feed lines with [`push`](Self::push), then call
/// [`finish`](Self::finish) at end-of-file.
#[derive(Debug)]
pub struct FeatureBuilder<'a> {
    summary_marker: Option<String>,
    records: Vec<FeatureRecord>,
    stack: Vec<OpenDefinition>,
    blocks: Vec<CommentBlock<'a>>,
    doc_candidate: Option<CommentBlock<'a>>,
    decorators: Vec<String>,
    awaiting_docstring: Option<FeatureId>,
    continuing: bool,
    logical_start: usize,
    issues: Vec<Issue>,
}

impl<'a> FeatureBuilder<'a> {
    pub fn new(options: &ExtractOptions) -> Self {
        Self {
            summary_marker: options
                .summary_marker
                .clone()
                .filter(|marker| !marker.is_empty()),
            records: Vec::new(),
            stack: Vec::new(),
            blocks: Vec::new(),
            doc_candidate: None,
            decorators: Vec::new(),
            awaiting_docstring: None,
            continuing: false,
            logical_start: 0,
            issues: Vec::new(),
        }
    }

    pub fn push(&mut self, line: ClassifiedLine<'a>) {
        let continuation = self.continuing;
        if !continuation {
            self.logical_start = line.number;
        }
        self.continuing = line.continues;

        match line.role {
            LineRole::Blank => {
                if let Some(block) = self.blocks.last_mut() {
                    block.closed = true;
                }
            }
            LineRole::Comment(style) => self.on_comment(&line, style, continuation),
            LineRole::DefStart(header) => self.on_def_start(&line, header),
            LineRole::DefContinuation => self.on_def_continuation(&line),
            LineRole::Decorator => self.on_decorator(&line, continuation),
            LineRole::Plain => self.on_plain(&line, continuation),
        }
    }

    pub fn finish(mut self) -> BuildOutput {
        if self.continuing {
            let open_header = self
                .stack
                .iter()
                .rev()
                .find(|open| open.header_open)
                .map(|open| open.id);
            match open_header {
                Some(id) => {
                    let record = &mut self.records[id.0];
                    record.add_flag(FeatureFlag::MalformedDefinition);
                    self.issues.push(
                        MalformedDefinitionIssue {
                            line: record.start_line,
                            name: record.name.clone(),
                        }
                        .into(),
                    );
                }
                None => self.issues.push(
                    UnterminatedBlockIssue {
                        line: self.logical_start,
                    }
                    .into(),
                ),
            }
        }

        let mut blocks = mem::take(&mut self.blocks);
        if let Some(candidate) = self.doc_candidate.take() {
            blocks.insert(0, candidate);
        }
        for block in blocks {
            self.resolve_block(block, 0);
        }
        self.stack.clear();

        BuildOutput {
            registry: FeatureRegistry::from_records(into_source_order(self.records)),
            issues: self.issues,
        }
    }

    fn on_comment(&mut self, line: &ClassifiedLine<'a>, style: CommentStyle, continuation: bool) {
        if let Some(block) = self.blocks.last_mut()
            && !block.closed
            && block.style == style
            && block.end + 1 == line.number
            && (style == CommentStyle::Hash || continuation)
        {
            block.end = line.number;
            block.lines.push(line.text);
            return;
        }

        self.blocks.push(CommentBlock {
            start: line.number,
            end: line.number,
            depth: line.depth,
            style,
            lines: vec![line.text],
            closed: false,
        });
    }

    fn on_def_start(&mut self, line: &ClassifiedLine<'a>, header: DefHeader<'a>) {
        let ambiguous = self.settle(line.number, line.depth, Target::Definition);

        let id = FeatureId(self.records.len());
        let mut record = FeatureRecord {
            id,
            kind: match header.keyword {
                DefKeyword::Def => FeatureKind::Function,
                DefKeyword::Class => FeatureKind::Class,
            },
            name: header.name.to_string(),
            start_line: line.number,
            end_line: line.number,
            parent: self.stack.last().map(|open| open.id),
            doc_text: self
                .doc_candidate
                .take()
                .map(|block| comment_text(&block))
                .unwrap_or_default(),
            signature: line.code.trim().to_string(),
            decorators: mem::take(&mut self.decorators),
            flags: Vec::new(),
        };
        if ambiguous {
            record.add_flag(FeatureFlag::AmbiguousNesting);
        }
        self.records.push(record);
        self.extend_open(line.number);

        self.stack.push(OpenDefinition {
            id,
            depth: line.depth,
            body_depth: None,
            header_open: line.continues,
        });
        if !line.continues {
            self.finish_header(id);
        }
    }

    fn on_def_continuation(&mut self, line: &ClassifiedLine<'a>) {
        self.extend_open(line.number);

        let Some(top) = self.stack.last_mut() else {
            return;
        };
        if !top.header_open {
            return;
        }
        join_code(&mut self.records[top.id.0].signature, line.code);
        if !line.continues {
            top.header_open = false;
            let id = top.id;
            self.finish_header(id);
        }
    }

    fn on_decorator(&mut self, line: &ClassifiedLine<'a>, continuation: bool) {
        if continuation {
            if let Some(decorator) = self.decorators.last_mut() {
                join_code(decorator, line.code);
            }
            self.extend_open(line.number);
            return;
        }

        if self.settle(line.number, line.depth, Target::Decorator) {
            self.flag_enclosing(FeatureFlag::AmbiguousNesting);
        }
        self.decorators.push(line.code.trim().to_string());
        self.extend_open(line.number);
    }

    fn on_plain(&mut self, line: &ClassifiedLine<'a>, continuation: bool) {
        if !continuation && self.settle(line.number, line.depth, Target::Other) {
            self.flag_enclosing(FeatureFlag::AmbiguousNesting);
        }
        self.extend_open(line.number);
    }

    /// Resolve pending comment blocks and close the definitions ended by the
    /// significant line `number` at `depth`. Returns whether the line's
    /// indentation was ambiguous.
    fn settle(&mut self, number: usize, depth: usize, target: Target) -> bool {
        let mut blocks = mem::take(&mut self.blocks);

        match target {
            Target::Definition | Target::Decorator => {
                if self.doc_candidate.is_none()
                    && let Some(last) = blocks.last()
                    && last.style == CommentStyle::Hash
                    && !last.closed
                    && last.end + 1 == number
                {
                    self.doc_candidate = blocks.pop();
                }
            }
            Target::Other => {
                if let Some(candidate) = self.doc_candidate.take() {
                    blocks.insert(0, candidate);
                }
                self.decorators.clear();
            }
        }

        for block in blocks {
            self.resolve_block(block, depth);
        }

        let ambiguous = self.close_for(number, depth);
        self.awaiting_docstring = None;
        ambiguous
    }

    fn resolve_block(&mut self, block: CommentBlock<'a>, depth: usize) {
        if block.style == CommentStyle::Docstring
            && let Some(owner) = self.awaiting_docstring.take()
            && let Some(top) = self.stack.last_mut()
            && top.id == owner
            && block.depth > top.depth
        {
            top.body_depth.get_or_insert(block.depth);
            let text = docstring_text(&block.lines);
            let record = &mut self.records[owner.0];
            if !text.is_empty() {
                if !record.doc_text.is_empty() {
                    record.doc_text.push_str("\n\n");
                }
                record.doc_text.push_str(&text);
            }
            self.extend_open(block.end);
            return;
        }

        // Definitions that the following line closes and that do not enclose
        // the block end before it. A definition already extended past the
        // block (by decorators that followed it) keeps it as a child.
        while let Some(top) = self.stack.last()
            && top.depth >= depth
            && top.depth >= block.depth
            && self.records[top.id.0].end_line < block.end
        {
            self.stack.pop();
        }

        let doc_text = comment_text(&block);
        let mut record = FeatureRecord {
            id: FeatureId(self.records.len()),
            kind: FeatureKind::ModuleComment,
            name: String::new(),
            start_line: block.start,
            end_line: block.end,
            parent: self.stack.last().map(|open| open.id),
            doc_text,
            signature: String::new(),
            decorators: Vec::new(),
            flags: Vec::new(),
        };
        if let Some(marker) = &self.summary_marker
            && record.doc_text.trim_start().starts_with(marker.as_str())
        {
            record.add_flag(FeatureFlag::GeneratedSummary);
        }
        self.records.push(record);
        self.extend_open(block.end);
    }

    fn close_for(&mut self, number: usize, depth: usize) -> bool {
        let mut closed_depths = Vec::new();
        while let Some(top) = self.stack.last()
            && top.depth >= depth
        {
            closed_depths.push(top.depth);
            self.stack.pop();
        }

        let ambiguous = match self.stack.last() {
            Some(top) => match top.body_depth {
                Some(body) if closed_depths.is_empty() => depth < body,
                Some(body) => depth != body && !closed_depths.contains(&depth),
                None => false,
            },
            None => !closed_depths.is_empty() && depth != 0 && !closed_depths.contains(&depth),
        };

        if let Some(top) = self.stack.last_mut()
            && top.body_depth.is_none()
        {
            top.body_depth = Some(depth);
        }

        if ambiguous {
            self.issues
                .push(AmbiguousNestingIssue { line: number, depth }.into());
        }
        ambiguous
    }

    fn finish_header(&mut self, id: FeatureId) {
        let record = &mut self.records[id.0];
        record.signature = header_signature(&record.signature).to_string();
        self.awaiting_docstring = Some(id);
    }

    fn flag_enclosing(&mut self, flag: FeatureFlag) {
        if let Some(top) = self.stack.last() {
            self.records[top.id.0].add_flag(flag);
        }
    }

    /// Every open definition contains `line`.
    fn extend_open(&mut self, line: usize) {
        for open in &self.stack {
            let record = &mut self.records[open.id.0];
            record.end_line = record.end_line.max(line);
        }
    }
}

/// Sort records by start line and renumber ids and parent links to match.
fn into_source_order(mut records: Vec<FeatureRecord>) -> Vec<FeatureRecord> {
    records.sort_by_key(|record| (record.start_line, record.id));

    let mut remap = vec![FeatureId(0); records.len()];
    for (index, record) in records.iter().enumerate() {
        remap[record.id.0] = FeatureId(index);
    }
    for record in &mut records {
        record.id = remap[record.id.0];
        record.parent = record.parent.map(|parent| remap[parent.0]);
    }
    records
}

/// Append a continuation line's code to a header, without padding inside
/// brackets.
fn join_code(buffer: &mut String, code: &str) {
    let code = code.trim();
    if code.is_empty() {
        return;
    }
    let tight = buffer.ends_with(['(', '[', '{']) || code.starts_with([')', ']', '}']);
    if !buffer.is_empty() && !tight {
        buffer.push(' ');
    }
    buffer.push_str(code);
}

/// Header text up to the colon that ends it (outside brackets and strings).
fn header_signature(header: &str) -> &str {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in header.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => return header[..i].trim_end(),
            _ => {}
        }
    }
    header.trim_end()
}

fn comment_text(block: &CommentBlock<'_>) -> String {
    match block.style {
        CommentStyle::Hash => block
            .lines
            .iter()
            .map(|line| {
                let line = line.trim_start();
                let line = line.strip_prefix('#').unwrap_or(line);
                line.strip_prefix(' ').unwrap_or(line).trim_end()
            })
            .collect::<Vec<_>>()
            .join("\n"),
        CommentStyle::Docstring => docstring_text(&block.lines),
    }
}

/// Docstring body with delimiters removed and common indentation stripped.
fn docstring_text(lines: &[&str]) -> String {
    let joined = lines.join("\n");
    let body = joined
        .trim()
        .trim_start_matches(['r', 'R', 'u', 'U', 'b', 'B', 'f', 'F']);

    let delimiter = if body.starts_with("\"\"\"") {
        "\"\"\""
    } else if body.starts_with("'''") {
        "'''"
    } else {
        return body.to_string();
    };
    let body = &body[delimiter.len()..];
    let body = match body.find(delimiter) {
        Some(end) => &body[..end],
        None => body,
    };

    let mut body_lines = body.lines();
    let first = body_lines.next().unwrap_or("").trim();
    let rest: Vec<&str> = body_lines.collect();
    let indent = rest
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned = vec![first];
    cleaned.extend(rest.iter().map(|line| {
        line.get(indent..)
            .unwrap_or_else(|| line.trim_start())
            .trim_end()
    }));
    cleaned.join("\n").trim().to_string()
}

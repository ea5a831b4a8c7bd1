//! Line classification for Python source text.
//!
//! [`LineClassifier`] walks the text one physical line at a time and tags each
//! line with a [`LineRole`]. It never builds a syntax tree: the only state it
//! carries between lines is whether a string literal is open, how many
//! brackets are open, and the role of the logical line being continued.
//!
//! Quote state is tracked independently of comment state, so `#` inside a
//! string literal is never a comment, and `def`/`class` inside a string or
//! docstring never starts a definition.

use std::sync::LazyLock;

use regex::Regex;

/// Default tab stop width, matching the Python tokenizer.
pub const DEFAULT_TAB_WIDTH: usize = 8;

// Matches a definition header at the start of a trimmed line.
// Capture group 1: `async` prefix, group 2: keyword, group 3: identifier.
static DEF_HEADER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(async\s+)?(def|class)\s+([^\W\d]\w*)").unwrap());

// Matches a statement-level triple-quoted string (docstring), with an optional
// string prefix: one of `r u b f`, or `r` paired with `b` or `f` in either order.
static DOCSTRING_START_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(?i:rb|br|rf|fr|[rubf])?("""|''')"#).unwrap());

/// How a comment line is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentStyle {
    /// `# comment`
    Hash,
    /// Statement-level triple-quoted string: `"""docstring"""`
    Docstring,
}

/// Keyword that opened a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefKeyword {
    Def,
    Class,
}

/// Header of a definition line: `async def name(`, `class Name:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefHeader<'a> {
    pub keyword: DefKeyword,
    pub name: &'a str,
    pub is_async: bool,
}

/// Role of one physical line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole<'a> {
    Blank,
    Comment(CommentStyle),
    DefStart(DefHeader<'a>),
    /// Continuation of a definition header whose brackets are still open.
    DefContinuation,
    Decorator,
    Plain,
}

impl LineRole<'_> {
    /// Short kebab-case label, used in debug renderings and tests.
    pub fn label(&self) -> &'static str {
        match self {
            LineRole::Blank => "blank",
            LineRole::Comment(CommentStyle::Hash) => "comment",
            LineRole::Comment(CommentStyle::Docstring) => "docstring",
            LineRole::DefStart(_) => "def-start",
            LineRole::DefContinuation => "def-continuation",
            LineRole::Decorator => "decorator",
            LineRole::Plain => "plain",
        }
    }
}

/// One physical line of source text with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine<'a> {
    /// 1-based line number.
    pub number: usize,
    /// Byte offset of the first character of the line.
    pub offset: usize,
    /// Indentation in columns. Continuation lines carry the depth of the
    /// line that opened their logical line.
    pub depth: usize,
    pub role: LineRole<'a>,
    /// Line text without the line terminator.
    pub text: &'a str,
    /// Text before a trailing `#` comment.
    pub code: &'a str,
    /// Whether the logical line carries on to the next physical line.
    pub continues: bool,
}

/// Role of the logical line that the next physical line continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Continuation {
    Def,
    Decorator,
    Docstring,
    Plain,
}

impl Continuation {
    fn role<'a>(self) -> LineRole<'a> {
        match self {
            Continuation::Def => LineRole::DefContinuation,
            Continuation::Decorator => LineRole::Decorator,
            Continuation::Docstring => LineRole::Comment(CommentStyle::Docstring),
            Continuation::Plain => LineRole::Plain,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenString {
    quote: u8,
    triple: bool,
}

/// Result of scanning the code of one line.
struct LineScan {
    code_end: usize,
    continues: bool,
}

/// Lazy, restartable classifier over the lines of one source text.
///
/// Cloning a classifier gives an independent cursor at the same position.
#[derive(Debug, Clone)]
pub struct LineClassifier<'a> {
    source: &'a str,
    pos: usize,
    line_number: usize,
    tab_width: usize,
    string: Option<OpenString>,
    brackets: usize,
    logical: Option<(Continuation, usize)>,
}

impl<'a> LineClassifier<'a> {
    pub fn new(source: &'a str, tab_width: usize) -> Self {
        Self {
            source,
            pos: 0,
            line_number: 0,
            tab_width: tab_width.max(1),
            string: None,
            brackets: 0,
            logical: None,
        }
    }

    /// A fresh cursor at the beginning of the same text.
    pub fn restart(&self) -> Self {
        Self::new(self.source, self.tab_width)
    }

    fn classify(&mut self, text: &'a str, offset: usize) -> ClassifiedLine<'a> {
        let number = self.line_number;

        if let Some((kind, depth)) = self.logical.take() {
            let scan = self.scan(text);
            if scan.continues {
                self.logical = Some((kind, depth));
            }
            return ClassifiedLine {
                number,
                offset,
                depth,
                role: kind.role(),
                text,
                code: &text[..scan.code_end],
                continues: scan.continues,
            };
        }

        let depth = indentation_depth(text, self.tab_width);
        let trimmed = text.trim_start_matches([' ', '\t', '\x0c']);

        if trimmed.trim_end().is_empty() {
            return ClassifiedLine {
                number,
                offset,
                depth,
                role: LineRole::Blank,
                text,
                code: "",
                continues: false,
            };
        }

        if trimmed.starts_with('#') {
            return ClassifiedLine {
                number,
                offset,
                depth,
                role: LineRole::Comment(CommentStyle::Hash),
                text,
                code: "",
                continues: false,
            };
        }

        let (kind, role) = if DOCSTRING_START_REGEX.is_match(trimmed) {
            (
                Continuation::Docstring,
                LineRole::Comment(CommentStyle::Docstring),
            )
        } else if trimmed.starts_with('@') {
            (Continuation::Decorator, LineRole::Decorator)
        } else if let Some(header) = parse_def_header(trimmed) {
            (Continuation::Def, LineRole::DefStart(header))
        } else {
            (Continuation::Plain, LineRole::Plain)
        };

        let scan = self.scan(text);
        if scan.continues {
            self.logical = Some((kind, depth));
        }

        ClassifiedLine {
            number,
            offset,
            depth,
            role,
            text,
            code: &text[..scan.code_end],
            continues: scan.continues,
        }
    }

    /// Advance string and bracket state across one line of text.
    fn scan(&mut self, text: &str) -> LineScan {
        let bytes = text.as_bytes();
        let mut code_end = bytes.len();
        let mut escaped_eol = false;
        let mut backslash_eol = false;
        let mut i = 0;

        while i < bytes.len() {
            let b = bytes[i];

            if let Some(open) = self.string {
                if b == b'\\' {
                    if i + 1 >= bytes.len() {
                        escaped_eol = true;
                    }
                    i += 2;
                    continue;
                }
                if b == open.quote {
                    if !open.triple {
                        self.string = None;
                        i += 1;
                        continue;
                    }
                    if bytes[i..].starts_with(&[b, b, b]) {
                        self.string = None;
                        i += 3;
                        continue;
                    }
                }
                i += 1;
                continue;
            }

            match b {
                b'#' => {
                    code_end = i;
                    break;
                }
                b'"' | b'\'' => {
                    let triple = bytes[i..].starts_with(&[b, b, b]);
                    self.string = Some(OpenString { quote: b, triple });
                    i += if triple { 3 } else { 1 };
                }
                b'(' | b'[' | b'{' => {
                    self.brackets += 1;
                    i += 1;
                }
                b')' | b']' | b'}' => {
                    self.brackets = self.brackets.saturating_sub(1);
                    i += 1;
                }
                b'\\' => {
                    if i + 1 == bytes.len() {
                        backslash_eol = true;
                    }
                    i += 1;
                }
                _ => i += 1,
            }
        }

        // A single-quoted string only survives the line end through an escape.
        if let Some(open) = self.string
            && !open.triple
            && !escaped_eol
        {
            self.string = None;
        }

        LineScan {
            code_end,
            continues: self.string.is_some() || self.brackets > 0 || backslash_eol,
        }
    }
}

impl<'a> Iterator for LineClassifier<'a> {
    type Item = ClassifiedLine<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.source.len() {
            return None;
        }

        let remaining = &self.source[self.pos..];
        let (raw, consumed) = match remaining.find('\n') {
            Some(i) => (&remaining[..i], i + 1),
            None => (remaining, remaining.len()),
        };
        let text = raw.strip_suffix('\r').unwrap_or(raw);

        let offset = self.pos;
        self.pos += consumed;
        self.line_number += 1;

        Some(self.classify(text, offset))
    }
}

/// Classify every line of `source`.
pub fn classify_lines(source: &str, tab_width: usize) -> LineClassifier<'_> {
    LineClassifier::new(source, tab_width)
}

/// Leading whitespace in columns, with tabs expanded to the next tab stop.
pub fn indentation_depth(line: &str, tab_width: usize) -> usize {
    let tab_width = tab_width.max(1);
    let mut column = 0;
    for c in line.chars() {
        match c {
            ' ' => column += 1,
            '\t' => column += tab_width - column % tab_width,
            // Form feed resets the column, as in the Python tokenizer.
            '\x0c' => column = 0,
            _ => break,
        }
    }
    column
}

fn parse_def_header(trimmed: &str) -> Option<DefHeader<'_>> {
    let captures = DEF_HEADER_REGEX.captures(trimmed)?;
    let keyword = match captures.get(2)?.as_str() {
        "class" => DefKeyword::Class,
        _ => DefKeyword::Def,
    };
    Some(DefHeader {
        keyword,
        name: captures.get(3)?.as_str(),
        is_async: captures.get(1).is_some(),
    })
}

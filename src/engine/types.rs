//! Values exchanged with the engine.

use std::fmt;
use std::ops::Range;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::source::SourcePath;

// =============================================================================
// Positions & diagnostics
// =============================================================================

/// Zero-based line and column (in characters) inside a text source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineCol {
    pub line: u32,
    pub column: u32,
}

impl LineCol {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Humans count from one
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A structured message reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Source the diagnostic points into, if any.
    pub path: Option<SourcePath>,
    pub span: Option<Range<LineCol>>,
    pub hints: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            path: None,
            span: None,
            hints: Vec::new(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(message)
        }
    }

    pub fn at(mut self, path: SourcePath, span: Option<Range<LineCol>>) -> Self {
        self.path = Some(path);
        self.span = span;
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{label}: {}", self.message)?;
        match (&self.path, &self.span) {
            (Some(path), Some(span)) => write!(f, "\n  --> {path}:{}", span.start)?,
            (Some(path), None) => write!(f, "\n  --> {path}")?,
            _ => {}
        }
        for hint in &self.hints {
            write!(f, "\n  = hint: {hint}")?;
        }
        Ok(())
    }
}

/// Result the engine reports for one compile submission.
#[derive(Debug, Clone)]
pub enum CompileOutput {
    /// Rendered artifact bytes plus non-fatal warnings.
    Document {
        artifact: Arc<[u8]>,
        warnings: Vec<Diagnostic>,
    },
    /// Compilation failed with these diagnostics.
    Failed(Vec<Diagnostic>),
}

// =============================================================================
// Highlighting
// =============================================================================

/// One highlighted byte range of a text, tagged with a scope name such as
/// `markup.heading` or `comment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
    pub range: Range<usize>,
    pub tag: String,
}

/// Highlighting for a whole text. The default value is the neutral answer
/// handed to superseded callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Highlighted {
    pub spans: Vec<HighlightSpan>,
}

impl Highlighted {
    pub fn new(spans: Vec<HighlightSpan>) -> Self {
        Self { spans }
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Innermost tag covering `offset`.
    pub fn tag_at(&self, offset: usize) -> Option<&str> {
        self.spans
            .iter()
            .filter(|span| span.range.contains(&offset))
            .min_by_key(|span| span.range.len())
            .map(|span| span.tag.as_str())
    }
}

// =============================================================================
// Autocompletion
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    Syntax,
    Function,
    Parameter,
    Constant,
    Symbol,
    Type,
}

/// One autocompletion candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub label: String,
    /// Text to insert; may contain `${...}` placeholders.
    pub apply: String,
    pub detail: Option<String>,
}

/// How a suggestion edits the text once chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Nothing left to insert after placeholders are stripped.
    Empty,
    Insert(String),
    /// Insert `text`, then place the cursor `cursor` bytes into it.
    InsertWithCursor { text: String, cursor: usize },
}

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{[^${}]*\}").unwrap());

impl Suggestion {
    /// Strip `${...}` placeholders; the cursor goes where the first one was.
    pub fn completion(&self) -> Completion {
        let cleaned = PLACEHOLDER.replace_all(&self.apply, "").into_owned();
        if cleaned.is_empty() {
            return Completion::Empty;
        }
        match PLACEHOLDER.find(&self.apply) {
            Some(first) => Completion::InsertWithCursor {
                text: cleaned,
                cursor: first.start(),
            },
            None => Completion::Insert(cleaned),
        }
    }
}

/// Rank suggestions against what the user typed so far.
///
/// Labels must contain the query as a case-insensitive subsequence. Prefix
/// matches rank first, then tighter matches; ties keep the engine's order.
pub fn filter_suggestions(suggestions: &[Suggestion], query: &str) -> Vec<Suggestion> {
    if query.is_empty() {
        return suggestions.to_vec();
    }

    let query: Vec<char> = query.to_lowercase().chars().collect();
    let mut scored: Vec<(usize, &Suggestion)> = suggestions
        .iter()
        .filter_map(|s| match_score(&s.label.to_lowercase(), &query).map(|score| (score, s)))
        .collect();
    scored.sort_by_key(|(score, _)| *score);
    scored.into_iter().map(|(_, s)| s.clone()).collect()
}

/// Lower is better. `None` if `query` is not a subsequence of `label`.
fn match_score(label: &str, query: &[char]) -> Option<usize> {
    let mut first = None;
    let mut last = 0;
    let mut needle = query.iter().peekable();
    for (i, c) in label.chars().enumerate() {
        if needle.peek() == Some(&&c) {
            needle.next();
            first.get_or_insert(i);
            last = i;
        }
    }
    if needle.peek().is_some() {
        return None;
    }
    let first = first.unwrap_or(0);
    // Matches starting at 0 outrank everything else
    let spread = last - first + 1 - query.len();
    Some(first * 1000 + spread)
}

// =============================================================================
// Fonts & package cache
// =============================================================================

/// A font file handed to the engine.
#[derive(Debug, Clone)]
pub struct FontData {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

/// Key of the auxiliary package cache: `@namespace/name:version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageSpec {
    pub namespace: String,
    pub name: String,
    pub version: String,
}

impl PackageSpec {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// Split `@ns/name:ver/inner/file` into the spec and the inner path.
    pub fn split_path(raw: &str) -> Option<(Self, &str)> {
        let rest = raw.strip_prefix('@')?;
        let (namespace, rest) = rest.split_once('/')?;
        let (name, rest) = rest.split_once(':')?;
        let (version, inner) = match rest.split_once('/') {
            Some((version, inner)) => (version, inner),
            None => (rest, ""),
        };
        if namespace.is_empty() || name.is_empty() || version.is_empty() {
            return None;
        }
        Some((Self::new(namespace, name, version), inner.trim_matches('/')))
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}/{}:{}", self.namespace, self.name, self.version)
    }
}

use std::{ops::Range, path::Path};

use swc_core::{
    common::{BytePos, Span, Spanned},
    ecma::{
        ast::Module,
        parser::{EsSyntax, Parser, StringInput, Syntax, TsSyntax},
    },
};

use crate::error::{Result, TransformError};

// Spans handed out by the parser start here; offset 0 is reserved for DUMMY_SP.
const START_POS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// ECMAScript with JSX.
    Js,
    Ts,
    Tsx,
}

impl Dialect {
    /// Picks a dialect from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "ts" | "mts" | "cts" => Dialect::Ts,
            "tsx" => Dialect::Tsx,
            _ => Dialect::Js,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map_or(Dialect::Js, Dialect::from_extension)
    }

    fn syntax(self) -> Syntax {
        match self {
            Dialect::Js => Syntax::Es(EsSyntax {
                jsx: true,
                ..Default::default()
            }),
            Dialect::Ts => Syntax::Typescript(TsSyntax {
                tsx: false,
                ..Default::default()
            }),
            Dialect::Tsx => Syntax::Typescript(TsSyntax {
                tsx: true,
                ..Default::default()
            }),
        }
    }
}

/// One file's text plus its parsed module. The text is never mutated; the
/// transform builds a new string from [`Edit`]s.
pub struct SourceUnit<'a> {
    pub text: &'a str,
    pub module: Module,
    line_starts: Vec<usize>,
}

impl<'a> SourceUnit<'a> {
    pub fn parse(name: &str, text: &'a str, dialect: Dialect) -> Result<Self> {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect::<Vec<_>>();

        let end = START_POS + text.len() as u32;
        let input = StringInput::new(text, BytePos(START_POS), BytePos(end));
        let mut parser = Parser::new(dialect.syntax(), input, None);
        let parsed = parser.parse_module();
        // Recovered errors still mean the input is not valid syntax.
        let first_error = match parsed {
            Ok(module) => match parser.take_errors().into_iter().next() {
                None => {
                    return Ok(Self {
                        text,
                        module,
                        line_starts,
                    })
                }
                Some(e) => e,
            },
            Err(e) => e,
        };
        let offset = to_offset(text, first_error.span().lo);
        let (line, column) = line_col(text, &line_starts, offset);
        Err(TransformError::Parse {
            file: name.to_string(),
            line,
            column,
            message: first_error.kind().msg().to_string(),
        })
    }

    pub fn offset(&self, pos: BytePos) -> usize {
        to_offset(self.text, pos)
    }

    pub fn range(&self, span: Span) -> Range<usize> {
        self.offset(span.lo)..self.offset(span.hi)
    }

    pub fn slice(&self, span: Span) -> &'a str {
        let text: &'a str = self.text;
        &text[self.range(span)]
    }

    /// 1-based line and column (in chars) of a byte offset.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        line_col(self.text, &self.line_starts, offset)
    }

    pub fn span_line_col(&self, span: Span) -> (usize, usize) {
        self.line_col(self.offset(span.lo))
    }
}

fn to_offset(text: &str, pos: BytePos) -> usize {
    (pos.0.saturating_sub(START_POS) as usize).min(text.len())
}

fn line_col(text: &str, line_starts: &[usize], offset: usize) -> (usize, usize) {
    let line = match line_starts.binary_search(&offset) {
        Ok(i) => i,
        Err(i) => i - 1,
    };
    let start = line_starts[line];
    let column = text[start..offset].chars().count() + 1;
    (line + 1, column)
}

/// A replacement of `range` in the original text. Empty ranges are inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: Range<usize>,
    pub text: String,
}

impl Edit {
    pub fn replace(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(at..at, text)
    }
}

/// Applies non-overlapping edits to `text`. An edit overlapping an earlier
/// one is dropped; inserts at the same offset keep their given order.
pub fn apply_edits(text: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| (e.range.start, e.range.end));
    let mut out = String::with_capacity(text.len() + edits.iter().map(|e| e.text.len()).sum::<usize>());
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor {
            tracing::warn!(start = edit.range.start, end = edit.range.end, "dropping overlapping edit");
            continue;
        }
        out.push_str(&text[cursor..edit.range.start]);
        out.push_str(&edit.text);
        cursor = edit.range.end;
    }
    out.push_str(&text[cursor..]);
    out
}

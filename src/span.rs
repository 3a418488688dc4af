use std::fmt::{Display, Formatter, Result as FmtResult};
use std::rc::Rc;

use crate::source::Source;

/// A `Span` refers to a section of a `Source`, carrying a reference to where
/// it came from so it can render itself for diagnostics without the caller
/// having to thread the source text around separately.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Span {
    source: Option<Rc<Source>>,
    offset: usize,
    length: usize,
}

impl Span {
    pub fn new(source: &Rc<Source>, offset: usize, length: usize) -> Span {
        Span { source: Some(Rc::clone(source)), offset, length }
    }

    /// A `Span` pointing at a single byte offset.
    pub fn point(source: &Rc<Source>, offset: usize) -> Span {
        Span { source: Some(Rc::clone(source)), offset, length: 1 }
    }

    /// An empty `Span`; combining it with another `Span` yields the other.
    pub fn empty() -> Span {
        Span { source: None, offset: 0, length: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_none()
    }

    pub fn offset(&self) -> usize { self.offset }
    pub fn length(&self) -> usize { self.length }

    /// Returns the smallest `Span` covering both `a` and `b`.
    pub fn combine(a: &Span, b: &Span) -> Span {
        if a.is_empty() { return b.clone(); }
        if b.is_empty() { return a.clone(); }

        if a.source != b.source {
            panic!("can't combine two spans from separate sources");
        }

        let offset = a.offset.min(b.offset);
        let end = (a.offset + a.length).max(b.offset + b.length);

        Span::new(a.source.as_ref().unwrap(), offset, end - offset)
    }

    pub fn join(mut spans: Vec<Span>) -> Span {
        let mut combined = match spans.pop() {
            Some(span) => span,
            None => return Span::empty(),
        };

        while let Some(span) = spans.pop() {
            combined = Span::combine(&combined, &span);
        }

        combined
    }

    pub fn contents(&self) -> String {
        if self.is_empty() { return String::new(); }
        self.source.as_ref().unwrap().contents[self.offset..self.offset + self.length].to_string()
    }

    /// 1-indexed (line, column) of the start of this span.
    pub fn line_col(&self) -> (usize, usize) {
        if self.is_empty() { return (1, 1); }
        let contents = &self.source.as_ref().unwrap().contents;
        let before = &contents[..self.offset.min(contents.len())];
        let line = before.matches('\n').count() + 1;
        let col = match before.rfind('\n') {
            Some(i) => self.offset - i,
            None => self.offset + 1,
        };
        (line, col)
    }

    fn line_indices(&self) -> Option<((usize, usize), (usize, usize))> {
        if self.is_empty() { return None; }

        let start = self.offset;
        let end = self.offset + self.length;
        let contents = &self.source.as_ref().unwrap().contents;

        let start_lines: Vec<&str> = contents[..=start.min(contents.len().saturating_sub(1))].lines().collect();
        let end_lines: Vec<&str> = contents[..=end.min(contents.len()).saturating_sub(1).max(0)].lines().collect();

        let start_line = start_lines.len().saturating_sub(1);
        let end_line = end_lines.len().saturating_sub(1);

        let start_col = start_lines.last().map(|l| l.len()).unwrap_or(0);
        let end_col = end_lines.last().map(|l| l.len()).unwrap_or(0);

        Some(((start_line, start_col), (end_line, end_col)))
    }
}

/// Renders a single-line-friendly gutter similar to:
/// ```plain
/// 12 | x = undefined_name
///    |     ^^^^^^^^^^^^^^
/// ```
impl Display for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.is_empty() {
            return write!(f, "(no location)");
        }

        let contents = &self.source.as_ref().unwrap().contents;
        let lines: Vec<&str> = contents.lines().collect();
        let ((start_line, start_col), (end_line, _)) = match self.line_indices() {
            Some(li) => li,
            None => return write!(f, "(no location)"),
        };

        let readable_line = (end_line + 1).to_string();
        let padding = readable_line.len();
        let separator = format!("{} |", " ".repeat(padding));

        if start_line == end_line {
            let l = lines.get(end_line).copied().unwrap_or("");
            let caret_len = self.length.max(1).min(l.len().saturating_sub(start_col).max(1));
            writeln!(f, "{} | {}", readable_line, l)?;
            write!(
                f,
                "{} | {}{}",
                " ".repeat(padding),
                " ".repeat(start_col),
                "^".repeat(caret_len),
            )
        } else {
            let formatted = lines[start_line..=end_line.min(lines.len().saturating_sub(1))]
                .iter()
                .enumerate()
                .map(|(i, l)| format!("{} > {}", start_line + i + 1, l))
                .collect::<Vec<String>>()
                .join("\n");
            writeln!(f, "{}", separator)?;
            write!(f, "{}", formatted)
        }
    }
}

/// Wraps a value with the `Span` it was parsed/lexed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub item: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(item: T, span: Span) -> Spanned<T> {
        Spanned { item, span }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned { item: f(self.item), span: self.span }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combination() {
        let source = Source::source("heck, that's awesome");
        let a = Span::new(&source, 0, 5);
        let b = Span::new(&source, 11, 2);

        assert_eq!(Span::combine(&a, &b), Span::new(&source, 0, 13));
    }

    #[test]
    fn span_and_contents() {
        let source = Source::source("hello, this is some text!");
        let spans = vec![
            Span::new(&source, 0, 8),
            Span::new(&source, 7, 5),
            Span::new(&source, 12, 4),
        ];
        let result = Span::new(&source, 0, 16);

        assert_eq!(Span::join(spans).contents(), result.contents());
    }

    #[test]
    fn line_col_first_line() {
        let source = Source::source("abc\ndef");
        let span = Span::new(&source, 1, 1);
        assert_eq!(span.line_col(), (1, 2));
    }

    #[test]
    fn line_col_second_line() {
        let source = Source::source("abc\ndef");
        let span = Span::new(&source, 5, 1);
        assert_eq!(span.line_col(), (2, 2));
    }
}

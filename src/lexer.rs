use std::iter::once;
use std::rc::Rc;
use std::str::{Chars, FromStr};

use crate::error::LexError;
use crate::source::Source;
use crate::span::{Span, Spanned};
use crate::token::{Token, Tokens, KEYWORDS};

const MULTI_CHAR_OPERATORS: &[&str] = &["==", "!=", "<=", ">=", "&&", "||", "..", "<-"];
const SINGLE_CHAR_OPERATORS: &str = "+-*/%=<>!";
const TAB_WIDTH: usize = 4;

/// Indentation-aware lexer. Produces one flat token stream for the whole
/// source, arming INDENT/DEDENT emission at physical line starts and
/// collapsing whitespace/comments everywhere else, following the
/// strip-then-scan shape of the teacher's token-at-a-time lexer.
pub struct Lexer {
    source: Rc<Source>,
    index: usize,
    indents: Vec<usize>,
    at_line_start: bool,
    tokens: Tokens,
}

impl Lexer {
    pub fn lex(source: Rc<Source>) -> Result<Tokens, LexError> {
        let mut lexer = Lexer {
            source,
            index: 0,
            indents: vec![0],
            at_line_start: true,
            tokens: vec![],
        };

        while lexer.index < lexer.source.contents.len() {
            if lexer.at_line_start {
                if lexer.handle_line_start()? {
                    continue;
                }
            }

            lexer.skip_inline_whitespace_and_comments();
            if lexer.index >= lexer.source.contents.len() {
                break;
            }

            let token = lexer.next_token()?;
            if token.item == Token::Newline {
                lexer.at_line_start = true;
            }
            lexer.tokens.push(token);
        }

        // flush outstanding indentation on EOF
        while lexer.indents.len() > 1 {
            lexer.indents.pop();
            lexer.tokens.push(Spanned::new(Token::Dedent, Span::point(&lexer.source, lexer.index)));
        }
        lexer.tokens.push(Spanned::new(Token::Eof, Span::point(&lexer.source, lexer.index)));

        Ok(lexer.tokens)
    }

    fn remaining(&self) -> Chars {
        self.source.contents[self.index..].chars()
    }

    fn peek_char(&self) -> Option<char> {
        self.remaining().next()
    }

    fn grab_from_index(&self, len: usize) -> &str {
        &self.source.contents[self.index..self.index + len]
    }

    /// Measures leading whitespace of the current line. Returns `None` if the
    /// line is blank or comment-only (it should be skipped entirely without
    /// affecting the indentation stack).
    fn measure_indent(&self) -> (usize, usize) {
        let mut width = 0;
        let mut len = 0;
        for c in self.remaining() {
            match c {
                ' ' => { width += 1; len += 1; }
                '\t' => { width += TAB_WIDTH; len += 1; }
                _ => break,
            }
        }
        (width, len)
    }

    /// Handles indentation bookkeeping at a physical line start. Returns
    /// `true` if the caller should loop back around (blank/comment-only
    /// line consumed, or INDENT/DEDENT tokens emitted and line-start
    /// disarmed so the rest of the line lexes normally).
    fn handle_line_start(&mut self) -> Result<bool, LexError> {
        let (width, len) = self.measure_indent();
        let after_indent = self.index + len;
        let rest = &self.source.contents[after_indent..];

        // blank line
        if rest.starts_with('\n') || rest.is_empty() {
            self.index = after_indent + if rest.starts_with('\n') { 1 } else { 0 };
            if rest.is_empty() { self.at_line_start = false; }
            return Ok(true);
        }
        // comment-only line
        if rest.starts_with("//") {
            self.index = after_indent;
            self.skip_inline_whitespace_and_comments();
            if self.peek_char() == Some('\n') { self.index += 1; }
            return Ok(true);
        }

        self.at_line_start = false;
        let top = *self.indents.last().unwrap();

        if width > top {
            self.indents.push(width);
            self.index = after_indent;
            self.tokens.push(Spanned::new(Token::Indent, Span::new(&self.source, self.index, 0)));
            return Ok(true);
        }

        if width < top {
            while *self.indents.last().unwrap() > width {
                self.indents.pop();
                self.tokens.push(Spanned::new(Token::Dedent, Span::new(&self.source, after_indent, 0)));
            }
            if *self.indents.last().unwrap() != width {
                return Err(LexError::InconsistentIndentation {
                    width,
                    span: Span::new(&self.source, self.index, len),
                });
            }
            self.index = after_indent;
            return Ok(true);
        }

        self.index = after_indent;
        Ok(false)
    }

    /// Skips spaces/tabs (not newlines) and comments, without touching
    /// indentation state. Used mid-line.
    fn skip_inline_whitespace_and_comments(&mut self) {
        loop {
            let start = self.index;
            let mut chars = self.remaining().peekable();

            while let Some(&c) = chars.peek() {
                if c == '\n' || !c.is_whitespace() { break; }
                self.index += c.len_utf8();
                chars.next();
            }

            if self.grab_rest().starts_with("//") {
                while let Some(c) = self.peek_char() {
                    if c == '\n' { break; }
                    self.index += c.len_utf8();
                }
            } else if self.grab_rest().starts_with("/*") {
                self.index += 2;
                while self.index < self.source.contents.len() && !self.grab_rest().starts_with("*/") {
                    let c = self.peek_char().unwrap();
                    self.index += c.len_utf8();
                }
                if self.grab_rest().starts_with("*/") { self.index += 2; }
            }

            if self.index == start { break; }
        }
    }

    fn grab_rest(&self) -> &str {
        &self.source.contents[self.index..]
    }

    fn take_while<T>(
        &self,
        remaining: &mut impl Iterator<Item = char>,
        wrap: impl Fn(&str) -> T,
        pred: impl Fn(char) -> bool,
    ) -> (T, usize) {
        let mut len = 0;
        while let Some(n) = remaining.next() {
            if !pred(n) { break; }
            len += n.len_utf8();
        }
        (wrap(self.grab_from_index(len)), len)
    }

    fn string(&self) -> Result<(Token, usize), LexError> {
        // opening quote already known to be present, not yet consumed
        let mut len = 1;
        let mut escape = false;
        let mut out = String::new();
        let mut chars = self.remaining();
        chars.next(); // consume opening quote

        for c in chars {
            let bytes = c.len_utf8();
            len += bytes;
            if escape {
                escape = false;
                out.push(match c {
                    '"' => '"',
                    '\\' => '\\',
                    'n' => '\n',
                    't' => '\t',
                    o => return Err(LexError::InvalidEscape {
                        code: o,
                        span: Span::new(&self.source, self.index + len - bytes, bytes),
                    }),
                });
            } else {
                match c {
                    '\\' => escape = true,
                    '"' => return Ok((Token::String(out), len)),
                    c => out.push(c),
                }
            }
        }

        Err(LexError::UnterminatedString { span: Span::point(&self.source, self.index + len) })
    }

    fn number(&self, first: char, remaining: &mut impl Iterator<Item = char>) -> (Token, usize) {
        let mut len = self.take_while(remaining, |_| (), |c| c.is_ascii_digit()).1;

        // `.` starts a fractional part only when not immediately followed by
        // another `.` (which is the range operator).
        let dot_at = self.index + 1 + len;
        let has_fraction = self.source.contents[dot_at..].starts_with('.')
            && !self.source.contents[dot_at..].starts_with("..");

        if has_fraction {
            len += 1; // the dot itself
            let mut rest = self.source.contents[self.index + 1 + len..].chars();
            len += self.take_while(&mut rest, |_| (), |c| c.is_ascii_digit()).1;
        }

        let _ = first;
        let text = self.grab_from_index(1 + len);
        let value = f64::from_str(text).unwrap_or(f64::NAN);
        (Token::Number(value), 1 + len)
    }

    fn next_token(&mut self) -> Result<Spanned<Token>, LexError> {
        let mut remaining = self.remaining();
        let c = remaining.next().unwrap();
        let start = self.index;

        let (token, len) = match c {
            '\n' => (Token::Newline, 1),

            '"' => self.string()?,

            c if c.is_ascii_digit() => self.number(c, &mut remaining),

            c if c.is_alphabetic() || c == '_' => {
                self.take_while(
                    &mut once(c).chain(remaining),
                    |s| {
                        if KEYWORDS.contains(&s) {
                            match s {
                                "true" => Token::Boolean(true),
                                "false" => Token::Boolean(false),
                                "null" => Token::Null,
                                _ => Token::Keyword(s.to_string()),
                            }
                        } else {
                            Token::Identifier(s.to_string())
                        }
                    },
                    |n| n.is_alphanumeric() || n == '_',
                )
            },

            _ => {
                if let Some(op) = MULTI_CHAR_OPERATORS.iter().find(|op| self.grab_rest().starts_with(*op)) {
                    (Token::Operator(op.to_string()), op.len())
                } else if SINGLE_CHAR_OPERATORS.contains(c) {
                    (Token::Operator(c.to_string()), c.len_utf8())
                } else if "(){}[],:.;".contains(c) {
                    (Token::Punctuation(c.to_string()), c.len_utf8())
                } else {
                    return Err(LexError::InvalidCharacter { ch: c, span: Span::point(&self.source, start) });
                }
            },
        };

        self.index += len;
        Ok(Spanned::new(token, Span::new(&self.source, start, len)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        Lexer::lex(Source::source(src)).unwrap().into_iter().map(|t| t.item).collect()
    }

    #[test]
    fn simple_arithmetic() {
        assert_eq!(
            kinds("a + b"),
            vec![
                Token::Identifier("a".into()),
                Token::Operator("+".into()),
                Token::Identifier("b".into()),
                Token::Eof,
            ],
        );
    }

    #[test]
    fn range_vs_decimal() {
        assert_eq!(
            kinds("1..4"),
            vec![Token::Number(1.0), Token::Operator("..".into()), Token::Number(4.0), Token::Eof],
        );
        assert_eq!(kinds("1.5"), vec![Token::Number(1.5), Token::Eof]);
    }

    #[test]
    fn indentation_round_trip() {
        let src = "a: 1\n  b: 2\nc: 3\n";
        let toks = kinds(src);
        assert!(toks.contains(&Token::Indent));
        assert!(toks.contains(&Token::Dedent));
    }

    #[test]
    fn inconsistent_indentation_errors() {
        let src = "a: 1\n  b: 2\n c: 3\n";
        assert!(Lexer::lex(Source::source(src)).is_err());
    }

    #[test]
    fn string_escapes() {
        assert_eq!(kinds("\"hi\\n\""), vec![Token::String("hi\n".into()), Token::Eof]);
    }

    #[test]
    fn keywords_and_booleans() {
        assert_eq!(
            kinds("var true false null"),
            vec![
                Token::Keyword("var".into()),
                Token::Boolean(true),
                Token::Boolean(false),
                Token::Null,
                Token::Eof,
            ],
        );
    }
}

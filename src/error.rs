use thiserror::Error;

use crate::span::Span;

#[derive(Debug, Error)]
pub enum LexError {
    #[error("Error: unrecognized character `{ch}` (Line {}, Column {})", .span.line_col().0, .span.line_col().1)]
    InvalidCharacter { ch: char, span: Span },
    #[error("Error: unknown escape code `\\{code}` (Line {}, Column {})", .span.line_col().0, .span.line_col().1)]
    InvalidEscape { code: char, span: Span },
    #[error("Error: unterminated string literal (Line {}, Column {})", .span.line_col().0, .span.line_col().1)]
    UnterminatedString { span: Span },
    #[error("Error: indentation width {width} does not match any enclosing block (Line {}, Column {})", .span.line_col().0, .span.line_col().1)]
    InconsistentIndentation { width: usize, span: Span },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Error: expected {expected}, found {found} (Line {}, Column {})", .span.line_col().0, .span.line_col().1)]
    UnexpectedToken { found: String, expected: String, span: Span },
    #[error("Error: missing terminator for {what} (Line {}, Column {})", .span.line_col().0, .span.line_col().1)]
    MissingTerminator { what: String, span: Span },
    #[error("Error: malformed {what} (Line {}, Column {})", .span.line_col().0, .span.line_col().1)]
    MalformedConstruct { what: String, span: Span },
    #[error("Error: unexpected end of source (Line {}, Column {})", .span.line_col().0, .span.line_col().1)]
    UnexpectedEof { span: Span },
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Error: undefined function `{name}` (Line {}, Column {})", .span.line_col().0, .span.line_col().1)]
    UndefinedFunction { name: String, span: Span },
    #[error("Error: cannot assign to immutable variable `{name}` (Line {}, Column {})", .span.line_col().0, .span.line_col().1)]
    ImmutableAssignment { name: String, span: Span },
    #[error("Error: `{name}` is already declared in this scope (Line {}, Column {})", .span.line_col().0, .span.line_col().1)]
    Redeclaration { name: String, span: Span },
    #[error("Error: could not import module `{path}` (Line {}, Column {})", .span.line_col().0, .span.line_col().1)]
    ImportFailed { path: String, span: Span },
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Error: type mismatch in `{op}`: {detail}")]
    TypeMismatch { op: String, detail: String },
    #[error("Error: index {index} out of bounds (length {len})")]
    IndexOutOfBounds { index: i64, len: usize },
    #[error("Error: division by zero in `{op}`")]
    DivisionByZero { op: String },
    #[error("Error: unknown opcode 0x{byte:02X} at ip {ip}")]
    UnknownOpcode { byte: u8, ip: usize },
    #[error("Error: jump target {target} is outside chunk of length {len}")]
    JumpOutOfRange { target: i64, len: usize },
    #[error("Error: stack underflow in `{op}`")]
    StackUnderflow { op: String },
    #[error("Error: stack overflow")]
    StackOverflow,
    #[error("Error: {detail} is not callable")]
    NonCallableTarget { detail: String },
    #[error("Error: could not open file `{path}`")]
    FileNotFound { path: String },
    #[error("Error: module `{name}` is not installed")]
    ModuleNotInstalled { name: String },
}

/// The crate's top-level error type; `compile`/`run`/`exec` all return
/// `Result<_, EmberError>` so a single format serves every diagnostic.
#[derive(Debug, Error)]
pub enum EmberError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("Error: {0}")]
    Io(String),
}

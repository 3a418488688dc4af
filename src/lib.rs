//! # EmberScript
//! This crate contains the core of EmberScript: the lexer, parser, AST,
//! symbol table, compiler, bytecode chunk, stack VM, and tree-walking
//! interpreter.
//!
//! ## Embedding EmberScript in Rust
//! Add this crate to your `Cargo.toml`, then:
//! ```no_run
//! # use emberscript::Source;
//! let source = Source::source("print(1 + 2)");
//! emberscript::run(source, &mut std::io::stdout()).unwrap();
//! ```
//!
//! ## Overview of the pipeline
//! Source code is represented as a [`Source`], a string of text with an
//! associated path used for error reporting. Regions of source are marked
//! with [`Span`]s, carrying a reference to the originating `Source` so they
//! can render themselves for diagnostics without the caller threading the
//! source text around separately.
//!
//! The first phase is lexing: `Lexer::lex` turns a `Source` into a flat
//! stream of `Spanned<Token>`s, handling EmberScript's indentation-
//! significant layout (`INDENT`/`DEDENT`) alongside braced blocks.
//!
//! The next phase is parsing: `Parser::parse` turns the token stream into a
//! `Vec<Spanned<Ast>>`, a tagged-variant syntax tree. From here, EmberScript
//! offers two independent execution paths producing identical observable
//! behavior:
//!
//! - **Bytecode**: `compiler::compile` lowers the AST into a `BytecodeChunk`
//!   (a flat instruction stream, a constant pool, and a `FunctionTable`),
//!   which `vm::run` executes on a stack-based virtual machine. A compiled
//!   chunk can be persisted with [`write_chunk`]/[`read_chunk`].
//! - **Tree-walking**: `interpreter::exec` evaluates the AST directly
//!   against a chain of `Environment` scopes, with no separate compile step.
//!
//! Both paths can fail at any stage; every fallible boundary returns a
//! variant of [`EmberError`], EmberScript's single top-level error type.

pub mod ast;
pub mod bytecode;
pub mod builtins;
pub mod compiler;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod opcode;
pub mod parser;
pub mod serialize;
pub mod source;
pub mod span;
pub mod symbol;
pub mod token;
pub mod value;
pub mod vm;

use std::io::Write;
use std::rc::Rc;

pub use bytecode::BytecodeChunk;
pub use error::EmberError;
pub use source::Source;
pub use span::Spanned;
pub use value::RuntimeValue;

/// Lexes, parses, and compiles a [`Source`] into a [`BytecodeChunk`],
/// without executing it.
pub fn compile(source: Rc<Source>) -> Result<BytecodeChunk, EmberError> {
    let tokens = lexer::Lexer::lex(source)?;
    let ast = parser::Parser::parse(tokens)?;
    Ok(compiler::compile(&ast)?)
}

/// Lexes, parses, compiles, and runs a [`Source`] on the bytecode VM,
/// writing any `print(...)` output to `out`.
pub fn run(source: Rc<Source>, out: &mut dyn Write) -> Result<(), EmberError> {
    let chunk = compile(source)?;
    Ok(vm::run(chunk, out)?)
}

/// Lexes, parses, and evaluates a [`Source`] with the tree-walking
/// interpreter, writing any `print(...)` output to `out`.
pub fn exec(source: Rc<Source>, out: &mut dyn Write) -> Result<(), EmberError> {
    let tokens = lexer::Lexer::lex(source)?;
    let ast = parser::Parser::parse(tokens)?;
    interpreter::exec(&ast, out)
}

/// Serializes an already-compiled chunk per `spec.md` §4.7.
pub fn write_chunk(chunk: &BytecodeChunk, out: &mut dyn Write) -> Result<(), EmberError> {
    serialize::write_chunk(chunk, out)
}

/// Deserializes a chunk previously written by [`write_chunk`].
pub fn read_chunk(input: &mut dyn std::io::Read) -> Result<BytecodeChunk, EmberError> {
    serialize::read_chunk(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_and_exec_agree_on_stdout() {
        let src = "var a: 2\nvar b: 3\nprint(a + b)\n";
        let mut bytecode_out = Vec::new();
        run(Source::source(src), &mut bytecode_out).unwrap();

        let mut tree_out = Vec::new();
        exec(Source::source(src), &mut tree_out).unwrap();

        assert_eq!(bytecode_out, tree_out);
        assert_eq!(String::from_utf8(bytecode_out).unwrap(), "5\n");
    }

    #[test]
    fn chunk_round_trips_through_serialization() {
        let chunk = compile(Source::source("print(40 + 2)\n")).unwrap();
        let mut buf = Vec::new();
        write_chunk(&chunk, &mut buf).unwrap();
        let restored = read_chunk(&mut buf.as_slice()).unwrap();

        let mut out = Vec::new();
        vm::run(restored, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "42\n");
    }
}

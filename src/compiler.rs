use std::path::Path;
use std::rc::Rc;

use crate::ast::{Ast, BinaryOp, Literal, UnaryOp};
use crate::bytecode::{BytecodeChunk, FunctionInfo};
use crate::error::CompileError;
use crate::opcode::Opcode;
use crate::source::Source;
use crate::span::{Span, Spanned};
use crate::symbol::SymbolTable;
use crate::value::{Function, RuntimeValue, UserFunction};

/// Single-pass AST-to-bytecode lowering. Grounded on the teacher's
/// `Compiler{locals, depth, chunk}` (`compiler/gen.rs`): a `walk`-style
/// dispatch plus a constant/symbol deduplication habit, adapted from
/// passerine's closure-capturing scopes to EmberScript's flat global +
/// per-function-window model (`SPEC_FULL.md` §4).
pub struct Compiler {
    chunk: BytecodeChunk,
    symbols: SymbolTable,
    temp_counter: usize,
}

pub fn compile(program: &[Spanned<Ast>]) -> Result<BytecodeChunk, CompileError> {
    let mut compiler = Compiler { chunk: BytecodeChunk::new(), symbols: SymbolTable::new(), temp_counter: 0 };
    compiler.compile_program(program)?;
    compiler.chunk.emit_op(Opcode::Eof);
    Ok(compiler.chunk)
}

impl Compiler {
    fn fresh_temp(&mut self) -> String {
        self.temp_counter += 1;
        format!("__iter_tmp_{}", self.temp_counter)
    }

    fn compile_program(&mut self, stmts: &[Spanned<Ast>]) -> Result<(), CompileError> {
        for stmt in stmts {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    /// Compiles a function body with the mandated last-statement-as-value
    /// treatment (`spec.md` §4.4 / §9 — fixes the reference's if/else
    /// return defect).
    fn compile_function_body(&mut self, stmts: &[Spanned<Ast>]) -> Result<(), CompileError> {
        if stmts.is_empty() {
            self.chunk.emit_constant(RuntimeValue::Null);
            return Ok(());
        }

        for stmt in &stmts[..stmts.len() - 1] {
            self.compile_statement(stmt)?;
        }
        self.compile_as_value(&stmts[stmts.len() - 1])
    }

    fn compile_as_value(&mut self, stmt: &Spanned<Ast>) -> Result<(), CompileError> {
        match &stmt.item {
            Ast::If { condition, then_branch, else_branch } => {
                self.compile_expr(condition)?;
                let else_jump = self.chunk.emit_jump(Opcode::JumpIfFalse);
                self.compile_branch_as_value(then_branch)?;
                let end_jump = self.chunk.emit_jump(Opcode::Jump);
                self.chunk.patch_jump(else_jump);
                match else_branch {
                    Some(branch) => self.compile_branch_as_value(branch)?,
                    None => self.chunk.emit_constant(RuntimeValue::Null),
                }
                self.chunk.patch_jump(end_jump);
                Ok(())
            }
            Ast::VarDecl { .. } | Ast::While { .. } | Ast::For { .. }
            | Ast::FunctionDef { .. } | Ast::Import { .. } | Ast::Print(_)
            | Ast::NakedIterator { .. } => {
                self.compile_statement(stmt)?;
                self.chunk.emit_constant(RuntimeValue::Null);
                Ok(())
            }
            _ => self.compile_expr(stmt),
        }
    }

    fn compile_branch_as_value(&mut self, branch: &Spanned<Ast>) -> Result<(), CompileError> {
        match &branch.item {
            Ast::Block(stmts) => self.compile_function_body(stmts),
            _ => self.compile_as_value(branch),
        }
    }

    fn compile_statement(&mut self, stmt: &Spanned<Ast>) -> Result<(), CompileError> {
        match &stmt.item {
            Ast::VarDecl { name, mutable, init } => {
                match init {
                    Some(expr) => self.compile_expr(expr)?,
                    None => self.chunk.emit_constant(RuntimeValue::Null),
                }
                // `var` bindings may be reassigned; `let`/`const` bindings
                // may not, though `let`'s contents may still mutate via
                // property assignment (spec.md §9).
                let is_mutable = matches!(mutable, crate::ast::Mutability::Mutable);
                let index = self.symbols.declare(name, is_mutable, &stmt.span)?;
                self.chunk.emit_op(Opcode::StoreVar);
                self.chunk.emit_u16(index);
                Ok(())
            }
            Ast::While { condition, body } => {
                let loop_start = self.chunk.code.len();
                self.compile_expr(condition)?;
                let end_jump = self.chunk.emit_jump(Opcode::JumpIfFalse);
                self.compile_body_block(body)?;
                self.chunk.emit_loop(loop_start);
                self.chunk.patch_jump(end_jump);
                Ok(())
            }
            Ast::For { init, condition, increment, body } => {
                if let Some(init) = init { self.compile_statement(init)?; }
                let loop_start = self.chunk.code.len();
                match condition {
                    Some(cond) => self.compile_expr(cond)?,
                    None => self.chunk.emit_constant(RuntimeValue::Boolean(true)),
                }
                let end_jump = self.chunk.emit_jump(Opcode::JumpIfFalse);
                self.compile_body_block(body)?;
                if let Some(incr) = increment { self.compile_statement(incr)?; }
                self.chunk.emit_loop(loop_start);
                self.chunk.patch_jump(end_jump);
                Ok(())
            }
            Ast::NakedIterator { var, iterable, body } => self.compile_naked_iterator(var, iterable, body),
            Ast::FunctionDef { name, params, body } => self.compile_function_def(name, params, body),
            Ast::Import { path } => self.compile_import(path, &stmt.span),
            Ast::Print(expr) => {
                self.compile_expr(expr)?;
                self.chunk.emit_op(Opcode::Print);
                Ok(())
            }
            Ast::Block(stmts) => self.compile_program(stmts),
            _ => {
                self.compile_expr(stmt)?;
                self.chunk.emit_op(Opcode::Pop);
                Ok(())
            }
        }
    }

    fn compile_body_block(&mut self, body: &Spanned<Ast>) -> Result<(), CompileError> {
        match &body.item {
            Ast::Block(stmts) => self.compile_program(stmts),
            _ => self.compile_statement(body),
        }
    }

    fn compile_expr(&mut self, expr: &Spanned<Ast>) -> Result<(), CompileError> {
        match &expr.item {
            Ast::Literal(lit) => {
                self.chunk.emit_constant(literal_to_value(lit));
                Ok(())
            }
            Ast::Variable(name) => {
                let index = self.symbols.get_or_add(name, false);
                self.chunk.emit_op(Opcode::LoadVar);
                self.chunk.emit_u16(index);
                Ok(())
            }
            Ast::Assignment { name, value } => {
                self.compile_expr(value)?;
                if !self.symbols.is_mutable(name) {
                    return Err(CompileError::ImmutableAssignment { name: name.clone(), span: expr.span.clone() });
                }
                let index = self.symbols.get_or_add(name, false);
                self.chunk.emit_op(Opcode::Dup);
                self.chunk.emit_op(Opcode::StoreVar);
                self.chunk.emit_u16(index);
                Ok(())
            }
            Ast::Binary { op, left, right } => {
                self.compile_expr(left)?;
                self.compile_expr(right)?;
                self.chunk.emit_op(binary_opcode(*op));
                Ok(())
            }
            Ast::Unary { op, operand } => {
                self.compile_expr(operand)?;
                self.chunk.emit_op(match op {
                    UnaryOp::Not => Opcode::Not,
                    UnaryOp::Neg => Opcode::Neg,
                });
                Ok(())
            }
            Ast::ArrayLiteral(elements) => {
                self.chunk.emit_op(Opcode::NewArray);
                for el in elements {
                    self.compile_expr(el)?;
                    self.chunk.emit_op(Opcode::ArrayPush);
                }
                Ok(())
            }
            Ast::IndexAccess { array, index } => {
                self.compile_expr(array)?;
                self.compile_expr(index)?;
                self.chunk.emit_op(Opcode::GetIndex);
                Ok(())
            }
            Ast::ObjectLiteral { mixins, properties } => self.compile_object_literal(mixins, properties),
            Ast::PropertyAccess { object, property } => {
                self.compile_expr(object)?;
                self.chunk.emit_constant(RuntimeValue::String(property.clone()));
                self.chunk.emit_op(Opcode::GetProperty);
                Ok(())
            }
            Ast::PropertyAssignment { object, property, value } => self.compile_property_assignment(object, property, value),
            Ast::MethodCall { object, method, args } => {
                self.compile_expr(object)?;
                self.chunk.emit_op(Opcode::Dup);
                self.chunk.emit_constant(RuntimeValue::String(method.clone()));
                self.chunk.emit_op(Opcode::GetProperty);
                for arg in args {
                    self.compile_expr(arg)?;
                }
                self.chunk.emit_op(Opcode::CallMethod);
                self.chunk.emit_byte(args.len() as u8);
                Ok(())
            }
            Ast::FunctionCall { name, args } => {
                if name == "print" {
                    // parser should route bare `print(...)` to Ast::Print, but
                    // tolerate it reaching here as a call target too
                    if let Some(first) = args.first() {
                        self.compile_expr(first)?;
                    } else {
                        self.chunk.emit_constant(RuntimeValue::Null);
                    }
                    self.chunk.emit_op(Opcode::Print);
                    self.chunk.emit_constant(RuntimeValue::Null);
                    return Ok(());
                }
                let func_idx = match self.chunk.find_function(name) {
                    Some((idx, _)) => idx,
                    None => return Err(CompileError::UndefinedFunction { name: name.clone(), span: expr.span.clone() }),
                };
                for arg in args.iter().rev() {
                    self.compile_expr(arg)?;
                }
                self.chunk.emit_op(Opcode::Call);
                self.chunk.emit_byte(func_idx);
                self.chunk.emit_byte(args.len() as u8);
                Ok(())
            }
            Ast::Lambda { params, body } => {
                self.temp_counter += 1;
                let name = format!("<lambda{}>", self.temp_counter);
                self.compile_lambda(&name, params, body)?;
                self.chunk.emit_constant(RuntimeValue::Function(Function::User(Rc::new(UserFunction {
                    name,
                    params: params.clone(),
                }))));
                Ok(())
            }
            Ast::Range { start, end } => {
                self.chunk.emit_op(Opcode::NewObject);
                self.chunk.emit_op(Opcode::Dup);
                self.chunk.emit_constant(RuntimeValue::String("start".into()));
                self.compile_expr(start)?;
                self.chunk.emit_op(Opcode::SetProperty);
                self.chunk.emit_op(Opcode::Swap);
                self.chunk.emit_op(Opcode::Pop);
                self.chunk.emit_op(Opcode::Dup);
                self.chunk.emit_constant(RuntimeValue::String("end".into()));
                self.compile_expr(end)?;
                self.chunk.emit_op(Opcode::SetProperty);
                self.chunk.emit_op(Opcode::Swap);
                self.chunk.emit_op(Opcode::Pop);
                Ok(())
            }
            // reached only via compile_as_value's fallthrough for
            // statement-shaped nodes nested in an expression position
            _ => {
                self.compile_statement(expr)?;
                self.chunk.emit_constant(RuntimeValue::Null);
                Ok(())
            }
        }
    }

    fn compile_object_literal(&mut self, mixins: &[String], properties: &[(String, Spanned<Ast>)]) -> Result<(), CompileError> {
        self.chunk.emit_op(Opcode::NewObject);
        for mixin in mixins {
            self.chunk.emit_op(Opcode::Dup);
            let index = self.symbols.get_or_add(mixin, false);
            self.chunk.emit_op(Opcode::LoadVar);
            self.chunk.emit_u16(index);
            self.chunk.emit_op(Opcode::CopyProperties);
            self.chunk.emit_op(Opcode::Swap);
            self.chunk.emit_op(Opcode::Pop);
        }
        for (key, value) in properties {
            self.chunk.emit_op(Opcode::Dup);
            self.chunk.emit_constant(RuntimeValue::String(key.clone()));
            self.compile_expr(value)?;
            self.chunk.emit_op(Opcode::SetProperty);
            self.chunk.emit_op(Opcode::Swap);
            self.chunk.emit_op(Opcode::Pop);
        }
        Ok(())
    }

    /// Walks a `PropertyAccess` chain down to its root, collecting the
    /// dotted path segments in source order.
    fn flatten_property_chain<'a>(&self, expr: &'a Spanned<Ast>) -> (&'a Spanned<Ast>, Vec<String>) {
        match &expr.item {
            Ast::PropertyAccess { object, property } => {
                let (root, mut parts) = self.flatten_property_chain(object);
                parts.push(property.clone());
                (root, parts)
            }
            _ => (expr, vec![]),
        }
    }

    fn compile_property_assignment(&mut self, object: &Spanned<Ast>, property: &str, value: &Spanned<Ast>) -> Result<(), CompileError> {
        let nested = matches!(object.item, Ast::PropertyAccess { .. });

        if nested {
            let (root, mut parts) = self.flatten_property_chain(object);
            parts.push(property.to_string());
            let root = root.clone();
            let path = parts.join(".");
            self.compile_expr(&root)?;
            self.chunk.emit_constant(RuntimeValue::String(path));
            self.compile_expr(value)?;
            self.chunk.emit_op(Opcode::SetNestedProperty);
            self.write_back_root(&root)
        } else {
            self.compile_expr(object)?;
            self.chunk.emit_constant(RuntimeValue::String(property.to_string()));
            self.compile_expr(value)?;
            self.chunk.emit_op(Opcode::SetProperty);
            self.write_back_root(object)
        }
    }

    /// After producing an updated object on the stack, writes it back to
    /// its originating variable (if the root was a plain variable) so the
    /// mutation is observable — required because values are deep-cloned
    /// rather than aliased (`spec.md` §5).
    fn write_back_root(&mut self, root: &Spanned<Ast>) -> Result<(), CompileError> {
        if let Ast::Variable(name) = &root.item {
            let index = self.symbols.get_or_add(name, false);
            self.chunk.emit_op(Opcode::Dup);
            self.chunk.emit_op(Opcode::StoreVar);
            self.chunk.emit_u16(index);
        }
        Ok(())
    }

    fn compile_function_def(&mut self, name: &str, params: &[String], body: &Spanned<Ast>) -> Result<(), CompileError> {
        let skip = self.chunk.emit_jump(Opcode::Jump);
        let start_ip = self.chunk.code.len();

        self.symbols.begin_function_scope();
        for param in params {
            self.symbols.declare_param(param);
        }

        // Registered before the body compiles so a self-recursive call
        // inside the body can already resolve this function by name.
        self.chunk.register_function(FunctionInfo {
            name: name.to_string(),
            start_ip,
            arity: params.len(),
            param_names: params.to_vec(),
        });

        let stmts = match &body.item {
            Ast::Block(stmts) => stmts.clone(),
            _ => vec![body.as_ref().clone()],
        };
        self.compile_function_body(&stmts)?;
        self.chunk.emit_op(Opcode::Return);
        self.symbols.end_function_scope();
        self.chunk.patch_jump(skip);
        Ok(())
    }

    /// Compiles an anonymous method-shaped function. Declares an implicit
    /// leading `this` parameter so the body can read it, matching the
    /// locals layout `CALL_METHOD` builds at runtime (receiver in slot 0,
    /// explicit arguments after it).
    fn compile_lambda(&mut self, name: &str, params: &[String], body: &Spanned<Ast>) -> Result<(), CompileError> {
        let skip = self.chunk.emit_jump(Opcode::Jump);
        let start_ip = self.chunk.code.len();

        self.symbols.begin_function_scope();
        self.symbols.declare_param("this");
        for param in params {
            self.symbols.declare_param(param);
        }

        let mut param_names = vec!["this".to_string()];
        param_names.extend(params.iter().cloned());
        self.chunk.register_function(FunctionInfo {
            name: name.to_string(),
            start_ip,
            arity: params.len() + 1,
            param_names,
        });

        let stmts = match &body.item {
            Ast::Block(stmts) => stmts.clone(),
            _ => vec![body.as_ref().clone()],
        };
        self.compile_function_body(&stmts)?;
        self.chunk.emit_op(Opcode::Return);
        self.symbols.end_function_scope();
        self.chunk.patch_jump(skip);
        Ok(())
    }

    fn compile_naked_iterator(&mut self, var: &str, iterable: &Spanned<Ast>, body: &Spanned<Ast>) -> Result<(), CompileError> {
        match &iterable.item {
            Ast::Range { start, end } => {
                self.compile_expr(start)?;
                let var_idx = self.symbols.get_or_add(var, false);
                self.chunk.emit_op(Opcode::StoreVar);
                self.chunk.emit_u16(var_idx);

                let loop_start = self.chunk.code.len();
                self.chunk.emit_op(Opcode::LoadVar);
                self.chunk.emit_u16(var_idx);
                self.compile_expr(end)?;
                self.chunk.emit_op(Opcode::Lte);
                let end_jump = self.chunk.emit_jump(Opcode::JumpIfFalse);

                self.compile_body_block(body)?;

                self.chunk.emit_op(Opcode::LoadVar);
                self.chunk.emit_u16(var_idx);
                self.chunk.emit_constant(RuntimeValue::Number(1.0));
                self.chunk.emit_op(Opcode::Add);
                self.chunk.emit_op(Opcode::StoreVar);
                self.chunk.emit_u16(var_idx);
                self.chunk.emit_loop(loop_start);
                self.chunk.patch_jump(end_jump);
                Ok(())
            }
            // AST shape is the compile-time disambiguator: an array
            // literal/variable yields values; anything else (object
            // literal/variable) yields keys.
            _ => {
                let yields_values = matches!(iterable.item, Ast::ArrayLiteral(_)) || self.is_known_array(iterable);

                self.compile_expr(iterable)?;
                let coll_name = self.fresh_temp();
                let coll_idx = self.symbols.get_or_add(&coll_name, false);
                self.chunk.emit_op(Opcode::StoreVar);
                self.chunk.emit_u16(coll_idx);

                self.chunk.emit_op(Opcode::LoadVar);
                self.chunk.emit_u16(coll_idx);
                self.chunk.emit_op(Opcode::GetKeys);
                let keys_name = self.fresh_temp();
                let keys_idx = self.symbols.get_or_add(&keys_name, false);
                self.chunk.emit_op(Opcode::StoreVar);
                self.chunk.emit_u16(keys_idx);

                let i_name = self.fresh_temp();
                let i_idx = self.symbols.get_or_add(&i_name, false);
                self.chunk.emit_constant(RuntimeValue::Number(0.0));
                self.chunk.emit_op(Opcode::StoreVar);
                self.chunk.emit_u16(i_idx);

                let loop_start = self.chunk.code.len();
                self.chunk.emit_op(Opcode::LoadVar);
                self.chunk.emit_u16(i_idx);
                self.chunk.emit_op(Opcode::LoadVar);
                self.chunk.emit_u16(keys_idx);
                self.chunk.emit_op(Opcode::GetLength);
                self.chunk.emit_op(Opcode::Lt);
                let end_jump = self.chunk.emit_jump(Opcode::JumpIfFalse);

                self.chunk.emit_op(Opcode::LoadVar);
                self.chunk.emit_u16(keys_idx);
                self.chunk.emit_op(Opcode::LoadVar);
                self.chunk.emit_u16(i_idx);
                self.chunk.emit_op(Opcode::GetIndex);

                let var_idx = self.symbols.get_or_add(var, false);
                if yields_values {
                    let key_name = self.fresh_temp();
                    let key_idx = self.symbols.get_or_add(&key_name, false);
                    self.chunk.emit_op(Opcode::StoreVar);
                    self.chunk.emit_u16(key_idx);
                    self.chunk.emit_op(Opcode::LoadVar);
                    self.chunk.emit_u16(coll_idx);
                    self.chunk.emit_op(Opcode::LoadVar);
                    self.chunk.emit_u16(key_idx);
                    self.chunk.emit_op(Opcode::GetIndex);
                    self.chunk.emit_op(Opcode::StoreVar);
                    self.chunk.emit_u16(var_idx);
                } else {
                    self.chunk.emit_op(Opcode::StoreVar);
                    self.chunk.emit_u16(var_idx);
                }

                self.compile_body_block(body)?;

                self.chunk.emit_op(Opcode::LoadVar);
                self.chunk.emit_u16(i_idx);
                self.chunk.emit_constant(RuntimeValue::Number(1.0));
                self.chunk.emit_op(Opcode::Add);
                self.chunk.emit_op(Opcode::StoreVar);
                self.chunk.emit_u16(i_idx);
                self.chunk.emit_loop(loop_start);
                self.chunk.patch_jump(end_jump);
                Ok(())
            }
        }
    }

    /// Best-effort refinement of the AST-shape disambiguation: a bare
    /// variable that was most recently bound from an `ArrayLiteral` is
    /// still treated as array-shaped. We don't track this (single-pass,
    /// no type inference), so only the literal-shape case is recognized;
    /// anything else defaults to key iteration, matching `spec.md`'s
    /// documented asymmetry.
    fn is_known_array(&self, _iterable: &Spanned<Ast>) -> bool {
        false
    }

    fn compile_import(&mut self, path: &str, span: &Span) -> Result<(), CompileError> {
        if path.ends_with(".ember") {
            let source = Source::path(Path::new(path))
                .map_err(|_| CompileError::ImportFailed { path: path.to_string(), span: span.clone() })?;
            let tokens = crate::lexer::Lexer::lex(source).map_err(|_| CompileError::ImportFailed { path: path.to_string(), span: span.clone() })?;
            let ast = crate::parser::Parser::parse(tokens)?;
            self.compile_program(&ast)
        } else {
            log::warn!("module `{}` is not registered in the package index; skipping", path);
            Ok(())
        }
    }
}

fn binary_opcode(op: BinaryOp) -> Opcode {
    match op {
        BinaryOp::Add => Opcode::Add,
        BinaryOp::Sub => Opcode::Sub,
        BinaryOp::Mul => Opcode::Mul,
        BinaryOp::Div => Opcode::Div,
        BinaryOp::Mod => Opcode::Mod,
        BinaryOp::Eq => Opcode::Eq,
        BinaryOp::Neq => Opcode::Neq,
        BinaryOp::Lt => Opcode::Lt,
        BinaryOp::Gt => Opcode::Gt,
        BinaryOp::Lte => Opcode::Lte,
        BinaryOp::Gte => Opcode::Gte,
        BinaryOp::And => Opcode::And,
        BinaryOp::Or => Opcode::Or,
    }
}

fn literal_to_value(lit: &Literal) -> RuntimeValue {
    match lit {
        Literal::Number(n) => RuntimeValue::Number(*n),
        Literal::String(s) => RuntimeValue::String(s.clone()),
        Literal::Boolean(b) => RuntimeValue::Boolean(*b),
        Literal::Null => RuntimeValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn compile_src(src: &str) -> BytecodeChunk {
        let tokens = Lexer::lex(Source::source(src)).unwrap();
        let ast = Parser::parse(tokens).unwrap();
        compile(&ast).unwrap()
    }

    #[test]
    fn arithmetic_emits_add() {
        let chunk = compile_src("var a: 2\nvar b: 3\nprint(a + b)\n");
        assert!(chunk.code.contains(&Opcode::Add.to_byte()));
        assert!(chunk.code.contains(&Opcode::Print.to_byte()));
    }

    #[test]
    fn function_def_registers_in_function_table() {
        let chunk = compile_src("add: fn(a, b) { a + b }\nprint(add(10, 32))\n");
        assert_eq!(chunk.functions.len(), 1);
        assert_eq!(chunk.functions[0].name, "add");
        assert_eq!(chunk.functions[0].arity, 2);
    }

    #[test]
    fn undefined_function_call_is_a_compile_error() {
        let tokens = Lexer::lex(Source::source("print(missing(1))\n")).unwrap();
        let ast = Parser::parse(tokens).unwrap();
        assert!(compile(&ast).is_err());
    }
}

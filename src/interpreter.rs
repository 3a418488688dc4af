use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use crate::ast::{Ast, BinaryOp, Literal, Mutability, UnaryOp};
use crate::environment::Environment;
use crate::error::{EmberError, RuntimeError};
use crate::source::Source;
use crate::span::Spanned;
use crate::value::{Function, RuntimeValue, UserFunction};

struct FunctionEntry {
    params: Vec<String>,
    body: Spanned<Ast>,
}

/// Tree-walking evaluator over the `Ast`, the second of EmberScript's two
/// execution paths (`spec.md` §2). Observable behavior mirrors
/// `compiler.rs`/`vm.rs` exactly — same if/else-as-expression function
/// return, same flat function-name resolution, same naked-iterator
/// array/object asymmetry — it is simply unstaged: no bytecode, no separate
/// compile step.
pub struct Interpreter<'w> {
    functions: HashMap<String, FunctionEntry>,
    temp_counter: usize,
    out: &'w mut dyn Write,
}

pub fn exec(program: &[Spanned<Ast>], out: &mut dyn Write) -> Result<(), EmberError> {
    let mut interp = Interpreter { functions: HashMap::new(), temp_counter: 0, out };
    let global = Environment::new();
    interp.eval_program(program, &global)?;
    Ok(())
}

impl<'w> Interpreter<'w> {
    fn fresh_temp(&mut self) -> String {
        self.temp_counter += 1;
        format!("<lambda{}>", self.temp_counter)
    }

    fn eval_program(&mut self, stmts: &[Spanned<Ast>], env: &Rc<Environment>) -> Result<(), EmberError> {
        for stmt in stmts {
            self.eval_statement(stmt, env)?;
        }
        Ok(())
    }

    /// Evaluates a function body with the mandated last-statement-as-value
    /// treatment (`spec.md` §4.4/§9).
    fn eval_function_body(&mut self, stmts: &[Spanned<Ast>], env: &Rc<Environment>) -> Result<RuntimeValue, EmberError> {
        if stmts.is_empty() {
            return Ok(RuntimeValue::Null);
        }
        for stmt in &stmts[..stmts.len() - 1] {
            self.eval_statement(stmt, env)?;
        }
        self.eval_as_value(&stmts[stmts.len() - 1], env)
    }

    fn eval_as_value(&mut self, stmt: &Spanned<Ast>, env: &Rc<Environment>) -> Result<RuntimeValue, EmberError> {
        match &stmt.item {
            Ast::If { condition, then_branch, else_branch } => {
                let cond = self.eval_expr(condition, env)?;
                if cond.truthy() {
                    self.eval_branch_as_value(then_branch, env)
                } else {
                    match else_branch {
                        Some(branch) => self.eval_branch_as_value(branch, env),
                        None => Ok(RuntimeValue::Null),
                    }
                }
            }
            Ast::VarDecl { .. } | Ast::While { .. } | Ast::For { .. }
            | Ast::FunctionDef { .. } | Ast::Import { .. } | Ast::Print(_)
            | Ast::NakedIterator { .. } => {
                self.eval_statement(stmt, env)?;
                Ok(RuntimeValue::Null)
            }
            _ => self.eval_expr(stmt, env),
        }
    }

    fn eval_branch_as_value(&mut self, branch: &Spanned<Ast>, env: &Rc<Environment>) -> Result<RuntimeValue, EmberError> {
        match &branch.item {
            Ast::Block(stmts) => {
                let child = Environment::child(env);
                self.eval_function_body(stmts, &child)
            }
            _ => self.eval_as_value(branch, env),
        }
    }

    fn eval_statement(&mut self, stmt: &Spanned<Ast>, env: &Rc<Environment>) -> Result<(), EmberError> {
        match &stmt.item {
            Ast::VarDecl { name, mutable, init } => {
                let value = match init {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => RuntimeValue::Null,
                };
                env.declare(name, value, *mutable);
                Ok(())
            }
            Ast::While { condition, body } => {
                while self.eval_expr(condition, env)?.truthy() {
                    self.eval_body_block(body, env)?;
                }
                Ok(())
            }
            Ast::For { init, condition, increment, body } => {
                let loop_env = Environment::child(env);
                if let Some(init) = init { self.eval_statement(init, &loop_env)?; }
                loop {
                    let cont = match condition {
                        Some(cond) => self.eval_expr(cond, &loop_env)?.truthy(),
                        None => true,
                    };
                    if !cont { break; }
                    self.eval_body_block(body, &loop_env)?;
                    if let Some(incr) = increment { self.eval_statement(incr, &loop_env)?; }
                }
                Ok(())
            }
            Ast::NakedIterator { var, iterable, body } => self.eval_naked_iterator(var, iterable, body, env),
            Ast::FunctionDef { name, params, body } => {
                self.functions.insert(name.clone(), FunctionEntry { params: params.clone(), body: body.as_ref().clone() });
                Ok(())
            }
            Ast::Import { path } => self.eval_import(path, env),
            Ast::Print(expr) => {
                let value = self.eval_expr(expr, env)?;
                crate::builtins::print(&value, self.out).map_err(|e| EmberError::Io(e.to_string()))?;
                Ok(())
            }
            Ast::Block(stmts) => {
                let child = Environment::child(env);
                self.eval_program(stmts, &child)
            }
            _ => {
                self.eval_expr(stmt, env)?;
                Ok(())
            }
        }
    }

    fn eval_body_block(&mut self, body: &Spanned<Ast>, env: &Rc<Environment>) -> Result<(), EmberError> {
        match &body.item {
            Ast::Block(stmts) => {
                let child = Environment::child(env);
                self.eval_program(stmts, &child)
            }
            _ => self.eval_statement(body, env),
        }
    }

    fn eval_expr(&mut self, expr: &Spanned<Ast>, env: &Rc<Environment>) -> Result<RuntimeValue, EmberError> {
        match &expr.item {
            Ast::Literal(lit) => Ok(literal_to_value(lit)),
            Ast::Variable(name) => Ok(env.get(name).unwrap_or(RuntimeValue::Null)),
            Ast::Assignment { name, value } => {
                let v = self.eval_expr(value, env)?;
                env.assign(name, v.clone())?;
                Ok(v)
            }
            Ast::Binary { op, left, right } => {
                let l = self.eval_expr(left, env)?;
                let r = self.eval_expr(right, env)?;
                eval_binary(*op, l, r)
            }
            Ast::Unary { op, operand } => {
                let v = self.eval_expr(operand, env)?;
                match op {
                    UnaryOp::Not => Ok(RuntimeValue::Boolean(!v.truthy())),
                    UnaryOp::Neg => match v {
                        RuntimeValue::Number(n) => Ok(RuntimeValue::Number(-n)),
                        other => Err(RuntimeError::TypeMismatch { op: "NEG".into(), detail: format!("expected number, got {}", other.type_name()) }.into()),
                    },
                }
            }
            Ast::ArrayLiteral(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for el in elements { items.push(self.eval_expr(el, env)?); }
                Ok(RuntimeValue::Array(items))
            }
            Ast::IndexAccess { array, index } => {
                let target = self.eval_expr(array, env)?;
                let idx = self.eval_expr(index, env)?;
                eval_index(target, idx)
            }
            Ast::ObjectLiteral { mixins, properties } => self.eval_object_literal(mixins, properties, env),
            Ast::PropertyAccess { object, property } => {
                let target = self.eval_expr(object, env)?;
                Ok(target.object_get(property).cloned().unwrap_or_else(|| {
                    log::warn!("missing property `{}` on object; yielding null", property);
                    RuntimeValue::Null
                }))
            }
            Ast::PropertyAssignment { object, property, value } => self.eval_property_assignment(object, property, value, env),
            Ast::MethodCall { object, method, args } => self.eval_method_call(object, method, args, env),
            Ast::FunctionCall { name, args } => self.eval_function_call(name, args, env, &expr.span),
            Ast::Lambda { params, body } => {
                let name = self.fresh_temp();
                self.functions.insert(name.clone(), FunctionEntry { params: params.clone(), body: body.as_ref().clone() });
                Ok(RuntimeValue::Function(Function::User(Rc::new(UserFunction { name, params: params.clone() }))))
            }
            Ast::Range { start, end } => {
                let s = self.eval_expr(start, env)?;
                let e = self.eval_expr(end, env)?;
                Ok(RuntimeValue::Object(vec![("start".to_string(), s), ("end".to_string(), e)]))
            }
            // reached only via eval_as_value's fallthrough for
            // statement-shaped nodes nested in an expression position
            _ => {
                self.eval_statement(expr, env)?;
                Ok(RuntimeValue::Null)
            }
        }
    }

    fn eval_object_literal(&mut self, mixins: &[String], properties: &[(String, Spanned<Ast>)], env: &Rc<Environment>) -> Result<RuntimeValue, EmberError> {
        let mut object = RuntimeValue::Object(vec![]);
        for mixin in mixins {
            let source = env.get(mixin).unwrap_or(RuntimeValue::Null);
            if let RuntimeValue::Object(props) = source {
                for (k, v) in props {
                    object.object_set(&k, v);
                }
            }
        }
        for (key, value) in properties {
            let v = self.eval_expr(value, env)?;
            object.object_set(key, v);
        }
        Ok(object)
    }

    fn eval_property_assignment(&mut self, object: &Spanned<Ast>, property: &str, value: &Spanned<Ast>, env: &Rc<Environment>) -> Result<RuntimeValue, EmberError> {
        let (root, mut parts) = flatten_property_chain(object);
        parts.push(property.to_string());
        let mut target = self.eval_expr(root, env)?;
        let v = self.eval_expr(value, env)?;
        set_nested(&mut target, &parts, v.clone())?;
        if let Ast::Variable(name) = &root.item {
            // bypasses the mutability check: `let`'s contents may still
            // mutate via property assignment (spec.md §9), only a full
            // rebinding via plain `Assignment` is checked.
            env.force_assign(name, target);
        }
        Ok(v)
    }

    fn eval_method_call(&mut self, object: &Spanned<Ast>, method: &str, args: &[Spanned<Ast>], env: &Rc<Environment>) -> Result<RuntimeValue, EmberError> {
        let receiver = self.eval_expr(object, env)?;
        let method_value = receiver.object_get(method).cloned();
        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args { arg_values.push(self.eval_expr(arg, env)?); }

        match method_value {
            Some(RuntimeValue::Function(Function::User(user))) => self.call_user_function(&user.name, Some(receiver), arg_values),
            Some(RuntimeValue::Function(Function::Builtin(name, builtin))) => {
                let mut call_args = vec![receiver];
                call_args.extend(arg_values);
                (*builtin)(&call_args).map_err(|detail| RuntimeError::TypeMismatch { op: name, detail }.into())
            }
            _ => Err(RuntimeError::NonCallableTarget { detail: format!("method `{}`", method) }.into()),
        }
    }

    fn eval_function_call(&mut self, name: &str, args: &[Spanned<Ast>], env: &Rc<Environment>, span: &crate::span::Span) -> Result<RuntimeValue, EmberError> {
        if name == "print" {
            let value = match args.first() {
                Some(first) => self.eval_expr(first, env)?,
                None => RuntimeValue::Null,
            };
            crate::builtins::print(&value, self.out).map_err(|e| EmberError::Io(e.to_string()))?;
            return Ok(RuntimeValue::Null);
        }

        if !self.functions.contains_key(name) {
            return Err(crate::error::CompileError::UndefinedFunction { name: name.to_string(), span: span.clone() }.into());
        }
        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args { arg_values.push(self.eval_expr(arg, env)?); }
        self.call_user_function(name, None, arg_values)
    }

    fn call_user_function(&mut self, name: &str, receiver: Option<RuntimeValue>, args: Vec<RuntimeValue>) -> Result<RuntimeValue, EmberError> {
        let entry_params = self.functions.get(name).map(|e| e.params.clone())
            .ok_or_else(|| RuntimeError::NonCallableTarget { detail: format!("function `{}`", name) })?;
        let body = self.functions.get(name).map(|e| e.body.clone()).unwrap();

        // Functions resolve by name through a flat global table rather than
        // capturing their defining scope (spec.md Non-goal c), so the call's
        // environment is always a fresh child of the global scope.
        let call_env = Environment::new();
        if let Some(receiver) = receiver {
            call_env.declare("this", receiver, Mutability::Mutable);
        }
        for (i, param) in entry_params.iter().enumerate() {
            call_env.declare(param, args.get(i).cloned().unwrap_or(RuntimeValue::Null), Mutability::Mutable);
        }

        let stmts = match &body.item {
            Ast::Block(stmts) => stmts.clone(),
            _ => vec![body.clone()],
        };
        self.eval_function_body(&stmts, &call_env)
    }

    fn eval_naked_iterator(&mut self, var: &str, iterable: &Spanned<Ast>, body: &Spanned<Ast>, env: &Rc<Environment>) -> Result<(), EmberError> {
        match &iterable.item {
            Ast::Range { start, end } => {
                let start_v = self.eval_expr(start, env)?;
                let end_v = self.eval_expr(end, env)?;
                let (mut i, end) = match (start_v, end_v) {
                    (RuntimeValue::Number(a), RuntimeValue::Number(b)) => (a, b),
                    _ => return Err(RuntimeError::TypeMismatch { op: "NAKED_ITERATOR".into(), detail: "range bounds must be numbers".into() }.into()),
                };
                while i <= end {
                    let iter_env = Environment::child(env);
                    iter_env.declare(var, RuntimeValue::Number(i), Mutability::Mutable);
                    self.eval_body_block(body, &iter_env)?;
                    i += 1.0;
                }
                Ok(())
            }
            // AST shape is the disambiguator: an array literal yields values;
            // anything else (object literal/variable, or a variable that may
            // hold an array — no type inference here) yields keys, matching
            // the same best-effort asymmetry as the compiled path.
            _ => {
                let yields_values = matches!(iterable.item, Ast::ArrayLiteral(_));
                let collection = self.eval_expr(iterable, env)?;
                let keys = collection_keys(&collection)?;
                for key in keys {
                    let iter_env = Environment::child(env);
                    if yields_values {
                        let value = eval_index(collection.clone(), key)?;
                        iter_env.declare(var, value, Mutability::Mutable);
                    } else {
                        iter_env.declare(var, key, Mutability::Mutable);
                    }
                    self.eval_body_block(body, &iter_env)?;
                }
                Ok(())
            }
        }
    }

    fn eval_import(&mut self, path: &str, env: &Rc<Environment>) -> Result<(), EmberError> {
        if path.ends_with(".ember") {
            let source = Source::path(Path::new(path)).map_err(|_| RuntimeError::FileNotFound { path: path.to_string() })?;
            let tokens = crate::lexer::Lexer::lex(source)?;
            let ast = crate::parser::Parser::parse(tokens)?;
            self.eval_program(&ast, env)
        } else {
            log::warn!("module `{}` is not registered in the package index; skipping", path);
            Ok(())
        }
    }
}

fn flatten_property_chain(expr: &Spanned<Ast>) -> (&Spanned<Ast>, Vec<String>) {
    match &expr.item {
        Ast::PropertyAccess { object, property } => {
            let (root, mut parts) = flatten_property_chain(object);
            parts.push(property.clone());
            (root, parts)
        }
        _ => (expr, vec![]),
    }
}

fn set_nested(object: &mut RuntimeValue, segments: &[String], value: RuntimeValue) -> Result<(), EmberError> {
    let (head, rest) = match segments.split_first() {
        Some(split) => split,
        None => return Ok(()),
    };
    if !matches!(object, RuntimeValue::Object(_)) {
        *object = RuntimeValue::Object(vec![]);
    }
    if rest.is_empty() {
        object.object_set(head, value);
        return Ok(());
    }
    if object.object_get(head).is_none() {
        object.object_set(head, RuntimeValue::Object(vec![]));
    }
    if let RuntimeValue::Object(props) = object {
        if let Some((_, child)) = props.iter_mut().find(|(k, _)| k == head) {
            return set_nested(child, rest, value);
        }
    }
    Ok(())
}

fn collection_keys(value: &RuntimeValue) -> Result<Vec<RuntimeValue>, EmberError> {
    match value {
        RuntimeValue::Array(items) => Ok((0..items.len() as i64).map(|i| RuntimeValue::Number(i as f64)).collect()),
        RuntimeValue::Object(props) => Ok(props.iter().map(|(k, _)| RuntimeValue::String(k.clone())).collect()),
        other => Err(RuntimeError::TypeMismatch { op: "GET_KEYS".into(), detail: format!("expected array or object, got {}", other.type_name()) }.into()),
    }
}

fn eval_index(target: RuntimeValue, index: RuntimeValue) -> Result<RuntimeValue, EmberError> {
    let i = match index {
        RuntimeValue::Number(n) => n as i64,
        other => return Err(RuntimeError::TypeMismatch { op: "GET_INDEX".into(), detail: format!("expected numeric index, got {}", other.type_name()) }.into()),
    };
    match target {
        RuntimeValue::Array(items) => {
            if i < 0 || i as usize >= items.len() {
                return Err(RuntimeError::IndexOutOfBounds { index: i, len: items.len() }.into());
            }
            Ok(items[i as usize].clone())
        }
        RuntimeValue::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            if i < 0 || i as usize >= chars.len() {
                return Err(RuntimeError::IndexOutOfBounds { index: i, len: chars.len() }.into());
            }
            Ok(RuntimeValue::String(chars[i as usize].to_string()))
        }
        other => Err(RuntimeError::TypeMismatch { op: "GET_INDEX".into(), detail: format!("expected array, got {}", other.type_name()) }.into()),
    }
}

fn eval_binary(op: BinaryOp, left: RuntimeValue, right: RuntimeValue) -> Result<RuntimeValue, EmberError> {
    use BinaryOp::*;
    match op {
        Add => match (&left, &right) {
            (RuntimeValue::Number(a), RuntimeValue::Number(b)) => Ok(RuntimeValue::Number(a + b)),
            (RuntimeValue::String(_), _) | (_, RuntimeValue::String(_)) => Ok(RuntimeValue::String(format!("{}{}", left, right))),
            _ => Err(RuntimeError::TypeMismatch { op: "ADD".into(), detail: format!("cannot add {} and {}", left.type_name(), right.type_name()) }.into()),
        },
        Sub | Mul | Div | Mod => {
            let (a, b) = match (left, right) {
                (RuntimeValue::Number(a), RuntimeValue::Number(b)) => (a, b),
                (a, b) => return Err(RuntimeError::TypeMismatch { op: format!("{:?}", op), detail: format!("expected numbers, got {} and {}", a.type_name(), b.type_name()) }.into()),
            };
            match op {
                Sub => Ok(RuntimeValue::Number(a - b)),
                Mul => Ok(RuntimeValue::Number(a * b)),
                Div if b == 0.0 => Err(RuntimeError::DivisionByZero { op: "DIV".into() }.into()),
                Div => Ok(RuntimeValue::Number(a / b)),
                Mod if b == 0.0 => Err(RuntimeError::DivisionByZero { op: "MOD".into() }.into()),
                Mod => Ok(RuntimeValue::Number(a % b)),
                _ => unreachable!(),
            }
        }
        Eq => Ok(RuntimeValue::Boolean(left == right)),
        Neq => Ok(RuntimeValue::Boolean(left != right)),
        Lt | Gt | Lte | Gte => {
            let (a, b) = match (left, right) {
                (RuntimeValue::Number(a), RuntimeValue::Number(b)) => (a, b),
                (a, b) => return Err(RuntimeError::TypeMismatch { op: format!("{:?}", op), detail: format!("expected numbers, got {} and {}", a.type_name(), b.type_name()) }.into()),
            };
            let ord = a.partial_cmp(&b).ok_or_else(|| RuntimeError::TypeMismatch { op: format!("{:?}", op), detail: "NaN comparison".into() })?;
            use std::cmp::Ordering::*;
            Ok(RuntimeValue::Boolean(match op {
                Lt => ord == Less,
                Gt => ord == Greater,
                Lte => ord != Greater,
                Gte => ord != Less,
                _ => unreachable!(),
            }))
        }
        And => Ok(RuntimeValue::Boolean(left.truthy() && right.truthy())),
        Or => Ok(RuntimeValue::Boolean(left.truthy() || right.truthy())),
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

    fn run_src(src: &str) -> String {
        let tokens = Lexer::lex(Source::source(src)).unwrap();
        let ast = Parser::parse(tokens).unwrap();
        let mut out = Vec::new();
        exec(&ast, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn arithmetic_scenario() {
        assert_eq!(run_src("var a: 2\nvar b: 3\nprint(a + b)\n"), "5\n");
    }

    #[test]
    fn function_call_scenario() {
        assert_eq!(run_src("add: fn(a, b) { a + b }\nprint(add(10, 32))\n"), "42\n");
    }

    #[test]
    fn mixin_method_call_scenario() {
        let src = "Greet: { hi: fn() { print(\"hi \" + this.name) } }\np: { :[Greet], name: \"A\" }\np.hi()\n";
        assert_eq!(run_src(src), "hi A\n");
    }

    #[test]
    fn naked_iterator_range_scenario() {
        assert_eq!(run_src("sum: 0\ni: 1..4\n  sum = sum + i\nprint(sum)\n"), "10\n");
    }

    #[test]
    fn recursive_function_scenario() {
        let src = "fact: fn(n) { if n <= 1 { 1 } else { n * fact(n - 1) } }\nprint(fact(5))\n";
        assert_eq!(run_src(src), "120\n");
    }

    #[test]
    fn nested_property_assignment_scenario() {
        assert_eq!(run_src("g: { p: {} }\ng.p.q = \"x\"\nprint(g.p.q)\n"), "x\n");
    }

    #[test]
    fn undefined_function_call_is_an_error() {
        let tokens = Lexer::lex(Source::source("print(missing(1))\n")).unwrap();
        let ast = Parser::parse(tokens).unwrap();
        let mut out = Vec::new();
        assert!(exec(&ast, &mut out).is_err());
    }
}

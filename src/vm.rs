use std::io::Write;

use crate::bytecode::BytecodeChunk;
use crate::error::RuntimeError;
use crate::opcode::Opcode;
use crate::symbol::{GLOBAL_LIMIT, LOCALS_WINDOW};
use crate::value::{Function, RuntimeValue};

const STACK_LIMIT: usize = 4096;

/// Pushed on `CALL`/`CALL_METHOD`, popped on `RETURN`. Each frame owns a
/// fresh slice of the locals stack rather than sharing one fixed
/// `[256, 512)` region — the redesign `spec.md` §9 calls for so recursive
/// calls don't clobber each other's parameter slots.
struct CallFrame {
    return_ip: usize,
    locals_base: usize,
    #[allow(dead_code)]
    function_name: String,
}

/// Stack-based, register-free bytecode VM. Grounded on the teacher's
/// `vm/vm.rs` dispatch-loop shape (`fetch, match, advance`), reworked for
/// `CALL`/`RETURN` through an explicit call-frame stack instead of a
/// return-marker value threaded through the operand stack.
pub struct Vm<'w> {
    chunk: BytecodeChunk,
    ip: usize,
    stack: Vec<RuntimeValue>,
    globals: Vec<RuntimeValue>,
    locals: Vec<RuntimeValue>,
    frames: Vec<CallFrame>,
    out: &'w mut dyn Write,
}

pub fn run(chunk: BytecodeChunk, out: &mut dyn Write) -> Result<(), RuntimeError> {
    Vm::new(chunk, out).run()
}

impl<'w> Vm<'w> {
    pub fn new(chunk: BytecodeChunk, out: &'w mut dyn Write) -> Vm<'w> {
        Vm {
            chunk,
            ip: 0,
            stack: vec![],
            globals: vec![RuntimeValue::Null; GLOBAL_LIMIT as usize],
            locals: vec![RuntimeValue::Null; LOCALS_WINDOW as usize],
            frames: vec![],
            out,
        }
    }

    pub fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            if self.ip >= self.chunk.code.len() {
                return Ok(());
            }
            let byte = self.chunk.code[self.ip];
            self.ip += 1;
            let op = Opcode::from_byte(byte).ok_or(RuntimeError::UnknownOpcode { byte, ip: self.ip - 1 })?;
            log::trace!("ip={} op={:?} stack_depth={}", self.ip - 1, op, self.stack.len());

            match op {
                Opcode::Noop => {}
                Opcode::Eof => return Ok(()),
                Opcode::Pop => { self.pop("POP")?; }
                Opcode::Dup => {
                    let v = self.peek("DUP")?.clone();
                    self.push(v)?;
                }
                Opcode::Swap => {
                    let b = self.pop("SWAP")?;
                    let a = self.pop("SWAP")?;
                    self.push(b)?;
                    self.push(a)?;
                }
                Opcode::LoadConst => {
                    let idx = self.read_u8() as usize;
                    let v = self.chunk.constants.get(idx).cloned().unwrap_or(RuntimeValue::Null);
                    self.push(v)?;
                }
                Opcode::LoadVar => {
                    let idx = self.read_u16();
                    let v = self.load_var(idx);
                    self.push(v)?;
                }
                Opcode::StoreVar => {
                    let idx = self.read_u16();
                    let v = self.pop("STORE_VAR")?;
                    self.store_var(idx, v);
                }
                Opcode::Add => self.binary_add()?,
                Opcode::Sub => self.binary_numeric("SUB", |a, b| a - b)?,
                Opcode::Mul => self.binary_numeric("MUL", |a, b| a * b)?,
                Opcode::Div => self.binary_div_mod("DIV", |a, b| a / b)?,
                Opcode::Mod => self.binary_div_mod("MOD", |a, b| a % b)?,
                Opcode::Neg => {
                    let v = self.pop("NEG")?;
                    match v {
                        RuntimeValue::Number(n) => self.push(RuntimeValue::Number(-n))?,
                        other => return Err(RuntimeError::TypeMismatch { op: "NEG".into(), detail: format!("expected number, got {}", other.type_name()) }),
                    }
                }
                Opcode::Not => {
                    let v = self.pop("NOT")?;
                    self.push(RuntimeValue::Boolean(!v.truthy()))?;
                }
                Opcode::Eq => { let (a, b) = self.pop_pair("EQ")?; self.push(RuntimeValue::Boolean(a == b))?; }
                Opcode::Neq => { let (a, b) = self.pop_pair("NEQ")?; self.push(RuntimeValue::Boolean(a != b))?; }
                Opcode::Lt => self.compare("LT", |o| o == std::cmp::Ordering::Less)?,
                Opcode::Gt => self.compare("GT", |o| o == std::cmp::Ordering::Greater)?,
                Opcode::Lte => self.compare("LTE", |o| o != std::cmp::Ordering::Greater)?,
                Opcode::Gte => self.compare("GTE", |o| o != std::cmp::Ordering::Less)?,
                Opcode::And => { let (a, b) = self.pop_pair("AND")?; self.push(RuntimeValue::Boolean(a.truthy() && b.truthy()))?; }
                Opcode::Or => { let (a, b) = self.pop_pair("OR")?; self.push(RuntimeValue::Boolean(a.truthy() || b.truthy()))?; }
                Opcode::JumpIfFalse => {
                    let offset = self.read_u16() as usize;
                    let cond = self.pop("JUMP_IF_FALSE")?;
                    if !cond.truthy() { self.ip += offset; }
                }
                Opcode::Jump => { let offset = self.read_u16() as usize; self.ip += offset; }
                Opcode::Loop => { let offset = self.read_u16() as usize; self.ip -= offset; }
                Opcode::Call => self.op_call()?,
                Opcode::CallMethod => self.op_call_method()?,
                Opcode::Return => {
                    let frame = self.frames.pop().ok_or(RuntimeError::StackUnderflow { op: "RETURN".into() })?;
                    self.locals.truncate(frame.locals_base);
                    self.ip = frame.return_ip;
                }
                Opcode::Print => {
                    let v = self.pop("PRINT")?;
                    crate::builtins::print(&v, self.out).map_err(|e| RuntimeError::TypeMismatch { op: "PRINT".into(), detail: e.to_string() })?;
                }
                Opcode::NewArray => self.push(RuntimeValue::Array(vec![]))?,
                Opcode::ArrayPush => {
                    let value = self.pop("ARRAY_PUSH")?;
                    let mut array = self.pop("ARRAY_PUSH")?;
                    match &mut array {
                        RuntimeValue::Array(items) => items.push(value),
                        other => return Err(RuntimeError::TypeMismatch { op: "ARRAY_PUSH".into(), detail: format!("expected array, got {}", other.type_name()) }),
                    }
                    self.push(array)?;
                }
                Opcode::GetIndex => self.op_get_index()?,
                Opcode::NewObject => self.push(RuntimeValue::Object(vec![]))?,
                Opcode::GetProperty => self.op_get_property()?,
                Opcode::SetProperty => self.op_set_property()?,
                Opcode::SetNestedProperty => self.op_set_nested_property()?,
                Opcode::CopyProperties => self.op_copy_properties()?,
                Opcode::GetKeys => self.op_get_keys()?,
                Opcode::GetLength => self.op_get_length()?,
                Opcode::ToString => {
                    let v = self.pop("TO_STRING")?;
                    self.push(RuntimeValue::String(v.to_string()))?;
                }
            }
        }
    }

    // --- stack helpers ------------------------------------------------

    fn push(&mut self, value: RuntimeValue) -> Result<(), RuntimeError> {
        if self.stack.len() >= STACK_LIMIT {
            return Err(RuntimeError::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self, op: &str) -> Result<RuntimeValue, RuntimeError> {
        self.stack.pop().ok_or_else(|| RuntimeError::StackUnderflow { op: op.to_string() })
    }

    fn peek(&self, op: &str) -> Result<&RuntimeValue, RuntimeError> {
        self.stack.last().ok_or_else(|| RuntimeError::StackUnderflow { op: op.to_string() })
    }

    fn pop_pair(&mut self, op: &str) -> Result<(RuntimeValue, RuntimeValue), RuntimeError> {
        let b = self.pop(op)?;
        let a = self.pop(op)?;
        Ok((a, b))
    }

    fn read_u8(&mut self) -> u8 {
        let b = self.chunk.code[self.ip];
        self.ip += 1;
        b
    }

    fn read_u16(&mut self) -> u16 {
        let hi = self.chunk.code[self.ip];
        let lo = self.chunk.code[self.ip + 1];
        self.ip += 2;
        u16::from_be_bytes([hi, lo])
    }

    // --- variable storage ----------------------------------------------

    fn load_var(&self, idx: u16) -> RuntimeValue {
        if idx < GLOBAL_LIMIT {
            self.globals.get(idx as usize).cloned().unwrap_or(RuntimeValue::Null)
        } else {
            let base = self.frames.last().map(|f| f.locals_base).unwrap_or(0);
            self.locals.get(base + (idx - GLOBAL_LIMIT) as usize).cloned().unwrap_or(RuntimeValue::Null)
        }
    }

    fn store_var(&mut self, idx: u16, value: RuntimeValue) {
        if idx < GLOBAL_LIMIT {
            if (idx as usize) >= self.globals.len() {
                self.globals.resize(idx as usize + 1, RuntimeValue::Null);
            }
            self.globals[idx as usize] = value;
        } else {
            let base = self.frames.last().map(|f| f.locals_base).unwrap_or(0);
            let slot = base + (idx - GLOBAL_LIMIT) as usize;
            if slot >= self.locals.len() {
                self.locals.resize(slot + 1, RuntimeValue::Null);
            }
            self.locals[slot] = value;
        }
    }

    // --- arithmetic / comparison ----------------------------------------

    fn binary_add(&mut self) -> Result<(), RuntimeError> {
        let (a, b) = self.pop_pair("ADD")?;
        let result = match (&a, &b) {
            (RuntimeValue::Number(x), RuntimeValue::Number(y)) => RuntimeValue::Number(x + y),
            (RuntimeValue::String(_), _) | (_, RuntimeValue::String(_)) => RuntimeValue::String(format!("{}{}", a, b)),
            _ => return Err(RuntimeError::TypeMismatch { op: "ADD".into(), detail: format!("cannot add {} and {}", a.type_name(), b.type_name()) }),
        };
        self.push(result)
    }

    fn binary_numeric(&mut self, op: &str, f: impl Fn(f64, f64) -> f64) -> Result<(), RuntimeError> {
        let (a, b) = self.pop_pair(op)?;
        match (a, b) {
            (RuntimeValue::Number(x), RuntimeValue::Number(y)) => self.push(RuntimeValue::Number(f(x, y))),
            (a, b) => Err(RuntimeError::TypeMismatch { op: op.into(), detail: format!("expected numbers, got {} and {}", a.type_name(), b.type_name()) }),
        }
    }

    fn binary_div_mod(&mut self, op: &str, f: impl Fn(f64, f64) -> f64) -> Result<(), RuntimeError> {
        let (a, b) = self.pop_pair(op)?;
        match (a, b) {
            (RuntimeValue::Number(_), RuntimeValue::Number(y)) if y == 0.0 => Err(RuntimeError::DivisionByZero { op: op.into() }),
            (RuntimeValue::Number(x), RuntimeValue::Number(y)) => self.push(RuntimeValue::Number(f(x, y))),
            (a, b) => Err(RuntimeError::TypeMismatch { op: op.into(), detail: format!("expected numbers, got {} and {}", a.type_name(), b.type_name()) }),
        }
    }

    fn compare(&mut self, op: &str, f: impl Fn(std::cmp::Ordering) -> bool) -> Result<(), RuntimeError> {
        let (a, b) = self.pop_pair(op)?;
        match (a, b) {
            (RuntimeValue::Number(x), RuntimeValue::Number(y)) => {
                let ord = x.partial_cmp(&y).ok_or_else(|| RuntimeError::TypeMismatch { op: op.into(), detail: "NaN comparison".into() })?;
                self.push(RuntimeValue::Boolean(f(ord)))
            }
            (a, b) => Err(RuntimeError::TypeMismatch { op: op.into(), detail: format!("expected numbers, got {} and {}", a.type_name(), b.type_name()) }),
        }
    }

    // --- calls -----------------------------------------------------------

    fn op_call(&mut self) -> Result<(), RuntimeError> {
        let func_idx = self.read_u8() as usize;
        let argc = self.read_u8() as usize;
        let info = self.chunk.functions.get(func_idx).cloned()
            .ok_or_else(|| RuntimeError::NonCallableTarget { detail: format!("function index {}", func_idx) })?;

        let mut args = Vec::with_capacity(argc);
        for _ in 0..argc { args.push(self.pop("CALL")?); }

        let locals_base = self.locals.len();
        self.locals.resize(locals_base + LOCALS_WINDOW as usize, RuntimeValue::Null);
        for (i, v) in args.into_iter().enumerate() {
            if i < info.arity { self.locals[locals_base + i] = v; }
        }

        self.frames.push(CallFrame { return_ip: self.ip, locals_base, function_name: info.name.clone() });
        self.ip = info.start_ip;
        Ok(())
    }

    fn op_call_method(&mut self) -> Result<(), RuntimeError> {
        let argc = self.read_u8() as usize;
        let mut args = Vec::with_capacity(argc);
        for _ in 0..argc { args.push(self.pop("CALL_METHOD")?); }
        args.reverse();

        let method = self.pop("CALL_METHOD")?;
        let receiver = self.pop("CALL_METHOD")?;
        let user_fn = match method {
            RuntimeValue::Function(Function::User(u)) => u,
            RuntimeValue::Function(Function::Builtin(name, builtin)) => {
                let mut call_args = vec![receiver];
                call_args.extend(args);
                let result = (*builtin)(&call_args).map_err(|detail| RuntimeError::TypeMismatch { op: name, detail })?;
                return self.push(result);
            }
            other => return Err(RuntimeError::NonCallableTarget { detail: format!("{} value", other.type_name()) }),
        };

        let (_, info) = self.chunk.find_function(&user_fn.name)
            .ok_or_else(|| RuntimeError::NonCallableTarget { detail: format!("method `{}`", user_fn.name) })?;
        let start_ip = info.start_ip;

        let locals_base = self.locals.len();
        self.locals.resize(locals_base + LOCALS_WINDOW as usize, RuntimeValue::Null);
        self.locals[locals_base] = receiver;
        for (i, v) in args.into_iter().enumerate() {
            self.locals[locals_base + 1 + i] = v;
        }

        self.frames.push(CallFrame { return_ip: self.ip, locals_base, function_name: user_fn.name.clone() });
        self.ip = start_ip;
        Ok(())
    }

    // --- collections -------------------------------------------------

    fn op_get_index(&mut self) -> Result<(), RuntimeError> {
        let index = self.pop("GET_INDEX")?;
        let target = self.pop("GET_INDEX")?;
        let i = match index {
            RuntimeValue::Number(n) => n as i64,
            other => return Err(RuntimeError::TypeMismatch { op: "GET_INDEX".into(), detail: format!("expected numeric index, got {}", other.type_name()) }),
        };
        match target {
            RuntimeValue::Array(items) => {
                if i < 0 || i as usize >= items.len() {
                    return Err(RuntimeError::IndexOutOfBounds { index: i, len: items.len() });
                }
                self.push(items[i as usize].clone())
            }
            RuntimeValue::String(s) => {
                let chars: Vec<char> = s.chars().collect();
                if i < 0 || i as usize >= chars.len() {
                    return Err(RuntimeError::IndexOutOfBounds { index: i, len: chars.len() });
                }
                self.push(RuntimeValue::String(chars[i as usize].to_string()))
            }
            other => Err(RuntimeError::TypeMismatch { op: "GET_INDEX".into(), detail: format!("expected array, got {}", other.type_name()) }),
        }
    }

    fn op_get_property(&mut self) -> Result<(), RuntimeError> {
        let key = self.pop("GET_PROPERTY")?;
        let object = self.pop("GET_PROPERTY")?;
        let key = match key {
            RuntimeValue::String(s) => s,
            other => return Err(RuntimeError::TypeMismatch { op: "GET_PROPERTY".into(), detail: format!("expected string key, got {}", other.type_name()) }),
        };
        match object.object_get(&key) {
            Some(v) => { let v = v.clone(); self.push(v) }
            None => {
                log::warn!("missing property `{}` on object; yielding null", key);
                self.push(RuntimeValue::Null)
            }
        }
    }

    fn op_set_property(&mut self) -> Result<(), RuntimeError> {
        let value = self.pop("SET_PROPERTY")?;
        let key = self.pop("SET_PROPERTY")?;
        let mut object = self.pop("SET_PROPERTY")?;
        let key = match key {
            RuntimeValue::String(s) => s,
            other => return Err(RuntimeError::TypeMismatch { op: "SET_PROPERTY".into(), detail: format!("expected string key, got {}", other.type_name()) }),
        };
        object.object_set(&key, value);
        self.push(object)
    }

    fn op_set_nested_property(&mut self) -> Result<(), RuntimeError> {
        let value = self.pop("SET_NESTED_PROPERTY")?;
        let path = self.pop("SET_NESTED_PROPERTY")?;
        let mut object = self.pop("SET_NESTED_PROPERTY")?;
        let path = match path {
            RuntimeValue::String(s) => s,
            other => return Err(RuntimeError::TypeMismatch { op: "SET_NESTED_PROPERTY".into(), detail: format!("expected string path, got {}", other.type_name()) }),
        };
        set_nested(&mut object, &path, value)?;
        self.push(object)
    }

    fn op_copy_properties(&mut self) -> Result<(), RuntimeError> {
        let source = self.pop("COPY_PROPERTIES")?;
        let mut dest = self.pop("COPY_PROPERTIES")?;
        if let RuntimeValue::Object(props) = source {
            for (k, v) in props {
                dest.object_set(&k, v);
            }
        }
        self.push(dest)
    }

    fn op_get_keys(&mut self) -> Result<(), RuntimeError> {
        let value = self.pop("GET_KEYS")?;
        let keys = match value {
            RuntimeValue::Array(items) => (0..items.len() as i64).map(|i| RuntimeValue::Number(i as f64)).collect(),
            RuntimeValue::Object(props) => props.into_iter().map(|(k, _)| RuntimeValue::String(k)).collect(),
            other => return Err(RuntimeError::TypeMismatch { op: "GET_KEYS".into(), detail: format!("expected array or object, got {}", other.type_name()) }),
        };
        self.push(RuntimeValue::Array(keys))
    }

    fn op_get_length(&mut self) -> Result<(), RuntimeError> {
        let value = self.pop("GET_LENGTH")?;
        let len = match &value {
            RuntimeValue::Array(items) => items.len(),
            RuntimeValue::String(s) => s.chars().count(),
            RuntimeValue::Object(props) => props.len(),
            other => return Err(RuntimeError::TypeMismatch { op: "GET_LENGTH".into(), detail: format!("expected array, string, or object, got {}", other.type_name()) }),
        };
        self.push(RuntimeValue::Number(len as f64))
    }
}

/// Walks a dotted path, auto-creating intermediate empty objects, and sets
/// the final segment to `value`.
fn set_nested(object: &mut RuntimeValue, path: &str, value: RuntimeValue) -> Result<(), RuntimeError> {
    let segments: Vec<&str> = path.split('.').collect();
    set_nested_segments(object, &segments, value)
}

fn set_nested_segments(object: &mut RuntimeValue, segments: &[&str], value: RuntimeValue) -> Result<(), RuntimeError> {
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
            return set_nested_segments(child, rest, value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use crate::source::Source;

    fn run_src(src: &str) -> String {
        let tokens = Lexer::lex(Source::source(src)).unwrap();
        let ast = Parser::parse(tokens).unwrap();
        let chunk = compile(&ast).unwrap();
        let mut out = Vec::new();
        run(chunk, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn arithmetic_scenario() {
        assert_eq!(run_src("var a: 2\nvar b: 3\nprint(a + b)\n"), "5\n");
    }

    #[test]
    fn property_mutation_scenario() {
        assert_eq!(run_src("obj: { name: \"hi\", n: 1 }\nobj.n = obj.n + 41\nprint(obj.n)\n"), "42\n");
    }

    #[test]
    fn function_call_scenario() {
        assert_eq!(run_src("add: fn(a, b) { a + b }\nprint(add(10, 32))\n"), "42\n");
    }

    #[test]
    fn naked_iterator_range_scenario() {
        assert_eq!(run_src("sum: 0\ni: 1..4\n  sum = sum + i\nprint(sum)\n"), "10\n");
    }

    #[test]
    fn mixin_method_call_scenario() {
        let src = "Greet: { hi: fn() { print(\"hi \" + this.name) } }\np: { :[Greet], name: \"A\" }\np.hi()\n";
        assert_eq!(run_src(src), "hi A\n");
    }

    #[test]
    fn deep_property_set_scenario() {
        assert_eq!(run_src("g: { p: {} }\ng.p.q = \"x\"\nprint(g.p.q)\n"), "x\n");
    }

    #[test]
    fn recursive_function_does_not_clobber_locals() {
        let src = "fact: fn(n) { if n <= 1 { 1 } else { n * fact(n - 1) } }\nprint(fact(5))\n";
        assert_eq!(run_src(src), "120\n");
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let tokens = Lexer::lex(Source::source("print(1 / 0)\n")).unwrap();
        let ast = Parser::parse(tokens).unwrap();
        let chunk = compile(&ast).unwrap();
        let mut out = Vec::new();
        assert!(run(chunk, &mut out).is_err());
    }
}

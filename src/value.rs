use std::fmt::{Display, Formatter, Result as FmtResult};
use std::rc::Rc;

/// A user-defined function. Shared (via `Rc`) by every call site that
/// resolves the same name; the function table in `BytecodeChunk` is the
/// authority on where its body lives in the code stream.
#[derive(Debug, Clone, PartialEq)]
pub struct UserFunction {
    pub name: String,
    pub params: Vec<String>,
}

/// A callable supplied by the host rather than compiled from source.
pub type BuiltinFn = Rc<dyn Fn(&[RuntimeValue]) -> Result<RuntimeValue, String>>;

#[derive(Clone)]
pub enum Function {
    User(Rc<UserFunction>),
    Builtin(String, BuiltinFn),
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Function::User(u) => write!(f, "Function::User({})", u.name),
            Function::Builtin(name, _) => write!(f, "Function::Builtin({})", name),
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Function) -> bool {
        match (self, other) {
            (Function::User(a), Function::User(b)) => a == b,
            (Function::Builtin(a, _), Function::Builtin(b, _)) => a == b,
            _ => false,
        }
    }
}

/// Every runtime value EmberScript programs can produce. Tagged variant,
/// deep-cloned on every move between stack/globals/environment per the
/// crate's ownership model (no garbage collector, no shared aliasing
/// across scopes).
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeValue {
    Null,
    Number(f64),
    Boolean(bool),
    String(String),
    Array(Vec<RuntimeValue>),
    // insertion-ordered; keys are unique within one Object
    Object(Vec<(String, RuntimeValue)>),
    Function(Function),
}

impl RuntimeValue {
    pub fn truthy(&self) -> bool {
        match self {
            RuntimeValue::Null => false,
            RuntimeValue::Boolean(b) => *b,
            RuntimeValue::Number(n) => *n != 0.0,
            RuntimeValue::String(s) => !s.is_empty(),
            RuntimeValue::Array(a) => !a.is_empty(),
            RuntimeValue::Object(o) => !o.is_empty(),
            RuntimeValue::Function(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RuntimeValue::Null => "null",
            RuntimeValue::Number(_) => "number",
            RuntimeValue::Boolean(_) => "boolean",
            RuntimeValue::String(_) => "string",
            RuntimeValue::Array(_) => "array",
            RuntimeValue::Object(_) => "object",
            RuntimeValue::Function(_) => "function",
        }
    }

    pub fn object_get(&self, key: &str) -> Option<&RuntimeValue> {
        match self {
            RuntimeValue::Object(props) => props.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn object_set(&mut self, key: &str, value: RuntimeValue) {
        if let RuntimeValue::Object(props) = self {
            if let Some(entry) = props.iter_mut().find(|(k, _)| k == key) {
                entry.1 = value;
            } else {
                props.push((key.to_string(), value));
            }
        }
    }
}

impl Display for RuntimeValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RuntimeValue::Null => write!(f, "null"),
            RuntimeValue::Number(n) => write!(f, "{}", n),
            RuntimeValue::Boolean(b) => write!(f, "{}", b),
            RuntimeValue::String(s) => write!(f, "{}", s),
            RuntimeValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            RuntimeValue::Object(props) => {
                write!(f, "{{")?;
                for (i, (k, v)) in props.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            RuntimeValue::Function(Function::User(u)) => write!(f, "<fn {}>", u.name),
            RuntimeValue::Function(Function::Builtin(name, _)) => write!(f, "<builtin {}>", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!RuntimeValue::Null.truthy());
        assert!(!RuntimeValue::Number(0.0).truthy());
        assert!(RuntimeValue::Number(1.0).truthy());
        assert!(!RuntimeValue::String(String::new()).truthy());
    }

    #[test]
    fn object_insertion_order_preserved() {
        let mut obj = RuntimeValue::Object(vec![]);
        obj.object_set("b", RuntimeValue::Number(2.0));
        obj.object_set("a", RuntimeValue::Number(1.0));
        if let RuntimeValue::Object(props) = &obj {
            let keys: Vec<&str> = props.iter().map(|(k, _)| k.as_str()).collect();
            assert_eq!(keys, vec!["b", "a"]);
        } else {
            panic!("expected object");
        }
    }
}

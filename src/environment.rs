use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::Mutability;
use crate::error::RuntimeError;
use crate::value::RuntimeValue;

/// One lexical scope's bindings, plus a link to the scope it's nested in.
/// EmberScript has no closures (`spec.md` Non-goal c — functions resolve by
/// name through a flat global table, never by capturing an enclosing
/// `Environment`), so a function call always opens its new scope as a child
/// of the *global* environment, never of the caller's — this chain only
/// exists to give blocks (`if`/`while`/`for` bodies) their own nested
/// bindings within a single call.
#[derive(Debug)]
pub struct Environment {
    variables: RefCell<HashMap<String, (RuntimeValue, Mutability)>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    pub fn new() -> Rc<Environment> {
        Rc::new(Environment { variables: RefCell::new(HashMap::new()), parent: None })
    }

    pub fn child(parent: &Rc<Environment>) -> Rc<Environment> {
        Rc::new(Environment { variables: RefCell::new(HashMap::new()), parent: Some(Rc::clone(parent)) })
    }

    /// Declares `name` in *this* scope, shadowing any binding of the same
    /// name in an enclosing scope. Used for `var`/`let`/`const` and for
    /// binding function parameters.
    pub fn declare(&self, name: &str, value: RuntimeValue, mutable: Mutability) {
        self.variables.borrow_mut().insert(name.to_string(), (value, mutable));
    }

    pub fn get(&self, name: &str) -> Option<RuntimeValue> {
        if let Some((value, _)) = self.variables.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.get(name))
    }

    /// Reassigns an existing binding, walking up the chain to find which
    /// scope owns `name`. Fails if `name` is undeclared anywhere in the
    /// chain, or if it was declared `let`/`const`.
    pub fn assign(&self, name: &str, value: RuntimeValue) -> Result<(), RuntimeError> {
        if let Some((slot, mutable)) = self.variables.borrow_mut().get_mut(name) {
            if *mutable != Mutability::Mutable {
                return Err(RuntimeError::TypeMismatch {
                    op: "ASSIGN".into(),
                    detail: format!("cannot assign to immutable variable `{}`", name),
                });
            }
            *slot = value;
            return Ok(());
        }
        match &self.parent {
            Some(p) => p.assign(name, value),
            None => Err(RuntimeError::TypeMismatch { op: "ASSIGN".into(), detail: format!("undeclared variable `{}`", name) }),
        }
    }

    /// Writes `name`'s slot regardless of its declared mutability. Used to
    /// write a mutated object back to its originating variable after a
    /// property assignment — `let`'s binding can't be rebound, but its
    /// contents may still mutate (`spec.md` §9). Returns `false` if `name`
    /// is undeclared anywhere in the chain (a no-op, mirroring
    /// `write_back_root`'s silent skip for non-variable roots).
    pub fn force_assign(&self, name: &str, value: RuntimeValue) -> bool {
        if let Some((slot, _)) = self.variables.borrow_mut().get_mut(name) {
            *slot = value;
            return true;
        }
        match &self.parent {
            Some(p) => p.force_assign(name, value),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_scope_sees_parent_bindings() {
        let root = Environment::new();
        root.declare("x", RuntimeValue::Number(1.0), Mutability::Mutable);
        let child = Environment::child(&root);
        assert_eq!(child.get("x"), Some(RuntimeValue::Number(1.0)));
    }

    #[test]
    fn child_declaration_shadows_without_mutating_parent() {
        let root = Environment::new();
        root.declare("x", RuntimeValue::Number(1.0), Mutability::Mutable);
        let child = Environment::child(&root);
        child.declare("x", RuntimeValue::Number(2.0), Mutability::Mutable);
        assert_eq!(child.get("x"), Some(RuntimeValue::Number(2.0)));
        assert_eq!(root.get("x"), Some(RuntimeValue::Number(1.0)));
    }

    #[test]
    fn assign_walks_up_to_owning_scope() {
        let root = Environment::new();
        root.declare("x", RuntimeValue::Number(1.0), Mutability::Mutable);
        let child = Environment::child(&root);
        child.assign("x", RuntimeValue::Number(9.0)).unwrap();
        assert_eq!(root.get("x"), Some(RuntimeValue::Number(9.0)));
    }

    #[test]
    fn assigning_immutable_binding_fails() {
        let root = Environment::new();
        root.declare("x", RuntimeValue::Number(1.0), Mutability::Immutable);
        assert!(root.assign("x", RuntimeValue::Number(2.0)).is_err());
    }
}

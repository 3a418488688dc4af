use crate::error::CompileError;
use crate::span::Span;

/// Module globals occupy slots `0..GLOBAL_LIMIT`; each call frame's
/// parameters/locals occupy a same-width window starting at `GLOBAL_LIMIT`
/// relative to that frame (see `vm::CallFrame`).
pub const GLOBAL_LIMIT: u16 = 256;
pub const LOCALS_WINDOW: u16 = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub index: u16,
    pub is_function: bool,
    pub is_mutable: bool,
}

/// Flat, ordered symbol table. Grounded on the shared-`SharedSymbol`/
/// per-scope-`UniqueSymbol` split this crate already uses elsewhere: here
/// there is only one flat namespace (globals) plus one local window per
/// function body, so a single `Vec<Symbol>` plus a local sub-range
/// suffices — no nested lexical scope chain is needed in bytecode mode.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    next_global: u16,
    local_base: Option<u16>,
    next_local: u16,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable { symbols: vec![], next_global: 0, local_base: None, next_local: 0 }
    }

    /// Lenient resolve-or-create, used for ordinary variable references.
    pub fn get_or_add(&mut self, name: &str, is_function: bool) -> u16 {
        if let Some(sym) = self.find(name) {
            return sym.index;
        }
        self.declare_unchecked(name, true, is_function)
    }

    /// Strict declaration: fails if `name` is already declared in the
    /// *current* window (global scope, or the active function's locals).
    pub fn declare(&mut self, name: &str, mutable: bool, span: &Span) -> Result<u16, CompileError> {
        let already_here = match self.local_base {
            Some(base) => self.symbols.iter().any(|s| s.name == name && s.index >= base),
            None => self.symbols.iter().any(|s| s.name == name && s.index < GLOBAL_LIMIT),
        };
        if already_here {
            return Err(CompileError::Redeclaration { name: name.to_string(), span: span.clone() });
        }
        Ok(self.declare_unchecked(name, mutable, false))
    }

    fn declare_unchecked(&mut self, name: &str, mutable: bool, is_function: bool) -> u16 {
        let index = match self.local_base {
            Some(base) => {
                let idx = base + self.next_local;
                self.next_local += 1;
                idx
            }
            None => {
                let idx = self.next_global;
                self.next_global += 1;
                idx
            }
        };
        self.symbols.push(Symbol { name: name.to_string(), index, is_function, is_mutable: mutable });
        index
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.find(name)
    }

    pub fn is_mutable(&self, name: &str) -> bool {
        self.find(name).map(|s| s.is_mutable).unwrap_or(true)
    }

    fn find(&self, name: &str) -> Option<&Symbol> {
        // locals shadow globals: search from the back so the most recently
        // declared matching name (the local, if any) wins.
        self.symbols.iter().rev().find(|s| s.name == name)
    }

    /// Opens a fresh parameter/local window for compiling a function body.
    /// Per `SPEC_FULL.md`, the window base is always `GLOBAL_LIMIT`
    /// relative to the active call frame; at the symbol-table level we only
    /// need a flat incrementing counter within that window.
    pub fn begin_function_scope(&mut self) {
        self.local_base = Some(GLOBAL_LIMIT);
        self.next_local = 0;
    }

    /// Closes the current function's local window, purging every symbol
    /// declared inside it. Without this, a stale param/local from a closed
    /// window keeps shadowing later globals of the same name in `find`,
    /// since it never stops being the most-recently-declared match.
    pub fn end_function_scope(&mut self) {
        self.symbols.retain(|s| s.index < GLOBAL_LIMIT);
        self.local_base = None;
        self.next_local = 0;
    }

    pub fn declare_param(&mut self, name: &str) -> u16 {
        self.declare_unchecked(name, true, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn globals_are_ordered_from_zero() {
        let mut table = SymbolTable::new();
        let a = table.get_or_add("a", false);
        let b = table.get_or_add("b", false);
        assert_eq!(a, 0);
        assert_eq!(b, 1);
    }

    #[test]
    fn params_live_in_locals_window() {
        let mut table = SymbolTable::new();
        table.get_or_add("g", false);
        table.begin_function_scope();
        let p0 = table.declare_param("x");
        let p1 = table.declare_param("y");
        assert_eq!(p0, GLOBAL_LIMIT);
        assert_eq!(p1, GLOBAL_LIMIT + 1);
        table.end_function_scope();
    }

    #[test]
    fn redeclaration_in_same_scope_fails() {
        let mut table = SymbolTable::new();
        let span = Span::empty();
        table.declare("x", true, &span).unwrap();
        assert!(table.declare("x", true, &span).is_err());
    }
}

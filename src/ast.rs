use crate::span::Spanned;

pub type Node = Box<Spanned<Ast>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp { Add, Sub, Mul, Div, Mod, Eq, Neq, Lt, Gt, Lte, Gte, And, Or }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp { Not, Neg }

/// Tagged variant AST node. Every construct named in the grammar gets its
/// own case rather than a shared "expression" supertype with inheritance —
/// matching this crate's existing tagged-union style for syntax trees.
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    Literal(Literal),
    Variable(String),
    VarDecl { name: String, mutable: Mutability, init: Option<Node> },
    Assignment { name: String, value: Node },
    Binary { op: BinaryOp, left: Node, right: Node },
    Unary { op: UnaryOp, operand: Node },
    ArrayLiteral(Vec<Spanned<Ast>>),
    IndexAccess { array: Node, index: Node },
    ObjectLiteral { mixins: Vec<String>, properties: Vec<(String, Spanned<Ast>)> },
    PropertyAccess { object: Node, property: String },
    PropertyAssignment { object: Node, property: String, value: Node },
    MethodCall { object: Node, method: String, args: Vec<Spanned<Ast>> },
    FunctionDef { name: String, params: Vec<String>, body: Box<Spanned<Ast>> },
    FunctionCall { name: String, args: Vec<Spanned<Ast>> },
    If { condition: Node, then_branch: Node, else_branch: Option<Node> },
    While { condition: Node, body: Node },
    For {
        init: Option<Node>,
        condition: Option<Node>,
        increment: Option<Node>,
        body: Node,
    },
    NakedIterator { var: String, iterable: Node, body: Node },
    Range { start: Node, end: Node },
    Block(Vec<Spanned<Ast>>),
    Import { path: String },
    Print(Node),
    /// An anonymous function value, e.g. an object-literal method
    /// (`hi: fn() { ... }`). Distinct from `FunctionDef`, which binds a
    /// name directly into the function table rather than producing a
    /// value; a `Lambda` is compiled with an implicit leading `this`
    /// parameter so it can be invoked through `MethodCall`.
    Lambda { params: Vec<String>, body: Node },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability { Mutable, Immutable, Const }

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
}

impl Ast {
    pub fn assignment(name: String, value: Spanned<Ast>) -> Ast {
        Ast::Assignment { name, value: Box::new(value) }
    }

    pub fn function_def(name: String, params: Vec<String>, body: Spanned<Ast>) -> Ast {
        Ast::FunctionDef { name, params, body: Box::new(body) }
    }
}

//! Abstract syntax produced by the parser and walked by the evaluator.
//!
//! Node shapes follow spec.md §4.I/§4.J's expression and statement
//! grammar; every statement and every expression carries the source line
//! it was parsed from, the same bookkeeping the teacher's `read()`
//! (`reader/parser.rs`) keeps per list form, here generalized from one
//! line number per list to one per statement/expression node.

use crate::ident::Identifier;
use crate::types::TypeUsage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
    AddressOf,
    Deref,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,
}

#[derive(Debug, Clone)]
pub enum Literal {
    Integer(i64),
    UnsignedInteger(u64),
    Float(f64),
    Bool(bool),
    Char(char),
    String(String),
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub line: u32,
    pub kind: ExprKind,
}

/// Which cast form produced an `ExprKind::Cast` node. `CStyle` and `Static`
/// share the base-offset pointer adjustment; `Reinterpret` copies raw bytes
/// regardless of any type relation; `Dynamic` validates the runtime type
/// relation and yields a null pointer on mismatch. Void-pointer involvement
/// bypasses all of these (see `eval::cast_value`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    CStyle,
    Static,
    Dynamic,
    Reinterpret,
    Const,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    NullPointer,
    Variable(Identifier),
    MemberAccess { owner: Box<Expr>, member: Identifier },
    ArrowAccess { owner: Box<Expr>, member: Identifier },
    Index { base: Box<Expr>, index: Box<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Conditional { cond: Box<Expr>, then_expr: Box<Expr>, else_expr: Box<Expr> },
    Assignment { op: AssignOp, target: Box<Expr>, value: Box<Expr> },
    Call { callee: Identifier, args: Vec<Expr> },
    MethodCall { owner: Box<Expr>, method: Identifier, args: Vec<Expr> },
    SizeOfExpr(Box<Expr>),
    SizeOfType(TypeUsage),
    Cast { kind: CastKind, target: TypeUsage, expr: Box<Expr> },
    Paren(Box<Expr>),
    /// A brace-enclosed initializer list, e.g. `{ 1, 2, 3, 4 }`. Valid as a
    /// `VarDecl` initializer for an array-typed declaration (element by
    /// element) or a struct-typed one (aggregate: positional by field).
    ArrayLiteral(Vec<Expr>),
    /// Constructor-argument form of a `VarDecl` initializer, e.g.
    /// `Foo f(1, 2, 3);`. Resolved against the declared type's constructor
    /// overloads at evaluation time.
    ObjectConstruction(Vec<Expr>),
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub line: u32,
    pub kind: StmtKind,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub usage: TypeUsage,
    pub name: Identifier,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: Identifier,
    pub return_usage: TypeUsage,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// `None` marks the `default:` label.
    pub label: Option<i64>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct StructField {
    pub usage: TypeUsage,
    pub name: Identifier,
}

#[derive(Debug, Clone)]
pub struct StructDecl {
    pub name: Identifier,
    /// Single base class, matching the base-offset arithmetic the type
    /// model supports (see `types::Type::offset_of_base`).
    pub base: Option<Identifier>,
    pub fields: Vec<StructField>,
    /// Constructors and ordinary methods alike; a constructor is the entry
    /// whose name equals `name`.
    pub methods: Vec<FunctionDecl>,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: Identifier,
    pub is_class: bool,
    /// `None` means "one more than the previous enumerator" (or zero for
    /// the first), the same default C++ uses.
    pub enumerators: Vec<(Identifier, Option<i64>)>,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Block(Vec<Stmt>),
    ExprStmt(Expr),
    VarDecl { usage: TypeUsage, name: Identifier, initializer: Option<Expr> },
    If { cond: Expr, then_branch: Box<Stmt>, else_branch: Option<Box<Stmt>> },
    While { cond: Expr, body: Box<Stmt> },
    DoWhile { body: Box<Stmt>, cond: Expr },
    ForClassic { init: Option<Box<Stmt>>, cond: Option<Expr>, step: Option<Expr>, body: Box<Stmt> },
    ForRange { element_usage: TypeUsage, element_name: Identifier, iterable: Expr, body: Box<Stmt> },
    Switch { expr: Expr, cases: Vec<SwitchCase> },
    Break,
    Continue,
    Return(Option<Expr>),
    FunctionDecl(FunctionDecl),
    UsingNamespace(String),
    NamespaceDecl { name: String, body: Vec<Stmt> },
    StructDecl(StructDecl),
    EnumDecl(EnumDecl),
    /// `typedef Type Name;` or `using Name = Type;`.
    TypeAliasDecl { name: Identifier, usage: TypeUsage },
}

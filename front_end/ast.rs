//! The typed tree shared by every pass.
//!
//! Every node kind is a closed enum so passes match exhaustively instead of
//! dispatching through visitors.  Names are plain strings: the validator
//! guarantees that a name is declared at most once inside a control, parser,
//! or function, so a string identifies a declaration within its unit.

use derive_more::Display;
use serde::{Deserialize, Serialize};

mod display;
pub mod validate;

pub use validate::ValidationError;

// SECTION: declarations

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub decls: Vec<Decl>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decl {
    Header(TypeDecl),
    Struct(TypeDecl),
    Extern(ExternDecl),
    Function(Function),
    Parser(Parser),
    Control(Control),
}

impl Decl {
    pub fn name(&self) -> &str {
        match self {
            Decl::Header(t) | Decl::Struct(t) => &t.name,
            Decl::Extern(e) => &e.name,
            Decl::Function(f) => &f.name,
            Decl::Parser(p) => &p.name,
            Decl::Control(c) => &c.name,
        }
    }
}

// header or struct type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    pub fields: Vec<Field>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub typ: Type,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    Bit(u32),
    Bool,
    // header or struct, by name.
    Named(String),
    // header stack with a fixed number of elements.
    Stack(Box<Type>, u32),
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[display(fmt = "")]
    None,
    #[display(fmt = "in")]
    In,
    #[display(fmt = "out")]
    Out,
    #[display(fmt = "inout")]
    InOut,
}

impl Direction {
    // whether the callee may overwrite the argument.
    pub fn writes(self) -> bool {
        matches!(self, Direction::Out | Direction::InOut)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub direction: Direction,
    pub typ: Type,
    pub name: String,
}

// an extern function: its body is unknown, so calls to it may do anything.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternDecl {
    pub name: String,
    pub rettyp: Option<Type>,
    pub params: Vec<Param>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub rettyp: Option<Type>,
    pub params: Vec<Param>,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parser {
    pub name: String,
    pub params: Vec<Param>,
    pub locals: Vec<VarDecl>,
    pub states: Vec<ParserState>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserState {
    pub name: String,
    pub body: Block,
    pub transition: Transition,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    Direct(String),
    Select {
        exprs: Vec<Expr>,
        cases: Vec<SelectCase>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectCase {
    // `None` is `default`.
    pub keys: Option<Vec<Expr>>,
    pub next: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    pub name: String,
    pub params: Vec<Param>,
    pub locals: Vec<ControlLocal>,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlLocal {
    Var(VarDecl),
    Action(Action),
    Table(Table),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub keys: Vec<KeyElement>,
    pub actions: Vec<String>,
    pub default_action: Option<ActionRef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyElement {
    pub expr: Expr,
    pub match_kind: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRef {
    pub name: String,
    pub args: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    pub typ: Type,
    pub init: Option<Expr>,
}

// SECTION: statements

pub type Block = Vec<Stmt>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stmt {
    Decl(VarDecl),
    Assign {
        lhs: Expr,
        rhs: Expr,
    },
    // a call evaluated for its effects.
    Call(Expr),
    If {
        cond: Expr,
        tt: Block,
        ff: Block,
    },
    Block(Block),
    Switch {
        selector: Expr,
        cases: Vec<SwitchCase>,
    },
    Return(Option<Expr>),
    Exit,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchCase {
    // action names; `None` is `default`.
    pub label: Option<String>,
    // `None` falls through to the next case.
    pub body: Option<Block>,
}

// SECTION: expressions

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    Int {
        value: u64,
        width: Option<u32>,
    },
    Bool(bool),
    Path(String),
    Member {
        base: Box<Expr>,
        field: String,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        base: Box<Expr>,
        hi: u32,
        lo: u32,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Mux {
        cond: Box<Expr>,
        tt: Box<Expr>,
        ff: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    List(Vec<Expr>),
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    #[display(fmt = "!")]
    Not,
    #[display(fmt = "-")]
    Neg,
    #[display(fmt = "~")]
    Complement,
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    #[display(fmt = "*")]
    Mul,
    #[display(fmt = "+")]
    Add,
    #[display(fmt = "-")]
    Sub,
    #[display(fmt = "<<")]
    Shl,
    #[display(fmt = ">>")]
    Shr,
    #[display(fmt = "&")]
    BitAnd,
    #[display(fmt = "^")]
    BitXor,
    #[display(fmt = "|")]
    BitOr,
    #[display(fmt = "==")]
    Eq,
    #[display(fmt = "!=")]
    NotEq,
    #[display(fmt = "<")]
    Lt,
    #[display(fmt = "<=")]
    Lte,
    #[display(fmt = ">")]
    Gt,
    #[display(fmt = ">=")]
    Gte,
    #[display(fmt = "&&")]
    And,
    #[display(fmt = "||")]
    Or,
}

// convenience constructors, mostly for tests and for rewrites that build
// small expressions.

pub fn path(name: &str) -> Expr {
    Expr::Path(name.to_string())
}

pub fn member(base: Expr, field: &str) -> Expr {
    Expr::Member {
        base: Box::new(base),
        field: field.to_string(),
    }
}

pub fn index(base: Expr, idx: Expr) -> Expr {
    Expr::Index {
        base: Box::new(base),
        index: Box::new(idx),
    }
}

pub fn int(value: u64) -> Expr {
    Expr::Int { value, width: None }
}

impl Expr {
    pub fn is_call(&self) -> bool {
        matches!(self, Expr::Call { .. })
    }

    // logical negation that avoids stacking `!`.
    pub fn negate(self) -> Expr {
        match self {
            Expr::Unary {
                op: UnOp::Not,
                operand,
            } => *operand,
            Expr::Bool(b) => Expr::Bool(!b),
            e => Expr::Unary {
                op: UnOp::Not,
                operand: Box::new(e),
            },
        }
    }

    // the direct subexpressions, in evaluation order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Int { .. } | Expr::Bool(_) | Expr::Path(_) => vec![],
            Expr::Member { base, .. } | Expr::Slice { base, .. } => vec![base],
            Expr::Index { base, index } => vec![base, index],
            Expr::Unary { operand, .. } => vec![operand],
            Expr::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Expr::Mux { cond, tt, ff } => vec![cond, tt, ff],
            Expr::Call { callee, args } => std::iter::once(&**callee).chain(args).collect(),
            Expr::List(items) => items.iter().collect(),
        }
    }
}

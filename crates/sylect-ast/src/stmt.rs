//! Statement nodes.

use sylect_core::Span;

use crate::decl::{Ident, TypeRef};
use crate::expr::Expr;

/// `{ ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(stmts: impl IntoIterator<Item = Stmt>) -> Self {
        Self {
            stmts: stmts.into_iter().collect(),
            span: Span::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `var a: int = 1, b: long;`
    VarDecl(VarDeclStmt),
    /// `a = expr;` targeting a local or a field of the current class.
    Assign(AssignStmt),
    /// Expression evaluated for its side effects.
    Expr(Expr),
    If(IfStmt),
    Loop(LoopStmt),
    Break(Span),
    Continue(Span),
    Return(ReturnStmt),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclStmt {
    pub vars: Vec<VarDeclarator>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclarator {
    pub name: Ident,
    pub ty: TypeRef,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub target: Ident,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Block,
    pub else_branch: Option<Block>,
    pub span: Span,
}

/// `loop cond { body } each { step }`
///
/// The optional `each` block runs after every iteration, including ones
/// cut short by `continue`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopStmt {
    pub condition: Expr,
    pub body: Block,
    pub each: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

impl Stmt {
    /// Declare one variable.
    pub fn var(name: &str, ty: impl Into<TypeRef>, init: Option<Expr>) -> Self {
        Self::VarDecl(VarDeclStmt {
            vars: vec![VarDeclarator {
                name: Ident::new(name),
                ty: ty.into(),
                init,
                span: Span::default(),
            }],
            span: Span::default(),
        })
    }

    pub fn assign(target: &str, value: Expr) -> Self {
        Self::Assign(AssignStmt {
            target: Ident::new(target),
            value,
            span: Span::default(),
        })
    }

    pub fn expr(expr: Expr) -> Self {
        Self::Expr(expr)
    }

    pub fn if_then(
        condition: Expr,
        then_branch: impl IntoIterator<Item = Stmt>,
        else_branch: Option<Vec<Stmt>>,
    ) -> Self {
        Self::If(IfStmt {
            condition,
            then_branch: Block::new(then_branch),
            else_branch: else_branch.map(Block::new),
            span: Span::default(),
        })
    }

    pub fn loop_while(
        condition: Expr,
        body: impl IntoIterator<Item = Stmt>,
        each: Option<Vec<Stmt>>,
    ) -> Self {
        Self::Loop(LoopStmt {
            condition,
            body: Block::new(body),
            each: each.map(Block::new),
            span: Span::default(),
        })
    }

    pub fn ret(value: Expr) -> Self {
        Self::Return(ReturnStmt {
            value: Some(value),
            span: Span::default(),
        })
    }

    pub fn ret_void() -> Self {
        Self::Return(ReturnStmt {
            value: None,
            span: Span::default(),
        })
    }

    pub fn span(&self) -> Span {
        match self {
            Self::VarDecl(s) => s.span,
            Self::Assign(s) => s.span,
            Self::Expr(e) => e.span,
            Self::If(s) => s.span,
            Self::Loop(s) => s.span,
            Self::Break(span) | Self::Continue(span) => *span,
            Self::Return(s) => s.span,
            Self::Block(b) => b.span,
        }
    }
}

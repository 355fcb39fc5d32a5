//! Syntax tree handed to the compiler by a Sylect/Forward front-end.
//!
//! The compiler never reads source text. A front-end (parser) builds a
//! [`Program`] per compilation unit and passes it on; spans on every node let
//! diagnostics point back at the source.
//!
//! Each node type also has small constructor helpers so trees can be built
//! directly in code, which is how tests and embedders that generate code use
//! this crate.
//!
//! ```text
//! Program
//! └── ClassDef ─┬─ FieldDef*
//!               └─ MethodDef* ── Block ── Stmt*
//!                                           └── Expr ── AndExpr ── MathExpr ── Term
//!                                                                               └── Literal | Chain | (Expr)
//! ```

pub mod decl;
pub mod expr;
pub mod ops;
pub mod stmt;

pub use decl::{
    Annotation, AnnotationParam, AnnotationValue, ClassDef, FieldDef, Ident, MethodDef, Param,
    Program, TypeRef,
};
pub use expr::{AndExpr, CallLink, Chain, ChainLink, Expr, Literal, MathExpr, Operand, Term};
pub use ops::{BinaryOp, UnaryOp};
pub use stmt::{
    AssignStmt, Block, IfStmt, LoopStmt, ReturnStmt, Stmt, VarDeclStmt, VarDeclarator,
};

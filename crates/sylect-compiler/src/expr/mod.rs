//! Expression compiler.
//!
//! [`ExprCompiler`] lowers the three expression tiers onto the operand stack
//! and returns the static type of the value it left there:
//!
//! ```text
//! Expr ──► logical (||, &&) ──► binary (shunting-yard) ──► unary ──► operand
//!                                                                    ├── literals
//!                                                                    ├── chain ─┬─ identifiers
//!                                                                    │          ├─ member
//!                                                                    │          └─ calls
//!                                                                    └── ( Expr )
//! ```
//!
//! Types are synthesized bottom-up only; there is no expected-type
//! direction and no implicit conversion.

mod binary;
pub mod calls;
pub mod chain;
mod identifiers;
pub mod literals;
mod logical;
mod member;
mod unary;

use sylect_ast::{AndExpr, Expr, MathExpr, Operand, Term};
use sylect_core::{CompileError, Result, Span, TypeMeta};

use crate::context::CompilationContext;
use crate::emit::BytecodeEmitter;
use crate::scope::MethodScope;

pub use calls::{CallKind, CallTarget};
pub use chain::ChainOperand;
pub use literals::{LiteralValue, parse_literal};

pub struct ExprCompiler<'a, 'ctx> {
    ctx: &'a CompilationContext<'ctx>,
    scope: &'a MethodScope,
    emitter: &'a mut BytecodeEmitter,
}

impl<'a, 'ctx> ExprCompiler<'a, 'ctx> {
    pub fn new(
        ctx: &'a CompilationContext<'ctx>,
        scope: &'a MethodScope,
        emitter: &'a mut BytecodeEmitter,
    ) -> Self {
        Self {
            ctx,
            scope,
            emitter,
        }
    }

    /// Compile an expression, leaving its value on the stack.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(&mut self, expr: &Expr) -> Result<TypeMeta> {
        logical::compile_or(self, expr)
    }

    /// Compile a condition, which must have the boolean-pseudo type `int`.
    pub fn compile_condition(&mut self, expr: &Expr) -> Result<()> {
        let ty = self.compile(expr)?;
        expect_condition(&ty, expr.span)
    }

    pub(crate) fn compile_and(&mut self, and: &AndExpr) -> Result<TypeMeta> {
        logical::compile_and(self, and)
    }

    pub(crate) fn compile_math(&mut self, math: &MathExpr) -> Result<TypeMeta> {
        binary::compile_math(self, math)
    }

    pub(crate) fn compile_term(&mut self, term: &Term) -> Result<TypeMeta> {
        let ty = match &term.operand {
            Operand::Literal(literal) => literals::compile_literal(self, literal)?,
            Operand::Chain(chain) => chain::compile_chain(self, chain)?,
            Operand::Paren(inner) => self.compile(inner)?,
        };
        unary::apply_prefixes(self, ty, &term.unary, term.span)
    }
}

pub(crate) fn expect_condition(ty: &TypeMeta, span: Span) -> Result<()> {
    if *ty == TypeMeta::integer() {
        Ok(())
    } else {
        Err(CompileError::type_mismatch(
            format!("condition must be int, found {ty}"),
            span,
        ))
    }
}

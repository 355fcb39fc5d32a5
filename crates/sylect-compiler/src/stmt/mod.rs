//! Statement compiler.
//!
//! The [`StmtCompiler`] lowers statements onto the method's code buffer:
//! - variable declarations and assignments to locals or own fields
//! - expression statements, discarding their value
//! - `if`/`else` and `loop ... each` with `break`/`continue`
//! - `return` checked against the method's declared type
//!
//! Blocks do not open a scope of their own; locals are method-wide.

mod assign;
mod block;
mod if_stmt;
mod loop_stmt;
mod return_stmt;
mod var_decl;

use sylect_ast::{Expr, Stmt};
use sylect_core::{CompileError, Result, Span};

use crate::context::CompilationContext;
use crate::emit::{BytecodeEmitter, FrameError};
use crate::expr::ExprCompiler;
use crate::scope::MethodScope;

pub struct StmtCompiler<'a, 'ctx> {
    ctx: &'a CompilationContext<'ctx>,
    scope: &'a mut MethodScope,
    emitter: &'a mut BytecodeEmitter,
}

impl<'a, 'ctx> StmtCompiler<'a, 'ctx> {
    pub fn new(
        ctx: &'a CompilationContext<'ctx>,
        scope: &'a mut MethodScope,
        emitter: &'a mut BytecodeEmitter,
    ) -> Self {
        Self {
            ctx,
            scope,
            emitter,
        }
    }

    /// Compile a statement.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::VarDecl(decl) => self.compile_var_decl(decl),
            Stmt::Assign(assign) => self.compile_assign(assign),
            Stmt::Expr(expr) => self.compile_expr_stmt(expr),
            Stmt::If(if_stmt) => self.compile_if(if_stmt),
            Stmt::Loop(loop_stmt) => self.compile_loop(loop_stmt),
            Stmt::Break(span) => self
                .emitter
                .emit_break()
                .map_err(|err| flow_error(err, "break", *span)),
            Stmt::Continue(span) => self
                .emitter
                .emit_continue()
                .map_err(|err| flow_error(err, "continue", *span)),
            Stmt::Return(ret) => self.compile_return(ret),
            Stmt::Block(block) => self.compile_block(block),
        }
    }

    /// Evaluate for side effects and drop the value, if any.
    fn compile_expr_stmt(&mut self, expr: &Expr) -> Result<()> {
        let ty = self.expr_compiler().compile(expr)?;
        self.emitter.emit_pop(&ty);
        Ok(())
    }

    fn expr_compiler(&mut self) -> ExprCompiler<'_, 'ctx> {
        ExprCompiler::new(self.ctx, self.scope, self.emitter)
    }
}

fn flow_error(err: FrameError, what: &str, span: Span) -> CompileError {
    let message = match err {
        FrameError::NotInLoop => format!("{what} outside of a loop"),
        other => format!("{what}: {other}"),
    };
    CompileError::InvalidControlFlow { message, span }
}

#[cfg(test)]
pub(crate) mod test_support {
    use sylect_ast::Stmt;
    use sylect_classfile::Insn;
    use sylect_core::Result;

    use crate::emit::BytecodeEmitter;
    use crate::expr::test_support::Fixture;
    use crate::scope::MethodScope;

    use super::StmtCompiler;

    /// Compile `stmts` in order and return the emitted instructions.
    pub fn compile_stmts(
        fixture: &Fixture,
        scope: &mut MethodScope,
        stmts: &[Stmt],
    ) -> Result<Vec<Insn>> {
        let ctx = fixture.context();
        let mut emitter = BytecodeEmitter::new();
        let mut compiler = StmtCompiler::new(&ctx, scope, &mut emitter);
        for stmt in stmts {
            compiler.compile(stmt)?;
        }
        Ok(emitter.insns().to_vec())
    }
}

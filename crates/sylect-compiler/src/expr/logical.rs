//! `||` and `&&`.
//!
//! Both short-circuit. With more than one term every term must be `int`:
//!
//! ```text
//! a || b                       a && b
//!     [a] ifne TRUE                [a] ifeq FALSE
//!     [b] ifne TRUE                [b] ifeq FALSE
//!     iconst_0                     iconst_1
//!     goto JOIN                    goto JOIN
//! TRUE: iconst_1               FALSE: iconst_0
//! JOIN:                        JOIN:
//! ```

use sylect_ast::{AndExpr, Expr};
use sylect_classfile::{Label, Opcode};
use sylect_core::{CompileError, Result, Span, TypeMeta};

use super::{ExprCompiler, expect_condition};

pub(super) fn compile_or(compiler: &mut ExprCompiler<'_, '_>, expr: &Expr) -> Result<TypeMeta> {
    match expr.terms.as_slice() {
        [] => Err(empty(expr.span)),
        [single] => compiler.compile_and(single),
        terms => {
            let taken = compiler.emitter.new_label();
            for term in terms {
                let ty = compiler.compile_and(term)?;
                expect_condition(&ty, term.span)?;
                compiler.emitter.emit_jump(Opcode::Ifne, taken);
            }
            join(compiler, taken, false);
            Ok(TypeMeta::integer())
        }
    }
}

pub(super) fn compile_and(compiler: &mut ExprCompiler<'_, '_>, and: &AndExpr) -> Result<TypeMeta> {
    match and.terms.as_slice() {
        [] => Err(empty(and.span)),
        [single] => compiler.compile_math(single),
        terms => {
            let taken = compiler.emitter.new_label();
            for term in terms {
                let ty = compiler.compile_math(term)?;
                expect_condition(&ty, term.span)?;
                compiler.emitter.emit_jump(Opcode::Ifeq, taken);
            }
            join(compiler, taken, true);
            Ok(TypeMeta::integer())
        }
    }
}

/// Push `fall_through` when no term jumped, the opposite at `taken`.
fn join(compiler: &mut ExprCompiler<'_, '_>, taken: Label, fall_through: bool) {
    let emitter = &mut *compiler.emitter;
    let end = emitter.new_label();
    emitter.emit_int(i32::from(fall_through));
    emitter.emit_jump(Opcode::Goto, end);
    emitter.place(taken);
    emitter.emit_int(i32::from(!fall_through));
    emitter.place(end);
}

fn empty(span: Span) -> CompileError {
    CompileError::unsupported("empty expression", span)
}

//! `return` and `return value`.

use sylect_ast::ReturnStmt;
use sylect_core::{CompileError, Result, TypeMeta};

use super::StmtCompiler;

impl<'a, 'ctx> StmtCompiler<'a, 'ctx> {
    pub(super) fn compile_return(&mut self, ret: &ReturnStmt) -> Result<()> {
        let expected = self.scope.return_type().clone();
        let actual = match &ret.value {
            Some(value) => self.expr_compiler().compile(value)?,
            None => TypeMeta::void(),
        };
        if actual != expected {
            return Err(CompileError::type_mismatch(
                format!("method returns {expected}, found {actual}"),
                ret.span,
            ));
        }
        self.emitter.emit_return(&expected);
        Ok(())
    }
}

//! Local variable declarations.
//!
//! Each declarator is handled in turn. The initializer is compiled before the
//! name is declared, so it cannot refer to the variable it initializes.

use sylect_ast::{VarDeclStmt, VarDeclarator};
use sylect_core::{CompileError, Result};

use super::StmtCompiler;

impl<'a, 'ctx> StmtCompiler<'a, 'ctx> {
    pub(super) fn compile_var_decl(&mut self, decl: &VarDeclStmt) -> Result<()> {
        for var in &decl.vars {
            self.compile_declarator(var)?;
        }
        Ok(())
    }

    fn compile_declarator(&mut self, var: &VarDeclarator) -> Result<()> {
        let ty = self.ctx.resolve_type(&var.ty)?;
        if ty.is_void() {
            return Err(CompileError::type_mismatch(
                format!("variable '{}' cannot be void", var.name.name),
                var.span,
            ));
        }

        let Some(init) = &var.init else {
            self.scope.add_local(&var.name.name, ty, var.name.span)?;
            return Ok(());
        };

        let value = self.expr_compiler().compile(init)?;
        if value != ty {
            return Err(CompileError::type_mismatch(
                format!(
                    "cannot initialize '{}' of type {ty} with {value}",
                    var.name.name
                ),
                init.span,
            ));
        }
        let local = self.scope.add_local(&var.name.name, ty, var.name.span)?;
        self.emitter.emit_store(&local.type_meta, local.slot);
        Ok(())
    }
}

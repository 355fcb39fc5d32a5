//! `name = value;` for locals and fields of the current class.

use sylect_ast::AssignStmt;
use sylect_core::{CompileError, Result, TypeMeta};

use super::StmtCompiler;

impl<'a, 'ctx> StmtCompiler<'a, 'ctx> {
    pub(super) fn compile_assign(&mut self, assign: &AssignStmt) -> Result<()> {
        let name = assign.target.name.as_str();

        if let Some(local) = self.scope.get(name).cloned() {
            let value = self.expr_compiler().compile(&assign.value)?;
            check_assignable(name, &local.type_meta, &value, assign)?;
            self.emitter.emit_store(&local.type_meta, local.slot);
            return Ok(());
        }

        let field = self
            .ctx
            .own_field(name, assign.target.span)?
            .ok_or_else(|| CompileError::UnknownSymbol {
                name: name.to_string(),
                span: assign.target.span,
            })?;

        if !field.is_static {
            if self.scope.is_static() {
                return Err(CompileError::invalid_access(
                    format!("instance field '{name}' assigned from a static method"),
                    assign.target.span,
                ));
            }
            self.emitter.emit_this();
        }
        let value = self.expr_compiler().compile(&assign.value)?;
        check_assignable(name, &field.type_meta, &value, assign)?;
        self.emitter.emit_put_field(&self.ctx.class().name, &field);
        Ok(())
    }
}

fn check_assignable(
    name: &str,
    target: &TypeMeta,
    value: &TypeMeta,
    assign: &AssignStmt,
) -> Result<()> {
    if target == value {
        Ok(())
    } else {
        Err(CompileError::type_mismatch(
            format!("cannot assign {value} to '{name}' of type {target}"),
            assign.value.span,
        ))
    }
}

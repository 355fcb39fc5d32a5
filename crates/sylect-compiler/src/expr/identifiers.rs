//! The first name of a chain.
//!
//! Resolution order: local variable, field of the current class (own or
//! inherited), then class name through the imports.

use sylect_ast::Ident;
use sylect_core::{CompileError, Result};

use super::{ChainOperand, ExprCompiler};

pub(super) fn compile_root_name(
    compiler: &mut ExprCompiler<'_, '_>,
    ident: &Ident,
) -> Result<ChainOperand> {
    let name = ident.name.as_str();

    if let Some(local) = compiler.scope.get(name) {
        compiler.emitter.emit_load(&local.type_meta, local.slot);
        return Ok(ChainOperand::Value(local.type_meta.clone()));
    }

    if let Some(field) = compiler.ctx.own_field(name, ident.span)? {
        if !field.is_static {
            if compiler.scope.is_static() {
                return Err(CompileError::invalid_access(
                    format!("instance field '{name}' used from a static method"),
                    ident.span,
                ));
            }
            compiler.emitter.emit_this();
        }
        let owner = compiler.ctx.class().name.as_str();
        compiler.emitter.emit_get_field(owner, &field);
        return Ok(ChainOperand::Value(field.type_meta));
    }

    match compiler.ctx.try_resolve_class(name)? {
        Some(class) => Ok(ChainOperand::ClassRef(class)),
        None => Err(CompileError::UnknownSymbol {
            name: name.to_string(),
            span: ident.span,
        }),
    }
}

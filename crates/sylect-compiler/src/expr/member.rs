//! Field access after the first link of a chain.

use sylect_ast::Ident;
use sylect_classfile::Opcode;
use sylect_core::{CompileError, Result, TypeMeta};

use super::{ChainOperand, ExprCompiler};

pub(super) fn compile_field_access(
    compiler: &mut ExprCompiler<'_, '_>,
    receiver: ChainOperand,
    ident: &Ident,
) -> Result<ChainOperand> {
    let name = ident.name.as_str();
    match receiver {
        ChainOperand::ClassRef(class) => {
            let field = compiler
                .ctx
                .field(&class.name, name, ident.span)?
                .ok_or_else(|| unknown_field(name, &class.name, ident))?;
            if !field.is_static {
                return Err(CompileError::NotStatic {
                    member: name.to_string(),
                    owner: class.name.clone(),
                    span: ident.span,
                });
            }
            compiler.emitter.emit_get_field(&class.name, &field);
            Ok(ChainOperand::Value(field.type_meta))
        }
        ChainOperand::Value(ty) => {
            let owner = object_class(&ty, name, ident)?;
            let class = compiler.ctx.resolve_class(owner, ident.span)?;
            let field = compiler
                .ctx
                .field(&class.name, name, ident.span)?
                .ok_or_else(|| unknown_field(name, &class.name, ident))?;
            if field.is_static {
                // Static field reached through an instance.
                compiler.emitter.emit(Opcode::Pop);
            }
            compiler.emitter.emit_get_field(&class.name, &field);
            Ok(ChainOperand::Value(field.type_meta))
        }
    }
}

/// The class name of a member-access receiver; primitives and arrays have
/// no members.
pub(super) fn object_class<'t>(ty: &'t TypeMeta, member: &str, ident: &Ident) -> Result<&'t str> {
    ty.class_name()
        .filter(|_| ty.is_object())
        .ok_or_else(|| {
            CompileError::invalid_access(format!("cannot access '{member}' on {ty}"), ident.span)
        })
}

fn unknown_field(name: &str, owner: &str, ident: &Ident) -> CompileError {
    CompileError::UnknownField {
        name: name.to_string(),
        owner: owner.to_string(),
        span: ident.span,
    }
}

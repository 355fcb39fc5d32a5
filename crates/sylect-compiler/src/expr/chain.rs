//! Access chains: `a.b.c(x).d`, `Type.member`, `super.m()`, `"s".length()`.
//!
//! A chain is folded left to right. Each link sees what the previous links
//! produced:
//!
//! ```text
//!            ┌──────── Name ────────► identifiers (local, own field, class)
//! Root ──────┼──────── Call ────────► calls (constructor, this(...), own method)
//!            ├──────── Str ─────────► ldc
//!            └──────── super ───────► aload_0, next link must be a call
//!
//! ClassRef ──┬─ Name ─► static field         Value ──┬─ Name ─► field
//!            └─ Call ─► static method                └─ Call ─► method
//! ```
//!
//! A chain that ends on a class reference evaluates to its `Class` object.

use std::sync::Arc;

use sylect_ast::{Chain, ChainLink};
use sylect_core::{ClassMeta, CompileError, Result, Span, TypeMeta, names};

use super::{ExprCompiler, calls, identifiers, literals, member};

/// What a chain prefix denotes.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOperand {
    /// A class named in source; nothing is on the stack yet.
    ClassRef(Arc<ClassMeta>),
    /// A value of this type is on the stack.
    Value(TypeMeta),
}

enum Cursor {
    Root,
    Super(Span),
    Operand(ChainOperand),
}

pub(super) fn compile_chain(
    compiler: &mut ExprCompiler<'_, '_>,
    chain: &Chain,
) -> Result<TypeMeta> {
    let mut cursor = Cursor::Root;

    for link in &chain.links {
        cursor = match (cursor, link) {
            (Cursor::Root, ChainLink::Str(literal)) => {
                Cursor::Operand(ChainOperand::Value(literals::compile_literal(compiler, literal)?))
            }
            (Cursor::Root, ChainLink::Super(span)) => {
                if compiler.scope.is_static() {
                    return Err(CompileError::invalid_access(
                        "super is not available in a static method",
                        *span,
                    ));
                }
                compiler.emitter.emit_this();
                Cursor::Super(*span)
            }
            (Cursor::Root, ChainLink::Name(ident)) => {
                Cursor::Operand(identifiers::compile_root_name(compiler, ident)?)
            }
            (Cursor::Root, ChainLink::Call(call)) => {
                Cursor::Operand(calls::compile_root_call(compiler, call)?)
            }
            (Cursor::Super(_), ChainLink::Call(call)) => {
                Cursor::Operand(calls::compile_super_call(compiler, call)?)
            }
            (Cursor::Super(span), _) => {
                return Err(CompileError::unsupported(
                    "super must be followed by a method call",
                    span,
                ));
            }
            (Cursor::Operand(operand), ChainLink::Name(ident)) => {
                Cursor::Operand(member::compile_field_access(compiler, operand, ident)?)
            }
            (Cursor::Operand(operand), ChainLink::Call(call)) => {
                Cursor::Operand(calls::compile_member_call(compiler, operand, call)?)
            }
            (Cursor::Operand(_), other @ (ChainLink::Str(_) | ChainLink::Super(_))) => {
                return Err(CompileError::unsupported(
                    "string literals and super may only start a chain",
                    other.span(),
                ));
            }
        };
    }

    match cursor {
        Cursor::Root => Err(CompileError::unsupported("empty access chain", chain.span)),
        Cursor::Super(span) => Err(CompileError::unsupported(
            "super must be followed by a method call",
            span,
        )),
        Cursor::Operand(ChainOperand::ClassRef(class)) => {
            compiler.emitter.emit_class(class.name.as_str());
            Ok(TypeMeta::class(names::CLASS))
        }
        Cursor::Operand(ChainOperand::Value(ty)) => Ok(ty),
    }
}

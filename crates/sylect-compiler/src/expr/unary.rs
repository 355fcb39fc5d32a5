//! Prefix operators: negation, logical not and explicit conversion.
//!
//! Prefixes apply in the order they are stored, the first binding tightest.
//!
//! # Conversion table
//!
//! ```text
//! from \ to        numeric     class       black-box
//! numeric          x2y / nop   -           -
//! class            -           checkcast   -
//! int              -           -           bool nop, byte i2b, char i2c, short i2s
//! black-box scalar int nop     -           -
//! object array     -           -           checkcast to object array
//! ```
//!
//! Everything else is `InvalidConversion`.

use sylect_ast::UnaryOp;
use sylect_classfile::Opcode;
use sylect_core::{CompileError, Result, Span, TypeKind, TypeMeta};

use super::{ExprCompiler, expect_condition};

pub(super) fn apply_prefixes(
    compiler: &mut ExprCompiler<'_, '_>,
    mut ty: TypeMeta,
    ops: &[UnaryOp],
    span: Span,
) -> Result<TypeMeta> {
    for op in ops {
        ty = match op {
            UnaryOp::Neg => compile_negate(compiler, ty, span)?,
            UnaryOp::Not => {
                expect_condition(&ty, span)?;
                compiler.emitter.emit_branch_value(Opcode::Ifeq, true);
                TypeMeta::integer()
            }
            UnaryOp::Convert(target) => {
                let target = compiler.ctx.resolve_type(target)?;
                compile_conversion(compiler, &ty, &target, span)?;
                target
            }
        };
    }
    Ok(ty)
}

fn compile_negate(
    compiler: &mut ExprCompiler<'_, '_>,
    ty: TypeMeta,
    span: Span,
) -> Result<TypeMeta> {
    let op = match (ty.is_array(), ty.kind()) {
        (false, TypeKind::Integer) => Opcode::Ineg,
        (false, TypeKind::Long) => Opcode::Lneg,
        (false, TypeKind::Float) => Opcode::Fneg,
        (false, TypeKind::Double) => Opcode::Dneg,
        _ => {
            return Err(CompileError::type_mismatch(
                format!("cannot negate {ty}"),
                span,
            ));
        }
    };
    compiler.emitter.emit(op);
    Ok(ty)
}

/// Emit the conversion of a value of type `from` to `to`.
pub(super) fn compile_conversion(
    compiler: &mut ExprCompiler<'_, '_>,
    from: &TypeMeta,
    to: &TypeMeta,
    span: Span,
) -> Result<()> {
    let invalid = || CompileError::InvalidConversion {
        from: from.to_string(),
        to: to.to_string(),
        span,
    };

    if from.is_black_box() || to.is_black_box() {
        return compile_black_box_conversion(compiler, from, to).ok_or_else(invalid);
    }

    match (from.kind(), to.kind()) {
        (a, b) if a.is_numeric() && b.is_numeric() => {
            if let Some(op) = numeric_conversion(a, b) {
                compiler.emitter.emit(op);
            }
            Ok(())
        }
        (TypeKind::Class, TypeKind::Class) => {
            if let Some(name) = to.class_name() {
                compiler.emitter.emit_checkcast(name);
            }
            Ok(())
        }
        _ => Err(invalid()),
    }
}

/// `None` when the pair is outside the table.
fn compile_black_box_conversion(
    compiler: &mut ExprCompiler<'_, '_>,
    from: &TypeMeta,
    to: &TypeMeta,
) -> Option<()> {
    let object_array = |ty: &TypeMeta| ty.is_array() && ty.kind() == TypeKind::Class;

    if object_array(from) && object_array(to) {
        compiler.emitter.emit_checkcast(to.descriptor());
        return Some(());
    }

    if from.is_black_box() {
        // Scalars already sit on the stack as int.
        return (!from.is_array() && *to == TypeMeta::integer()).then_some(());
    }

    if *from != TypeMeta::integer() || to.is_array() {
        return None;
    }
    match to.kind() {
        TypeKind::Boolean => {}
        TypeKind::Byte => compiler.emitter.emit(Opcode::I2b),
        TypeKind::Char => compiler.emitter.emit(Opcode::I2c),
        TypeKind::Short => compiler.emitter.emit(Opcode::I2s),
        _ => return None,
    }
    Some(())
}

fn numeric_conversion(from: TypeKind, to: TypeKind) -> Option<Opcode> {
    use TypeKind::{Double, Float, Integer, Long};
    Some(match (from, to) {
        (Integer, Long) => Opcode::I2l,
        (Integer, Float) => Opcode::I2f,
        (Integer, Double) => Opcode::I2d,
        (Long, Integer) => Opcode::L2i,
        (Long, Float) => Opcode::L2f,
        (Long, Double) => Opcode::L2d,
        (Float, Integer) => Opcode::F2i,
        (Float, Long) => Opcode::F2l,
        (Float, Double) => Opcode::F2d,
        (Double, Integer) => Opcode::D2i,
        (Double, Long) => Opcode::D2l,
        (Double, Float) => Opcode::D2f,
        _ => return None,
    })
}

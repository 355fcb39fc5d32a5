//! Math-level binary operators.
//!
//! Operands are emitted left to right; operators are held on a stack and
//! emitted when an incoming operator does not bind tighter (shunting-yard),
//! which yields postfix order directly on the operand stack.
//!
//! Operand types never widen. Arithmetic needs two identical numeric types,
//! bitwise two identical `int`/`long`, shifts an `int`/`long` value and an
//! `int` distance. Comparisons produce `int` 0/1.

use sylect_ast::{BinaryOp, MathExpr};
use sylect_classfile::Opcode;
use sylect_core::{CompileError, Result, Span, TypeKind, TypeMeta};

use super::ExprCompiler;

pub(super) fn compile_math(
    compiler: &mut ExprCompiler<'_, '_>,
    math: &MathExpr,
) -> Result<TypeMeta> {
    let mut operands = vec![compiler.compile_term(&math.first)?];
    let mut operators: Vec<(BinaryOp, Span)> = Vec::new();

    for (op, term) in &math.rest {
        while let Some(&(top, span)) = operators.last() {
            if top.precedence() < op.precedence() {
                break;
            }
            operators.pop();
            reduce(compiler, &mut operands, top, span)?;
        }
        operators.push((*op, term.span));
        operands.push(compiler.compile_term(term)?);
    }

    while let Some((op, span)) = operators.pop() {
        reduce(compiler, &mut operands, op, span)?;
    }

    operands
        .pop()
        .ok_or_else(|| CompileError::unsupported("empty expression", math.span))
}

fn reduce(
    compiler: &mut ExprCompiler<'_, '_>,
    operands: &mut Vec<TypeMeta>,
    op: BinaryOp,
    span: Span,
) -> Result<()> {
    let (Some(right), Some(left)) = (operands.pop(), operands.pop()) else {
        return Err(CompileError::unsupported(
            format!("operator '{}' is missing an operand", op.symbol()),
            span,
        ));
    };
    let result = emit_operator(compiler, op, &left, &right, span)?;
    operands.push(result);
    Ok(())
}

/// Numeric kind of a non-array `int`/`long`/`float`/`double`.
fn numeric_kind(ty: &TypeMeta) -> Option<TypeKind> {
    (!ty.is_array() && ty.kind().is_numeric()).then(|| ty.kind())
}

fn mismatch(op: BinaryOp, left: &TypeMeta, right: &TypeMeta, span: Span) -> CompileError {
    CompileError::type_mismatch(
        format!("operator '{}' cannot be applied to {left} and {right}", op.symbol()),
        span,
    )
}

fn emit_operator(
    compiler: &mut ExprCompiler<'_, '_>,
    op: BinaryOp,
    left: &TypeMeta,
    right: &TypeMeta,
    span: Span,
) -> Result<TypeMeta> {
    let err = || mismatch(op, left, right, span);

    if op.is_shift() {
        let kind = numeric_kind(left)
            .filter(|k| matches!(k, TypeKind::Integer | TypeKind::Long))
            .ok_or_else(err)?;
        if *right != TypeMeta::integer() {
            return Err(err());
        }
        compiler.emitter.emit(shift_opcode(op, kind));
        return Ok(left.clone());
    }

    if left != right {
        return Err(err());
    }
    let kind = numeric_kind(left).ok_or_else(err)?;

    if op.is_comparison() {
        emit_comparison(compiler, op, kind);
        return Ok(TypeMeta::integer());
    }

    let opcode = match op {
        BinaryOp::BitAnd | BinaryOp::BitXor | BinaryOp::BitOr => {
            bitwise_opcode(op, kind).ok_or_else(err)?
        }
        _ => arithmetic_opcode(op, kind),
    };
    compiler.emitter.emit(opcode);
    Ok(left.clone())
}

fn arithmetic_opcode(op: BinaryOp, kind: TypeKind) -> Opcode {
    use Opcode::*;
    let row = match op {
        BinaryOp::Add => [Iadd, Ladd, Fadd, Dadd],
        BinaryOp::Sub => [Isub, Lsub, Fsub, Dsub],
        BinaryOp::Mul => [Imul, Lmul, Fmul, Dmul],
        BinaryOp::Div => [Idiv, Ldiv, Fdiv, Ddiv],
        _ => [Irem, Lrem, Frem, Drem],
    };
    row[column(kind)]
}

fn bitwise_opcode(op: BinaryOp, kind: TypeKind) -> Option<Opcode> {
    let long = match kind {
        TypeKind::Integer => false,
        TypeKind::Long => true,
        _ => return None,
    };
    Some(match (op, long) {
        (BinaryOp::BitAnd, false) => Opcode::Iand,
        (BinaryOp::BitAnd, true) => Opcode::Land,
        (BinaryOp::BitXor, false) => Opcode::Ixor,
        (BinaryOp::BitXor, true) => Opcode::Lxor,
        (_, false) => Opcode::Ior,
        (_, true) => Opcode::Lor,
    })
}

fn shift_opcode(op: BinaryOp, kind: TypeKind) -> Opcode {
    let long = kind == TypeKind::Long;
    match (op, long) {
        (BinaryOp::Shl, false) => Opcode::Ishl,
        (BinaryOp::Shl, true) => Opcode::Lshl,
        (BinaryOp::Shr, false) => Opcode::Ishr,
        (BinaryOp::Shr, true) => Opcode::Lshr,
        (_, false) => Opcode::Iushr,
        (_, true) => Opcode::Lushr,
    }
}

fn column(kind: TypeKind) -> usize {
    match kind {
        TypeKind::Integer => 0,
        TypeKind::Long => 1,
        TypeKind::Float => 2,
        _ => 3,
    }
}

/// Emit a comparison of two values of `kind` as an `int` 0/1.
///
/// `int` compares directly with `if_icmp<cond>`. Wider kinds first reduce to
/// -1/0/1: `lcmp`, or for floating point the variant that makes an unordered
/// (NaN) operand fail the test (`*cmpg` for `<`, `<=`, `==`, `!=` and
/// `*cmpl` for `>`, `>=`).
fn emit_comparison(compiler: &mut ExprCompiler<'_, '_>, op: BinaryOp, kind: TypeKind) {
    let emitter = &mut *compiler.emitter;
    let greater = matches!(op, BinaryOp::Gt | BinaryOp::Ge);
    let jump = match kind {
        TypeKind::Integer => match op {
            BinaryOp::Lt => Opcode::IfIcmplt,
            BinaryOp::Gt => Opcode::IfIcmpgt,
            BinaryOp::Le => Opcode::IfIcmple,
            BinaryOp::Ge => Opcode::IfIcmpge,
            BinaryOp::Eq => Opcode::IfIcmpeq,
            _ => Opcode::IfIcmpne,
        },
        _ => {
            let compare = match (kind, greater) {
                (TypeKind::Long, _) => Opcode::Lcmp,
                (TypeKind::Float, false) => Opcode::Fcmpg,
                (TypeKind::Float, true) => Opcode::Fcmpl,
                (_, false) => Opcode::Dcmpg,
                (_, true) => Opcode::Dcmpl,
            };
            emitter.emit(compare);
            match op {
                BinaryOp::Lt => Opcode::Iflt,
                BinaryOp::Gt => Opcode::Ifgt,
                BinaryOp::Le => Opcode::Ifle,
                BinaryOp::Ge => Opcode::Ifge,
                BinaryOp::Eq => Opcode::Ifeq,
                _ => Opcode::Ifne,
            }
        }
    };
    emitter.emit_branch_value(jump, true);
}

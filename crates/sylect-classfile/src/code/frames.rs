//! Verification-type dataflow over an instruction list.
//!
//! Computes the incoming [`Frame`] of every reachable instruction by
//! iterating to a fixed point. The results drive dead code removal,
//! `max_stack`/`max_locals`, and the `StackMapTable`.
//!
//! Merging follows the verifier's type lattice, restricted to what can be
//! decided without loading other classes: two different reference types
//! merge to `java/lang/Object`, any other disagreement becomes `Top` in a
//! local and is rejected on the operand stack.

use std::fmt;

use super::{Insn, VarKind};
use crate::error::{ClassFileError, Result};
use crate::opcode::Opcode;

const OBJECT: &str = "java/lang/Object";

static TOP: VType = VType::Top;

/// A verification type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VType {
    Top,
    Integer,
    Float,
    Long,
    Double,
    Null,
    /// `this` inside a constructor before the super/own initializer call.
    UninitializedThis,
    /// Result of the `new` instruction at this index, not yet initialized.
    Uninitialized(usize),
    /// Internal class name or array descriptor.
    Object(String),
}

impl VType {
    pub fn width(&self) -> u16 {
        match self {
            Self::Long | Self::Double => 2,
            _ => 1,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::UninitializedThis | Self::Uninitialized(_) | Self::Object(_)
        )
    }

    /// Verification type of a field descriptor; `None` for `V`.
    pub fn from_descriptor(descriptor: &str) -> Result<Option<Self>> {
        let bad = || ClassFileError::BadDescriptor {
            descriptor: descriptor.to_string(),
        };
        let ty = match descriptor.as_bytes().first() {
            Some(b'V') if descriptor.len() == 1 => return Ok(None),
            Some(b'I' | b'Z' | b'B' | b'C' | b'S') if descriptor.len() == 1 => Self::Integer,
            Some(b'J') if descriptor.len() == 1 => Self::Long,
            Some(b'F') if descriptor.len() == 1 => Self::Float,
            Some(b'D') if descriptor.len() == 1 => Self::Double,
            Some(b'[') => Self::Object(descriptor.to_string()),
            Some(b'L') if descriptor.len() > 2 && descriptor.ends_with(';') => {
                Self::Object(descriptor[1..descriptor.len() - 1].to_string())
            }
            _ => return Err(bad()),
        };
        Ok(Some(ty))
    }

    fn of_kind(kind: VarKind) -> Option<Self> {
        match kind {
            VarKind::Int => Some(Self::Integer),
            VarKind::Long => Some(Self::Long),
            VarKind::Float => Some(Self::Float),
            VarKind::Double => Some(Self::Double),
            VarKind::Ref => None,
        }
    }

    fn matches_kind(&self, kind: VarKind) -> bool {
        match Self::of_kind(kind) {
            Some(expected) => *self == expected,
            None => self.is_reference(),
        }
    }
}

impl fmt::Display for VType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(name) => f.write_str(name),
            Self::Uninitialized(site) => write!(f, "uninitialized({site})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Split a method descriptor into parameter descriptors and the return
/// descriptor.
pub(crate) fn split_method_descriptor(descriptor: &str) -> Result<(Vec<&str>, &str)> {
    let bad = || ClassFileError::BadDescriptor {
        descriptor: descriptor.to_string(),
    };
    let mut rest = descriptor.strip_prefix('(').ok_or_else(bad)?;
    let mut params = Vec::new();
    loop {
        if let Some(ret) = rest.strip_prefix(')') {
            return Ok((params, ret));
        }
        let dims = rest.bytes().take_while(|b| *b == b'[').count();
        let end = match rest.as_bytes().get(dims) {
            Some(b'L') => rest.find(';').ok_or_else(bad)? + 1,
            Some(_) => dims + 1,
            None => return Err(bad()),
        };
        params.push(&rest[..end]);
        rest = &rest[end..];
    }
}

// ============================================================================
// Frame
// ============================================================================

/// Locals and operand stack at one instruction boundary.
///
/// `locals` is indexed by slot: a `Long`/`Double` at slot `n` is followed by
/// `Top` at `n + 1`. `stack` holds one entry per value regardless of width.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub locals: Vec<VType>,
    pub stack: Vec<VType>,
}

impl Frame {
    pub fn stack_width(&self) -> u16 {
        self.stack.iter().map(VType::width).sum()
    }

    /// Locals in the compressed form used by stack map frames: wide types
    /// appear once, trailing `Top`s are dropped.
    pub fn compact_locals(&self) -> Vec<VType> {
        let mut out = Vec::with_capacity(self.locals.len());
        let mut slot = 0;
        while slot < self.locals.len() {
            let ty = &self.locals[slot];
            out.push(ty.clone());
            slot += ty.width() as usize;
        }
        while out.last() == Some(&VType::Top) {
            out.pop();
        }
        out
    }

    fn push(&mut self, ty: VType) {
        self.stack.push(ty);
    }

    fn pop(&mut self, index: usize) -> Result<VType> {
        self.stack
            .pop()
            .ok_or_else(|| inconsistent(index, "operand stack underflow"))
    }

    fn pop_expect(&mut self, index: usize, expected: &VType) -> Result<()> {
        let found = self.pop(index)?;
        if found == *expected || (expected.is_reference() && found.is_reference()) {
            Ok(())
        } else {
            Err(inconsistent(
                index,
                format!("expected {expected} on the stack, found {found}"),
            ))
        }
    }

    fn pop_kind(&mut self, index: usize, kind: VarKind) -> Result<VType> {
        let found = self.pop(index)?;
        if found.matches_kind(kind) {
            Ok(found)
        } else {
            Err(inconsistent(
                index,
                format!("expected {kind:?} value on the stack, found {found}"),
            ))
        }
    }

    fn pop_category1(&mut self, index: usize) -> Result<VType> {
        let found = self.pop(index)?;
        if found.width() == 1 {
            Ok(found)
        } else {
            Err(inconsistent(index, format!("{found} is a two-word value")))
        }
    }

    fn binary(&mut self, index: usize, ty: VType) -> Result<()> {
        self.pop_expect(index, &ty)?;
        self.pop_expect(index, &ty)?;
        self.push(ty);
        Ok(())
    }

    fn unary(&mut self, index: usize, from: VType, to: VType) -> Result<()> {
        self.pop_expect(index, &from)?;
        self.push(to);
        Ok(())
    }

    fn set_local(&mut self, slot: u16, ty: VType) {
        let slot = slot as usize;
        let width = ty.width() as usize;
        if self.locals.len() < slot + width {
            self.locals.resize(slot + width, VType::Top);
        }
        // Overwriting the upper half of a wide value invalidates it.
        if slot > 0 && self.locals[slot - 1].width() == 2 {
            self.locals[slot - 1] = VType::Top;
        }
        self.locals[slot] = ty;
        if width == 2 {
            self.locals[slot + 1] = VType::Top;
        }
    }

    /// Replace every copy of an uninitialized value once its constructor ran.
    fn initialize(&mut self, uninit: &VType, init: VType) {
        for ty in self.locals.iter_mut().chain(self.stack.iter_mut()) {
            if ty == uninit {
                *ty = init.clone();
            }
        }
    }

    /// Merge `incoming` into `self`. Returns whether `self` changed.
    fn merge(&mut self, incoming: &Frame, index: usize) -> Result<bool> {
        if self.stack.len() != incoming.stack.len() {
            return Err(inconsistent(
                index,
                format!(
                    "stack height {} does not match {}",
                    incoming.stack.len(),
                    self.stack.len()
                ),
            ));
        }
        let mut changed = false;
        for (mine, theirs) in self.stack.iter_mut().zip(&incoming.stack) {
            if mine == theirs {
                continue;
            }
            match merge_references(mine, theirs) {
                Some(merged) => {
                    changed |= *mine != merged;
                    *mine = merged;
                }
                None => {
                    return Err(inconsistent(
                        index,
                        format!("cannot merge {mine} and {theirs} on the stack"),
                    ));
                }
            }
        }

        let len = self.locals.len().max(incoming.locals.len());
        if self.locals.len() < len {
            self.locals.resize(len, VType::Top);
            changed = true;
        }
        for slot in 0..len {
            let theirs = incoming.locals.get(slot).unwrap_or(&TOP);
            let mine = &mut self.locals[slot];
            if mine == theirs {
                continue;
            }
            let merged = merge_references(mine, theirs).unwrap_or(VType::Top);
            changed |= *mine != merged;
            *mine = merged;
        }
        Ok(changed)
    }
}

fn merge_references(a: &VType, b: &VType) -> Option<VType> {
    match (a, b) {
        (VType::Null, VType::Object(_)) => Some(b.clone()),
        (VType::Object(_), VType::Null) => Some(a.clone()),
        (VType::Object(x), VType::Object(y)) if x == y => Some(a.clone()),
        (VType::Object(_), VType::Object(_)) => Some(VType::Object(OBJECT.to_string())),
        _ => None,
    }
}

fn inconsistent(index: usize, message: impl Into<String>) -> ClassFileError {
    ClassFileError::InconsistentFrame {
        index,
        message: message.into(),
    }
}

// ============================================================================
// Analysis
// ============================================================================

/// Fixed-point result for one method body.
#[derive(Debug)]
pub(crate) struct Analysis {
    /// Incoming frame per instruction; `None` when unreachable.
    pub states: Vec<Option<Frame>>,
    pub max_stack: u16,
    pub max_locals: u16,
}

/// Run the dataflow. `labels[n]` is the index of the `Mark` of label `n`.
pub(crate) fn analyze(
    insns: &[Insn],
    labels: &[usize],
    entry: Frame,
    class_name: &str,
    is_constructor: bool,
) -> Result<Analysis> {
    let mut states: Vec<Option<Frame>> = vec![None; insns.len()];
    let mut max_locals = entry.locals.len();
    let mut max_stack = 0u16;
    let mut worklist = Vec::new();

    if insns.is_empty() {
        return Err(inconsistent(0, "method body is empty"));
    }
    states[0] = Some(entry);
    worklist.push(0usize);

    while let Some(index) = worklist.pop() {
        let Some(frame) = states[index].clone() else {
            continue;
        };
        let insn = &insns[index];
        let out = step(insns, index, frame.clone(), class_name, is_constructor)?;
        max_stack = max_stack.max(frame.stack_width()).max(out.stack_width());
        if let Insn::Load(kind, slot) | Insn::Store(kind, slot) = insn {
            max_locals = max_locals.max(*slot as usize + kind.width() as usize);
        }

        let falls_through = match insn {
            Insn::Jump(op, label) => {
                let target = labels[label.0 as usize];
                flow(&mut states, &mut worklist, target, &out)?;
                !op.ends_block()
            }
            Insn::Op(op) => !op.ends_block(),
            _ => true,
        };
        if falls_through {
            if index + 1 >= insns.len() {
                return Err(inconsistent(index, "execution falls off the end of the code"));
            }
            flow(&mut states, &mut worklist, index + 1, &out)?;
        }
    }

    Ok(Analysis {
        states,
        max_stack,
        max_locals: max_locals as u16,
    })
}

fn flow(
    states: &mut [Option<Frame>],
    worklist: &mut Vec<usize>,
    target: usize,
    incoming: &Frame,
) -> Result<()> {
    match &mut states[target] {
        Some(existing) => {
            if existing.merge(incoming, target)? {
                worklist.push(target);
            }
        }
        slot @ None => {
            *slot = Some(incoming.clone());
            worklist.push(target);
        }
    }
    Ok(())
}

/// Apply one instruction to its incoming frame.
fn step(
    insns: &[Insn],
    index: usize,
    mut frame: Frame,
    class_name: &str,
    is_constructor: bool,
) -> Result<Frame> {
    use VType::*;
    match &insns[index] {
        Insn::Mark(_) => {}
        Insn::Int(_) => frame.push(Integer),
        Insn::Long(_) => frame.push(Long),
        Insn::Float(_) => frame.push(Float),
        Insn::Double(_) => frame.push(Double),
        Insn::Str(_) => frame.push(Object("java/lang/String".into())),
        Insn::Class(_) => frame.push(Object("java/lang/Class".into())),
        Insn::Load(kind, slot) => {
            let ty = frame
                .locals
                .get(*slot as usize)
                .cloned()
                .unwrap_or(Top);
            if !ty.matches_kind(*kind) {
                return Err(inconsistent(
                    index,
                    format!("local {slot} holds {ty}, not a {kind:?} value"),
                ));
            }
            frame.push(ty);
        }
        Insn::Store(kind, slot) => {
            let ty = frame.pop_kind(index, *kind)?;
            frame.set_local(*slot, ty);
        }
        Insn::Jump(op, _) => match op {
            Opcode::Goto => {}
            Opcode::IfAcmpeq | Opcode::IfAcmpne => {
                frame.pop_kind(index, VarKind::Ref)?;
                frame.pop_kind(index, VarKind::Ref)?;
            }
            Opcode::Ifnull | Opcode::Ifnonnull => {
                frame.pop_kind(index, VarKind::Ref)?;
            }
            _ => {
                for _ in 0..op.jump_operands() {
                    frame.pop_expect(index, &Integer)?;
                }
            }
        },
        Insn::Field(op, member) => {
            let ty = VType::from_descriptor(&member.descriptor)?.ok_or_else(|| {
                ClassFileError::BadDescriptor {
                    descriptor: member.descriptor.clone(),
                }
            })?;
            match op {
                Opcode::Getstatic => frame.push(ty),
                Opcode::Putstatic => frame.pop_expect(index, &ty)?,
                Opcode::Getfield => {
                    frame.pop_kind(index, VarKind::Ref)?;
                    frame.push(ty);
                }
                Opcode::Putfield => {
                    frame.pop_expect(index, &ty)?;
                    frame.pop_kind(index, VarKind::Ref)?;
                }
                other => {
                    return Err(inconsistent(index, format!("{other:?} is not a field access")));
                }
            }
        }
        Insn::Invoke(op, member) => {
            let (params, ret) = split_method_descriptor(&member.descriptor)?;
            for param in params.iter().rev() {
                if let Some(ty) = VType::from_descriptor(param)? {
                    frame.pop_expect(index, &ty)?;
                }
            }
            if *op != Opcode::Invokestatic {
                let receiver = frame.pop_kind(index, VarKind::Ref)?;
                if member.name == "<init>" {
                    let init = match &receiver {
                        UninitializedThis => Object(class_name.to_string()),
                        Uninitialized(site) => match insns.get(*site) {
                            Some(Insn::Type(Opcode::New, class)) => Object(class.clone()),
                            _ => return Err(inconsistent(index, "dangling allocation site")),
                        },
                        other => {
                            return Err(inconsistent(
                                index,
                                format!("constructor invoked on initialized {other}"),
                            ));
                        }
                    };
                    frame.initialize(&receiver, init);
                }
            }
            if let Some(ty) = VType::from_descriptor(ret)? {
                frame.push(ty);
            }
        }
        Insn::Type(op, class) => match op {
            Opcode::New => frame.push(Uninitialized(index)),
            Opcode::Checkcast => {
                frame.pop_kind(index, VarKind::Ref)?;
                frame.push(Object(class.clone()));
            }
            other => return Err(inconsistent(index, format!("{other:?} takes no class operand"))),
        },
        Insn::Op(op) => step_op(&mut frame, index, *op, is_constructor)?,
    }
    Ok(frame)
}

fn step_op(frame: &mut Frame, index: usize, op: Opcode, is_constructor: bool) -> Result<()> {
    use Opcode::*;
    use VType::{Double as D, Float as F, Integer as I, Long as J};
    match op {
        Nop => {}
        AconstNull => frame.push(VType::Null),
        IconstM1 | Iconst0 | Iconst1 | Iconst2 | Iconst3 | Iconst4 | Iconst5 => frame.push(I),
        Lconst0 | Lconst1 => frame.push(J),
        Fconst0 | Fconst1 | Fconst2 => frame.push(F),
        Dconst0 | Dconst1 => frame.push(D),

        Iadd | Isub | Imul | Idiv | Irem | Iand | Ior | Ixor | Ishl | Ishr | Iushr => {
            frame.binary(index, I)?
        }
        Ladd | Lsub | Lmul | Ldiv | Lrem | Land | Lor | Lxor => frame.binary(index, J)?,
        Lshl | Lshr | Lushr => {
            frame.pop_expect(index, &I)?;
            frame.pop_expect(index, &J)?;
            frame.push(J);
        }
        Fadd | Fsub | Fmul | Fdiv | Frem => frame.binary(index, F)?,
        Dadd | Dsub | Dmul | Ddiv | Drem => frame.binary(index, D)?,
        Ineg => frame.unary(index, I, I)?,
        Lneg => frame.unary(index, J, J)?,
        Fneg => frame.unary(index, F, F)?,
        Dneg => frame.unary(index, D, D)?,

        I2l => frame.unary(index, I, J)?,
        I2f => frame.unary(index, I, F)?,
        I2d => frame.unary(index, I, D)?,
        L2i => frame.unary(index, J, I)?,
        L2f => frame.unary(index, J, F)?,
        L2d => frame.unary(index, J, D)?,
        F2i => frame.unary(index, F, I)?,
        F2l => frame.unary(index, F, J)?,
        F2d => frame.unary(index, F, D)?,
        D2i => frame.unary(index, D, I)?,
        D2l => frame.unary(index, D, J)?,
        D2f => frame.unary(index, D, F)?,
        I2b | I2c | I2s => frame.unary(index, I, I)?,

        Lcmp => {
            frame.binary(index, J)?;
            frame.stack.pop();
            frame.push(I);
        }
        Fcmpl | Fcmpg => {
            frame.binary(index, F)?;
            frame.stack.pop();
            frame.push(I);
        }
        Dcmpl | Dcmpg => {
            frame.binary(index, D)?;
            frame.stack.pop();
            frame.push(I);
        }

        Pop => {
            frame.pop_category1(index)?;
        }
        Pop2 => {
            let top = frame.pop(index)?;
            if top.width() == 1 {
                frame.pop_category1(index)?;
            }
        }
        Dup => {
            let v = frame.pop_category1(index)?;
            frame.push(v.clone());
            frame.push(v);
        }
        DupX1 => {
            let v1 = frame.pop_category1(index)?;
            let v2 = frame.pop_category1(index)?;
            frame.push(v1.clone());
            frame.push(v2);
            frame.push(v1);
        }
        Dup2 => {
            let v1 = frame.pop(index)?;
            if v1.width() == 2 {
                frame.push(v1.clone());
                frame.push(v1);
            } else {
                let v2 = frame.pop_category1(index)?;
                frame.push(v2.clone());
                frame.push(v1.clone());
                frame.push(v2);
                frame.push(v1);
            }
        }
        Dup2X1 => {
            let v1 = frame.pop(index)?;
            if v1.width() == 2 {
                let v2 = frame.pop_category1(index)?;
                frame.push(v1.clone());
                frame.push(v2);
                frame.push(v1);
            } else {
                let v2 = frame.pop_category1(index)?;
                let v3 = frame.pop_category1(index)?;
                frame.push(v2.clone());
                frame.push(v1.clone());
                frame.push(v3);
                frame.push(v2);
                frame.push(v1);
            }
        }
        Swap => {
            let v1 = frame.pop_category1(index)?;
            let v2 = frame.pop_category1(index)?;
            frame.push(v1);
            frame.push(v2);
        }

        Ireturn => frame.pop_expect(index, &I)?,
        Lreturn => frame.pop_expect(index, &J)?,
        Freturn => frame.pop_expect(index, &F)?,
        Dreturn => frame.pop_expect(index, &D)?,
        Areturn => {
            frame.pop_kind(index, VarKind::Ref)?;
        }
        Return => {
            if is_constructor && frame.locals.first() == Some(&VType::UninitializedThis) {
                return Err(inconsistent(index, "constructor returns before initializing this"));
            }
        }
        Athrow => {
            frame.pop_kind(index, VarKind::Ref)?;
        }

        other => {
            return Err(inconsistent(index, format!("{other:?} requires an operand")));
        }
    }
    Ok(())
}

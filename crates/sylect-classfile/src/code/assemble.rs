//! Layout, encoding and `StackMapTable` synthesis.

use super::frames::{self, Frame, VType, split_method_descriptor};
use super::{CodeBuilder, Insn, Label};
use crate::bytes::ByteWriter;
use crate::constant::ConstantPool;
use crate::error::{ClassFileError, Result};
use crate::opcode::Opcode;

const MAX_CODE_LENGTH: usize = 65535;

/// What the assembler needs to know about the method being assembled.
#[derive(Debug, Clone, Copy)]
pub struct MethodShape<'a> {
    pub class_name: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
    pub is_static: bool,
}

impl MethodShape<'_> {
    fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }

    /// The implicit frame at offset 0.
    fn entry_frame(&self) -> Result<Frame> {
        let mut frame = Frame::default();
        if !self.is_static {
            frame.locals.push(if self.is_constructor() {
                VType::UninitializedThis
            } else {
                VType::Object(self.class_name.to_string())
            });
        }
        let (params, _) = split_method_descriptor(self.descriptor)?;
        for param in params {
            let ty = VType::from_descriptor(param)?.ok_or_else(|| ClassFileError::BadDescriptor {
                descriptor: self.descriptor.to_string(),
            })?;
            let wide = ty.width() == 2;
            frame.locals.push(ty);
            if wide {
                frame.locals.push(VType::Top);
            }
        }
        Ok(frame)
    }
}

/// An encoded method body, ready for the `Code` attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledCode {
    pub code: Vec<u8>,
    pub max_stack: u16,
    pub max_locals: u16,
    /// Number of `StackMapTable` entries in `stack_map`.
    pub frame_count: u16,
    /// Encoded entries, without the leading count.
    pub stack_map: Vec<u8>,
    /// Unreachable instructions dropped during assembly.
    pub removed: usize,
}

impl CodeBuilder {
    /// Encode the body. Constants are added to `pool`.
    ///
    /// With `stack_maps` set, a frame is recorded at every live jump target.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn assemble(
        self,
        pool: &mut ConstantPool,
        shape: &MethodShape<'_>,
        stack_maps: bool,
    ) -> Result<AssembledCode> {
        let insns = self.insns;
        let labels = resolve_labels(&insns, self.next_label)?;
        let entry = shape.entry_frame()?;
        let analysis = frames::analyze(
            &insns,
            &labels,
            entry.clone(),
            shape.class_name,
            shape.is_constructor(),
        )?;
        let live = |i: usize| analysis.states[i].is_some();

        // Layout: dead instructions take no space.
        let mut offsets = Vec::with_capacity(insns.len());
        let mut pc = 0usize;
        for (i, insn) in insns.iter().enumerate() {
            offsets.push(pc);
            if live(i) {
                pc += encoded_size(insn, pool)?;
            }
        }
        if pc > MAX_CODE_LENGTH {
            return Err(ClassFileError::CodeTooLarge { size: pc });
        }

        let mut out = ByteWriter::new();
        let mut removed = 0;
        for (i, insn) in insns.iter().enumerate() {
            if live(i) {
                encode(insn, offsets[i], &offsets, &labels, pool, &mut out)?;
            } else if !matches!(insn, Insn::Mark(_)) {
                removed += 1;
            }
        }
        debug_assert_eq!(out.len(), pc);

        let (frame_count, stack_map) = if stack_maps {
            let targets = frame_targets(&insns, &labels, &analysis.states, &offsets);
            encode_stack_map(&entry, &targets, &offsets, pool)?
        } else {
            (0, Vec::new())
        };

        tracing::trace!(
            class = shape.class_name,
            method = shape.name,
            code_length = pc,
            max_stack = analysis.max_stack,
            max_locals = analysis.max_locals,
            frames = frame_count,
            removed,
            "assembled method body"
        );

        Ok(AssembledCode {
            code: out.into_bytes(),
            max_stack: analysis.max_stack,
            max_locals: analysis.max_locals,
            frame_count,
            stack_map,
            removed,
        })
    }
}

/// Map each label to the index of its `Mark`, checking placement.
fn resolve_labels(insns: &[Insn], count: u32) -> Result<Vec<usize>> {
    let mut positions = vec![usize::MAX; count as usize];
    for (i, insn) in insns.iter().enumerate() {
        if let Insn::Mark(Label(id)) = insn {
            let slot = positions
                .get_mut(*id as usize)
                .ok_or(ClassFileError::UnplacedLabel { label: *id })?;
            if *slot != usize::MAX {
                return Err(ClassFileError::DuplicateLabel { label: *id });
            }
            *slot = i;
        }
    }
    for insn in insns {
        if let Insn::Jump(_, Label(id)) = insn {
            if positions.get(*id as usize).is_none_or(|p| *p == usize::MAX) {
                return Err(ClassFileError::UnplacedLabel { label: *id });
            }
        }
    }
    Ok(positions)
}

// ============================================================================
// Encoding
// ============================================================================

fn ldc_size(index: u16) -> usize {
    if index <= 0xFF { 2 } else { 3 }
}

fn local_size(slot: u16) -> usize {
    match slot {
        0..=3 => 1,
        4..=0xFF => 2,
        _ => 4,
    }
}

fn encoded_size(insn: &Insn, pool: &mut ConstantPool) -> Result<usize> {
    Ok(match insn {
        Insn::Op(_) => 1,
        Insn::Int(v) => match *v {
            -1..=5 => 1,
            -128..=127 => 2,
            -32768..=32767 => 3,
            _ => ldc_size(pool.integer(*v)?),
        },
        Insn::Long(v) => match *v {
            0 | 1 => 1,
            _ => {
                pool.long(*v)?;
                3
            }
        },
        Insn::Float(v) => match float_const(*v) {
            Some(_) => 1,
            None => ldc_size(pool.float(*v)?),
        },
        Insn::Double(v) => match double_const(*v) {
            Some(_) => 1,
            None => {
                pool.double(*v)?;
                3
            }
        },
        Insn::Str(s) => ldc_size(pool.string(s)?),
        Insn::Class(c) => ldc_size(pool.class(c)?),
        Insn::Load(_, slot) | Insn::Store(_, slot) => local_size(*slot),
        Insn::Jump(..) | Insn::Field(..) | Insn::Type(..) => 3,
        Insn::Invoke(op, _) => {
            if *op == Opcode::Invokeinterface {
                5
            } else {
                3
            }
        }
        Insn::Mark(_) => 0,
    })
}

/// `fconst_n` for exactly +0.0, 1.0 and 2.0.
fn float_const(v: f32) -> Option<Opcode> {
    match v.to_bits() {
        b if b == 0f32.to_bits() => Some(Opcode::Fconst0),
        b if b == 1f32.to_bits() => Some(Opcode::Fconst1),
        b if b == 2f32.to_bits() => Some(Opcode::Fconst2),
        _ => None,
    }
}

fn double_const(v: f64) -> Option<Opcode> {
    match v.to_bits() {
        b if b == 0f64.to_bits() => Some(Opcode::Dconst0),
        b if b == 1f64.to_bits() => Some(Opcode::Dconst1),
        _ => None,
    }
}

fn emit_ldc(out: &mut ByteWriter, index: u16) {
    if index <= 0xFF {
        out.u1(Opcode::Ldc.into());
        out.u1(index as u8);
    } else {
        out.u1(Opcode::LdcW.into());
        out.u2(index);
    }
}

fn emit_local(out: &mut ByteWriter, op: Opcode, op0: Opcode, slot: u16) {
    match slot {
        0..=3 => out.u1(u8::from(op0) + slot as u8),
        4..=0xFF => {
            out.u1(op.into());
            out.u1(slot as u8);
        }
        _ => {
            out.u1(Opcode::Wide.into());
            out.u1(op.into());
            out.u2(slot);
        }
    }
}

fn encode(
    insn: &Insn,
    pc: usize,
    offsets: &[usize],
    labels: &[usize],
    pool: &mut ConstantPool,
    out: &mut ByteWriter,
) -> Result<()> {
    match insn {
        Insn::Op(op) => out.u1((*op).into()),
        Insn::Int(v) => match *v {
            -1..=5 => out.u1((u8::from(Opcode::Iconst0) as i32 + v) as u8),
            -128..=127 => {
                out.u1(Opcode::Bipush.into());
                out.u1(*v as i8 as u8);
            }
            -32768..=32767 => {
                out.u1(Opcode::Sipush.into());
                out.u2(*v as i16 as u16);
            }
            _ => emit_ldc(out, pool.integer(*v)?),
        },
        Insn::Long(v) => match *v {
            0 => out.u1(Opcode::Lconst0.into()),
            1 => out.u1(Opcode::Lconst1.into()),
            _ => {
                out.u1(Opcode::Ldc2W.into());
                out.u2(pool.long(*v)?);
            }
        },
        Insn::Float(v) => match float_const(*v) {
            Some(op) => out.u1(op.into()),
            None => emit_ldc(out, pool.float(*v)?),
        },
        Insn::Double(v) => match double_const(*v) {
            Some(op) => out.u1(op.into()),
            None => {
                out.u1(Opcode::Ldc2W.into());
                out.u2(pool.double(*v)?);
            }
        },
        Insn::Str(s) => emit_ldc(out, pool.string(s)?),
        Insn::Class(c) => emit_ldc(out, pool.class(c)?),
        Insn::Load(kind, slot) => {
            let (op, op0, _, _) = kind.opcodes();
            emit_local(out, op, op0, *slot);
        }
        Insn::Store(kind, slot) => {
            let (_, _, op, op0) = kind.opcodes();
            emit_local(out, op, op0, *slot);
        }
        Insn::Jump(op, label) => {
            let target = offsets[labels[label.0 as usize]];
            let delta = target as i64 - pc as i64;
            if delta < i16::MIN as i64 || delta > i16::MAX as i64 {
                return Err(ClassFileError::BranchOutOfRange { offset: delta });
            }
            out.u1((*op).into());
            out.u2(delta as i16 as u16);
        }
        Insn::Field(op, member) => {
            let index = pool.field_ref(&member.owner, &member.name, &member.descriptor)?;
            out.u1((*op).into());
            out.u2(index);
        }
        Insn::Invoke(op, member) => {
            let interface = member.interface || *op == Opcode::Invokeinterface;
            let index =
                pool.method_ref(&member.owner, &member.name, &member.descriptor, interface)?;
            out.u1((*op).into());
            out.u2(index);
            if *op == Opcode::Invokeinterface {
                let (params, _) = split_method_descriptor(&member.descriptor)?;
                let mut words = 1usize;
                for param in params {
                    if let Some(ty) = VType::from_descriptor(param)? {
                        words += usize::from(ty.width());
                    }
                }
                let words = u8::try_from(words).map_err(|_| ClassFileError::BadDescriptor {
                    descriptor: member.descriptor.clone(),
                })?;
                out.u1(words);
                out.u1(0);
            }
        }
        Insn::Type(op, class) => {
            let index = pool.class(class)?;
            out.u1((*op).into());
            out.u2(index);
        }
        Insn::Mark(_) => {}
    }
    Ok(())
}

// ============================================================================
// StackMapTable
// ============================================================================

const SAME_LOCALS_1_STACK_ITEM: u8 = 64;
const SAME_LOCALS_1_STACK_ITEM_EXTENDED: u8 = 247;
const SAME_FRAME_EXTENDED: u8 = 251;
const FULL_FRAME: u8 = 255;

/// Frames at every live jump target, sorted by offset.
fn frame_targets(
    insns: &[Insn],
    labels: &[usize],
    states: &[Option<Frame>],
    offsets: &[usize],
) -> Vec<(usize, Frame)> {
    let mut targets: Vec<(usize, Frame)> = Vec::new();
    for (i, insn) in insns.iter().enumerate() {
        let Insn::Jump(_, label) = insn else {
            continue;
        };
        if states[i].is_none() {
            continue;
        }
        // Consecutive marks share an offset; the frame after the last one
        // covers every path into it.
        let mut at = labels[label.0 as usize];
        while matches!(insns.get(at), Some(Insn::Mark(_))) && at + 1 < insns.len() {
            at += 1;
        }
        if let Some(frame) = &states[at] {
            targets.push((offsets[at], frame.clone()));
        }
    }
    targets.sort_by_key(|(offset, _)| *offset);
    targets.dedup_by_key(|(offset, _)| *offset);
    targets
}

fn encode_stack_map(
    entry: &Frame,
    targets: &[(usize, Frame)],
    offsets: &[usize],
    pool: &mut ConstantPool,
) -> Result<(u16, Vec<u8>)> {
    let mut out = ByteWriter::new();
    let mut previous_locals = entry.compact_locals();
    let mut previous_offset: Option<usize> = None;

    for (offset, frame) in targets {
        let delta = match previous_offset {
            None => *offset,
            Some(prev) => offset - prev - 1,
        };
        let delta = delta as u16;
        let locals = frame.compact_locals();
        let same_locals = locals == previous_locals;

        if same_locals && frame.stack.is_empty() {
            if delta < 64 {
                out.u1(delta as u8);
            } else {
                out.u1(SAME_FRAME_EXTENDED);
                out.u2(delta);
            }
        } else if same_locals && frame.stack.len() == 1 {
            if delta < 64 {
                out.u1(SAME_LOCALS_1_STACK_ITEM + delta as u8);
            } else {
                out.u1(SAME_LOCALS_1_STACK_ITEM_EXTENDED);
                out.u2(delta);
            }
            write_vtype(&frame.stack[0], offsets, pool, &mut out)?;
        } else {
            out.u1(FULL_FRAME);
            out.u2(delta);
            out.u2(locals.len() as u16);
            for ty in &locals {
                write_vtype(ty, offsets, pool, &mut out)?;
            }
            out.u2(frame.stack.len() as u16);
            for ty in &frame.stack {
                write_vtype(ty, offsets, pool, &mut out)?;
            }
        }

        previous_locals = locals;
        previous_offset = Some(*offset);
    }
    Ok((targets.len() as u16, out.into_bytes()))
}

fn write_vtype(
    ty: &VType,
    offsets: &[usize],
    pool: &mut ConstantPool,
    out: &mut ByteWriter,
) -> Result<()> {
    match ty {
        VType::Top => out.u1(0),
        VType::Integer => out.u1(1),
        VType::Float => out.u1(2),
        VType::Double => out.u1(3),
        VType::Long => out.u1(4),
        VType::Null => out.u1(5),
        VType::UninitializedThis => out.u1(6),
        VType::Object(name) => {
            let index = pool.class(name)?;
            out.u1(7);
            out.u2(index);
        }
        VType::Uninitialized(site) => {
            out.u1(8);
            out.u2(offsets[*site] as u16);
        }
    }
    Ok(())
}

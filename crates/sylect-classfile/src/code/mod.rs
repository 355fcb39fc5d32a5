//! Method bodies: a semantic instruction list and its assembly.
//!
//! The compiler never deals in byte offsets. It appends [`Insn`]s to a
//! [`CodeBuilder`], places [`Label`]s, and hands the finished list to
//! [`CodeBuilder::assemble`]:
//!
//! ```text
//! Insn list ──► dataflow (frames.rs) ──► dead code removal
//!                                           │
//!               StackMapTable ◄── encode ◄── layout (assemble.rs)
//! ```
//!
//! Constant-load and local-access forms (`iconst_n`, `bipush`, `ldc_w`,
//! `iload_n`, `wide`, ...) are selected during layout, so callers only say
//! *what* to push or load.

mod assemble;
mod frames;

pub use assemble::{AssembledCode, MethodShape};
pub use frames::VType;

use std::fmt;

use crate::opcode::Opcode;

/// A jump target inside one method body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub(crate) u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Value category of a local variable access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    Int,
    Long,
    Float,
    Double,
    Ref,
}

impl VarKind {
    pub fn width(self) -> u16 {
        match self {
            Self::Long | Self::Double => 2,
            _ => 1,
        }
    }

    /// Opcodes for (`xload`, `xload_0`, `xstore`, `xstore_0`).
    fn opcodes(self) -> (Opcode, Opcode, Opcode, Opcode) {
        match self {
            Self::Int => (Opcode::Iload, Opcode::Iload0, Opcode::Istore, Opcode::Istore0),
            Self::Long => (Opcode::Lload, Opcode::Lload0, Opcode::Lstore, Opcode::Lstore0),
            Self::Float => (Opcode::Fload, Opcode::Fload0, Opcode::Fstore, Opcode::Fstore0),
            Self::Double => (Opcode::Dload, Opcode::Dload0, Opcode::Dstore, Opcode::Dstore0),
            Self::Ref => (Opcode::Aload, Opcode::Aload0, Opcode::Astore, Opcode::Astore0),
        }
    }
}

/// Symbolic reference to a field or method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    /// Owner is an interface (`InterfaceMethodref`).
    pub interface: bool,
}

impl MemberRef {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
            interface: false,
        }
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.owner, self.name, self.descriptor)
    }
}

/// One instruction, before encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Insn {
    /// Instruction without operands.
    Op(Opcode),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// `ldc` of a string constant.
    Str(String),
    /// `ldc` of a class constant (internal name or array descriptor).
    Class(String),
    Load(VarKind, u16),
    Store(VarKind, u16),
    Jump(Opcode, Label),
    /// `getstatic`, `putstatic`, `getfield`, `putfield`.
    Field(Opcode, MemberRef),
    /// `invokevirtual`, `invokespecial`, `invokestatic`, `invokeinterface`.
    Invoke(Opcode, MemberRef),
    /// `new` or `checkcast`.
    Type(Opcode, String),
    /// Label placement; encodes to nothing.
    Mark(Label),
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Op(op) => f.write_str(&op.mnemonic()),
            Self::Int(v) => write!(f, "push {v}"),
            Self::Long(v) => write!(f, "push {v}L"),
            Self::Float(v) => write!(f, "push {v}F"),
            Self::Double(v) => write!(f, "push {v}D"),
            Self::Str(s) => write!(f, "ldc {s:?}"),
            Self::Class(c) => write!(f, "ldc class {c}"),
            Self::Load(kind, slot) => write!(f, "load {kind:?} {slot}"),
            Self::Store(kind, slot) => write!(f, "store {kind:?} {slot}"),
            Self::Jump(op, label) => write!(f, "{} {label}", op.mnemonic()),
            Self::Field(op, member) | Self::Invoke(op, member) => {
                write!(f, "{} {member}", op.mnemonic())
            }
            Self::Type(op, class) => write!(f, "{} {class}", op.mnemonic()),
            Self::Mark(label) => write!(f, "{label}:"),
        }
    }
}

/// Accumulates the instructions of one method body.
#[derive(Debug, Default, Clone)]
pub struct CodeBuilder {
    insns: Vec<Insn>,
    next_label: u32,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insns(&self) -> &[Insn] {
        &self.insns
    }

    pub fn len(&self) -> usize {
        self.insns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }

    /// Append a prepared instruction.
    pub fn push(&mut self, insn: Insn) {
        self.insns.push(insn);
    }

    // ==========================================================================
    // Labels
    // ==========================================================================

    /// Reserve a label; it must be placed before assembly.
    pub fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    /// Place a label at the current position.
    pub fn place(&mut self, label: Label) {
        self.insns.push(Insn::Mark(label));
    }

    // ==========================================================================
    // Instructions
    // ==========================================================================

    pub fn op(&mut self, op: Opcode) {
        self.insns.push(Insn::Op(op));
    }

    pub fn push_int(&mut self, value: i32) {
        self.insns.push(Insn::Int(value));
    }

    pub fn push_long(&mut self, value: i64) {
        self.insns.push(Insn::Long(value));
    }

    pub fn push_float(&mut self, value: f32) {
        self.insns.push(Insn::Float(value));
    }

    pub fn push_double(&mut self, value: f64) {
        self.insns.push(Insn::Double(value));
    }

    pub fn push_string(&mut self, value: impl Into<String>) {
        self.insns.push(Insn::Str(value.into()));
    }

    pub fn push_class(&mut self, name: impl Into<String>) {
        self.insns.push(Insn::Class(name.into()));
    }

    pub fn load(&mut self, kind: VarKind, slot: u16) {
        self.insns.push(Insn::Load(kind, slot));
    }

    pub fn store(&mut self, kind: VarKind, slot: u16) {
        self.insns.push(Insn::Store(kind, slot));
    }

    pub fn jump(&mut self, op: Opcode, target: Label) {
        debug_assert!(op.is_jump(), "{op:?} is not a jump");
        self.insns.push(Insn::Jump(op, target));
    }

    pub fn field(&mut self, op: Opcode, member: MemberRef) {
        self.insns.push(Insn::Field(op, member));
    }

    pub fn invoke(&mut self, op: Opcode, member: MemberRef) {
        self.insns.push(Insn::Invoke(op, member));
    }

    pub fn new_object(&mut self, class: impl Into<String>) {
        self.insns.push(Insn::Type(Opcode::New, class.into()));
    }

    pub fn checkcast(&mut self, class: impl Into<String>) {
        self.insns.push(Insn::Type(Opcode::Checkcast, class.into()));
    }
}

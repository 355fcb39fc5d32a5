//! Instruction emission for one method body.
//!
//! [`BytecodeEmitter`] wraps a [`CodeBuilder`] with typed helpers (loads,
//! stores and returns picked from a [`TypeMeta`]) and owns the
//! [`JumpManager`] that structured statements push their label frames on.
//!
//! # Lowering shapes
//!
//! ```text
//! if c { A } else { B }        loop c { A } each { B }
//!
//!     [c]                      start:
//!     ifeq ELSE                    [c]
//!     [A]                          ifeq END
//!     goto END                     [A]
//! ELSE:                        each:            (continue target)
//!     [B]                          [B]
//! END:                             goto start
//!                              END:             (break target)
//! ```
//!
//! # Example
//!
//! ```ignore
//! let mut emitter = BytecodeEmitter::new();
//! emitter.emit_int(2);
//! emitter.emit_int(3);
//! emitter.emit(Opcode::Iadd);
//! emitter.emit_return(&TypeMeta::integer());
//! let code = emitter.finish()?;
//! ```

mod jumps;

pub use jumps::{ConditionalFrame, FrameError, JumpManager, LoopFrame};

use sylect_classfile::{CodeBuilder, Insn, Label, MemberRef, Opcode, VarKind};
use sylect_core::{FieldMeta, TypeKind, TypeMeta, names};

/// Local variable category for values of `ty`; `None` for `void`.
pub fn var_kind(ty: &TypeMeta) -> Option<VarKind> {
    if ty.is_reference() {
        return Some(VarKind::Ref);
    }
    Some(match ty.kind() {
        TypeKind::Void => return None,
        TypeKind::Long => VarKind::Long,
        TypeKind::Float => VarKind::Float,
        TypeKind::Double => VarKind::Double,
        TypeKind::Integer
        | TypeKind::Boolean
        | TypeKind::Byte
        | TypeKind::Char
        | TypeKind::Short => VarKind::Int,
        TypeKind::Class => VarKind::Ref,
    })
}

#[derive(Debug, Default)]
pub struct BytecodeEmitter {
    code: CodeBuilder,
    jumps: JumpManager,
}

impl BytecodeEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn code(&self) -> &CodeBuilder {
        &self.code
    }

    pub fn insns(&self) -> &[Insn] {
        self.code.insns()
    }

    pub fn jumps(&self) -> &JumpManager {
        &self.jumps
    }

    /// Hand over the finished body. Every frame must have been closed.
    pub fn finish(self) -> Result<CodeBuilder, FrameError> {
        if !self.jumps.is_empty() {
            return Err(FrameError::Unclosed {
                open: self.jumps.depth(),
            });
        }
        Ok(self.code)
    }

    // ==========================================================================
    // Basic Emission
    // ==========================================================================

    pub fn emit(&mut self, op: Opcode) {
        self.code.op(op);
    }

    pub fn emit_int(&mut self, value: i32) {
        self.code.push_int(value);
    }

    pub fn emit_long(&mut self, value: i64) {
        self.code.push_long(value);
    }

    pub fn emit_float(&mut self, value: f32) {
        self.code.push_float(value);
    }

    pub fn emit_double(&mut self, value: f64) {
        self.code.push_double(value);
    }

    pub fn emit_string(&mut self, value: impl Into<String>) {
        self.code.push_string(value);
    }

    /// `ldc` of a class constant.
    pub fn emit_class(&mut self, name: impl Into<String>) {
        self.code.push_class(name);
    }

    // ==========================================================================
    // Locals, Stack and Returns
    // ==========================================================================

    /// Load a local of type `ty`. `void` has no locals and emits nothing.
    pub fn emit_load(&mut self, ty: &TypeMeta, slot: u16) {
        if let Some(kind) = var_kind(ty) {
            self.code.load(kind, slot);
        }
    }

    pub fn emit_store(&mut self, ty: &TypeMeta, slot: u16) {
        if let Some(kind) = var_kind(ty) {
            self.code.store(kind, slot);
        }
    }

    /// `aload_0`
    pub fn emit_this(&mut self) {
        self.code.load(VarKind::Ref, 0);
    }

    pub fn emit_dup(&mut self) {
        self.emit(Opcode::Dup);
    }

    /// Discard a value of type `ty`.
    pub fn emit_pop(&mut self, ty: &TypeMeta) {
        match ty.slot_width() {
            0 => {}
            1 => self.emit(Opcode::Pop),
            _ => self.emit(Opcode::Pop2),
        }
    }

    pub fn emit_return(&mut self, ty: &TypeMeta) {
        let op = match var_kind(ty) {
            None => Opcode::Return,
            Some(VarKind::Int) => Opcode::Ireturn,
            Some(VarKind::Long) => Opcode::Lreturn,
            Some(VarKind::Float) => Opcode::Freturn,
            Some(VarKind::Double) => Opcode::Dreturn,
            Some(VarKind::Ref) => Opcode::Areturn,
        };
        self.emit(op);
    }

    /// The trailing guard of a non-void method whose body may fall through.
    pub fn emit_missing_return(&mut self) {
        self.code.new_object(names::RUNTIME_EXCEPTION);
        self.emit_dup();
        self.emit_string(names::MISSING_RETURN_MESSAGE);
        self.code.invoke(
            Opcode::Invokespecial,
            MemberRef::new(names::RUNTIME_EXCEPTION, names::INIT, "(Ljava/lang/String;)V"),
        );
        self.emit(Opcode::Athrow);
    }

    // ==========================================================================
    // Members and Types
    // ==========================================================================

    /// `getstatic` or `getfield`, chosen by the field.
    pub fn emit_get_field(&mut self, owner: &str, field: &FieldMeta) {
        let op = if field.is_static {
            Opcode::Getstatic
        } else {
            Opcode::Getfield
        };
        self.code
            .field(op, MemberRef::new(owner, &field.name, field.descriptor()));
    }

    /// `putstatic` or `putfield`, chosen by the field.
    pub fn emit_put_field(&mut self, owner: &str, field: &FieldMeta) {
        let op = if field.is_static {
            Opcode::Putstatic
        } else {
            Opcode::Putfield
        };
        self.code
            .field(op, MemberRef::new(owner, &field.name, field.descriptor()));
    }

    pub fn emit_invoke(
        &mut self,
        op: Opcode,
        owner: &str,
        name: &str,
        descriptor: &str,
        interface: bool,
    ) {
        let mut member = MemberRef::new(owner, name, descriptor);
        member.interface = interface;
        self.code.invoke(op, member);
    }

    /// `new` of an uninitialized instance.
    pub fn emit_new(&mut self, class: &str) {
        self.code.new_object(class);
    }

    /// `checkcast` to an internal name or array descriptor.
    pub fn emit_checkcast(&mut self, target: impl Into<String>) {
        self.code.checkcast(target);
    }

    // ==========================================================================
    // Labels and Jumps
    // ==========================================================================

    pub fn new_label(&mut self) -> Label {
        self.code.new_label()
    }

    pub fn place(&mut self, label: Label) {
        self.code.place(label);
    }

    pub fn emit_jump(&mut self, op: Opcode, target: Label) {
        self.code.jump(op, target);
    }

    /// Turn a conditional jump into an int 0/1 on the stack:
    ///
    /// ```text
    ///     <op> T
    ///     iconst_<otherwise>
    ///     goto E
    /// T:  iconst_<taken>
    /// E:
    /// ```
    pub fn emit_branch_value(&mut self, op: Opcode, taken: bool) {
        let when_taken = self.new_label();
        let end = self.new_label();
        self.emit_jump(op, when_taken);
        self.emit_int(i32::from(!taken));
        self.emit_jump(Opcode::Goto, end);
        self.place(when_taken);
        self.emit_int(i32::from(taken));
        self.place(end);
    }

    // ==========================================================================
    // Conditionals
    // ==========================================================================

    /// Branch on the condition already on the stack and open the frame.
    pub fn begin_conditional(&mut self, has_else: bool) -> ConditionalFrame {
        let else_label = has_else.then(|| self.new_label());
        let end_label = self.new_label();
        self.emit_jump(Opcode::Ifeq, else_label.unwrap_or(end_label));

        let frame = ConditionalFrame {
            else_label,
            end_label,
        };
        self.jumps.push_conditional(frame);
        frame
    }

    /// Close the then branch and start the else branch.
    pub fn enter_else(&mut self) -> Result<(), FrameError> {
        let frame = self.jumps.current_conditional()?;
        let else_label = frame.else_label.ok_or(FrameError::Mismatched {
            expected: "else branch",
        })?;
        self.emit_jump(Opcode::Goto, frame.end_label);
        self.place(else_label);
        Ok(())
    }

    pub fn end_conditional(&mut self) -> Result<(), FrameError> {
        let frame = self.jumps.pop_conditional()?;
        self.place(frame.end_label);
        Ok(())
    }

    // ==========================================================================
    // Loops
    // ==========================================================================

    /// Place the loop start and open the frame. The condition comes next,
    /// followed by [`BytecodeEmitter::emit_loop_exit`].
    pub fn begin_loop(&mut self, has_each: bool) -> LoopFrame {
        let start = self.new_label();
        let continue_label = if has_each { self.new_label() } else { start };
        let end = self.new_label();
        self.place(start);

        let frame = LoopFrame {
            start,
            continue_label,
            end,
        };
        self.jumps.push_loop(frame);
        frame
    }

    /// Leave the innermost loop when the condition on the stack is zero.
    pub fn emit_loop_exit(&mut self) -> Result<(), FrameError> {
        let frame = self.jumps.innermost_loop()?;
        self.emit_jump(Opcode::Ifeq, frame.end);
        Ok(())
    }

    /// Place the continue target ahead of the each block.
    pub fn enter_each(&mut self) -> Result<(), FrameError> {
        let frame = self.jumps.innermost_loop()?;
        if frame.continue_label != frame.start {
            self.place(frame.continue_label);
        }
        Ok(())
    }

    /// Jump back to the re-test and close the frame.
    pub fn end_loop(&mut self) -> Result<(), FrameError> {
        let frame = self.jumps.pop_loop()?;
        self.emit_jump(Opcode::Goto, frame.start);
        self.place(frame.end);
        Ok(())
    }

    pub fn emit_break(&mut self) -> Result<(), FrameError> {
        let frame = self.jumps.innermost_loop()?;
        self.emit_jump(Opcode::Goto, frame.end);
        Ok(())
    }

    pub fn emit_continue(&mut self) -> Result<(), FrameError> {
        let frame = self.jumps.innermost_loop()?;
        self.emit_jump(Opcode::Goto, frame.continue_label);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_kinds() {
        assert_eq!(var_kind(&TypeMeta::integer()), Some(VarKind::Int));
        assert_eq!(var_kind(&TypeMeta::scalar(TypeKind::Char)), Some(VarKind::Int));
        assert_eq!(var_kind(&TypeMeta::long()), Some(VarKind::Long));
        assert_eq!(var_kind(&TypeMeta::double()), Some(VarKind::Double));
        assert_eq!(var_kind(&TypeMeta::integer().array_of()), Some(VarKind::Ref));
        assert_eq!(var_kind(&TypeMeta::string()), Some(VarKind::Ref));
        assert_eq!(var_kind(&TypeMeta::void()), None);
    }

    #[test]
    fn returns_by_type() {
        let mut emitter = BytecodeEmitter::new();
        emitter.emit_return(&TypeMeta::void());
        emitter.emit_return(&TypeMeta::scalar(TypeKind::Boolean));
        emitter.emit_return(&TypeMeta::float());
        emitter.emit_return(&TypeMeta::long().array_of());
        assert_eq!(
            emitter.insns(),
            &[
                Insn::Op(Opcode::Return),
                Insn::Op(Opcode::Ireturn),
                Insn::Op(Opcode::Freturn),
                Insn::Op(Opcode::Areturn),
            ]
        );
    }

    #[test]
    fn pops_by_width() {
        let mut emitter = BytecodeEmitter::new();
        emitter.emit_pop(&TypeMeta::void());
        emitter.emit_pop(&TypeMeta::integer());
        emitter.emit_pop(&TypeMeta::double());
        assert_eq!(
            emitter.insns(),
            &[Insn::Op(Opcode::Pop), Insn::Op(Opcode::Pop2)]
        );
    }

    #[test]
    fn branch_value_shape() {
        let mut emitter = BytecodeEmitter::new();
        emitter.emit_branch_value(Opcode::Ifeq, true);
        let insns = emitter.insns();
        assert_eq!(insns.len(), 6);
        assert!(matches!(insns[0], Insn::Jump(Opcode::Ifeq, _)));
        assert_eq!(insns[1], Insn::Int(0));
        assert!(matches!(insns[2], Insn::Jump(Opcode::Goto, _)));
        assert!(matches!(insns[3], Insn::Mark(_)));
        assert_eq!(insns[4], Insn::Int(1));
    }

    #[test]
    fn conditional_with_else() {
        let mut emitter = BytecodeEmitter::new();
        emitter.emit_int(1);
        let frame = emitter.begin_conditional(true);
        emitter.emit_int(10);
        emitter.enter_else().unwrap();
        emitter.emit_int(20);
        emitter.end_conditional().unwrap();

        let else_label = frame.else_label.unwrap();
        assert_eq!(
            emitter.insns(),
            &[
                Insn::Int(1),
                Insn::Jump(Opcode::Ifeq, else_label),
                Insn::Int(10),
                Insn::Jump(Opcode::Goto, frame.end_label),
                Insn::Mark(else_label),
                Insn::Int(20),
                Insn::Mark(frame.end_label),
            ]
        );
        assert!(emitter.finish().is_ok());
    }

    #[test]
    fn conditional_without_else_jumps_to_end() {
        let mut emitter = BytecodeEmitter::new();
        let frame = emitter.begin_conditional(false);
        assert_eq!(
            emitter.insns(),
            &[Insn::Jump(Opcode::Ifeq, frame.end_label)]
        );
        assert!(emitter.enter_else().is_err());
        emitter.end_conditional().unwrap();
    }

    #[test]
    fn loop_with_each_block() {
        let mut emitter = BytecodeEmitter::new();
        let frame = emitter.begin_loop(true);
        emitter.emit_int(1);
        emitter.emit_loop_exit().unwrap();
        emitter.emit_continue().unwrap();
        emitter.emit_break().unwrap();
        emitter.enter_each().unwrap();
        emitter.end_loop().unwrap();

        assert_ne!(frame.continue_label, frame.start);
        assert_eq!(
            emitter.insns(),
            &[
                Insn::Mark(frame.start),
                Insn::Int(1),
                Insn::Jump(Opcode::Ifeq, frame.end),
                Insn::Jump(Opcode::Goto, frame.continue_label),
                Insn::Jump(Opcode::Goto, frame.end),
                Insn::Mark(frame.continue_label),
                Insn::Jump(Opcode::Goto, frame.start),
                Insn::Mark(frame.end),
            ]
        );
    }

    #[test]
    fn continue_without_each_targets_start() {
        let mut emitter = BytecodeEmitter::new();
        let frame = emitter.begin_loop(false);
        emitter.emit_continue().unwrap();
        emitter.enter_each().unwrap();
        emitter.end_loop().unwrap();
        assert_eq!(
            emitter.insns(),
            &[
                Insn::Mark(frame.start),
                Insn::Jump(Opcode::Goto, frame.start),
                Insn::Jump(Opcode::Goto, frame.start),
                Insn::Mark(frame.end),
            ]
        );
    }

    #[test]
    fn break_outside_loop() {
        let mut emitter = BytecodeEmitter::new();
        assert_eq!(emitter.emit_break(), Err(FrameError::NotInLoop));
        assert_eq!(emitter.emit_continue(), Err(FrameError::NotInLoop));
    }

    #[test]
    fn finish_rejects_open_frames() {
        let mut emitter = BytecodeEmitter::new();
        emitter.begin_loop(false);
        assert_eq!(emitter.finish().unwrap_err(), FrameError::Unclosed { open: 1 });
    }

    #[test]
    fn missing_return_guard() {
        let mut emitter = BytecodeEmitter::new();
        emitter.emit_missing_return();
        let insns = emitter.insns();
        assert_eq!(
            insns[0],
            Insn::Type(Opcode::New, names::RUNTIME_EXCEPTION.to_string())
        );
        assert_eq!(insns[2], Insn::Str(names::MISSING_RETURN_MESSAGE.to_string()));
        assert_eq!(insns.last(), Some(&Insn::Op(Opcode::Athrow)));
    }
}

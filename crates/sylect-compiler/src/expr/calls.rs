//! Method calls and object construction.
//!
//! Every call goes through the same three steps:
//!
//! 1. pick a [`CallTarget`]: the class to search and what is already on the
//!    stack for it
//! 2. compile the arguments left to right and look the method up by exact
//!    parameter types
//! 3. emit the invoke chosen by [`CallKind`], then drop a receiver a static
//!    method did not consume
//!
//! ```text
//! Type(args)            new Type; dup; invokespecial <init>
//! constructor(args)     aload_0; invokespecial this.<init>     (constructors only)
//! super.constructor()   aload_0; invokespecial base.<init>     (constructors only)
//! super.m(args)         aload_0; invokespecial base.m
//! m(args)               [aload_0]; invoke* this.m
//! Type.m(args)          invokestatic Type.m
//! value.m(args)         invoke* value.m
//! ```

use std::sync::Arc;

use sylect_ast::{CallLink, Expr};
use sylect_classfile::Opcode;
use sylect_core::{ClassMeta, CompileError, MethodMeta, Result, Span, TypeMeta, names};

use super::member::object_class;
use super::{ChainOperand, ExprCompiler};

/// How a resolved method is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Static,
    Virtual,
    Interface,
    Special,
}

impl CallKind {
    /// Select the invoke form for `method` found on `target`.
    pub fn select(target: &CallTarget, method: &MethodMeta) -> Self {
        if method.is_static {
            Self::Static
        } else if target.special {
            Self::Special
        } else if target.class.is_interface {
            Self::Interface
        } else {
            Self::Virtual
        }
    }

    pub fn opcode(self) -> Opcode {
        match self {
            Self::Static => Opcode::Invokestatic,
            Self::Virtual => Opcode::Invokevirtual,
            Self::Interface => Opcode::Invokeinterface,
            Self::Special => Opcode::Invokespecial,
        }
    }
}

/// Where a call is resolved and what is already on the stack for it.
#[derive(Debug, Clone)]
pub struct CallTarget {
    /// Class searched for the method; also the owner of the emitted reference.
    pub class: Arc<ClassMeta>,
    /// `invokespecial` for instance methods (constructors and `super`).
    pub special: bool,
    /// The call constructs `class`; its value is the new instance.
    pub is_new_object: bool,
    /// An object reference for the receiver is on the stack.
    pub receiver_pushed: bool,
    /// Only static methods may be selected (class receiver or static context).
    pub static_only: bool,
}

impl CallTarget {
    fn on(class: Arc<ClassMeta>) -> Self {
        Self {
            class,
            special: false,
            is_new_object: false,
            receiver_pushed: false,
            static_only: false,
        }
    }
}

/// First link of a chain is a call.
pub(super) fn compile_root_call(
    compiler: &mut ExprCompiler<'_, '_>,
    call: &CallLink,
) -> Result<ChainOperand> {
    let name = call.name.name.as_str();

    if name == names::CONSTRUCTOR_KEYWORD {
        require_constructor(compiler, call.span)?;
        compiler.emitter.emit_this();
        let target = CallTarget {
            special: true,
            ..CallTarget::on(compiler.ctx.class().clone())
        };
        return invoke(compiler, target, names::INIT, &call.args, call.span);
    }

    if let Some(class) = compiler.ctx.try_resolve_class(name)? {
        if class.is_interface {
            return Err(CompileError::invalid_access(
                format!("cannot instantiate interface {}", class.name),
                call.span,
            ));
        }
        compiler.emitter.emit_new(&class.name);
        compiler.emitter.emit_dup();
        let target = CallTarget {
            special: true,
            is_new_object: true,
            ..CallTarget::on(class)
        };
        return invoke(compiler, target, names::INIT, &call.args, call.span);
    }

    let in_static = compiler.scope.is_static();
    if !in_static {
        compiler.emitter.emit_this();
    }
    let target = CallTarget {
        receiver_pushed: !in_static,
        static_only: in_static,
        ..CallTarget::on(compiler.ctx.class().clone())
    };
    invoke(compiler, target, name, &call.args, call.span)
}

/// `super.m(...)` or `super.constructor(...)`; `this` is already pushed.
pub(super) fn compile_super_call(
    compiler: &mut ExprCompiler<'_, '_>,
    call: &CallLink,
) -> Result<ChainOperand> {
    let current = compiler.ctx.class();
    let base_name = current.base_class_name.as_deref().ok_or_else(|| {
        CompileError::invalid_access(format!("{} has no superclass", current.name), call.span)
    })?;
    let base = compiler.ctx.resolve_class(base_name, call.span)?;

    let name = call.name.name.as_str();
    let method_name = if name == names::CONSTRUCTOR_KEYWORD {
        require_constructor(compiler, call.span)?;
        names::INIT
    } else {
        name
    };

    let target = CallTarget {
        special: true,
        receiver_pushed: true,
        ..CallTarget::on(base)
    };
    invoke(compiler, target, method_name, &call.args, call.span)
}

/// A call on the result of earlier links.
pub(super) fn compile_member_call(
    compiler: &mut ExprCompiler<'_, '_>,
    receiver: ChainOperand,
    call: &CallLink,
) -> Result<ChainOperand> {
    let name = call.name.name.as_str();
    let target = match receiver {
        ChainOperand::ClassRef(class) => CallTarget {
            static_only: true,
            ..CallTarget::on(class)
        },
        ChainOperand::Value(ty) => {
            let owner = object_class(&ty, name, &call.name)?;
            let class = compiler.ctx.resolve_class(owner, call.span)?;
            CallTarget {
                receiver_pushed: true,
                ..CallTarget::on(class)
            }
        }
    };
    invoke(compiler, target, name, &call.args, call.span)
}

fn require_constructor(compiler: &ExprCompiler<'_, '_>, span: Span) -> Result<()> {
    if compiler.scope.is_constructor() {
        Ok(())
    } else {
        Err(CompileError::invalid_access(
            "constructor calls are only allowed inside a constructor",
            span,
        ))
    }
}

fn invoke(
    compiler: &mut ExprCompiler<'_, '_>,
    target: CallTarget,
    name: &str,
    args: &[Expr],
    span: Span,
) -> Result<ChainOperand> {
    let params = args
        .iter()
        .map(|arg| compiler.compile(arg))
        .collect::<Result<Vec<_>>>()?;

    let method = compiler
        .ctx
        .method(&target.class.name, name, &params, span)?
        .ok_or_else(|| CompileError::UnknownMethod {
            name: name.to_string(),
            params: params
                .iter()
                .map(TypeMeta::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            owner: target.class.name.clone(),
            span,
        })?;

    if target.static_only && !method.is_static {
        return Err(CompileError::NotStatic {
            member: name.to_string(),
            owner: target.class.name.clone(),
            span,
        });
    }

    let kind = CallKind::select(&target, &method);
    let interface = target.class.is_interface && kind != CallKind::Special;
    compiler.emitter.emit_invoke(
        kind.opcode(),
        &target.class.name,
        &method.name,
        &method.descriptor(),
        interface,
    );

    if method.is_static && target.receiver_pushed {
        discard_receiver(compiler, &method.return_type);
    }

    Ok(ChainOperand::Value(if target.is_new_object {
        target.class.as_type()
    } else {
        method.return_type
    }))
}

/// Drop the receiver left under the result of a static call.
fn discard_receiver(compiler: &mut ExprCompiler<'_, '_>, result: &TypeMeta) {
    let emitter = &mut *compiler.emitter;
    match result.slot_width() {
        0 => emitter.emit(Opcode::Pop),
        1 => {
            emitter.emit(Opcode::Swap);
            emitter.emit(Opcode::Pop);
        }
        _ => {
            emitter.emit(Opcode::Dup2X1);
            emitter.emit(Opcode::Pop2);
            emitter.emit(Opcode::Pop);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::test_support::Fixture;
    use sylect_ast::ChainLink;
    use sylect_classfile::{Insn, MemberRef, VarKind};
    use sylect_core::ParameterMeta;

    fn invoke_insn(op: Opcode, owner: &str, name: &str, desc: &str) -> Insn {
        Insn::Invoke(op, MemberRef::new(owner, name, desc))
    }

    #[test]
    fn own_instance_method() {
        let fixture = Fixture::new();
        let scope = fixture.scope(false, &[]);
        let (ty, insns) = fixture
            .compile(&scope, &Expr::call("twice", [Expr::lit("4")]))
            .unwrap();
        assert_eq!(ty, TypeMeta::integer());
        assert_eq!(
            insns,
            [
                Insn::Load(VarKind::Ref, 0),
                Insn::Int(4),
                invoke_insn(Opcode::Invokevirtual, "demo/Main", "twice", "(I)I"),
            ]
        );
    }

    #[test]
    fn own_instance_method_from_static_context() {
        let fixture = Fixture::new();
        let scope = fixture.scope(true, &[]);
        let err = fixture
            .compile(&scope, &Expr::call("twice", [Expr::lit("4")]))
            .unwrap_err();
        assert!(matches!(err, CompileError::NotStatic { .. }));
    }

    #[test]
    fn own_static_method_from_instance_drops_this() {
        let fixture = Fixture::new();
        let scope = fixture.scope(false, &[]);
        let (ty, insns) = fixture.compile(&scope, &Expr::call("seed", [])).unwrap();
        assert_eq!(ty, TypeMeta::long());
        assert_eq!(
            insns,
            [
                Insn::Load(VarKind::Ref, 0),
                invoke_insn(Opcode::Invokestatic, "demo/Main", "seed", "()J"),
                Insn::Op(Opcode::Dup2X1),
                Insn::Op(Opcode::Pop2),
                Insn::Op(Opcode::Pop),
            ]
        );
    }

    #[test]
    fn static_call_through_instance_keeps_result() {
        // "x".valueOf(3): receiver pushed, one-slot result
        let fixture = Fixture::new();
        let scope = fixture.scope(true, &[]);
        let expr = Expr::chain([
            ChainLink::string("x"),
            ChainLink::call("valueOf", [Expr::lit("3")]),
        ]);
        let (ty, insns) = fixture.compile(&scope, &expr).unwrap();
        assert_eq!(ty, TypeMeta::string());
        assert_eq!(
            &insns[2..],
            &[
                invoke_insn(
                    Opcode::Invokestatic,
                    "java/lang/String",
                    "valueOf",
                    "(I)Ljava/lang/String;"
                ),
                Insn::Op(Opcode::Swap),
                Insn::Op(Opcode::Pop),
            ]
        );
    }

    #[test]
    fn static_overload_through_instance_needs_exact_types() {
        // only valueOf(Object) exists for reference arguments
        let fixture = Fixture::new();
        let scope = fixture.scope(true, &[("s", TypeMeta::string())]);
        let expr = Expr::chain([
            ChainLink::name("s"),
            ChainLink::call("valueOf", [Expr::name("s")]),
        ]);
        let err = fixture.compile(&scope, &expr).unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnknownMethod { ref params, ref owner, .. }
                if params == "java/lang/String" && owner == "java/lang/String"
        ));
    }

    #[test]
    fn static_method_on_class() {
        let fixture = Fixture::new();
        let scope = fixture.scope(true, &[]);
        let expr = Expr::chain([
            ChainLink::name("Math"),
            ChainLink::call("max", [Expr::lit("1"), Expr::lit("2")]),
        ]);
        let (ty, insns) = fixture.compile(&scope, &expr).unwrap();
        assert_eq!(ty, TypeMeta::integer());
        assert_eq!(
            insns[2],
            invoke_insn(Opcode::Invokestatic, "java/lang/Math", "max", "(II)I")
        );
    }

    #[test]
    fn instance_method_on_class_is_not_static() {
        let fixture = Fixture::new();
        let scope = fixture.scope(true, &[]);
        let expr = Expr::chain([
            ChainLink::name("Main"),
            ChainLink::call("twice", [Expr::lit("1")]),
        ]);
        let err = fixture.compile(&scope, &expr).unwrap_err();
        assert!(matches!(err, CompileError::NotStatic { .. }));
    }

    #[test]
    fn construction() {
        let fixture = Fixture::new();
        let scope = fixture.scope(true, &[]);
        let (ty, insns) = fixture.compile(&scope, &Expr::call("StringBuilder", [])).unwrap();
        assert_eq!(ty, TypeMeta::class("java/lang/StringBuilder"));
        assert_eq!(
            insns,
            [
                Insn::Type(Opcode::New, "java/lang/StringBuilder".into()),
                Insn::Op(Opcode::Dup),
                invoke_insn(Opcode::Invokespecial, "java/lang/StringBuilder", "<init>", "()V"),
            ]
        );
    }

    #[test]
    fn constructor_overload_must_exist() {
        let fixture = Fixture::new();
        let scope = fixture.scope(true, &[]);
        let err = fixture
            .compile(&scope, &Expr::call("StringBuilder", [Expr::lit("1.5")]))
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnknownMethod { ref name, ref params, .. }
                if name == "<init>" && params == "double"
        ));
    }

    #[test]
    fn interface_receiver_uses_invokeinterface() {
        let fixture = Fixture::new();
        let scope = fixture.scope(true, &[("task", TypeMeta::class("java/lang/Runnable"))]);
        let expr = Expr::chain([ChainLink::name("task"), ChainLink::call("run", [])]);
        let (_, insns) = fixture.compile(&scope, &expr).unwrap();
        let mut expected = MemberRef::new("java/lang/Runnable", "run", "()V");
        expected.interface = true;
        assert_eq!(insns[1], Insn::Invoke(Opcode::Invokeinterface, expected));
    }

    #[test]
    fn interfaces_cannot_be_instantiated() {
        let fixture = Fixture::new();
        let scope = fixture.scope(true, &[]);
        let err = fixture
            .compile(&scope, &Expr::call("java/lang/Runnable", []))
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidAccess { .. }));
    }

    #[test]
    fn inherited_method_on_value() {
        // declared on Object, referenced through the receiver's class
        let fixture = Fixture::new();
        let scope = fixture.scope(true, &[("n", TypeMeta::class("java/lang/Integer"))]);
        let expr = Expr::chain([ChainLink::name("n"), ChainLink::call("hashCode", [])]);
        let (ty, insns) = fixture.compile(&scope, &expr).unwrap();
        assert_eq!(ty, TypeMeta::integer());
        assert_eq!(
            insns[1],
            invoke_insn(Opcode::Invokevirtual, "java/lang/Integer", "hashCode", "()I")
        );
    }

    #[test]
    fn super_method_call() {
        let fixture = Fixture::new();
        let scope = fixture.scope(false, &[]);
        let expr = Expr::chain([
            ChainLink::Super(Span::default()),
            ChainLink::call("toString", []),
        ]);
        let (ty, insns) = fixture.compile(&scope, &expr).unwrap();
        assert_eq!(ty, TypeMeta::string());
        assert_eq!(
            insns,
            [
                Insn::Load(VarKind::Ref, 0),
                invoke_insn(
                    Opcode::Invokespecial,
                    "java/lang/Object",
                    "toString",
                    "()Ljava/lang/String;"
                ),
            ]
        );
    }

    fn constructor_scope(fixture: &Fixture) -> crate::scope::MethodScope {
        fixture.scope_of(
            &MethodMeta::new(
                "<init>",
                false,
                false,
                false,
                TypeMeta::void(),
                vec![ParameterMeta::new("seed", TypeMeta::integer())],
            ),
            &[],
        )
    }

    #[test]
    fn explicit_constructor_calls() {
        let fixture = Fixture::new();
        let scope = constructor_scope(&fixture);

        let (ty, insns) = fixture.compile(&scope, &Expr::call("constructor", [])).unwrap();
        assert_eq!(ty, TypeMeta::void());
        assert_eq!(
            insns,
            [
                Insn::Load(VarKind::Ref, 0),
                invoke_insn(Opcode::Invokespecial, "demo/Main", "<init>", "()V"),
            ]
        );

        let expr = Expr::chain([
            ChainLink::Super(Span::default()),
            ChainLink::call("constructor", []),
        ]);
        let (_, insns) = fixture.compile(&scope, &expr).unwrap();
        assert_eq!(
            insns[1],
            invoke_insn(Opcode::Invokespecial, "java/lang/Object", "<init>", "()V")
        );
    }

    #[test]
    fn constructor_calls_outside_constructors() {
        let fixture = Fixture::new();
        let scope = fixture.scope(false, &[]);
        let err = fixture
            .compile(&scope, &Expr::call("constructor", []))
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidAccess { .. }));
    }

    #[test]
    fn arguments_compile_left_to_right() {
        let fixture = Fixture::new();
        let scope = fixture.scope(true, &[("a", TypeMeta::long()), ("b", TypeMeta::long())]);
        let expr = Expr::chain([
            ChainLink::name("Math"),
            ChainLink::call("min", [Expr::name("a"), Expr::name("b")]),
        ]);
        let (ty, insns) = fixture.compile(&scope, &expr).unwrap();
        assert_eq!(ty, TypeMeta::long());
        assert_eq!(insns[0], Insn::Load(VarKind::Long, 0));
        assert_eq!(insns[1], Insn::Load(VarKind::Long, 2));
    }

    #[test]
    fn call_kinds() {
        let class = Arc::new(ClassMeta::new("demo/Main"));
        let instance = MethodMeta::new("m", false, false, false, TypeMeta::void(), Vec::new());
        let stat = MethodMeta::new("s", true, false, false, TypeMeta::void(), Vec::new());

        let plain = CallTarget::on(class.clone());
        assert_eq!(CallKind::select(&plain, &instance), CallKind::Virtual);
        assert_eq!(CallKind::select(&plain, &stat), CallKind::Static);

        let special = CallTarget {
            special: true,
            ..CallTarget::on(class)
        };
        assert_eq!(CallKind::select(&special, &instance), CallKind::Special);
        assert_eq!(CallKind::select(&special, &stat), CallKind::Static);
        assert_eq!(CallKind::Special.opcode(), Opcode::Invokespecial);
    }
}

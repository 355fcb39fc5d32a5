//! Emitted class files read back as the metadata they were compiled from.

mod common;

use std::path::PathBuf;

use common::{Value, Vm, init_tracing};
use sylect::Compiler;
use sylect::ast::{BinaryOp, ChainLink, ClassDef, Expr, FieldDef, MethodDef, Program, Stmt, Term};
use sylect::classfile::{ClassAccess, FieldAccess, ParsedClass};
use sylect::compiler::CompilerOptions;
use sylect::model::{ClassMeta, CompileError, Dialect, TargetVersion};
use sylect::registry::{ClasspathProvider, DirectoryClassProvider, JdkClasses};

fn members(class: &ClassMeta) -> (Vec<(String, String, bool)>, Vec<(String, String, bool, bool)>) {
    let fields = class
        .fields
        .iter()
        .map(|f| (f.name.clone(), f.descriptor(), f.is_static))
        .collect();
    let methods = class
        .methods
        .iter()
        .map(|m| (m.name.clone(), m.descriptor(), m.is_static, m.is_abstract))
        .collect();
    (fields, methods)
}

fn scratch_dir(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("sylect-{tag}-{}", std::process::id()))
}

fn shape() -> Program {
    Program::new(
        ClassDef::new("demo/Shape")
            .implements("Runnable")
            .field(FieldDef::new("name", "String"))
            .field(FieldDef::new("count", "long").make_static())
            .field(FieldDef::new("raw", "byte[]!"))
            .method(MethodDef::new("area", "double").param("scale", "float"))
            .method(MethodDef::new("run", "void").body([]))
            .method(
                MethodDef::new("describe", "String")
                    .param("depth", "int")
                    .param("total", "long")
                    .make_static()
                    .body([Stmt::ret(Expr::string("shape"))]),
            ),
    )
    .import("java/lang/Runnable")
    .import("java/lang/String")
}

#[test]
fn class_meta_survives_the_class_file() {
    init_tracing();
    let compiler = Compiler::default();
    let compiled = compiler.compile(&shape()).unwrap();
    let registered = compiler.table().resolve_class("demo/Shape").unwrap();

    let parsed = ParsedClass::parse(&compiled.bytes).unwrap();
    let read_back = parsed.to_class_meta();

    assert_eq!(read_back.name, registered.name);
    assert_eq!(read_back.base_class_name, registered.base_class_name);
    assert_eq!(read_back.interfaces, registered.interfaces);
    assert_eq!(members(&read_back), members(&registered));
    assert!(parsed.access.contains(ClassAccess::ABSTRACT));
}

#[test]
fn forward_dialect_writes_java_5_classes() {
    let options = CompilerOptions::default().with_dialect(Dialect::Forward);
    let program = Program::new(
        ClassDef::new("demo/Old")
            .field(FieldDef::new("value", "int"))
            .method(
                MethodDef::new("pick", "int")
                    .param("x", "int")
                    .make_static()
                    .body([Stmt::if_then(
                        Expr::binary(Term::name("x"), BinaryOp::Gt, Term::lit("0")),
                        [Stmt::ret(Expr::name("x"))],
                        Some(vec![Stmt::ret(Expr::lit("0"))]),
                    )]),
            ),
    );
    let compiled = Compiler::new(options).compile(&program).unwrap();
    let parsed = ParsedClass::parse(&compiled.bytes).unwrap();

    assert_eq!(parsed.major, 49);
    assert_eq!(parsed.field("value").unwrap().access, FieldAccess::PUBLIC);
    let code = parsed.method("pick", "(I)I").unwrap().code.as_ref().unwrap();
    assert_eq!(code.stack_map_frames(), 0);
}

#[test]
fn branching_code_carries_stack_maps_from_java_6() {
    let program = || {
        Program::new(ClassDef::new("demo/Branchy").method(
            MethodDef::new("abs", "int")
                .param("x", "int")
                .make_static()
                .body([
                    Stmt::if_then(
                        Expr::binary(Term::name("x"), BinaryOp::Lt, Term::lit("0")),
                        [Stmt::assign(
                            "x",
                            Expr::binary(Term::lit("0"), BinaryOp::Sub, Term::name("x")),
                        )],
                        None,
                    ),
                    Stmt::ret(Expr::name("x")),
                ]),
        ))
    };

    for (release, major) in [(6, 50), (8, 52), (22, 66)] {
        let options = CompilerOptions::default().with_target(TargetVersion::new(release).unwrap());
        let compiled = Compiler::new(options).compile(&program()).unwrap();
        let parsed = ParsedClass::parse(&compiled.bytes).unwrap();
        assert_eq!(parsed.major, major);
        let code = parsed.method("abs", "(I)I").unwrap().code.as_ref().unwrap();
        assert!(code.stack_map_frames() > 0, "target {release}");

        let mut vm = Vm::new(&[compiled]);
        assert_eq!(
            vm.invoke("demo/Branchy", "abs", "(I)I", vec![Value::Int(-9)]),
            Ok(Some(Value::Int(9)))
        );
    }
}

#[test]
fn written_classes_are_visible_to_later_compilers() {
    init_tracing();
    let root = scratch_dir("classpath");

    let base = Program::new(
        ClassDef::new("demo/Base")
            .field(FieldDef::new("side", "int"))
            .method(MethodDef::new("area", "int").body([Stmt::ret(Expr::binary(
                Term::name("side"),
                BinaryOp::Mul,
                Term::name("side"),
            ))]))
            .method(
                MethodDef::new("unit", "int")
                    .make_static()
                    .body([Stmt::ret(Expr::lit("1"))]),
            ),
    );
    let base = Compiler::default().compile(&base).unwrap();
    base.write_to(&root).unwrap();

    let classpath = ClasspathProvider::new()
        .with(JdkClasses)
        .with(DirectoryClassProvider::new(&root));
    let compiler = Compiler::with_provider(classpath, CompilerOptions::default());
    let square = Program::new(
        ClassDef::new("demo/Square")
            .extends("demo/Base")
            .method(MethodDef::constructor().param("s", "int").body([
                Stmt::expr(Expr::chain([
                    ChainLink::Super(Default::default()),
                    ChainLink::call("constructor", []),
                ])),
                Stmt::assign("side", Expr::name("s")),
            ]))
            .method(MethodDef::new("total", "int").body([Stmt::ret(Expr::binary(
                Term::call("area", []),
                BinaryOp::Add,
                Term::call("unit", []),
            ))])),
    );
    let square = compiler.compile(&square).unwrap();
    assert!(compiler.table().introspection_count() >= 1);

    let mut vm = Vm::new(&[base, square]);
    let object = vm.construct("demo/Square", "(I)V", vec![Value::Int(5)]).unwrap();
    assert_eq!(vm.field(&object, "side"), Some(&Value::Int(5)));
    assert_eq!(
        vm.invoke("demo/Square", "total", "()I", vec![object]),
        Ok(Some(Value::Int(26)))
    );

    std::fs::remove_dir_all(&root).unwrap();
}

#[test]
fn a_class_registers_once_per_compiler() {
    let compiler = Compiler::default();
    compiler.compile(&shape()).unwrap();
    assert!(matches!(
        compiler.compile(&shape()),
        Err(CompileError::DuplicateClass { .. })
    ));
}

#[test]
fn a_failed_unit_can_be_compiled_again() {
    let compiler = Compiler::default();
    let unit = |ret: Expr| {
        Program::new(
            ClassDef::new("demo/Retry")
                .method(MethodDef::new("f", "int").make_static().body([Stmt::ret(ret)])),
        )
    };

    assert!(matches!(
        compiler.compile(&unit(Expr::name("missing"))),
        Err(CompileError::UnknownSymbol { .. })
    ));
    let compiled = compiler.compile(&unit(Expr::lit("3"))).unwrap();

    let mut vm = Vm::new(&[compiled]);
    assert_eq!(
        vm.invoke("demo/Retry", "f", "()I", vec![]),
        Ok(Some(Value::Int(3)))
    );
}

#[test]
fn declarations_without_a_valid_class_file_are_refused() {
    let compiler = Compiler::default();
    let refused = [
        ClassDef::new("demo/NoBody").method(MethodDef::constructor()),
        ClassDef::new("demo/NativeInit").method(MethodDef::constructor().make_native()),
        ClassDef::interface("demo/InitFace").method(MethodDef::constructor().body([])),
    ];
    for class in refused {
        let name = class.name.name.clone();
        assert!(
            matches!(
                compiler.compile(&Program::new(class)),
                Err(CompileError::UnsupportedConstruct { .. })
            ),
            "{name}"
        );
    }

    let looped = Program::new(ClassDef::new("demo/Loop").extends("demo/Loop"));
    assert!(matches!(
        compiler.compile(&looped),
        Err(CompileError::MalformedHierarchy { .. })
    ));

    let static_in_interface = || {
        Program::new(ClassDef::interface("demo/SI").method(
            MethodDef::new("k", "int")
                .make_static()
                .body([Stmt::ret(Expr::lit("1"))]),
        ))
    };
    let java_7 = CompilerOptions::default().with_target(TargetVersion::new(7).unwrap());
    assert!(matches!(
        Compiler::new(java_7).compile(&static_in_interface()),
        Err(CompileError::UnsupportedConstruct { .. })
    ));
    let compiled = compiler.compile(&static_in_interface()).unwrap();
    assert!(ParsedClass::parse(&compiled.bytes).unwrap().major >= 52);
}

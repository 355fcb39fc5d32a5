//! Compilation Pass (Pass 2) - emit the class file of a registered unit.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ CompilationPass                                             │
//! │   - Class header, fields and annotations                    │
//! │   - Pairs each declared method with its registered metadata │
//! │   - Dispatches bodies to FunctionCompiler                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │ FunctionCompiler ──► CodeBuilder ──► ClassFile::assemble    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sylect_ast::{Block, MethodDef, Program};
use sylect_classfile::{
    ClassAccess, ClassFile, FieldAccess, FieldInfo, LocalVariable, MethodAccess, MethodInfo,
};
use sylect_core::{ClassMeta, MethodMeta, Result, Span};
use sylect_registry::ClassTable;
use tracing::{debug, instrument};

use crate::annotations::compile_annotations;
use crate::context::CompilationContext;
use crate::function_compiler::FunctionCompiler;
use crate::options::CompilerOptions;

use super::RegistrationOutput;

/// A finished class file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledClass {
    /// Internal name, `a/b/C`.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl CompiledClass {
    /// Write `<root>/<name>.class`, creating package directories.
    pub fn write_to(&self, root: &Path) -> io::Result<PathBuf> {
        let mut path = root.to_path_buf();
        path.extend(self.name.split('/'));
        path.set_extension("class");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Pass 2: compile one registered unit.
pub struct CompilationPass<'a> {
    table: &'a ClassTable,
    options: &'a CompilerOptions,
}

impl<'a> CompilationPass<'a> {
    pub fn new(table: &'a ClassTable, options: &'a CompilerOptions) -> Self {
        Self { table, options }
    }

    #[instrument(skip_all, fields(class = %registered.class.name))]
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(&self, program: &Program, registered: &RegistrationOutput) -> Result<CompiledClass> {
        let class = &registered.class;
        // every unit of a batch is registered by now, so cycles across units show
        self.table.check_hierarchy(&class.name)?;
        let ctx = CompilationContext::new(
            self.table,
            registered.imports.clone(),
            class.clone(),
            self.options,
        );
        let def = &program.class;

        let major = self.options.effective_target().major();
        let mut out = ClassFile::new(major, class_access(class), class.name.clone());
        out.super_name = class.base_class_name.clone();
        out.interfaces = class.interfaces.clone();
        out.annotations = compile_annotations(&ctx, &def.annotations)?;

        let field_visibility = if self.options.dialect.public_fields() {
            FieldAccess::PUBLIC
        } else {
            FieldAccess::PROTECTED
        };
        for (field, field_def) in class.fields.iter().zip(&def.fields) {
            debug!(field = %field.name, "compiling field");
            let mut access = field_visibility;
            access.set(FieldAccess::STATIC, field.is_static);
            out.fields.push(FieldInfo {
                access,
                name: field.name.clone(),
                descriptor: field.descriptor(),
                annotations: compile_annotations(&ctx, &field_def.annotations)?,
            });
        }

        // Declared methods first, in order; anything after them is implicit.
        for (index, method) in class.methods.iter().enumerate() {
            let info = match def.methods.get(index) {
                Some(method_def) => compile_method(&ctx, &mut out, method, Some(method_def))?,
                None => compile_method(&ctx, &mut out, method, None)?,
            };
            out.methods.push(info);
        }

        let bytes = out.to_bytes()?;
        debug!(size = bytes.len(), "class file written");
        Ok(CompiledClass {
            name: class.name.clone(),
            bytes,
        })
    }
}

fn class_access(class: &ClassMeta) -> ClassAccess {
    let mut access = ClassAccess::PUBLIC;
    if class.is_interface {
        access |= ClassAccess::INTERFACE | ClassAccess::ABSTRACT;
    } else {
        access |= ClassAccess::SUPER;
        if class.methods.iter().any(|m| m.is_abstract) {
            access |= ClassAccess::ABSTRACT;
        }
    }
    access
}

fn method_access(method: &MethodMeta) -> MethodAccess {
    let mut access = MethodAccess::PUBLIC;
    access.set(MethodAccess::STATIC, method.is_static);
    access.set(MethodAccess::ABSTRACT, method.is_abstract);
    access.set(MethodAccess::NATIVE, method.is_native);
    access
}

/// `def` is `None` for the implicit constructor, whose body is empty.
fn compile_method(
    ctx: &CompilationContext<'_>,
    out: &mut ClassFile,
    method: &MethodMeta,
    def: Option<&MethodDef>,
) -> Result<MethodInfo> {
    let descriptor = method.descriptor();
    let mut info = MethodInfo::new(method_access(method), method.name.clone(), descriptor.clone());
    let span = def.map_or(Span::default(), |d| d.span);

    if let Some(def) = def {
        info.annotations = compile_annotations(ctx, &def.annotations)?;
        if def.params.iter().any(|p| !p.annotations.is_empty()) {
            info.parameter_annotations = def
                .params
                .iter()
                .map(|p| compile_annotations(ctx, &p.annotations))
                .collect::<Result<_>>()?;
        }
    }

    if !method.has_code() {
        debug!(method = %method.name, "no code");
        return Ok(info);
    }

    let empty = Block::new([]);
    let body = def.and_then(|d| d.body.as_ref()).unwrap_or(&empty);
    let compiled = FunctionCompiler::compile(ctx, method, body, span)?;

    info.locals = compiled
        .locals
        .iter()
        .map(|local| LocalVariable {
            name: local.name.clone(),
            descriptor: local.type_meta.descriptor(),
            slot: local.slot,
        })
        .collect();
    info.code = Some(out.assemble(compiled.code, &method.name, &descriptor, method.is_static)?);
    Ok(info)
}

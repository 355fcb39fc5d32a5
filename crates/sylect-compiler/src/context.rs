//! Per-unit compilation context.
//!
//! A [`CompilationContext`] is what every method body of one class sees: the
//! shared [`ClassTable`], the unit's import aliases, the class being
//! compiled and the options. It is read-only; the mutable per-method state
//! lives in [`crate::scope::MethodScope`] and [`crate::emit::BytecodeEmitter`].

use std::sync::Arc;

use sylect_ast::TypeRef;
use sylect_core::{
    ClassMeta, CompileError, Dialect, FieldMeta, MethodMeta, Result, Span, TypeKind, TypeMeta,
};
use sylect_registry::{ClassTable, ImportManager};

use crate::options::CompilerOptions;

/// Resolve a written type through the unit's imports.
///
/// Keywords map to their kind; anything else is a class name, which is not
/// checked for existence here. Arrays and host-only scalars must carry the
/// black-box marker.
pub fn resolve_type_ref(imports: &ImportManager, ty: &TypeRef) -> Result<TypeMeta> {
    let kind = TypeKind::from_keyword(&ty.name);
    let needs_marker = ty.is_array || kind.is_some_and(TypeKind::is_black_box);
    if needs_marker && !ty.black_box {
        return Err(CompileError::unsupported(
            "arrays, bools, bytes, chars and shorts have only black-box support",
            ty.span,
        ));
    }

    let element = match kind {
        Some(TypeKind::Void) if ty.is_array => {
            return Err(CompileError::type_mismatch("void cannot be an array element", ty.span));
        }
        Some(kind) => TypeMeta::scalar(kind),
        None => TypeMeta::class(imports.resolve(&ty.name)),
    };
    Ok(if ty.is_array { element.array_of() } else { element })
}

pub struct CompilationContext<'a> {
    table: &'a ClassTable,
    imports: ImportManager,
    class: Arc<ClassMeta>,
    options: &'a CompilerOptions,
}

impl<'a> CompilationContext<'a> {
    pub fn new(
        table: &'a ClassTable,
        imports: ImportManager,
        class: Arc<ClassMeta>,
        options: &'a CompilerOptions,
    ) -> Self {
        Self {
            table,
            imports,
            class,
            options,
        }
    }

    pub fn table(&self) -> &'a ClassTable {
        self.table
    }

    pub fn imports(&self) -> &ImportManager {
        &self.imports
    }

    /// The class whose bodies are being compiled.
    pub fn class(&self) -> &Arc<ClassMeta> {
        &self.class
    }

    pub fn options(&self) -> &CompilerOptions {
        self.options
    }

    pub fn dialect(&self) -> Dialect {
        self.options.dialect
    }

    pub fn resolve_type(&self, ty: &TypeRef) -> Result<TypeMeta> {
        resolve_type_ref(&self.imports, ty)
    }

    /// Resolve a (possibly aliased) class name, failing with `UnknownClass`
    /// at `span`.
    pub fn resolve_class(&self, name: &str, span: Span) -> Result<Arc<ClassMeta>> {
        self.table
            .resolve_class(self.imports.resolve(name))
            .map_err(|err| err.at(span))
    }

    /// Like [`CompilationContext::resolve_class`], but a missing class is
    /// `Ok(None)`. Other failures still propagate.
    pub fn try_resolve_class(&self, name: &str) -> Result<Option<Arc<ClassMeta>>> {
        match self.table.resolve_class(self.imports.resolve(name)) {
            Ok(meta) => Ok(Some(meta)),
            Err(CompileError::UnknownClass { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Field lookup through the hierarchy of `class`.
    pub fn field(&self, class: &str, name: &str, span: Span) -> Result<Option<FieldMeta>> {
        self.table.get_field(class, name).map_err(|err| err.at(span))
    }

    /// Exact-signature method lookup through the hierarchy of `class`.
    pub fn method(
        &self,
        class: &str,
        name: &str,
        params: &[TypeMeta],
        span: Span,
    ) -> Result<Option<MethodMeta>> {
        self.table
            .get_method(class, name, params)
            .map_err(|err| err.at(span))
    }

    /// Field of the current class or one of its ancestors.
    pub fn own_field(&self, name: &str, span: Span) -> Result<Option<FieldMeta>> {
        self.field(&self.class.name, name, span)
    }
}

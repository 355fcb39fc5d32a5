//! Registration Pass (Pass 1) - turn class declarations into metadata.
//!
//! Every unit of a batch registers its [`ClassMeta`] before any body is
//! compiled, so units may refer to each other in any order.
//!
//! ## Responsibilities
//!
//! - Resolve the imports, superclass, interfaces and every member type
//! - Normalize `constructor` to `<init>` and add the implicit no-argument
//!   constructor to classes that declare none
//! - Enforce the declaration rules (interfaces, natives, duplicates, dialect)
//! - Publish the class in the shared [`ClassTable`]

use std::sync::Arc;

use rustc_hash::FxHashSet;
use sylect_ast::{ClassDef, FieldDef, MethodDef, Program};
use sylect_core::{
    ClassMeta, CompileError, FieldMeta, MethodMeta, ParameterMeta, Result, TypeMeta, names,
};
use sylect_registry::{ClassTable, ImportManager};
use tracing::{debug, instrument};

use crate::context::resolve_type_ref;
use crate::options::CompilerOptions;

/// Output of the registration pass for one unit.
#[derive(Debug)]
pub struct RegistrationOutput {
    /// The published class.
    pub class: Arc<ClassMeta>,
    /// Import aliases of the unit, reused by pass 2.
    pub imports: ImportManager,
}

/// Pass 1: register one unit's class.
pub struct RegistrationPass<'a> {
    table: &'a ClassTable,
    options: &'a CompilerOptions,
}

impl<'a> RegistrationPass<'a> {
    pub fn new(table: &'a ClassTable, options: &'a CompilerOptions) -> Self {
        Self { table, options }
    }

    #[instrument(skip_all, fields(class = %program.class.name.name))]
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(&self, program: &Program) -> Result<RegistrationOutput> {
        let def = &program.class;
        let imports = ImportManager::new(
            &def.name.name,
            program
                .imports
                .iter()
                .map(|import| (import.name.as_str(), import.span)),
        )?;

        self.check_dialect(def)?;
        let meta = build_class(&imports, def)?;
        meta.check_source_rules(def.base.is_some(), def.span)?;
        self.check_target(&meta, def)?;

        let class = self.table.register_source(meta)?;
        debug!(
            fields = class.fields.len(),
            methods = class.methods.len(),
            "registered class"
        );
        Ok(RegistrationOutput { class, imports })
    }

    fn check_dialect(&self, def: &ClassDef) -> Result<()> {
        let dialect = self.options.dialect;
        if def.is_interface && !dialect.supports_interfaces() {
            return Err(CompileError::unsupported(
                format!("interfaces are not supported in the {dialect} dialect"),
                def.span,
            ));
        }
        if !dialect.supports_annotations() {
            let annotated = def.annotations.first().map(|a| a.span).or_else(|| {
                def.fields
                    .iter()
                    .flat_map(|f| f.annotations.first())
                    .chain(def.methods.iter().flat_map(|m| {
                        m.annotations
                            .first()
                            .or_else(|| m.params.iter().find_map(|p| p.annotations.first()))
                    }))
                    .map(|a| a.span)
                    .next()
            });
            if let Some(span) = annotated {
                return Err(CompileError::unsupported(
                    format!("annotations are not supported in the {dialect} dialect"),
                    span,
                ));
            }
        }
        Ok(())
    }

    fn check_target(&self, class: &ClassMeta, def: &ClassDef) -> Result<()> {
        let target = self.options.effective_target();
        if !class.is_interface || target.allows_static_interface_methods() {
            return Ok(());
        }
        let static_method = class
            .methods
            .iter()
            .zip(&def.methods)
            .find(|(method, _)| method.is_static);
        if let Some((method, method_def)) = static_method {
            return Err(CompileError::unsupported(
                format!(
                    "static interface method '{}' needs target 8 or later, not {target}",
                    method.name
                ),
                method_def.span,
            ));
        }
        Ok(())
    }
}

/// Largest parameter list a method descriptor may describe, in slots,
/// including the receiver.
const MAX_PARAMETER_SLOTS: usize = 255;

/// Build the metadata of a declared class. Member order follows the
/// declaration; the implicit constructor, if any, comes last.
pub fn build_class(imports: &ImportManager, def: &ClassDef) -> Result<ClassMeta> {
    let mut meta = ClassMeta::new(def.name.name.clone());
    meta.is_interface = def.is_interface;
    meta.base_class_name = Some(match &def.base {
        Some(base) => imports.resolve(&base.name).to_string(),
        None => names::OBJECT.to_string(),
    });
    meta.interfaces = def
        .interfaces
        .iter()
        .map(|iface| imports.resolve(&iface.name).to_string())
        .collect();

    for field in &def.fields {
        if meta.field(&field.name.name).is_some() {
            return Err(CompileError::unsupported(
                format!("duplicate field '{}'", field.name.name),
                field.span,
            ));
        }
        meta.fields.push(build_field(imports, field)?);
    }

    let mut signatures = FxHashSet::default();
    for method in &def.methods {
        let method_meta = build_method(imports, method)?;
        let params: Vec<TypeMeta> = method_meta.parameter_types().cloned().collect();
        if !signatures.insert((method_meta.name.clone(), params)) {
            return Err(CompileError::unsupported(
                format!("duplicate method {method_meta}"),
                method.span,
            ));
        }
        meta.methods.push(method_meta);
    }

    if !meta.is_interface && !meta.methods.iter().any(MethodMeta::is_constructor) {
        meta.methods.push(MethodMeta::new(
            names::INIT,
            false,
            false,
            false,
            TypeMeta::void(),
            Vec::new(),
        ));
    }
    Ok(meta)
}

fn build_field(imports: &ImportManager, field: &FieldDef) -> Result<FieldMeta> {
    let ty = resolve_type_ref(imports, &field.ty)?;
    if ty.is_void() {
        return Err(CompileError::type_mismatch(
            format!("field '{}' cannot be void", field.name.name),
            field.span,
        ));
    }
    Ok(FieldMeta::new(field.name.name.clone(), field.is_static, ty))
}

fn build_method(imports: &ImportManager, method: &MethodDef) -> Result<MethodMeta> {
    if method.is_native && method.body.is_some() {
        return Err(CompileError::unsupported(
            format!("native method '{}' cannot have a body", method.name.name),
            method.span,
        ));
    }

    let return_type = resolve_type_ref(imports, &method.return_type)?;
    let mut params = Vec::with_capacity(method.params.len());
    for param in &method.params {
        let ty = resolve_type_ref(imports, &param.ty)?;
        if ty.is_void() {
            return Err(CompileError::type_mismatch(
                format!("parameter '{}' cannot be void", param.name.name),
                param.span,
            ));
        }
        params.push(ParameterMeta::new(param.name.name.clone(), ty));
    }
    let slots = params
        .iter()
        .map(|p| usize::from(p.type_meta.slot_width()))
        .sum::<usize>()
        + usize::from(!method.is_static);
    if slots > MAX_PARAMETER_SLOTS {
        return Err(CompileError::unsupported(
            format!(
                "method '{}' takes {slots} parameter slots, more than {MAX_PARAMETER_SLOTS}",
                method.name.name
            ),
            method.span,
        ));
    }

    MethodMeta::declare(
        &method.name.name,
        method.is_static,
        method.is_native,
        method.body.is_some(),
        return_type,
        params,
        method.span,
    )
}

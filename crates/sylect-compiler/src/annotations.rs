//! Runtime-visible annotations on classes, fields, methods and parameters.
//!
//! Element types come from the annotation interface: the parameter `name`
//! has the return type of the interface method `name()`. Values are checked
//! against that type exactly, without conversion.
//!
//! ```text
//! @SuppressWarnings(value = "unused", "rawtypes")
//!         │                  │
//!         │                  └─ String[] element: any number of values
//!         └─ resolved through the imports, must be a known class
//! ```

use sylect_ast::{Annotation, AnnotationParam, AnnotationValue};
use sylect_classfile::{Annotation as ClassAnnotation, ElementValue};
use sylect_core::{CompileError, Result, Span, TypeMeta, names};

use crate::context::CompilationContext;
use crate::expr::{LiteralValue, parse_literal};

/// Compile a list of annotations. Any annotation at all is rejected in
/// dialects without annotation support.
pub fn compile_annotations(
    ctx: &CompilationContext<'_>,
    annotations: &[Annotation],
) -> Result<Vec<ClassAnnotation>> {
    if let Some(first) = annotations.first() {
        if !ctx.dialect().supports_annotations() {
            return Err(CompileError::unsupported(
                format!("annotations are not supported in the {} dialect", ctx.dialect()),
                first.span,
            ));
        }
    }
    annotations
        .iter()
        .map(|annotation| compile_annotation(ctx, annotation))
        .collect()
}

fn compile_annotation(
    ctx: &CompilationContext<'_>,
    annotation: &Annotation,
) -> Result<ClassAnnotation> {
    let class = ctx.resolve_class(&annotation.ty.name, annotation.ty.span)?;
    let mut out = ClassAnnotation::new(class.as_type().descriptor());

    for param in &annotation.params {
        let expected = class
            .method_named(&param.name.name)
            .map(|method| method.return_type.clone())
            .ok_or_else(|| CompileError::UnknownSymbol {
                name: format!("{}.{}", class.name, param.name.name),
                span: param.name.span,
            })?;
        let value = compile_param(ctx, param, &expected)?;
        out = out.element(param.name.name.clone(), value);
    }
    Ok(out)
}

fn compile_param(
    ctx: &CompilationContext<'_>,
    param: &AnnotationParam,
    expected: &TypeMeta,
) -> Result<ElementValue> {
    if expected.is_array() {
        let element = expected.element_type();
        let values = param
            .values
            .iter()
            .map(|value| compile_value(ctx, value, &element))
            .collect::<Result<Vec<_>>>()?;
        return Ok(ElementValue::Array(values));
    }

    match param.values.as_slice() {
        [value] => compile_value(ctx, value, expected),
        values => Err(CompileError::type_mismatch(
            format!(
                "'{}' takes exactly one value of type {expected}, found {}",
                param.name.name,
                values.len()
            ),
            param.span,
        )),
    }
}

fn compile_value(
    ctx: &CompilationContext<'_>,
    value: &AnnotationValue,
    expected: &TypeMeta,
) -> Result<ElementValue> {
    match value {
        AnnotationValue::Literal(literal) => {
            let parsed = parse_literal(literal)?;
            let found = parsed.type_meta();
            check(&found, expected, literal.span)?;
            Ok(match parsed {
                LiteralValue::Int(v) => ElementValue::Int(v),
                LiteralValue::Long(v) => ElementValue::Long(v),
                LiteralValue::Float(v) => ElementValue::Float(v),
                LiteralValue::Double(v) => ElementValue::Double(v),
                LiteralValue::Str(s) => ElementValue::String(s),
            })
        }
        AnnotationValue::Class(ident) => {
            check(&TypeMeta::class(names::CLASS), expected, ident.span)?;
            let class = ctx.resolve_class(&ident.name, ident.span)?;
            Ok(ElementValue::Class(class.as_type().descriptor()))
        }
        AnnotationValue::Annotation(nested) => {
            let compiled = compile_annotation(ctx, nested)?;
            let found = TypeMeta::from_descriptor(&compiled.type_descriptor);
            if found.as_ref() != Some(expected) {
                return Err(CompileError::type_mismatch(
                    format!("expected {expected}, found annotation {}", nested.ty.name),
                    nested.span,
                ));
            }
            Ok(ElementValue::Annotation(compiled))
        }
    }
}

fn check(found: &TypeMeta, expected: &TypeMeta, span: Span) -> Result<()> {
    if found == expected {
        Ok(())
    } else {
        Err(CompileError::type_mismatch(
            format!("expected {expected}, found {found}"),
            span,
        ))
    }
}

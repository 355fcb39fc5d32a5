//! Literal parsing and constant pushes.
//!
//! | Form            | Type     |
//! |-----------------|----------|
//! | `"text"`        | `String` |
//! | `1.5F`, `2F`    | `float`  |
//! | `7L`            | `long`   |
//! | `2.0`           | `double` |
//! | `42`            | `int`    |

use sylect_ast::Literal;
use sylect_core::{CompileError, Result, Span, TypeMeta};

use super::ExprCompiler;

/// A decoded literal.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
}

impl LiteralValue {
    pub fn type_meta(&self) -> TypeMeta {
        match self {
            Self::Int(_) => TypeMeta::integer(),
            Self::Long(_) => TypeMeta::long(),
            Self::Float(_) => TypeMeta::float(),
            Self::Double(_) => TypeMeta::double(),
            Self::Str(_) => TypeMeta::string(),
        }
    }
}

fn malformed(literal: &Literal, kind: &str) -> CompileError {
    CompileError::type_mismatch(
        format!("'{}' is not a valid {kind} literal", literal.text),
        literal.span,
    )
}

pub fn parse_literal(literal: &Literal) -> Result<LiteralValue> {
    let text = literal.text.as_str();
    if literal.is_string() {
        return decode_escapes(&text[1..text.len() - 1], literal.span).map(LiteralValue::Str);
    }

    if let Some(digits) = text.strip_suffix('F') {
        digits
            .parse::<f32>()
            .map(LiteralValue::Float)
            .map_err(|_| malformed(literal, "float"))
    } else if let Some(digits) = text.strip_suffix('L') {
        digits
            .parse::<i64>()
            .map(LiteralValue::Long)
            .map_err(|_| malformed(literal, "long"))
    } else if text.contains('.') {
        text.parse::<f64>()
            .map(LiteralValue::Double)
            .map_err(|_| malformed(literal, "double"))
    } else {
        text.parse::<i32>()
            .map(LiteralValue::Int)
            .map_err(|_| malformed(literal, "int"))
    }
}

/// Decode `\n \t \r \" \' \\` inside a string literal body.
fn decode_escapes(body: &str, span: Span) -> Result<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let decoded = match chars.next() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('"') => '"',
            Some('\'') => '\'',
            Some('\\') => '\\',
            Some(other) => {
                return Err(CompileError::type_mismatch(
                    format!("unknown escape sequence '\\{other}'"),
                    span,
                ));
            }
            None => {
                return Err(CompileError::type_mismatch(
                    "string literal ends inside an escape sequence",
                    span,
                ));
            }
        };
        out.push(decoded);
    }
    Ok(out)
}

pub(super) fn compile_literal(
    compiler: &mut ExprCompiler<'_, '_>,
    literal: &Literal,
) -> Result<TypeMeta> {
    let value = parse_literal(literal)?;
    let ty = value.type_meta();
    let emitter = &mut *compiler.emitter;
    match value {
        LiteralValue::Int(v) => emitter.emit_int(v),
        LiteralValue::Long(v) => emitter.emit_long(v),
        LiteralValue::Float(v) => emitter.emit_float(v),
        LiteralValue::Double(v) => emitter.emit_double(v),
        LiteralValue::Str(s) => emitter.emit_string(s),
    }
    Ok(ty)
}

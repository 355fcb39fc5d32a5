//! The type model.
//!
//! [`TypeMeta`] is the canonical description of every value the language
//! manipulates. Slot widths and binary descriptors are derived here and
//! nowhere else.
//!
//! # Black-box types
//!
//! `bool`, `byte`, `char`, `short` and every array type are carried through
//! the language opaquely: they can be stored, passed and returned, but only
//! explicit conversions operate on them.

use std::fmt;

/// The kind of a [`TypeMeta`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Void,
    Integer,
    Long,
    Float,
    Double,
    Class,
    // Host-only scalars, black-box in the language
    Boolean,
    Byte,
    Char,
    Short,
}

impl TypeKind {
    /// Scalar kinds the language does no arithmetic on.
    #[inline]
    pub fn is_black_box(self) -> bool {
        matches!(self, Self::Boolean | Self::Byte | Self::Char | Self::Short)
    }

    /// `int`, `long`, `float` or `double`.
    #[inline]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Long | Self::Float | Self::Double)
    }

    /// Keyword used for this kind in source, `None` for class types.
    pub fn keyword(self) -> Option<&'static str> {
        Some(match self {
            Self::Void => "void",
            Self::Integer => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Boolean => "bool",
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Short => "short",
            Self::Class => return None,
        })
    }

    /// Inverse of [`TypeKind::keyword`].
    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "void" => Self::Void,
            "int" => Self::Integer,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            "bool" => Self::Boolean,
            "byte" => Self::Byte,
            "char" => Self::Char,
            "short" => Self::Short,
            _ => return None,
        })
    }

    fn descriptor_char(self) -> Option<char> {
        Some(match self {
            Self::Void => 'V',
            Self::Integer => 'I',
            Self::Long => 'J',
            Self::Float => 'F',
            Self::Double => 'D',
            Self::Boolean => 'Z',
            Self::Byte => 'B',
            Self::Char => 'C',
            Self::Short => 'S',
            Self::Class => return None,
        })
    }

    fn from_descriptor_char(c: char) -> Option<Self> {
        Some(match c {
            'V' => Self::Void,
            'I' => Self::Integer,
            'J' => Self::Long,
            'F' => Self::Float,
            'D' => Self::Double,
            'Z' => Self::Boolean,
            'B' => Self::Byte,
            'C' => Self::Char,
            'S' => Self::Short,
            _ => return None,
        })
    }
}

/// A value type: `{kind, is_array, class_name?}`.
///
/// `class_name` is present exactly when `kind` is [`TypeKind::Class`]; the
/// constructors are the only way to build one, which keeps that invariant.
/// Equality is exact: `int` and `long` are different types, and so are
/// `int` and `int[]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeMeta {
    kind: TypeKind,
    is_array: bool,
    class_name: Option<String>,
}

impl TypeMeta {
    /// A non-class scalar type.
    ///
    /// Passing [`TypeKind::Class`] yields `java/lang/Object`, since a class
    /// type always needs a name.
    pub fn scalar(kind: TypeKind) -> Self {
        if kind == TypeKind::Class {
            return Self::class(crate::names::OBJECT);
        }
        Self {
            kind,
            is_array: false,
            class_name: None,
        }
    }

    pub fn void() -> Self {
        Self::scalar(TypeKind::Void)
    }

    /// The boolean-pseudo type used for every condition.
    pub fn integer() -> Self {
        Self::scalar(TypeKind::Integer)
    }

    pub fn long() -> Self {
        Self::scalar(TypeKind::Long)
    }

    pub fn float() -> Self {
        Self::scalar(TypeKind::Float)
    }

    pub fn double() -> Self {
        Self::scalar(TypeKind::Double)
    }

    /// A reference to the class with the given internal name.
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Class,
            is_array: false,
            class_name: Some(name.into()),
        }
    }

    /// `java/lang/String`.
    pub fn string() -> Self {
        Self::class(crate::names::STRING)
    }

    /// The single-dimension array of this type.
    pub fn array_of(mut self) -> Self {
        self.is_array = true;
        self
    }

    /// The element type of an array, or the type itself for non-arrays.
    pub fn element_type(&self) -> TypeMeta {
        Self {
            kind: self.kind,
            is_array: false,
            class_name: self.class_name.clone(),
        }
    }

    #[inline]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        self.is_array
    }

    /// Internal class name for class types.
    #[inline]
    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    #[inline]
    pub fn is_void(&self) -> bool {
        self.kind == TypeKind::Void && !self.is_array
    }

    /// Whether the value is stored as a reference (class or any array).
    #[inline]
    pub fn is_reference(&self) -> bool {
        self.is_array || self.kind == TypeKind::Class
    }

    /// Non-array class type.
    #[inline]
    pub fn is_object(&self) -> bool {
        !self.is_array && self.kind == TypeKind::Class
    }

    /// Arrays and the host-only scalars are black-box.
    #[inline]
    pub fn is_black_box(&self) -> bool {
        self.is_array || self.kind.is_black_box()
    }

    /// Number of local variable slots (and operand stack words) a value uses.
    pub fn slot_width(&self) -> u16 {
        if self.is_array {
            return 1;
        }
        match self.kind {
            TypeKind::Void => 0,
            TypeKind::Long | TypeKind::Double => 2,
            _ => 1,
        }
    }

    /// Binary field descriptor (`I`, `[J`, `Ljava/lang/String;`, ...).
    pub fn descriptor(&self) -> String {
        let mut out = String::new();
        if self.is_array {
            out.push('[');
        }
        match (self.kind.descriptor_char(), &self.class_name) {
            (Some(c), _) => out.push(c),
            (None, Some(name)) => {
                out.push('L');
                out.push_str(name);
                out.push(';');
            }
            (None, None) => out.push_str("Ljava/lang/Object;"),
        }
        out
    }

    /// Parse one field descriptor.
    ///
    /// Multi-dimensional arrays are not part of the type model and yield
    /// `None`, as does any malformed input.
    pub fn from_descriptor(descriptor: &str) -> Option<TypeMeta> {
        let (ty, rest) = Self::parse_prefix(descriptor)?;
        rest.is_empty().then_some(ty)
    }

    /// Parse a descriptor at the start of `input`, returning the rest.
    pub fn parse_prefix(input: &str) -> Option<(TypeMeta, &str)> {
        let (is_array, body) = match input.strip_prefix('[') {
            Some(rest) => (true, rest),
            None => (false, input),
        };
        let first = body.chars().next()?;
        let (mut ty, rest) = if first == 'L' {
            let end = body.find(';')?;
            let name = &body[1..end];
            if name.is_empty() {
                return None;
            }
            (TypeMeta::class(name), &body[end + 1..])
        } else {
            let kind = TypeKind::from_descriptor_char(first)?;
            (TypeMeta::scalar(kind), &body[1..])
        };
        if is_array {
            if ty.kind == TypeKind::Void {
                return None;
            }
            ty = ty.array_of();
        }
        Some((ty, rest))
    }
}

impl fmt::Display for TypeMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind.keyword(), &self.class_name) {
            (Some(word), _) => f.write_str(word)?,
            (None, Some(name)) => f.write_str(name)?,
            (None, None) => f.write_str("?")?,
        }
        if self.is_array {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

/// Build a method descriptor from parameter and return types.
pub fn method_descriptor<'a>(
    params: impl IntoIterator<Item = &'a TypeMeta>,
    return_type: &TypeMeta,
) -> String {
    let mut out = String::from("(");
    for param in params {
        out.push_str(&param.descriptor());
    }
    out.push(')');
    out.push_str(&return_type.descriptor());
    out
}

/// Split a method descriptor into parameter types and return type.
pub fn parse_method_descriptor(descriptor: &str) -> Option<(Vec<TypeMeta>, TypeMeta)> {
    let mut rest = descriptor.strip_prefix('(')?;
    let mut params = Vec::new();
    while !rest.starts_with(')') {
        let (ty, tail) = TypeMeta::parse_prefix(rest)?;
        if ty.is_void() {
            return None;
        }
        params.push(ty);
        rest = tail;
    }
    let return_type = TypeMeta::from_descriptor(&rest[1..])?;
    Some((params, return_type))
}

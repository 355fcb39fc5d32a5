//! Declaration nodes: program, class, fields, methods, annotations.

use sylect_core::Span;

use crate::expr::Literal;
use crate::stmt::Block;

/// An identifier with its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            span: Span::default(),
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

impl From<&str> for Ident {
    fn from(name: &str) -> Self {
        Ident::new(name)
    }
}

/// A written type: `int`, `a/b/C`, `byte[]!`.
///
/// `black_box` records the trailing `!` that must accompany every array and
/// host-only scalar type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub name: String,
    pub is_array: bool,
    pub black_box: bool,
    pub span: Span,
}

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_array: false,
            black_box: false,
            span: Span::default(),
        }
    }

    /// Split the surface spelling: `name`, optional `[]`, optional `!`.
    pub fn parse(text: &str) -> Self {
        let (text, black_box) = match text.strip_suffix('!') {
            Some(rest) => (rest, true),
            None => (text, false),
        };
        let (name, is_array) = match text.strip_suffix("[]") {
            Some(rest) => (rest, true),
            None => (text, false),
        };
        Self {
            name: name.to_string(),
            is_array,
            black_box,
            span: Span::default(),
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

impl From<&str> for TypeRef {
    fn from(text: &str) -> Self {
        TypeRef::parse(text)
    }
}

// ============================================================================
// Annotations
// ============================================================================

/// `@Type(name = value, ...)`
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub ty: Ident,
    pub params: Vec<AnnotationParam>,
    pub span: Span,
}

impl Annotation {
    pub fn new(ty: impl Into<Ident>) -> Self {
        Self {
            ty: ty.into(),
            params: Vec::new(),
            span: Span::default(),
        }
    }

    pub fn param(
        mut self,
        name: impl Into<Ident>,
        values: impl IntoIterator<Item = AnnotationValue>,
    ) -> Self {
        self.params.push(AnnotationParam {
            name: name.into(),
            values: values.into_iter().collect(),
            span: Span::default(),
        });
        self
    }
}

/// One named annotation element. Array elements list several values.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationParam {
    pub name: Ident,
    pub values: Vec<AnnotationValue>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    /// Numeric or quoted string literal.
    Literal(Literal),
    /// A class literal, by (possibly imported) name.
    Class(Ident),
    /// Nested annotation.
    Annotation(Annotation),
}

// ============================================================================
// Members
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub annotations: Vec<Annotation>,
    pub is_static: bool,
    pub name: Ident,
    pub ty: TypeRef,
    pub span: Span,
}

impl FieldDef {
    pub fn new(name: impl Into<Ident>, ty: impl Into<TypeRef>) -> Self {
        Self {
            annotations: Vec::new(),
            is_static: false,
            name: name.into(),
            ty: ty.into(),
            span: Span::default(),
        }
    }

    pub fn make_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub annotations: Vec<Annotation>,
    pub name: Ident,
    pub ty: TypeRef,
    pub span: Span,
}

/// A method. `body == None` declares an abstract (or native) method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    pub annotations: Vec<Annotation>,
    pub is_static: bool,
    pub is_native: bool,
    /// Source name; `constructor` declares an initializer.
    pub name: Ident,
    pub params: Vec<Param>,
    pub return_type: TypeRef,
    pub body: Option<Block>,
    pub span: Span,
}

impl MethodDef {
    pub fn new(name: impl Into<Ident>, return_type: impl Into<TypeRef>) -> Self {
        Self {
            annotations: Vec::new(),
            is_static: false,
            is_native: false,
            name: name.into(),
            params: Vec::new(),
            return_type: return_type.into(),
            body: None,
            span: Span::default(),
        }
    }

    /// `constructor(...)`, which always returns void.
    pub fn constructor() -> Self {
        Self::new("constructor", "void")
    }

    pub fn param(mut self, name: impl Into<Ident>, ty: impl Into<TypeRef>) -> Self {
        self.params.push(Param {
            annotations: Vec::new(),
            name: name.into(),
            ty: ty.into(),
            span: Span::default(),
        });
        self
    }

    pub fn annotated_param(
        mut self,
        name: impl Into<Ident>,
        ty: impl Into<TypeRef>,
        annotations: Vec<Annotation>,
    ) -> Self {
        self.params.push(Param {
            annotations,
            name: name.into(),
            ty: ty.into(),
            span: Span::default(),
        });
        self
    }

    pub fn make_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn make_native(mut self) -> Self {
        self.is_native = true;
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn body(mut self, stmts: impl IntoIterator<Item = crate::Stmt>) -> Self {
        self.body = Some(Block::new(stmts));
        self
    }
}

// ============================================================================
// Class & Program
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub annotations: Vec<Annotation>,
    pub is_interface: bool,
    /// Full internal name (`a/b/C`).
    pub name: Ident,
    pub base: Option<Ident>,
    pub interfaces: Vec<Ident>,
    pub fields: Vec<FieldDef>,
    pub methods: Vec<MethodDef>,
    pub span: Span,
}

impl ClassDef {
    pub fn new(name: impl Into<Ident>) -> Self {
        Self {
            annotations: Vec::new(),
            is_interface: false,
            name: name.into(),
            base: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            span: Span::default(),
        }
    }

    pub fn interface(name: impl Into<Ident>) -> Self {
        Self {
            is_interface: true,
            ..Self::new(name)
        }
    }

    pub fn extends(mut self, base: impl Into<Ident>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn implements(mut self, iface: impl Into<Ident>) -> Self {
        self.interfaces.push(iface.into());
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}

/// One compilation unit: imports plus exactly one class.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub imports: Vec<Ident>,
    pub class: ClassDef,
    pub span: Span,
}

impl Program {
    pub fn new(class: ClassDef) -> Self {
        Self {
            imports: Vec::new(),
            class,
            span: Span::default(),
        }
    }

    pub fn import(mut self, name: impl Into<Ident>) -> Self {
        self.imports.push(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_ref_surface_forms() {
        let plain = TypeRef::parse("int");
        assert_eq!((plain.name.as_str(), plain.is_array, plain.black_box), ("int", false, false));

        let array = TypeRef::parse("a/B[]!");
        assert_eq!((array.name.as_str(), array.is_array, array.black_box), ("a/B", true, true));

        let bool_type = TypeRef::parse("bool!");
        assert_eq!(
            (bool_type.name.as_str(), bool_type.is_array, bool_type.black_box),
            ("bool", false, true)
        );

        // `!` without `[]` still parses; the compiler decides whether it is legal.
        let unmarked = TypeRef::parse("long[]");
        assert!(unmarked.is_array && !unmarked.black_box);
    }

    #[test]
    fn class_builder() {
        let class = ClassDef::new("demo/Counter")
            .extends("demo/Base")
            .implements("java/lang/Runnable")
            .field(FieldDef::new("count", "int").make_static())
            .method(MethodDef::new("run", "void").body(Vec::<crate::Stmt>::new()));

        assert_eq!(class.base.as_ref().map(|b| b.name.as_str()), Some("demo/Base"));
        assert_eq!(class.interfaces.len(), 1);
        assert!(class.fields[0].is_static);
        assert!(class.methods[0].body.is_some());
        assert!(!class.is_interface);
        assert!(ClassDef::interface("demo/Shape").is_interface);
    }
}

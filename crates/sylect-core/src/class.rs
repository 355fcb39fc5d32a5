//! Class and member metadata.
//!
//! A [`ClassMeta`] is built once per class and then only shared. It comes
//! from one of two places:
//!
//! - a compilation unit's syntax tree (signatures only, bodies compiled later)
//! - introspection of an already compiled host class
//!
//! Both paths produce the same structure, so the resolver never needs to know
//! where a class came from.

use std::fmt;

use crate::names;
use crate::types::{TypeMeta, method_descriptor};
use crate::{CompileError, Result, Span};

// ============================================================================
// Members
// ============================================================================

/// A field signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldMeta {
    pub name: String,
    pub is_static: bool,
    pub type_meta: TypeMeta,
}

impl FieldMeta {
    pub fn new(name: impl Into<String>, is_static: bool, type_meta: TypeMeta) -> Self {
        Self {
            name: name.into(),
            is_static,
            type_meta,
        }
    }

    pub fn descriptor(&self) -> String {
        self.type_meta.descriptor()
    }
}

/// A named, typed method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterMeta {
    pub name: String,
    pub type_meta: TypeMeta,
}

impl ParameterMeta {
    pub fn new(name: impl Into<String>, type_meta: TypeMeta) -> Self {
        Self {
            name: name.into(),
            type_meta,
        }
    }
}

/// A method signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodMeta {
    /// Runtime name; constructors are always `<init>`.
    pub name: String,
    pub is_static: bool,
    pub is_native: bool,
    pub is_abstract: bool,
    pub return_type: TypeMeta,
    pub parameters: Vec<ParameterMeta>,
}

impl MethodMeta {
    /// Build a signature exactly as given. Used for host classes.
    pub fn new(
        name: impl Into<String>,
        is_static: bool,
        is_native: bool,
        is_abstract: bool,
        return_type: TypeMeta,
        parameters: Vec<ParameterMeta>,
    ) -> Self {
        Self {
            name: name.into(),
            is_static,
            is_native,
            is_abstract,
            return_type,
            parameters,
        }
    }

    /// Build a signature from a source declaration.
    ///
    /// The constructor keyword is normalized to `<init>`, and a method with
    /// no body is abstract unless it is native. Static abstract methods are
    /// rejected, and a constructor must be an ordinary method with a body.
    pub fn declare(
        name: &str,
        is_static: bool,
        is_native: bool,
        has_body: bool,
        return_type: TypeMeta,
        parameters: Vec<ParameterMeta>,
        span: Span,
    ) -> Result<Self> {
        let name = if name == names::CONSTRUCTOR_KEYWORD {
            names::INIT
        } else {
            name
        };
        let is_abstract = !has_body && !is_native;
        if is_static && is_abstract {
            return Err(CompileError::invalid_access(
                format!("static method '{name}' cannot be abstract"),
                span,
            ));
        }
        if name == names::INIT {
            if is_static || !return_type.is_void() {
                return Err(CompileError::invalid_access(
                    "constructor must be a non-static void method",
                    span,
                ));
            }
            if is_native || !has_body {
                return Err(CompileError::unsupported(
                    "constructor must have a body and cannot be native",
                    span,
                ));
            }
        }
        Ok(Self::new(
            name,
            is_static,
            is_native,
            is_abstract,
            return_type,
            parameters,
        ))
    }

    #[inline]
    pub fn is_constructor(&self) -> bool {
        self.name == names::INIT
    }

    /// Whether a `Code` attribute is emitted for this method.
    #[inline]
    pub fn has_code(&self) -> bool {
        !self.is_abstract && !self.is_native
    }

    pub fn parameter_types(&self) -> impl Iterator<Item = &TypeMeta> {
        self.parameters.iter().map(|p| &p.type_meta)
    }

    /// Exact parameter-list match.
    pub fn accepts(&self, params: &[TypeMeta]) -> bool {
        self.parameters.len() == params.len() && self.parameter_types().eq(params.iter())
    }

    pub fn descriptor(&self) -> String {
        method_descriptor(self.parameter_types(), &self.return_type)
    }
}

impl fmt::Display for MethodMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.descriptor())
    }
}

/// A local variable slot in the method being compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMeta {
    pub name: String,
    pub type_meta: TypeMeta,
    pub slot: u16,
}

// ============================================================================
// ClassMeta
// ============================================================================

/// Structural description of one class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMeta {
    /// Internal name (`a/b/C`).
    pub name: String,
    pub is_interface: bool,
    /// Absent only for `java/lang/Object`.
    pub base_class_name: Option<String>,
    /// Implemented (or, for interfaces, extended) interfaces in declaration order.
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldMeta>,
    pub methods: Vec<MethodMeta>,
}

impl ClassMeta {
    /// An empty class extending `java/lang/Object`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_interface: false,
            base_class_name: Some(names::OBJECT.to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// The type of instances of this class.
    pub fn as_type(&self) -> TypeMeta {
        TypeMeta::class(self.name.clone())
    }

    /// Field declared directly on this class.
    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Method declared directly on this class with an exact parameter list.
    pub fn method(&self, name: &str, params: &[TypeMeta]) -> Option<&MethodMeta> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.accepts(params))
    }

    /// First method declared directly on this class with the given name.
    pub fn method_named(&self, name: &str) -> Option<&MethodMeta> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Check the rules a class declared in source must follow.
    ///
    /// Cycles longer than one step span several units and are caught by the
    /// hierarchy search instead.
    ///
    /// Host classes are not checked: compiled interfaces may legitimately
    /// carry constants and default methods.
    pub fn check_source_rules(&self, declared_base: bool, span: Span) -> Result<()> {
        let names_itself = self.base_class_name.as_deref() == Some(self.name.as_str())
            || self.interfaces.iter().any(|i| *i == self.name);
        if names_itself {
            return Err(CompileError::MalformedHierarchy {
                name: self.name.clone(),
                message: "a class cannot be its own supertype".to_string(),
            });
        }
        if !self.is_interface {
            return Ok(());
        }
        if declared_base {
            return Err(CompileError::unsupported(
                format!("interface {} cannot extend a class", self.name),
                span,
            ));
        }
        if let Some(field) = self.fields.first() {
            return Err(CompileError::unsupported(
                format!("interface {} cannot contain field '{}'", self.name, field.name),
                span,
            ));
        }
        if let Some(method) = self
            .methods
            .iter()
            .find(|m| m.is_constructor() || m.is_native)
        {
            let what = if method.is_constructor() {
                "a constructor".to_string()
            } else {
                format!("native method '{}'", method.name)
            };
            return Err(CompileError::unsupported(
                format!("interface {} cannot declare {what}", self.name),
                span,
            ));
        }
        if let Some(method) = self
            .methods
            .iter()
            .find(|m| !m.is_abstract && !m.is_static)
        {
            return Err(CompileError::unsupported(
                format!(
                    "interface {} cannot implement instance method '{}'",
                    self.name, method.name
                ),
                span,
            ));
        }
        Ok(())
    }
}

impl fmt::Display for ClassMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_interface { "interface " } else { "class " })?;
        f.write_str(&self.name)
    }
}

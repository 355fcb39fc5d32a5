//! Compilation errors.
//!
//! Every problem the compiler detects is fatal for the compilation unit it
//! occurs in. There is no recovery and no partial output: the first error
//! is propagated with `?` up to the pass driver.
//!
//! ## Error Kinds
//!
//! ```text
//! CompileError
//! ├── name resolution   UnknownSymbol, UnknownClass, UnknownField, UnknownMethod,
//! │                     AmbiguousImport, DuplicateClass, MalformedHierarchy
//! ├── typing            TypeMismatch, InvalidConversion
//! ├── scope/flow        InvalidAccess, NotStatic, DuplicateLocal, InvalidControlFlow
//! ├── language surface  UnsupportedConstruct, Syntax
//! └── environment       UnsupportedTarget, ClassFormat
//! ```

use thiserror::Error;

use crate::Span;

/// Result alias used throughout the compiler crates.
pub type Result<T> = std::result::Result<T, CompileError>;

/// A fatal compilation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// A name could not be resolved to a local, field, or class.
    #[error("at {span}: unknown symbol '{name}'")]
    UnknownSymbol {
        /// The unresolved identifier.
        name: String,
        /// Where the identifier was used.
        span: Span,
    },

    /// Neither the source set nor the host could supply a class.
    #[error("at {span}: unknown class '{name}'")]
    UnknownClass {
        /// Internal class name (`a/b/C`).
        name: String,
        /// Where the class was referenced.
        span: Span,
    },

    /// Field lookup through the class hierarchy found nothing.
    #[error("at {span}: unknown field '{name}' in {owner}")]
    UnknownField {
        /// Field name.
        name: String,
        /// Class that was searched.
        owner: String,
        /// Where the field was accessed.
        span: Span,
    },

    /// No method with this exact name and parameter list exists.
    #[error("at {span}: unknown method '{name}({params})' in {owner}")]
    UnknownMethod {
        /// Method name (`<init>` for constructors).
        name: String,
        /// Comma separated argument types.
        params: String,
        /// Class that was searched.
        owner: String,
        /// Where the call occurred.
        span: Span,
    },

    /// Operand or declared types do not match.
    #[error("at {span}: {message}")]
    TypeMismatch {
        /// Description of the mismatch.
        message: String,
        /// Where the mismatch occurred.
        span: Span,
    },

    /// An explicit conversion outside the supported table.
    #[error("at {span}: could not convert {from} to {to}")]
    InvalidConversion {
        /// Source type.
        from: String,
        /// Target type.
        to: String,
        /// Where the conversion was written.
        span: Span,
    },

    /// Static/instance misuse, or member access on a primitive value.
    #[error("at {span}: {message}")]
    InvalidAccess {
        /// Description of the access.
        message: String,
        /// Where the access occurred.
        span: Span,
    },

    /// A static context referenced an instance member.
    #[error("at {span}: {member} is not static in {owner}")]
    NotStatic {
        /// Member name.
        member: String,
        /// Owning class.
        owner: String,
        /// Where the member was referenced.
        span: Span,
    },

    /// A local variable name is already taken in the current method.
    #[error("at {span}: variable '{name}' already declared")]
    DuplicateLocal {
        /// The variable name.
        name: String,
        /// Where the redeclaration occurred.
        span: Span,
    },

    /// `break`/`continue` outside a loop, or mismatched label frames.
    #[error("at {span}: {message}")]
    InvalidControlFlow {
        /// Description of the misuse.
        message: String,
        /// Where it occurred.
        span: Span,
    },

    /// A recognized construct the compiler does not implement.
    #[error("at {span}: unsupported: {message}")]
    UnsupportedConstruct {
        /// What is unsupported.
        message: String,
        /// Where it was written.
        span: Span,
    },

    /// Two compilation units declare the same class.
    #[error("duplicate class '{name}' in source set")]
    DuplicateClass {
        /// Internal class name.
        name: String,
    },

    /// Two imports map the same short name to different classes.
    #[error("at {span}: '{alias}' imported as both {first} and {second}")]
    AmbiguousImport {
        /// The shared short name.
        alias: String,
        /// First full name.
        first: String,
        /// Second full name.
        second: String,
        /// Where the second import was declared.
        span: Span,
    },

    /// Hierarchy traversal exceeded its depth bound or found a cycle.
    #[error("malformed hierarchy for '{name}': {message}")]
    MalformedHierarchy {
        /// Class where traversal started.
        name: String,
        /// What went wrong.
        message: String,
    },

    /// Target version outside the supported range.
    #[error("unsupported target: {target}")]
    UnsupportedTarget {
        /// Requested target version.
        target: u32,
    },

    /// The bytecode assembler or class reader rejected its input.
    #[error("class format: {message}")]
    ClassFormat {
        /// Assembler or reader diagnostic.
        message: String,
    },

    /// Error reported by the front-end that produced the tree.
    #[error("at {span}: syntax error: {message}")]
    Syntax {
        /// Front-end diagnostic.
        message: String,
        /// Where parsing failed.
        span: Span,
    },
}

impl CompileError {
    /// Get the span where this error occurred, if it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UnknownSymbol { span, .. }
            | Self::UnknownClass { span, .. }
            | Self::UnknownField { span, .. }
            | Self::UnknownMethod { span, .. }
            | Self::TypeMismatch { span, .. }
            | Self::InvalidConversion { span, .. }
            | Self::InvalidAccess { span, .. }
            | Self::NotStatic { span, .. }
            | Self::DuplicateLocal { span, .. }
            | Self::InvalidControlFlow { span, .. }
            | Self::UnsupportedConstruct { span, .. }
            | Self::AmbiguousImport { span, .. }
            | Self::Syntax { span, .. } => Some(*span),
            Self::DuplicateClass { .. }
            | Self::MalformedHierarchy { .. }
            | Self::UnsupportedTarget { .. }
            | Self::ClassFormat { .. } => None,
        }
    }

    /// Shorthand for [`CompileError::TypeMismatch`].
    pub fn type_mismatch(message: impl Into<String>, span: Span) -> Self {
        Self::TypeMismatch {
            message: message.into(),
            span,
        }
    }

    /// Shorthand for [`CompileError::InvalidAccess`].
    pub fn invalid_access(message: impl Into<String>, span: Span) -> Self {
        Self::InvalidAccess {
            message: message.into(),
            span,
        }
    }

    /// Shorthand for [`CompileError::UnsupportedConstruct`].
    pub fn unsupported(message: impl Into<String>, span: Span) -> Self {
        Self::UnsupportedConstruct {
            message: message.into(),
            span,
        }
    }

    /// Shorthand for [`CompileError::ClassFormat`].
    pub fn class_format(message: impl Into<String>) -> Self {
        Self::ClassFormat {
            message: message.into(),
        }
    }

    /// Re-anchor an error raised without a location.
    ///
    /// Resolver errors are created far from the syntax tree; callers that
    /// know the use site attach it here. Errors that already carry a real
    /// span are returned unchanged.
    pub fn at(self, site: Span) -> Self {
        match self {
            Self::UnknownClass { name, span } if span.is_synthetic() => {
                Self::UnknownClass { name, span: site }
            }
            Self::UnknownSymbol { name, span } if span.is_synthetic() => {
                Self::UnknownSymbol { name, span: site }
            }
            other => other,
        }
    }
}

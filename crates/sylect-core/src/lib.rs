//! Core types shared by every Sylect compiler crate.
//!
//! - [`types`]: the value type model ([`TypeMeta`], [`TypeKind`])
//! - [`class`]: class and member metadata ([`ClassMeta`], [`MethodMeta`], ...)
//! - [`error`]: the single fatal error type ([`CompileError`])
//! - [`target`]: output version and dialect selection
//! - [`names`]: well-known class names and name helpers

pub mod class;
pub mod error;
pub mod names;
pub mod span;
pub mod target;
pub mod types;

pub use class::{ClassMeta, FieldMeta, LocalMeta, MethodMeta, ParameterMeta};
pub use error::{CompileError, Result};
pub use span::Span;
pub use target::{Dialect, TargetVersion};
pub use types::{TypeKind, TypeMeta, method_descriptor, parse_method_descriptor};

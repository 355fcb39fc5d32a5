//! Class-side symbol resolution.
//!
//! - [`ClassTable`]: source classes plus cached host classes, with hierarchy
//!   lookup for fields and methods
//! - [`ImportManager`]: per-unit short-name aliases
//! - [`ClassProvider`]: where host classes come from ([`JdkClasses`],
//!   [`DirectoryClassProvider`], [`JarClassProvider`], chained through
//!   [`ClasspathProvider`])

pub mod imports;
pub mod jdk;
pub mod provider;
pub mod table;

pub use imports::ImportManager;
pub use jdk::JdkClasses;
pub use provider::{
    ClassProvider, ClasspathProvider, DirectoryClassProvider, JarClassProvider, NoClasses,
    introspect,
};
pub use table::{ClassTable, DEFAULT_MAX_DEPTH};

//! Compiler passes.
//!
//! - [`registration`]: Pass 1 - build and publish the class metadata of a unit
//! - [`compilation`]: Pass 2 - compile method bodies and write the class file
//!
//! Pass 2 of any unit may start only after pass 1 has finished for every
//! unit of the batch.

pub mod compilation;
pub mod registration;

pub use compilation::{CompilationPass, CompiledClass};
pub use registration::{RegistrationOutput, RegistrationPass, build_class};

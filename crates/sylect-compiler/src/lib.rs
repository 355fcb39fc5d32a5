//! Sylect Compiler
//!
//! A 2-pass compiler from the Sylect/Forward AST to JVM class files.
//!
//! ## Architecture
//!
//! - **Pass 1 (Registration)**: Build every unit's class metadata and publish it
//! - **Pass 2 (Compilation)**: Type check method bodies and emit class files
//!
//! ## Modules
//!
//! - [`annotations`]: Runtime-visible annotations and their element values
//! - [`batch`]: Parallel two-pass compilation of many units
//! - [`context`]: Per-unit resolution of names, classes and members
//! - [`emit`]: Typed bytecode emitter with jump and loop bookkeeping
//! - [`expr`]: Expression compiler (logical, binary, unary, call chains)
//! - [`function_compiler`]: One method body, prologue to epilogue
//! - [`options`]: Target, dialect and worker configuration
//! - [`passes`]: Registration and compilation passes
//! - [`scope`]: Local variable slots of one method
//! - [`stmt`]: Statement compiler for declarations and control flow

pub mod annotations;
pub mod batch;
pub mod context;
pub mod emit;
pub mod expr;
pub mod function_compiler;
pub mod options;
pub mod passes;
pub mod scope;
pub mod stmt;

pub use batch::{BatchError, UnitFailure, compile_batch};
pub use context::{CompilationContext, resolve_type_ref};
pub use emit::{BytecodeEmitter, FrameError};
pub use expr::{CallKind, CallTarget, ExprCompiler};
pub use function_compiler::{FunctionCompiler, MethodBody};
pub use options::CompilerOptions;
pub use passes::{CompilationPass, CompiledClass, RegistrationOutput, RegistrationPass};
pub use scope::MethodScope;
pub use stmt::StmtCompiler;

// Re-export CompileError from core for convenience
pub use sylect_core::CompileError;

//! Class file assembly and parsing for the Sylect compiler.
//!
//! This crate is the compiler's only view of the binary class format:
//!
//! - [`ConstantPool`]: deduplicating constant pool
//! - [`CodeBuilder`]: instruction list with labels, assembled into a `Code`
//!   attribute with computed `max_stack`, `max_locals` and stack map frames
//! - [`ClassFile`]: writer for headers, members and attributes
//! - [`ClassReader`]/[`ParsedClass`]: parser used for host introspection
//!
//! ```text
//! CodeBuilder ──assemble──► AssembledCode ──┐
//!                                          ├──► ClassFile::to_bytes ──► Vec<u8>
//! FieldInfo / MethodInfo / Annotation ─────┘
//!
//! &[u8] ──► ClassReader ──► ParsedClass ──► ClassMeta
//! ```

pub mod access;
pub mod annotation;
mod bytes;
pub mod code;
pub mod constant;
pub mod error;
pub mod opcode;
pub mod reader;
pub mod writer;

pub use access::{ClassAccess, FieldAccess, MethodAccess};
pub use annotation::{Annotation, ElementValue};
pub use code::{AssembledCode, CodeBuilder, Insn, Label, MemberRef, MethodShape, VType, VarKind};
pub use constant::{Constant, ConstantPool};
pub use error::{ClassFileError, Result};
pub use opcode::Opcode;
pub use reader::{
    ClassReader, LocalVariableEntry, ParsedClass, ParsedCode, ParsedField, ParsedMethod,
    RawAttribute,
};
pub use writer::{ClassFile, FieldInfo, LocalVariable, MethodInfo};

//! Assembler and reader errors.

use sylect_core::CompileError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClassFileError>;

/// Errors raised while writing or reading class files.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassFileError {
    /// More constants than a 16-bit index can address.
    #[error("constant pool overflow ({count} entries)")]
    ConstantPoolOverflow { count: usize },

    /// A Utf8 constant longer than 65535 encoded bytes.
    #[error("string constant too long ({length} bytes)")]
    StringTooLong { length: usize },

    /// A jump target was never placed.
    #[error("label L{label} used but never placed")]
    UnplacedLabel { label: u32 },

    /// A label was placed twice.
    #[error("label L{label} placed twice")]
    DuplicateLabel { label: u32 },

    /// Branch distance does not fit the 16-bit offset encoding.
    #[error("branch offset {offset} out of range")]
    BranchOutOfRange { offset: i64 },

    /// Method body exceeds the 64 KiB code limit.
    #[error("method code too large ({size} bytes)")]
    CodeTooLarge { size: usize },

    /// Operand stack or local variable types did not line up.
    #[error("inconsistent frame at instruction {index}: {message}")]
    InconsistentFrame { index: usize, message: String },

    /// Malformed descriptor passed to the assembler or found in a class file.
    #[error("bad descriptor '{descriptor}'")]
    BadDescriptor { descriptor: String },

    /// Input bytes are not a well-formed class file.
    #[error("malformed class file: {message}")]
    Malformed { message: String },

    /// Input ended early.
    #[error("unexpected end of class file at byte {offset}")]
    UnexpectedEof { offset: usize },
}

impl ClassFileError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

impl From<ClassFileError> for CompileError {
    fn from(err: ClassFileError) -> Self {
        CompileError::ClassFormat {
            message: err.to_string(),
        }
    }
}

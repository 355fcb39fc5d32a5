//! Output format selection.

use std::fmt;
use std::str::FromStr;

use crate::{CompileError, Result};

/// A supported JVM target release (5 through 22).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetVersion(u32);

impl TargetVersion {
    pub const MIN: u32 = 5;
    pub const MAX: u32 = 22;

    /// Validate a target release number.
    pub fn new(target: u32) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&target) {
            Ok(Self(target))
        } else {
            Err(CompileError::UnsupportedTarget { target })
        }
    }

    /// The release number this target was built from.
    #[inline]
    pub fn release(self) -> u32 {
        self.0
    }

    /// Class file major version (`release + 44`).
    #[inline]
    pub fn major(self) -> u16 {
        (self.0 + 44) as u16
    }

    /// Class files from major 50 on carry `StackMapTable` frames.
    #[inline]
    pub fn uses_stack_maps(self) -> bool {
        self.major() >= 50
    }

    /// Interfaces may carry static methods with code from major 52 on.
    #[inline]
    pub fn allows_static_interface_methods(self) -> bool {
        self.major() >= 52
    }
}

impl Default for TargetVersion {
    fn default() -> Self {
        Self(17)
    }
}

impl fmt::Display for TargetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Language dialect.
///
/// Both dialects share one compiler; they differ only in output policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// The earlier dialect: public fields, fixed 1.5 class files, no
    /// interfaces, no annotations.
    Forward,
    /// The current dialect.
    #[default]
    Sylect,
}

impl Dialect {
    /// The dialect's target, given the configured one.
    pub fn effective_target(self, configured: TargetVersion) -> TargetVersion {
        match self {
            Self::Forward => TargetVersion(5),
            Self::Sylect => configured,
        }
    }

    /// Fields are public in Forward and protected in Sylect.
    #[inline]
    pub fn public_fields(self) -> bool {
        self == Self::Forward
    }

    #[inline]
    pub fn supports_annotations(self) -> bool {
        self == Self::Sylect
    }

    #[inline]
    pub fn supports_interfaces(self) -> bool {
        self == Self::Sylect
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Forward => "Forward",
            Self::Sylect => "Sylect",
        })
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forward" => Ok(Self::Forward),
            "sylect" => Ok(Self::Sylect),
            other => Err(format!("unknown dialect '{other}'")),
        }
    }
}

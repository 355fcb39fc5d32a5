//! Compiler configuration.
//!
//! Options come from code ([`CompilerOptions::default`] plus the `with_*`
//! builders) or from the environment:
//!
//! | Variable         | Meaning                              | Default     |
//! |------------------|--------------------------------------|-------------|
//! | `SYLECT_TARGET`  | target release (5..=22)              | `17`        |
//! | `SYLECT_DIALECT` | `sylect` or `forward`                | `sylect`    |
//! | `SYLECT_WORKERS` | batch worker threads                 | CPU count   |

use std::num::NonZeroUsize;

use sylect_core::{CompileError, Dialect, Result, Span, TargetVersion};
use sylect_registry::DEFAULT_MAX_DEPTH;

pub const TARGET_VAR: &str = "SYLECT_TARGET";
pub const DIALECT_VAR: &str = "SYLECT_DIALECT";
pub const WORKERS_VAR: &str = "SYLECT_WORKERS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Configured target. The dialect may override it, see
    /// [`CompilerOptions::effective_target`].
    pub target: TargetVersion,
    pub dialect: Dialect,
    /// Bound on hierarchy traversal during member lookup.
    pub max_hierarchy_depth: usize,
    /// Worker threads for batch compilation.
    pub workers: usize,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            target: TargetVersion::default(),
            dialect: Dialect::default(),
            max_hierarchy_depth: DEFAULT_MAX_DEPTH,
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

impl CompilerOptions {
    pub fn with_target(mut self, target: TargetVersion) -> Self {
        self.target = target;
        self
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_max_hierarchy_depth(mut self, depth: usize) -> Self {
        self.max_hierarchy_depth = depth;
        self
    }

    /// Zero is treated as one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// The target actually written to class files.
    pub fn effective_target(&self) -> TargetVersion {
        self.dialect.effective_target(self.target)
    }

    /// Read options from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read options through `lookup`, falling back to defaults for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut options = Self::default();

        if let Some(raw) = lookup(TARGET_VAR) {
            let release = raw.trim().parse::<u32>().map_err(|_| {
                CompileError::unsupported(
                    format!("{TARGET_VAR} must be a release number, got '{raw}'"),
                    Span::default(),
                )
            })?;
            options.target = TargetVersion::new(release)?;
        }

        if let Some(raw) = lookup(DIALECT_VAR) {
            options.dialect = raw
                .trim()
                .parse::<Dialect>()
                .map_err(|message| CompileError::unsupported(message, Span::default()))?;
        }

        if let Some(raw) = lookup(WORKERS_VAR) {
            let workers = raw.trim().parse::<usize>().map_err(|_| {
                CompileError::unsupported(
                    format!("{WORKERS_VAR} must be a thread count, got '{raw}'"),
                    Span::default(),
                )
            })?;
            options = options.with_workers(workers);
        }

        Ok(options)
    }
}

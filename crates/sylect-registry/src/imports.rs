//! Short-name aliases for one compilation unit.

use rustc_hash::FxHashMap;
use sylect_core::{CompileError, Result, Span, names};

/// Maps the last segment of each imported name (and the unit's own class
/// name) to the full internal name.
#[derive(Debug, Clone, Default)]
pub struct ImportManager {
    aliases: FxHashMap<String, String>,
}

impl ImportManager {
    /// Build the alias table for a unit declaring `class_name`.
    ///
    /// Importing the same class twice is harmless. Two different classes
    /// sharing a short name are rejected at the second import.
    pub fn new<'a>(
        class_name: &str,
        imports: impl IntoIterator<Item = (&'a str, Span)>,
    ) -> Result<Self> {
        let mut manager = Self::default();
        manager.add(class_name, Span::default())?;
        for (import, span) in imports {
            manager.add(import, span)?;
        }
        Ok(manager)
    }

    fn add(&mut self, full_name: &str, span: Span) -> Result<()> {
        let alias = names::short_name(full_name);
        match self.aliases.get(alias) {
            Some(existing) if existing != full_name => Err(CompileError::AmbiguousImport {
                alias: alias.to_string(),
                first: existing.clone(),
                second: full_name.to_string(),
                span,
            }),
            Some(_) => Ok(()),
            None => {
                self.aliases.insert(alias.to_string(), full_name.to_string());
                Ok(())
            }
        }
    }

    /// The full name for an alias, or the identifier itself.
    pub fn resolve<'a>(&'a self, identifier: &'a str) -> &'a str {
        self.aliases
            .get(identifier)
            .map(String::as_str)
            .unwrap_or(identifier)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

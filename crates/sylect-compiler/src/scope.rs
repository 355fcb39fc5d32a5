//! Local variable table of one method body.
//!
//! Slots are handed out monotonically and never reused:
//!
//! ```text
//! slot 0        this            (instance methods only)
//! slot 1..      parameters      in declaration order
//! then          locals          in declaration order
//! ```
//!
//! `long` and `double` take two slots. Names are method-wide: a nested block
//! cannot redeclare a name already used anywhere earlier in the method.

use rustc_hash::FxHashMap;
use sylect_core::{ClassMeta, CompileError, LocalMeta, MethodMeta, Result, Span, TypeMeta};

/// Name of the implicit receiver local.
pub const THIS: &str = "this";

#[derive(Debug)]
pub struct MethodScope {
    method: MethodMeta,
    locals: Vec<LocalMeta>,
    by_name: FxHashMap<String, usize>,
    next_slot: u16,
}

impl MethodScope {
    /// Open the scope of `method` in `class`, declaring `this` and the
    /// parameters.
    pub fn new(class: &ClassMeta, method: &MethodMeta, span: Span) -> Result<Self> {
        let mut scope = Self {
            method: method.clone(),
            locals: Vec::with_capacity(method.parameters.len() + 1),
            by_name: FxHashMap::default(),
            next_slot: 0,
        };
        if !method.is_static {
            scope.add_local(THIS, class.as_type(), span)?;
        }
        for param in &method.parameters {
            scope.add_local(&param.name, param.type_meta.clone(), span)?;
        }
        Ok(scope)
    }

    /// Declare a local in the next free slot.
    pub fn add_local(&mut self, name: &str, type_meta: TypeMeta, span: Span) -> Result<LocalMeta> {
        if self.by_name.contains_key(name) {
            return Err(CompileError::DuplicateLocal {
                name: name.to_string(),
                span,
            });
        }
        let slot = self.next_slot;
        self.next_slot = slot
            .checked_add(type_meta.slot_width())
            .ok_or_else(|| CompileError::unsupported("too many local variables", span))?;

        let local = LocalMeta {
            name: name.to_string(),
            type_meta,
            slot,
        };
        self.by_name.insert(local.name.clone(), self.locals.len());
        self.locals.push(local.clone());
        Ok(local)
    }

    pub fn get(&self, name: &str) -> Option<&LocalMeta> {
        self.by_name.get(name).map(|&index| &self.locals[index])
    }

    /// Every local in declaration order, `this` and parameters included.
    pub fn locals(&self) -> &[LocalMeta] {
        &self.locals
    }

    pub fn next_slot(&self) -> u16 {
        self.next_slot
    }

    pub fn method(&self) -> &MethodMeta {
        &self.method
    }

    pub fn return_type(&self) -> &TypeMeta {
        &self.method.return_type
    }

    pub fn is_static(&self) -> bool {
        self.method.is_static
    }

    pub fn is_constructor(&self) -> bool {
        self.method.is_constructor()
    }
}

//! Class table: every class the compilation run can see.
//!
//! ## Lookup Order
//!
//! ```text
//! resolve_class(name)
//!   ├── source set   classes registered by pass 1
//!   ├── host cache   classes already introspected
//!   └── provider     introspect once, under the introspection lock
//! ```
//!
//! Both maps sit behind `RwLock`s so pass 1 can register from many threads
//! while pass 2 reads. Introspection takes a dedicated mutex and re-checks
//! the cache once it holds it, so each host class is decoded at most once
//! even when several units ask for it at the same moment.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use rustc_hash::{FxHashMap, FxHashSet};
use sylect_core::{ClassMeta, CompileError, FieldMeta, MethodMeta, Result, Span, TypeMeta};
use tracing::trace;

use crate::provider::ClassProvider;

/// Default bound on hierarchy traversal depth.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Shared class metadata for one compilation run.
pub struct ClassTable {
    sources: RwLock<FxHashMap<String, Arc<ClassMeta>>>,
    /// `None` records a name the provider does not know.
    host: RwLock<FxHashMap<String, Option<Arc<ClassMeta>>>>,
    introspection: Mutex<()>,
    introspections: AtomicUsize,
    provider: Box<dyn ClassProvider>,
    max_depth: usize,
}

impl ClassTable {
    pub fn new(provider: impl ClassProvider + 'static) -> Self {
        Self {
            sources: RwLock::new(FxHashMap::default()),
            host: RwLock::new(FxHashMap::default()),
            introspection: Mutex::new(()),
            introspections: AtomicUsize::new(0),
            provider: Box::new(provider),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    // ========================================================================
    // Source set
    // ========================================================================

    /// Register a class declared in source.
    ///
    /// A second registration of the same name fails and leaves the first one
    /// in place.
    pub fn register_source(&self, meta: ClassMeta) -> Result<Arc<ClassMeta>> {
        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        if sources.contains_key(&meta.name) {
            return Err(CompileError::DuplicateClass { name: meta.name });
        }
        let meta = Arc::new(meta);
        trace!(class = %meta.name, "registered source class");
        sources.insert(meta.name.clone(), Arc::clone(&meta));
        Ok(meta)
    }

    /// Withdraw a registration made by `register_source`.
    ///
    /// Nothing happens unless `meta` is still the class registered under its
    /// name. Returns whether it was removed.
    pub fn unregister_source(&self, meta: &Arc<ClassMeta>) -> bool {
        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        match sources.get(&meta.name) {
            Some(current) if Arc::ptr_eq(current, meta) => {
                sources.remove(&meta.name);
                trace!(class = %meta.name, "unregistered source class");
                true
            }
            _ => false,
        }
    }

    pub fn is_source(&self, name: &str) -> bool {
        self.sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Number of registered source classes.
    pub fn source_count(&self) -> usize {
        self.sources.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Find a class by internal name.
    pub fn resolve_class(&self, name: &str) -> Result<Arc<ClassMeta>> {
        if let Some(meta) = self.cached(name) {
            trace!(class = name, "class cache hit");
            return meta.ok_or_else(|| unknown_class(name));
        }

        let _guard = self
            .introspection
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Another thread may have finished the same introspection while this
        // one waited.
        if let Some(meta) = self.cached(name) {
            trace!(class = name, "class cache hit after wait");
            return meta.ok_or_else(|| unknown_class(name));
        }

        trace!(class = name, "class cache miss, introspecting");
        self.introspections.fetch_add(1, Ordering::Relaxed);
        let loaded = self.provider.load(name)?.map(Arc::new);
        self.host
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), loaded.clone());
        loaded.ok_or_else(|| unknown_class(name))
    }

    /// `Some(None)` for a known miss, `None` when nothing is cached.
    fn cached(&self, name: &str) -> Option<Option<Arc<ClassMeta>>> {
        if let Some(meta) = self
            .sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Some(Some(Arc::clone(meta)));
        }
        self.host
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// How many times the provider has been consulted.
    pub fn introspection_count(&self) -> usize {
        self.introspections.load(Ordering::Relaxed)
    }

    pub fn is_interface(&self, name: &str) -> Result<bool> {
        Ok(self.resolve_class(name)?.is_interface)
    }

    // ========================================================================
    // Hierarchy search
    // ========================================================================

    /// Field lookup through the class and its ancestors.
    pub fn get_field(&self, class: &str, name: &str) -> Result<Option<FieldMeta>> {
        self.walk(class, false, |meta| meta.field(name).cloned())
    }

    /// Method lookup with an exact parameter list.
    ///
    /// Interfaces search their super-interfaces; classes search their base
    /// chain only.
    pub fn get_method(
        &self,
        class: &str,
        name: &str,
        params: &[TypeMeta],
    ) -> Result<Option<MethodMeta>> {
        self.walk(class, false, |meta| meta.method(name, params).cloned())
    }

    /// Walk the source-declared supertypes of `name`, failing on cycles and
    /// on chains deeper than the configured bound. Host classes end the walk.
    pub fn check_hierarchy(&self, name: &str) -> Result<()> {
        self.walk(name, true, |_| None::<()>).map(|_| ())
    }

    /// Depth-first walk from `start`, returning the first hit of `find`.
    ///
    /// Each entry carries the classes that led to it. Reaching a class a
    /// second time through another path (an interface diamond) skips it;
    /// reaching one of its own ancestors is a cycle.
    fn walk<T>(
        &self,
        start: &str,
        sources_only: bool,
        find: impl Fn(&ClassMeta) -> Option<T>,
    ) -> Result<Option<T>> {
        let mut visited = FxHashSet::default();
        let mut worklist = vec![(start.to_string(), Vec::<String>::new())];

        while let Some((name, ancestors)) = worklist.pop() {
            if ancestors.len() > self.max_depth {
                return Err(CompileError::MalformedHierarchy {
                    name: start.to_string(),
                    message: format!("deeper than {} levels", self.max_depth),
                });
            }
            if ancestors.contains(&name) {
                return Err(CompileError::MalformedHierarchy {
                    name: start.to_string(),
                    message: format!("{name} inherits from itself"),
                });
            }
            if !visited.insert(name.clone()) || (sources_only && !self.is_source(&name)) {
                continue;
            }
            let meta = self.resolve_class(&name)?;
            if let Some(found) = find(&meta) {
                return Ok(Some(found));
            }

            let mut chain = ancestors;
            chain.push(name);
            if meta.is_interface {
                // reversed so the first declared interface is popped first
                for iface in meta.interfaces.iter().rev() {
                    worklist.push((iface.clone(), chain.clone()));
                }
            } else if let Some(base) = &meta.base_class_name {
                worklist.push((base.clone(), chain));
            }
        }
        Ok(None)
    }
}

fn unknown_class(name: &str) -> CompileError {
    CompileError::UnknownClass {
        name: name.to_string(),
        span: Span::default(),
    }
}

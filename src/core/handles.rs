//! # Handle registry
//!
//! Owns one sensor handle per identifier.
//!
//! ```text
//! create(id)  ─► absent?  open() ─► insert           present? ─► DuplicateCreate (kept)
//! destroy(id) ─► remove (idempotent)
//! lookup(id)  ─► Some(handle)                          absent?  ─► HandleNotFound, None
//! ```
//!
//! ## Rules
//! - At most one handle per identifier; the first one wins.
//! - Handles are shared as `Arc` so a running stream can outlive `destroy`.
//! - Not synchronized on its own: the manager guards it with the session lock.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use crate::core::DiagnosticReporter;
use crate::error::ProgrammerError;

/// Identifier → handle map with misuse reporting.
pub(crate) struct HandleRegistry<K, H> {
    handles: HashMap<K, Arc<H>>,
    reporter: DiagnosticReporter,
}

impl<K, H> HandleRegistry<K, H>
where
    K: Eq + Hash + Clone + Debug,
{
    pub(crate) fn new(reporter: DiagnosticReporter) -> Self {
        Self {
            handles: HashMap::new(),
            reporter,
        }
    }

    /// Stores a handle built by `open` unless one already exists.
    ///
    /// Returns `true` if a new handle was stored. `open` is not called for a duplicate.
    pub(crate) fn create(&mut self, id: &K, open: impl FnOnce() -> H) -> bool {
        if self.handles.contains_key(id) {
            self.reporter.report(ProgrammerError::DuplicateCreate {
                id: format!("{id:?}"),
            });
            return false;
        }
        self.handles.insert(id.clone(), Arc::new(open()));
        true
    }

    /// Removes and returns the handle, if any.
    pub(crate) fn destroy(&mut self, id: &K) -> Option<Arc<H>> {
        self.handles.remove(id)
    }

    /// Returns the handle for `id`, reporting `HandleNotFound` on behalf of `op` if absent.
    pub(crate) fn lookup(&self, id: &K, op: &'static str) -> Option<Arc<H>> {
        let handle = self.handles.get(id).cloned();
        if handle.is_none() {
            self.reporter.report(ProgrammerError::HandleNotFound {
                id: format!("{id:?}"),
                op,
            });
        }
        handle
    }

    pub(crate) fn contains(&self, id: &K) -> bool {
        self.handles.contains_key(id)
    }

    pub(crate) fn ids(&self) -> Vec<K> {
        self.handles.keys().cloned().collect()
    }

    /// Removes every handle.
    pub(crate) fn drain(&mut self) -> Vec<(K, Arc<H>)> {
        self.handles.drain().collect()
    }
}

//! # Subscription registry
//!
//! Tracks the single active update stream per identifier.
//!
//! ```text
//! register(id, control) ─► slot free?  store, true      occupied? ─► false
//! cancel(id)            ─► control.cancel() ─► finished? remove   (end_updates + end of stream)
//! ```
//!
//! ## Rules
//! - A slot is free when empty or when its stream has fully finished (the
//!   consumer dropped it, or it failed). Finished entries are replaced lazily.
//! - A stream that is stopping but has not yet released the hardware still
//!   occupies its slot, even after `cancel`: no `begin_updates` may reach the
//!   handle before the previous `end_updates` returned.
//! - Not synchronized on its own: the manager guards it with the session lock.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use crate::sensor::StreamControl;

/// Identifier → active stream map.
pub(crate) struct SubscriptionRegistry<K> {
    streams: HashMap<K, Arc<StreamControl>>,
}

impl<K> SubscriptionRegistry<K>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            streams: HashMap::new(),
        }
    }

    /// True if `id` has a stream that has not finished yet.
    pub(crate) fn is_occupied(&self, id: &K) -> bool {
        self.streams.get(id).is_some_and(|c| !c.is_finished())
    }

    /// True if `id` has a stream that is still delivering.
    pub(crate) fn is_active(&self, id: &K) -> bool {
        self.streams.get(id).is_some_and(|c| !c.is_stopped())
    }

    /// Stores `control` unless the slot is occupied.
    pub(crate) fn register(&mut self, id: &K, control: &Arc<StreamControl>) -> bool {
        if self.is_occupied(id) {
            return false;
        }
        self.streams.insert(id.clone(), Arc::clone(control));
        true
    }

    /// Cancels the stream for `id` and removes it once finished. No-op if absent.
    ///
    /// A stream whose teardown is still running elsewhere (consumer drop,
    /// terminal error) keeps its slot until `end_updates` has returned.
    ///
    /// Returns `true` if a live stream was stopped by this call.
    pub(crate) fn cancel(&mut self, id: &K) -> bool {
        let Some(control) = self.streams.get(id) else {
            return false;
        };
        let stopped = control.cancel();
        if control.is_finished() {
            self.streams.remove(id);
        }
        stopped
    }

    /// Cancels every stream, keeping those still tearing down. Returns how many were live.
    pub(crate) fn cancel_all(&mut self) -> usize {
        let mut stopped = 0;
        self.streams.retain(|_, control| {
            if control.cancel() {
                stopped += 1;
            }
            !control.is_finished()
        });
        stopped
    }

    /// Identifiers with a stream that is still delivering.
    pub(crate) fn active_ids(&self) -> Vec<K> {
        self.streams
            .iter()
            .filter(|(_, c)| !c.is_stopped())
            .map(|(id, _)| id.clone())
            .collect()
    }
}

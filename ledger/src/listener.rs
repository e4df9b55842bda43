//! Copy-on-write block-listener registry.
//!
//! Observers outside the parser context may add or remove listeners while a
//! notification is in flight. Notification iterates an immutable snapshot of
//! the listener list; mutations swap in a fresh list and never touch the one
//! being iterated.

use crate::block::Block;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

pub type BlockListener = Arc<dyn Fn(&Block) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ListenerList = Arc<Vec<(ListenerId, BlockListener)>>;

/// Shared registry; clones refer to the same listener set.
#[derive(Clone, Default)]
pub struct BlockListeners {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    listeners: RwLock<ListenerList>,
    next_id: AtomicU64,
}

impl BlockListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: BlockListener) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.update(|list| list.push((id, listener)));
        id
    }

    /// Returns whether a listener was removed.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut removed = false;
        self.update(|list| {
            let before = list.len();
            list.retain(|(lid, _)| *lid != id);
            removed = list.len() != before;
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every listener registered at the time of the call.
    pub fn notify(&self, block: &Block) {
        let listeners = self.snapshot();
        for (_, listener) in listeners.iter() {
            listener(block);
        }
    }

    fn snapshot(&self) -> ListenerList {
        // A panicking listener cannot leave the list half-written: writers
        // only ever replace the Arc.
        let guard = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&*guard)
    }

    fn update(&self, f: impl FnOnce(&mut Vec<(ListenerId, BlockListener)>)) {
        let mut guard = self
            .inner
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut next: Vec<_> = (**guard).clone();
        f(&mut next);
        *guard = Arc::new(next);
    }
}

impl std::fmt::Debug for BlockListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockListeners")
            .field("len", &self.len())
            .finish()
    }
}

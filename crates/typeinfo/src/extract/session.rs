//! Per-unit extraction state.
//!
//! A [`Session`] bundles the set of type names already emitted with the
//! worklist of types still to process. One session is used per source unit
//! and reset before the next one.
//!
//! A name is queued at most once per session. Names referenced without a
//! descriptor of their own are recorded the same way but never queued.

use std::collections::HashSet;

use typeinfo_core::identifier::Id;

/// Set of type names, keyed by canonical name.
#[derive(Debug, Default)]
pub struct VisitedSet {
    names: HashSet<Id>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: Id) -> bool {
        self.names.contains(&name)
    }

    /// Marks `name` as visited.
    ///
    /// Returns `false` if it was already present.
    pub fn insert(&mut self, name: Id) -> bool {
        self.names.insert(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }
}

/// Ordered worklist that may grow while it is being drained.
///
/// Entries are never removed; a read cursor tracks how many have been
/// handed out, so items appended during processing are picked up in order.
#[derive(Debug)]
pub struct PendingQueue<T> {
    items: Vec<T>,
    cursor: usize,
}

impl<T> Default for PendingQueue<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            cursor: 0,
        }
    }
}

impl<T: Copy> PendingQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    /// Returns the next unprocessed entry and advances the cursor.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<T> {
        let item = self.items.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(item)
    }

    /// Total number of entries pushed since the last reset.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of entries handed out by [`PendingQueue::next`].
    pub fn processed(&self) -> usize {
        self.cursor
    }

    pub fn reset(&mut self) {
        self.items.clear();
        self.cursor = 0;
    }
}

/// Extraction state for one source unit.
#[derive(Debug)]
pub struct Session<T> {
    /// Names already emitted.
    pub visited: VisitedSet,
    /// Names already queued or referenced by name.
    pub queued: VisitedSet,
    pub pending: PendingQueue<T>,
}

impl<T> Default for Session<T> {
    fn default() -> Self {
        Self {
            visited: VisitedSet::default(),
            queued: VisitedSet::default(),
            pending: PendingQueue::default(),
        }
    }
}

impl<T: Copy> Session<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `ty` unless a type named `name` was already emitted or
    /// queued.
    pub fn enqueue_unseen(&mut self, name: Id, ty: T) -> bool {
        if self.visited.contains(name) || !self.queued.insert(name) {
            return false;
        }
        self.pending.push(ty);
        true
    }

    /// Records a name that has no descriptor to build.
    ///
    /// Returns `false` if it was already recorded or queued.
    pub fn note_opaque(&mut self, name: Id) -> bool {
        self.queued.insert(name)
    }

    /// Clears the name sets and the queue.
    pub fn reset(&mut self) {
        self.visited.clear();
        self.queued.clear();
        self.pending.reset();
    }
}

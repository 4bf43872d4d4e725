//! Reference-counted cache of model assets, keyed by model id.
//!
//! Engine-agnostic: the registry never loads or frees anything itself. It
//! tells the caller when a load must be started ([`Acquire::Started`]), who is
//! waiting on a load, and which asset must be freed once its last holder lets
//! go ([`Release::Evicted`]).

use bevy::platform::collections::HashMap;

/// Identifies one waiter on an in-flight load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

/// Outcome of [`AssetRegistry::acquire`].
#[derive(Debug, PartialEq)]
pub enum Acquire<A> {
    /// Cached; the reference count was incremented.
    Ready(A),
    /// A load is already running; the ticket resolves with it.
    Pending(LoadTicket),
    /// No entry existed; the caller must start exactly one load for this id.
    Started(LoadTicket),
}

/// Outcome of [`AssetRegistry::complete`].
#[derive(Debug, PartialEq)]
pub enum Completion<A, E> {
    /// The entry is now cached with one reference per waiter.
    Resolved { asset: A, waiters: Vec<LoadTicket> },
    /// Every waiter was cancelled while loading; free `asset` immediately.
    Orphaned(A),
    /// The load failed; the entry was dropped so the next acquire retries.
    Failed { error: E, waiters: Vec<LoadTicket> },
}

/// Outcome of a successful [`AssetRegistry::release`].
#[derive(Debug, PartialEq)]
pub enum Release<A> {
    /// Other holders remain.
    Retained(u32),
    /// The count reached zero; the entry was removed and `A` must be freed.
    Evicted(A),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("model `{0}` is not held by anyone")]
    NotHeld(String),
}

#[derive(Debug)]
enum Entry<A> {
    Loading { waiters: Vec<LoadTicket> },
    Ready { asset: A, ref_count: u32 },
}

/// Shared asset cache with at most one load in flight per model id.
#[derive(Debug)]
pub struct AssetRegistry<A> {
    entries: HashMap<String, Entry<A>>,
    next_ticket: u64,
    loads_started: u64,
}

impl<A> Default for AssetRegistry<A> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            next_ticket: 0,
            loads_started: 0,
        }
    }
}

impl<A: Clone> AssetRegistry<A> {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    fn issue_ticket(&mut self) -> LoadTicket {
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    /// Takes a reference to `model_id`, joining or starting a load if needed.
    ///
    /// The count of a pending load is incremented once it resolves, one per
    /// surviving waiter.
    pub fn acquire(&mut self, model_id: &str) -> Acquire<A> {
        if let Some(Entry::Ready { asset, ref_count }) = self.entries.get_mut(model_id) {
            *ref_count += 1;
            return Acquire::Ready(asset.clone());
        }

        let ticket = self.issue_ticket();
        match self.entries.get_mut(model_id) {
            Some(Entry::Loading { waiters }) => {
                waiters.push(ticket);
                Acquire::Pending(ticket)
            }
            _ => {
                self.entries.insert(
                    model_id.to_owned(),
                    Entry::Loading {
                        waiters: vec![ticket],
                    },
                );
                self.loads_started += 1;
                Acquire::Started(ticket)
            }
        }
    }

    /// Withdraws a waiter whose owner went away before the load resolved.
    ///
    /// Returns `false` if the ticket was not waiting on `model_id`.
    pub fn cancel(&mut self, model_id: &str, ticket: LoadTicket) -> bool {
        let Some(Entry::Loading { waiters }) = self.entries.get_mut(model_id) else {
            return false;
        };
        let before = waiters.len();
        waiters.retain(|t| *t != ticket);
        waiters.len() != before
    }

    /// Resolves the in-flight load for `model_id`.
    ///
    /// A result arriving for an id with no pending load is reported as
    /// [`Completion::Orphaned`] (or a failure with no waiters).
    pub fn complete<E>(&mut self, model_id: &str, result: Result<A, E>) -> Completion<A, E> {
        let waiters = match self.entries.remove(model_id) {
            Some(Entry::Loading { waiters }) => waiters,
            Some(ready @ Entry::Ready { .. }) => {
                self.entries.insert(model_id.to_owned(), ready);
                Vec::new()
            }
            None => Vec::new(),
        };

        match result {
            Err(error) => Completion::Failed { error, waiters },
            Ok(asset) if waiters.is_empty() => Completion::Orphaned(asset),
            Ok(asset) => {
                self.entries.insert(
                    model_id.to_owned(),
                    Entry::Ready {
                        asset: asset.clone(),
                        ref_count: waiters.len() as u32,
                    },
                );
                Completion::Resolved { asset, waiters }
            }
        }
    }

    /// Drops one reference; evicts the entry when the count reaches zero.
    pub fn release(&mut self, model_id: &str) -> Result<Release<A>, RegistryError> {
        let Some(Entry::Ready { ref_count, .. }) = self.entries.get_mut(model_id) else {
            return Err(RegistryError::NotHeld(model_id.to_owned()));
        };
        *ref_count = ref_count.saturating_sub(1);
        if *ref_count > 0 {
            return Ok(Release::Retained(*ref_count));
        }
        match self.entries.remove(model_id) {
            Some(Entry::Ready { asset, .. }) => Ok(Release::Evicted(asset)),
            _ => Err(RegistryError::NotHeld(model_id.to_owned())),
        }
    }

    /// Current reference count; zero for loading or unknown ids.
    #[cfg(test)]
    pub fn ref_count(&self, model_id: &str) -> u32 {
        match self.entries.get(model_id) {
            Some(Entry::Ready { ref_count, .. }) => *ref_count,
            _ => 0,
        }
    }

    #[cfg(test)]
    pub fn is_loading(&self, model_id: &str) -> bool {
        matches!(self.entries.get(model_id), Some(Entry::Loading { .. }))
    }

    /// Cached asset for `model_id`, without touching its count.
    #[cfg(test)]
    pub fn get(&self, model_id: &str) -> Option<&A> {
        match self.entries.get(model_id) {
            Some(Entry::Ready { asset, .. }) => Some(asset),
            _ => None,
        }
    }

    /// Total loads ever started.
    pub fn loads_started(&self) -> u64 {
        self.loads_started
    }

    /// Number of entries, loading or ready.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

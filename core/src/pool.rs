use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BulletId(pub u64);

impl BulletId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BulletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Receipt for a queued spawn. Tickets follow enqueue order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PendingSpawn {
    pub ticket: u64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Realized {
    pub ticket: u64,
    pub id: BulletId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolError {
    NotLive(BulletId),
}

impl PoolError {
    pub fn code(&self) -> &'static str {
        match self {
            PoolError::NotLive(_) => "E_POOL_NOT_LIVE",
        }
    }
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::NotLive(id) => write!(f, "{} instance {} is not live", self.code(), id),
        }
    }
}

impl std::error::Error for PoolError {}

struct QueueState<T> {
    next_ticket: u64,
    items: VecDeque<(u64, T)>,
}

/// Producer side of the spawn queue. Cloneable and shareable across threads;
/// the pool drains it once per tick boundary.
pub struct SpawnHandle<T> {
    inner: Arc<Mutex<QueueState<T>>>,
}

impl<T> Clone for SpawnHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SpawnHandle<T> {
    fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(QueueState {
                next_ticket: 1,
                items: VecDeque::new(),
            })),
        }
    }

    pub fn enqueue(&self, payload: T) -> PendingSpawn {
        let mut state = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.items.push_back((ticket, payload));
        PendingSpawn { ticket }
    }

    pub fn len(&self) -> usize {
        let state = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn drain(&self) -> Vec<(u64, T)> {
        let mut state = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.items.drain(..).collect()
    }
}

pub struct Slot<T> {
    id: BulletId,
    alive: bool,
    pub value: T,
}

impl<T> Slot<T> {
    pub fn id(&self) -> BulletId {
        self.id
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Marks the slot dead. It stays visible until the next compaction.
    pub fn kill(&mut self) {
        self.alive = false;
    }
}

/// Owns live instances in realization order.
///
/// Ids come from a monotonic counter and are never reused. Slots are appended
/// on realization and compaction keeps relative order, so the slot list stays
/// sorted by id and lookups are binary searches.
pub struct InstancePool<T> {
    slots: Vec<Slot<T>>,
    next_id: u64,
    spawns: SpawnHandle<T>,
}

impl<T> Default for InstancePool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> InstancePool<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            next_id: 1,
            spawns: SpawnHandle::new(),
        }
    }

    pub fn spawn_handle(&self) -> SpawnHandle<T> {
        self.spawns.clone()
    }

    pub fn enqueue(&self, payload: T) -> PendingSpawn {
        self.spawns.enqueue(payload)
    }

    pub fn pending_len(&self) -> usize {
        self.spawns.len()
    }

    /// Drains the spawn queue in enqueue order and appends each request as a
    /// live slot. Requests queued after this call wait for the next boundary.
    pub fn realize_pending(&mut self) -> Vec<Realized> {
        let drained = self.spawns.drain();
        let mut realized = Vec::with_capacity(drained.len());
        for (ticket, value) in drained {
            let id = BulletId(self.next_id);
            self.next_id += 1;
            self.slots.push(Slot {
                id,
                alive: true,
                value,
            });
            realized.push(Realized { ticket, id });
        }
        realized
    }

    fn index_of(&self, id: BulletId) -> Option<usize> {
        self.slots.binary_search_by_key(&id, |slot| slot.id).ok()
    }

    /// Live instances only; a deleted id never comes back from here.
    pub fn get(&self, id: BulletId) -> Option<&T> {
        let slot = &self.slots[self.index_of(id)?];
        slot.alive.then_some(&slot.value)
    }

    pub fn get_mut(&mut self, id: BulletId) -> Option<&mut T> {
        let idx = self.index_of(id)?;
        let slot = &mut self.slots[idx];
        if slot.alive {
            Some(&mut slot.value)
        } else {
            None
        }
    }

    /// Includes instances marked dead this tick and not yet compacted.
    pub fn slot(&self, id: BulletId) -> Option<&Slot<T>> {
        self.index_of(id).map(|idx| &self.slots[idx])
    }

    pub fn is_live(&self, id: BulletId) -> bool {
        self.slot(id).map(Slot::is_alive).unwrap_or(false)
    }

    pub fn delete(&mut self, id: BulletId) -> Result<(), PoolError> {
        let idx = self.index_of(id).ok_or(PoolError::NotLive(id))?;
        let slot = &mut self.slots[idx];
        if !slot.alive {
            return Err(PoolError::NotLive(id));
        }
        slot.alive = false;
        Ok(())
    }

    /// Removes dead slots in one pass and returns their ids in order.
    pub fn compact(&mut self) -> Vec<BulletId> {
        let mut removed = Vec::new();
        self.slots.retain(|slot| {
            if !slot.alive {
                removed.push(slot.id);
            }
            slot.alive
        });
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slot<T>> {
        self.slots.iter()
    }

    pub fn iter_alive(&self) -> impl Iterator<Item = &Slot<T>> {
        self.slots.iter().filter(|slot| slot.alive)
    }

    pub fn slots_mut(&mut self) -> &mut [Slot<T>] {
        &mut self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.iter_alive().count()
    }
}

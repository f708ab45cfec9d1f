//! Recency-ordered object index.
//!
//! Cached objects live in a slot arena and are threaded onto an intrusive
//! doubly-linked list, most-recently-used first. Entries are addressed by
//! stable [`ObjectHandle`]s — both the id lookup map and the scan cursor
//! hold handles, never positions that could be invalidated by removals.
//! Lookup, promotion, insertion and removal are all O(1).

use std::collections::HashMap;
use std::time::Instant;

use tracing::warn;

/// A cached object. Identity is `id`; `size` is accounted against the cache
/// capacity; `inserted_at` drives the minimum-eviction-age guard.
#[derive(Debug, Clone)]
pub struct CachedObject {
    pub id: u64,
    pub size: u64,
    pub inserted_at: Instant,
    pub last_access: Instant,
}

impl CachedObject {
    pub fn new(id: u64, size: u64, now: Instant) -> Self {
        Self {
            id,
            size,
            inserted_at: now,
            last_access: now,
        }
    }
}

/// Stable address of an entry in the index's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle(usize);

#[derive(Debug)]
struct Slot {
    obj: CachedObject,
    /// Toward the MRU end.
    prev: Option<ObjectHandle>,
    /// Toward the LRU end.
    next: Option<ObjectHandle>,
}

/// Recency list + id lookup over a slot arena.
#[derive(Debug, Default)]
pub struct ObjectIndex {
    slots: Vec<Option<Slot>>,
    free_list: Vec<usize>,
    head: Option<ObjectHandle>,
    tail: Option<ObjectHandle>,
    map: HashMap<u64, ObjectHandle>,
    len: usize,
}

impl ObjectIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Handle of the entry with the given id, if cached.
    pub fn lookup(&self, id: u64) -> Option<ObjectHandle> {
        let handle = self.map.get(&id).copied()?;
        if self.slot(handle).is_none() {
            // The map claims an id the arena no longer holds. This is a
            // bookkeeping invariant violation; the arena wins.
            debug_assert!(false, "id {id} maps to a dead slot");
            warn!(id, "object index self-heal: dropping id mapped to a dead slot");
            return None;
        }
        Some(handle)
    }

    /// The object behind a handle, if still present.
    pub fn get(&self, handle: ObjectHandle) -> Option<&CachedObject> {
        self.slot(handle).map(|s| &s.obj)
    }

    /// Most-recently-used entry.
    pub fn front(&self) -> Option<ObjectHandle> {
        self.head
    }

    /// Least-recently-used entry.
    pub fn back(&self) -> Option<ObjectHandle> {
        self.tail
    }

    /// Entry following `handle` toward the LRU end.
    pub fn next_toward_lru(&self, handle: ObjectHandle) -> Option<ObjectHandle> {
        self.slot(handle).and_then(|s| s.next)
    }

    /// Insert a new object at the MRU end. The id must not already be
    /// present; the caller routes repeat accesses through promotion.
    pub fn insert_front(&mut self, obj: CachedObject) -> ObjectHandle {
        debug_assert!(!self.map.contains_key(&obj.id));
        let id = obj.id;
        let slot = Slot {
            obj,
            prev: None,
            next: self.head,
        };
        let idx = if let Some(idx) = self.free_list.pop() {
            self.slots[idx] = Some(slot);
            idx
        } else {
            self.slots.push(Some(slot));
            self.slots.len() - 1
        };
        let handle = ObjectHandle(idx);

        if let Some(old_head) = self.head {
            if let Some(s) = self.slot_mut(old_head) {
                s.prev = Some(handle);
            }
        } else {
            self.tail = Some(handle);
        }
        self.head = Some(handle);
        self.map.insert(id, handle);
        self.len += 1;
        debug_assert_eq!(self.map.len(), self.len);
        handle
    }

    /// Move an existing entry to the MRU end.
    pub fn promote_to_front(&mut self, handle: ObjectHandle) {
        if self.head == Some(handle) || self.slot(handle).is_none() {
            return;
        }
        self.unlink(handle);
        let old_head = self.head;
        if let Some(s) = self.slot_mut(handle) {
            s.prev = None;
            s.next = old_head;
        }
        if let Some(h) = old_head {
            if let Some(s) = self.slot_mut(h) {
                s.prev = Some(handle);
            }
        } else {
            self.tail = Some(handle);
        }
        self.head = Some(handle);
    }

    /// Refresh an entry's last-access time.
    pub fn touch(&mut self, handle: ObjectHandle, now: Instant) {
        if let Some(s) = self.slot_mut(handle) {
            s.obj.last_access = now;
        }
    }

    /// Remove an entry, returning the removed object and the handle of its
    /// successor in recency order — exactly what a scan cursor parked on
    /// the removed entry should advance to.
    pub fn remove(&mut self, handle: ObjectHandle) -> Option<(CachedObject, Option<ObjectHandle>)> {
        self.slot(handle)?;
        let successor = self.slot(handle).and_then(|s| s.next);
        self.unlink(handle);

        let slot = self.slots[handle.0].take()?;
        self.free_list.push(handle.0);
        self.len -= 1;

        if self.map.remove(&slot.obj.id).is_none() {
            debug_assert!(false, "removed id {} was not in the lookup map", slot.obj.id);
            warn!(id = slot.obj.id, "object index self-heal: removed entry missing from map");
        }
        debug_assert_eq!(self.map.len(), self.len);
        Some((slot.obj, successor))
    }

    fn unlink(&mut self, handle: ObjectHandle) {
        let (prev, next) = match self.slot(handle) {
            Some(s) => (s.prev, s.next),
            None => return,
        };
        match prev {
            Some(p) => {
                if let Some(s) = self.slot_mut(p) {
                    s.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(s) = self.slot_mut(n) {
                    s.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    fn slot(&self, handle: ObjectHandle) -> Option<&Slot> {
        self.slots.get(handle.0).and_then(|s| s.as_ref())
    }

    fn slot_mut(&mut self, handle: ObjectHandle) -> Option<&mut Slot> {
        self.slots.get_mut(handle.0).and_then(|s| s.as_mut())
    }

    /// Ids in recency order, MRU first. Test and diagnostics helper.
    pub fn ids_mru_to_lru(&self) -> Vec<u64> {
        let mut ids = Vec::with_capacity(self.len);
        let mut cursor = self.head;
        while let Some(h) = cursor {
            let slot = match self.slot(h) {
                Some(s) => s,
                None => break,
            };
            ids.push(slot.obj.id);
            cursor = slot.next;
        }
        ids
    }

    /// Sum of the sizes of all indexed objects.
    pub fn total_size(&self) -> u64 {
        self.slots
            .iter()
            .flatten()
            .map(|s| s.obj.size)
            .sum()
    }
}

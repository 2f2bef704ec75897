//! Slab-backed doubly linked lists.
//!
//! Entries live in a [`Slab`] and are addressed by [`SlotId`]. A [`Chain`] is
//! one list threaded through the slab: the LRU container uses a single chain,
//! the LFU container one chain per frequency. Linking, unlinking and moving
//! an entry between chains are all O(1).
//!
//! ```text
//!   slab                                chain (head = MRU, tail = LRU)
//!   ┌────┬──────────────────────────┐
//!   │ 0  │ { A, prev: -, next: 2 }  │   head ─► [0] ◄──► [2] ◄──► [1] ◄── tail
//!   │ 1  │ { C, prev: 2, next: - }  │
//!   │ 2  │ { B, prev: 0, next: 1 }  │
//!   └────┴──────────────────────────┘
//! ```

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

/// Head, tail and length of one list threaded through a [`Slab`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Chain {
    head: Option<SlotId>,
    tail: Option<SlotId>,
    len: usize,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Least recently linked entry.
    pub fn back(&self) -> Option<SlotId> {
        self.tail
    }
}

#[derive(Debug)]
struct Slot<T> {
    value: T,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

/// Arena of list nodes with slot reuse.
#[derive(Debug)]
pub struct Slab<T> {
    slots: Vec<Option<Slot<T>>>,
    free: Vec<usize>,
}

impl<T> Slab<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Number of occupied slots.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Stores `value` in a free slot. The node is not linked into any chain.
    pub fn insert(&mut self, value: T) -> SlotId {
        let slot = Some(Slot {
            value,
            prev: None,
            next: None,
        });
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = slot;
                idx
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        };
        SlotId(idx)
    }

    /// Frees the slot and returns its value. The node must already be unlinked.
    pub fn take(&mut self, id: SlotId) -> Option<T> {
        let slot = self.slots.get_mut(id.0)?.take()?;
        self.free.push(id.0);
        Some(slot.value)
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slot(id).map(|slot| &slot.value)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slot_mut(id).map(|slot| &mut slot.value)
    }

    /// Links an unlinked node at the head of `chain`.
    pub fn push_front(&mut self, chain: &mut Chain, id: SlotId) {
        let old_head = chain.head;
        if let Some(slot) = self.slot_mut(id) {
            slot.prev = None;
            slot.next = old_head;
        } else {
            return;
        }
        match old_head.and_then(|head| self.slot_mut(head)) {
            Some(head) => head.prev = Some(id),
            None => chain.tail = Some(id),
        }
        chain.head = Some(id);
        chain.len += 1;
    }

    /// Unlinks a node from `chain`, leaving it stored in the slab.
    pub fn unlink(&mut self, chain: &mut Chain, id: SlotId) {
        let (prev, next) = match self.slot_mut(id) {
            Some(slot) => (slot.prev.take(), slot.next.take()),
            None => return,
        };

        match prev.and_then(|p| self.slot_mut(p)) {
            Some(prev_slot) => prev_slot.next = next,
            None => chain.head = next,
        }
        match next.and_then(|n| self.slot_mut(n)) {
            Some(next_slot) => next_slot.prev = prev,
            None => chain.tail = prev,
        }
        chain.len -= 1;
    }

    /// Moves a node already in `chain` to its head.
    pub fn move_to_front(&mut self, chain: &mut Chain, id: SlotId) {
        if chain.head == Some(id) {
            return;
        }
        self.unlink(chain, id);
        self.push_front(chain, id);
    }

    /// Walks `chain` from head to tail.
    #[cfg(test)]
    pub fn iter<'a>(&'a self, chain: &Chain) -> impl Iterator<Item = &'a T> + 'a {
        let mut current = chain.head;
        std::iter::from_fn(move || {
            let slot = self.slot(current?)?;
            current = slot.next;
            Some(&slot.value)
        })
    }

    fn slot(&self, id: SlotId) -> Option<&Slot<T>> {
        self.slots.get(id.0).and_then(|slot| slot.as_ref())
    }

    fn slot_mut(&mut self, id: SlotId) -> Option<&mut Slot<T>> {
        self.slots.get_mut(id.0).and_then(|slot| slot.as_mut())
    }
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Copyright (c) 2024-present, Andrew Werner
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

#![allow(clippy::indexing_slicing)]

/// Index of a node in an [`Arena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One forward pointer of a tower and the number of base-level positions it
/// covers, counting the destination. On the last node of a level `next` is
/// `None` and `span` counts the nodes left after it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Link {
    pub(crate) next: Option<NodeId>,
    pub(crate) span: usize,
}

pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    // Sized to the node's height, which never changes.
    pub(crate) tower: Box<[Link]>,
}

enum Slot<K, V> {
    Occupied(Node<K, V>),
    Vacant { next_free: Option<NodeId> },
}

/// Node storage. Freed slots are threaded into a free list and handed out
/// again before the backing vector grows.
pub(crate) struct Arena<K, V> {
    slots: Vec<Slot<K, V>>,
    free: Option<NodeId>,
}

impl<K, V> Default for Arena<K, V> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: None,
        }
    }
}

impl<K, V> Arena<K, V> {
    pub(crate) fn alloc(&mut self, key: K, value: V, height: usize) -> NodeId {
        let node = Node {
            key,
            value,
            tower: vec![Link::default(); height].into_boxed_slice(),
        };
        if let Some(id) = self.free {
            let slot = &mut self.slots[id.index()];
            match slot {
                Slot::Vacant { next_free } => self.free = *next_free,
                Slot::Occupied(_) => unreachable!("free list points at a live node"),
            }
            *slot = Slot::Occupied(node);
            return id;
        }
        let id = match u32::try_from(self.slots.len()) {
            Ok(index) if index < u32::MAX => NodeId(index),
            _ => panic!("skip map arena is limited to {} nodes", u32::MAX),
        };
        self.slots.push(Slot::Occupied(node));
        id
    }

    /// Releases the slot and hands the node back to the caller.
    pub(crate) fn free(&mut self, id: NodeId) -> Node<K, V> {
        let vacant = Slot::Vacant {
            next_free: self.free,
        };
        match std::mem::replace(&mut self.slots[id.index()], vacant) {
            Slot::Occupied(node) => {
                self.free = Some(id);
                node
            }
            Slot::Vacant { .. } => unreachable!("double free of arena slot {}", id.0),
        }
    }

    pub(crate) fn get(&self, id: NodeId) -> &Node<K, V> {
        match &self.slots[id.index()] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => unreachable!("dangling link to arena slot {}", id.0),
        }
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        match &mut self.slots[id.index()] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => unreachable!("dangling link to arena slot {}", id.0),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free = None;
    }
}

#[cfg(test)]
impl<K, V> Arena<K, V> {
    pub(crate) fn live(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Occupied(_)))
            .count()
    }

    // Every vacant slot must sit on the free list exactly once.
    pub(crate) fn check_integrity(&self) {
        let mut on_free_list = 0;
        let mut cursor = self.free;
        while let Some(id) = cursor {
            on_free_list += 1;
            assert!(on_free_list <= self.slots.len(), "free list cycle");
            match &self.slots[id.index()] {
                Slot::Vacant { next_free } => cursor = *next_free,
                Slot::Occupied(_) => panic!("free list points at a live node"),
            }
        }
        assert_eq!(self.live() + on_free_list, self.slots.len(), "leaked slots");
    }
}

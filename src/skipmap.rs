// Copyright (c) 2024-present, Andrew Werner
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

#![allow(clippy::indexing_slicing)]

use std::{
    borrow::Borrow,
    cmp::Ordering,
    fmt,
    iter::FusedIterator,
    time::{SystemTime, UNIX_EPOCH},
};

use log::{debug, trace};
use rand::{rngs::SmallRng, RngCore, SeedableRng};

use crate::{
    arena::{Arena, Link, NodeId},
    options::{Options, OptionsError, MAX_HEIGHT},
};

/// Where a descent stopped on one level: the last node whose key is below the
/// target (`None` is the head) and that node's rank.
#[derive(Clone, Copy, Debug, Default)]
struct Splice {
    prev: Option<NodeId>,
    rank: usize,
}

type Splices = [Splice; MAX_HEIGHT];

/// A `SkipMap` is an ordered map like a `BTreeMap` that also
/// answers positional queries: [`rank`](Self::rank) finds where a
/// key sits and [`select`](Self::select) finds what sits at a position.
///
/// Node heights come from the random source `R`, which is
/// seeded from the clock by [`SkipMap::new`] and can be injected
/// with [`SkipMap::with_rng`] for reproducible layouts.
pub struct SkipMap<K, V, R = SmallRng> {
    arena: Arena<K, V>,
    // The sentinel tower, `max_height` links tall.
    head: Box<[Link]>,
    // Levels currently in use. Zero only while the map is empty.
    height: usize,
    len: usize,
    options: Options,
    promote_threshold: u32,
    rng: R,
}

impl<K, V> SkipMap<K, V> {
    /// New constructs an empty `[SkipMap]` with default options
    /// and a generator seeded from the system clock.
    pub fn new() -> Self {
        Self::with_rng(SmallRng::seed_from_u64(clock_seed()))
    }
}

impl<K, V> Default for SkipMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos() as u64)
}

impl<K, V, R: RngCore> SkipMap<K, V, R> {
    /// Constructs an empty map with default options that draws
    /// node heights from `rng`.
    pub fn with_rng(rng: R) -> Self {
        Self::build(Options::default(), rng)
    }

    /// Constructs an empty map with custom options.
    ///
    /// # Errors
    ///
    /// Fails if `options` do not pass [`Options::validate`].
    pub fn with_options(options: Options, rng: R) -> Result<Self, OptionsError> {
        options.validate()?;
        debug!(
            "skip map with max height {} and promotion probability {}",
            options.get_max_height(),
            options.get_probability()
        );
        Ok(Self::build(options, rng))
    }

    fn build(options: Options, rng: R) -> Self {
        Self {
            arena: Arena::default(),
            head: vec![Link::default(); options.get_max_height()].into_boxed_slice(),
            height: 0,
            len: 0,
            options,
            promote_threshold: options.promote_threshold(),
            rng,
        }
    }

    fn random_height(&mut self) -> usize {
        let mut height = 1;
        while height < self.options.get_max_height()
            && self.rng.next_u32() < self.promote_threshold
        {
            height += 1;
        }
        height
    }
}

impl<K, V, R> SkipMap<K, V, R> {
    /// The number of entries in the map.
    pub fn len(&self) -> usize {
        self.len
    }

    /// The map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of levels currently in use.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The options the map was built with.
    pub fn options(&self) -> Options {
        self.options
    }

    /// Drops every entry. Options and the random source are kept.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.head.fill(Link::default());
        self.height = 0;
        self.len = 0;
    }

    /// Iter constructs an iterator over the entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            arena: &self.arena,
            next: self.head[0].next,
            remaining: self.len,
        }
    }

    /// Calls `visit` on each entry in ascending key order until it
    /// returns `false`.
    pub fn ascend<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        for (key, value) in self {
            if !visit(key, value) {
                break;
            }
        }
    }

    /// Returns the entry at the 1-based position `rank`, or `None`
    /// when `rank` is 0 or greater than [`len`](Self::len).
    pub fn select(&self, rank: usize) -> Option<(&K, &V)> {
        if rank == 0 || rank > self.len {
            return None;
        }
        let mut at = None;
        let mut traversed = 0;
        for level in (0..self.height).rev() {
            while let Link {
                next: Some(next),
                span,
            } = self.tower(at)[level]
            {
                if traversed + span > rank {
                    break;
                }
                traversed += span;
                at = Some(next);
            }
            if traversed == rank {
                break;
            }
        }
        match at {
            Some(id) if traversed == rank => {
                let node = self.arena.get(id);
                Some((&node.key, &node.value))
            }
            _ => None,
        }
    }

    /// The entry with the smallest key.
    pub fn first(&self) -> Option<(&K, &V)> {
        self.head[0].next.map(|id| {
            let node = self.arena.get(id);
            (&node.key, &node.value)
        })
    }

    /// The entry with the largest key.
    pub fn last(&self) -> Option<(&K, &V)> {
        self.select(self.len)
    }

    fn tower(&self, at: Option<NodeId>) -> &[Link] {
        match at {
            None => &self.head,
            Some(id) => &self.arena.get(id).tower,
        }
    }

    fn link_mut(&mut self, at: Option<NodeId>, level: usize) -> &mut Link {
        match at {
            None => &mut self.head[level],
            Some(id) => &mut self.arena.get_mut(id).tower[level],
        }
    }
}

impl<K, V, R> SkipMap<K, V, R>
where
    K: Ord,
{
    // Walks from the top level down to the base. On every level it stops at the
    // last node whose key is below `key` and reports that stop to `record`.
    // The base-level stop is returned.
    fn descend<Q>(&self, key: &Q, mut record: impl FnMut(usize, Splice)) -> Splice
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut at = Splice::default();
        for level in (0..self.height).rev() {
            while let Link {
                next: Some(next),
                span,
            } = self.tower(at.prev)[level]
            {
                if self.arena.get(next).key.borrow().cmp(key) != Ordering::Less {
                    break;
                }
                at.rank += span;
                at.prev = Some(next);
            }
            record(level, at);
        }
        at
    }

    // The base-level successor of `splice`, if its key equals `key`.
    fn matching<Q>(&self, splice: Splice, key: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let next = self.tower(splice.prev)[0].next?;
        (self.arena.get(next).key.borrow() == key).then_some(next)
    }

    fn find<Q>(&self, key: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let base = self.descend(key, |_, _| {});
        self.matching(base, key)
    }

    /// Returns a reference to the value stored under `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(|id| &self.arena.get(id).value)
    }

    /// Returns the stored key and its value.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(|id| {
            let node = self.arena.get(id);
            (&node.key, &node.value)
        })
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let id = self.find(key)?;
        Some(&mut self.arena.get_mut(id).value)
    }

    /// The map holds an entry for `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Returns the 1-based position of `key` in ascending order.
    ///
    /// An absent key has rank 0. This is not the position the key
    /// would be inserted at.
    pub fn rank<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let base = self.descend(key, |_, _| {});
        match self.matching(base, key) {
            Some(_) => base.rank + 1,
            None => 0,
        }
    }

    /// Removes `key`, returning the entry it held.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut splices: Splices = [Splice::default(); MAX_HEIGHT];
        let base = self.descend(key, |level, splice| splices[level] = splice);
        let target = self.matching(base, key)?;

        let tower = std::mem::take(&mut self.arena.get_mut(target).tower);
        for (level, splice) in splices.iter().enumerate().take(self.height) {
            let link = self.link_mut(splice.prev, level);
            if link.next == Some(target) {
                link.next = tower[level].next;
                link.span += tower[level].span;
            }
            link.span -= 1;
        }

        let previous_height = self.height;
        while self.height > 0 && self.head[self.height - 1].next.is_none() {
            self.height -= 1;
        }
        if self.height != previous_height {
            trace!("skip map height shrank {} -> {}", previous_height, self.height);
        }
        self.len -= 1;
        let node = self.arena.free(target);
        Some((node.key, node.value))
    }

    /// Removes `key`. Returns false, leaving the map untouched, if
    /// the key was not present.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).is_some()
    }
}

impl<K, V, R> SkipMap<K, V, R>
where
    K: Ord,
    R: RngCore,
{
    /// Inserts `value` under `key`. An existing value is replaced in
    /// place and returned; the map's shape does not change.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        let mut splices: Splices = [Splice::default(); MAX_HEIGHT];
        let base = self.descend(&key, |level, splice| splices[level] = splice);
        if let Some(existing) = self.matching(base, &key) {
            let node = self.arena.get_mut(existing);
            return Some(std::mem::replace(&mut node.value, value));
        }

        let height = self.random_height();
        if height > self.height {
            for level in self.height..height {
                splices[level] = Splice::default();
                self.head[level].span = self.len;
            }
            trace!("skip map height grew {} -> {}", self.height, height);
            self.height = height;
        }

        let node = self.arena.alloc(key, value, height);
        for (level, splice) in splices.iter().enumerate().take(height) {
            // Entries between the predecessor on this level and the new node.
            let skipped = base.rank - splice.rank;
            let link = self.link_mut(splice.prev, level);
            let inherited = Link {
                next: link.next.replace(node),
                span: link.span - skipped,
            };
            link.span = skipped + 1;
            self.arena.get_mut(node).tower[level] = inherited;
        }
        for (level, splice) in splices.iter().enumerate().take(self.height).skip(height) {
            self.link_mut(splice.prev, level).span += 1;
        }
        self.len += 1;
        None
    }
}

/// An iterator over the entries of a [`SkipMap`] in ascending key order.
pub struct Iter<'m, K, V> {
    arena: &'m Arena<K, V>,
    next: Option<NodeId>,
    remaining: usize,
}

impl<'m, K, V> Iterator for Iter<'m, K, V> {
    type Item = (&'m K, &'m V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.arena.get(self.next?);
        self.next = node.tower[0].next;
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            arena: self.arena,
            next: self.next,
            remaining: self.remaining,
        }
    }
}

impl<'m, K, V, R> IntoIterator for &'m SkipMap<K, V, R> {
    type Item = (&'m K, &'m V);
    type IntoIter = Iter<'m, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, R> Extend<(K, V)> for SkipMap<K, V, R>
where
    K: Ord,
    R: RngCore,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for SkipMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: fmt::Debug, V: fmt::Debug, R> fmt::Debug for SkipMap<K, V, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
impl<K, V, R> SkipMap<K, V, R>
where
    K: Ord,
{
    /// Walks every level and checks ordering, span accounting, the
    /// unused head levels and the arena's bookkeeping.
    pub(crate) fn check_integrity(&self) {
        use std::collections::HashMap;

        let mut ranks = HashMap::new();
        let mut prev_key: Option<&K> = None;
        let mut cursor = self.head[0].next;
        while let Some(id) = cursor {
            let node = self.arena.get(id);
            if let Some(prev_key) = prev_key {
                assert!(prev_key < &node.key, "keys out of order");
            }
            let height = node.tower.len();
            assert!(
                (1..=self.options.get_max_height()).contains(&height),
                "node height {height}"
            );
            assert!(height <= self.height, "node taller than the map");
            ranks.insert(id, ranks.len() + 1);
            prev_key = Some(&node.key);
            cursor = node.tower[0].next;
        }
        assert_eq!(ranks.len(), self.len, "len");
        assert_eq!(self.arena.live(), self.len, "arena live count");
        self.arena.check_integrity();

        for level in 0..self.height {
            let mut at = None;
            let mut rank = 0;
            loop {
                let link = self.tower(at)[level];
                match link.next {
                    Some(next) => {
                        let next_rank = ranks[&next];
                        assert!(next_rank > rank, "level {level} goes backwards");
                        assert_eq!(link.span, next_rank - rank, "span at level {level}");
                        at = Some(next);
                        rank = next_rank;
                    }
                    None => {
                        assert_eq!(link.span, self.len - rank, "tail span at level {level}");
                        break;
                    }
                }
            }
        }
        for level in self.height..self.options.get_max_height() {
            assert_eq!(self.head[level].next, None, "head link above height");
        }
        if self.height > 0 {
            assert!(self.head[self.height - 1].next.is_some(), "empty top level");
        } else {
            assert_eq!(self.len, 0, "non-empty map without levels");
        }
    }
}

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;

/// Slot index plus generation counter; a stale handle never matches a recycled slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct GenerationalId {
    pub index: usize,
    pub generation: u32,
}

impl GenerationalId {
    pub fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }

    /// An id that never resolves in any arena.
    pub fn invalid() -> Self {
        Self::new(usize::MAX, u32::MAX)
    }
}

/// Typed wrapper around a [`GenerationalId`] so body and joint handles cannot be mixed up.
pub trait ArenaHandle: Copy + Eq + fmt::Debug {
    fn from_id(id: GenerationalId) -> Self;
    fn id(&self) -> GenerationalId;

    fn index(&self) -> usize {
        self.id().index
    }

    fn generation(&self) -> u32 {
        self.id().generation
    }
}

/// Handle of a rigid body owned by a [`crate::world::JointWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct BodyHandle(pub GenerationalId);

impl ArenaHandle for BodyHandle {
    fn from_id(id: GenerationalId) -> Self {
        Self(id)
    }

    fn id(&self) -> GenerationalId {
        self.0
    }
}

/// Handle of a joint owned by a [`crate::world::JointWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct JointHandle(pub GenerationalId);

impl ArenaHandle for JointHandle {
    fn from_id(id: GenerationalId) -> Self {
        Self(id)
    }

    fn id(&self) -> GenerationalId {
        self.0
    }
}

impl Default for BodyHandle {
    fn default() -> Self {
        Self(GenerationalId::invalid())
    }
}

impl Default for JointHandle {
    fn default() -> Self {
        Self(GenerationalId::invalid())
    }
}

/// Generational arena that hands out stable handles while preventing use-after-free.
pub struct Arena<H, T> {
    items: Vec<Option<T>>,
    generations: Vec<u32>,
    free_list: VecDeque<usize>,
    marker: PhantomData<H>,
}

impl<H: ArenaHandle, T> Default for Arena<H, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ArenaHandle, T> Arena<H, T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            generations: Vec::new(),
            free_list: VecDeque::new(),
            marker: PhantomData,
        }
    }

    pub fn insert(&mut self, item: T) -> H {
        if let Some(index) = self.free_list.pop_front() {
            let generation = self.generations[index];
            self.items[index] = Some(item);
            return H::from_id(GenerationalId::new(index, generation));
        }

        let index = self.items.len();
        self.items.push(Some(item));
        self.generations.push(0);
        H::from_id(GenerationalId::new(index, 0))
    }

    pub fn contains(&self, handle: H) -> bool {
        self.is_valid(handle)
            && self
                .items
                .get(handle.index())
                .is_some_and(|slot| slot.is_some())
    }

    pub fn get(&self, handle: H) -> Option<&T> {
        if self.is_valid(handle) {
            self.items.get(handle.index()).and_then(|slot| slot.as_ref())
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        if self.is_valid(handle) {
            self.items
                .get_mut(handle.index())
                .and_then(|slot| slot.as_mut())
        } else {
            None
        }
    }

    pub fn get2_mut(&mut self, a: H, b: H) -> Option<(&mut T, &mut T)> {
        if a.index() == b.index() {
            return None;
        }

        if !self.is_valid(a) || !self.is_valid(b) {
            return None;
        }

        let (first, second, flipped) = if a.index() < b.index() {
            (a, b, false)
        } else {
            (b, a, true)
        };

        let second_index = second.index();
        if second_index >= self.items.len() {
            return None;
        }

        let (left, right) = self.items.split_at_mut(second_index);
        let first_slot = left
            .get_mut(first.index())
            .and_then(|slot| slot.as_mut())?;
        let second_slot = right.get_mut(0).and_then(|slot| slot.as_mut())?;

        if flipped {
            Some((second_slot, first_slot))
        } else {
            Some((first_slot, second_slot))
        }
    }

    pub fn remove(&mut self, handle: H) -> Option<T> {
        if !self.is_valid(handle) {
            return None;
        }
        let slot = self.items.get_mut(handle.index())?;
        if slot.is_some() {
            self.generations[handle.index()] = self.generations[handle.index()].wrapping_add(1);
            self.free_list.push_back(handle.index());
        }
        slot.take()
    }

    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> + '_ {
        self.items
            .iter()
            .enumerate()
            .filter_map(move |(index, slot)| {
                slot.as_ref()
                    .map(|item| (self.handle_at(index), item))
            })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (H, &mut T)> + '_ {
        let generations = &self.generations;
        self.items
            .iter_mut()
            .enumerate()
            .filter_map(move |(index, slot)| {
                slot.as_mut().map(|item| {
                    (
                        H::from_id(GenerationalId::new(index, generations[index])),
                        item,
                    )
                })
            })
    }

    pub fn handles(&self) -> impl Iterator<Item = H> + '_ {
        self.iter().map(|(handle, _)| handle)
    }

    pub fn len(&self) -> usize {
        self.items.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn handle_at(&self, index: usize) -> H {
        H::from_id(GenerationalId::new(index, self.generations[index]))
    }

    fn is_valid(&self, handle: H) -> bool {
        self.generations
            .get(handle.index())
            .copied()
            .map(|gen| gen == handle.generation())
            .unwrap_or(false)
    }
}

#[cfg(feature = "parallel")]
impl<H, T> Arena<H, T>
where
    H: ArenaHandle + Send + Sync,
    T: Send,
{
    /// Parallel counterpart of [`Arena::iter_mut`]; each item is visited by exactly one worker.
    pub fn par_iter_mut(&mut self) -> impl rayon::iter::ParallelIterator<Item = (H, &mut T)> + '_ {
        use rayon::prelude::*;

        let generations = &self.generations;
        self.items
            .par_iter_mut()
            .enumerate()
            .filter_map(move |(index, slot)| {
                slot.as_mut().map(|item| {
                    (
                        H::from_id(GenerationalId::new(index, generations[index])),
                        item,
                    )
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_handle_is_stale_after_slot_reuse() {
        let mut arena: Arena<JointHandle, u32> = Arena::new();
        let first = arena.insert(1);
        assert_eq!(arena.remove(first), Some(1));

        let second = arena.insert(2);
        assert_eq!(first.index(), second.index());
        assert_ne!(first.generation(), second.generation());
        assert!(arena.get(first).is_none());
        assert!(!arena.contains(first));
        assert_eq!(arena.get(second), Some(&2));
    }

    #[test]
    fn get2_mut_rejects_aliasing() {
        let mut arena: Arena<BodyHandle, u32> = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);
        assert!(arena.get2_mut(a, a).is_none());

        let (x, y) = arena.get2_mut(b, a).expect("distinct handles");
        assert_eq!((*x, *y), (2, 1));
    }

    #[test]
    fn iteration_skips_free_slots() {
        let mut arena: Arena<BodyHandle, &str> = Arena::new();
        let a = arena.insert("a");
        arena.insert("b");
        arena.remove(a);
        let values: Vec<_> = arena.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec!["b"]);
        assert_eq!(arena.len(), 1);
    }
}

// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generational slot storage for component records.
//!
//! Freed slots are recycled through a free list. Each slot carries a
//! generation counter that is bumped on removal, so a handle minted before the
//! removal no longer matches and is reported as stale.

use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Index, IndexMut};

/// Handle types addressing a [`Slab`] slot.
pub(crate) trait SlotKey: Copy + fmt::Debug {
    fn from_parts(idx: u32, generation: u32) -> Self;
    fn slot_index(self) -> u32;
    fn slot_generation(self) -> u32;
}

/// Defines a public generational handle type.
macro_rules! slot_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name {
            /// Slot index into the owning store.
            pub(crate) idx: u32,
            /// Generation counter, must match the store's generation for this slot.
            pub(crate) generation: u32,
        }

        impl $name {
            /// Returns the raw slot index (for diagnostics only).
            #[inline]
            #[must_use]
            pub const fn index(self) -> u32 {
                self.idx
            }

            /// Returns the generation counter.
            #[inline]
            #[must_use]
            pub const fn generation(self) -> u32 {
                self.generation
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(
                    f,
                    concat!(stringify!($name), "({}@gen{})"),
                    self.idx, self.generation
                )
            }
        }

        impl crate::slab::SlotKey for $name {
            fn from_parts(idx: u32, generation: u32) -> Self {
                Self { idx, generation }
            }

            fn slot_index(self) -> u32 {
                self.idx
            }

            fn slot_generation(self) -> u32 {
                self.generation
            }
        }
    };
}

pub(crate) use slot_key;

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Dense record storage addressed by generational keys.
#[derive(Debug)]
pub(crate) struct Slab<K, T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    len: usize,
    _key: PhantomData<fn() -> K>,
}

impl<K: SlotKey, T> Default for Slab<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: SlotKey, T> Slab<K, T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            _key: PhantomData,
        }
    }

    /// Stores `value` in a free slot and returns its key.
    pub(crate) fn insert(&mut self, value: T) -> K {
        self.len += 1;
        if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.value = Some(value);
            return K::from_parts(idx, slot.generation);
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "slot counts stay far below u32::MAX"
        )]
        let idx = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        K::from_parts(idx, 0)
    }

    /// Removes and returns the value behind `key`.
    ///
    /// # Panics
    ///
    /// Panics if the key is stale.
    pub(crate) fn remove(&mut self, key: K) -> T {
        let idx = key.slot_index();
        let value = self
            .slots
            .get_mut(idx as usize)
            .filter(|slot| slot.generation == key.slot_generation())
            .and_then(|slot| {
                let value = slot.value.take()?;
                slot.generation = slot.generation.wrapping_add(1);
                Some(value)
            });
        match value {
            Some(value) => {
                self.free_list.push(idx);
                self.len -= 1;
                value
            }
            None => panic!("stale {key:?}"),
        }
    }

    pub(crate) fn get(&self, key: K) -> Option<&T> {
        self.slots
            .get(key.slot_index() as usize)
            .filter(|slot| slot.generation == key.slot_generation())
            .and_then(|slot| slot.value.as_ref())
    }

    pub(crate) fn get_mut(&mut self, key: K) -> Option<&mut T> {
        self.slots
            .get_mut(key.slot_index() as usize)
            .filter(|slot| slot.generation == key.slot_generation())
            .and_then(|slot| slot.value.as_mut())
    }

    /// Number of live values.
    pub(crate) const fn len(&self) -> usize {
        self.len
    }
}

impl<K: SlotKey, T> Index<K> for Slab<K, T> {
    type Output = T;

    fn index(&self, key: K) -> &T {
        match self.get(key) {
            Some(value) => value,
            None => panic!("stale {key:?}"),
        }
    }
}

impl<K: SlotKey, T> IndexMut<K> for Slab<K, T> {
    fn index_mut(&mut self, key: K) -> &mut T {
        match self.get_mut(key) {
            Some(value) => value,
            None => panic!("stale {key:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    slot_key! {
        /// Key used by the tests below.
        TestKey
    }

    #[test]
    fn insert_get_remove() {
        let mut slab = Slab::<TestKey, &str>::new();
        let a = slab.insert("a");
        let b = slab.insert("b");
        assert_eq!(slab.len(), 2);
        assert_eq!(slab[a], "a");
        assert_eq!(slab.remove(b), "b");
        assert!(slab.get(b).is_none(), "removed key must be stale");
        assert_eq!(slab.len(), 1);
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let mut slab = Slab::<TestKey, u32>::new();
        let first = slab.insert(1);
        slab.remove(first);
        let second = slab.insert(2);
        assert_eq!(first.index(), second.index());
        assert_ne!(first.generation(), second.generation());
        assert!(slab.get(first).is_none(), "old key must not see the new value");
        assert_eq!(slab[second], 2);
    }

    #[test]
    fn debug_names_the_key_type() {
        let mut slab = Slab::<TestKey, ()>::new();
        let key = slab.insert(());
        assert_eq!(alloc::format!("{key:?}"), "TestKey(0@gen0)");
    }

    #[test]
    #[should_panic(expected = "stale TestKey")]
    fn double_remove_panics() {
        let mut slab = Slab::<TestKey, ()>::new();
        let key = slab.insert(());
        slab.remove(key);
        slab.remove(key);
    }
}

//! # Generational Arena
//!
//! Slot storage for simulation state that is created and destroyed at runtime
//! (containers, world objects). Freed slots are reused; the generation counter
//! makes handles to a freed slot stale instead of aliasing the new occupant.

use crate::handle::Handle;

/// One slot of the arena.
#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// A growable generational arena.
///
/// # Thread Safety
///
/// The arena is NOT thread-safe. It is owned by the tick thread.
///
/// # Example
///
/// ```rust,ignore
/// let mut arena: Arena<&str> = Arena::new();
/// let h = arena.insert("bag");
/// arena.remove(h);
/// assert!(arena.get(h).is_none()); // stale handle
/// ```
#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    /// Free list - indices of vacant slots.
    free_list: Vec<u32>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    /// Creates an empty arena.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Creates an empty arena with room for `capacity` values.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Returns the number of live values.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the arena holds no live values.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stores a value and returns its handle.
    ///
    /// Vacant slots are reused before the backing storage grows.
    ///
    /// # Panics
    ///
    /// Panics if more than `u32::MAX` slots would be needed.
    pub fn insert(&mut self, value: T) -> Handle {
        self.len += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Handle::new(index, slot.generation);
        }

        assert!(
            self.slots.len() < u32::MAX as usize,
            "Arena exceeded u32::MAX slots"
        );
        #[allow(clippy::cast_possible_truncation)]
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        Handle::new(index, 0)
    }

    /// Removes a value, invalidating every outstanding handle to it.
    ///
    /// Returns the value, or None if the handle was stale.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index());
        self.len -= 1;
        Some(value)
    }

    /// Returns true if the handle refers to a live value.
    #[inline]
    #[must_use]
    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Gets a reference to a live value.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        let slot = self.slots.get(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.value.as_ref()
    }

    /// Gets a mutable reference to a live value.
    #[inline]
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.value.as_mut()
    }

    /// Iterates over all live values in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let value = slot.value.as_ref()?;
            // Slot count is bounded by u32 in `insert`.
            #[allow(clippy::cast_possible_truncation)]
            Some((Handle::new(index as u32, slot.generation), value))
        })
    }
}

//! Array-backed storage for the hot drop collections.
//!
//! Order is not preserved: removal moves the last element into the hole,
//! which keeps both append and removal O(1) and never shifts the tail.

use std::ops::{Index, IndexMut};

/// Growable list with O(1) push and O(1) swap-back removal.
///
/// An optional hard limit turns it into a bounded collection: pushes past the
/// limit are refused instead of growing the backing storage.
#[derive(Debug, Clone)]
pub struct SwapBackList<T> {
    items: Vec<T>,
    limit: Option<usize>,
}

impl<T> SwapBackList<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity.max(1)),
            limit: None,
        }
    }

    /// A list that never holds more than `limit` items.
    pub fn bounded(limit: usize) -> Self {
        Self {
            items: Vec::with_capacity(limit.max(1)),
            limit: Some(limit),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.items.len() >= limit)
    }

    /// Appends, growing if needed. Returns false when the hard limit is reached.
    pub fn push(&mut self, value: T) -> bool {
        if self.is_full() {
            return false;
        }
        self.items.push(value);
        true
    }

    /// Appends only if the current allocation has room.
    pub fn try_push_no_resize(&mut self, value: T) -> bool {
        if self.is_full() || self.items.len() >= self.items.capacity() {
            return false;
        }
        self.items.push(value);
        true
    }

    /// Removes the item at `index`, moving the last item into its place.
    pub fn swap_remove(&mut self, index: usize) -> Option<T> {
        if index >= self.items.len() {
            return None;
        }
        Some(self.items.swap_remove(index))
    }

    /// Swap-removes every item rejected by `keep`. Returns how many were removed.
    ///
    /// Items moved into a hole are re-checked before the scan advances.
    pub fn retain_swap(&mut self, mut keep: impl FnMut(&mut T) -> bool) -> usize {
        let mut removed = 0;
        let mut index = 0;
        while index < self.items.len() {
            if keep(&mut self.items[index]) {
                index += 1;
            } else {
                self.items.swap_remove(index);
                removed += 1;
            }
        }
        removed
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Drops every item but keeps the allocation.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T> Default for SwapBackList<T> {
    fn default() -> Self {
        Self::with_capacity(64)
    }
}

impl<T> Index<usize> for SwapBackList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<T> IndexMut<usize> for SwapBackList<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a SwapBackList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_without_resize() {
        let mut list = SwapBackList::bounded(4);

        for i in 0..4 {
            assert_eq!(list.len(), i);
            assert!(list.try_push_no_resize(i));
        }

        assert_eq!(list.len(), 4);
        assert!(!list.try_push_no_resize(5));
        assert!(!list.push(5));
    }

    #[test]
    fn test_push_grows() {
        let mut list = SwapBackList::with_capacity(4);

        for i in 0..8 {
            assert!(list.push(i));
            assert_eq!(list.len(), i + 1);
        }

        assert!(list.capacity() > 4);
    }

    #[test]
    fn test_swap_remove_moves_last_into_hole() {
        let mut list = SwapBackList::with_capacity(4);
        for i in 0..4 {
            list.push(i);
        }

        assert_eq!(list.swap_remove(1), Some(1));
        assert_eq!(list.as_slice(), &[0, 3, 2]);
        assert_eq!(list.swap_remove(2), Some(2));
        assert_eq!(list.as_slice(), &[0, 3]);
        assert_eq!(list.swap_remove(5), None);
    }

    #[test]
    fn test_retain_swap_rechecks_moved_items() {
        let mut list = SwapBackList::with_capacity(8);
        for value in [1, 2, 2, 3, 2, 2] {
            list.push(value);
        }

        let removed = list.retain_swap(|value| *value != 2);

        assert_eq!(removed, 4);
        let mut remaining = list.as_slice().to_vec();
        remaining.sort();
        assert_eq!(remaining, vec![1, 3]);
    }

    #[test]
    fn test_clear_keeps_allocation() {
        let mut list = SwapBackList::with_capacity(16);
        for i in 0..16 {
            list.push(i);
        }
        let capacity = list.capacity();

        list.clear();

        assert!(list.is_empty());
        assert_eq!(list.capacity(), capacity);
    }
}

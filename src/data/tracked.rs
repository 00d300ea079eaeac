//! Collections that remember whether they were changed after being handed to
//! an entity. Freshly constructed collections start out unmodified.

use std::ops::Deref;

use indexmap::IndexMap;

/// An ordered list with a modification flag. Reads go through `Deref<[T]>`,
/// every mutating method sets the flag.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedList<T> {
    items: Vec<T>,
    modified: bool,
}

impl<T> TrackedList<T> {
    pub fn new() -> Self {
        TrackedList {
            items: Vec::new(),
            modified: false,
        }
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn push(&mut self, item: T) {
        self.modified = true;
        self.items.push(item);
    }

    pub fn insert(&mut self, index: usize, item: T) {
        self.modified = true;
        self.items.insert(index, item);
    }

    pub fn remove(&mut self, index: usize) -> T {
        self.modified = true;
        self.items.remove(index)
    }

    /// Replaces the item at `index`, returning the previous one.
    pub fn set(&mut self, index: usize, item: T) -> T {
        self.modified = true;
        std::mem::replace(&mut self.items[index], item)
    }

    /// Gives mutable access to one item. The list counts as modified even if
    /// the caller ends up not changing anything.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        let item = self.items.get_mut(index);
        if item.is_some() {
            self.modified = true;
        }
        item
    }

    pub fn clear(&mut self) {
        if !self.items.is_empty() {
            self.modified = true;
        }
        self.items.clear();
    }

    pub fn retain(&mut self, f: impl FnMut(&T) -> bool) {
        let before = self.items.len();
        self.items.retain(f);
        if self.items.len() != before {
            self.modified = true;
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    pub(crate) fn mark_clean(&mut self) {
        self.modified = false;
    }

    /// Mutable access that leaves the modification flag alone. Used when the
    /// server renames an id, which is not an edit of the list.
    pub(crate) fn as_mut_slice_untracked(&mut self) -> &mut [T] {
        &mut self.items
    }
}

impl<T> Default for TrackedList<T> {
    fn default() -> Self {
        TrackedList::new()
    }
}

impl<T> Deref for TrackedList<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T> From<Vec<T>> for TrackedList<T> {
    fn from(items: Vec<T>) -> Self {
        TrackedList {
            items,
            modified: false,
        }
    }
}

impl<T> FromIterator<T> for TrackedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        TrackedList::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<T> Extend<T> for TrackedList<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let before = self.items.len();
        self.items.extend(iter);
        if self.items.len() != before {
            self.modified = true;
        }
    }
}

impl<'a, T> IntoIterator for &'a TrackedList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Key/value tags of an entity, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tags {
    map: IndexMap<String, String>,
    modified: bool,
}

impl Tags {
    pub fn new() -> Self {
        Tags::default()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    /// Sets `key` to `value`, returning the previous value. Writing the value
    /// that is already stored does not count as a modification.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        if self.map.get(&key) == Some(&value) {
            return Some(value);
        }
        self.modified = true;
        self.map.insert(key, value)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let removed = self.map.shift_remove(key);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    pub(crate) fn mark_clean(&mut self) {
        self.modified = false;
    }

    pub fn clear(&mut self) {
        if !self.map.is_empty() {
            self.modified = true;
        }
        self.map.clear();
    }
}

impl From<IndexMap<String, String>> for Tags {
    fn from(map: IndexMap<String, String>) -> Self {
        Tags {
            map,
            modified: false,
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Tags::from(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect::<IndexMap<_, _>>(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Tags {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

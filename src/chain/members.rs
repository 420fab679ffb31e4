// src/chain/members.rs

//! Membership list of a command chain.

/// Prepend-ordered set.
///
/// Iteration yields the most recently added item first. Items are stored in
/// insertion order internally and walked backwards, which keeps `prepend`
/// cheap while preserving the chain's observable ordering.
#[derive(Debug, Clone)]
pub(crate) struct MemberSet<T> {
    items: Vec<T>,
}

impl<T> MemberSet<T> {
    pub(crate) fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub(crate) fn prepend(&mut self, item: T) {
        self.items.push(item);
    }

    /// Most recently added first.
    pub(crate) fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter().rev()
    }

    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.items.retain(keep);
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}

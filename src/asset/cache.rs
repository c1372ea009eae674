use super::Handle;

/// Append-only store; handles are insertion indices.
pub struct AssetCache<T> {
    items: Vec<T>,
}

impl<T> AssetCache<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn insert(&mut self, item: T) -> Handle<T> {
        let index = self.items.len();
        self.items.push(item);
        Handle::new(index)
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.items.get(handle.index())
    }

    /// Handle of the `index`-th inserted item, if it exists.
    pub fn handle_at(&self, index: usize) -> Option<Handle<T>> {
        (index < self.items.len()).then(|| Handle::new(index))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for AssetCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_follow_insertion_order() {
        let mut cache = AssetCache::new();
        let a = cache.insert("first");
        let b = cache.insert("second");
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(cache.get(b), Some(&"second"));
        assert_eq!(cache.handle_at(1), Some(b));
        assert_eq!(cache.handle_at(2), None);
        assert_eq!(cache.len(), 2);
    }
}

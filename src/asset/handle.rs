use std::fmt;
use std::marker::PhantomData;

/// Index of an item in an [`AssetCache`](super::AssetCache). Only the cache
/// hands these out, so a handle is always in range for the cache that made it.
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

// Manual impls: deriving would require `T: Copy`.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> Handle<T> {
    pub(super) fn new(index: usize) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl<T> fmt::Display for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

use std::borrow::Borrow;

pub trait Index: Clone + Copy + From<usize> + Into<usize> {}

/// Append-only arena handing out typed indices. Slots are never reused, so
/// an index stays valid for the lifetime of the store.
#[derive(Clone, Debug)]
pub struct IndexedStore<I: Index, T> {
    array: Vec<T>,
    _index: std::marker::PhantomData<I>,
}

impl<I: Index, T> Default for IndexedStore<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Index, T> IndexedStore<I, T> {
    pub fn new() -> Self {
        Self {
            array: vec![],
            _index: std::marker::PhantomData,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.array.iter().enumerate().map(|(i, t)| (I::from(i), t))
    }

    pub fn contains<K: Borrow<I>>(&self, index: K) -> bool {
        self.get(index).is_some()
    }

    pub fn push(&mut self, item: T) -> I {
        let idx = I::from(self.array.len());
        self.array.push(item);
        idx
    }

    pub fn get<K: Borrow<I>>(&self, index: K) -> Option<&T> {
        self.array.get((*index.borrow()).into())
    }

    pub fn get_mut<K: Borrow<I>>(&mut self, index: K) -> Option<&mut T> {
        self.array.get_mut((*index.borrow()).into())
    }

    pub fn count(&self) -> usize {
        self.array.len()
    }
}

//! Negative index vector
//!
//! A vector indexed by signed offsets around a center, used for the diagonals of the edit graph.

use std::ops::{Index, IndexMut};

/// A vector that can be indexed with signed indices centred on zero.
///
/// ```rust
/// use libdiffmatch::neg_idx_vec::NegIdxVec;
/// let mut v: NegIdxVec<isize> = NegIdxVec::new(3, || -1);
/// v[-3] = 7;
/// assert_eq!(v[-3], 7);
/// assert_eq!(v[2], -1);
/// assert!(v.get(3).is_none());
/// ```
///
/// A vector created with radius `r` accepts indices in `-r..r`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NegIdxVec<T> {
    /// The underlying vector for the negative index vector
    pub data: Vec<T>,

    /// The offset of index zero inside `data`.
    radius: usize,
}

impl<T> NegIdxVec<T> {
    /// Create a negative index vector covering the indices `-radius..radius`.
    ///
    /// Every slot is filled by calling `f`.
    ///
    /// ```rust
    /// use libdiffmatch::neg_idx_vec::NegIdxVec;
    /// let v: NegIdxVec<usize> = NegIdxVec::new(1, Default::default);
    /// assert_eq!(v.len(), 2);
    /// ```
    pub fn new<F>(radius: usize, f: F) -> Self
    where
        F: FnMut() -> T,
    {
        let mut v = Vec::new();
        v.resize_with(radius * 2, f);

        Self { data: v, radius }
    }

    /// An internal helper for the indexing methods.
    ///
    /// This resolves a signed index to the position in the internal vector, returning [None] if
    /// the index falls outside of the vector's range.
    fn idx_helper(&self, idx: isize) -> Option<usize> {
        let offset = idx.checked_add_unsigned(self.radius)?;
        let offset = usize::try_from(offset).ok()?;
        (offset < self.data.len()).then_some(offset)
    }

    /// Get a reference to an element, or [None] if the index is out of range.
    #[must_use]
    pub fn get(&self, idx: isize) -> Option<&T> {
        self.idx_helper(idx).map(|offset| &self.data[offset])
    }

    /// Get a mutable reference to an element, or [None] if the index is out of range.
    pub fn get_mut(&mut self, idx: isize) -> Option<&mut T> {
        self.idx_helper(idx).map(|offset| &mut self.data[offset])
    }

    /// Get the length of the vector
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns whether the vector is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<T> Default for NegIdxVec<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            radius: 0,
        }
    }
}

impl<T> Index<isize> for NegIdxVec<T> {
    type Output = T;

    fn index(&self, idx: isize) -> &<Self as std::ops::Index<isize>>::Output {
        match self.get(idx) {
            Some(elem) => elem,
            None => panic!(
                "index {idx} out of range for vector with radius {}",
                self.radius
            ),
        }
    }
}

impl<T> IndexMut<isize> for NegIdxVec<T> {
    fn index_mut(&mut self, idx: isize) -> &mut <Self as std::ops::Index<isize>>::Output {
        let radius = self.radius;
        match self.get_mut(idx) {
            Some(elem) => elem,
            None => panic!("index {idx} out of range for vector with radius {radius}"),
        }
    }
}

impl<T> IntoIterator for NegIdxVec<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

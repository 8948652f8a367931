//! OffsetIndex - O(log n) prefix sums and offset lookup via Fenwick tree
//!
//! Stores one *extent* per list slot (item length plus the separator that
//! follows it). The virtualization host uses it to turn a scroll offset into
//! the index of the first visible item.
//!
//! # Complexity
//!
//! - `set`: O(log n)
//! - `prefix_sum`: O(log n)
//! - `index_at_offset`: O(log² n)
//! - `push`: O(log n) amortized
//! - `total`: O(log n)
//! - `len`: O(1)
//! - `clear`: O(n)

/// Fenwick tree over per-slot extents.
#[derive(Debug, Clone, Default)]
pub struct OffsetIndex {
    /// Fenwick tree backing storage (0-indexed API over the `fenwick` crate)
    tree: Vec<i64>,
    /// Number of valid slots (len <= tree.len())
    len: usize,
}

impl OffsetIndex {
    /// Creates an empty index with the given capacity.
    ///
    /// # Examples
    ///
    /// ```
    /// # use colfeed::pipeline::offset_index::OffsetIndex;
    /// let index = OffsetIndex::new(100);
    /// assert_eq!(index.len(), 0);
    /// assert_eq!(index.total(), 0);
    /// ```
    pub fn new(capacity: usize) -> Self {
        Self {
            tree: vec![0; capacity],
            len: 0,
        }
    }

    /// Builds an index from a sequence of extents.
    ///
    /// ```
    /// # use colfeed::pipeline::offset_index::OffsetIndex;
    /// let index = OffsetIndex::from_extents([48, 68]);
    /// assert_eq!(index.offset_of(1), 48);
    /// assert_eq!(index.total(), 116);
    /// ```
    pub fn from_extents<I>(extents: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        let extents: Vec<u64> = extents.into_iter().collect();
        let mut index = Self::new(extents.len());
        for extent in extents {
            index.push(extent);
        }
        index
    }

    /// Sets the extent at the given slot.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    ///
    /// ```
    /// # use colfeed::pipeline::offset_index::OffsetIndex;
    /// let mut index = OffsetIndex::from_extents([5, 5]);
    /// index.set(0, 10);
    /// assert_eq!(index.prefix_sum(1), 15);
    /// ```
    pub fn set(&mut self, index: usize, extent: u64) {
        assert!(
            index < self.len,
            "index {} out of bounds (len: {})",
            index,
            self.len
        );

        let delta = to_node(extent).saturating_sub(to_node(self.extent(index)));
        if delta != 0 {
            fenwick::array::update(&mut self.tree, index, delta);
        }
    }

    /// Extent stored at the given slot.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn extent(&self, index: usize) -> u64 {
        if index == 0 {
            self.prefix_sum(0)
        } else {
            self.prefix_sum(index).saturating_sub(self.prefix_sum(index - 1))
        }
    }

    /// Cumulative extent up to and including the given slot.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn prefix_sum(&self, index: usize) -> u64 {
        assert!(
            index < self.len,
            "index {} out of bounds (len: {})",
            index,
            self.len
        );

        let sum = fenwick::array::prefix_sum(&self.tree, index);
        u64::try_from(sum).unwrap_or(0)
    }

    /// Offset at which the given slot starts.
    pub fn offset_of(&self, index: usize) -> u64 {
        if index == 0 {
            0
        } else {
            self.prefix_sum(index - 1)
        }
    }

    /// Index of the slot covering `offset`: the first slot whose
    /// `prefix_sum` exceeds it.
    ///
    /// Returns `None` if the index is empty or `offset >= total()`.
    ///
    /// ```
    /// # use colfeed::pipeline::offset_index::OffsetIndex;
    /// let index = OffsetIndex::from_extents([10, 20, 15]);
    /// assert_eq!(index.index_at_offset(0), Some(0));
    /// assert_eq!(index.index_at_offset(10), Some(1));
    /// assert_eq!(index.index_at_offset(44), Some(2));
    /// assert_eq!(index.index_at_offset(45), None);
    /// ```
    pub fn index_at_offset(&self, offset: u64) -> Option<usize> {
        if self.is_empty() {
            return None;
        }

        let mut left = 0;
        let mut right = self.len;

        while left < right {
            let mid = left + (right - left) / 2;
            if self.prefix_sum(mid) > offset {
                right = mid;
            } else {
                left = mid + 1;
            }
        }

        if left >= self.len {
            None
        } else {
            Some(left)
        }
    }

    /// Sum of all extents.
    pub fn total(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.prefix_sum(self.len - 1)
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index has no slots.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends a slot with the given extent.
    ///
    /// Grows the backing storage by rebuilding, so parent nodes created by
    /// the growth also cover the existing slots.
    pub fn push(&mut self, extent: u64) {
        if self.len >= self.tree.len() {
            self.grow();
        }

        let idx = self.len;
        self.len += 1;
        fenwick::array::update(&mut self.tree, idx, to_node(extent));
    }

    /// Removes all slots, retaining capacity.
    pub fn clear(&mut self) {
        self.tree.iter_mut().for_each(|node| *node = 0);
        self.len = 0;
    }

    fn grow(&mut self) {
        let extents: Vec<u64> = (0..self.len).map(|i| self.extent(i)).collect();
        self.tree = vec![0; self.tree.len().max(1) * 2];
        for (i, extent) in extents.into_iter().enumerate() {
            fenwick::array::update(&mut self.tree, i, to_node(extent));
        }
    }
}

/// Tree node value of an extent, clamped to the node range.
fn to_node(extent: u64) -> i64 {
    i64::try_from(extent).unwrap_or(i64::MAX)
}

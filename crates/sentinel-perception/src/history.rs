//! [`TemporalHistory`] – bounded window of recent per-frame marker lists.
//!
//! # Example
//!
//! ```rust
//! use sentinel_perception::TemporalHistory;
//! use sentinel_types::Marker;
//!
//! let mut history = TemporalHistory::with_capacity(2);
//! history.push(vec![Marker::new(10, 10, 6, 0)]);
//! history.push(Vec::new());
//! history.push(vec![Marker::new(40, 12, 7, 2)]);
//! assert_eq!(history.len(), 2);
//! assert_eq!(history.latest()[0].x, 40);
//! ```

use std::collections::VecDeque;

use sentinel_types::Marker;

/// Default number of frames kept in the window.
pub const DEFAULT_CAPACITY: usize = 10;

/// Fixed-depth FIFO window of per-frame marker lists.
///
/// Insertion order is acquisition order.  Once `capacity` entries are held,
/// every push evicts the oldest one.
#[derive(Debug, Clone)]
pub struct TemporalHistory {
    capacity: usize,
    entries: VecDeque<Vec<Marker>>,
}

impl Default for TemporalHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl TemporalHistory {
    /// A window holding at most `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&mut self, markers: Vec<Marker>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(markers);
    }

    /// Markers of the most recent entry; empty when nothing was pushed yet.
    pub fn latest(&self) -> &[Marker] {
        self.entries.back().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every entry, oldest first.
    pub fn all(&self) -> Vec<&[Marker]> {
        self.entries.iter().map(Vec::as_slice).collect()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &[Marker]> {
        self.entries.iter().map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

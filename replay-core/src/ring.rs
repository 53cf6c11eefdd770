//! Bookkeeping of a growable-then-circular store.
use std::ops::Range;

/// A contiguous write of rows into the store.
///
/// Rows `src` of the inserted batch go to slots `dst..dst + src.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Rows of the inserted batch.
    pub src: Range<usize>,

    /// First destination slot.
    pub dst: usize,
}

/// Cursor, length and insertion counter of a replay buffer.
///
/// The k-th inserted row (counted since the last reset) goes to slot
/// `k % capacity`. Below capacity this is an append, afterwards it overwrites
/// the oldest row. An unbounded index never wraps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingIndex {
    capacity: Option<usize>,
    cursor: usize,
    len: usize,
    total: usize,
}

impl RingIndex {
    /// Creates an empty index.
    ///
    /// `capacity` must not be `Some(0)`.
    pub fn new(capacity: Option<usize>) -> Self {
        debug_assert_ne!(capacity, Some(0));
        Self {
            capacity,
            cursor: 0,
            len: 0,
            total: 0,
        }
    }

    /// Maximum number of rows, `None` if unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Slot of the next insertion.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of valid rows.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if there is no valid row.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of rows inserted since the last reset.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Returns the writes that inserting `n` rows requires, without updating
    /// the index.
    ///
    /// Rows that would be overwritten within the same insertion are skipped,
    /// so a batch larger than the capacity leaves its last `capacity` rows
    /// exactly where row-by-row insertion would put them. The result has at
    /// most two segments.
    pub fn plan(&self, n: usize) -> Vec<Segment> {
        if n == 0 {
            return vec![];
        }

        match self.capacity {
            None => vec![Segment {
                src: 0..n,
                dst: self.cursor,
            }],
            Some(capacity) => {
                let skip = n.saturating_sub(capacity);
                let kept = n - skip;
                let start = (self.cursor + skip) % capacity;
                let first = kept.min(capacity - start);
                let mut segments = vec![Segment {
                    src: skip..skip + first,
                    dst: start,
                }];
                if kept > first {
                    segments.push(Segment {
                        src: skip + first..n,
                        dst: 0,
                    });
                }
                segments
            }
        }
    }

    /// Advances the index by `n` inserted rows.
    pub fn commit(&mut self, n: usize) {
        self.total += n;
        match self.capacity {
            None => {
                self.cursor += n;
                self.len += n;
            }
            Some(capacity) => {
                self.cursor = (self.cursor + n) % capacity;
                self.len = (self.len + n).min(capacity);
            }
        }
    }

    /// Number of slots the storage must hold after inserting `n` rows.
    pub fn required_slots(&self, n: usize) -> usize {
        match self.capacity {
            None => self.cursor + n,
            Some(capacity) => (self.len + n).min(capacity),
        }
    }

    /// Forgets all rows.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.len = 0;
        self.total = 0;
    }
}

//! Interfaces of replay buffers.
//!
//! Replay buffers store experiences of agents and return batches of them for
//! training. The interfaces are split into the pushing side
//! ([`ExperienceBufferBase`]), the sampling side ([`ReplayBufferBase`]) and the
//! per-field storage used by both ([`BatchBase`]).
use crate::Segment;
use anyhow::Result;
use std::ops::Range;

/// Interface for buffers that store experiences from environments.
///
/// # Examples
///
/// ```ignore
/// let mut buffer = TransitionBuffer::build(&config)?;
/// buffer.push(Transition::new(state, 1, next_state, 0.5, false))?;
/// assert_eq!(buffer.len(), 1);
/// ```
pub trait ExperienceBufferBase {
    /// The type of items stored in the buffer.
    type Item;

    /// Pushes a new experience into the buffer.
    fn push(&mut self, item: Self::Item) -> Result<()>;

    /// Returns the current number of experiences in the buffer.
    fn len(&self) -> usize;

    /// Returns `true` if the buffer holds no experience.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of experiences pushed since the last clear,
    /// including the overwritten ones.
    fn total_inserted(&self) -> usize;

    /// Removes all experiences and resets the counters.
    fn clear(&mut self) -> Result<()>;
}

/// Interface for replay buffers that generate batches for training.
pub trait ReplayBufferBase: Sized {
    /// Configuration parameters for the replay buffer.
    type Config: Clone;

    /// The type of batch generated for training.
    type Batch;

    /// Builds a new replay buffer from the given configuration.
    fn build(config: &Self::Config) -> Result<Self>;

    /// Samples stored experiences.
    ///
    /// With `shuffle`, rows are taken in uniformly random order without
    /// replacement; otherwise in slot order. At most `batch_size` rows are
    /// returned, all of them if `batch_size` is `None`.
    fn sample(&mut self, batch_size: Option<usize>, shuffle: bool) -> Result<Self::Batch>;
}

/// Storage of one field of a replay buffer.
///
/// The storage is a sequence of slots addressed by index; the replay buffer
/// decides where rows go (see [`RingIndex`](crate::RingIndex)).
pub trait BatchBase {
    /// A batch of rows of the field, the first axis being the batch axis.
    type Rows;

    /// Makes the storage hold at least `slots` slots, keeping their content.
    fn reserve(&mut self, slots: usize) -> Result<()>;

    /// Writes rows `rows` of `data` to the slots starting at `ix`.
    fn push(&mut self, ix: usize, data: &Self::Rows, rows: Range<usize>) -> Result<()>;

    /// Gathers the rows at the given slots.
    fn sample(&self, ixs: &[usize]) -> Result<Self::Rows>;

    /// Drops the content of the storage.
    fn reset(&mut self) -> Result<()>;

    /// Reserves `slots` slots and applies the writes of `segments`.
    fn push_segments(&mut self, segments: &[Segment], data: &Self::Rows, slots: usize) -> Result<()> {
        self.reserve(slots)?;
        for segment in segments {
            self.push(segment.dst, data, segment.src.clone())?;
        }
        Ok(())
    }
}

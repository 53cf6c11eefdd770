use anyhow::{bail, Result};
use candle_core::{DType, Device, Tensor};
use log::debug;
use replay_core::BatchBase;
use std::ops::Range;

/// Number of slots first allocated by an unbounded [`TensorBatch`].
const INITIAL_SLOTS: usize = 256;

/// Storage of one field of a replay buffer, consisting of a [`Tensor`].
///
/// The internal tensor has the shape `[slots, row_shape..]`. A bounded storage
/// allocates `capacity` slots once; an unbounded one starts with a small block
/// and doubles it when more slots are reserved.
///
/// [`Tensor`]: https://docs.rs/candle-core/0.8.4/candle_core/struct.Tensor.html
#[derive(Debug)]
pub struct TensorBatch {
    buf: Tensor,
    row_shape: Vec<usize>,
    growable: bool,
}

impl TensorBatch {
    /// Creates a storage for rows of shape `row_shape`.
    ///
    /// `capacity` of `None` makes the storage growable.
    pub fn new(
        row_shape: &[usize],
        dtype: DType,
        capacity: Option<usize>,
        device: &Device,
    ) -> Result<Self> {
        let (slots, growable) = match capacity {
            Some(capacity) => (capacity, false),
            None => (INITIAL_SLOTS, true),
        };
        Ok(Self {
            buf: zeros(slots, row_shape, dtype, device)?,
            row_shape: row_shape.to_vec(),
            growable,
        })
    }

    /// Returns the number of allocated slots.
    pub fn slots(&self) -> usize {
        self.buf.dims()[0]
    }

    /// Returns the element type.
    pub fn dtype(&self) -> DType {
        self.buf.dtype()
    }

    /// Returns the device of the storage.
    pub fn device(&self) -> &Device {
        self.buf.device()
    }

    /// Returns a storage with its own copy of the slots.
    ///
    /// Rows pushed into either storage afterwards are not seen by the other.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            buf: self.buf.copy()?,
            row_shape: self.row_shape.clone(),
            growable: self.growable,
        })
    }

    /// Returns a copy of the first `len` slots.
    pub fn head(&self, len: usize) -> Result<Tensor> {
        if len == 0 {
            return zeros(0, &self.row_shape, self.dtype(), self.device());
        }
        Ok(self.buf.narrow(0, 0, len)?.copy()?)
    }
}

impl BatchBase for TensorBatch {
    type Rows = Tensor;

    fn reserve(&mut self, slots: usize) -> Result<()> {
        let current = self.slots();
        if slots <= current {
            return Ok(());
        }
        if !self.growable {
            bail!("{} slots requested from a storage of capacity {}", slots, current);
        }

        let mut new_slots = current.max(1);
        while new_slots < slots {
            new_slots *= 2;
        }
        debug!("Grows storage from {} to {} slots", current, new_slots);

        let buf = zeros(new_slots, &self.row_shape, self.dtype(), self.device())?;
        buf.slice_set(&self.buf, 0, 0)?;
        self.buf = buf;
        Ok(())
    }

    /// Writes the given rows.
    ///
    /// `data` must have the element type and the device of the storage.
    fn push(&mut self, ix: usize, data: &Tensor, rows: Range<usize>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        if rows.start == 0 && rows.end == data.dims()[0] {
            self.buf.slice_set(data, 0, ix)?;
        } else {
            let data = data.narrow(0, rows.start, rows.len())?.copy()?;
            self.buf.slice_set(&data, 0, ix)?;
        }
        Ok(())
    }

    fn sample(&self, ixs: &[usize]) -> Result<Tensor> {
        if ixs.is_empty() {
            return self.head(0);
        }
        let ixs = {
            let ixs = slot_ids(ixs)?;
            let len = ixs.len();
            Tensor::from_vec(ixs, len, self.buf.device())?
        };
        Ok(self.buf.index_select(&ixs, 0)?)
    }

    /// Releases slots allocated by growth; a bounded storage keeps its
    /// allocation, as its slots are overwritten before being read again.
    fn reset(&mut self) -> Result<()> {
        if self.growable && self.slots() > INITIAL_SLOTS {
            self.buf = zeros(INITIAL_SLOTS, &self.row_shape, self.dtype(), self.device())?;
        }
        Ok(())
    }
}

/// Converts slots into the `u32` ids taken by `index_select`.
fn slot_ids(ixs: &[usize]) -> Result<Vec<u32>> {
    Ok(ixs
        .iter()
        .map(|&ix| u32::try_from(ix))
        .collect::<Result<Vec<_>, _>>()?)
}

fn zeros(slots: usize, row_shape: &[usize], dtype: DType, device: &Device) -> Result<Tensor> {
    let mut shape = vec![slots];
    shape.extend_from_slice(row_shape);
    Ok(Tensor::zeros(shape, dtype, device)?)
}

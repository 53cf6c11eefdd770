//! Replay buffer of demonstration pairs for imitation learning.
use crate::{
    to_candle_device,
    util::{actions_to_tensor, num_rows, states_to_tensor},
    TensorBatch,
};
use anyhow::Result;
use candle_core::{DType, Tensor};
use log::{debug, trace};
use ndarray::{arr1, ArrayViewD, Axis};
use rand::{rngs::StdRng, Rng, SeedableRng};
use replay_core::{
    sample_indices, Action, ActionKind, Actions, BatchBase, DemoPair, Device,
    ExperienceBufferBase, ReplayBufferBase, ReplayBufferConfig, RingIndex,
};

/// A batch of demonstration pairs sampled from a [`DAggerBuffer`].
#[derive(Clone, Debug)]
pub struct DemoBatch {
    /// States, `[n, state_shape..]` of `f32`.
    pub state: Tensor,

    /// Expert actions, `[n, 1]` of `i64` if discrete, `[n, action_shape..]` of `f32` if continuous.
    pub action: Tensor,

    /// Slots of the sampled pairs.
    pub ix_sample: Vec<usize>,
}

impl DemoBatch {
    /// Returns the number of pairs.
    pub fn len(&self) -> usize {
        self.ix_sample.len()
    }

    /// Returns `true` if the batch has no pair.
    pub fn is_empty(&self) -> bool {
        self.ix_sample.is_empty()
    }

    /// Unpacks the batch into `(state, action)`.
    pub fn unpack(self) -> (Tensor, Tensor) {
        (self.state, self.action)
    }
}

/// A replay buffer of `(state, action)` pairs for DAgger-style training.
///
/// Storage behaves as in [`TransitionBuffer`](crate::TransitionBuffer):
/// append up to `capacity`, then overwrite the oldest pair.
pub struct DAggerBuffer {
    config: ReplayBufferConfig,
    index: RingIndex,
    state: TensorBatch,
    action: TensorBatch,
    rng: StdRng,
}

impl DAggerBuffer {
    /// Inserts a demonstration pair.
    pub fn insert_transition(
        &mut self,
        state: ArrayViewD<f32>,
        action: impl Into<Action>,
    ) -> Result<()> {
        let actions = match action.into() {
            Action::Discrete(a) => Actions::Discrete(arr1(&[a])),
            Action::Continuous(a) => Actions::Continuous(a.insert_axis(Axis(0))),
        };
        self.insert_batch(state.insert_axis(Axis(0)), &actions)
    }

    /// Inserts a batch of demonstration pairs.
    ///
    /// Both fields are checked before the buffer is modified.
    pub fn insert_batch(&mut self, states: ArrayViewD<f32>, actions: &Actions) -> Result<()> {
        let device = self.state.device().clone();
        let n = num_rows(&states, &self.config.state_shape)?;
        let state = states_to_tensor("states", states, n, &self.config.state_shape, &device)?;
        let action = actions_to_tensor(
            actions,
            self.config.action_kind,
            n,
            &self.config.action_shape,
            &device,
        )?;

        let segments = self.index.plan(n);
        let slots = self.index.required_slots(n);
        self.state.push_segments(&segments, &state, slots)?;
        self.action.push_segments(&segments, &action, slots)?;
        self.index.commit(n);

        trace!("Inserted {} pairs, len = {}", n, self.index.len());
        Ok(())
    }

    /// Samples pairs with the given random number generator.
    pub fn sample_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        batch_size: Option<usize>,
        shuffle: bool,
    ) -> Result<DemoBatch> {
        let ixs = sample_indices(rng, self.index.len(), batch_size, shuffle);
        self.gather(ixs)
    }

    fn gather(&self, ixs: Vec<usize>) -> Result<DemoBatch> {
        Ok(DemoBatch {
            state: self.state.sample(&ixs)?,
            action: self.action.sample(&ixs)?,
            ix_sample: ixs,
        })
    }

    /// Maximum number of pairs, `None` if unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.index.capacity()
    }

    /// Slot where the next pair goes.
    pub fn write_cursor(&self) -> usize {
        self.index.cursor()
    }

    /// Shape of a state.
    pub fn state_shape(&self) -> &[usize] {
        &self.config.state_shape
    }

    /// Shape of a continuous action.
    pub fn action_shape(&self) -> &[usize] {
        &self.config.action_shape
    }

    /// Representation of actions.
    pub fn action_kind(&self) -> ActionKind {
        self.config.action_kind
    }

    /// Device of the stored tensors.
    pub fn device(&self) -> Device {
        self.config.device
    }

    /// Returns all stored actions in slot order.
    pub fn whole_actions(&self) -> Result<Tensor> {
        self.action.head(self.index.len())
    }
}

impl ExperienceBufferBase for DAggerBuffer {
    type Item = DemoPair;

    fn push(&mut self, pair: Self::Item) -> Result<()> {
        self.insert_transition(pair.state.view(), pair.action)
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn total_inserted(&self) -> usize {
        self.index.total()
    }

    fn clear(&mut self) -> Result<()> {
        self.index.reset();
        self.state.reset()?;
        self.action.reset()?;
        debug!("Cleared DAgger buffer");
        Ok(())
    }
}

impl ReplayBufferBase for DAggerBuffer {
    type Config = ReplayBufferConfig;
    type Batch = DemoBatch;

    fn build(config: &Self::Config) -> Result<Self> {
        config.validate()?;
        let device = to_candle_device(config.device)?;
        let capacity = config.capacity;
        let action_dtype = match config.action_kind {
            ActionKind::Discrete => DType::I64,
            ActionKind::Continuous => DType::F32,
        };

        debug!(
            "Build DAgger buffer: capacity = {:?}, device = {:?}",
            capacity, config.device
        );

        Ok(Self {
            config: config.clone(),
            index: RingIndex::new(capacity),
            state: TensorBatch::new(&config.state_shape, DType::F32, capacity, &device)?,
            action: TensorBatch::new(
                &config.stored_action_shape(),
                action_dtype,
                capacity,
                &device,
            )?,
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    fn sample(&mut self, batch_size: Option<usize>, shuffle: bool) -> Result<Self::Batch> {
        let ixs = sample_indices(&mut self.rng, self.index.len(), batch_size, shuffle);
        self.gather(ixs)
    }
}

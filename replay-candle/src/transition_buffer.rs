//! Replay buffer of transitions for reinforcement learning.
use crate::{
    to_candle_device,
    util::{actions_to_tensor, column_to_tensor, flags_to_tensor, num_rows, states_to_tensor},
    TensorBatch,
};
use anyhow::Result;
use candle_core::{DType, Tensor};
use log::{debug, info, log_enabled, trace, warn, Level};
use ndarray::{arr1, ArrayView1, ArrayViewD, Axis};
use rand::{rngs::StdRng, Rng, SeedableRng};
use replay_core::{
    sample_indices, Action, ActionKind, Actions, BatchBase, Dataset, Device,
    ExperienceBufferBase, ReplayBufferBase, ReplayBufferConfig, RingIndex, Transition,
};

/// A batch of transitions sampled from a [`TransitionBuffer`].
///
/// All tensors are on the device of the buffer and have the sampled rows in
/// the order of `ix_sample`.
#[derive(Clone, Debug)]
pub struct TransitionBatch {
    /// States, `[n, state_shape..]` of `f32`.
    pub state: Tensor,

    /// Actions, `[n, 1]` of `i64` if discrete, `[n, action_shape..]` of `f32` if continuous.
    pub action: Tensor,

    /// Next states, `[n, state_shape..]` of `f32`.
    pub next_state: Tensor,

    /// Rewards, `[n, 1]` of `f32`.
    pub reward: Tensor,

    /// Termination flags, `[n, 1]` of `f32`.
    pub done: Tensor,

    /// Slots of the sampled transitions.
    pub ix_sample: Vec<usize>,
}

impl TransitionBatch {
    /// Returns the number of transitions.
    pub fn len(&self) -> usize {
        self.ix_sample.len()
    }

    /// Returns `true` if the batch has no transition.
    pub fn is_empty(&self) -> bool {
        self.ix_sample.is_empty()
    }

    /// Unpacks the batch into `(state, action, next_state, reward, done)`.
    pub fn unpack(self) -> (Tensor, Tensor, Tensor, Tensor, Tensor) {
        (
            self.state,
            self.action,
            self.next_state,
            self.reward,
            self.done,
        )
    }
}

/// A replay buffer of `(state, action, next_state, reward, done)` transitions.
///
/// Rows are appended until the buffer holds `capacity` transitions, after which
/// each insertion overwrites the oldest one. Without capacity, the buffer
/// grows without bound.
///
/// # Examples
///
/// ```ignore
/// let config = ReplayBufferConfig::default()
///     .state_shape(vec![1])
///     .capacity(Some(3));
/// let mut buffer = TransitionBuffer::build(&config)?;
/// for i in 0..4 {
///     let s = arr1(&[i as f32]).into_dyn();
///     buffer.insert_transition(s.view(), 0i64, s.view(), 0.0, false)?;
/// }
/// // The 4th transition replaced the 1st one.
/// let batch = buffer.sample(None, false)?;
/// assert_eq!(batch.state.to_vec2::<f32>()?, vec![vec![3.], vec![1.], vec![2.]]);
/// ```
pub struct TransitionBuffer {
    config: ReplayBufferConfig,
    index: RingIndex,
    state: TensorBatch,
    action: TensorBatch,
    next_state: TensorBatch,
    reward: TensorBatch,
    done: TensorBatch,
    rng: StdRng,
}

impl TransitionBuffer {
    /// Inserts a transition.
    ///
    /// Fails if the shapes of the states or the action differ from those of
    /// the buffer, or if the action kind differs; the buffer is left
    /// unchanged in that case.
    pub fn insert_transition(
        &mut self,
        state: ArrayViewD<f32>,
        action: impl Into<Action>,
        next_state: ArrayViewD<f32>,
        reward: f32,
        done: bool,
    ) -> Result<()> {
        let actions = match action.into() {
            Action::Discrete(a) => Actions::Discrete(arr1(&[a])),
            Action::Continuous(a) => Actions::Continuous(a.insert_axis(Axis(0))),
        };
        self.insert_batch(
            state.insert_axis(Axis(0)),
            &actions,
            next_state.insert_axis(Axis(0)),
            arr1(&[reward]).view(),
            arr1(&[done]).view(),
        )
    }

    /// Inserts a batch of transitions, the first axis of every field being
    /// the batch axis.
    ///
    /// The result is the same as inserting the rows one by one in order.
    /// Every field is checked before the buffer is modified, so a shape error
    /// inserts no row.
    pub fn insert_batch(
        &mut self,
        states: ArrayViewD<f32>,
        actions: &Actions,
        next_states: ArrayViewD<f32>,
        rewards: ArrayView1<f32>,
        dones: ArrayView1<bool>,
    ) -> Result<()> {
        let device = self.state.device().clone();
        let state_shape = &self.config.state_shape;
        let n = num_rows(&states, state_shape)?;

        let state = states_to_tensor("states", states, n, state_shape, &device)?;
        let action = actions_to_tensor(
            actions,
            self.config.action_kind,
            n,
            &self.config.action_shape,
            &device,
        )?;
        let next_state = states_to_tensor("next_states", next_states, n, state_shape, &device)?;
        let reward = column_to_tensor("rewards", rewards, n, &device)?;
        let done = flags_to_tensor("dones", dones, n, &device)?;

        let segments = self.index.plan(n);
        let slots = self.index.required_slots(n);
        self.state.push_segments(&segments, &state, slots)?;
        self.action.push_segments(&segments, &action, slots)?;
        self.next_state.push_segments(&segments, &next_state, slots)?;
        self.reward.push_segments(&segments, &reward, slots)?;
        self.done.push_segments(&segments, &done, slots)?;
        self.index.commit(n);

        trace!(
            "Inserted {} transitions, len = {}, total = {}",
            n,
            self.index.len(),
            self.index.total()
        );
        Ok(())
    }

    /// Inserts the transitions of a dataset.
    ///
    /// The dataset must have the keys `observations`, `actions`,
    /// `next_observations`, `rewards` and `terminals`.
    pub fn insert_dataset(&mut self, dataset: &Dataset) -> Result<()> {
        let (obs, act, next_obs, reward, terminal) =
            dataset.transition_columns(self.config.action_kind)?;
        self.insert_batch(
            obs.view(),
            &act,
            next_obs.view(),
            reward.view(),
            terminal.view(),
        )?;

        info!("Inserted {} transitions from dataset", reward.len());
        self.log_stats();
        Ok(())
    }

    /// Logs the content of the buffer; a failure to read the statistics is
    /// logged rather than returned, as the rows are already inserted.
    fn log_stats(&self) {
        if !log_enabled!(Level::Info) {
            return;
        }
        info!("In replay buffer:");
        info!("{} transitions", self.len());
        match (self.num_done_flags(), self.sum_rewards()) {
            (Ok(n), Ok(sum)) => {
                info!("{} done flags", n);
                info!("{} reward sum", sum);
            }
            (Err(e), _) | (_, Err(e)) => warn!("Failed to read buffer statistics: {}", e),
        }
    }

    /// Samples transitions with the given random number generator.
    ///
    /// See [`ReplayBufferBase::sample`].
    pub fn sample_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        batch_size: Option<usize>,
        shuffle: bool,
    ) -> Result<TransitionBatch> {
        let ixs = sample_indices(rng, self.index.len(), batch_size, shuffle);
        self.gather(ixs)
    }

    fn gather(&self, ixs: Vec<usize>) -> Result<TransitionBatch> {
        Ok(TransitionBatch {
            state: self.state.sample(&ixs)?,
            action: self.action.sample(&ixs)?,
            next_state: self.next_state.sample(&ixs)?,
            reward: self.reward.sample(&ixs)?,
            done: self.done.sample(&ixs)?,
            ix_sample: ixs,
        })
    }

    /// Maximum number of transitions, `None` if unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.index.capacity()
    }

    /// Slot where the next transition goes.
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
    ///
    /// This copies the whole action storage; use with care on large buffers.
    pub fn whole_actions(&self) -> Result<Tensor> {
        self.action.head(self.index.len())
    }

    /// Returns the sum of the stored rewards.
    pub fn sum_rewards(&self) -> Result<f32> {
        if self.index.is_empty() {
            return Ok(0.0);
        }
        Ok(self
            .reward
            .head(self.index.len())?
            .sum_all()?
            .to_scalar::<f32>()?)
    }

    /// Returns the number of stored transitions with the done flag.
    pub fn num_done_flags(&self) -> Result<usize> {
        if self.index.is_empty() {
            return Ok(0);
        }
        let n = self
            .done
            .head(self.index.len())?
            .sum_all()?
            .to_scalar::<f32>()?;
        Ok(n as usize)
    }
}

impl ExperienceBufferBase for TransitionBuffer {
    type Item = Transition;

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        self.insert_transition(
            tr.state.view(),
            tr.action,
            tr.next_state.view(),
            tr.reward,
            tr.done,
        )
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
        self.next_state.reset()?;
        self.reward.reset()?;
        self.done.reset()?;
        debug!("Cleared transition buffer");
        Ok(())
    }
}

impl ReplayBufferBase for TransitionBuffer {
    type Config = ReplayBufferConfig;
    type Batch = TransitionBatch;

    /// Creates an empty buffer on the configured device.
    fn build(config: &Self::Config) -> Result<Self> {
        config.validate()?;
        let device = to_candle_device(config.device)?;
        let capacity = config.capacity;
        let action_dtype = match config.action_kind {
            ActionKind::Discrete => DType::I64,
            ActionKind::Continuous => DType::F32,
        };
        let action_shape = config.stored_action_shape();

        debug!(
            "Build transition buffer: capacity = {:?}, device = {:?}",
            capacity, config.device
        );

        Ok(Self {
            config: config.clone(),
            index: RingIndex::new(capacity),
            state: TensorBatch::new(&config.state_shape, DType::F32, capacity, &device)?,
            action: TensorBatch::new(&action_shape, action_dtype, capacity, &device)?,
            next_state: TensorBatch::new(&config.state_shape, DType::F32, capacity, &device)?,
            reward: TensorBatch::new(&[1], DType::F32, capacity, &device)?,
            done: TensorBatch::new(&[1], DType::F32, capacity, &device)?,
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    fn sample(&mut self, batch_size: Option<usize>, shuffle: bool) -> Result<Self::Batch> {
        let ixs = sample_indices(&mut self.rng, self.index.len(), batch_size, shuffle);
        self.gather(ixs)
    }
}

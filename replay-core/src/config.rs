//! Configuration of replay buffers.
use crate::{ActionKind, ReplayError};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq, Eq)]
/// Storage location of a replay buffer.
///
/// Backend crates convert this into their own device type; it exists because
/// tensor device types do not support serialization.
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// A CUDA device with the given ordinal.
    Cuda(usize),

    /// A Metal device with the given ordinal.
    Metal(usize),
}

/// Configuration of a replay buffer.
///
/// # Examples
///
/// ```rust
/// use replay_core::{ActionKind, ReplayBufferConfig};
///
/// let config = ReplayBufferConfig::default()
///     .state_shape(vec![4])
///     .action_kind(ActionKind::Discrete)
///     .capacity(Some(10000))
///     .seed(42);
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ReplayBufferConfig {
    /// Shape of a single state.
    pub state_shape: Vec<usize>,

    /// Shape of a single continuous action. Ignored for discrete actions,
    /// which are stored as `[1]` labels.
    pub action_shape: Vec<usize>,

    /// Representation of actions.
    pub action_kind: ActionKind,

    /// Device where the buffer stores its fields.
    pub device: Device,

    /// Maximum number of stored items. `None` means the buffer never drops
    /// old items.
    pub capacity: Option<usize>,

    /// Seed of the random number generator used for shuffling.
    pub seed: u64,
}

impl Default for ReplayBufferConfig {
    fn default() -> Self {
        Self {
            state_shape: vec![1],
            action_shape: vec![1],
            action_kind: ActionKind::Discrete,
            device: Device::Cpu,
            capacity: None,
            seed: 42,
        }
    }
}

impl ReplayBufferConfig {
    /// Sets the shape of a state.
    pub fn state_shape(mut self, state_shape: Vec<usize>) -> Self {
        self.state_shape = state_shape;
        self
    }

    /// Sets the shape of a continuous action.
    pub fn action_shape(mut self, action_shape: Vec<usize>) -> Self {
        self.action_shape = action_shape;
        self
    }

    /// Sets the representation of actions.
    pub fn action_kind(mut self, action_kind: ActionKind) -> Self {
        self.action_kind = action_kind;
        self
    }

    /// Sets the device.
    pub fn device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Sets the capacity. `None` makes the buffer unbounded.
    pub fn capacity(mut self, capacity: Option<usize>) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the random seed for shuffling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Shape of the stored action rows.
    ///
    /// Discrete actions are stored as `[1]` regardless of `action_shape`.
    pub fn stored_action_shape(&self) -> Vec<usize> {
        match self.action_kind {
            ActionKind::Discrete => vec![1],
            ActionKind::Continuous => self.action_shape.clone(),
        }
    }

    /// Checks the parameters that can not be expressed by types.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == Some(0) {
            return Err(ReplayError::InvalidCapacity.into());
        }
        Ok(())
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

//! Replay buffers stored in [candle](https://crates.io/crates/candle-core) tensors.
//!
//! - [`TransitionBuffer`] stores `(state, action, next_state, reward, done)`
//!   transitions for reinforcement learning.
//! - [`DAggerBuffer`] stores `(state, action)` demonstration pairs for
//!   imitation learning.
//!
//! Both buffers keep every field in one tensor on the device given in
//! [`ReplayBufferConfig`](replay_core::ReplayBufferConfig). Host arrays are
//! converted when inserted, and sampled batches stay on the device.
//!
//! ```no_run
//! use ndarray::arr1;
//! use replay_candle::TransitionBuffer;
//! use replay_core::{ReplayBufferBase, ReplayBufferConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = ReplayBufferConfig::default()
//!     .state_shape(vec![2])
//!     .capacity(Some(1000));
//! let mut buffer = TransitionBuffer::build(&config)?;
//! let s = arr1(&[0.0f32, 1.0]).into_dyn();
//! buffer.insert_transition(s.view(), 1i64, s.view(), 1.0, false)?;
//! let batch = buffer.sample(Some(32), true)?;
//! # Ok(())
//! # }
//! ```
mod dagger_buffer;
mod device;
mod tensor_batch;
mod transition_buffer;
pub mod util;
pub use dagger_buffer::{DAggerBuffer, DemoBatch};
pub use device::to_candle_device;
pub use tensor_batch::TensorBatch;
pub use transition_buffer::{TransitionBatch, TransitionBuffer};

#![warn(missing_docs)]
//! Core components of experience replay buffers.
//!
//! This crate contains the backend-agnostic parts of the replay buffers:
//!
//! - [`ReplayBufferConfig`]: construction parameters, loadable from YAML
//! - [`RingIndex`]: the cursor/length bookkeeping of a growable-then-circular store
//! - [`sample_indices`]: uniform sampling of stored rows without replacement
//! - [`Action`], [`Actions`] and [`Dataset`]: host-side inputs of the buffers
//! - [`ExperienceBufferBase`], [`ReplayBufferBase`] and [`BatchBase`]: the
//!   interfaces implemented by tensor backends
//!
//! Buffers themselves live in backend crates, which store the fields on a
//! compute device and implement the traits defined here.
pub mod error;

mod action;
mod base;
mod config;
mod dataset;
mod ring;
mod sample;
mod transition;
pub use action::{Action, ActionKind, Actions};
pub use base::{BatchBase, ExperienceBufferBase, ReplayBufferBase};
pub use config::{Device, ReplayBufferConfig};
pub use dataset::{Dataset, Field, TransitionColumns};
pub use error::ReplayError;
pub use ring::{RingIndex, Segment};
pub use sample::sample_indices;
pub use transition::{DemoPair, Transition};

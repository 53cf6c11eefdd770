//! Items pushed into replay buffers one at a time.
use crate::Action;
use ndarray::ArrayD;

/// One step of interaction, `(s_t, a_t, s_t+1, r_t, done_t)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// State before the action.
    pub state: ArrayD<f32>,

    /// Taken action.
    pub action: Action,

    /// State after the action.
    pub next_state: ArrayD<f32>,

    /// Reward.
    pub reward: f32,

    /// `true` if the episode terminated at this step.
    pub done: bool,
}

impl Transition {
    /// Creates a transition.
    pub fn new(
        state: ArrayD<f32>,
        action: impl Into<Action>,
        next_state: ArrayD<f32>,
        reward: f32,
        done: bool,
    ) -> Self {
        Self {
            state,
            action: action.into(),
            next_state,
            reward,
            done,
        }
    }
}

/// A demonstration pair `(s_t, a_t)` labeled by an expert.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoPair {
    /// Visited state.
    pub state: ArrayD<f32>,

    /// Expert action at the state.
    pub action: Action,
}

impl DemoPair {
    /// Creates a demonstration pair.
    pub fn new(state: ArrayD<f32>, action: impl Into<Action>) -> Self {
        Self {
            state,
            action: action.into(),
        }
    }
}

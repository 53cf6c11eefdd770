//! Actions given to replay buffers.
use crate::ReplayError;
use ndarray::{Array1, ArrayD};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Representation of actions, fixed when a buffer is built.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Integer labels, stored as `[1]` rows of `i64`.
    Discrete,

    /// Real vectors, stored as `action_shape` rows of `f32`.
    Continuous,
}

impl FromStr for ActionKind {
    type Err = ReplayError;

    /// Parses the kind from its name or from the name of its element type.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discrete" | "int64" | "i64" => Ok(Self::Discrete),
            "continuous" | "float32" | "f32" => Ok(Self::Continuous),
            _ => Err(ReplayError::UnsupportedActionKind(s.to_string())),
        }
    }
}

/// A single action in host memory.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Label of a discrete action.
    Discrete(i64),

    /// Continuous action vector.
    Continuous(ArrayD<f32>),
}

impl Action {
    /// Returns the kind of this action.
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Discrete(_) => ActionKind::Discrete,
            Self::Continuous(_) => ActionKind::Continuous,
        }
    }
}

impl From<i64> for Action {
    fn from(a: i64) -> Self {
        Self::Discrete(a)
    }
}

impl From<ArrayD<f32>> for Action {
    fn from(a: ArrayD<f32>) -> Self {
        Self::Continuous(a)
    }
}

impl From<Vec<f32>> for Action {
    fn from(a: Vec<f32>) -> Self {
        Self::Continuous(Array1::from(a).into_dyn())
    }
}

/// A batch of actions in host memory.
///
/// The first axis is the batch axis.
#[derive(Debug, Clone, PartialEq)]
pub enum Actions {
    /// Labels of discrete actions, one per row.
    Discrete(Array1<i64>),

    /// Continuous actions with shape `[n, action_shape..]`.
    Continuous(ArrayD<f32>),
}

impl Actions {
    /// Returns the kind of the actions.
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Discrete(_) => ActionKind::Discrete,
            Self::Continuous(_) => ActionKind::Continuous,
        }
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        match self {
            Self::Discrete(a) => a.len(),
            Self::Continuous(a) => a.shape().first().copied().unwrap_or(0),
        }
    }

    /// Returns `true` if there is no row.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<i64>> for Actions {
    fn from(a: Vec<i64>) -> Self {
        Self::Discrete(Array1::from(a))
    }
}

impl From<ArrayD<f32>> for Actions {
    fn from(a: ArrayD<f32>) -> Self {
        Self::Continuous(a)
    }
}

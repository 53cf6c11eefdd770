//! Labeled bundles of transitions for bulk ingestion.
use crate::{ActionKind, Actions, ReplayError};
use anyhow::Result;
use ndarray::{Array1, ArrayD, Axis, Ix1};
use std::collections::BTreeMap;

/// Columns of a dataset converted for insertion into a transition buffer:
/// `(observations, actions, next_observations, rewards, terminals)`.
pub type TransitionColumns = (ArrayD<f32>, Actions, ArrayD<f32>, Array1<f32>, Array1<bool>);

/// An array stored in a [`Dataset`], the first axis being the row axis.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// Real values.
    Float(ArrayD<f32>),

    /// Integer values, e.g., discrete action labels.
    Int(ArrayD<i64>),

    /// Flags.
    Bool(ArrayD<bool>),
}

impl Field {
    /// Returns the shape of the array.
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Float(a) => a.shape(),
            Self::Int(a) => a.shape(),
            Self::Bool(a) => a.shape(),
        }
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.shape().first().copied().unwrap_or(0)
    }

    /// Returns `true` if there is no row.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts the values into `f32`.
    pub fn to_f32(&self) -> ArrayD<f32> {
        match self {
            Self::Float(a) => a.clone(),
            Self::Int(a) => a.mapv(|x| x as f32),
            Self::Bool(a) => a.mapv(|x| if x { 1.0 } else { 0.0 }),
        }
    }

    /// Converts the values into per-row scalars.
    ///
    /// Accepts arrays of shape `[n]` or `[n, 1]`.
    pub fn to_column(&self, name: &'static str) -> Result<ArrayD<f32>> {
        let a = self.to_f32();
        let shape = a.shape().to_vec();
        match shape.as_slice() {
            [_] => Ok(a),
            [_, 1] => Ok(a.remove_axis(Axis(1))),
            _ => Err(ReplayError::ShapeMismatch {
                field: name,
                expected: vec![self.len()],
                actual: shape,
            }
            .into()),
        }
    }

    /// Converts the values into actions of the given kind.
    ///
    /// Discrete labels are accepted with shape `[n]` or `[n, 1]`; real-valued
    /// labels are truncated towards zero.
    pub fn to_actions(&self, kind: ActionKind) -> Result<Actions> {
        match kind {
            ActionKind::Continuous => Ok(Actions::Continuous(self.to_f32())),
            ActionKind::Discrete => {
                let labels = match self {
                    Self::Int(a) => a.clone(),
                    Self::Float(a) => a.mapv(|x| x as i64),
                    Self::Bool(a) => a.mapv(i64::from),
                };
                let labels = match labels.ndim() {
                    2 if labels.shape()[1] == 1 => labels.remove_axis(Axis(1)),
                    _ => labels,
                };
                let shape = labels.shape().to_vec();
                let labels = labels.into_dimensionality::<Ix1>().map_err(|_| {
                    ReplayError::ShapeMismatch {
                        field: "actions",
                        expected: vec![self.len(), 1],
                        actual: shape,
                    }
                })?;
                Ok(Actions::Discrete(labels))
            }
        }
    }
}

impl From<ArrayD<f32>> for Field {
    fn from(a: ArrayD<f32>) -> Self {
        Self::Float(a)
    }
}

impl From<ArrayD<i64>> for Field {
    fn from(a: ArrayD<i64>) -> Self {
        Self::Int(a)
    }
}

impl From<ArrayD<bool>> for Field {
    fn from(a: ArrayD<bool>) -> Self {
        Self::Bool(a)
    }
}

/// A labeled bundle of arrays, e.g., an offline RL dataset.
///
/// Transition buffers read the keys [`Dataset::OBSERVATIONS`],
/// [`Dataset::ACTIONS`], [`Dataset::NEXT_OBSERVATIONS`], [`Dataset::REWARDS`]
/// and [`Dataset::TERMINALS`]; other keys are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    fields: BTreeMap<String, Field>,
}

impl Dataset {
    /// Key of states.
    pub const OBSERVATIONS: &'static str = "observations";
    /// Key of actions.
    pub const ACTIONS: &'static str = "actions";
    /// Key of next states.
    pub const NEXT_OBSERVATIONS: &'static str = "next_observations";
    /// Key of rewards.
    pub const REWARDS: &'static str = "rewards";
    /// Key of termination flags.
    pub const TERMINALS: &'static str = "terminals";

    /// Creates an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, returning the dataset.
    pub fn with(mut self, key: impl Into<String>, field: impl Into<Field>) -> Self {
        self.insert(key, field);
        self
    }

    /// Adds a field, returning the previous one under the same key.
    pub fn insert(&mut self, key: impl Into<String>, field: impl Into<Field>) -> Option<Field> {
        self.fields.insert(key.into(), field.into())
    }

    /// Returns the field of the given key.
    pub fn get(&self, key: &str) -> Result<&Field> {
        self.fields
            .get(key)
            .ok_or_else(|| ReplayError::MissingField(key.to_string()).into())
    }

    /// Extracts the columns of transitions.
    ///
    /// Fails if any of the five keys is absent or if rewards or terminals are
    /// not per-row scalars. Shapes of states and actions are checked by the
    /// buffer.
    pub fn transition_columns(&self, kind: ActionKind) -> Result<TransitionColumns> {
        let obs = self.get(Self::OBSERVATIONS)?;
        let act = self.get(Self::ACTIONS)?;
        let next_obs = self.get(Self::NEXT_OBSERVATIONS)?;
        let reward = self.get(Self::REWARDS)?;
        let terminal = self.get(Self::TERMINALS)?;

        let reward = reward
            .to_column("rewards")?
            .into_dimensionality::<Ix1>()?;
        let terminal = terminal
            .to_column("terminals")?
            .into_dimensionality::<Ix1>()?
            .mapv(|x| x != 0.0);

        Ok((
            obs.to_f32(),
            act.to_actions(kind)?,
            next_obs.to_f32(),
            reward,
            terminal,
        ))
    }
}

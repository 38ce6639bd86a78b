use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CheckpointError;

/// A dense `f32` tensor stored as its shape and row-major values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorState {
    pub shape: Vec<usize>,
    #[serde(with = "crate::checkpoint::float::vec")]
    pub values: Vec<f32>,
}

impl TensorState {
    pub fn new(shape: Vec<usize>, values: Vec<f32>) -> Result<Self, CheckpointError> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(CheckpointError::StateDict(format!(
                "tensor of shape {:?} needs {} values, got {}",
                shape,
                expected,
                values.len()
            )));
        }
        Ok(TensorState { shape, values })
    }
}

/// A single entry of a [`StateDict`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StateValue {
    Bool(bool),
    Int(i64),
    Float(#[serde(with = "crate::checkpoint::float")] f64),
    Text(String),
    Tensor(TensorState),
    Bytes(Vec<u8>),
    List(Vec<StateValue>),
    Dict(StateDict),
}

impl From<bool> for StateValue {
    fn from(v: bool) -> Self {
        StateValue::Bool(v)
    }
}

impl From<i64> for StateValue {
    fn from(v: i64) -> Self {
        StateValue::Int(v)
    }
}

impl From<i32> for StateValue {
    fn from(v: i32) -> Self {
        StateValue::Int(v.into())
    }
}

impl From<u32> for StateValue {
    fn from(v: u32) -> Self {
        StateValue::Int(v.into())
    }
}

// Counters wider than `i64` are rejected rather than wrapped.
impl TryFrom<u64> for StateValue {
    type Error = CheckpointError;

    fn try_from(v: u64) -> Result<Self, Self::Error> {
        i64::try_from(v)
            .map(StateValue::Int)
            .map_err(|_| CheckpointError::StateDict(format!("integer {v} does not fit in i64")))
    }
}

impl TryFrom<usize> for StateValue {
    type Error = CheckpointError;

    fn try_from(v: usize) -> Result<Self, Self::Error> {
        StateValue::try_from(v as u64)
    }
}

impl From<f64> for StateValue {
    fn from(v: f64) -> Self {
        StateValue::Float(v)
    }
}

impl From<f32> for StateValue {
    fn from(v: f32) -> Self {
        StateValue::Float(v as f64)
    }
}

impl From<&str> for StateValue {
    fn from(v: &str) -> Self {
        StateValue::Text(v.to_string())
    }
}

impl From<String> for StateValue {
    fn from(v: String) -> Self {
        StateValue::Text(v)
    }
}

impl From<TensorState> for StateValue {
    fn from(v: TensorState) -> Self {
        StateValue::Tensor(v)
    }
}

impl From<Vec<u8>> for StateValue {
    fn from(v: Vec<u8>) -> Self {
        StateValue::Bytes(v)
    }
}

impl From<StateDict> for StateValue {
    fn from(v: StateDict) -> Self {
        StateValue::Dict(v)
    }
}

/// Mapping capturing the full restorable state of one object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateDict(BTreeMap<String, StateValue>);

impl StateDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<StateValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder form of [`StateDict::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<StateValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<StateValue> {
        self.0.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn require(&self, key: &str) -> Result<&StateValue, CheckpointError> {
        self.0
            .get(key)
            .ok_or_else(|| CheckpointError::StateDict(format!("missing key '{key}'")))
    }

    fn mismatch(key: &str, expected: &str) -> CheckpointError {
        CheckpointError::StateDict(format!("key '{key}' is not {expected}"))
    }

    pub fn bool(&self, key: &str) -> Result<bool, CheckpointError> {
        match self.require(key)? {
            StateValue::Bool(v) => Ok(*v),
            _ => Err(Self::mismatch(key, "a bool")),
        }
    }

    pub fn int(&self, key: &str) -> Result<i64, CheckpointError> {
        match self.require(key)? {
            StateValue::Int(v) => Ok(*v),
            _ => Err(Self::mismatch(key, "an int")),
        }
    }

    /// Floats and ints both read as `f64`.
    pub fn float(&self, key: &str) -> Result<f64, CheckpointError> {
        match self.require(key)? {
            StateValue::Float(v) => Ok(*v),
            StateValue::Int(v) => Ok(*v as f64),
            _ => Err(Self::mismatch(key, "a number")),
        }
    }

    pub fn text(&self, key: &str) -> Result<&str, CheckpointError> {
        match self.require(key)? {
            StateValue::Text(v) => Ok(v),
            _ => Err(Self::mismatch(key, "text")),
        }
    }

    pub fn tensor(&self, key: &str) -> Result<&TensorState, CheckpointError> {
        match self.require(key)? {
            StateValue::Tensor(v) => Ok(v),
            _ => Err(Self::mismatch(key, "a tensor")),
        }
    }

    pub fn bytes(&self, key: &str) -> Result<&[u8], CheckpointError> {
        match self.require(key)? {
            StateValue::Bytes(v) => Ok(v),
            _ => Err(Self::mismatch(key, "bytes")),
        }
    }

    pub fn dict(&self, key: &str) -> Result<&StateDict, CheckpointError> {
        match self.require(key)? {
            StateValue::Dict(v) => Ok(v),
            _ => Err(Self::mismatch(key, "a dict")),
        }
    }
}

impl FromIterator<(String, StateValue)> for StateDict {
    fn from_iter<I: IntoIterator<Item = (String, StateValue)>>(iter: I) -> Self {
        StateDict(iter.into_iter().collect())
    }
}

/// An object whose full state can be extracted and later restored: model weights,
/// optimizer moments, learning-rate schedules.
pub trait Checkpointable {
    /// Capture the current state.
    fn state_dict(&self) -> Result<StateDict, CheckpointError>;

    /// Restore a state previously produced by [`Checkpointable::state_dict`].
    fn load_state_dict(&mut self, state: StateDict) -> Result<(), CheckpointError>;
}

// Wrappers delegate to the wrapped object, so the state dict of a boxed model is the
// state dict of the model itself.
impl<T: Checkpointable + ?Sized> Checkpointable for Box<T> {
    fn state_dict(&self) -> Result<StateDict, CheckpointError> {
        (**self).state_dict()
    }

    fn load_state_dict(&mut self, state: StateDict) -> Result<(), CheckpointError> {
        (**self).load_state_dict(state)
    }
}

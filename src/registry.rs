//! Named, insertion-ordered collections of borrowed objects.
//!
//! A [`Registry`] never owns what it holds: the training loop keeps ownership of its
//! models and optimizers and lends them for the duration of a single evaluator or
//! checkpoint call.

use crate::checkpoint::Checkpointable;

/// Ordered mapping from name to a mutable borrow.
pub struct Registry<'a, T: ?Sized> {
    entries: Vec<(String, &'a mut T)>,
}

/// Models handed to the evaluator.
pub type ModelRegistry<'a, M> = Registry<'a, M>;

/// Stateful objects handed to the checkpoint manager.
pub type Checkpointables<'a> = Registry<'a, dyn Checkpointable + 'a>;

impl<'a, T: ?Sized> Registry<'a, T> {
    pub fn new() -> Self {
        Registry {
            entries: Vec::new(),
        }
    }

    /// Register `item` under `name`, replacing any previous entry with that name.
    pub fn insert(&mut self, name: impl Into<String>, item: &'a mut T) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = item,
            None => self.entries.push((name, item)),
        }
    }

    /// Builder form of [`Registry::insert`].
    pub fn with(mut self, name: impl Into<String>, item: &'a mut T) -> Self {
        self.insert(name, item);
        self
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, item)| &**item)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, item)| &mut **item)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + use<'_, 'a, T> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> + use<'_, 'a, T> {
        self.entries.iter().map(|(n, item)| (n.as_str(), &**item))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut T)> + use<'_, 'a, T> {
        self.entries
            .iter_mut()
            .map(|(n, item)| (n.as_str(), &mut **item))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: ?Sized> Default for Registry<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

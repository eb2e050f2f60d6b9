use std::collections::HashMap;

use crate::tensor::{DType, Tensor};

/// An ordered collection of uniquely named tensors.
///
/// Iteration follows insertion order, replacing an existing name keeps its position.
#[derive(Debug, Clone, Default)]
pub struct TensorStore {
    entries: Vec<(String, Tensor)>,
    index: HashMap<String, usize>,
}

impl TensorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a tensor under `name`.
    ///
    /// # Arguments
    /// * `name` - The unique name of the tensor.
    /// * `tensor` - The tensor to store.
    ///
    /// # Returns
    /// The tensor previously stored under `name`, if any.
    pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor) -> Option<Tensor> {
        let name = name.into();

        if let Some(&idx) = self.index.get(&name) {
            return Some(std::mem::replace(&mut self.entries[idx].1, tensor));
        }

        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, tensor));
        None
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.index.get(name).map(|&idx| &self.entries[idx].1)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Tensor> {
        self.index.get(name).map(|&idx| &mut self.entries[idx].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.entries.iter().map(|(name, t)| (name.as_str(), t))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Tensor)> {
        self.entries.iter_mut().map(|(name, t)| (name.as_str(), t))
    }
}

impl<S: Into<String>> FromIterator<(S, Tensor)> for TensorStore {
    fn from_iter<I: IntoIterator<Item = (S, Tensor)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (name, tensor) in iter {
            store.insert(name, tensor);
        }
        store
    }
}

impl IntoIterator for TensorStore {
    type Item = (String, Tensor);
    type IntoIter = std::vec::IntoIter<(String, Tensor)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Borrowed `(name, parameter)` pairs of a module.
pub type NamedParameters<'a> = Box<dyn Iterator<Item = (&'a str, &'a Tensor)> + 'a>;

/// Mutably borrowed `(name, parameter)` pairs of a module.
pub type NamedParametersMut<'a> = Box<dyn Iterator<Item = (&'a str, &'a mut Tensor)> + 'a>;

/// A model that exposes its trainable parameters by name.
pub trait ParameterModule {
    /// Returns the named parameters in registration order, submodules included.
    fn named_parameters(&self) -> NamedParameters<'_>;

    /// Returns the named parameters for in place mutation.
    fn named_parameters_mut(&mut self) -> NamedParametersMut<'_>;

    /// Returns the configured default precision of the model.
    fn compute_dtype(&self) -> DType;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(v: f32) -> Tensor {
        Tensor::from_shape_vec(&[1], vec![v]).unwrap()
    }

    #[test]
    fn test_preserves_insertion_order() {
        let store: TensorStore = [("c", scalar(0.0)), ("a", scalar(1.0)), ("b", scalar(2.0))]
            .into_iter()
            .collect();

        assert_eq!(store.names().collect::<Vec<_>>(), ["c", "a", "b"]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut store = TensorStore::new();
        store.insert("x", scalar(1.0));
        store.insert("y", scalar(2.0));

        let old = store.insert("x", scalar(3.0)).unwrap();

        assert_eq!(old, scalar(1.0));
        assert_eq!(store.len(), 2);
        assert_eq!(store.names().collect::<Vec<_>>(), ["x", "y"]);
        assert_eq!(store.get("x"), Some(&scalar(3.0)));
    }

    #[test]
    fn test_missing_name() {
        let mut store = TensorStore::new();
        assert!(store.get("nope").is_none());
        assert!(store.get_mut("nope").is_none());
        assert!(!store.contains("nope"));
    }
}

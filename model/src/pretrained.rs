use log::debug;

use crate::{
    ModelErr, Result,
    store::{NamedParameters, NamedParametersMut, ParameterModule, TensorStore},
    tensor::DType,
};

/// Static configuration of a pretrained model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelConfig {
    /// The default precision the model computes in.
    pub torch_dtype: DType,
}

/// The adapters loaded into a model and which one is active.
#[derive(Debug, Clone, Default)]
pub struct AdapterSet {
    loaded: Vec<String>,
    active: Option<String>,
}

impl AdapterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new adapter by name, the first loaded adapter becomes active.
    pub fn load(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.loaded.contains(&name) {
            return;
        }

        if self.active.is_none() {
            self.active = Some(name.clone());
        }
        self.loaded.push(name);
    }

    /// Makes `name` the active adapter.
    ///
    /// # Returns
    /// An `UnknownAdapter` error if no adapter was loaded under that name.
    pub fn set_active(&mut self, name: &str) -> Result<()> {
        if !self.loaded.iter().any(|n| n == name) {
            return Err(ModelErr::UnknownAdapter {
                name: name.to_string(),
            });
        }

        self.active = Some(name.to_string());
        Ok(())
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.loaded.iter().map(String::as_str)
    }
}

/// A pretrained backbone with its parameters and adapters.
#[derive(Debug, Clone)]
pub struct PretrainedModel {
    config: ModelConfig,
    parameters: TensorStore,
    adapters: AdapterSet,
}

impl PretrainedModel {
    /// Creates a new `PretrainedModel` with no adapters loaded.
    ///
    /// # Arguments
    /// * `config` - The model's configuration.
    /// * `parameters` - The named parameters in registration order.
    pub fn new(config: ModelConfig, parameters: TensorStore) -> Self {
        Self {
            config,
            parameters,
            adapters: AdapterSet::new(),
        }
    }

    /// Loads an adapter by name.
    pub fn with_adapter(mut self, name: impl Into<String>) -> Self {
        self.load_adapter(name);
        self
    }

    pub fn load_adapter(&mut self, name: impl Into<String>) {
        self.adapters.load(name);
    }

    /// Sets the active adapter.
    ///
    /// # Returns
    /// An `UnknownAdapter` error if the adapter was never loaded.
    pub fn set_adapter(&mut self, name: &str) -> Result<()> {
        self.adapters.set_active(name)?;
        debug!(adapter = name; "active adapter changed");
        Ok(())
    }

    pub fn active_adapter(&self) -> Option<&str> {
        self.adapters.active()
    }

    pub fn adapters(&self) -> &AdapterSet {
        &self.adapters
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

impl ParameterModule for PretrainedModel {
    fn named_parameters(&self) -> NamedParameters<'_> {
        Box::new(self.parameters.iter())
    }

    fn named_parameters_mut(&mut self) -> NamedParametersMut<'_> {
        Box::new(self.parameters.iter_mut())
    }

    fn compute_dtype(&self) -> DType {
        self.config.torch_dtype
    }
}

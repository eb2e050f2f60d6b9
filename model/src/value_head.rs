use std::{fmt, str::FromStr};

use log::debug;
use ndarray::{Array1, ArrayView2, ArrayView3};

use crate::{
    ModelErr, Result,
    head::{self, Linear, ValueHead},
    loader::{VALUE_HEAD_BIAS, VALUE_HEAD_WEIGHT},
    pretrained::PretrainedModel,
    store::{NamedParameters, NamedParametersMut, ParameterModule, TensorStore},
    tensor::{DType, Tensor},
};

/// The two heads a policy can be switched between.
///
/// Each variant names both its adapter and its pair of head buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeadVariant {
    Default,
    Reward,
}

impl HeadVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            HeadVariant::Default => "default",
            HeadVariant::Reward => "reward",
        }
    }

    /// Name of the buffer holding this variant's head weight.
    pub fn weight_key(self) -> String {
        format!("{}_head_weight", self.as_str())
    }

    /// Name of the buffer holding this variant's head bias.
    pub fn bias_key(self) -> String {
        format!("{}_head_bias", self.as_str())
    }
}

impl fmt::Display for HeadVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeadVariant {
    type Err = ModelErr;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "default" => Ok(HeadVariant::Default),
            "reward" => Ok(HeadVariant::Reward),
            other => Err(ModelErr::UnknownVariant(other.to_string())),
        }
    }
}

/// Weight and bias of a value head, as stored on disk or in buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadParams {
    pub weight: Tensor,
    pub bias: Tensor,
}

impl From<Linear> for HeadParams {
    fn from(value: Linear) -> Self {
        Self {
            weight: value.weight,
            bias: value.bias,
        }
    }
}

/// A causal language model with a scalar value head and named head buffers.
///
/// Its parameters are the backbone's followed by `v_head.summary.weight` and
/// `v_head.summary.bias`.
#[derive(Debug, Clone)]
pub struct ValueHeadModel {
    pretrained_model: PretrainedModel,
    v_head: ValueHead,
    buffers: TensorStore,
}

impl ValueHeadModel {
    /// Creates a new `ValueHeadModel` without buffers.
    ///
    /// # Arguments
    /// * `pretrained_model` - The backbone carrying the adapters.
    /// * `v_head` - The scalar head on top of the backbone.
    pub fn new(pretrained_model: PretrainedModel, v_head: ValueHead) -> Self {
        Self {
            pretrained_model,
            v_head,
            buffers: TensorStore::new(),
        }
    }

    pub fn pretrained_model(&self) -> &PretrainedModel {
        &self.pretrained_model
    }

    pub fn v_head(&self) -> &ValueHead {
        &self.v_head
    }

    pub fn buffers(&self) -> &TensorStore {
        &self.buffers
    }

    /// Registers a non trainable tensor, replacing any buffer with the same name.
    pub fn register_buffer(&mut self, name: impl Into<String>, tensor: Tensor) {
        self.buffers.insert(name, tensor);
    }

    /// Looks up a buffer by name.
    ///
    /// # Returns
    /// A `MissingBuffer` error if no buffer was registered under `name`.
    pub fn get_buffer(&self, name: &str) -> Result<&Tensor> {
        self.buffers.get(name).ok_or_else(|| ModelErr::MissingBuffer {
            name: name.to_string(),
        })
    }

    /// Registers the reward head buffers next to zeroed default head slots.
    ///
    /// The default slots get filled with the live head the first time the model is
    /// switched to the reward head.
    pub fn register_reward_head(&mut self, params: HeadParams) {
        let default_weight = params.weight.zeros_like();
        let default_bias = params.bias.zeros_like();

        self.register_buffer(HeadVariant::Reward.weight_key(), params.weight);
        self.register_buffer(HeadVariant::Reward.bias_key(), params.bias);
        self.register_buffer(HeadVariant::Default.weight_key(), default_weight);
        self.register_buffer(HeadVariant::Default.bias_key(), default_bias);
    }

    /// Switches the active adapter and the value head to `target`.
    ///
    /// Switching to the reward head first saves the live head into the default
    /// buffers, so a later switch back to the default restores it. Calls must come
    /// in default, reward, default pairs.
    ///
    /// # Arguments
    /// * `target` - The variant to switch to.
    ///
    /// # Returns
    /// A `MissingBuffer` or `UnknownAdapter` error if the model doesn't carry the
    /// target's buffers or adapter. The head is untouched in that case.
    pub fn replace_head(&mut self, target: HeadVariant) -> Result<()> {
        if target == HeadVariant::Reward {
            let HeadParams { weight, bias } = self.v_head.summary.detach().into();
            self.register_buffer(HeadVariant::Default.weight_key(), weight);
            self.register_buffer(HeadVariant::Default.bias_key(), bias);
        }

        let device = self.v_head.summary.weight.device();
        let weight = self.get_buffer(&target.weight_key())?.to_device(device);
        let bias = self.get_buffer(&target.bias_key())?.to_device(device);

        self.pretrained_model.set_adapter(target.as_str())?;
        self.v_head.summary.weight = weight;
        self.v_head.summary.bias = bias;

        debug!(variant = target.as_str(); "value head replaced on {device}");
        Ok(())
    }

    /// Computes the value of the last attended token of every row.
    ///
    /// # Arguments
    /// * `hidden` - Last layer hidden states of shape `[batch, seq, hidden]`.
    /// * `attention_mask` - Attention mask of shape `[batch, seq]`.
    pub fn values(
        &self,
        hidden: ArrayView3<'_, f32>,
        attention_mask: ArrayView2<'_, u8>,
    ) -> Result<Array1<f32>> {
        let values = self.v_head.forward(hidden)?;
        head::last_token_values(values.view(), attention_mask)
    }
}

impl ParameterModule for ValueHeadModel {
    fn named_parameters(&self) -> NamedParameters<'_> {
        let summary = &self.v_head.summary;
        Box::new(self.pretrained_model.named_parameters().chain([
            (VALUE_HEAD_WEIGHT, &summary.weight),
            (VALUE_HEAD_BIAS, &summary.bias),
        ]))
    }

    fn named_parameters_mut(&mut self) -> NamedParametersMut<'_> {
        let summary = &mut self.v_head.summary;
        Box::new(self.pretrained_model.named_parameters_mut().chain([
            (VALUE_HEAD_WEIGHT, &mut summary.weight),
            (VALUE_HEAD_BIAS, &mut summary.bias),
        ]))
    }

    fn compute_dtype(&self) -> DType {
        self.pretrained_model.compute_dtype()
    }
}

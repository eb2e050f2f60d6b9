pub mod error;
pub mod head;
pub mod layernorm;
pub mod loader;
pub mod pretrained;
pub mod store;
pub mod tensor;
pub mod value_head;

pub use error::{ModelErr, Result};
pub use head::{Linear, ValueHead};
pub use layernorm::{LayerNormSnapshot, dump_layernorm, restore_layernorm};
pub use loader::load_valuehead_params;
pub use pretrained::{AdapterSet, ModelConfig, PretrainedModel};
pub use store::{NamedParameters, NamedParametersMut, ParameterModule, TensorStore};
pub use tensor::{DType, Device, Tensor};
pub use value_head::{HeadParams, HeadVariant, ValueHeadModel};

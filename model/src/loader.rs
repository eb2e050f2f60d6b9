use std::{fs, path::Path};

use half::{bf16, f16};
use log::info;
use ndarray::{ArrayD, IxDyn};
use safetensors::{Dtype, SafeTensorError, SafeTensors};

use crate::{ModelErr, Result, tensor::Tensor, value_head::HeadParams};

/// File name of the value head inside a checkpoint directory.
pub const VALUE_HEAD_FILE: &str = "value_head.safetensors";
pub const VALUE_HEAD_WEIGHT: &str = "v_head.summary.weight";
pub const VALUE_HEAD_BIAS: &str = "v_head.summary.bias";

/// Loads the value head stored in a safetensors file.
///
/// # Arguments
/// * `path` - Either the safetensors file itself or a checkpoint directory
///   containing `value_head.safetensors`.
///
/// # Returns
/// The head's weight and bias, or an error if the file can't be read or doesn't
/// hold both tensors.
pub fn load_valuehead_params(path: impl AsRef<Path>) -> Result<HeadParams> {
    let path = path.as_ref();
    let file = if path.is_dir() {
        path.join(VALUE_HEAD_FILE)
    } else {
        path.to_path_buf()
    };

    let bytes = fs::read(&file)?;
    let params = valuehead_params_from_bytes(&bytes)?;
    info!("loaded value head from {}", file.display());
    Ok(params)
}

/// Parses a value head out of a serialized safetensors buffer.
pub fn valuehead_params_from_bytes(bytes: &[u8]) -> Result<HeadParams> {
    let tensors = SafeTensors::deserialize(bytes)?;

    Ok(HeadParams {
        weight: read_tensor(&tensors, VALUE_HEAD_WEIGHT)?,
        bias: read_tensor(&tensors, VALUE_HEAD_BIAS)?,
    })
}

fn read_tensor(tensors: &SafeTensors<'_>, name: &str) -> Result<Tensor> {
    let view = tensors.tensor(name).map_err(|e| match e {
        SafeTensorError::TensorNotFound(_) => ModelErr::MissingTensor {
            name: name.to_string(),
        },
        e => ModelErr::Safetensors(e),
    })?;

    let shape = IxDyn(view.shape());
    let data = view.data();

    let tensor = match view.dtype() {
        Dtype::F32 => Tensor::from(ArrayD::from_shape_vec(shape, decode::<f32>(data))?),
        Dtype::F16 => Tensor::from(ArrayD::from_shape_vec(shape, decode::<f16>(data))?),
        Dtype::BF16 => Tensor::from(ArrayD::from_shape_vec(shape, decode::<bf16>(data))?),
        other => return Err(ModelErr::UnsupportedDtype(format!("{other:?}"))),
    };

    Ok(tensor)
}

// Safetensors only guarantees byte alignment for the data section.
fn decode<T: bytemuck::Pod>(data: &[u8]) -> Vec<T> {
    data.chunks_exact(size_of::<T>())
        .map(bytemuck::pod_read_unaligned)
        .collect()
}

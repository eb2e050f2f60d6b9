use std::collections::HashMap;

use log::debug;

use crate::{
    store::{ParameterModule, TensorStore},
    tensor::Tensor,
};

/// The wide precision parameters taken out of a model by `dump_layernorm`.
///
/// Names keep the order in which the model lists its parameters.
#[derive(Debug, Clone, Default)]
pub struct LayerNormSnapshot {
    params: TensorStore,
}

impl LayerNormSnapshot {
    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.params.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains(name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.names()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.params.iter()
    }
}

impl<S: Into<String>> FromIterator<(S, Tensor)> for LayerNormSnapshot {
    fn from_iter<I: IntoIterator<Item = (S, Tensor)>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().collect(),
        }
    }
}

/// Casts every f32 parameter down to the model's compute dtype.
///
/// # Arguments
/// * `model` - The unwrapped model, gathered onto a single device.
///
/// # Returns
/// A copy of every parameter that was cast, keyed by name.
pub fn dump_layernorm<M: ParameterModule + ?Sized>(model: &mut M) -> LayerNormSnapshot {
    let dtype = model.compute_dtype();
    let mut params = TensorStore::new();

    for (name, param) in model.named_parameters_mut() {
        if param.dtype().is_wide() {
            params.insert(name, param.detach());
            *param = param.to_dtype(dtype);
        }
    }

    debug!(params = params.len(); "dumped wide parameters to {dtype}");
    LayerNormSnapshot { params }
}

/// Writes the tensors of a snapshot back into the model's parameters.
///
/// Parameters whose names are not in the snapshot are left untouched and snapshot
/// entries with no matching parameter are dropped.
///
/// # Arguments
/// * `model` - The model `snapshot` was taken from.
/// * `snapshot` - The result of a previous `dump_layernorm`.
pub fn restore_layernorm<M: ParameterModule + ?Sized>(model: &mut M, snapshot: LayerNormSnapshot) {
    let mut saved: HashMap<String, Tensor> = snapshot.params.into_iter().collect();
    let mut restored = 0;

    for (name, param) in model.named_parameters_mut() {
        if let Some(tensor) = saved.remove(name) {
            *param = tensor;
            restored += 1;
        }
    }

    debug!(params = restored; "restored wide parameters");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        head::{Linear, ValueHead},
        pretrained::{ModelConfig, PretrainedModel},
        tensor::DType,
        value_head::ValueHeadModel,
    };

    fn tensor(data: Vec<f32>) -> Tensor {
        Tensor::from_shape_vec(&[data.len()], data).unwrap()
    }

    fn mixed_model() -> PretrainedModel {
        let params: TensorStore = [
            ("embed.weight", tensor(vec![0.1, 0.2]).to_dtype(DType::BF16)),
            ("layers.0.input_layernorm.weight", tensor(vec![1.0001, 0.3333])),
            ("layers.0.mlp.weight", tensor(vec![0.7, -0.7]).to_dtype(DType::BF16)),
            ("norm.weight", tensor(vec![0.999, 1.1])),
        ]
        .into_iter()
        .collect();

        let config = ModelConfig {
            torch_dtype: DType::BF16,
        };
        PretrainedModel::new(config, params)
    }

    fn params<M: ParameterModule>(model: &M) -> TensorStore {
        model
            .named_parameters()
            .map(|(name, p)| (name, p.clone()))
            .collect()
    }

    #[test]
    fn test_dump_records_only_wide_params_in_order() {
        let mut model = mixed_model();
        let snapshot = dump_layernorm(&mut model);

        assert_eq!(
            snapshot.names().collect::<Vec<_>>(),
            ["layers.0.input_layernorm.weight", "norm.weight"]
        );
        assert_eq!(snapshot.get("norm.weight").unwrap().dtype(), DType::F32);
    }

    #[test]
    fn test_dump_casts_to_compute_dtype() {
        let mut model = mixed_model();
        dump_layernorm(&mut model);

        assert!(model.named_parameters().all(|(_, p)| p.dtype() == DType::BF16));
    }

    #[test]
    fn test_dump_restore_round_trip() {
        let mut model = mixed_model();
        let before = params(&model);

        let snapshot = dump_layernorm(&mut model);
        restore_layernorm(&mut model, snapshot);

        for ((name, a), (_, b)) in model.named_parameters().zip(before.iter()) {
            assert!(a.bit_eq(b), "parameter {name} changed");
        }
    }

    #[test]
    fn test_restore_ignores_unknown_names() {
        let mut model = mixed_model();
        let before = params(&model);
        let snapshot: LayerNormSnapshot = [("lm_head.weight", tensor(vec![5.0]))]
            .into_iter()
            .collect();

        restore_layernorm(&mut model, snapshot);

        for ((_, a), (_, b)) in model.named_parameters().zip(before.iter()) {
            assert!(a.bit_eq(b));
        }
    }

    #[test]
    fn test_dump_without_wide_params_is_empty() {
        let mut model = mixed_model();
        dump_layernorm(&mut model);

        let second = dump_layernorm(&mut model);
        assert!(second.is_empty());
    }

    #[test]
    fn test_dump_covers_value_head() {
        let head = ValueHead::new(Linear::new(
            Tensor::from_shape_vec(&[1, 2], vec![0.3333, -0.7]).unwrap(),
            tensor(vec![0.0101]),
        ));
        let mut model = ValueHeadModel::new(mixed_model(), head);
        let before = params(&model);

        let snapshot = dump_layernorm(&mut model);

        assert!(snapshot.contains("v_head.summary.weight"));
        assert!(snapshot.contains("v_head.summary.bias"));
        assert_eq!(model.v_head().summary.weight.dtype(), DType::BF16);
        assert_eq!(model.v_head().summary.bias.dtype(), DType::BF16);

        restore_layernorm(&mut model, snapshot);

        for ((name, a), (_, b)) in model.named_parameters().zip(before.iter()) {
            assert!(a.bit_eq(b), "parameter {name} changed");
        }
        assert_eq!(model.v_head().summary.weight.dtype(), DType::F32);
    }
}

use model::{ParameterModule, dump_layernorm, restore_layernorm};

/// Runs `f` with the model's f32 parameters cast down to its compute dtype.
///
/// When `enabled` is false `f` runs on the model as is. Otherwise the wide
/// parameters are dumped before `f` and written back once it returns, so
/// generation runs in a single precision while training keeps the upcast weights.
///
/// # Args
/// * `model` - The unwrapped model, gathered onto a single device.
/// * `enabled` - Whether layer norms were upcast for training.
/// * `f` - The generation step.
///
/// # Returns
/// Whatever `f` returns.
pub fn with_downcast_layernorm<M, F, R>(model: &mut M, enabled: bool, f: F) -> R
where
    M: ParameterModule + ?Sized,
    F: FnOnce(&mut M) -> R,
{
    if !enabled {
        return f(model);
    }

    let snapshot = dump_layernorm(model);
    let out = f(model);
    restore_layernorm(model, snapshot);
    out
}

#[cfg(test)]
mod tests {
    use model::{DType, ModelConfig, PretrainedModel, Tensor, TensorStore};

    use super::*;

    fn model() -> PretrainedModel {
        let params: TensorStore = [
            ("norm.weight", Tensor::from_shape_vec(&[2], vec![1.0001, 0.9999]).unwrap()),
            (
                "proj.weight",
                Tensor::from_shape_vec(&[2], vec![0.5, 0.25])
                    .unwrap()
                    .to_dtype(DType::F16),
            ),
        ]
        .into_iter()
        .collect();

        let config = ModelConfig {
            torch_dtype: DType::F16,
        };
        PretrainedModel::new(config, params)
    }

    fn dtypes(model: &PretrainedModel) -> Vec<DType> {
        model.named_parameters().map(|(_, p)| p.dtype()).collect()
    }

    #[test]
    fn test_enabled_runs_downcast_and_restores() {
        let mut model = model();
        let before: TensorStore = model
            .named_parameters()
            .map(|(name, p)| (name, p.clone()))
            .collect();

        let seen = with_downcast_layernorm(&mut model, true, |m| dtypes(m));

        assert_eq!(seen, [DType::F16, DType::F16]);
        for ((_, a), (_, b)) in model.named_parameters().zip(before.iter()) {
            assert!(a.bit_eq(b));
        }
    }

    #[test]
    fn test_disabled_leaves_params_alone() {
        let mut model = model();

        let seen = with_downcast_layernorm(&mut model, false, |m| dtypes(m));

        assert_eq!(seen, [DType::F32, DType::F16]);
        assert_eq!(dtypes(&model), [DType::F32, DType::F16]);
    }
}

use ndarray::{Array1, Array2, ArrayView2, ArrayView3, Axis, Ix1, Ix2};

use crate::{ModelErr, Result, tensor::Tensor};

/// A dense projection onto a single output unit.
///
/// `weight` has shape `[1, hidden]` and `bias` has shape `[1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Linear {
    pub weight: Tensor,
    pub bias: Tensor,
}

impl Linear {
    pub fn new(weight: Tensor, bias: Tensor) -> Self {
        Self { weight, bias }
    }

    /// Returns the input size of the projection.
    pub fn in_features(&self) -> usize {
        self.weight.shape().last().copied().unwrap_or(0)
    }

    /// Returns a deep copy of both tensors.
    pub fn detach(&self) -> Self {
        Self {
            weight: self.weight.detach(),
            bias: self.bias.detach(),
        }
    }
}

/// The scalar head stacked on top of a causal language model.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueHead {
    pub summary: Linear,
}

impl ValueHead {
    pub fn new(summary: Linear) -> Self {
        Self { summary }
    }

    /// Projects every hidden state onto a scalar value.
    ///
    /// The projection runs in f32 regardless of the head's dtype.
    ///
    /// # Arguments
    /// * `hidden` - Hidden states of shape `[batch, seq, hidden]`.
    ///
    /// # Returns
    /// The values of shape `[batch, seq]`.
    pub fn forward(&self, hidden: ArrayView3<'_, f32>) -> Result<Array2<f32>> {
        let weight = self.summary.weight.to_f32();
        let weight = weight
            .into_dimensionality::<Ix2>()
            .map_err(|_| ModelErr::ShapeMismatch {
                what: "value head weight",
                got: self.summary.weight.shape().to_vec(),
                expected: vec![1, self.summary.in_features()],
            })?;

        let bias = self.summary.bias.to_f32();
        let bias = bias
            .into_dimensionality::<Ix1>()
            .map_err(|_| ModelErr::ShapeMismatch {
                what: "value head bias",
                got: self.summary.bias.shape().to_vec(),
                expected: vec![1],
            })?;

        if weight.nrows() != 1 || bias.len() != 1 {
            return Err(ModelErr::ShapeMismatch {
                what: "value head",
                got: vec![weight.nrows(), bias.len()],
                expected: vec![1, 1],
            });
        }

        let hidden_size = hidden.len_of(Axis(2));
        if hidden_size != weight.ncols() {
            return Err(ModelErr::ShapeMismatch {
                what: "hidden states",
                got: hidden.shape().to_vec(),
                expected: vec![hidden.len_of(Axis(0)), hidden.len_of(Axis(1)), weight.ncols()],
            });
        }

        let w = weight.row(0);
        let b = bias[0];
        Ok(hidden.map_axis(Axis(2), |h| h.dot(&w) + b))
    }
}

/// Picks the value at the last attended position of every row.
///
/// Rows are assumed right padded, so the last token sits at `sum(mask) - 1`.
///
/// # Arguments
/// * `values` - Per token values of shape `[batch, seq]`.
/// * `attention_mask` - Attention mask of the same shape, non zero for real tokens.
///
/// # Returns
/// One value per row, or an `EmptySequence` error for a row without tokens.
pub fn last_token_values(
    values: ArrayView2<'_, f32>,
    attention_mask: ArrayView2<'_, u8>,
) -> Result<Array1<f32>> {
    if values.shape() != attention_mask.shape() {
        return Err(ModelErr::ShapeMismatch {
            what: "attention mask",
            got: attention_mask.shape().to_vec(),
            expected: values.shape().to_vec(),
        });
    }

    values
        .outer_iter()
        .zip(attention_mask.outer_iter())
        .enumerate()
        .map(|(row, (vals, mask))| {
            let len = mask.iter().filter(|&&m| m != 0).count();
            len.checked_sub(1)
                .map(|last| vals[last])
                .ok_or(ModelErr::EmptySequence { row })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use ndarray::{Array3, array};

    use super::*;
    use crate::tensor::DType;

    fn head(weight: Vec<f32>, bias: f32) -> ValueHead {
        let n = weight.len();
        ValueHead::new(Linear::new(
            Tensor::from_shape_vec(&[1, n], weight).unwrap(),
            Tensor::from_shape_vec(&[1], vec![bias]).unwrap(),
        ))
    }

    #[test]
    fn test_forward_projects_each_token() {
        let head = head(vec![1.0, 2.0], 0.5);
        let hidden = Array3::from_shape_vec((1, 2, 2), vec![1.0, 1.0, 0.0, -1.0]).unwrap();

        let values = head.forward(hidden.view()).unwrap();
        assert_eq!(values, array![[3.5, -1.5]]);
    }

    #[test]
    fn test_forward_accepts_narrow_head() {
        let mut head = head(vec![0.5, 0.25], 1.0);
        head.summary.weight = head.summary.weight.to_dtype(DType::F16);
        let hidden = Array3::from_shape_vec((1, 1, 2), vec![2.0, 4.0]).unwrap();

        let values = head.forward(hidden.view()).unwrap();
        assert_eq!(values, array![[3.0]]);
    }

    #[test]
    fn test_forward_rejects_hidden_size_mismatch() {
        let head = head(vec![1.0, 2.0, 3.0], 0.0);
        let hidden = Array3::<f32>::zeros((2, 2, 2));

        let err = head.forward(hidden.view()).unwrap_err();
        assert!(matches!(err, ModelErr::ShapeMismatch { what: "hidden states", .. }));
    }

    #[test]
    fn test_last_token_values_follow_mask() {
        let values = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let mask = array![[1u8, 1, 0], [1, 1, 1]];

        let last = last_token_values(values.view(), mask.view()).unwrap();
        assert_eq!(last, array![2.0, 6.0]);
    }

    #[test]
    fn test_last_token_values_rejects_empty_row() {
        let values = array![[1.0, 2.0], [3.0, 4.0]];
        let mask = array![[1u8, 0], [0, 0]];

        let err = last_token_values(values.view(), mask.view()).unwrap_err();
        assert!(matches!(err, ModelErr::EmptySequence { row: 1 }));
    }
}

mod device;
mod dtype;

use half::{bf16, f16};
use ndarray::{ArrayD, IxDyn};

pub use device::Device;
pub use dtype::DType;

use crate::Result;

/// Typed element storage of a `Tensor`.
#[derive(Debug, Clone, PartialEq)]
enum Storage {
    F32(ArrayD<f32>),
    F16(ArrayD<f16>),
    BF16(ArrayD<bf16>),
}

/// An n-dimensional array with a runtime dtype and a device label.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    storage: Storage,
    device: Device,
}

impl Tensor {
    /// Creates a new f32 `Tensor` on the cpu from a flat buffer.
    ///
    /// # Arguments
    /// * `shape` - The dimensions of the tensor.
    /// * `data` - The elements in row major order.
    ///
    /// # Returns
    /// A new tensor or a shape error if `data` doesn't fill `shape`.
    pub fn from_shape_vec(shape: &[usize], data: Vec<f32>) -> Result<Self> {
        let array = ArrayD::from_shape_vec(IxDyn(shape), data)?;
        Ok(Self::from(array))
    }

    /// Creates a zero filled tensor.
    pub fn zeros(shape: &[usize], dtype: DType, device: Device) -> Self {
        let array = ArrayD::<f32>::zeros(IxDyn(shape));
        Self::from(array).to_dtype(dtype).into_device(device)
    }

    /// Creates a zero filled tensor with the same shape, dtype and device as `self`.
    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.shape(), self.dtype(), self.device)
    }

    pub fn dtype(&self) -> DType {
        match self.storage {
            Storage::F32(_) => DType::F32,
            Storage::F16(_) => DType::F16,
            Storage::BF16(_) => DType::BF16,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match &self.storage {
            Storage::F32(a) => a.shape(),
            Storage::F16(a) => a.shape(),
            Storage::BF16(a) => a.shape(),
        }
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Returns the amount of elements in the tensor.
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy of the tensor cast to `dtype`.
    ///
    /// Narrowing casts round to nearest, a cast to the current dtype is a plain copy.
    pub fn to_dtype(&self, dtype: DType) -> Self {
        if self.dtype() == dtype {
            return self.clone();
        }

        let wide = self.to_f32();
        let storage = match dtype {
            DType::F32 => Storage::F32(wide),
            DType::F16 => Storage::F16(wide.mapv(f16::from_f32)),
            DType::BF16 => Storage::BF16(wide.mapv(bf16::from_f32)),
        };

        Self {
            storage,
            device: self.device,
        }
    }

    /// Returns a copy of the tensor placed on `device`.
    pub fn to_device(&self, device: Device) -> Self {
        self.clone().into_device(device)
    }

    /// Moves the tensor onto `device` without copying its elements.
    pub fn into_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Returns a deep copy that shares nothing with `self`.
    pub fn detach(&self) -> Self {
        self.clone()
    }

    /// Returns the elements widened to f32.
    pub fn to_f32(&self) -> ArrayD<f32> {
        match &self.storage {
            Storage::F32(a) => a.clone(),
            Storage::F16(a) => a.mapv(f16::to_f32),
            Storage::BF16(a) => a.mapv(bf16::to_f32),
        }
    }

    /// Compares dtype, device and the raw bits of every element.
    ///
    /// Unlike `==` this tells `-0.0` from `0.0` and matches NaNs with equal payloads.
    pub fn bit_eq(&self, other: &Self) -> bool {
        if self.device != other.device || self.shape() != other.shape() {
            return false;
        }

        match (&self.storage, &other.storage) {
            (Storage::F32(a), Storage::F32(b)) => {
                a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (Storage::F16(a), Storage::F16(b)) => {
                a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (Storage::BF16(a), Storage::BF16(b)) => {
                a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            _ => false,
        }
    }
}

impl From<ArrayD<f32>> for Tensor {
    fn from(value: ArrayD<f32>) -> Self {
        Self {
            storage: Storage::F32(value),
            device: Device::Cpu,
        }
    }
}

impl From<ArrayD<f16>> for Tensor {
    fn from(value: ArrayD<f16>) -> Self {
        Self {
            storage: Storage::F16(value),
            device: Device::Cpu,
        }
    }
}

impl From<ArrayD<bf16>> for Tensor {
    fn from(value: ArrayD<bf16>) -> Self {
        Self {
            storage: Storage::BF16(value),
            device: Device::Cpu,
        }
    }
}

use std::{fmt, str::FromStr};

use crate::{ModelErr, Result};

/// Numeric precision of a tensor's elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    F32,
    F16,
    BF16,
}

impl DType {
    /// Whether this is the wide (32-bit) floating-point kind.
    pub fn is_wide(self) -> bool {
        matches!(self, DType::F32)
    }

    /// Returns the canonical config name of the dtype.
    pub fn as_str(self) -> &'static str {
        match self {
            DType::F32 => "float32",
            DType::F16 => "float16",
            DType::BF16 => "bfloat16",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DType {
    type Err = ModelErr;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "float32" | "fp32" | "f32" => Ok(DType::F32),
            "float16" | "fp16" | "f16" | "half" => Ok(DType::F16),
            "bfloat16" | "bf16" => Ok(DType::BF16),
            _ => Err(ModelErr::UnsupportedDtype(s.to_string())),
        }
    }
}

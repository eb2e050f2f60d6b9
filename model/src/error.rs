use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use ndarray::ShapeError;
use safetensors::SafeTensorError;

/// The result type used in the entire model crate.
pub type Result<T> = std::result::Result<T, ModelErr>;

/// The model crate's error type.
#[derive(Debug)]
pub enum ModelErr {
    Io(io::Error),
    Safetensors(SafeTensorError),
    Shape(ShapeError),
    ShapeMismatch {
        what: &'static str,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    MissingBuffer {
        name: String,
    },
    MissingTensor {
        name: String,
    },
    UnknownAdapter {
        name: String,
    },
    UnknownVariant(String),
    UnsupportedDtype(String),
    EmptySequence {
        row: usize,
    },
}

impl Display for ModelErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelErr::Io(e) => write!(f, "io error: {e}"),
            ModelErr::Safetensors(e) => write!(f, "safetensors error: {e}"),
            ModelErr::Shape(e) => write!(f, "shape error: {e}"),
            ModelErr::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "shape mismatch for {what}: got {got:?}, expected {expected:?}"
            ),
            ModelErr::MissingBuffer { name } => write!(f, "no buffer named `{name}`"),
            ModelErr::MissingTensor { name } => {
                write!(f, "tensor `{name}` not found in the value head file")
            }
            ModelErr::UnknownAdapter { name } => write!(f, "adapter `{name}` is not loaded"),
            ModelErr::UnknownVariant(name) => {
                write!(f, "unknown head variant `{name}`, expected default or reward")
            }
            ModelErr::UnsupportedDtype(dtype) => write!(f, "unsupported dtype `{dtype}`"),
            ModelErr::EmptySequence { row } => {
                write!(f, "row {row} of the attention mask has no tokens")
            }
        }
    }
}

impl Error for ModelErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ModelErr::Io(e) => Some(e),
            ModelErr::Safetensors(e) => Some(e),
            ModelErr::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ModelErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<SafeTensorError> for ModelErr {
    fn from(value: SafeTensorError) -> Self {
        Self::Safetensors(value)
    }
}

impl From<ShapeError> for ModelErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}

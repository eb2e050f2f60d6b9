use std::{error::Error, fmt, io};

use model::ModelErr;

/// The worker module's result type.
pub type Result<T> = std::result::Result<T, WorkerErr>;

/// Failures of the PPO-side glue.
#[derive(Debug)]
pub enum WorkerErr {
    Io(io::Error),
    /// The reward server couldn't be reached or answered with a non 2xx status.
    Http(Box<ureq::Error>),
    /// A request couldn't be encoded or a response couldn't be decoded.
    Json(serde_json::Error),
    Model(ModelErr),
    InvalidConfig(String),
    /// A value head reward type was given a batch without a forward pass.
    MissingForward,
}

impl fmt::Display for WorkerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerErr::Io(e) => write!(f, "io error: {e}"),
            WorkerErr::Http(e) => write!(f, "reward server request failed: {e}"),
            WorkerErr::Json(e) => write!(f, "invalid reward server payload: {e}"),
            WorkerErr::Model(e) => write!(f, "model error: {e}"),
            WorkerErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            WorkerErr::MissingForward => {
                write!(f, "scoring with a value head needs the batch's forward pass")
            }
        }
    }
}

impl Error for WorkerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorkerErr::Io(e) => Some(e),
            WorkerErr::Http(e) => Some(e.as_ref()),
            WorkerErr::Json(e) => Some(e),
            WorkerErr::Model(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for WorkerErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ureq::Error> for WorkerErr {
    fn from(value: ureq::Error) -> Self {
        Self::Http(Box::new(value))
    }
}

impl From<serde_json::Error> for WorkerErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<ModelErr> for WorkerErr {
    fn from(value: ModelErr) -> Self {
        Self::Model(value)
    }
}

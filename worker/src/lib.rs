pub mod config;
pub mod error;
pub mod generation;
pub mod net;
pub mod reward;

pub use config::PpoConfig;
pub use error::{Result, WorkerErr};
pub use generation::with_downcast_layernorm;
pub use net::client::{RewardClient, get_rewards_from_server};
pub use reward::{ForwardOutput, RewardModel, RewardModelType, ScoringBatch};

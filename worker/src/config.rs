use std::env;

use serde::{Deserialize, Serialize};

use crate::{Result, WorkerErr, reward::RewardModelType};

const REWARD_MODEL_TYPE: &str = "REWARD_MODEL_TYPE";
const REWARD_SERVER_URL: &str = "REWARD_SERVER_URL";
const UPCAST_LAYERNORM: &str = "UPCAST_LAYERNORM";

/// PPO options that govern reward scoring and generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PpoConfig {
    /// Where rewards come from.
    #[serde(default)]
    pub reward_model_type: RewardModelType,
    /// Scoring endpoint, required for the api reward type.
    #[serde(default)]
    pub reward_server_url: Option<String>,
    /// Keep normalization weights in f32 during training and cast them down
    /// only around generation.
    #[serde(default)]
    pub upcast_layernorm: bool,
}

impl PpoConfig {
    /// Parses and validates a JSON config.
    ///
    /// # Errors
    /// `WorkerErr::Json` on malformed input, `WorkerErr::InvalidConfig` if the
    /// options are inconsistent.
    pub fn from_json(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a config from the `REWARD_MODEL_TYPE`, `REWARD_SERVER_URL` and
    /// `UPCAST_LAYERNORM` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config reading every variable through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let reward_model_type = match lookup(REWARD_MODEL_TYPE) {
            Some(kind) => kind.parse()?,
            None => RewardModelType::default(),
        };

        let upcast_layernorm = match lookup(UPCAST_LAYERNORM).as_deref() {
            None | Some("") | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => {
                return Err(WorkerErr::InvalidConfig(format!(
                    "{UPCAST_LAYERNORM} must be true or false, got `{other}`"
                )));
            }
        };

        let config = Self {
            reward_model_type,
            reward_server_url: lookup(REWARD_SERVER_URL).filter(|url| !url.is_empty()),
            upcast_layernorm,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the options against each other.
    pub fn validate(&self) -> Result<()> {
        if self.reward_model_type == RewardModelType::Api && self.reward_server_url.is_none() {
            return Err(WorkerErr::InvalidConfig(
                "the api reward type needs a reward_server_url".into(),
            ));
        }

        Ok(())
    }
}

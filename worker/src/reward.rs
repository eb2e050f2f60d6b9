use std::{fmt, str::FromStr};

use log::debug;
use model::{HeadVariant, ValueHeadModel};
use ndarray::{Array1, Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::{PpoConfig, Result, WorkerErr, net::client::RewardClient};

/// Where PPO rewards come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardModelType {
    /// A remote scoring server.
    Api,
    /// A reward adapter and head sharing the policy's backbone.
    #[default]
    Lora,
    /// A separate reward model.
    Full,
}

impl FromStr for RewardModelType {
    type Err = WorkerErr;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "api" => Ok(RewardModelType::Api),
            "lora" => Ok(RewardModelType::Lora),
            "full" => Ok(RewardModelType::Full),
            other => Err(WorkerErr::InvalidConfig(format!(
                "unknown reward model type `{other}`, expected api, lora or full"
            ))),
        }
    }
}

/// Last layer hidden states of a batch of rollouts.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardOutput {
    /// Shape `[batch, seq, hidden]`.
    pub hidden_states: Array3<f32>,
    /// Shape `[batch, seq]`, non zero for real tokens.
    pub attention_mask: Array2<u8>,
}

type ForwardFn<'a> = Box<dyn FnOnce(&ValueHeadModel) -> Result<ForwardOutput> + 'a>;

/// One batch of PPO rollouts to score.
///
/// The api reward type reads the decoded `messages`. The value head types run the
/// batch's forward pass on the scoring model, once its adapter and head are in place.
pub struct ScoringBatch<'a> {
    messages: &'a [String],
    forward: Option<ForwardFn<'a>>,
}

impl<'a> ScoringBatch<'a> {
    /// Creates a new batch holding only the decoded texts.
    pub fn from_messages(messages: &'a [String]) -> Self {
        Self {
            messages,
            forward: None,
        }
    }

    /// Attaches the forward pass of the rollouts.
    ///
    /// # Args
    /// * `forward` - Runs the model over the batch's token ids. It's called at most
    ///   once, with the reward adapter already active for the lora reward type.
    pub fn with_forward<F>(mut self, forward: F) -> Self
    where
        F: FnOnce(&ValueHeadModel) -> Result<ForwardOutput> + 'a,
    {
        self.forward = Some(Box::new(forward));
        self
    }

    pub fn messages(&self) -> &'a [String] {
        self.messages
    }

    fn into_forward(self) -> Result<ForwardFn<'a>> {
        self.forward.ok_or(WorkerErr::MissingForward)
    }
}

impl fmt::Debug for ScoringBatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoringBatch")
            .field("messages", &self.messages)
            .field("forward", &self.forward.is_some())
            .finish()
    }
}

/// The source PPO rewards are computed from.
#[derive(Debug)]
pub enum RewardModel {
    Api(RewardClient),
    Lora,
    Full(Box<ValueHeadModel>),
}

impl RewardModel {
    /// Builds the reward model selected by `config`.
    ///
    /// # Args
    /// * `config` - The PPO configuration.
    /// * `full` - The separate reward model, only used by the full reward type.
    ///
    /// # Errors
    /// `WorkerErr::InvalidConfig` if the selected type is missing its server URL or
    /// its reward model.
    pub fn from_config(config: &PpoConfig, full: Option<ValueHeadModel>) -> Result<Self> {
        match config.reward_model_type {
            RewardModelType::Api => {
                let url = config.reward_server_url.as_deref().ok_or_else(|| {
                    WorkerErr::InvalidConfig("the api reward type needs a reward_server_url".into())
                })?;
                Ok(RewardModel::Api(RewardClient::new(url)))
            }
            RewardModelType::Lora => Ok(RewardModel::Lora),
            RewardModelType::Full => full
                .map(|m| RewardModel::Full(Box::new(m)))
                .ok_or_else(|| {
                    WorkerErr::InvalidConfig("the full reward type needs a reward model".into())
                }),
        }
    }

    pub fn kind(&self) -> RewardModelType {
        match self {
            RewardModel::Api(_) => RewardModelType::Api,
            RewardModel::Lora => RewardModelType::Lora,
            RewardModel::Full(_) => RewardModelType::Full,
        }
    }

    /// Computes one reward per rollout.
    ///
    /// # Args
    /// * `policy` - The policy model, already unwrapped and gathered.
    /// * `batch` - The rollouts to score.
    ///
    /// # Returns
    /// The rewards in batch order.
    ///
    /// # Errors
    /// Whatever the selected source or the batch's forward pass fails with. The lora
    /// type always switches the policy back to its default head, even when scoring
    /// fails.
    pub fn score(&self, policy: &mut ValueHeadModel, batch: ScoringBatch<'_>) -> Result<Vec<f32>> {
        debug!(
            rollouts = batch.messages().len();
            "scoring batch with {:?} rewards",
            self.kind()
        );

        match self {
            RewardModel::Api(client) => client.get_rewards(batch.messages()),
            RewardModel::Lora => score_with_reward_head(policy, batch),
            RewardModel::Full(reward_model) => {
                let forward = batch.into_forward()?;
                Ok(forward_values(reward_model, forward)?.to_vec())
            }
        }
    }
}

fn score_with_reward_head(
    policy: &mut ValueHeadModel,
    batch: ScoringBatch<'_>,
) -> Result<Vec<f32>> {
    let forward = batch.into_forward()?;

    policy.replace_head(HeadVariant::Reward)?;
    let values = forward_values(policy, forward);
    policy.replace_head(HeadVariant::Default)?;

    Ok(values?.to_vec())
}

fn forward_values(model: &ValueHeadModel, forward: ForwardFn<'_>) -> Result<Array1<f32>> {
    let out = forward(model)?;
    Ok(model.values(out.hidden_states.view(), out.attention_mask.view())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reward_model_type() {
        assert_eq!("api".parse::<RewardModelType>().unwrap(), RewardModelType::Api);
        assert_eq!("full".parse::<RewardModelType>().unwrap(), RewardModelType::Full);
        assert!("remote".parse::<RewardModelType>().is_err());
    }

    #[test]
    fn test_from_config_api() {
        let config = PpoConfig {
            reward_model_type: RewardModelType::Api,
            reward_server_url: Some("http://localhost:8000/score".into()),
            upcast_layernorm: false,
        };

        let model = RewardModel::from_config(&config, None).unwrap();
        match model {
            RewardModel::Api(client) => assert_eq!(client.url(), "http://localhost:8000/score"),
            other => panic!("unexpected reward model: {other:?}"),
        }
    }

    #[test]
    fn test_from_config_full_needs_model() {
        let config = PpoConfig {
            reward_model_type: RewardModelType::Full,
            ..PpoConfig::default()
        };

        let err = RewardModel::from_config(&config, None).unwrap_err();
        assert!(matches!(err, WorkerErr::InvalidConfig(_)));
    }

    #[test]
    fn test_batch_without_forward() {
        let messages = vec!["a".to_string()];
        let batch = ScoringBatch::from_messages(&messages);

        assert!(matches!(batch.into_forward(), Err(WorkerErr::MissingForward)));
    }
}

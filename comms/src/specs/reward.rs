use serde::{Deserialize, Serialize};

/// Model name sent along every scoring request.
pub const REWARD_MODEL_NAME: &str = "model";

/// The body of a scoring request sent to a reward server.
#[derive(Debug, Serialize)]
pub struct RewardRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [String],
}

impl<'a> RewardRequest<'a> {
    /// Creates a new `RewardRequest` for the given messages.
    pub fn new(messages: &'a [String]) -> Self {
        Self {
            model: REWARD_MODEL_NAME,
            messages,
        }
    }
}

/// The body of a reward server's response, one score per message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RewardResponse {
    pub scores: Vec<f32>,
}

use log::debug;

use crate::Result;

/// Blocking client of a reward scoring server.
///
/// Contract:
/// - POST `{"model": "model", "messages": [...]}` as JSON
/// - read back `{"scores": [...]}`, one score per message
///
/// Nothing is retried and no timeout is set, failures go straight to the caller.
#[derive(Debug, Clone)]
pub struct RewardClient {
    agent: ureq::Agent,
    url: String,
}

impl RewardClient {
    /// Creates a new `RewardClient` with a default agent.
    ///
    /// # Args
    /// * `url` - Full URL of the scoring endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            agent: ureq::Agent::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Scores a batch of messages.
    ///
    /// # Args
    /// * `messages` - The texts to score, in order.
    ///
    /// # Returns
    /// The scores in the order the server returned them. Their count isn't checked
    /// against `messages`.
    ///
    /// # Errors
    /// `WorkerErr::Http` on transport failures or non 2xx statuses,
    /// `WorkerErr::Json` when the body isn't JSON or lacks `scores`.
    pub fn get_rewards(&self, messages: &[String]) -> Result<Vec<f32>> {
        let body = comms::encode_request(messages)?;
        debug!(messages = messages.len(); "requesting scores from {}", self.url);

        let response = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json")
            .send_string(&body)?;

        let text = response.into_string()?;
        let scores = comms::decode_scores(&text)?;

        debug!(scores = scores.len(); "received scores");
        Ok(scores)
    }
}

/// Scores `messages` with a one-off client for `server_url`.
pub fn get_rewards_from_server(server_url: &str, messages: &[String]) -> Result<Vec<f32>> {
    RewardClient::new(server_url).get_rewards(messages)
}

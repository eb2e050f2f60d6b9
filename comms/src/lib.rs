pub mod specs;

pub use specs::reward::{REWARD_MODEL_NAME, RewardRequest, RewardResponse};

/// Encodes the JSON body of a reward scoring request.
///
/// # Arguments
/// * `messages` - The texts to score, in order.
///
/// # Returns
/// The request body as a JSON string.
pub fn encode_request(messages: &[String]) -> serde_json::Result<String> {
    serde_json::to_string(&RewardRequest::new(messages))
}

/// Decodes the scores out of a reward server's JSON response.
///
/// # Arguments
/// * `body` - The raw response body.
///
/// # Returns
/// The scores in the order the server returned them, or a decode error if the body
/// isn't JSON or has no `scores` array.
pub fn decode_scores(body: &str) -> serde_json::Result<Vec<f32>> {
    let response: RewardResponse = serde_json::from_str(body)?;
    Ok(response.scores)
}

use async_trait::async_trait;
use haven_core::Turn;

use crate::error::Result;

/// Reply generation capability
///
/// Given the ordered turn list (directive first), returns the generated reply text.
/// Implementations may fail or take arbitrarily long; callers bound the call with a timeout.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Client identifier used in logs
    fn provider_id(&self) -> &str;

    /// Generate a reply for the given turns
    async fn generate_reply(&self, turns: &[Turn]) -> Result<String>;
}

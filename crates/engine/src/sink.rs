//! Broadcast delivery boundary.
//!
//! The engine records outcomes; how a message physically reaches a user
//! is the transport's concern, injected as a [`BroadcastSink`].

use async_trait::async_trait;

use atelier_db::models::user::User;

/// Delivers one broadcast message to one user.
#[async_trait]
pub trait BroadcastSink: Send + Sync {
    /// Attempt delivery. The returned error string is recorded on the
    /// target row for later retrieval.
    async fn deliver(&self, user: &User, message: &str) -> Result<(), String>;
}

/// Local/development sink that logs every delivery and always succeeds.
pub struct TracingSink;

#[async_trait]
impl BroadcastSink for TracingSink {
    async fn deliver(&self, user: &User, message: &str) -> Result<(), String> {
        tracing::info!(
            user_id = user.id,
            external_id = %user.external_id,
            message_len = message.len(),
            "Broadcast delivered (tracing sink)",
        );
        Ok(())
    }
}

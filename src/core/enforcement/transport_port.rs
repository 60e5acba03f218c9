// Port to the chat transport.
//
// Core components speak this trait; the telegram layer implements it over
// the real bot API. Tests implement it with recording stubs.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Transport effect failed: {0}")]
    EffectFailed(String),
}

/// Outbound effects the moderation pipeline can ask the transport for.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a message into the chat, optionally as a reply.
    async fn send_reply(
        &self,
        chat_id: i64,
        reply_to_message_id: Option<i32>,
        text: &str,
    ) -> Result<(), TransportError>;

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), TransportError>;

    /// Temporarily take a member's send permissions away.
    async fn restrict_member(
        &self,
        chat_id: i64,
        user_id: u64,
        duration_secs: u64,
    ) -> Result<(), TransportError>;

    async fn ban_member(&self, chat_id: i64, user_id: u64) -> Result<(), TransportError>;

    async fn unban_member(&self, chat_id: i64, user_id: u64) -> Result<(), TransportError>;

    /// Open a poll and return the transport-assigned poll id.
    async fn create_poll(
        &self,
        chat_id: i64,
        question: &str,
        options: &[String],
    ) -> Result<String, TransportError>;
}

// Blanket implementation so services can share one Arc'd transport.
#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for Arc<T> {
    async fn send_reply(
        &self,
        chat_id: i64,
        reply_to_message_id: Option<i32>,
        text: &str,
    ) -> Result<(), TransportError> {
        (**self).send_reply(chat_id, reply_to_message_id, text).await
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), TransportError> {
        (**self).delete_message(chat_id, message_id).await
    }

    async fn restrict_member(
        &self,
        chat_id: i64,
        user_id: u64,
        duration_secs: u64,
    ) -> Result<(), TransportError> {
        (**self).restrict_member(chat_id, user_id, duration_secs).await
    }

    async fn ban_member(&self, chat_id: i64, user_id: u64) -> Result<(), TransportError> {
        (**self).ban_member(chat_id, user_id).await
    }

    async fn unban_member(&self, chat_id: i64, user_id: u64) -> Result<(), TransportError> {
        (**self).unban_member(chat_id, user_id).await
    }

    async fn create_poll(
        &self,
        chat_id: i64,
        question: &str,
        options: &[String],
    ) -> Result<String, TransportError> {
        (**self).create_poll(chat_id, question, options).await
    }
}

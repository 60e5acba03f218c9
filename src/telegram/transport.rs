// ChatTransport implementation over the Telegram bot API.

use crate::core::enforcement::{ChatTransport, TransportError};
use async_trait::async_trait;
use chrono::Utc;
use teloxide::payloads::{RestrictChatMemberSetters, SendMessageSetters, SendPollSetters};
use teloxide::prelude::*;
use teloxide::types::{ChatId, ChatPermissions, MessageId, UserId};

pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn effect_error(err: teloxide::RequestError) -> TransportError {
    TransportError::EffectFailed(err.to_string())
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_reply(
        &self,
        chat_id: i64,
        reply_to_message_id: Option<i32>,
        text: &str,
    ) -> Result<(), TransportError> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);
        if let Some(message_id) = reply_to_message_id {
            request = request.reply_to_message_id(MessageId(message_id));
        }
        request.await.map_err(effect_error)?;
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), TransportError> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .map_err(effect_error)?;
        Ok(())
    }

    async fn restrict_member(
        &self,
        chat_id: i64,
        user_id: u64,
        duration_secs: u64,
    ) -> Result<(), TransportError> {
        let until = Utc::now() + chrono::Duration::seconds(duration_secs as i64);
        self.bot
            .restrict_chat_member(ChatId(chat_id), UserId(user_id), ChatPermissions::empty())
            .until_date(until)
            .await
            .map_err(effect_error)?;
        Ok(())
    }

    async fn ban_member(&self, chat_id: i64, user_id: u64) -> Result<(), TransportError> {
        self.bot
            .ban_chat_member(ChatId(chat_id), UserId(user_id))
            .await
            .map_err(effect_error)?;
        Ok(())
    }

    async fn unban_member(&self, chat_id: i64, user_id: u64) -> Result<(), TransportError> {
        self.bot
            .unban_chat_member(ChatId(chat_id), UserId(user_id))
            .await
            .map_err(effect_error)?;
        Ok(())
    }

    async fn create_poll(
        &self,
        chat_id: i64,
        question: &str,
        options: &[String],
    ) -> Result<String, TransportError> {
        let message = self
            .bot
            .send_poll(ChatId(chat_id), question.to_string(), options.to_vec())
            .is_anonymous(false)
            .await
            .map_err(effect_error)?;

        // The poll id is the only handle vote updates will arrive under.
        let poll = message.poll().ok_or_else(|| {
            TransportError::EffectFailed("poll message came back without a poll".to_string())
        })?;
        Ok(poll.id.clone())
    }
}

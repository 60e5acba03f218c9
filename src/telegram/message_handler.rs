// Inbound message adapter - feeds group messages to the decision pipeline.

use crate::core::moderation::ModAction;
use crate::core::session::SessionStore;
use crate::telegram::{display_name, BotDeps, HandlerResult};
use teloxide::types::Message;

pub async fn handle_message(msg: Message, deps: BotDeps) -> HandlerResult {
    // Ignore bot messages (including our own).
    let Some(author) = msg.from() else {
        return Ok(());
    };
    if author.is_bot {
        return Ok(());
    }

    // Only group chats are moderated.
    if !(msg.chat.is_group() || msg.chat.is_supergroup()) {
        return Ok(());
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id.0;

    match deps.sessions.is_active(chat_id).await {
        Ok(true) => {}
        Ok(false) => return Ok(()),
        Err(err) => {
            // Storage trouble must not turn into moderation actions.
            tracing::error!(chat_id, "session lookup failed: {err}");
            return Ok(());
        }
    }

    let verdict = deps
        .moderation
        .evaluate_message(chat_id, author.id.0, msg.id.0, text)
        .await?;
    let incident = &verdict.incident;

    match &verdict.action {
        ModAction::Ignore => {}
        ModAction::DelegateToConsensus => {
            let name = display_name(author);
            if let Err(err) = deps
                .consensus
                .open_vote(
                    incident.chat_id,
                    incident.target_user_id,
                    &name,
                    incident.trigger_message_id,
                )
                .await
            {
                tracing::error!(chat_id, "failed to open ban vote: {err}");
            }
        }
        action => {
            let outcome = deps
                .enforcer
                .enforce(
                    incident.chat_id,
                    incident.target_user_id,
                    incident.trigger_message_id,
                    action,
                )
                .await;
            tracing::debug!(
                chat_id,
                user_id = incident.target_user_id,
                score = ?incident.score,
                ?outcome,
                "action enforced"
            );
        }
    }

    Ok(())
}

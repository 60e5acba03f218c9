// Poll update adapter - feeds vote-count snapshots to the consensus service.

use crate::core::consensus::{PollOutcome, PollUpdate};
use crate::core::moderation::ModAction;
use crate::telegram::{BotDeps, HandlerResult};
use teloxide::types::Poll;

pub async fn handle_poll_update(poll: Poll, deps: BotDeps) -> HandlerResult {
    // The affirmative option is created first, so index 0 carries the
    // yes count.
    let yes_votes = poll
        .options
        .first()
        .map(|option| option.voter_count.max(0) as u32)
        .unwrap_or(0);

    let update = PollUpdate {
        poll_id: poll.id.clone(),
        question: poll.question.clone(),
        yes_votes,
        total_votes: poll.total_voter_count.max(0) as u32,
        is_closed: poll.is_closed,
    };

    match deps.consensus.apply_update(&update) {
        Ok(PollOutcome::BanApproved {
            chat_id,
            target_user_id,
            trigger_message_id,
        }) => {
            let action = ModAction::Ban {
                reason: "the chat voted to remove a swindler".to_string(),
            };
            let outcome = deps
                .enforcer
                .enforce(chat_id, target_user_id, trigger_message_id, &action)
                .await;
            tracing::info!(chat_id, target_user_id, ?outcome, "consensus ban enforced");
        }
        Ok(outcome) => {
            tracing::debug!(poll_id = %update.poll_id, ?outcome, "poll update applied");
        }
        Err(err) => {
            // Malformed identity in the question: abstain rather than ban
            // whatever was in there.
            tracing::warn!(poll_id = %update.poll_id, "poll update ignored: {err}");
        }
    }

    Ok(())
}

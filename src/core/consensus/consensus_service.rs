// Consensus ban protocol - opens crowd votes and tallies their updates.
//
// Vote-count updates stream in from the transport with no ordering or
// delivery guarantees, so the state machine is defensive: a poll resolves
// exactly once, later updates for it are dropped, and updates for polls
// this instance never opened are dropped too.
//
// The registry is the correlation channel between a poll update and the
// chat it belongs to - Telegram poll updates carry the poll, not the chat.
// The question text carries the target identity (see poll_identity).

use super::consensus_models::{
    ConsensusConfig, ConsensusPoll, PollOutcome, PollState, PollUpdate,
};
use super::poll_identity;
use crate::core::enforcement::ChatTransport;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("Malformed poll identity: {0}")]
    MalformedPollIdentity(String),

    #[error("Poll {0} is already registered")]
    DuplicatePoll(String),

    #[error("Could not open the vote: {0}")]
    TransportFailed(String),
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Opens ban votes and applies their vote-count updates.
pub struct ConsensusService<T: ChatTransport> {
    transport: T,
    config: ConsensusConfig,
    /// poll id -> tracked vote. Entries are mutated under the map's per-key
    /// exclusive guard, which serializes concurrent updates for one poll.
    registry: DashMap<String, ConsensusPoll>,
}

impl<T: ChatTransport> ConsensusService<T> {
    pub fn new(transport: T, config: ConsensusConfig) -> Self {
        Self {
            transport,
            config,
            registry: DashMap::new(),
        }
    }

    /// Open a crowd vote against a user and register it for correlation.
    /// Returns the transport-assigned poll id.
    pub async fn open_vote(
        &self,
        chat_id: i64,
        target_user_id: u64,
        display_name: &str,
        trigger_message_id: Option<i32>,
    ) -> Result<String, ConsensusError> {
        let question = poll_identity::encode_question(target_user_id, display_name);
        // The affirmative option always comes first; tallying reads index 0.
        let options = vec![
            "yes, remove them".to_string(),
            "no, they stay".to_string(),
        ];

        let poll_id = self
            .transport
            .create_poll(chat_id, &question, &options)
            .await
            .map_err(|e| ConsensusError::TransportFailed(e.to_string()))?;

        let poll = ConsensusPoll {
            poll_id: poll_id.clone(),
            chat_id,
            target_user_id,
            trigger_message_id,
            threshold: self.config.approve_ratio,
            opened_at: Utc::now(),
            state: PollState::Open,
        };

        match self.registry.entry(poll_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(ConsensusError::DuplicatePoll(poll_id))
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                tracing::info!(chat_id, target_user_id, poll_id = %poll_id, "ban vote opened");
                vacant.insert(poll);
                Ok(poll_id)
            }
        }
    }

    /// Apply one vote-count snapshot.
    ///
    /// The whole read-evaluate-transition step runs under the registry's
    /// per-key guard, so two concurrent updates that both cross the
    /// threshold produce exactly one `BanApproved`.
    pub fn apply_update(&self, update: &PollUpdate) -> Result<PollOutcome, ConsensusError> {
        let Some(mut entry) = self.registry.get_mut(&update.poll_id) else {
            tracing::warn!(poll_id = %update.poll_id, "vote update for unknown poll, dropping");
            return Ok(PollOutcome::UnknownPoll);
        };
        let poll = entry.value_mut();

        if poll.state == PollState::Resolved {
            tracing::debug!(poll_id = %poll.poll_id, "update for resolved poll, dropping");
            return Ok(PollOutcome::AlreadyResolved);
        }

        // Zero voters means no signal, not unanimous approval.
        let ratio = if update.total_votes == 0 {
            0.0
        } else {
            f64::from(update.yes_votes) / f64::from(update.total_votes)
        };

        if ratio > poll.threshold {
            let decoded = poll_identity::decode_user_id(&update.question)?;
            if decoded != poll.target_user_id {
                // A question that no longer names the registered target is
                // not trusted; abstain.
                tracing::warn!(
                    poll_id = %poll.poll_id,
                    registered = poll.target_user_id,
                    decoded,
                    "poll question diverged from registered target, abstaining"
                );
                return Ok(PollOutcome::StillOpen);
            }

            poll.state = PollState::Resolved;
            tracing::info!(
                poll_id = %poll.poll_id,
                chat_id = poll.chat_id,
                target_user_id = decoded,
                yes_votes = update.yes_votes,
                total_votes = update.total_votes,
                "ban vote passed"
            );
            return Ok(PollOutcome::BanApproved {
                chat_id: poll.chat_id,
                target_user_id: decoded,
                trigger_message_id: poll.trigger_message_id,
            });
        }

        if update.is_closed {
            poll.state = PollState::Resolved;
            tracing::info!(poll_id = %poll.poll_id, "vote closed without a ban");
            return Ok(PollOutcome::ClosedWithoutBan);
        }

        Ok(PollOutcome::StillOpen)
    }

    /// Drop polls older than the ttl, resolved or not. Resolved entries are
    /// kept until then so late duplicate updates still land on
    /// `AlreadyResolved` instead of `UnknownPoll`.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let ttl = chrono::Duration::seconds(self.config.poll_ttl_secs as i64);
        let before = self.registry.len();
        self.registry.retain(|_, poll| now - poll.opened_at < ttl);
        let swept = before - self.registry.len();
        if swept > 0 {
            tracing::info!(swept, "expired consensus polls swept");
        }
        swept
    }

    pub fn open_poll_count(&self) -> usize {
        self.registry
            .iter()
            .filter(|entry| entry.value().state == PollState::Open)
            .count()
    }
}

// ============================================================================
// TESTS
// ============================================================================

// Action enforcement - applies a finalized decision to the chat, once.
//
// Decisions can be re-derived when the transport retries an event, so every
// enforcement is keyed by (chat, user, action kind, time bucket) in an
// in-memory ledger and duplicates are skipped. A failed effect (usually a
// missing bot permission) is logged and surfaced to the chat, never retried.

use super::transport_port::ChatTransport;
use crate::core::moderation::{ActionKind, ModAction};
use chrono::{DateTime, Utc};
use dashmap::DashMap;

// ============================================================================
// OUTCOME
// ============================================================================

/// What actually happened when a decision was enforced.
#[derive(Debug, Clone, PartialEq)]
pub enum EnforcementOutcome {
    /// Effects were applied.
    Applied,
    /// Nothing to do for this action.
    NoOp,
    /// The same decision was already enforced in this time bucket.
    DuplicateSkipped,
    /// The transport refused an effect; logged, not retried.
    Failed { reason: String },
}

// ============================================================================
// CORE SERVICE
// ============================================================================

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct LedgerKey {
    chat_id: i64,
    user_id: u64,
    kind: ActionKind,
    bucket: i64,
}

/// Applies decided actions to the chat with at-most-once semantics.
pub struct EnforcementService<T: ChatTransport> {
    transport: T,
    ledger: DashMap<LedgerKey, DateTime<Utc>>,
    bucket_secs: i64,
}

impl<T: ChatTransport> EnforcementService<T> {
    pub fn new(transport: T, bucket_secs: i64) -> Self {
        Self {
            transport,
            ledger: DashMap::new(),
            bucket_secs: bucket_secs.max(1),
        }
    }

    /// Enforce one decision against one target.
    ///
    /// `Ignore` and `DelegateToConsensus` are no-ops here: the first needs
    /// nothing and the second is carried out by the consensus service.
    pub async fn enforce(
        &self,
        chat_id: i64,
        target_user_id: u64,
        trigger_message_id: Option<i32>,
        action: &ModAction,
    ) -> EnforcementOutcome {
        if matches!(action, ModAction::Ignore | ModAction::DelegateToConsensus) {
            return EnforcementOutcome::NoOp;
        }

        let now = Utc::now();
        let key = LedgerKey {
            chat_id,
            user_id: target_user_id,
            kind: action.kind(),
            bucket: now.timestamp().div_euclid(self.bucket_secs),
        };
        // insert returns the previous value, so this doubles as the
        // check-and-mark step; a second enforcement of the same key loses.
        if self.ledger.insert(key, now).is_some() {
            tracing::debug!(
                chat_id,
                target_user_id,
                action = %action.kind(),
                "decision already enforced in this bucket, skipping"
            );
            return EnforcementOutcome::DuplicateSkipped;
        }

        match action {
            ModAction::Warn { reason } => {
                self.apply_warn(chat_id, target_user_id, trigger_message_id, reason)
                    .await
            }
            ModAction::Mute {
                duration_secs,
                reason,
            } => {
                self.apply_mute(chat_id, target_user_id, *duration_secs, reason)
                    .await
            }
            ModAction::Ban { reason } => {
                self.apply_ban(chat_id, target_user_id, trigger_message_id, reason)
                    .await
            }
            ModAction::Ignore | ModAction::DelegateToConsensus => EnforcementOutcome::NoOp,
        }
    }

    async fn apply_warn(
        &self,
        chat_id: i64,
        target_user_id: u64,
        trigger_message_id: Option<i32>,
        reason: &str,
    ) -> EnforcementOutcome {
        let text = format!("⚠️ careful: {}.", reason);
        match self
            .transport
            .send_reply(chat_id, trigger_message_id, &text)
            .await
        {
            Ok(()) => EnforcementOutcome::Applied,
            Err(err) => self.report_failure(chat_id, target_user_id, "warn", err).await,
        }
    }

    async fn apply_mute(
        &self,
        chat_id: i64,
        target_user_id: u64,
        duration_secs: u64,
        reason: &str,
    ) -> EnforcementOutcome {
        if let Err(err) = self
            .transport
            .restrict_member(chat_id, target_user_id, duration_secs)
            .await
        {
            return self.report_failure(chat_id, target_user_id, "mute", err).await;
        }

        let text = format!(
            "🔇 muted for {} minutes: {}.",
            duration_secs / 60,
            reason
        );
        if let Err(err) = self.transport.send_reply(chat_id, None, &text).await {
            tracing::warn!(chat_id, target_user_id, "failed to announce mute: {err}");
        }
        EnforcementOutcome::Applied
    }

    async fn apply_ban(
        &self,
        chat_id: i64,
        target_user_id: u64,
        trigger_message_id: Option<i32>,
        reason: &str,
    ) -> EnforcementOutcome {
        if let Err(err) = self.transport.ban_member(chat_id, target_user_id).await {
            return self.report_failure(chat_id, target_user_id, "ban", err).await;
        }

        // The triggering message goes with its author.
        if let Some(message_id) = trigger_message_id {
            if let Err(err) = self.transport.delete_message(chat_id, message_id).await {
                tracing::warn!(chat_id, message_id, "failed to delete trigger message: {err}");
            }
        }

        let text = format!("🔨 swindler removed: {}.", reason);
        if let Err(err) = self.transport.send_reply(chat_id, None, &text).await {
            tracing::warn!(chat_id, target_user_id, "failed to announce ban: {err}");
        }
        EnforcementOutcome::Applied
    }

    async fn report_failure(
        &self,
        chat_id: i64,
        target_user_id: u64,
        effect: &str,
        err: impl std::fmt::Display,
    ) -> EnforcementOutcome {
        let reason = err.to_string();
        tracing::warn!(chat_id, target_user_id, effect, "enforcement failed: {reason}");

        let text = format!(
            "I tried to {} a member but the chat would not let me. Do I have enough rights here?",
            effect
        );
        if let Err(reply_err) = self.transport.send_reply(chat_id, None, &text).await {
            tracing::warn!(chat_id, "failed to report enforcement failure: {reply_err}");
        }

        EnforcementOutcome::Failed { reason }
    }

    /// Drop ledger entries whose bucket can no longer collide.
    pub fn sweep_ledger(&self, now: DateTime<Utc>) -> usize {
        let horizon = chrono::Duration::seconds(self.bucket_secs * 2);
        let before = self.ledger.len();
        self.ledger.retain(|_, enforced_at| now - *enforced_at < horizon);
        before - self.ledger.len()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::enforcement::TransportError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Effect {
        Reply(i64, Option<i32>, String),
        Delete(i64, i32),
        Restrict(i64, u64, u64),
        Ban(i64, u64),
    }

    /// Records every effect; optionally refuses bans.
    struct RecordingTransport {
        effects: Mutex<Vec<Effect>>,
        refuse_bans: bool,
    }

    impl RecordingTransport {
        fn new() -> Self {
            Self {
                effects: Mutex::new(Vec::new()),
                refuse_bans: false,
            }
        }

        fn refusing_bans() -> Self {
            Self {
                effects: Mutex::new(Vec::new()),
                refuse_bans: true,
            }
        }

        fn effects(&self) -> Vec<Effect> {
            self.effects.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatTransport for RecordingTransport {
        async fn send_reply(
            &self,
            chat_id: i64,
            reply_to_message_id: Option<i32>,
            text: &str,
        ) -> Result<(), TransportError> {
            self.effects.lock().unwrap().push(Effect::Reply(
                chat_id,
                reply_to_message_id,
                text.to_string(),
            ));
            Ok(())
        }

        async fn delete_message(
            &self,
            chat_id: i64,
            message_id: i32,
        ) -> Result<(), TransportError> {
            self.effects
                .lock()
                .unwrap()
                .push(Effect::Delete(chat_id, message_id));
            Ok(())
        }

        async fn restrict_member(
            &self,
            chat_id: i64,
            user_id: u64,
            duration_secs: u64,
        ) -> Result<(), TransportError> {
            self.effects
                .lock()
                .unwrap()
                .push(Effect::Restrict(chat_id, user_id, duration_secs));
            Ok(())
        }

        async fn ban_member(&self, chat_id: i64, user_id: u64) -> Result<(), TransportError> {
            if self.refuse_bans {
                return Err(TransportError::EffectFailed(
                    "not enough rights".to_string(),
                ));
            }
            self.effects.lock().unwrap().push(Effect::Ban(chat_id, user_id));
            Ok(())
        }

        async fn unban_member(&self, _chat_id: i64, _user_id: u64) -> Result<(), TransportError> {
            Ok(())
        }

        async fn create_poll(
            &self,
            _chat_id: i64,
            _question: &str,
            _options: &[String],
        ) -> Result<String, TransportError> {
            Ok("poll-1".to_string())
        }
    }

    fn warn() -> ModAction {
        ModAction::Warn {
            reason: "looks like a scam".to_string(),
        }
    }

    #[tokio::test]
    async fn test_ignore_is_a_noop() {
        let service = EnforcementService::new(RecordingTransport::new(), 600);
        let outcome = service.enforce(-1, 2, Some(3), &ModAction::Ignore).await;
        assert_eq!(outcome, EnforcementOutcome::NoOp);
        assert!(service.transport.effects().is_empty());
    }

    #[tokio::test]
    async fn test_warn_replies_to_the_trigger() {
        let service = EnforcementService::new(RecordingTransport::new(), 600);
        let outcome = service.enforce(-1, 2, Some(3), &warn()).await;

        assert_eq!(outcome, EnforcementOutcome::Applied);
        let effects = service.transport.effects();
        assert_eq!(effects.len(), 1);
        assert!(matches!(&effects[0], Effect::Reply(-1, Some(3), _)));
    }

    #[tokio::test]
    async fn test_ban_removes_member_and_trigger_message() {
        let service = EnforcementService::new(RecordingTransport::new(), 600);
        let action = ModAction::Ban {
            reason: "the chat voted".to_string(),
        };
        let outcome = service.enforce(-1, 2, Some(3), &action).await;

        assert_eq!(outcome, EnforcementOutcome::Applied);
        let effects = service.transport.effects();
        assert_eq!(effects[0], Effect::Ban(-1, 2));
        assert_eq!(effects[1], Effect::Delete(-1, 3));
        assert!(matches!(&effects[2], Effect::Reply(-1, None, _)));
    }

    #[tokio::test]
    async fn test_mute_restricts_for_the_given_duration() {
        let service = EnforcementService::new(RecordingTransport::new(), 600);
        let action = ModAction::Mute {
            duration_secs: 1800,
            reason: "repeated scams".to_string(),
        };
        service.enforce(-1, 2, Some(3), &action).await;

        let effects = service.transport.effects();
        assert_eq!(effects[0], Effect::Restrict(-1, 2, 1800));
    }

    #[tokio::test]
    async fn test_duplicate_decision_is_enforced_once() {
        // Huge bucket so the two calls cannot straddle a bucket boundary.
        let service = EnforcementService::new(RecordingTransport::new(), 1_000_000);

        let first = service.enforce(-1, 2, Some(3), &warn()).await;
        let second = service.enforce(-1, 2, Some(3), &warn()).await;

        assert_eq!(first, EnforcementOutcome::Applied);
        assert_eq!(second, EnforcementOutcome::DuplicateSkipped);
        assert_eq!(service.transport.effects().len(), 1);
    }

    #[tokio::test]
    async fn test_different_action_kinds_do_not_collide() {
        let service = EnforcementService::new(RecordingTransport::new(), 600);

        service.enforce(-1, 2, Some(3), &warn()).await;
        let mute = ModAction::Mute {
            duration_secs: 60,
            reason: "again".to_string(),
        };
        let outcome = service.enforce(-1, 2, Some(4), &mute).await;

        assert_eq!(outcome, EnforcementOutcome::Applied);
    }

    #[tokio::test]
    async fn test_refused_ban_reports_failure_and_does_not_crash() {
        let service = EnforcementService::new(RecordingTransport::refusing_bans(), 600);
        let action = ModAction::Ban {
            reason: "the chat voted".to_string(),
        };
        let outcome = service.enforce(-1, 2, Some(3), &action).await;

        assert!(matches!(outcome, EnforcementOutcome::Failed { .. }));
        // The failure was surfaced to the chat instead of retried.
        let effects = service.transport.effects();
        assert_eq!(effects.len(), 1);
        assert!(matches!(&effects[0], Effect::Reply(-1, None, _)));
    }

    #[tokio::test]
    async fn test_ledger_sweep_frees_old_buckets() {
        let service = EnforcementService::new(RecordingTransport::new(), 600);
        service.enforce(-1, 2, Some(3), &warn()).await;

        assert_eq!(service.sweep_ledger(Utc::now()), 0);
        let later = Utc::now() + chrono::Duration::seconds(1300);
        assert_eq!(service.sweep_ledger(later), 1);
    }
}

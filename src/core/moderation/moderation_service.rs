// Moderation pipeline - core business logic for one inbound message.
//
// classifier score -> repeat-offense lookup -> strategy decision.
//
// NO Telegram dependencies here - just pure domain logic behind ports.

use super::moderation_models::{
    MessageContext, MessageVerdict, ModAction, ModerationConfig, ModerationIncident,
};
use super::strategy_delegator;
use crate::core::classifier::{ClassificationService, ScamClassifier, ScamScore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Storage error: {0}")]
    StorageError(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting per-user offense history.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Record one actionable incident for a user in a chat.
    async fn record_incident(
        &self,
        chat_id: i64,
        user_id: u64,
        score: f64,
        at: DateTime<Utc>,
    ) -> Result<(), ModerationError>;

    /// Count incidents for a user in a chat since the given instant.
    async fn count_recent(
        &self,
        chat_id: i64,
        user_id: u64,
        since: DateTime<Utc>,
    ) -> Result<u32, ModerationError>;

    /// Drop incidents older than the given instant. Returns how many went.
    async fn cleanup_old_records(&self, older_than: DateTime<Utc>) -> Result<u64, ModerationError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// The decision pipeline for inbound messages.
pub struct ModerationService<C: ScamClassifier, S: IncidentStore> {
    classifier: ClassificationService<C>,
    store: S,
    config: ModerationConfig,
}

impl<C: ScamClassifier, S: IncidentStore> ModerationService<C, S> {
    pub fn new(classifier: C, store: S, config: ModerationConfig) -> Self {
        let timeout = Duration::from_millis(config.classifier_timeout_ms);
        Self {
            classifier: ClassificationService::new(classifier, timeout),
            store,
            config,
        }
    }

    pub fn config(&self) -> &ModerationConfig {
        &self.config
    }

    /// Run one message through the pipeline and return the verdict.
    ///
    /// The caller owns enforcement; this method only decides. Actionable
    /// incidents are recorded so later mid-band hits escalate.
    pub async fn evaluate_message(
        &self,
        chat_id: i64,
        user_id: u64,
        message_id: i32,
        text: &str,
    ) -> Result<MessageVerdict, ModerationError> {
        let now = Utc::now();
        let score = self.classifier.score(text, user_id).await;

        let window_start = now - chrono::Duration::seconds(self.config.repeat_window_secs as i64);
        let recent_offenses = self.store.count_recent(chat_id, user_id, window_start).await?;

        let context = MessageContext { recent_offenses };
        let action = strategy_delegator::decide(score, context, &self.config);

        if let ScamScore::Known(probability) = score {
            if !matches!(action, ModAction::Ignore) {
                self.store
                    .record_incident(chat_id, user_id, probability, now)
                    .await?;
            }
        }

        tracing::debug!(
            chat_id,
            user_id,
            message_id,
            ?score,
            recent_offenses,
            action = %action.kind(),
            "message evaluated"
        );

        Ok(MessageVerdict {
            incident: ModerationIncident {
                chat_id,
                target_user_id: user_id,
                trigger_message_id: Some(message_id),
                score,
                created_at: now,
            },
            action,
        })
    }

    /// Drop offense records that fell out of the repeat window.
    pub async fn sweep_expired_incidents(&self) -> Result<u64, ModerationError> {
        let horizon =
            Utc::now() - chrono::Duration::seconds(self.config.repeat_window_secs as i64);
        self.store.cleanup_old_records(horizon).await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::ClassifierError;
    use dashmap::DashMap;

    /// In-memory store for testing
    struct MockIncidentStore {
        incidents: DashMap<(i64, u64), Vec<DateTime<Utc>>>,
    }

    impl MockIncidentStore {
        fn new() -> Self {
            Self {
                incidents: DashMap::new(),
            }
        }

        fn total(&self) -> usize {
            self.incidents.iter().map(|e| e.value().len()).sum()
        }
    }

    #[async_trait]
    impl IncidentStore for MockIncidentStore {
        async fn record_incident(
            &self,
            chat_id: i64,
            user_id: u64,
            _score: f64,
            at: DateTime<Utc>,
        ) -> Result<(), ModerationError> {
            self.incidents
                .entry((chat_id, user_id))
                .or_insert_with(Vec::new)
                .push(at);
            Ok(())
        }

        async fn count_recent(
            &self,
            chat_id: i64,
            user_id: u64,
            since: DateTime<Utc>,
        ) -> Result<u32, ModerationError> {
            Ok(self
                .incidents
                .get(&(chat_id, user_id))
                .map(|v| v.iter().filter(|t| **t >= since).count() as u32)
                .unwrap_or(0))
        }

        async fn cleanup_old_records(
            &self,
            older_than: DateTime<Utc>,
        ) -> Result<u64, ModerationError> {
            let mut removed = 0;
            for mut entry in self.incidents.iter_mut() {
                let before = entry.value().len();
                entry.value_mut().retain(|t| *t >= older_than);
                removed += (before - entry.value().len()) as u64;
            }
            Ok(removed)
        }
    }

    struct FixedClassifier(f64);

    #[async_trait]
    impl ScamClassifier for FixedClassifier {
        async fn score(&self, _text: &str, _user_id: u64) -> Result<f64, ClassifierError> {
            Ok(self.0)
        }
    }

    struct DownClassifier;

    #[async_trait]
    impl ScamClassifier for DownClassifier {
        async fn score(&self, _text: &str, _user_id: u64) -> Result<f64, ClassifierError> {
            Err(ClassifierError::Unavailable("502".into()))
        }
    }

    fn service<C: ScamClassifier>(
        classifier: C,
    ) -> ModerationService<C, MockIncidentStore> {
        ModerationService::new(classifier, MockIncidentStore::new(), ModerationConfig::default())
    }

    #[tokio::test]
    async fn test_harmless_message_passes() {
        let service = service(FixedClassifier(0.05));
        let verdict = service.evaluate_message(1, 2, 3, "hello").await.unwrap();
        assert_eq!(verdict.action, ModAction::Ignore);
    }

    #[tokio::test]
    async fn test_high_score_delegates_to_consensus() {
        let service = service(FixedClassifier(0.95));
        let verdict = service
            .evaluate_message(1, 2, 3, "send me crypto")
            .await
            .unwrap();
        assert_eq!(verdict.action, ModAction::DelegateToConsensus);
    }

    #[tokio::test]
    async fn test_classifier_outage_means_ignore() {
        let service = service(DownClassifier);
        let verdict = service.evaluate_message(1, 2, 3, "anything").await.unwrap();
        assert_eq!(verdict.action, ModAction::Ignore);
        assert_eq!(verdict.incident.score, ScamScore::Unknown);
    }

    #[tokio::test]
    async fn test_mid_band_escalates_on_repeat() {
        let service = service(FixedClassifier(0.6));

        let first = service.evaluate_message(1, 2, 3, "dubious").await.unwrap();
        assert!(matches!(first.action, ModAction::Warn { .. }));

        // The first verdict was recorded, so the second one escalates.
        let second = service.evaluate_message(1, 2, 4, "dubious").await.unwrap();
        assert!(matches!(second.action, ModAction::Mute { .. }));
    }

    #[tokio::test]
    async fn test_ignored_messages_are_not_recorded() {
        let service = service(FixedClassifier(0.1));
        service.evaluate_message(1, 2, 3, "hello").await.unwrap();
        service.evaluate_message(1, 2, 4, "again").await.unwrap();
        assert_eq!(service.store.total(), 0);
    }

    #[tokio::test]
    async fn test_offense_history_is_per_user() {
        let service = service(FixedClassifier(0.6));

        service.evaluate_message(1, 2, 3, "dubious").await.unwrap();
        let other_user = service.evaluate_message(1, 99, 4, "dubious").await.unwrap();

        // A different user still gets the first-offense treatment.
        assert!(matches!(other_user.action, ModAction::Warn { .. }));
    }
}

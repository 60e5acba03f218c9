// Classification client - wraps the external scam classifier.
//
// The classifier lives in a separate service and can be slow or down.
// Nothing downstream ever sees a fabricated probability: unavailability
// and timeouts resolve to an explicit `Unknown` score so the strategy
// can fail safe instead of acting on a made-up zero.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Classifier unavailable: {0}")]
    Unavailable(String),

    #[error("Classifier returned a malformed response: {0}")]
    MalformedResponse(String),
}

// ============================================================================
// SCORE
// ============================================================================

/// Classifier output for one evaluated message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScamScore {
    /// Scam probability in [0, 1].
    Known(f64),
    /// The classifier could not be reached in time. Kept distinct from any
    /// numeric value so the policy can pick a conservative fallback.
    Unknown,
}

// ============================================================================
// PROVIDER TRAIT (PORT)
// ============================================================================

/// Port to the external scam-scoring service.
#[async_trait]
pub trait ScamClassifier: Send + Sync {
    /// Returns the scam probability for one message, in [0, 1].
    async fn score(&self, text: &str, user_id: u64) -> Result<f64, ClassifierError>;
}

// Blanket implementation for Box<dyn ScamClassifier> so callers can hold a
// trait object and still use the generic service.
#[async_trait]
impl ScamClassifier for Box<dyn ScamClassifier> {
    async fn score(&self, text: &str, user_id: u64) -> Result<f64, ClassifierError> {
        (**self).score(text, user_id).await
    }
}

// ============================================================================
// SERVICE
// ============================================================================

/// Timeout-bounded wrapper around a `ScamClassifier`.
pub struct ClassificationService<C: ScamClassifier> {
    classifier: C,
    timeout: Duration,
}

impl<C: ScamClassifier> ClassificationService<C> {
    pub fn new(classifier: C, timeout: Duration) -> Self {
        Self {
            classifier,
            timeout,
        }
    }

    /// Score one message. Never fails: errors and timeouts degrade to
    /// `ScamScore::Unknown`.
    pub async fn score(&self, text: &str, user_id: u64) -> ScamScore {
        match tokio::time::timeout(self.timeout, self.classifier.score(text, user_id)).await {
            Ok(Ok(probability)) => ScamScore::Known(probability.clamp(0.0, 1.0)),
            Ok(Err(err)) => {
                tracing::warn!(user_id, "classifier call failed: {err}");
                ScamScore::Unknown
            }
            Err(_) => {
                tracing::warn!(
                    user_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "classifier call timed out"
                );
                ScamScore::Unknown
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

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
            Err(ClassifierError::Unavailable("connection refused".into()))
        }
    }

    struct SlowClassifier;

    #[async_trait]
    impl ScamClassifier for SlowClassifier {
        async fn score(&self, _text: &str, _user_id: u64) -> Result<f64, ClassifierError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(0.99)
        }
    }

    #[tokio::test]
    async fn test_known_score_passes_through() {
        let service = ClassificationService::new(FixedClassifier(0.42), Duration::from_secs(1));
        assert_eq!(service.score("hi", 1).await, ScamScore::Known(0.42));
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_clamped() {
        let service = ClassificationService::new(FixedClassifier(1.7), Duration::from_secs(1));
        assert_eq!(service.score("hi", 1).await, ScamScore::Known(1.0));

        let service = ClassificationService::new(FixedClassifier(-0.3), Duration::from_secs(1));
        assert_eq!(service.score("hi", 1).await, ScamScore::Known(0.0));
    }

    #[tokio::test]
    async fn test_unavailable_classifier_gives_unknown() {
        let service = ClassificationService::new(DownClassifier, Duration::from_secs(1));
        assert_eq!(service.score("hi", 1).await, ScamScore::Unknown);
    }

    #[tokio::test]
    async fn test_timeout_gives_unknown() {
        let service = ClassificationService::new(SlowClassifier, Duration::from_millis(10));
        assert_eq!(service.score("hi", 1).await, ScamScore::Unknown);
    }
}

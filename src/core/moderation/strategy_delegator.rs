// Strategy delegation - maps a classification score plus message context to
// a moderation action. Pure policy, no IO, total over every input.

use super::moderation_models::{MessageContext, ModAction, ModerationConfig};
use crate::core::classifier::ScamScore;

/// Pick the action for one scored message.
///
/// The bands, from the bottom up:
/// - unknown score -> Ignore (the classifier was unreachable, fail safe)
/// - below `low_threshold` -> Ignore
/// - mid band -> Warn on a first occurrence, Mute on repeats in the window
/// - at or above `high_threshold` -> DelegateToConsensus; a ban always goes
///   through the crowd vote, never straight out of the classifier
pub fn decide(score: ScamScore, context: MessageContext, config: &ModerationConfig) -> ModAction {
    let probability = match score {
        ScamScore::Known(p) => p,
        ScamScore::Unknown => return ModAction::Ignore,
    };

    // NaN or other garbage from a misbehaving classifier degrades to Ignore.
    if !probability.is_finite() {
        return ModAction::Ignore;
    }

    if probability < config.low_threshold {
        return ModAction::Ignore;
    }

    if probability >= config.high_threshold {
        return ModAction::DelegateToConsensus;
    }

    if context.recent_offenses == 0 {
        ModAction::Warn {
            reason: "this message looks like a scam".to_string(),
        }
    } else {
        ModAction::Mute {
            duration_secs: config.mute_duration_secs,
            reason: "repeated messages that look like scams".to_string(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

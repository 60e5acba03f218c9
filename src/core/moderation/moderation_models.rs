// Moderation domain models - data structures for the swindler pipeline.
//
// These are pure domain types with no Telegram dependencies.
// The telegram layer converts chosen actions into transport effects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::classifier::ScamScore;

/// What the pipeline decided to do about one message or report.
#[derive(Debug, Clone, PartialEq)]
pub enum ModAction {
    /// Nothing actionable - message passes.
    Ignore,
    /// Reply with a warning, message stays.
    Warn { reason: String },
    /// Temporarily restrict the author.
    Mute { duration_secs: u64, reason: String },
    /// Open a crowd vote instead of banning outright.
    DelegateToConsensus,
    /// Remove the member. Only ever produced by a resolved consensus poll
    /// or an explicit admin decision, never by the classifier alone.
    Ban { reason: String },
}

impl ModAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            ModAction::Ignore => ActionKind::Ignore,
            ModAction::Warn { .. } => ActionKind::Warn,
            ModAction::Mute { .. } => ActionKind::Mute,
            ModAction::DelegateToConsensus => ActionKind::DelegateToConsensus,
            ModAction::Ban { .. } => ActionKind::Ban,
        }
    }
}

/// Payload-free discriminant, used for dedup ledger keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Ignore,
    Warn,
    Mute,
    DelegateToConsensus,
    Ban,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::Ignore => write!(f, "ignore"),
            ActionKind::Warn => write!(f, "warn"),
            ActionKind::Mute => write!(f, "mute"),
            ActionKind::DelegateToConsensus => write!(f, "delegate-to-consensus"),
            ActionKind::Ban => write!(f, "ban"),
        }
    }
}

/// Context the strategy needs beside the raw score.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageContext {
    /// Incidents recorded for the same (chat, user) inside the repeat window.
    pub recent_offenses: u32,
}

/// One evaluated occurrence of suspicious behaviour. Owned by the pipeline
/// invocation that created it and discarded once an action is enforced.
#[derive(Debug, Clone)]
pub struct ModerationIncident {
    pub chat_id: i64,
    pub target_user_id: u64,
    pub trigger_message_id: Option<i32>,
    pub score: ScamScore,
    #[allow(dead_code)]
    pub created_at: DateTime<Utc>,
}

/// Result of running one message through the pipeline.
#[derive(Debug, Clone)]
pub struct MessageVerdict {
    pub incident: ModerationIncident,
    pub action: ModAction,
}

/// Configuration for the decision pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Scores below this are ignored.
    pub low_threshold: f64,
    /// Scores at or above this open a crowd vote.
    pub high_threshold: f64,
    /// How long a mid-band repeat offender is muted for.
    pub mute_duration_secs: u64,
    /// Window in which earlier incidents count as repeat offenses.
    pub repeat_window_secs: u64,
    /// How long one classifier call may take before falling back to Unknown.
    pub classifier_timeout_ms: u64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            low_threshold: 0.4,        // below: pass through
            high_threshold: 0.8,       // at or above: crowd vote
            mute_duration_secs: 3600,  // 1 hour mute for repeat offenders
            repeat_window_secs: 86400, // offenses count for 24 hours
            classifier_timeout_ms: 2000,
        }
    }
}

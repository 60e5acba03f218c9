// Consensus domain models - data structures for the crowd-vote protocol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of one crowd vote. A poll resolves exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Open,
    Resolved,
}

/// One tracked crowd vote against a suspected swindler.
#[derive(Debug, Clone)]
pub struct ConsensusPoll {
    pub poll_id: String,
    pub chat_id: i64,
    /// Who the vote was opened against. The same id also travels inside the
    /// poll question, which is what vote updates are decoded from.
    pub target_user_id: u64,
    /// Message that triggered the report, deleted if the ban goes through.
    pub trigger_message_id: Option<i32>,
    pub threshold: f64,
    pub opened_at: DateTime<Utc>,
    pub state: PollState,
}

/// Inbound vote-count snapshot from the transport.
#[derive(Debug, Clone)]
pub struct PollUpdate {
    pub poll_id: String,
    pub question: String,
    pub yes_votes: u32,
    pub total_votes: u32,
    pub is_closed: bool,
}

/// What one update did to the poll it addressed.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Threshold crossed: ban the decoded target in the given chat.
    BanApproved {
        chat_id: i64,
        target_user_id: u64,
        trigger_message_id: Option<i32>,
    },
    /// Below threshold, poll stays open.
    StillOpen,
    /// The poll closed without ever crossing the threshold.
    ClosedWithoutBan,
    /// Update for a poll that already resolved - dropped.
    AlreadyResolved,
    /// Update for a poll this instance never opened - dropped.
    UnknownPoll,
}

/// Consensus tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Fraction of voters that must confirm before a ban is emitted.
    pub approve_ratio: f64,
    /// Open polls older than this are swept without action.
    pub poll_ttl_secs: u64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            approve_ratio: 0.1,
            poll_ttl_secs: 86400, // votes stay open for a day at most
        }
    }
}

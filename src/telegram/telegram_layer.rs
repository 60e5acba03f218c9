// Telegram layer - command handlers, event adapters, and the transport impl.
//
// This layer is THIN - no business logic, just translation between
// Telegram types and the core services.

#[path = "commands.rs"]
pub mod commands;

#[path = "message_handler.rs"]
pub mod message_handler;

#[path = "poll_handler.rs"]
pub mod poll_handler;

#[path = "transport.rs"]
pub mod transport;

use crate::core::consensus::ConsensusService;
use crate::core::enforcement::EnforcementService;
use crate::core::moderation::ModerationService;
use crate::infra::classifier::HttpClassifier;
use crate::infra::moderation::SqliteIncidentStore;
use crate::infra::session::SqliteSessionStore;
use std::sync::Arc;
use transport::TelegramTransport;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type HandlerResult = Result<(), Error>;

/// Shared service handles injected into every handler.
#[derive(Clone)]
pub struct BotDeps {
    pub sessions: Arc<SqliteSessionStore>,
    pub moderation: Arc<ModerationService<HttpClassifier, SqliteIncidentStore>>,
    pub consensus: Arc<ConsensusService<Arc<TelegramTransport>>>,
    pub enforcer: Arc<EnforcementService<Arc<TelegramTransport>>>,
    pub transport: Arc<TelegramTransport>,
}

/// Prefer the @handle, fall back to the profile name.
pub fn display_name(user: &teloxide::types::User) -> String {
    match &user.username {
        Some(username) => format!("@{}", username),
        None => user.full_name(),
    }
}

// Admin commands.
//
// Every command is admin-gated; /report and /mute additionally require the
// bot to be switched on for the chat. The gate itself is a pure function so
// the admission rules stay testable without a live bot.

use crate::core::enforcement::transport_port::ChatTransport;
use crate::core::moderation::ModAction;
use crate::core::session::{ChatConfig, SessionStore};
use crate::telegram::{display_name, BotDeps, HandlerResult};
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{ChatId, Message, UserId};
use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Moderation commands:")]
pub enum Command {
    #[command(description = "switch moderation on for this chat.")]
    Start,
    #[command(description = "switch moderation off for this chat.")]
    Finish,
    #[command(description = "open a ban vote against the replied-to message's author.")]
    Report,
    #[command(description = "mute the replied-to message's author.")]
    Mute,
    #[command(description = "lift a ban: /unban <user id>.")]
    Unban(String),
}

impl Command {
    fn needs_active_bot(&self) -> bool {
        matches!(self, Command::Report | Command::Mute)
    }
}

// ============================================================================
// ADMISSION GATE
// ============================================================================

/// Why a command was refused before its handler ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandDenial {
    NotAdmin,
    BotInactive,
}

/// The admin check always comes first; activation only matters for commands
/// that act on chat members.
pub fn admission(
    issuer_is_admin: bool,
    bot_is_active: bool,
    needs_active_bot: bool,
) -> Result<(), CommandDenial> {
    if !issuer_is_admin {
        return Err(CommandDenial::NotAdmin);
    }
    if needs_active_bot && !bot_is_active {
        return Err(CommandDenial::BotInactive);
    }
    Ok(())
}

// ============================================================================
// HANDLER
// ============================================================================

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    deps: BotDeps,
) -> HandlerResult {
    if !(msg.chat.is_group() || msg.chat.is_supergroup()) {
        bot.send_message(msg.chat.id, "I only moderate group chats.")
            .await?;
        return Ok(());
    }
    let Some(issuer) = msg.from() else {
        return Ok(());
    };

    let issuer_is_admin = is_admin(&bot, msg.chat.id, issuer.id).await;
    let bot_is_active = match deps.sessions.is_active(msg.chat.id.0).await {
        Ok(active) => active,
        Err(err) => {
            tracing::error!(chat_id = msg.chat.id.0, "session lookup failed: {err}");
            false
        }
    };

    if let Err(denial) = admission(issuer_is_admin, bot_is_active, cmd.needs_active_bot()) {
        let text = match denial {
            CommandDenial::NotAdmin => "Only chat admins can use that.",
            CommandDenial::BotInactive => {
                "Moderation is off here. An admin can switch it on with /start."
            }
        };
        bot.send_message(msg.chat.id, text)
            .reply_to_message_id(msg.id)
            .await?;
        return Ok(());
    }

    match cmd {
        Command::Start => start(&bot, &msg, &deps).await,
        Command::Finish => finish(&bot, &msg, &deps).await,
        Command::Report => report(&bot, &msg, &deps).await,
        Command::Mute => mute(&bot, &msg, &deps).await,
        Command::Unban(args) => unban(&bot, &msg, &deps, args.trim()).await,
    }
}

async fn start(bot: &Bot, msg: &Message, deps: &BotDeps) -> HandlerResult {
    deps.sessions
        .set(msg.chat.id.0, ChatConfig { is_active: true })
        .await?;
    bot.send_message(
        msg.chat.id,
        "🛡 I'm watching this chat now. Reply to a suspicious message with /report to start a ban vote.",
    )
    .await?;
    Ok(())
}

async fn finish(bot: &Bot, msg: &Message, deps: &BotDeps) -> HandlerResult {
    deps.sessions
        .set(msg.chat.id.0, ChatConfig { is_active: false })
        .await?;
    bot.send_message(
        msg.chat.id,
        "As you wish. Good luck spotting the swindlers without me...",
    )
    .await?;
    Ok(())
}

async fn report(bot: &Bot, msg: &Message, deps: &BotDeps) -> HandlerResult {
    let Some(reported) = msg.reply_to_message() else {
        bot.send_message(
            msg.chat.id,
            "Use /report as a reply to the swindler's message.",
        )
        .await?;
        return Ok(());
    };
    let Some(target) = reported.from() else {
        bot.send_message(msg.chat.id, "I can't tell who wrote that message.")
            .await?;
        return Ok(());
    };
    if target.is_bot {
        bot.send_message(msg.chat.id, "That's a bot; ask an admin to remove it directly.")
            .await?;
        return Ok(());
    }

    let name = display_name(target);
    match deps
        .consensus
        .open_vote(msg.chat.id.0, target.id.0, &name, Some(reported.id.0))
        .await
    {
        Ok(poll_id) => {
            tracing::info!(
                chat_id = msg.chat.id.0,
                target_user_id = target.id.0,
                poll_id = %poll_id,
                "report accepted"
            );
            // Tidy the command away; the poll is the visible artifact.
            if let Err(err) = bot.delete_message(msg.chat.id, msg.id).await {
                tracing::warn!("failed to delete /report command: {err}");
            }
        }
        Err(err) => {
            tracing::error!(chat_id = msg.chat.id.0, "failed to open ban vote: {err}");
            bot.send_message(msg.chat.id, "I couldn't open the vote, sorry.")
                .await?;
        }
    }
    Ok(())
}

async fn mute(bot: &Bot, msg: &Message, deps: &BotDeps) -> HandlerResult {
    let Some(reported) = msg.reply_to_message() else {
        bot.send_message(msg.chat.id, "Use /mute as a reply to the offending message.")
            .await?;
        return Ok(());
    };
    let Some(target) = reported.from() else {
        bot.send_message(msg.chat.id, "I can't tell who wrote that message.")
            .await?;
        return Ok(());
    };

    let action = ModAction::Mute {
        duration_secs: deps.moderation.config().mute_duration_secs,
        reason: "an admin decided you need a break".to_string(),
    };
    let outcome = deps
        .enforcer
        .enforce(msg.chat.id.0, target.id.0, Some(reported.id.0), &action)
        .await;
    tracing::info!(
        chat_id = msg.chat.id.0,
        target_user_id = target.id.0,
        ?outcome,
        "manual mute"
    );
    Ok(())
}

async fn unban(bot: &Bot, msg: &Message, deps: &BotDeps, args: &str) -> HandlerResult {
    let Ok(user_id) = args.parse::<u64>() else {
        bot.send_message(msg.chat.id, "Usage: /unban <user id>").await?;
        return Ok(());
    };

    match deps.transport.unban_member(msg.chat.id.0, user_id).await {
        Ok(()) => {
            bot.send_message(msg.chat.id, "ok, unbanned.").await?;
        }
        Err(err) => {
            tracing::warn!(chat_id = msg.chat.id.0, user_id, "unban failed: {err}");
            bot.send_message(msg.chat.id, "I couldn't lift that ban.").await?;
        }
    }
    Ok(())
}

/// Admin lookups that fail deny the command rather than letting it through.
async fn is_admin(bot: &Bot, chat_id: ChatId, user_id: UserId) -> bool {
    match bot.get_chat_administrators(chat_id).await {
        Ok(admins) => admins.iter().any(|member| member.user.id == user_id),
        Err(err) => {
            tracing::warn!(chat_id = chat_id.0, "admin lookup failed, denying: {err}");
            false
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

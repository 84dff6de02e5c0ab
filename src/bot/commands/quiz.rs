use teloxide::prelude::*;

use crate::bot::handlers::BotDeps;
use crate::quiz::error::QuizError;
use crate::quiz::manager::Initiator;
use crate::quiz::session::SessionKind;
use crate::quiz::settings::CategoryMode;
use crate::utils::validation::MAX_QUESTIONS_PER_SESSION;

/// Parsed form of the `/quiz` argument string.
struct QuizArgs {
    question_count: Option<usize>,
    categories: Vec<String>,
    announce: bool,
}

/// `/quiz [count] [category ...] [announce]`; a bare `/quiz` runs with the
/// chat's defaults and randomly selected categories.
fn parse_quiz_args(args: &str) -> Result<QuizArgs, String> {
    let mut tokens: Vec<&str> = args.split_whitespace().collect();

    let announce = tokens
        .last()
        .is_some_and(|t| t.eq_ignore_ascii_case("announce"));
    if announce {
        tokens.pop();
    }

    let mut question_count = None;
    if let Some(first) = tokens.first() {
        if let Ok(count) = first.parse::<usize>() {
            if !(1..=MAX_QUESTIONS_PER_SESSION).contains(&count) {
                return Err(format!(
                    "The question count must be between 1 and {MAX_QUESTIONS_PER_SESSION}."
                ));
            }
            question_count = Some(count);
            tokens.remove(0);
        }
    }

    Ok(QuizArgs {
        question_count,
        categories: tokens.iter().map(|t| (*t).to_string()).collect(),
        announce,
    })
}

pub async fn handle_quiz(
    bot: Bot,
    msg: Message,
    args: String,
    deps: &BotDeps,
) -> ResponseResult<()> {
    let chat_id = msg.chat.id.0;
    let Some(user) = msg.from() else {
        return Ok(());
    };
    tracing::info!(
        "Quiz command by {}({}) in chat {} with args '{}'",
        user.full_name(),
        user.id.0,
        chat_id,
        args
    );

    if deps.manager.has_active_session(chat_id).await {
        bot.send_message(
            msg.chat.id,
            "A quiz is already running in this chat. Stop it with /stopquiz.",
        )
        .await?;
        return Ok(());
    }

    let parsed = match parse_quiz_args(&args) {
        Ok(parsed) => parsed,
        Err(reason) => {
            bot.send_message(msg.chat.id, format!("❌ {reason}")).await?;
            return Ok(());
        }
    };

    let mut config = deps.settings.quiz_config(chat_id, parsed.announce);
    if let Some(count) = parsed.question_count {
        config.question_count = count;
    }
    if !parsed.categories.is_empty() {
        config.category_mode = CategoryMode::Specific(parsed.categories);
    }

    let initiator = Initiator {
        user_id: user.id.0,
        display_name: user.full_name(),
    };
    match deps
        .manager
        .create_and_start(chat_id, Some(initiator), config, SessionKind::Manual)
        .await
    {
        Ok(()) => {}
        Err(e) => {
            let reply = match &e {
                QuizError::Configuration(reason) => format!("❌ {reason}"),
                QuizError::NoQuestionsAvailable => {
                    "❌ No questions available for that selection.".to_string()
                }
                QuizError::ConcurrentSession(_) => {
                    "A quiz is already running in this chat.".to_string()
                }
                _ => "⚠️ The quiz could not be started.".to_string(),
            };
            tracing::warn!("Chat {}: quiz start rejected: {}", chat_id, e);
            bot.send_message(msg.chat.id, reply).await?;
        }
    }
    Ok(())
}

pub async fn handle_stop_quiz(bot: Bot, msg: Message, deps: &BotDeps) -> ResponseResult<()> {
    let chat_id = msg.chat.id.0;
    let Some(user) = msg.from() else {
        return Ok(());
    };

    let Some((initiator, kind)) = deps.manager.active_session_info(chat_id).await else {
        bot.send_message(msg.chat.id, "There is no quiz running in this chat.")
            .await?;
        return Ok(());
    };

    let is_admin = match deps.platform.is_admin(chat_id, user.id.0).await {
        Ok(admin) => admin,
        Err(e) => {
            tracing::warn!("Chat {}: admin check failed: {}", chat_id, e);
            false
        }
    };
    // The daily quiz belongs to the chat, not a user: only admins may stop
    // it. A manual quiz may also be stopped by whoever started it.
    let may_stop = match kind {
        SessionKind::Daily => is_admin,
        SessionKind::Manual => is_admin || initiator == Some(user.id.0),
    };
    if !may_stop {
        bot.send_message(
            msg.chat.id,
            "Only administrators or the person who started the quiz can stop it.",
        )
        .await?;
        return Ok(());
    }

    tracing::info!("User {} stopped the quiz in chat {}", user.id.0, chat_id);
    if let Err(e) = deps.manager.stop(chat_id).await {
        tracing::warn!("Chat {}: stop failed: {}", chat_id, e);
        bot.send_message(msg.chat.id, "There is no quiz running in this chat.")
            .await?;
    }
    Ok(())
}

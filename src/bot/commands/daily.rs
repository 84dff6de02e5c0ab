use teloxide::prelude::*;

use crate::bot::handlers::BotDeps;
use crate::utils::validation::parse_daily_time;

/// `/daily on [HH:MM]` enables the daily quiz (optionally moving its time),
/// `/daily off` disables it, `/daily status` or a bare `/daily` reports the
/// current settings. Admin-only; the check is delegated to the platform.
pub async fn handle_daily(
    bot: Bot,
    msg: Message,
    args: String,
    deps: &BotDeps,
) -> ResponseResult<()> {
    let chat_id = msg.chat.id.0;
    let Some(user) = msg.from() else {
        return Ok(());
    };

    let is_admin = match deps.platform.is_admin(chat_id, user.id.0).await {
        Ok(admin) => admin,
        Err(e) => {
            tracing::warn!("Chat {}: admin check failed: {}", chat_id, e);
            false
        }
    };
    if !is_admin {
        bot.send_message(
            msg.chat.id,
            "Only administrators can configure the daily quiz.",
        )
        .await?;
        return Ok(());
    }

    let mut tokens = args.split_whitespace();
    match tokens.next().map(str::to_ascii_lowercase).as_deref() {
        Some("on") => {
            let time = match tokens.next().map(parse_daily_time) {
                Some(Ok(time)) => Some(time),
                Some(Err(e)) => {
                    bot.send_message(msg.chat.id, format!("❌ {e}")).await?;
                    return Ok(());
                }
                None => None,
            };
            deps.settings.update(chat_id, |settings| {
                settings.daily.enabled = true;
                if let Some((hour, minute)) = time {
                    settings.daily.hour = hour;
                    settings.daily.minute = minute;
                }
            });
            if let Err(e) = deps.daily.schedule_for_chat(chat_id).await {
                tracing::error!("Chat {}: daily quiz scheduling failed: {}", chat_id, e);
                bot.send_message(msg.chat.id, "⚠️ Could not schedule the daily quiz.")
                    .await?;
                return Ok(());
            }
            let daily = deps.settings.daily(chat_id);
            bot.send_message(
                msg.chat.id,
                format!(
                    "✅ Daily quiz enabled at {:02}:{:02} UTC.",
                    daily.hour, daily.minute
                ),
            )
            .await?;
        }
        Some("off") => {
            deps.settings
                .update(chat_id, |settings| settings.daily.enabled = false);
            if let Err(e) = deps.daily.schedule_for_chat(chat_id).await {
                tracing::error!("Chat {}: daily quiz unscheduling failed: {}", chat_id, e);
            }
            bot.send_message(msg.chat.id, "Daily quiz disabled.").await?;
        }
        Some("status") | None => {
            let daily = deps.settings.daily(chat_id);
            let text = if daily.enabled {
                format!(
                    "Daily quiz is on: {:02}:{:02} UTC, {} questions, {}s per question.",
                    daily.hour, daily.minute, daily.question_count, daily.open_period_secs
                )
            } else {
                "Daily quiz is off. Enable it with /daily on [HH:MM].".to_string()
            };
            bot.send_message(msg.chat.id, text).await?;
        }
        Some(other) => {
            bot.send_message(
                msg.chat.id,
                format!("Unknown option '{other}'. Use /daily on [HH:MM], off or status."),
            )
            .await?;
        }
    }
    Ok(())
}

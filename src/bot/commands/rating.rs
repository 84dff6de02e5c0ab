use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::bot::handlers::BotDeps;
use crate::quiz::scores::RatingRow;
use crate::utils::markdown::{escape_markdown, format_points};

fn rating_text(title: &str, rows: &[RatingRow]) -> String {
    if rows.is_empty() {
        return format!("{title}\n\nNo scores recorded yet\\. Start a quiz with /quiz\\!");
    }
    let medals = ["🥇", "🥈", "🥉"];
    let mut lines = vec![title.to_string(), String::new()];
    for (i, row) in rows.iter().enumerate() {
        let rank = if i < medals.len() && row.score > 0.0 {
            medals[i].to_string()
        } else {
            format!("{}\\.", i + 1)
        };
        lines.push(format!(
            "{rank} {} \\- {}",
            escape_markdown(&row.display_name),
            escape_markdown(&format_points(row.score))
        ));
    }
    lines.join("\n")
}

pub async fn handle_rating(bot: Bot, msg: Message, deps: &BotDeps) -> ResponseResult<()> {
    let rows = deps.manager.chat_rating(msg.chat.id.0);
    let text = rating_text("🏆 *Chat rating*", &rows);
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::MarkdownV2)
        .await?;
    Ok(())
}

pub async fn handle_global_rating(bot: Bot, msg: Message, deps: &BotDeps) -> ResponseResult<()> {
    let rows = deps.manager.global_rating();
    let text = rating_text("🌍 *Global rating*", &rows);
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::MarkdownV2)
        .await?;
    Ok(())
}

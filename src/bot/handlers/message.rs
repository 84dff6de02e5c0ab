use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::bot::commands::Command;
use crate::bot::handlers::BotDeps;

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    deps: BotDeps,
) -> ResponseResult<()> {
    match cmd {
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }
        Command::Start => {
            bot.send_message(
                msg.chat.id,
                "🎲 Welcome to the trivia quiz bot!\n\nUse /quiz to start a round.\nUse /help to see all commands.",
            )
            .await?;
        }
        Command::Quiz { args } => {
            crate::bot::commands::quiz::handle_quiz(bot, msg, args, &deps).await?;
        }
        Command::StopQuiz => {
            crate::bot::commands::quiz::handle_stop_quiz(bot, msg, &deps).await?;
        }
        Command::Rating => {
            crate::bot::commands::rating::handle_rating(bot, msg, &deps).await?;
        }
        Command::GlobalRating => {
            crate::bot::commands::rating::handle_global_rating(bot, msg, &deps).await?;
        }
        Command::Daily { args } => {
            crate::bot::commands::daily::handle_daily(bot, msg, args, &deps).await?;
        }
    }
    Ok(())
}

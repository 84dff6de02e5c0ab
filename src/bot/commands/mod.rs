pub mod daily;
pub mod quiz;
pub mod rating;

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Trivia quiz bot commands:")]
pub enum Command {
    #[command(description = "Display this help message")]
    Help,
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Start a quiz: /quiz [count] [category ...] [announce]")]
    Quiz { args: String },
    #[command(description = "Stop the running quiz")]
    StopQuiz,
    #[command(description = "Show this chat's score rating")]
    Rating,
    #[command(description = "Show the rating across all chats")]
    GlobalRating,
    #[command(description = "Configure the daily quiz: /daily on [HH:MM] | off | status")]
    Daily { args: String },
}

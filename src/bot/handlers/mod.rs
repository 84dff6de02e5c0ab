pub mod message;
pub mod poll_answer;

use std::sync::Arc;

use teloxide::{
    dispatching::{dialogue, UpdateHandler},
    prelude::*,
};

use crate::quiz::manager::QuizManager;
use crate::quiz::platform::ChatPlatform;
use crate::quiz::settings::ChatSettingsStore;
use crate::services::daily::DailyQuizService;

/// Shared handles the command and event handlers work with.
#[derive(Clone)]
pub struct BotDeps {
    pub manager: Arc<QuizManager>,
    pub platform: Arc<dyn ChatPlatform>,
    pub settings: Arc<ChatSettingsStore>,
    pub daily: Arc<DailyQuizService>,
}

pub struct BotHandler {
    pub deps: BotDeps,
}

impl BotHandler {
    pub fn new(deps: BotDeps) -> Self {
        Self { deps }
    }

    pub fn schema(&self) -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
        use teloxide::dispatching::UpdateFilterExt;

        let deps = self.deps.clone();
        let deps_poll = self.deps.clone();

        dialogue::enter::<Update, teloxide::dispatching::dialogue::InMemStorage<()>, (), _>()
            .branch(
                Update::filter_message()
                    .filter_command::<crate::bot::commands::Command>()
                    .endpoint(move |bot, msg, cmd| {
                        let deps = deps.clone();
                        async move {
                            message::command_handler(bot, msg, cmd, deps)
                                .await
                                .map_err(Into::into)
                        }
                    }),
            )
            .branch(Update::filter_poll_answer().endpoint(move |answer| {
                let deps = deps_poll.clone();
                async move {
                    poll_answer::poll_answer_handler(answer, deps)
                        .await
                        .map_err(Into::into)
                }
            }))
    }
}

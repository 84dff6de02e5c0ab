use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatMemberStatus, MessageId, ParseMode, PollType, UserId};

use crate::quiz::error::QuizError;
use crate::quiz::questions::Question;

/// Identifiers returned by the platform for a freshly emitted prompt.
#[derive(Debug, Clone)]
pub struct EmittedPrompt {
    pub prompt_id: String,
    pub message_id: i32,
}

/// The chat-platform boundary the quiz core talks through.
///
/// The production implementation wraps the Telegram API; tests substitute
/// a recording double. Nothing behind this trait holds quiz state.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Opens an interactive multiple-choice prompt with a bounded answer
    /// window and returns its platform identifiers.
    async fn emit_prompt(
        &self,
        chat_id: i64,
        title: &str,
        question: &Question,
        open_period: Duration,
    ) -> Result<EmittedPrompt, QuizError>;

    /// Best-effort close of an open prompt; returns the revealed correct
    /// option when the platform reports one.
    async fn close_prompt(&self, chat_id: i64, message_id: i32)
        -> Result<Option<usize>, QuizError>;

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), QuizError>;

    /// Sends plain text; returns the message id.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i32, QuizError>;

    /// Sends MarkdownV2-formatted text; returns the message id.
    async fn send_markdown(&self, chat_id: i64, text: &str) -> Result<i32, QuizError>;

    /// Whether the user administers the chat. Delegated wholesale to the
    /// platform; the quiz core keeps no member state.
    async fn is_admin(&self, chat_id: i64, user_id: u64) -> Result<bool, QuizError>;
}

/// Telegram implementation over a shared [`Bot`].
#[derive(Clone)]
pub struct TelegramPlatform {
    bot: Bot,
}

impl TelegramPlatform {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn io_error(e: teloxide::RequestError) -> QuizError {
    QuizError::PlatformIo(e.to_string())
}

#[async_trait]
impl ChatPlatform for TelegramPlatform {
    async fn emit_prompt(
        &self,
        chat_id: i64,
        title: &str,
        question: &Question,
        open_period: Duration,
    ) -> Result<EmittedPrompt, QuizError> {
        let text = format!("{title}\n{}", question.text);
        let msg = self
            .bot
            .send_poll(ChatId(chat_id), text, question.options.clone())
            .type_(PollType::Quiz)
            .correct_option_id(question.correct_option as u8)
            .is_anonymous(false)
            .open_period(open_period.as_secs() as u16)
            .await
            .map_err(io_error)?;

        let poll = msg
            .poll()
            .ok_or_else(|| QuizError::PlatformIo("sent message carries no poll".to_string()))?;
        Ok(EmittedPrompt {
            prompt_id: poll.id.clone(),
            message_id: msg.id.0,
        })
    }

    async fn close_prompt(
        &self,
        chat_id: i64,
        message_id: i32,
    ) -> Result<Option<usize>, QuizError> {
        let poll = self
            .bot
            .stop_poll(ChatId(chat_id), MessageId(message_id))
            .await
            .map_err(io_error)?;
        Ok(poll.correct_option_id.map(|i| i as usize))
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), QuizError> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .map_err(io_error)?;
        Ok(())
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i32, QuizError> {
        let msg = self
            .bot
            .send_message(ChatId(chat_id), text)
            .await
            .map_err(io_error)?;
        Ok(msg.id.0)
    }

    async fn send_markdown(&self, chat_id: i64, text: &str) -> Result<i32, QuizError> {
        let msg = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::MarkdownV2)
            .await
            .map_err(io_error)?;
        Ok(msg.id.0)
    }

    async fn is_admin(&self, chat_id: i64, user_id: u64) -> Result<bool, QuizError> {
        // Private chats have no member roles; the single participant may do
        // anything.
        if chat_id >= 0 {
            return Ok(true);
        }
        let member = self
            .bot
            .get_chat_member(ChatId(chat_id), UserId(user_id))
            .await
            .map_err(io_error)?;
        Ok(matches!(
            member.status(),
            ChatMemberStatus::Administrator | ChatMemberStatus::Owner
        ))
    }
}

use thiserror::Error;

/// Errors produced by the quiz core.
///
/// Configuration and no-questions failures are reported back to the caller
/// and leave no session behind. A platform failure while a session is
/// running is fatal to that session only: it is finalized with the scores
/// collected so far.
#[derive(Debug, Error)]
pub enum QuizError {
    #[error("invalid quiz configuration: {0}")]
    Configuration(String),

    #[error("no questions available for the requested categories")]
    NoQuestionsAvailable,

    #[error("a quiz is already running in chat {0}")]
    ConcurrentSession(i64),

    #[error("no active quiz in chat {0}")]
    NoActiveSession(i64),

    #[error("chat platform request failed: {0}")]
    PlatformIo(String),
}

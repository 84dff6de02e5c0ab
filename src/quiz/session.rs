use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::quiz::questions::Question;

/// What started the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// Started by a user command.
    Manual,
    /// Started by the daily trigger.
    Daily,
}

/// How the session moves from one prompt to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceMode {
    /// One question only; finalize when its prompt closes.
    Single,
    /// Emit the next prompt as soon as the current one closes.
    Immediate,
    /// Wait a fixed delay after each prompt close.
    Interval(Duration),
}

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Announcing,
    Running,
    Finalizing,
    Terminated,
}

/// Why a prompt stopped accepting progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Answered,
    TimedOut,
    Stopped,
}

/// Prompt lifecycle. The `Open -> Closed` transition is taken exactly once
/// per prompt, under the owning session's mutex; it doubles as the
/// at-most-once progression flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptState {
    Open,
    Closed(CloseReason),
}

/// One emitted question instance with its bounded answer window.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub prompt_id: String,
    pub chat_id: i64,
    pub message_id: i32,
    pub question_index: usize,
    pub correct_option: usize,
    pub opened_at: DateTime<Utc>,
    /// Name of the timeout task bounding this prompt.
    pub timeout_task: String,
    pub state: PromptState,
}

impl Prompt {
    /// Attempts the close transition; returns false when already closed.
    pub fn close(&mut self, reason: CloseReason) -> bool {
        match self.state {
            PromptState::Open => {
                self.state = PromptState::Closed(reason);
                true
            }
            PromptState::Closed(_) => false,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, PromptState::Open)
    }
}

/// How long finalize waits before deleting messages of each tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupTier {
    /// Status chatter: announcements, start/stop notices.
    Short,
    /// Prompts, explanations, streak callouts.
    Medium,
    /// The final results summary.
    Long,
}

impl CleanupTier {
    pub fn delay(self) -> Duration {
        match self {
            CleanupTier::Short => Duration::from_secs(120),
            CleanupTier::Medium => Duration::from_secs(600),
            CleanupTier::Long => Duration::from_secs(3600),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CleanupTier::Short => "short",
            CleanupTier::Medium => "medium",
            CleanupTier::Long => "long",
        }
    }
}

/// A user's score within one session (distinct from the cumulative
/// tracker).
#[derive(Debug, Clone, Default)]
pub struct SessionScore {
    pub display_name: String,
    pub points: f64,
    pub correct: u32,
}

/// Full mutable state of one running quiz in one chat. Owned exclusively
/// by the manager behind a per-chat mutex; nothing else mutates it.
pub struct QuizSession {
    pub id: Uuid,
    pub chat_id: i64,
    pub kind: SessionKind,
    pub mode: AdvanceMode,
    pub questions: Vec<Question>,
    /// 0-based index of the next question to emit; only ever increases.
    pub current_index: usize,
    pub target_count: usize,
    pub open_period: Duration,
    pub state: SessionState,
    pub stopping: bool,
    pub initiator: Option<u64>,
    pub scores: HashMap<u64, SessionScore>,
    /// Prompts emitted by this session, keyed by platform prompt id.
    pub prompts: HashMap<String, Prompt>,
    pub created_at: DateTime<Utc>,
    /// Message ids collected for tiered deferred deletion.
    pub cleanup_short: Vec<i32>,
    pub cleanup_medium: Vec<i32>,
    pub cleanup_long: Vec<i32>,
    /// Set when a platform failure forced the session down.
    pub error: Option<String>,
}

impl QuizSession {
    pub fn new(
        chat_id: i64,
        kind: SessionKind,
        mode: AdvanceMode,
        questions: Vec<Question>,
        open_period: Duration,
        initiator: Option<u64>,
    ) -> Self {
        let target_count = questions.len();
        Self {
            id: Uuid::new_v4(),
            chat_id,
            kind,
            mode,
            questions,
            current_index: 0,
            target_count,
            open_period,
            state: SessionState::Announcing,
            stopping: false,
            initiator,
            scores: HashMap::new(),
            prompts: HashMap::new(),
            created_at: Utc::now(),
            cleanup_short: Vec::new(),
            cleanup_medium: Vec::new(),
            cleanup_long: Vec::new(),
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            SessionState::Finalizing | SessionState::Terminated
        )
    }

    /// Prompt ids still open on the platform side.
    pub fn open_prompt_ids(&self) -> Vec<String> {
        self.prompts
            .values()
            .filter(|p| p.is_open())
            .map(|p| p.prompt_id.clone())
            .collect()
    }

    pub fn remember_for_cleanup(&mut self, tier: CleanupTier, message_id: i32) {
        match tier {
            CleanupTier::Short => self.cleanup_short.push(message_id),
            CleanupTier::Medium => self.cleanup_medium.push(message_id),
            CleanupTier::Long => self.cleanup_long.push(message_id),
        }
    }

    /// Credits an answer towards this session's own standings.
    pub fn score_answer(&mut self, user_id: u64, display_name: &str, is_correct: bool) {
        let entry = self.scores.entry(user_id).or_default();
        entry.display_name = display_name.to_string();
        if is_correct {
            entry.points += 1.0;
            entry.correct += 1;
        } else {
            entry.points -= 0.5;
        }
    }

    /// Session standings, best first.
    pub fn ranking(&self) -> Vec<SessionScore> {
        let mut rows: Vec<SessionScore> = self.scores.values().cloned().collect();
        rows.sort_by(|a, b| {
            b.points
                .partial_cmp(&a.points)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.display_name.cmp(&b.display_name))
        });
        rows
    }

    /// Number of prompts that have been closed (answered or timed out).
    pub fn closed_prompt_count(&self) -> usize {
        self.prompts.len() - self.open_prompt_ids().len()
    }
}

use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::quiz::categories::CategorySelector;
use crate::quiz::error::QuizError;
use crate::quiz::platform::ChatPlatform;
use crate::quiz::questions::{Question, QuestionBank};
use crate::quiz::scores::{Achievement, AnswerOutcome, RatingRow, ScoreTracker};
use crate::quiz::session::{
    AdvanceMode, CleanupTier, CloseReason, Prompt, PromptState, QuizSession, SessionKind,
    SessionState,
};
use crate::quiz::settings::{CategoryMode, QuizConfig};
use crate::services::scheduler::TaskScheduler;
use crate::utils::markdown::{escape_markdown, format_points};

/// Slack between a prompt's answer window closing on the platform and our
/// timeout callback firing, so late answer updates are not raced.
const TIMEOUT_GRACE: Duration = Duration::from_secs(3);
/// Rows shown in rating listings.
const RATING_SIZE: usize = 10;

type SharedSession = Arc<Mutex<QuizSession>>;

/// The user who started a session, when one did.
#[derive(Debug, Clone)]
pub struct Initiator {
    pub user_id: u64,
    pub display_name: String,
}

/// Why a session is being finalized.
#[derive(Debug, Clone)]
pub enum FinalizeReason {
    Completed,
    Stopped,
    Error(String),
}

/// What a prompt-close decided should happen once the session lock is
/// released.
enum AfterClose {
    Nothing,
    Finalize(FinalizeReason),
}

/// Creates, advances and finalizes quiz sessions.
///
/// All mutation of a session's question index and prompt bookkeeping
/// happens while holding that chat's session mutex, so an answer callback
/// and a timeout callback racing for the same prompt cannot both advance.
/// Lock order is strictly map -> session; the scheduler, the prompt index
/// and the score tracker are leaf locks never held across each other.
pub struct QuizManager {
    platform: Arc<dyn ChatPlatform>,
    scheduler: Arc<TaskScheduler>,
    bank: Arc<QuestionBank>,
    selector: CategorySelector,
    scores: StdMutex<ScoreTracker>,
    sessions: Mutex<HashMap<i64, SharedSession>>,
    /// Routes a platform prompt id to the chat owning it.
    prompt_index: StdMutex<HashMap<String, i64>>,
    rng: StdMutex<StdRng>,
}

impl QuizManager {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        scheduler: Arc<TaskScheduler>,
        bank: Arc<QuestionBank>,
    ) -> Arc<Self> {
        Self::with_rng(platform, scheduler, bank, StdRng::from_os_rng())
    }

    /// Variant with a caller-supplied random source, for reproducible
    /// category selection in tests.
    pub fn with_rng(
        platform: Arc<dyn ChatPlatform>,
        scheduler: Arc<TaskScheduler>,
        bank: Arc<QuestionBank>,
        rng: StdRng,
    ) -> Arc<Self> {
        Arc::new(Self {
            platform,
            scheduler,
            bank,
            selector: CategorySelector::new(),
            scores: StdMutex::new(ScoreTracker::new()),
            sessions: Mutex::new(HashMap::new()),
            prompt_index: StdMutex::new(HashMap::new()),
            rng: StdMutex::new(rng),
        })
    }

    /// Starts a session in `chat_id`: resolves questions, optionally
    /// announces, then emits the first prompt.
    ///
    /// No session survives a failure here: configuration and empty-pool
    /// errors reject before registration, and a platform failure on the
    /// first prompt tears the freshly registered session down again.
    pub async fn create_and_start(
        self: &Arc<Self>,
        chat_id: i64,
        initiator: Option<Initiator>,
        config: QuizConfig,
        kind: SessionKind,
    ) -> Result<(), QuizError> {
        config.validate()?;

        let (questions, categories) = self.resolve_questions(chat_id, &config)?;
        if questions.len() < config.question_count {
            tracing::warn!(
                "Chat {}: only {} of {} requested questions available, running with what we have",
                chat_id,
                questions.len(),
                config.question_count
            );
        }

        let mode = if questions.len() == 1 {
            AdvanceMode::Single
        } else if let Some(interval) = config.interval {
            AdvanceMode::Interval(interval)
        } else {
            AdvanceMode::Immediate
        };

        let session = QuizSession::new(
            chat_id,
            kind,
            mode,
            questions,
            config.open_period,
            initiator.as_ref().map(|u| u.user_id),
        );
        let shared = Arc::new(Mutex::new(session));

        {
            let mut sessions = self.sessions.lock().await;
            if let Some(existing) = sessions.get(&chat_id) {
                let existing = existing.lock().await;
                if !existing.stopping && !existing.is_terminal() {
                    return Err(QuizError::ConcurrentSession(chat_id));
                }
            }
            sessions.insert(chat_id, Arc::clone(&shared));
        }
        self.selector.record_usage(&categories, chat_id);
        tracing::info!(
            "Chat {}: quiz registered ({:?}, {} questions, categories: {})",
            chat_id,
            kind,
            shared.lock().await.target_count,
            categories.join(", ")
        );

        if config.announce {
            let text = match &initiator {
                Some(user) => format!(
                    "🔔 {} is starting a quiz! First question in {} seconds.",
                    user.display_name,
                    config.announce_delay.as_secs()
                ),
                None => format!(
                    "🔔 Quiz starting in {} seconds!",
                    config.announce_delay.as_secs()
                ),
            };
            match self.platform.send_message(chat_id, &text).await {
                Ok(message_id) => {
                    shared
                        .lock()
                        .await
                        .remember_for_cleanup(CleanupTier::Short, message_id);
                }
                Err(e) => tracing::warn!("Chat {}: announce failed: {}", chat_id, e),
            }
            if config.announce_delay > Duration::ZERO {
                tokio::time::sleep(config.announce_delay).await;
            }
            let session = shared.lock().await;
            if session.stopping || session.is_terminal() {
                tracing::info!("Chat {}: quiz stopped during the announcement", chat_id);
                return Ok(());
            }
        }

        let mut session = shared.lock().await;
        session.state = SessionState::Running;
        let emitted = self.emit_next_prompt(&mut session).await;
        drop(session);

        if let Err(e) = emitted {
            tracing::error!("Chat {}: first prompt failed: {}", chat_id, e);
            self.finalize(chat_id, FinalizeReason::Error(e.to_string()))
                .await;
            return Err(e);
        }
        Ok(())
    }

    /// Handles one incoming answer: records the score (replay-protected),
    /// announces at most one freshly crossed milestone, then performs
    /// at-most-once progression for the answered prompt.
    pub async fn handle_poll_answer(
        self: &Arc<Self>,
        prompt_id: &str,
        user_id: u64,
        display_name: &str,
        option_ids: &[i32],
    ) {
        let chat_id = self.chat_for_prompt(prompt_id);
        let Some(chat_id) = chat_id else {
            tracing::debug!("Answer for unknown prompt {} ignored", prompt_id);
            return;
        };
        let Some(shared) = self.session_for(chat_id).await else {
            return;
        };
        let mut session = shared.lock().await;
        let Some(prompt) = session.prompts.get(prompt_id) else {
            return;
        };
        let question_index = prompt.question_index;
        let is_correct =
            option_ids.len() == 1 && option_ids[0] as usize == prompt.correct_option;
        let Some(question_id) = session.questions.get(question_index).map(|q| q.id.clone())
        else {
            return;
        };

        let outcome = {
            let mut scores = self.scores.lock().unwrap_or_else(|p| p.into_inner());
            scores.record_answer(
                chat_id,
                user_id,
                display_name,
                &question_id,
                is_correct,
                Utc::now().date_naive(),
            )
        };
        match outcome {
            AnswerOutcome::Recorded { achievement, .. } => {
                session.score_answer(user_id, display_name, is_correct);
                if let Some(achievement) = achievement {
                    self.announce_achievement(&mut session, chat_id, display_name, achievement)
                        .await;
                }
            }
            AnswerOutcome::AlreadyRecorded => {
                tracing::debug!(
                    "Chat {}: user {} already scored question {} today",
                    chat_id,
                    user_id,
                    question_id
                );
            }
        }

        let Some(prompt) = session.prompts.get_mut(prompt_id) else {
            return;
        };
        if !prompt.close(CloseReason::Answered) {
            // Progression already happened for this prompt; nothing to do.
            return;
        }
        let after = self.progress_after_close(&mut session).await;
        drop(session);
        self.apply_after_close(chat_id, after).await;
    }

    /// Bounds a prompt's answer window. Idempotent: when progression was
    /// already triggered by an answer this only does closing bookkeeping.
    pub async fn on_prompt_timeout(self: &Arc<Self>, prompt_id: String) {
        let Some(chat_id) = self.chat_for_prompt(&prompt_id) else {
            tracing::debug!("Timeout for unknown prompt {} ignored", prompt_id);
            return;
        };
        let Some(shared) = self.session_for(chat_id).await else {
            self.forget_prompt(&prompt_id);
            return;
        };
        let mut session = shared.lock().await;
        let Some(prompt) = session.prompts.get_mut(&prompt_id) else {
            // The session was replaced under this callback; drop the stale
            // route and bail out.
            self.forget_prompt(&prompt_id);
            return;
        };
        let question_index = prompt.question_index;
        let progressed_already = !prompt.close(CloseReason::TimedOut);
        self.forget_prompt(&prompt_id);

        if let Some(explanation) = session
            .questions
            .get(question_index)
            .and_then(|q| q.explanation.clone())
        {
            match self.platform.send_message(chat_id, &explanation).await {
                Ok(message_id) => {
                    session.remember_for_cleanup(CleanupTier::Medium, message_id);
                }
                Err(e) => tracing::warn!("Chat {}: explanation failed: {}", chat_id, e),
            }
        }

        if progressed_already {
            tracing::debug!(
                "Chat {}: prompt {} already progressed via an answer",
                chat_id,
                prompt_id
            );
            return;
        }
        let after = self.progress_after_close(&mut session).await;
        drop(session);
        self.apply_after_close(chat_id, after).await;
    }

    /// Interval-mode advance callback. Aborts as a no-op when the session
    /// it was scheduled for no longer exists.
    async fn on_advance_timer(self: &Arc<Self>, chat_id: i64, session_id: Uuid) {
        let Some(shared) = self.session_for(chat_id).await else {
            return;
        };
        let mut session = shared.lock().await;
        if session.id != session_id || session.stopping || session.is_terminal() {
            tracing::debug!("Chat {}: stale advance timer ignored", chat_id);
            return;
        }
        if session.current_index >= session.target_count {
            return;
        }
        if let Err(e) = self.emit_next_prompt(&mut session).await {
            tracing::error!("Chat {}: scheduled prompt failed: {}", chat_id, e);
            session.error = Some(e.to_string());
            drop(session);
            self.finalize(chat_id, FinalizeReason::Error(e.to_string()))
                .await;
        }
    }

    /// Stops the chat's running session and finalizes with partial results.
    pub async fn stop(self: &Arc<Self>, chat_id: i64) -> Result<(), QuizError> {
        let Some(shared) = self.session_for(chat_id).await else {
            return Err(QuizError::NoActiveSession(chat_id));
        };
        {
            let mut session = shared.lock().await;
            if session.is_terminal() {
                return Err(QuizError::NoActiveSession(chat_id));
            }
            session.stopping = true;
        }
        self.finalize(chat_id, FinalizeReason::Stopped).await;
        Ok(())
    }

    /// Finalizes the chat's session: cancels its scheduled tasks, closes
    /// open prompts, posts the results summary, schedules tiered cleanup
    /// and removes the session from the active map last. Idempotent; a
    /// no-op when the chat has no session.
    pub async fn finalize(self: &Arc<Self>, chat_id: i64, reason: FinalizeReason) {
        let Some(shared) = self.session_for(chat_id).await else {
            tracing::debug!("Chat {}: finalize with no active session", chat_id);
            return;
        };
        let mut session = shared.lock().await;
        if session.is_terminal() {
            return;
        }
        session.state = SessionState::Finalizing;

        let cancelled = self
            .scheduler
            .cancel_with_prefix(&format!("quiz:{chat_id}:"))
            .await;

        for prompt_id in session.open_prompt_ids() {
            if let Some(prompt) = session.prompts.get_mut(&prompt_id) {
                prompt.close(CloseReason::Stopped);
                let message_id = prompt.message_id;
                if let Err(e) = self.platform.close_prompt(chat_id, message_id).await {
                    tracing::debug!("Chat {}: could not close prompt {}: {}", chat_id, prompt_id, e);
                }
            }
        }
        {
            let mut index = self.prompt_index.lock().unwrap_or_else(|p| p.into_inner());
            for prompt_id in session.prompts.keys() {
                index.remove(prompt_id);
            }
        }

        self.send_summary(&mut session, chat_id, &reason).await;
        self.schedule_cleanup(&mut session, chat_id).await;

        session.state = SessionState::Terminated;
        tracing::info!(
            "Chat {}: quiz finalized ({:?}), {} scheduled tasks cancelled",
            chat_id,
            reason,
            cancelled
        );
        drop(session);

        let mut sessions = self.sessions.lock().await;
        if sessions
            .get(&chat_id)
            .is_some_and(|s| Arc::ptr_eq(s, &shared))
        {
            sessions.remove(&chat_id);
        }
    }

    /// Top scores accumulated in one chat across sessions.
    pub fn chat_rating(&self, chat_id: i64) -> Vec<RatingRow> {
        let scores = self.scores.lock().unwrap_or_else(|p| p.into_inner());
        scores.chat_rating(chat_id, RATING_SIZE)
    }

    /// Top scores accumulated across every chat.
    pub fn global_rating(&self) -> Vec<RatingRow> {
        let scores = self.scores.lock().unwrap_or_else(|p| p.into_inner());
        scores.global_rating(RATING_SIZE)
    }

    pub async fn active_session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Initiator and kind of the chat's live session, if any.
    pub async fn active_session_info(&self, chat_id: i64) -> Option<(Option<u64>, SessionKind)> {
        let shared = self.session_for(chat_id).await?;
        let session = shared.lock().await;
        if session.is_terminal() {
            None
        } else {
            Some((session.initiator, session.kind))
        }
    }

    pub async fn has_active_session(&self, chat_id: i64) -> bool {
        self.active_session_info(chat_id).await.is_some()
    }

    pub fn scheduler(&self) -> &Arc<TaskScheduler> {
        &self.scheduler
    }

    // ---- internals ----

    fn resolve_questions(
        &self,
        chat_id: i64,
        config: &QuizConfig,
    ) -> Result<(Vec<Question>, Vec<String>), QuizError> {
        let categories = match &config.category_mode {
            CategoryMode::Random { count } => {
                let candidates = self.bank.category_names();
                let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
                self.selector.pick(&candidates, *count, chat_id, &mut *rng)
            }
            CategoryMode::Specific(names) => names
                .iter()
                .filter(|name| self.bank.question_count(name) > 0)
                .cloned()
                .collect(),
        };
        if categories.is_empty() {
            return Err(QuizError::NoQuestionsAvailable);
        }

        let mut questions = self.bank.questions_in(&categories);
        if questions.is_empty() {
            return Err(QuizError::NoQuestionsAvailable);
        }
        {
            let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
            questions.shuffle(&mut *rng);
        }
        questions.truncate(config.question_count);
        Ok((questions, categories))
    }

    /// Emits the question at `current_index` and registers its prompt and
    /// timeout task. Caller holds the session lock.
    fn emit_next_prompt<'a>(
        self: &'a Arc<Self>,
        session: &'a mut QuizSession,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), QuizError>> + Send + 'a>>
    {
        Box::pin(async move {
        let chat_id = session.chat_id;
        let index = session.current_index;
        let Some(question) = session.questions.get(index).cloned() else {
            return Ok(());
        };
        let title = match (session.kind, session.mode) {
            (_, AdvanceMode::Single) => "❓ Question".to_string(),
            (SessionKind::Daily, _) => {
                format!("📅 Daily question {}/{}", index + 1, session.target_count)
            }
            (SessionKind::Manual, _) => {
                format!("❓ Question {}/{}", index + 1, session.target_count)
            }
        };

        let emitted = self
            .platform
            .emit_prompt(chat_id, &title, &question, session.open_period)
            .await?;
        let timeout_task = format!("quiz:{}:timeout:{}", chat_id, emitted.prompt_id);

        session.prompts.insert(
            emitted.prompt_id.clone(),
            Prompt {
                prompt_id: emitted.prompt_id.clone(),
                chat_id,
                message_id: emitted.message_id,
                question_index: index,
                correct_option: question.correct_option,
                opened_at: Utc::now(),
                timeout_task: timeout_task.clone(),
                state: PromptState::Open,
            },
        );
        session.remember_for_cleanup(CleanupTier::Medium, emitted.message_id);
        session.current_index += 1;
        {
            let mut prompt_index = self.prompt_index.lock().unwrap_or_else(|p| p.into_inner());
            prompt_index.insert(emitted.prompt_id.clone(), chat_id);
        }

        let manager = Arc::clone(self);
        let prompt_id = emitted.prompt_id.clone();
        self.scheduler
            .schedule_once(
                timeout_task,
                session.open_period + TIMEOUT_GRACE,
                Box::pin(async move {
                    manager.on_prompt_timeout(prompt_id).await;
                }) as std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>,
            )
            .await;

        tracing::info!(
            "Chat {}: prompt {} emitted for question {}/{}",
            chat_id,
            emitted.prompt_id,
            index + 1,
            session.target_count
        );
        Ok(())
        })
    }

    /// Advancement policy, evaluated exactly once per prompt close. Caller
    /// holds the session lock and has just won the close transition.
    async fn progress_after_close(self: &Arc<Self>, session: &mut QuizSession) -> AfterClose {
        if session.stopping || session.is_terminal() {
            return AfterClose::Nothing;
        }
        if session.current_index >= session.target_count {
            return AfterClose::Finalize(FinalizeReason::Completed);
        }
        match session.mode {
            AdvanceMode::Single => AfterClose::Finalize(FinalizeReason::Completed),
            AdvanceMode::Immediate => match self.emit_next_prompt(session).await {
                Ok(()) => AfterClose::Nothing,
                Err(e) => {
                    session.error = Some(e.to_string());
                    AfterClose::Finalize(FinalizeReason::Error(e.to_string()))
                }
            },
            AdvanceMode::Interval(delay) => {
                // A late answer still gets the full interval, measured from
                // the close that won the transition.
                let name = format!("quiz:{}:advance:{}", session.chat_id, session.current_index);
                let manager = Arc::clone(self);
                let chat_id = session.chat_id;
                let session_id = session.id;
                self.scheduler
                    .schedule_once(
                        name,
                        delay,
                        Box::pin(async move {
                            manager.on_advance_timer(chat_id, session_id).await;
                        }) as std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>,
                    )
                    .await;
                AfterClose::Nothing
            }
        }
    }

    async fn apply_after_close(self: &Arc<Self>, chat_id: i64, after: AfterClose) {
        if let AfterClose::Finalize(reason) = after {
            self.finalize(chat_id, reason).await;
        }
    }

    async fn announce_achievement(
        &self,
        session: &mut QuizSession,
        chat_id: i64,
        display_name: &str,
        achievement: Achievement,
    ) {
        let text = match achievement {
            Achievement::Score(points) => format!(
                "🏆 {} reached {} points\\!",
                escape_markdown(display_name),
                points
            ),
            Achievement::Streak(length) => format!(
                "🔥 {} is on a streak of {} correct answers\\!",
                escape_markdown(display_name),
                length
            ),
        };
        match self.platform.send_markdown(chat_id, &text).await {
            // Streak callouts are transient; score milestones stay in the
            // chat history.
            Ok(message_id) => {
                if matches!(achievement, Achievement::Streak(_)) {
                    session.remember_for_cleanup(CleanupTier::Medium, message_id);
                }
            }
            Err(e) => tracing::warn!("Chat {}: achievement message failed: {}", chat_id, e),
        }
    }

    async fn send_summary(
        &self,
        session: &mut QuizSession,
        chat_id: i64,
        reason: &FinalizeReason,
    ) {
        if session.prompts.is_empty() {
            // Never got a question out; a ranking would be noise.
            let text = match reason {
                FinalizeReason::Error(e) => format!("⚠️ Quiz aborted: {e}"),
                _ => "Quiz cancelled before the first question.".to_string(),
            };
            if let Err(e) = self.platform.send_message(chat_id, &text).await {
                tracing::error!("Chat {}: could not send abort notice: {}", chat_id, e);
            }
            return;
        }

        let text = Self::summary_text(session, reason);
        match self.platform.send_markdown(chat_id, &text).await {
            Ok(message_id) => session.remember_for_cleanup(CleanupTier::Long, message_id),
            Err(e) => tracing::error!("Chat {}: could not send results: {}", chat_id, e),
        }
    }

    fn summary_text(session: &QuizSession, reason: &FinalizeReason) -> String {
        let title = match reason {
            FinalizeReason::Completed => "🏁 Quiz finished\\!".to_string(),
            FinalizeReason::Stopped => "📝 Quiz stopped\\. Results so far:".to_string(),
            FinalizeReason::Error(_) => {
                "⚠️ Quiz ended with an error\\. Results so far:".to_string()
            }
        };
        let ranking = session.ranking();
        if ranking.is_empty() {
            return format!("{title}\n\nNobody answered this time\\.");
        }

        let closed = session.closed_prompt_count();
        let medals = ["🥇", "🥈", "🥉"];
        let mut lines = vec![title, String::new()];
        for (i, row) in ranking.iter().enumerate() {
            let rank = if i < medals.len() && row.points > 0.0 {
                medals[i].to_string()
            } else {
                format!("{}\\.", i + 1)
            };
            lines.push(format!(
                "{rank} {} \\- {} \\({} of {} questions\\)",
                escape_markdown(&row.display_name),
                escape_markdown(&format_points(row.points)),
                row.correct,
                closed
            ));
        }
        lines.join("\n")
    }

    /// Schedules the tiered deletions of a finished session's transient
    /// messages. Failures inside the tasks are logged and dropped.
    async fn schedule_cleanup(&self, session: &mut QuizSession, chat_id: i64) {
        let tiers = [
            (CleanupTier::Short, std::mem::take(&mut session.cleanup_short)),
            (
                CleanupTier::Medium,
                std::mem::take(&mut session.cleanup_medium),
            ),
            (CleanupTier::Long, std::mem::take(&mut session.cleanup_long)),
        ];
        for (tier, message_ids) in tiers {
            if message_ids.is_empty() {
                continue;
            }
            let name = format!("cleanup:{}:{}:{}", chat_id, session.id, tier.label());
            let platform = Arc::clone(&self.platform);
            self.scheduler
                .schedule_once(name, tier.delay(), async move {
                    for message_id in message_ids {
                        if let Err(e) = platform.delete_message(chat_id, message_id).await {
                            tracing::debug!(
                                "Chat {}: cleanup of message {} failed: {}",
                                chat_id,
                                message_id,
                                e
                            );
                        }
                    }
                })
                .await;
        }
    }

    async fn session_for(&self, chat_id: i64) -> Option<SharedSession> {
        self.sessions.lock().await.get(&chat_id).cloned()
    }

    fn chat_for_prompt(&self, prompt_id: &str) -> Option<i64> {
        let index = self.prompt_index.lock().unwrap_or_else(|p| p.into_inner());
        index.get(prompt_id).copied()
    }

    fn forget_prompt(&self, prompt_id: &str) {
        let mut index = self.prompt_index.lock().unwrap_or_else(|p| p.into_inner());
        index.remove(prompt_id);
    }
}

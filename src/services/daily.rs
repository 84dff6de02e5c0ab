use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::quiz::error::QuizError;
use crate::quiz::manager::QuizManager;
use crate::quiz::platform::ChatPlatform;
use crate::quiz::session::SessionKind;
use crate::quiz::settings::ChatSettingsStore;

type ServiceResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Fires the daily quiz in every chat that enabled it.
///
/// One cron job per enabled chat; rescheduling a chat removes its previous
/// job first, so a settings change can never leave two triggers behind.
/// The job re-reads the chat's daily settings at fire time and skips when
/// they were disabled in the meantime.
pub struct DailyQuizService {
    scheduler: Mutex<JobScheduler>,
    manager: Arc<QuizManager>,
    platform: Arc<dyn ChatPlatform>,
    settings: Arc<ChatSettingsStore>,
    jobs: Mutex<HashMap<i64, Uuid>>,
}

impl DailyQuizService {
    pub async fn new(
        manager: Arc<QuizManager>,
        platform: Arc<dyn ChatPlatform>,
        settings: Arc<ChatSettingsStore>,
    ) -> ServiceResult<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            manager,
            platform,
            settings,
            jobs: Mutex::new(HashMap::new()),
        })
    }

    /// Schedules every chat with the daily quiz enabled and starts the
    /// underlying cron scheduler.
    pub async fn start(&self) -> ServiceResult<()> {
        let chats = self.settings.chats_with_daily_enabled();
        for chat_id in &chats {
            self.schedule_for_chat(*chat_id).await?;
        }
        self.scheduler.lock().await.start().await?;
        tracing::info!("Daily quiz service started ({} chats scheduled)", chats.len());
        Ok(())
    }

    /// (Re)schedules one chat from its current daily settings. Removes any
    /// previous job for the chat; when the daily quiz is disabled, removal
    /// is all that happens.
    pub async fn schedule_for_chat(&self, chat_id: i64) -> ServiceResult<()> {
        if let Some(old_job) = self.jobs.lock().await.remove(&chat_id) {
            self.scheduler.lock().await.remove(&old_job).await?;
            tracing::debug!("Removed previous daily quiz job for chat {}", chat_id);
        }

        let daily = self.settings.daily(chat_id);
        if !daily.enabled {
            tracing::info!("Daily quiz disabled for chat {}; nothing scheduled", chat_id);
            return Ok(());
        }

        let cron = format!("0 {} {} * * *", daily.minute, daily.hour);
        let manager = Arc::clone(&self.manager);
        let platform = Arc::clone(&self.platform);
        let settings = Arc::clone(&self.settings);

        let job = Job::new_async(cron.as_str(), move |_uuid, _l| {
            let manager = Arc::clone(&manager);
            let platform = Arc::clone(&platform);
            let settings = Arc::clone(&settings);
            Box::pin(async move {
                run_daily_quiz(manager, platform, settings, chat_id).await;
            })
        })?;

        let job_id = self.scheduler.lock().await.add(job).await?;
        self.jobs.lock().await.insert(chat_id, job_id);
        tracing::info!(
            "Daily quiz for chat {} scheduled at {:02}:{:02} UTC",
            chat_id,
            daily.hour,
            daily.minute
        );
        Ok(())
    }

    pub async fn stop(&self) -> ServiceResult<()> {
        self.scheduler.lock().await.shutdown().await?;
        Ok(())
    }
}

async fn run_daily_quiz(
    manager: Arc<QuizManager>,
    platform: Arc<dyn ChatPlatform>,
    settings: Arc<ChatSettingsStore>,
    chat_id: i64,
) {
    let daily = settings.daily(chat_id);
    if !daily.enabled {
        tracing::info!("Daily quiz for chat {} fired but is disabled; skipping", chat_id);
        return;
    }

    let config = settings.daily_config(chat_id);
    match manager
        .create_and_start(chat_id, None, config, SessionKind::Daily)
        .await
    {
        Ok(()) => tracing::info!("Daily quiz started in chat {}", chat_id),
        Err(QuizError::ConcurrentSession(_)) => {
            tracing::warn!(
                "Daily quiz for chat {} skipped: another quiz is running",
                chat_id
            );
            if let Err(e) = platform
                .send_message(chat_id, "The daily quiz was skipped: a quiz is already running.")
                .await
            {
                tracing::debug!("Chat {}: skip notice failed: {}", chat_id, e);
            }
        }
        Err(e) => tracing::error!("Daily quiz for chat {} failed to start: {}", chat_id, e),
    }
}

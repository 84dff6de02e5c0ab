use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::quiz::error::QuizError;
use crate::utils::validation::{
    validate_announce_delay, validate_interval, validate_open_period, validate_question_count,
};

/// How the question pool for a session is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryMode {
    /// Draw `count` categories via the weighted selector.
    Random { count: usize },
    /// Use exactly the named categories.
    Specific(Vec<String>),
}

/// Fully resolved parameters for one quiz run; the shape handed to
/// `QuizManager::create_and_start`.
#[derive(Debug, Clone)]
pub struct QuizConfig {
    pub question_count: usize,
    pub open_period: Duration,
    /// Delay between questions; `None` advances on prompt close.
    pub interval: Option<Duration>,
    pub category_mode: CategoryMode,
    pub announce: bool,
    pub announce_delay: Duration,
}

impl QuizConfig {
    pub fn validate(&self) -> Result<(), QuizError> {
        validate_question_count(self.question_count)?;
        validate_open_period(self.open_period)?;
        if let Some(interval) = self.interval {
            validate_interval(interval)?;
        }
        if self.announce {
            validate_announce_delay(self.announce_delay)?;
        }
        if let CategoryMode::Specific(names) = &self.category_mode {
            if names.is_empty() {
                return Err(QuizError::Configuration(
                    "at least one category must be named".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Daily-quiz trigger settings for one chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySettings {
    pub enabled: bool,
    pub hour: u32,
    pub minute: u32,
    pub question_count: usize,
    pub open_period_secs: u64,
    pub interval_secs: u64,
    /// Fixed category list; `None` selects categories randomly.
    pub categories: Option<Vec<String>>,
}

impl Default for DailySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            hour: 9,
            minute: 0,
            question_count: 10,
            open_period_secs: 300,
            interval_secs: 60,
            categories: None,
        }
    }
}

/// Per-chat defaults merged over global defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    pub question_count: usize,
    pub open_period_secs: u64,
    pub announce: bool,
    pub announce_delay_secs: u64,
    /// Categories drawn per session when the category mode is random.
    pub category_count: usize,
    pub daily: DailySettings,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            question_count: 5,
            open_period_secs: 60,
            announce: false,
            announce_delay_secs: 10,
            category_count: 3,
            daily: DailySettings::default(),
        }
    }
}

/// In-memory settings repository.
///
/// Persistence of settings lives outside this subsystem; the admin tooling
/// that would write through to storage consumes this same store.
#[derive(Default)]
pub struct ChatSettingsStore {
    inner: Mutex<HashMap<i64, ChatSettings>>,
}

impl ChatSettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective settings for a chat: stored overrides or the defaults.
    pub fn effective(&self, chat_id: i64) -> ChatSettings {
        let map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.get(&chat_id).cloned().unwrap_or_default()
    }

    /// Resolved config for a manually started quiz in this chat.
    pub fn quiz_config(&self, chat_id: i64, announce: bool) -> QuizConfig {
        let settings = self.effective(chat_id);
        QuizConfig {
            question_count: settings.question_count,
            open_period: Duration::from_secs(settings.open_period_secs),
            interval: None,
            category_mode: CategoryMode::Random {
                count: settings.category_count,
            },
            announce,
            announce_delay: Duration::from_secs(settings.announce_delay_secs),
        }
    }

    /// Resolved config for the daily quiz in this chat.
    pub fn daily_config(&self, chat_id: i64) -> QuizConfig {
        let settings = self.effective(chat_id);
        let category_mode = match settings.daily.categories {
            Some(names) if !names.is_empty() => CategoryMode::Specific(names),
            _ => CategoryMode::Random {
                count: settings.category_count,
            },
        };
        QuizConfig {
            question_count: settings.daily.question_count,
            open_period: Duration::from_secs(settings.daily.open_period_secs),
            interval: Some(Duration::from_secs(settings.daily.interval_secs)),
            category_mode,
            announce: false,
            announce_delay: Duration::ZERO,
        }
    }

    pub fn daily(&self, chat_id: i64) -> DailySettings {
        self.effective(chat_id).daily
    }

    /// Applies a mutation to a chat's settings, creating the entry from
    /// defaults when absent.
    pub fn update<F>(&self, chat_id: i64, mutate: F)
    where
        F: FnOnce(&mut ChatSettings),
    {
        let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        mutate(map.entry(chat_id).or_default());
    }

    /// Chats whose daily quiz is currently enabled.
    pub fn chats_with_daily_enabled(&self) -> Vec<i64> {
        let map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.iter()
            .filter(|(_, s)| s.daily.enabled)
            .map(|(&chat, _)| chat)
            .collect()
    }
}

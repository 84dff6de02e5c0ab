use axum::{extract::State, response::Json, routing::get, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::quiz::manager::QuizManager;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub quiz: QuizHealth,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuizHealth {
    pub active_sessions: usize,
    pub pending_tasks: usize,
}

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<QuizManager>,
    pub start_time: DateTime<Utc>,
}

pub struct HealthService {
    pub router: Router,
}

impl HealthService {
    pub fn new(manager: Arc<QuizManager>) -> Self {
        let state = AppState {
            manager,
            start_time: Utc::now(),
        };

        let router = Router::new()
            .route("/health", get(health_check))
            .route("/health/ready", get(readiness_check))
            .route("/health/live", get(liveness_check))
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
            .with_state(state);

        Self { router }
    }
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let active_sessions = state.manager.active_session_count().await;
    let pending_tasks = state.manager.scheduler().pending_count().await;
    let uptime = Utc::now()
        .signed_duration_since(state.start_time)
        .num_seconds()
        .max(0) as u64;

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        quiz: QuizHealth {
            active_sessions,
            pending_tasks,
        },
        uptime_seconds: uptime,
    })
}

async fn readiness_check() -> Json<&'static str> {
    Json("ready")
}

async fn liveness_check() -> Json<&'static str> {
    // Simple liveness check - if this endpoint responds, the service is alive
    Json("alive")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::error::QuizError;
    use crate::quiz::platform::{ChatPlatform, EmittedPrompt};
    use crate::quiz::questions::{Question, QuestionBank};
    use crate::services::scheduler::TaskScheduler;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use std::collections::HashMap;
    use std::time::Duration;

    struct NullPlatform;

    #[async_trait]
    impl ChatPlatform for NullPlatform {
        async fn emit_prompt(
            &self,
            _chat_id: i64,
            _title: &str,
            _question: &Question,
            _open_period: Duration,
        ) -> Result<EmittedPrompt, QuizError> {
            Err(QuizError::PlatformIo("not wired in tests".to_string()))
        }

        async fn close_prompt(
            &self,
            _chat_id: i64,
            _message_id: i32,
        ) -> Result<Option<usize>, QuizError> {
            Ok(None)
        }

        async fn delete_message(&self, _chat_id: i64, _message_id: i32) -> Result<(), QuizError> {
            Ok(())
        }

        async fn send_message(&self, _chat_id: i64, _text: &str) -> Result<i32, QuizError> {
            Ok(1)
        }

        async fn send_markdown(&self, _chat_id: i64, _text: &str) -> Result<i32, QuizError> {
            Ok(1)
        }

        async fn is_admin(&self, _chat_id: i64, _user_id: u64) -> Result<bool, QuizError> {
            Ok(false)
        }
    }

    fn test_manager() -> Arc<QuizManager> {
        let mut bank = HashMap::new();
        bank.insert(
            "general".to_string(),
            vec![Question {
                id: "q1".to_string(),
                text: "Two plus two?".to_string(),
                options: vec!["3".to_string(), "4".to_string()],
                correct_option: 1,
                explanation: None,
                category: None,
            }],
        );
        QuizManager::new(
            Arc::new(NullPlatform),
            Arc::new(TaskScheduler::new()),
            Arc::new(QuestionBank::new(bank)),
        )
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let service = HealthService::new(test_manager());
        let server = TestServer::new(service.router).expect("Failed to create test server");

        let response = server.get("/health").await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let health: HealthResponse = response.json();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.quiz.active_sessions, 0);
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_liveness_endpoint() {
        let service = HealthService::new(test_manager());
        let server = TestServer::new(service.router).expect("Failed to create test server");

        let response = server.get("/health/live").await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let alive: String = response.json();
        assert_eq!(alive, "alive");
    }
}

//! # Trivia Quiz Bot Main Entry Point
//!
//! This is the main entry point for the trivia quiz bot application.
//! It initializes logging, loads configuration and the question bank,
//! starts the daily quiz service, and runs the Telegram bot alongside the
//! HTTP health server.

use anyhow::Result;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod bot;
mod config;
mod quiz;
mod services;
mod utils;

use crate::bot::handlers::{BotDeps, BotHandler};
use crate::config::Config;
use crate::quiz::manager::QuizManager;
use crate::quiz::platform::{ChatPlatform, TelegramPlatform};
use crate::quiz::questions::QuestionBank;
use crate::quiz::settings::ChatSettingsStore;
use crate::services::daily::DailyQuizService;
use crate::services::health::HealthService;
use crate::services::scheduler::TaskScheduler;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trivia_quiz_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    info!("Starting Trivia Quiz Bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded - Questions: {}, HTTP Port: {}",
        config.questions_file, config.http_port
    );

    // Load the question bank
    let bank = Arc::new(QuestionBank::load_from_file(&config.questions_file)?);

    // Initialize bot and the quiz core
    info!("Initializing Telegram bot...");
    let bot = Bot::new(&config.telegram_bot_token);
    let platform: Arc<dyn ChatPlatform> = Arc::new(TelegramPlatform::new(bot.clone()));
    let scheduler = Arc::new(TaskScheduler::new());
    let manager = QuizManager::new(Arc::clone(&platform), Arc::clone(&scheduler), bank);
    let settings = Arc::new(ChatSettingsStore::new());
    info!("Quiz core initialized successfully");

    // Initialize and start the daily quiz service
    info!("Initializing daily quiz service...");
    let daily = match DailyQuizService::new(
        Arc::clone(&manager),
        Arc::clone(&platform),
        Arc::clone(&settings),
    )
    .await
    {
        Ok(service) => Arc::new(service),
        Err(e) => {
            tracing::error!("Failed to create daily quiz service: {}", e);
            return Err(anyhow::anyhow!("Failed to create daily quiz service: {}", e));
        }
    };
    if let Err(e) = daily.start().await {
        tracing::error!("Failed to start daily quiz service: {}", e);
    } else {
        info!("Daily quiz service started successfully");
    }

    // Initialize health service
    let health_service = HealthService::new(Arc::clone(&manager));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to port {}: {}", config.http_port, e))?;

    info!("Health check server starting on port {}", config.http_port);

    let handler = BotHandler::new(BotDeps {
        manager: Arc::clone(&manager),
        platform,
        settings,
        daily: Arc::clone(&daily),
    });

    // Run both the bot and health server concurrently
    let bot_task = tokio::spawn(async move {
        let storage: std::sync::Arc<InMemStorage<()>> = InMemStorage::new().into();
        Dispatcher::builder(bot, handler.schema())
            .dependencies(dptree::deps![storage])
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    });

    let health_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health_service.router).await {
            tracing::error!("Health server error: {}", e);
        }
    });

    // Wait for either task to complete (which would indicate shutdown)
    tokio::select! {
        result1 = bot_task => {
            if let Err(e) = result1 {
                tracing::error!("Bot task error: {}", e);
            }
        }
        result2 = health_task => {
            if let Err(e) = result2 {
                tracing::error!("Health task error: {}", e);
            }
        }
    }

    // Stop background services on shutdown
    if let Err(e) = daily.stop().await {
        tracing::warn!("Error stopping daily quiz service: {}", e);
    }
    scheduler.shutdown().await;

    info!("Application stopped");
    Ok(())
}

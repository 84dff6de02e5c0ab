//! # Trivia Quiz Bot
//!
//! A Telegram bot that runs timed multiple-choice trivia sessions in group
//! chats.
//!
//! ## Features
//! - Multi-question sessions with immediate or fixed-interval advancement
//! - Weighted random category selection favoring rarely-used categories
//! - Cumulative per-chat and global scores with streaks and milestones
//! - A scheduled daily quiz per chat
//! - Tiered cleanup of transient messages after a session ends

/// Bot command handlers and update dispatching
pub mod bot;
/// Configuration management and environment variables
pub mod config;
/// The quiz core: sessions, scoring, categories, the platform boundary
pub mod quiz;
/// Background services: task scheduling, the daily trigger, health checks
pub mod services;
/// Utility functions for formatting and validation
pub mod utils;

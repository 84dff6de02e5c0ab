#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use trivia_quiz_bot::quiz::error::QuizError;
use trivia_quiz_bot::quiz::platform::{ChatPlatform, EmittedPrompt};
use trivia_quiz_bot::quiz::questions::{Question, QuestionBank};

/// One prompt emission recorded by the mock platform.
#[derive(Debug, Clone)]
pub struct EmittedRecord {
    pub chat_id: i64,
    pub prompt_id: String,
    pub message_id: i32,
    pub title: String,
    pub question_id: String,
    pub correct_option: usize,
}

#[derive(Default)]
struct MockState {
    next_message_id: i32,
    next_prompt_seq: u32,
    emitted: Vec<EmittedRecord>,
    messages: Vec<(i64, String)>,
    deleted: Vec<(i64, i32)>,
    closed: Vec<(i64, i32)>,
    fail_emits: bool,
}

/// Recording in-memory stand-in for the chat platform.
pub struct MockPlatform {
    state: Mutex<MockState>,
}

impl MockPlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockState::default()),
        })
    }

    /// Makes every subsequent prompt emission fail.
    pub fn fail_emits(&self, fail: bool) {
        self.state.lock().unwrap().fail_emits = fail;
    }

    pub fn emitted(&self) -> Vec<EmittedRecord> {
        self.state.lock().unwrap().emitted.clone()
    }

    pub fn emitted_count(&self) -> usize {
        self.state.lock().unwrap().emitted.len()
    }

    pub fn messages(&self) -> Vec<(i64, String)> {
        self.state.lock().unwrap().messages.clone()
    }

    pub fn closed_prompts(&self) -> Vec<(i64, i32)> {
        self.state.lock().unwrap().closed.clone()
    }

    pub fn deleted_messages(&self) -> Vec<(i64, i32)> {
        self.state.lock().unwrap().deleted.clone()
    }

    /// True when some sent message contains `needle`.
    pub fn message_sent_containing(&self, needle: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .messages
            .iter()
            .any(|(_, text)| text.contains(needle))
    }
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    async fn emit_prompt(
        &self,
        chat_id: i64,
        title: &str,
        question: &Question,
        _open_period: Duration,
    ) -> Result<EmittedPrompt, QuizError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_emits {
            return Err(QuizError::PlatformIo("mock emit failure".to_string()));
        }
        state.next_prompt_seq += 1;
        state.next_message_id += 1;
        let prompt_id = format!("poll-{}", state.next_prompt_seq);
        let message_id = state.next_message_id;
        state.emitted.push(EmittedRecord {
            chat_id,
            prompt_id: prompt_id.clone(),
            message_id,
            title: title.to_string(),
            question_id: question.id.clone(),
            correct_option: question.correct_option,
        });
        Ok(EmittedPrompt {
            prompt_id,
            message_id,
        })
    }

    async fn close_prompt(
        &self,
        chat_id: i64,
        message_id: i32,
    ) -> Result<Option<usize>, QuizError> {
        self.state.lock().unwrap().closed.push((chat_id, message_id));
        Ok(None)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), QuizError> {
        self.state.lock().unwrap().deleted.push((chat_id, message_id));
        Ok(())
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i32, QuizError> {
        let mut state = self.state.lock().unwrap();
        state.next_message_id += 1;
        let id = state.next_message_id;
        state.messages.push((chat_id, text.to_string()));
        Ok(id)
    }

    async fn send_markdown(&self, chat_id: i64, text: &str) -> Result<i32, QuizError> {
        self.send_message(chat_id, text).await
    }

    async fn is_admin(&self, _chat_id: i64, _user_id: u64) -> Result<bool, QuizError> {
        Ok(false)
    }
}

/// A bank with one `general` category of `n` questions; option 0 is always
/// correct.
pub fn single_category_bank(n: usize) -> Arc<QuestionBank> {
    let questions: Vec<Question> = (0..n)
        .map(|i| Question {
            id: format!("q{i}"),
            text: format!("Question number {i}?"),
            options: vec![
                "right".to_string(),
                "wrong".to_string(),
                "also wrong".to_string(),
            ],
            correct_option: 0,
            explanation: None,
            category: None,
        })
        .collect();
    let mut map = HashMap::new();
    map.insert("general".to_string(), questions);
    Arc::new(QuestionBank::new(map))
}

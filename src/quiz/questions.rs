use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// One multiple-choice question as stored in the bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub options: Vec<String>,
    pub correct_option: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// Category the question was drawn from; filled in when a session
    /// resolves its question list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Question {
    /// Telegram rejects polls with fewer than two options or an
    /// out-of-range correct index; such entries are dropped at load time.
    fn is_well_formed(&self) -> bool {
        self.options.len() >= 2 && self.correct_option < self.options.len()
    }
}

/// In-memory question bank, keyed by category name.
///
/// The bank is read once at startup and never mutated afterwards, so it is
/// shared as a plain `Arc<QuestionBank>` without locking.
pub struct QuestionBank {
    by_category: HashMap<String, Vec<Question>>,
}

impl QuestionBank {
    pub fn new(by_category: HashMap<String, Vec<Question>>) -> Self {
        let by_category = by_category
            .into_iter()
            .map(|(cat, questions)| {
                let kept: Vec<Question> = questions
                    .into_iter()
                    .filter(Question::is_well_formed)
                    .collect();
                (cat, kept)
            })
            .filter(|(_, questions)| !questions.is_empty())
            .collect();
        Self { by_category }
    }

    /// Loads the bank from a JSON file mapping category names to question
    /// arrays.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read question bank {}", path.display()))?;
        let by_category: HashMap<String, Vec<Question>> = serde_json::from_str(&raw)
            .with_context(|| format!("invalid question bank JSON in {}", path.display()))?;
        let bank = Self::new(by_category);
        if bank.by_category.is_empty() {
            return Err(anyhow!(
                "question bank {} contains no usable questions",
                path.display()
            ));
        }
        tracing::info!(
            "Loaded question bank: {} categories, {} questions",
            bank.by_category.len(),
            bank.total_questions()
        );
        Ok(bank)
    }

    /// Category names that actually hold at least one question.
    pub fn category_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_category.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn question_count(&self, category: &str) -> usize {
        self.by_category.get(category).map_or(0, Vec::len)
    }

    pub fn total_questions(&self) -> usize {
        self.by_category.values().map(Vec::len).sum()
    }

    /// All questions of the given categories, each stamped with the
    /// category it was drawn from.
    pub fn questions_in(&self, categories: &[String]) -> Vec<Question> {
        let mut out = Vec::new();
        for cat in categories {
            if let Some(questions) = self.by_category.get(cat) {
                for q in questions {
                    let mut q = q.clone();
                    q.category = Some(cat.clone());
                    out.push(q);
                }
            }
        }
        out
    }
}

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

/// Points awarded for a correct answer and deducted for a wrong one.
const CORRECT_POINTS: f64 = 1.0;
const INCORRECT_POINTS: f64 = -0.5;

/// Cumulative-score milestones announced once per user per chat.
const SCORE_THRESHOLDS: [i64; 5] = [5, 10, 25, 50, 100];
/// Consecutive-correct-streak milestones.
const STREAK_THRESHOLDS: [u32; 3] = [3, 5, 10];

/// A milestone crossed by an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Achievement {
    /// Cumulative score reached the given value.
    Score(i64),
    /// Streak of consecutive correct answers reached the given length.
    Streak(u32),
}

/// Result of recording one answer.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerOutcome {
    Recorded {
        delta: f64,
        score: f64,
        streak: u32,
        achievement: Option<Achievement>,
    },
    /// The user already answered this question today; nothing changed.
    AlreadyRecorded,
}

/// Per (chat, user) cumulative record.
#[derive(Debug, Clone, Default)]
pub struct ScoreEntry {
    pub display_name: String,
    pub score: f64,
    pub correct_count: u32,
    pub streak: u32,
    scored_keys: HashSet<(String, NaiveDate)>,
    achieved: HashSet<Achievement>,
}

/// One row of a rating listing.
#[derive(Debug, Clone)]
pub struct RatingRow {
    pub user_id: u64,
    pub display_name: String,
    pub score: f64,
}

/// Tracks cumulative scores, correct counts and answer streaks per user.
///
/// Replay protection: only the first answer per (question, calendar day)
/// per user counts; repeats report [`AnswerOutcome::AlreadyRecorded`] and
/// leave score and streak untouched.
#[derive(Default)]
pub struct ScoreTracker {
    chats: HashMap<i64, HashMap<u64, ScoreEntry>>,
}

impl ScoreTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an answer and reports the single highest newly-crossed
    /// milestone, if any. Score milestones win over streak milestones when
    /// both are crossed by the same answer.
    pub fn record_answer(
        &mut self,
        chat_id: i64,
        user_id: u64,
        display_name: &str,
        question_id: &str,
        is_correct: bool,
        day: NaiveDate,
    ) -> AnswerOutcome {
        let entry = self
            .chats
            .entry(chat_id)
            .or_default()
            .entry(user_id)
            .or_default();
        entry.display_name = display_name.to_string();

        let key = (question_id.to_string(), day);
        if entry.scored_keys.contains(&key) {
            return AnswerOutcome::AlreadyRecorded;
        }
        entry.scored_keys.insert(key);

        let previous_score = entry.score;
        let delta = if is_correct {
            entry.correct_count += 1;
            entry.streak += 1;
            CORRECT_POINTS
        } else {
            entry.streak = 0;
            INCORRECT_POINTS
        };
        entry.score += delta;

        let achievement = Self::crossed_achievement(entry, previous_score);
        AnswerOutcome::Recorded {
            delta,
            score: entry.score,
            streak: entry.streak,
            achievement,
        }
    }

    /// Top `n` users of one chat, best first; ties break on name.
    pub fn chat_rating(&self, chat_id: i64, n: usize) -> Vec<RatingRow> {
        let Some(users) = self.chats.get(&chat_id) else {
            return Vec::new();
        };
        let mut rows: Vec<RatingRow> = users
            .iter()
            .map(|(&user_id, entry)| RatingRow {
                user_id,
                display_name: entry.display_name.clone(),
                score: entry.score,
            })
            .collect();
        Self::sort_rows(&mut rows);
        rows.truncate(n);
        rows
    }

    /// Top `n` users summed across every chat.
    pub fn global_rating(&self, n: usize) -> Vec<RatingRow> {
        let mut totals: HashMap<u64, RatingRow> = HashMap::new();
        for users in self.chats.values() {
            for (&user_id, entry) in users {
                let row = totals.entry(user_id).or_insert_with(|| RatingRow {
                    user_id,
                    display_name: entry.display_name.clone(),
                    score: 0.0,
                });
                row.score += entry.score;
                if entry.display_name.len() > row.display_name.len() {
                    row.display_name = entry.display_name.clone();
                }
            }
        }
        let mut rows: Vec<RatingRow> = totals.into_values().collect();
        Self::sort_rows(&mut rows);
        rows.truncate(n);
        rows
    }

    pub fn entry(&self, chat_id: i64, user_id: u64) -> Option<&ScoreEntry> {
        self.chats.get(&chat_id)?.get(&user_id)
    }

    fn sort_rows(rows: &mut [RatingRow]) {
        rows.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.display_name.cmp(&b.display_name))
        });
    }

    /// Marks every milestone crossed by this answer as achieved and returns
    /// the most significant one for announcing.
    fn crossed_achievement(entry: &mut ScoreEntry, previous_score: f64) -> Option<Achievement> {
        let mut crossed_score: Option<i64> = None;
        for &threshold in SCORE_THRESHOLDS.iter() {
            let t = threshold as f64;
            if previous_score < t
                && entry.score >= t
                && entry.achieved.insert(Achievement::Score(threshold))
            {
                crossed_score = Some(threshold);
            }
        }

        let mut crossed_streak: Option<u32> = None;
        for &threshold in STREAK_THRESHOLDS.iter() {
            if entry.streak >= threshold && entry.achieved.insert(Achievement::Streak(threshold)) {
                crossed_streak = Some(threshold);
            }
        }

        crossed_score
            .map(Achievement::Score)
            .or(crossed_streak.map(Achievement::Streak))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 4).unwrap()
    }

    #[test]
    fn correct_and_incorrect_deltas() {
        let mut tracker = ScoreTracker::new();
        let out = tracker.record_answer(1, 10, "Ann", "q1", true, day());
        assert!(matches!(
            out,
            AnswerOutcome::Recorded { delta, score, streak: 1, .. }
                if delta == 1.0 && score == 1.0
        ));

        let out = tracker.record_answer(1, 10, "Ann", "q2", false, day());
        assert!(matches!(
            out,
            AnswerOutcome::Recorded { delta, score, streak: 0, .. }
                if delta == -0.5 && score == 0.5
        ));
    }

    #[test]
    fn same_question_next_day_scores_again() {
        let mut tracker = ScoreTracker::new();
        tracker.record_answer(1, 10, "Ann", "q1", true, day());
        let next_day = day().succ_opt().unwrap();
        let out = tracker.record_answer(1, 10, "Ann", "q1", true, next_day);
        assert!(matches!(out, AnswerOutcome::Recorded { score, .. } if score == 2.0));
    }

    #[test]
    fn score_milestone_wins_over_streak_milestone() {
        let mut tracker = ScoreTracker::new();
        // Four correct answers: the fifth crosses score 5 and streak 5 at once.
        for i in 0..4 {
            tracker.record_answer(1, 10, "Ann", &format!("q{i}"), true, day());
        }
        let out = tracker.record_answer(1, 10, "Ann", "q4", true, day());
        assert!(matches!(
            out,
            AnswerOutcome::Recorded {
                achievement: Some(Achievement::Score(5)),
                ..
            }
        ));
    }
}

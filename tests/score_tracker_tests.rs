#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use trivia_quiz_bot::quiz::scores::{Achievement, AnswerOutcome, ScoreTracker};

const CHAT: i64 = -100500;
const USER: u64 = 77;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 4).unwrap()
}

fn record(
    tracker: &mut ScoreTracker,
    question: &str,
    correct: bool,
) -> AnswerOutcome {
    tracker.record_answer(CHAT, USER, "Ann", question, correct, day())
}

#[test]
fn first_answer_per_question_and_day_counts_once() {
    let mut tracker = ScoreTracker::new();

    let first = record(&mut tracker, "q1", true);
    assert!(matches!(
        first,
        AnswerOutcome::Recorded { score, streak: 1, .. } if score == 1.0
    ));

    let replay = record(&mut tracker, "q1", true);
    assert_eq!(replay, AnswerOutcome::AlreadyRecorded);

    // Even flipping correctness changes nothing on a replay.
    let replay_wrong = record(&mut tracker, "q1", false);
    assert_eq!(replay_wrong, AnswerOutcome::AlreadyRecorded);

    let entry = tracker.entry(CHAT, USER).unwrap();
    assert_eq!(entry.score, 1.0);
    assert_eq!(entry.streak, 1);
    assert_eq!(entry.correct_count, 1);
}

#[test]
fn incorrect_answer_resets_the_streak() {
    let mut tracker = ScoreTracker::new();
    record(&mut tracker, "q1", true);
    record(&mut tracker, "q2", true);
    record(&mut tracker, "q3", true);

    let wrong = record(&mut tracker, "q4", false);
    assert!(matches!(wrong, AnswerOutcome::Recorded { streak: 0, .. }));

    // Two more correct answers rebuild a streak of 2, not 5, and the
    // already-achieved streak milestone is not announced again.
    record(&mut tracker, "q5", true);
    let last = record(&mut tracker, "q6", true);
    assert!(matches!(
        last,
        AnswerOutcome::Recorded {
            streak: 2,
            achievement: None,
            ..
        }
    ));

    let entry = tracker.entry(CHAT, USER).unwrap();
    assert_eq!(entry.score, 3.0 - 0.5 + 2.0);
}

#[test]
fn streak_milestone_announced_exactly_once() {
    let mut tracker = ScoreTracker::new();
    record(&mut tracker, "q1", true);
    record(&mut tracker, "q2", true);
    let third = record(&mut tracker, "q3", true);
    assert!(matches!(
        third,
        AnswerOutcome::Recorded {
            achievement: Some(Achievement::Streak(3)),
            ..
        }
    ));
}

#[test]
fn ratings_are_ordered_and_aggregated() {
    let mut tracker = ScoreTracker::new();
    let d = day();
    tracker.record_answer(1, 10, "Ann", "q1", true, d);
    tracker.record_answer(1, 10, "Ann", "q2", true, d);
    tracker.record_answer(1, 20, "Bob", "q1", false, d);
    tracker.record_answer(2, 20, "Bob", "q1", true, d);

    let chat_one = tracker.chat_rating(1, 10);
    assert_eq!(chat_one.len(), 2);
    assert_eq!(chat_one[0].display_name, "Ann");
    assert_eq!(chat_one[0].score, 2.0);
    assert_eq!(chat_one[1].score, -0.5);

    // Bob's global total sums both chats: -0.5 + 1.0.
    let global = tracker.global_rating(10);
    let bob = global.iter().find(|r| r.user_id == 20).unwrap();
    assert_eq!(bob.score, 0.5);

    let top_one = tracker.chat_rating(1, 1);
    assert_eq!(top_one.len(), 1);
}

#![allow(clippy::unwrap_used)]

use std::io::Write;

use tempfile::NamedTempFile;
use trivia_quiz_bot::quiz::questions::QuestionBank;

#[test]
fn loads_a_bank_from_json() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "History": [
                {{
                    "id": "h1",
                    "text": "First question?",
                    "options": ["a", "b", "c"],
                    "correct_option": 1,
                    "explanation": "Because b."
                }}
            ],
            "Science": [
                {{
                    "id": "s1",
                    "text": "Second question?",
                    "options": ["x", "y"],
                    "correct_option": 0
                }},
                {{
                    "id": "broken",
                    "text": "Only one option",
                    "options": ["x"],
                    "correct_option": 0
                }}
            ]
        }}"#
    )
    .unwrap();

    let bank = QuestionBank::load_from_file(file.path()).unwrap();
    assert_eq!(
        bank.category_names(),
        vec!["History".to_string(), "Science".to_string()]
    );
    assert_eq!(bank.question_count("History"), 1);
    // The malformed entry was dropped at load time.
    assert_eq!(bank.question_count("Science"), 1);
    assert_eq!(bank.total_questions(), 2);

    let questions = bank.questions_in(&["History".to_string()]);
    assert_eq!(questions[0].explanation.as_deref(), Some("Because b."));
}

#[test]
fn rejects_invalid_json() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "this is not json").unwrap();
    assert!(QuestionBank::load_from_file(file.path()).is_err());
}

#[test]
fn rejects_a_bank_with_no_usable_questions() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "Empty": [ {{ "id": "e1", "text": "?", "options": ["only"], "correct_option": 0 }} ] }}"#
    )
    .unwrap();
    assert!(QuestionBank::load_from_file(file.path()).is_err());
}

#[test]
fn missing_file_is_an_error() {
    assert!(QuestionBank::load_from_file("/no/such/file.json").is_err());
}

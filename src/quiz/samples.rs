use crate::quiz::Question;

fn sample(
    id: &str,
    topic: &str,
    text: &str,
    note: Option<&str>,
    choices: [&str; 4],
    correct: &str,
) -> Question {
    Question::new(
        id.to_string(),
        topic,
        text.to_string(),
        note.map(str::to_string),
        choices.map(str::to_string),
        correct,
    )
}

/// Built-in questions shown when a topic's sheet is unconfigured or unreachable.
/// Unknown topics have no samples.
pub fn sample_questions(topic_id: &str) -> Vec<Question> {
    match topic_id {
        "space" => vec![
            sample(
                "space-q1",
                "space",
                "Who took Lily and Max on their space trip?",
                Some("Read the story carefully before answering."),
                ["Captain Star", "Emma", "Jake", "Columbus"],
                "A",
            ),
            sample(
                "space-q2",
                "space",
                "What planet is known as the Red Planet?",
                None,
                ["Venus", "Mars", "Jupiter", "Saturn"],
                "B",
            ),
        ],
        "geography" => vec![sample(
            "geography-q1",
            "geography",
            "What is the capital of France?",
            None,
            ["London", "Berlin", "Paris", "Madrid"],
            "C",
        )],
        "math" => vec![sample(
            "math-q1",
            "math",
            "What is 12 + 8?",
            None,
            ["18", "20", "22", "24"],
            "B",
        )],
        "spell" => vec![sample(
            "spell-q1",
            "spell",
            "Which word is spelled correctly?",
            Some("Look carefully at each spelling before choosing."),
            ["Beatiful", "Beautiful", "Beutiful", "Beautifull"],
            "B",
        )],
        _ => Vec::new(),
    }
}

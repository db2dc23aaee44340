pub mod samples;
pub mod sheets;
pub mod spelling;
pub mod topics;

use rand::seq::SliceRandom;

pub use topics::Topic;

/// Letters used to label the four choices of every question.
pub const ANSWER_IDS: [&str; 4] = ["A", "B", "C", "D"];

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub note: Option<String>,
    pub answers: Vec<Answer>,
    pub correct_answer: String,
    pub topic: String,
}

impl Question {
    /// Builds a question with answers labelled A to D in order.
    pub fn new(
        id: String,
        topic: &str,
        text: String,
        note: Option<String>,
        choices: [String; 4],
        correct_answer: &str,
    ) -> Self {
        let answers = ANSWER_IDS
            .iter()
            .zip(choices)
            .map(|(id, text)| Answer::new(id, text))
            .collect();

        Self {
            id,
            text,
            note,
            answers,
            correct_answer: correct_answer.to_uppercase(),
            topic: topic.to_string(),
        }
    }

    pub fn correct(&self) -> Option<&Answer> {
        self.answers.iter().find(|a| a.id == self.correct_answer)
    }

    /// Matches a reply against the choices, either by its letter ("b", "B) Mars")
    /// or by the full answer text.
    pub fn find_answer(&self, reply: &str) -> Option<&Answer> {
        let reply = reply.trim();
        if let Some(answer) = self.answers.iter().find(|a| a.label() == reply) {
            return Some(answer);
        }
        if let Some(answer) = self
            .answers
            .iter()
            .find(|a| a.text.eq_ignore_ascii_case(reply))
        {
            return Some(answer);
        }

        let letter = reply
            .split(|c: char| c == ')' || c == '.' || c.is_whitespace())
            .next()
            .unwrap_or_default();
        self.answers
            .iter()
            .find(|a| a.id.eq_ignore_ascii_case(letter))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Answer {
    pub id: String,
    pub text: String,
}

impl Answer {
    pub fn new(id: &str, text: String) -> Self {
        Self {
            id: id.to_string(),
            text,
        }
    }

    pub fn label(&self) -> String {
        format!("{}) {}", self.id, self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct { streak: u32 },
    Incorrect,
}

/// One run through a topic's questions, tracking score and streak.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Quiz {
    pub topic_id: String,
    pub questions: Vec<Question>,
    pub current_question: usize,
    pub score: u32,
    pub streak: u32,
    pub best_streak: u32,
}

impl Quiz {
    pub fn new(topic_id: &str, questions: Vec<Question>) -> Self {
        Self {
            topic_id: topic_id.to_string(),
            questions,
            current_question: 0,
            score: 0,
            streak: 0,
            best_streak: 0,
        }
    }

    pub fn shuffled(mut self) -> Self {
        self.questions.shuffle(&mut rand::thread_rng());
        self
    }

    pub fn current(&self) -> Option<&Question> {
        self.questions.get(self.current_question)
    }

    pub fn is_finished(&self) -> bool {
        self.current_question >= self.questions.len()
    }

    /// Records the answer to the current question and moves on to the next one.
    pub fn answer(&mut self, answer_id: &str) -> Option<Verdict> {
        let question = self.current()?;
        let correct = question.correct_answer.eq_ignore_ascii_case(answer_id);

        self.current_question += 1;
        if correct {
            self.score += 1;
            self.streak += 1;
            self.best_streak = self.best_streak.max(self.streak);
            Some(Verdict::Correct {
                streak: self.streak,
            })
        } else {
            self.streak = 0;
            Some(Verdict::Incorrect)
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Quiz finished! You answered {} of {} questions correctly. Best streak: {}",
            self.score,
            self.questions.len(),
            self.best_streak
        )
    }
}

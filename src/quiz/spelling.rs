#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SpellWord {
    pub word: String,
    pub difficulty: String,
    pub hint: String,
    pub category: String,
    pub fill_in_blank: String,
}

impl SpellWord {
    fn new(word: &str, difficulty: &str, hint: &str, category: &str, fill_in_blank: &str) -> Self {
        Self {
            word: word.to_string(),
            difficulty: difficulty.to_string(),
            hint: hint.to_string(),
            category: category.to_string(),
            fill_in_blank: fill_in_blank.to_string(),
        }
    }

    pub fn is_spelled_by(&self, attempt: &str) -> bool {
        attempt.trim().to_lowercase() == self.word.to_lowercase()
    }
}

pub fn sample_words() -> Vec<SpellWord> {
    vec![
        SpellWord::new("elephant", "easy", "Large grey animal with a trunk", "Animals", "ele____t"),
        SpellWord::new("beautiful", "medium", "Very pretty or attractive", "Adjectives", "beau____ul"),
        SpellWord::new("difficult", "medium", "Not easy to do", "Adjectives", "diffi____t"),
        SpellWord::new("favourite", "easy", "The one you like most", "Adjectives", "favo____te"),
        SpellWord::new("knowledge", "hard", "What you learn and know", "Nouns", "know____ge"),
        SpellWord::new("butterfly", "easy", "Colorful flying insect", "Animals", "butt____ly"),
        SpellWord::new("chocolate", "easy", "Sweet brown treat", "Food", "choc____te"),
        SpellWord::new("adventure", "medium", "An exciting journey", "Nouns", "adven____e"),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MeaningWord {
    pub word: String,
    pub meaning: String,
    pub synonyms: Vec<String>,
    pub example: String,
    pub difficulty: String,
}

impl MeaningWord {
    fn new(word: &str, meaning: &str, synonyms: &[&str], example: &str, difficulty: &str) -> Self {
        Self {
            word: word.to_string(),
            meaning: meaning.to_string(),
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
            example: example.to_string(),
            difficulty: difficulty.to_string(),
        }
    }

    /// Accepts an explanation that mentions any synonym or at least half of
    /// the meaning's words longer than three letters.
    pub fn is_explained_by(&self, attempt: &str) -> bool {
        let attempt = attempt.trim().to_lowercase();
        if attempt.is_empty() {
            return false;
        }
        if self
            .synonyms
            .iter()
            .any(|s| attempt.contains(&s.to_lowercase()))
        {
            return true;
        }

        let meaning = self.meaning.to_lowercase();
        let key_words: Vec<&str> = meaning
            .split_whitespace()
            .filter(|w| w.chars().count() > 3)
            .collect();
        let matched = key_words.iter().filter(|w| attempt.contains(*w)).count();
        matched * 2 >= key_words.len()
    }
}

pub fn sample_meanings() -> Vec<MeaningWord> {
    vec![
        MeaningWord::new("Happy", "feeling joy or pleasure", &["joyful", "glad", "cheerful"], "I am happy to see you!", "easy"),
        MeaningWord::new("Brave", "not afraid of danger", &["courageous", "fearless", "bold"], "The brave firefighter saved the cat.", "easy"),
        MeaningWord::new("Curious", "wanting to know or learn something", &["inquisitive", "interested"], "The curious child asked many questions.", "medium"),
        MeaningWord::new("Ancient", "very old, from long ago", &["old", "historic", "antique"], "We visited an ancient temple.", "medium"),
        MeaningWord::new("Generous", "willing to give and share", &["kind", "giving", "unselfish"], "She was generous with her toys.", "medium"),
        MeaningWord::new("Enormous", "very large in size", &["huge", "giant", "massive"], "The elephant was enormous!", "easy"),
    ]
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SpellMode {
    #[default]
    Full,
    FillIn,
    Meaning,
}

/// Number of correct answers in a row that earns a cheer.
pub const ON_FIRE_STREAK: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpellVerdict {
    Correct { streak: u32 },
    Incorrect { expected: String },
}

/// Spelling and word-meaning practice. `Meaning` mode walks `meanings`,
/// the other modes walk `words`.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SpellingDrill {
    pub words: Vec<SpellWord>,
    #[serde(default)]
    pub meanings: Vec<MeaningWord>,
    pub mode: SpellMode,
    pub current_word: usize,
    pub score: u32,
    pub attempts: u32,
    pub streak: u32,
}

impl SpellingDrill {
    pub fn new(words: Vec<SpellWord>, mode: SpellMode) -> Self {
        Self {
            words,
            mode,
            ..Self::default()
        }
    }

    pub fn meanings(meanings: Vec<MeaningWord>) -> Self {
        Self {
            meanings,
            mode: SpellMode::Meaning,
            ..Self::default()
        }
    }

    pub fn current(&self) -> Option<&SpellWord> {
        match self.mode {
            SpellMode::Meaning => None,
            _ => self.words.get(self.current_word),
        }
    }

    pub fn current_meaning(&self) -> Option<&MeaningWord> {
        match self.mode {
            SpellMode::Meaning => self.meanings.get(self.current_word),
            _ => None,
        }
    }

    fn len(&self) -> usize {
        match self.mode {
            SpellMode::Meaning => self.meanings.len(),
            _ => self.words.len(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.current_word >= self.len()
    }

    pub fn prompt(&self) -> Option<String> {
        let position = format!("Word {} of {}", self.current_word + 1, self.len());
        if let Some(meaning) = self.current_meaning() {
            return Some(format!(
                "{} ({})\nWhat does \"{}\" mean?",
                position, meaning.difficulty, meaning.word
            ));
        }

        let word = self.current()?;
        let prompt = match self.mode {
            SpellMode::FillIn => format!(
                "{} ({}, {})\nFill in the missing letters: {}",
                position, word.category, word.difficulty, word.fill_in_blank
            ),
            _ => format!(
                "{} ({}, {})\nSpell the word: {}",
                position, word.category, word.difficulty, word.hint
            ),
        };
        Some(prompt)
    }

    /// In fill-in mode the pattern is already shown, so the hint is the definition.
    pub fn hint(&self) -> Option<String> {
        if let Some(meaning) = self.current_meaning() {
            return Some(format!("Hint: {}", meaning.example));
        }
        let word = self.current()?;
        Some(match self.mode {
            SpellMode::FillIn => format!("Hint: {}", word.hint),
            _ => format!("Hint: {}", word.fill_in_blank),
        })
    }

    pub fn check(&mut self, attempt: &str) -> Option<SpellVerdict> {
        let (correct, expected) = if let Some(meaning) = self.current_meaning() {
            (meaning.is_explained_by(attempt), meaning.meaning.clone())
        } else {
            let word = self.current()?;
            (word.is_spelled_by(attempt), word.word.clone())
        };

        self.attempts += 1;
        self.current_word += 1;
        if correct {
            self.score += 1;
            self.streak += 1;
            Some(SpellVerdict::Correct {
                streak: self.streak,
            })
        } else {
            self.streak = 0;
            Some(SpellVerdict::Incorrect { expected })
        }
    }

    pub fn summary(&self) -> String {
        match self.mode {
            SpellMode::Meaning => format!(
                "Word meanings finished! You explained {} of {} words correctly.",
                self.score, self.attempts
            ),
            _ => format!(
                "Spelling practice finished! You spelled {} of {} words correctly.",
                self.score, self.attempts
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spelling_ignores_case_and_surrounding_space() {
        let word = &sample_words()[0];
        assert!(word.is_spelled_by("  Elephant "));
        assert!(!word.is_spelled_by("elefant"));
    }

    #[test]
    fn drill_tracks_score_and_streak() {
        let mut drill = SpellingDrill::new(sample_words(), SpellMode::Full);

        assert_eq!(drill.check("elephant"), Some(SpellVerdict::Correct { streak: 1 }));
        assert_eq!(drill.check("BEAUTIFUL"), Some(SpellVerdict::Correct { streak: 2 }));
        assert_eq!(
            drill.check("dificult"),
            Some(SpellVerdict::Incorrect {
                expected: "difficult".into()
            })
        );
        assert_eq!(drill.streak, 0);
        assert_eq!(drill.score, 2);
        assert_eq!(drill.attempts, 3);
    }

    #[test]
    fn prompt_depends_on_mode() {
        let full = SpellingDrill::new(sample_words(), SpellMode::Full);
        let fill_in = SpellingDrill::new(sample_words(), SpellMode::FillIn);

        assert!(full.prompt().unwrap().ends_with("Large grey animal with a trunk"));
        assert!(fill_in.prompt().unwrap().ends_with("ele____t"));
        assert_eq!(full.hint().as_deref(), Some("Hint: ele____t"));
    }

    #[test]
    fn drill_ends_after_last_word() {
        let mut drill = SpellingDrill::new(sample_words().into_iter().take(1).collect(), SpellMode::Full);
        drill.check("elephant");

        assert!(drill.is_finished());
        assert_eq!(drill.prompt(), None);
        assert_eq!(drill.check("anything"), None);
        assert_eq!(drill.attempts, 1);
    }

    #[test]
    fn meaning_accepts_half_of_the_key_words() {
        // key words: "wanting", "know", "learn", "something"
        let curious = &sample_meanings()[2];

        assert!(curious.is_explained_by("When you want to KNOW and learn"));
        assert!(!curious.is_explained_by("you know a lot"));
        assert!(!curious.is_explained_by("   "));
    }

    #[test]
    fn meaning_accepts_any_synonym() {
        let brave = &sample_meanings()[1];

        assert!(brave.is_explained_by("being Bold"));
        assert!(!brave.is_explained_by("scared of the dark"));
    }

    #[test]
    fn meaning_drill_carries_score_and_streak() {
        let mut drill = SpellingDrill::meanings(sample_meanings());

        assert_eq!(
            drill.prompt().as_deref(),
            Some("Word 1 of 6 (easy)\nWhat does \"Happy\" mean?")
        );
        assert_eq!(drill.hint().as_deref(), Some("Hint: I am happy to see you!"));
        assert_eq!(drill.check("feeling glad"), Some(SpellVerdict::Correct { streak: 1 }));
        assert_eq!(drill.check("not afraid"), Some(SpellVerdict::Correct { streak: 2 }));
        assert_eq!(
            drill.check("sleepy"),
            Some(SpellVerdict::Incorrect {
                expected: "wanting to know or learn something".into()
            })
        );
        assert_eq!((drill.score, drill.streak, drill.attempts), (2, 0, 3));
        assert!(drill.current().is_none());
        assert!(!drill.is_finished());
    }
}

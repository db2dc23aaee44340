/// Prefix of sheet URLs that have not been configured yet.
pub const PLACEHOLDER_PREFIX: &str = "PLACEHOLDER_";

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Topic {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub difficulty: String,
    pub solved: u32,
    pub total: u32,
    pub sheet_url: String,
    pub worksheet_gid: Option<String>,
}

impl Topic {
    fn new(id: &str, name: &str, icon: &str, color: &str, difficulty: &str, total: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
            color: color.to_string(),
            difficulty: difficulty.to_string(),
            solved: 0,
            total,
            sheet_url: format!("{}{}_SHEET_URL", PLACEHOLDER_PREFIX, id.to_uppercase()),
            worksheet_gid: None,
        }
    }

    pub fn has_placeholder_url(&self) -> bool {
        self.sheet_url.starts_with(PLACEHOLDER_PREFIX)
    }

    /// Text of the keyboard button that selects this topic.
    pub fn button_label(&self) -> String {
        format!(
            "{} {} ({}, {}/{})",
            self.icon, self.name, self.difficulty, self.solved, self.total
        )
    }
}

pub fn default_topics() -> Vec<Topic> {
    vec![
        Topic::new("space", "Space", "🚀", "#4dd0e1", "Easy", 10),
        Topic::new("geography", "Geography", "🌍", "#66bb6a", "Medium", 8),
        Topic::new("math", "Math", "🔢", "#ffa726", "Hard", 12),
        // Sheet placeholder predates the topic id
        Topic {
            sheet_url: format!("{}SPELL_CHECK_SHEET_URL", PLACEHOLDER_PREFIX),
            ..Topic::new("spell", "Spell Check", "✏️", "#ab47bc", "Medium", 7)
        },
    ]
}

pub fn find_by_label<'a>(topics: &'a [Topic], label: &str) -> Option<&'a Topic> {
    topics
        .iter()
        .find(|t| t.button_label() == label || t.name.eq_ignore_ascii_case(label.trim()))
}

use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SavedPrompt {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Role template the prompt was enhanced with, if any.
    pub role_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SavedPrompt {
    pub fn new(title: &str, content: &str) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        SavedPrompt {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            content: content.to_string(),
            role_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_role(mut self, role_id: &str) -> Self {
        self.role_id = Some(role_id.to_string());
        self
    }
}

use serde::{Deserialize, Serialize};

/// An enhanced prompt split into its named sections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredResult {
    pub role: String,
    pub objective: String,
    pub constraints: Vec<String>,
    pub output_format: String,
    pub full_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_role: Option<SuggestedRole>,
}

impl StructuredResult {
    pub fn is_empty(&self) -> bool {
        self.role.is_empty()
            && self.objective.is_empty()
            && self.constraints.is_empty()
            && self.output_format.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedRole {
    pub name: String,
    pub category: String,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub reason: String,
}

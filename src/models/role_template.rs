use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct RoleTemplate {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    /// Instructions prepended to the system message for this role.
    pub instructions: String,
    #[serde(default)]
    pub builtin: bool,
}

impl RoleTemplate {
    pub fn new(name: &str, category: &str, instructions: &str) -> Self {
        RoleTemplate {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            category: category.to_lowercase(),
            description: String::new(),
            instructions: instructions.to_string(),
            builtin: false,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    fn builtin(id: &str, name: &str, category: &str, description: &str, instructions: &str) -> Self {
        RoleTemplate {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            description: description.to_string(),
            instructions: instructions.to_string(),
            builtin: true,
        }
    }

    pub fn matches(&self, id_or_name: &str) -> bool {
        self.id == id_or_name || self.name.eq_ignore_ascii_case(id_or_name.trim())
    }
}

pub const DEFAULT_ROLE_ID: &str = "general";

pub fn builtin_roles() -> Vec<RoleTemplate> {
    vec![
        RoleTemplate::builtin(
            DEFAULT_ROLE_ID,
            "General Assistant",
            "general",
            "Clarifies any request into a precise, well-scoped prompt.",
            "You are an expert prompt engineer. Rewrite the user's request into a clear, \
             specific prompt that an AI assistant can act on without follow-up questions.",
        ),
        RoleTemplate::builtin(
            "software-engineer",
            "Software Engineer",
            "engineering",
            "Turns coding requests into precise engineering tasks.",
            "You are a senior software engineer. Rewrite the user's request as an \
             engineering task with explicit inputs, edge cases, and acceptance checks.",
        ),
        RoleTemplate::builtin(
            "data-analyst",
            "Data Analyst",
            "research",
            "Frames questions as analyses with data sources and metrics.",
            "You are a data analyst. Rewrite the user's request as an analysis brief naming \
             the data needed, the metrics to compute, and how results should be presented.",
        ),
        RoleTemplate::builtin(
            "content-writer",
            "SEO Content Writer",
            "writing",
            "Produces content briefs with tone, keywords, and E-E-A-T guidance.",
            "You are an SEO content strategist. Rewrite the user's request as a content brief. \
             Add TONE & STYLE, KEYWORD STRATEGY, EEAT REQUIREMENTS and CONTENT STRUCTURE \
             sections after CONSTRAINTS.",
        ),
        RoleTemplate::builtin(
            "project-manager",
            "Project Manager",
            "business",
            "Shapes requests into plans with context, stakeholders, and success criteria.",
            "You are an experienced project manager. Rewrite the user's request as a project \
             brief. Add CONTEXT, STAKEHOLDERS and SUCCESS CRITERIA sections after CONSTRAINTS.",
        ),
    ]
}

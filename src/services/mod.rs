use thiserror::Error;
use tracing::info;

use crate::clients::completion::CompletionClient;
use crate::error::{CompletionError, StoreError};
use crate::models::{ChatMessage, CompletionRequest, RoleTemplate, StructuredResult, SuggestedRole};
use crate::parser;
use crate::repos::roles::RoleRepository;
use crate::repos::settings::SettingsRepository;

const FORMAT_INSTRUCTIONS: &str = "Respond ONLY with the enhanced prompt. Do not answer or carry out the request itself.
Use these section headers, each on its own line, followed by their content:
ROLE:
OBJECTIVE:
CONSTRAINTS:
OUTPUT FORMAT:
Put each constraint on its own line.";

const SUGGESTION_INSTRUCTIONS: &str = "If one of the available roles below would suit this request clearly better than yours, end with:
SUGGESTED_ROLE:
name: \"<role name>\" | category: <category> | confidence: <0.0-1.0> | reason: <one short sentence>";

#[derive(Debug, Error)]
pub enum EnhanceError {
    #[error("Prompt is empty")]
    EmptyPrompt,

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default)]
pub struct EnhanceOptions {
    pub role: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// A suggestion confident enough to show, with the matching template when
/// the suggested role exists locally.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleSuggestion {
    pub suggested: SuggestedRole,
    pub template: Option<RoleTemplate>,
}

#[derive(Debug, Clone)]
pub struct Enhancement {
    pub role: RoleTemplate,
    pub result: StructuredResult,
    pub suggestion: Option<RoleSuggestion>,
    pub model: String,
    pub cost: f64,
}

pub fn build_system_prompt(role: &RoleTemplate, available: &[RoleTemplate]) -> String {
    let roster = available
        .iter()
        .map(|r| format!("- {} ({})", r.name, r.category))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{}\n\n{}\n\n{}\nAvailable roles:\n{}",
        role.instructions.trim(),
        FORMAT_INSTRUCTIONS,
        SUGGESTION_INSTRUCTIONS,
        roster
    )
}

pub fn build_request(
    role: &RoleTemplate,
    available: &[RoleTemplate],
    raw: &str,
    options: &EnhanceOptions,
) -> CompletionRequest {
    let mut request = CompletionRequest::new(vec![
        ChatMessage::system(build_system_prompt(role, available)),
        ChatMessage::user(raw.trim()),
    ]);
    if let Some(model) = &options.model {
        request = request.with_model(model.as_str());
    }
    if let Some(temperature) = options.temperature {
        request = request.with_temperature(temperature);
    }
    if let Some(max_tokens) = options.max_tokens {
        request = request.with_max_tokens(max_tokens);
    }
    request
}

fn pick_suggestion(
    suggested: Option<&SuggestedRole>,
    current: &RoleTemplate,
    available: &[RoleTemplate],
    threshold: f64,
) -> Option<RoleSuggestion> {
    let suggested = suggested?;
    if suggested.confidence < threshold || current.matches(&suggested.name) {
        return None;
    }
    Some(RoleSuggestion {
        suggested: suggested.clone(),
        template: available.iter().find(|r| r.matches(&suggested.name)).cloned(),
    })
}

pub struct EnhanceService<'a> {
    client: &'a CompletionClient,
    roles: &'a RoleRepository,
    settings: &'a SettingsRepository,
}

impl<'a> EnhanceService<'a> {
    pub fn new(
        client: &'a CompletionClient,
        roles: &'a RoleRepository,
        settings: &'a SettingsRepository,
    ) -> Self {
        EnhanceService {
            client,
            roles,
            settings,
        }
    }

    fn resolve_role(&self, requested: Option<&str>) -> Result<RoleTemplate, EnhanceError> {
        if let Some(name) = requested {
            return self
                .roles
                .find(name)?
                .ok_or_else(|| EnhanceError::UnknownRole(name.to_string()));
        }
        if let Some(default) = self.settings.load()?.default_role {
            if let Some(role) = self.roles.find(&default)? {
                return Ok(role);
            }
        }
        Ok(self.roles.default_role())
    }

    pub async fn enhance(
        &self,
        raw: &str,
        options: &EnhanceOptions,
    ) -> Result<Enhancement, EnhanceError> {
        if raw.trim().is_empty() {
            return Err(EnhanceError::EmptyPrompt);
        }
        let role = self.resolve_role(options.role.as_deref())?;
        let available = self.roles.list()?;
        let request = build_request(&role, &available, raw, options);

        info!("Enhancing prompt with role {}", role.name);
        let completion = self.client.complete_detailed(&request).await?;
        let result = parser::parse(&completion.text);

        let threshold = self.settings.load()?.suggestion_threshold;
        let suggestion =
            pick_suggestion(result.suggested_role.as_ref(), &role, &available, threshold);

        Ok(Enhancement {
            role,
            result,
            suggestion,
            model: completion.model,
            cost: completion.cost,
        })
    }
}

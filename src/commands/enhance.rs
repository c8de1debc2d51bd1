use anyhow::Error;
use serde::Serialize;
use tracing::info;

use crate::args::EnhanceSubCommand;
use crate::models::{SavedPrompt, StructuredResult, SuggestedRole};
use crate::repos::prompts::PromptRepository;
use crate::services::{EnhanceOptions, EnhanceService, Enhancement};

use super::read_stdin;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnhanceOutput<'a> {
    role_id: &'a str,
    role_name: &'a str,
    result: &'a StructuredResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<&'a SuggestedRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggested_role_id: Option<&'a str>,
}

fn render_text(enhancement: &Enhancement) -> String {
    let mut out = enhancement.result.full_text.clone();
    if let Some(suggestion) = &enhancement.suggestion {
        let s = &suggestion.suggested;
        out.push_str(&format!(
            "\n\nSuggested role: {} ({}, {:.0}% confidence)\n  {}",
            s.name,
            s.category,
            s.confidence * 100.0,
            s.reason
        ));
        if let Some(template) = &suggestion.template {
            out.push_str(&format!("\n  Re-run with `--role {}` to use it.", template.id));
        }
    }
    out
}

pub async fn run(
    service: &EnhanceService<'_>,
    prompts: &PromptRepository,
    cmd: &EnhanceSubCommand,
) -> Result<(), Error> {
    let raw = match &cmd.prompt {
        Some(prompt) => prompt.clone(),
        None => read_stdin("prompt")?,
    };
    let options = EnhanceOptions {
        role: cmd.role.clone(),
        model: cmd.model.clone(),
        temperature: cmd.temperature,
        max_tokens: cmd.max_tokens,
    };

    let enhancement = service.enhance(&raw, &options).await?;
    info!("Enhanced with {} (${:.6})", enhancement.model, enhancement.cost);

    if cmd.json {
        let output = EnhanceOutput {
            role_id: &enhancement.role.id,
            role_name: &enhancement.role.name,
            result: &enhancement.result,
            suggestion: enhancement.suggestion.as_ref().map(|s| &s.suggested),
            suggested_role_id: enhancement
                .suggestion
                .as_ref()
                .and_then(|s| s.template.as_ref())
                .map(|t| t.id.as_str()),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", render_text(&enhancement));
    }

    if let Some(title) = &cmd.save {
        let prompt = SavedPrompt::new(title, &enhancement.result.full_text)
            .with_role(&enhancement.role.id);
        prompts.save(&prompt)?;
        eprintln!("Saved as {}", prompt.id);
    }
    Ok(())
}

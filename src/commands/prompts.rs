use std::fs;

use anyhow::{anyhow, bail, Error};
use serde::{Deserialize, Serialize};

use crate::args::PromptsAction;
use crate::models::{RoleTemplate, SavedPrompt};
use crate::repos::prompts::PromptRepository;
use crate::repos::roles::RoleRepository;
use crate::utils::preview;

use super::read_stdin;

const EXPORT_VERSION: u32 = 1;

/// File format written by `prompts export` and read by `prompts import`.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub version: u32,
    pub exported_at: i64,
    #[serde(default)]
    pub prompts: Vec<SavedPrompt>,
    #[serde(default)]
    pub roles: Vec<RoleTemplate>,
}

pub fn export_bundle(prompts: &PromptRepository, roles: &RoleRepository) -> Result<ExportBundle, Error> {
    Ok(ExportBundle {
        version: EXPORT_VERSION,
        exported_at: chrono::Utc::now().timestamp_millis(),
        prompts: prompts.list()?,
        roles: roles.list()?.into_iter().filter(|r| !r.builtin).collect(),
    })
}

/// Returns (prompts imported, roles added).
pub fn import_bundle(
    prompts: &PromptRepository,
    roles: &RoleRepository,
    content: &str,
) -> Result<(usize, usize), Error> {
    let bundle: ExportBundle = serde_json::from_str(content)?;
    if bundle.version > EXPORT_VERSION {
        bail!("Unsupported export version {}", bundle.version);
    }
    let imported = prompts.import(bundle.prompts)?;
    let added = roles.import(bundle.roles)?;
    Ok((imported, added))
}

fn find(prompts: &PromptRepository, id: &str) -> Result<SavedPrompt, Error> {
    prompts
        .get(id)?
        .ok_or_else(|| anyhow!("No saved prompt matches `{}`", id))
}

pub fn run(
    prompts: &PromptRepository,
    roles: &RoleRepository,
    action: &PromptsAction,
) -> Result<(), Error> {
    match action {
        PromptsAction::List => {
            let saved = prompts.list()?;
            if saved.is_empty() {
                println!("No saved prompts");
            }
            for prompt in saved {
                println!(
                    "{}  {}  {}",
                    &prompt.id[..8.min(prompt.id.len())],
                    prompt.title,
                    preview(&prompt.content, 60)
                );
            }
        }
        PromptsAction::Show { id } => {
            let prompt = find(prompts, id)?;
            println!("# {}\n\n{}", prompt.title, prompt.content);
        }
        PromptsAction::Save {
            title,
            content,
            role,
        } => {
            let content = match content {
                Some(c) => c.clone(),
                None => read_stdin("prompt content")?,
            };
            let mut prompt = SavedPrompt::new(title, content.trim());
            if let Some(role) = role {
                let template = roles
                    .find(role)?
                    .ok_or_else(|| anyhow!("Unknown role: {}", role))?;
                prompt = prompt.with_role(&template.id);
            }
            prompts.save(&prompt)?;
            println!("Saved as {}", prompt.id);
        }
        PromptsAction::Update { id, title, content } => {
            if title.is_none() && content.is_none() {
                bail!("Nothing to update; pass --title and/or --content");
            }
            let mut prompt = find(prompts, id)?;
            if let Some(title) = title {
                prompt.title = title.clone();
            }
            if let Some(content) = content {
                prompt.content = content.trim().to_string();
            }
            prompts.save(&prompt)?;
            println!("Updated {}", prompt.id);
        }
        PromptsAction::Delete { id } => {
            if !prompts.delete(id)? {
                bail!("No saved prompt matches `{}`", id);
            }
            println!("Deleted {}", id);
        }
        PromptsAction::Export { out } => {
            let json = serde_json::to_string_pretty(&export_bundle(prompts, roles)?)?;
            match out {
                Some(path) => {
                    fs::write(path, json)?;
                    println!("Exported to {}", path);
                }
                None => println!("{}", json),
            }
        }
        PromptsAction::Import { file } => {
            let content = fs::read_to_string(file)?;
            let (imported, added) = import_bundle(prompts, roles, &content)?;
            println!(
                "Imported {} prompts and {} roles from {}",
                imported, added, file
            );
        }
    }
    Ok(())
}

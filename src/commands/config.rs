use anyhow::{anyhow, bail, Error};

use crate::args::ConfigSubCommand;
use crate::repos::roles::RoleRepository;
use crate::repos::settings::SettingsRepository;

const KEYS: [&str; 6] = [
    "model",
    "temperature",
    "max_tokens",
    "suggestion_threshold",
    "default_role",
    "api_key",
];

fn set(settings: &SettingsRepository, roles: &RoleRepository, assignment: &str) -> Result<(), Error> {
    let (key, value) = assignment
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected key=value, got `{}`", assignment))?;
    let key = key.trim();
    if key == "api_key" {
        bail!("Use `enhancer key set <KEY>` to store an API key");
    }
    if key == "default_role" && !value.trim().is_empty() && roles.find(value)?.is_none() {
        bail!("Unknown role: {}", value.trim());
    }

    let mut current = settings.load()?;
    current.set(key, value).map_err(|e| anyhow!(e))?;
    settings.save(&current)?;
    println!("{} = {}", key, current.get(key).unwrap_or_default());
    Ok(())
}

pub fn run(
    settings: &SettingsRepository,
    roles: &RoleRepository,
    cmd: &ConfigSubCommand,
) -> Result<(), Error> {
    if let Some(assignment) = &cmd.set {
        return set(settings, roles, assignment);
    }

    let current = settings.load()?;
    match &cmd.get {
        Some(key) => match current.get(key) {
            Some(value) => println!("{}", value),
            None => bail!("Unknown setting: {}", key),
        },
        None => {
            for key in KEYS {
                println!("{} = {}", key, current.get(key).unwrap_or_default());
            }
        }
    }
    Ok(())
}

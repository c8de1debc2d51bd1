use anyhow::{bail, Error};
use tracing::{info, warn};

use crate::args::KeyAction;
use crate::clients::completion::{CompletionClient, KeyStatus};
use crate::error::CompletionError;
use crate::repos::settings::SettingsRepository;

/// Last four characters, for confirming which key is stored.
fn mask(key: &str) -> String {
    let tail: String = key
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("…{}", tail)
}

async fn set(
    client: &CompletionClient,
    settings: &SettingsRepository,
    key: &str,
    force: bool,
) -> Result<(), Error> {
    let key = key.trim();
    if key.is_empty() {
        bail!("API key must not be empty");
    }

    match client.probe(key).await {
        KeyStatus::Valid => info!("API key verified"),
        KeyStatus::Invalid if force => warn!("Storing a key the service rejected"),
        KeyStatus::Invalid => return Err(CompletionError::CredentialInvalid.into()),
        KeyStatus::Unverified(reason) => {
            warn!("Could not verify the API key: {}", reason);
            eprintln!("Warning: the key could not be verified ({}). It was stored anyway.", reason);
        }
    }

    settings.set_credential(key)?;
    client.clear_config();
    println!("Stored API key {}", mask(key));
    Ok(())
}

async fn check(client: &CompletionClient, settings: &SettingsRepository) -> Result<(), Error> {
    let Some(key) = settings.credential()? else {
        return Err(CompletionError::CredentialMissing.into());
    };
    match client.probe(&key).await {
        KeyStatus::Valid => println!("API key {} is valid", mask(&key)),
        KeyStatus::Invalid => return Err(CompletionError::CredentialInvalid.into()),
        KeyStatus::Unverified(reason) => {
            println!("API key {} could not be verified: {}", mask(&key), reason)
        }
    }
    Ok(())
}

pub async fn run(
    client: &CompletionClient,
    settings: &SettingsRepository,
    action: &KeyAction,
) -> Result<(), Error> {
    match action {
        KeyAction::Set { key, force } => set(client, settings, key, *force).await,
        KeyAction::Check => check(client, settings).await,
        KeyAction::Clear => {
            settings.clear_credential()?;
            client.clear_config();
            println!("API key removed");
            Ok(())
        }
    }
}

use std::sync::Arc;

use tracing::info;

use crate::error::StoreError;
use crate::models::Settings;

use super::crypto;
use super::store::{AnyStore, KeyValueStore};

const SETTINGS_KEY: &str = "settings";
const SECRET_KEY: &str = "install_secret";

#[derive(Clone)]
pub struct SettingsRepository {
    store: Arc<AnyStore>,
}

impl SettingsRepository {
    pub fn new(store: Arc<AnyStore>) -> Self {
        SettingsRepository { store }
    }

    pub fn load(&self) -> Result<Settings, StoreError> {
        Ok(self.store.load(SETTINGS_KEY)?.unwrap_or_default())
    }

    pub fn save(&self, settings: &Settings) -> Result<(), StoreError> {
        self.store.save(SETTINGS_KEY, settings)
    }

    fn install_secret(&self) -> Result<String, StoreError> {
        if let Some(secret) = self.store.load::<String>(SECRET_KEY)? {
            return Ok(secret);
        }
        info!("Generating install secret for credential storage");
        let secret = crypto::generate_secret();
        self.store.save(SECRET_KEY, &secret)?;
        Ok(secret)
    }

    /// The decrypted credential, if one is stored.
    pub fn credential(&self) -> Result<Option<String>, StoreError> {
        let settings = self.load()?;
        match settings.api_key_encrypted {
            Some(stored) => {
                let secret = self.install_secret()?;
                Ok(Some(crypto::decrypt(&stored, &secret)?))
            }
            None => Ok(None),
        }
    }

    pub fn set_credential(&self, credential: &str) -> Result<(), StoreError> {
        let secret = self.install_secret()?;
        let mut settings = self.load()?;
        settings.api_key_encrypted = Some(crypto::encrypt(credential.trim(), &secret)?);
        self.save(&settings)
    }

    pub fn clear_credential(&self) -> Result<(), StoreError> {
        let mut settings = self.load()?;
        settings.api_key_encrypted = None;
        self.save(&settings)
    }

    /// Raw value as stored, for callers that need to check what is on disk.
    #[cfg(test)]
    pub fn raw(&self) -> Result<Option<serde_json::Value>, StoreError> {
        self.store.get(SETTINGS_KEY)
    }
}

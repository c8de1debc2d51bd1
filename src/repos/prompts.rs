use std::sync::Arc;

use crate::error::StoreError;
use crate::models::SavedPrompt;

use super::store::AnyStore;

const PROMPTS_KEY: &str = "saved_prompts";

#[derive(Clone)]
pub struct PromptRepository {
    store: Arc<AnyStore>,
}

impl PromptRepository {
    pub fn new(store: Arc<AnyStore>) -> Self {
        PromptRepository { store }
    }

    /// Newest first.
    pub fn list(&self) -> Result<Vec<SavedPrompt>, StoreError> {
        let mut prompts: Vec<SavedPrompt> = self.store.load(PROMPTS_KEY)?.unwrap_or_default();
        prompts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(prompts)
    }

    /// Looks up by full id or a unique id prefix.
    pub fn get(&self, id: &str) -> Result<Option<SavedPrompt>, StoreError> {
        let prompts = self.list()?;
        if let Some(exact) = prompts.iter().find(|p| p.id == id) {
            return Ok(Some(exact.clone()));
        }
        let mut matches = prompts.into_iter().filter(|p| p.id.starts_with(id));
        match (matches.next(), matches.next()) {
            (Some(only), None) if !id.is_empty() => Ok(Some(only)),
            _ => Ok(None),
        }
    }

    /// Inserts or replaces by id.
    pub fn save(&self, prompt: &SavedPrompt) -> Result<(), StoreError> {
        let mut prompts = self.list()?;
        match prompts.iter_mut().find(|p| p.id == prompt.id) {
            Some(existing) => {
                *existing = prompt.clone();
                existing.updated_at = chrono::Utc::now().timestamp_millis();
            }
            None => prompts.push(prompt.clone()),
        }
        self.store.save(PROMPTS_KEY, &prompts)
    }

    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let Some(target) = self.get(id)? else {
            return Ok(false);
        };
        let mut prompts = self.list()?;
        prompts.retain(|p| p.id != target.id);
        self.store.save(PROMPTS_KEY, &prompts)?;
        Ok(true)
    }

    /// Merges prompts by id; returns how many were added or replaced.
    pub fn import(&self, incoming: Vec<SavedPrompt>) -> Result<usize, StoreError> {
        let mut prompts = self.list()?;
        let count = incoming.len();
        for prompt in incoming {
            prompts.retain(|p| p.id != prompt.id);
            prompts.push(prompt);
        }
        self.store.save(PROMPTS_KEY, &prompts)?;
        Ok(count)
    }
}

use std::sync::Arc;

use crate::error::StoreError;
use crate::models::UsageRecord;

use super::store::{AnyStore, KeyValueStore};

const USAGE_KEY: &str = "usage";

#[derive(Clone)]
pub struct UsageRepository {
    store: Arc<AnyStore>,
}

impl UsageRepository {
    pub fn new(store: Arc<AnyStore>) -> Self {
        UsageRepository { store }
    }

    pub fn load(&self) -> Result<UsageRecord, StoreError> {
        Ok(self.store.load(USAGE_KEY)?.unwrap_or_default())
    }

    pub fn save(&self, usage: &UsageRecord) -> Result<(), StoreError> {
        self.store.save(USAGE_KEY, usage)
    }

    pub fn reset(&self) -> Result<(), StoreError> {
        self.store.remove(USAGE_KEY)
    }
}

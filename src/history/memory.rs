use async_trait::async_trait;
use crate::history::HistoryStore;
use std::collections::HashMap;
use std::error::Error;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryHistoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryHistoryStore {
    fn items(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, Box<dyn Error + Send + Sync>> {
        self.items.lock().map_err(|_| "memory history store poisoned".into())
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, Box<dyn Error + Send + Sync>> {
        Ok(self.items()?.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.items()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.items()?.remove(key);
        Ok(())
    }
}

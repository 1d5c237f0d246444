use async_trait::async_trait;
use crate::history::HistoryStore;
use log::warn;
use std::collections::BTreeMap;
use std::error::Error;
use std::io::ErrorKind;
use std::path::{ Path, PathBuf };
use tokio::fs;
use tokio::sync::Mutex;

type Items = BTreeMap<String, String>;

/// Keeps every key in one JSON object file. Writes replace the file via rename.
pub struct FileHistoryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileHistoryStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    async fn read_items(&self) -> Result<Items, Box<dyn Error + Send + Sync>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(Items::new());
            }
            Err(e) => {
                return Err(
                    format!("Failed to read history file '{}': {}", self.path.display(), e).into()
                );
            }
        };

        match serde_json::from_str::<Items>(&raw) {
            Ok(items) => Ok(items),
            Err(e) => {
                let aside = self.sibling("corrupt");
                warn!(
                    "History file '{}' is unreadable ({}); moving it to '{}'",
                    self.path.display(),
                    e,
                    aside.display()
                );
                fs::rename(&self.path, &aside).await?;
                Ok(Items::new())
            }
        }
    }

    async fn write_items(&self, items: &Items) -> Result<(), Box<dyn Error + Send + Sync>> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let tmp = self.sibling("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(items)?).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".");
        name.push(suffix);
        PathBuf::from(name)
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, Box<dyn Error + Send + Sync>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_items().await?.remove(key))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let _guard = self.lock.lock().await;
        let mut items = self.read_items().await?;
        items.insert(key.to_string(), value.to_string());
        self.write_items(&items).await
    }

    async fn remove_item(&self, key: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let _guard = self.lock.lock().await;
        let mut items = self.read_items().await?;
        if items.remove(key).is_some() {
            self.write_items(&items).await?;
        }
        Ok(())
    }
}

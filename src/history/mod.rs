mod conversation_log;
mod file;
mod memory;
mod redis;

pub use self::file::FileHistoryStore;
pub use self::conversation_log::{ ConversationLog, CONVERSATION_KEY, HISTORY_PREVIEW_CHARS };
pub use self::memory::MemoryHistoryStore;
pub use self::redis::RedisHistoryStore;

use async_trait::async_trait;
use log::info;
use std::error::Error;
use crate::cli::HistoryArgs;
use std::sync::Arc;

/// String key-value storage backing the client, shaped like browser local storage.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, Box<dyn Error + Send + Sync>>;

    async fn set_item(&self, key: &str, value: &str) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn remove_item(&self, key: &str) -> Result<(), Box<dyn Error + Send + Sync>>;
}

pub fn create_history_store(
    args: &HistoryArgs
) -> Result<Arc<dyn HistoryStore>, Box<dyn Error + Send + Sync>> {
    match args.history_type.to_lowercase().as_str() {
        "file" => Ok(Arc::new(FileHistoryStore::new(&args.history_host))),
        "redis" => {
            let store = RedisHistoryStore::new(&args.history_host, &args.history_redis_prefix)?;
            Ok(Arc::new(store))
        }
        "memory" => Ok(Arc::new(MemoryHistoryStore::default())),
        _ =>
            Err(
                Box::new(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("Unsupported history store type: {}", args.history_type)
                    )
                )
            ),
    }
}

pub fn initialize_history_store(
    args: &HistoryArgs
) -> Result<Arc<dyn HistoryStore>, Box<dyn Error + Send + Sync>> {
    info!("Chat history will be stored in: {} at {}", args.history_type, args.history_host);
    create_history_store(args)
}

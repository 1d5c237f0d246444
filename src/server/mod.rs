pub mod api;

use crate::cli::ServeArgs;
use crate::companion::Companion;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct Server {
    companion: Arc<RwLock<Companion>>,
    args: ServeArgs,
}

impl Server {
    pub fn new(companion: Companion, args: ServeArgs) -> Self {
        Self {
            companion: Arc::new(RwLock::new(companion)),
            args,
        }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        api::start_http_server(&self.args, self.companion.clone()).await
    }
}

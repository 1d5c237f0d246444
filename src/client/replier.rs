use async_trait::async_trait;
use reqwest::Client;
use std::error::Error;
use std::time::Duration;
use url::Url;

use crate::llm::chat::mock::MockChatClient;
use crate::models::chat::{ ChatReply, ChatRequest };

/// Something that turns one user message into the companion's answer.
#[async_trait]
pub trait Replier: Send + Sync {
    async fn reply(
        &self,
        text: &str,
        personality: Option<&str>
    ) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// Talks to a running backend over `POST {backend}/api/chat`.
pub struct RemoteReplier {
    http: Client,
    endpoint: Url,
}

impl RemoteReplier {
    pub fn new(backend_url: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let mut base = Url::parse(backend_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            endpoint: base.join("api/chat")?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Replier for RemoteReplier {
    async fn reply(
        &self,
        text: &str,
        personality: Option<&str>
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        let request = ChatRequest {
            message: Some(text.to_string()),
            personality: personality.map(str::to_string),
        };

        let response = self.http.post(self.endpoint.clone()).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let parsed = serde_json::from_str::<ChatReply>(&body);
        if !status.is_success() {
            let detail = match parsed {
                Ok(reply) => reply.reply,
                Err(_) => body,
            };
            return Err(format!("Backend returned {}: {}", status, detail).into());
        }

        Ok(parsed?.reply)
    }
}

const BASE_THINK_MS: u64 = 600;
const THINK_MS_PER_CHAR: u64 = 8;
const MAX_THINK_MS: u64 = 2000;

/// Offline replier: waits a little, longer for longer messages, then answers with a canned reply.
pub struct MockReplier {
    client: MockChatClient,
    simulate_delay: bool,
}

impl Default for MockReplier {
    fn default() -> Self {
        Self { client: MockChatClient::default(), simulate_delay: true }
    }
}

impl MockReplier {
    pub fn without_delay(client: MockChatClient) -> Self {
        Self { client, simulate_delay: false }
    }

    pub fn think_time(text: &str) -> Duration {
        let chars = text.chars().count() as u64;
        Duration::from_millis((BASE_THINK_MS + THINK_MS_PER_CHAR * chars).min(MAX_THINK_MS))
    }
}

#[async_trait]
impl Replier for MockReplier {
    async fn reply(
        &self,
        text: &str,
        _personality: Option<&str>
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        if self.simulate_delay {
            tokio::time::sleep(Self::think_time(text)).await;
        }
        Ok(self.client.pick())
    }
}

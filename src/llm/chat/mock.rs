use async_trait::async_trait;
use chrono::Utc;
use std::error::Error as StdError;

use super::{ChatClient, CompletionResponse};

pub const CANNED_REPLIES: [&str; 5] = [
    "Hola, ¿cómo estás? 😊",
    "Cuéntame más sobre eso...",
    "Interesante, ¿puedes explicar un poco más?",
    "¡Eso suena importante para ti! 😌",
    "Lo siento, no entendí muy bien, ¿puedes repetir?",
];

/// Offline companion: answers with one of a fixed set of replies, ignoring the prompt.
#[derive(Debug, Clone)]
pub struct MockChatClient {
    replies: Vec<String>,
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self::new(CANNED_REPLIES.iter().map(|s| s.to_string()).collect())
    }
}

impl MockChatClient {
    pub fn new(replies: Vec<String>) -> Self {
        Self { replies }
    }

    pub fn replies(&self) -> &[String] {
        &self.replies
    }

    pub fn pick(&self) -> String {
        if self.replies.is_empty() {
            return String::new();
        }
        let seed = Utc::now().timestamp_subsec_nanos() as usize;
        self.replies[seed % self.replies.len()].clone()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn complete(
        &self,
        _prompt: &str
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        Ok(CompletionResponse { response: self.pick() })
    }

    fn get_model(&self) -> String {
        "mock".to_string()
    }

    fn get_base_url(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reply_comes_from_canned_set() {
        let client = MockChatClient::default();
        for _ in 0..20 {
            let resp = client.complete("estoy triste").await.unwrap();
            assert!(CANNED_REPLIES.contains(&resp.response.as_str()));
        }
    }

    #[test]
    fn test_empty_reply_set() {
        let client = MockChatClient::new(Vec::new());
        assert_eq!(client.pick(), "");
    }
}

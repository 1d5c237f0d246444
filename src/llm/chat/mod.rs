pub mod ollama;
pub mod openai;
pub mod hosted;
pub mod mock;

use async_trait::async_trait;
use serde::Deserialize;
use std::error::Error as StdError;
use std::sync::Arc;
use super::{ LlmConfig, LlmType };
use self::ollama::OllamaClient;
use self::openai::OpenAIChatClient;
use self::hosted::HostedChatClient;
use self::mock::MockChatClient;

#[derive(Deserialize, Debug, Clone)]
pub struct CompletionResponse {
    pub response: String,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

pub fn new_client(
    config: &LlmConfig
) -> Result<Arc<dyn ChatClient>, Box<dyn StdError + Send + Sync>> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::Ollama => {
            let specific_client = OllamaClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::OpenAI => {
            let specific_client = OpenAIChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Anthropic | LlmType::Gemini | LlmType::DeepSeek | LlmType::XAI | LlmType::Groq => {
            let specific_client = HostedChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Mock => Arc::new(MockChatClient::default()),
    };
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_requires_api_key() {
        let config = LlmConfig { llm_type: LlmType::OpenAI, ..Default::default() };
        let err = new_client(&config).err().expect("missing key must fail");
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn test_mock_needs_no_network_config() {
        let config = LlmConfig { llm_type: LlmType::Mock, ..Default::default() };
        let client = new_client(&config).unwrap();
        assert_eq!(client.get_model(), "mock");
        assert!(client.get_base_url().is_none());
    }

    #[test]
    fn test_ollama_defaults() {
        let config = LlmConfig { llm_type: LlmType::Ollama, ..Default::default() };
        let client = new_client(&config).unwrap();
        assert_eq!(client.get_base_url().as_deref(), Some("http://localhost:11434"));
    }
}

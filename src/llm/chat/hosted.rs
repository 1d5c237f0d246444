use async_trait::async_trait;
use std::error::Error as StdError;
use log::info;

use super::{ChatClient, CompletionResponse};
use crate::llm::{LlmConfig, LlmType};
use rllm::chat::{ChatMessage, ChatRole, MessageType};
use rllm::builder::{LLMBackend, LLMBuilder};
use rllm::LLMProvider;

/// Providers reached through `rllm` rather than a hand-written HTTP adapter.
pub struct HostedChatClient {
    llm: Box<dyn LLMProvider>,
    llm_type: LlmType,
    model: String,
    base_url: Option<String>,
}

fn backend_for(llm_type: LlmType) -> Option<(LLMBackend, &'static str)> {
    match llm_type {
        LlmType::Anthropic => Some((LLMBackend::Anthropic, "claude-3-haiku-20240307")),
        LlmType::Gemini => Some((LLMBackend::Google, "gemini-1.5-flash-latest")),
        LlmType::DeepSeek => Some((LLMBackend::DeepSeek, "deepseek-chat")),
        LlmType::XAI => Some((LLMBackend::XAI, "grok-2-latest")),
        LlmType::Groq => Some((LLMBackend::Groq, "llama-3.1-8b-instant")),
        _ => None,
    }
}

impl HostedChatClient {
    pub fn new(
        llm_type: LlmType,
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        max_tokens: u32,
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let (backend, default_model) = backend_for(llm_type)
            .ok_or_else(|| format!("{} is not served through rllm", llm_type))?;
        let chat_model = model.unwrap_or_else(|| default_model.to_string());

        let mut builder = LLMBuilder::new()
            .backend(backend)
            .api_key(api_key)
            .model(&chat_model)
            .max_tokens(max_tokens)
            .stream(false);

        if let Some(url) = &base_url {
            builder = builder.base_url(url);
        }

        let llm = builder.build()?;

        Ok(Self {
            llm,
            llm_type,
            model: chat_model,
            base_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| format!("{} API key is required", config.llm_type))?;

        Self::new(
            config.llm_type,
            api_key,
            config.completion_model.clone(),
            config.base_url.clone(),
            config.max_output_tokens,
        )
    }
}

#[async_trait]
impl ChatClient for HostedChatClient {
    async fn complete(
        &self,
        prompt: &str
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        let messages = vec![ChatMessage {
            role: ChatRole::User,
            content: prompt.to_string(),
            message_type: MessageType::Text,
        }];
        info!(
            "HostedChatClient::complete() → provider={} model={} base_url={:?}",
            self.llm_type,
            self.model,
            self.base_url
        );
        let resp = self.llm.chat(&messages).await?;
        let text = resp
            .text()
            .map(|s| s.to_string())
            .unwrap_or_else(|| resp.to_string());
        Ok(CompletionResponse { response: text })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        self.base_url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_hosted_types_map_to_backends() {
        assert!(backend_for(LlmType::Anthropic).is_some());
        assert!(backend_for(LlmType::Groq).is_some());
        assert!(backend_for(LlmType::OpenAI).is_none());
        assert!(backend_for(LlmType::Mock).is_none());
    }

    #[test]
    fn test_missing_key_is_reported_per_provider() {
        let config = LlmConfig { llm_type: LlmType::Anthropic, ..Default::default() };
        let err = HostedChatClient::from_config(&config).err().expect("key required");
        assert_eq!(err.to_string(), "anthropic API key is required");
    }
}

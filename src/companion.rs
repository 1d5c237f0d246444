use crate::cli::ServeArgs;
use crate::config::prompt::{ self, PromptConfig, PromptError, ReplyTexts };
use crate::llm::chat::{ ChatClient, new_client as new_chat_client };

use log::{ info, error };
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompanionError {
    #[error("no message was provided")]
    EmptyMessage,
    #[error("{0}")]
    Upstream(String),
}

/// Turns a user message into a companion reply by way of a single model call.
#[derive(Clone)]
pub struct Companion {
    chat_client: Arc<dyn ChatClient>,
    prompt_config: Arc<PromptConfig>,
    prompts_path: Option<PathBuf>,
}

impl Companion {
    pub fn new(args: &ServeArgs) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let chat_config = args.chat_llm_config()?;
        let chat_client = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: Type={}, Model={}, BaseURL={}",
            chat_config.llm_type,
            chat_client.get_model(),
            chat_client.get_base_url().as_deref().unwrap_or("adapter default")
        );

        let prompt_config = prompt::load_prompts_or_default(&args.prompts_path)?;

        Ok(Self {
            chat_client,
            prompt_config,
            prompts_path: Some(PathBuf::from(&args.prompts_path)),
        })
    }

    pub fn from_parts(chat_client: Arc<dyn ChatClient>, prompt_config: PromptConfig) -> Self {
        Self {
            chat_client,
            prompt_config: Arc::new(prompt_config),
            prompts_path: None,
        }
    }

    pub fn with_prompts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.prompts_path = Some(path.into());
        self
    }

    pub fn replies(&self) -> &ReplyTexts {
        &self.prompt_config.replies
    }

    /// Returns a freshly loaded prompt config when the file on disk is newer than ours.
    pub fn changed_prompts(&self) -> Result<Option<Arc<PromptConfig>>, PromptError> {
        match &self.prompts_path {
            Some(path) => prompt::reload_prompts_if_changed(path, &self.prompt_config),
            None => Ok(None),
        }
    }

    pub fn install_prompts(&mut self, config: Arc<PromptConfig>) {
        self.prompt_config = config;
        info!("Companion prompt reloaded");
    }

    pub async fn reply(
        &self,
        message: &str,
        personality: Option<&str>
    ) -> Result<String, CompanionError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(CompanionError::EmptyMessage);
        }

        let prompt = prompt::render_companion_prompt(&self.prompt_config, personality, message);
        let completion = self.chat_client.complete(&prompt).await.map_err(|e| {
            error!("Model provider error: {}", e);
            CompanionError::Upstream(e.to_string())
        })?;

        let reply = completion.response.trim();
        if reply.is_empty() {
            return Ok(self.prompt_config.replies.empty_completion.clone());
        }
        Ok(reply.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::chat::CompletionResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingClient {
        answer: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatClient for RecordingClient {
        async fn complete(
            &self,
            prompt: &str
        ) -> Result<CompletionResponse, Box<dyn Error + Send + Sync>> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.answer {
                Some(a) => Ok(CompletionResponse { response: a.clone() }),
                None => Err("quota exceeded".into()),
            }
        }

        fn get_model(&self) -> String {
            "recording".into()
        }

        fn get_base_url(&self) -> Option<String> {
            None
        }
    }

    fn companion(answer: Option<&str>) -> (Companion, Arc<RecordingClient>) {
        let client = Arc::new(RecordingClient {
            answer: answer.map(String::from),
            ..Default::default()
        });
        (Companion::from_parts(client.clone(), PromptConfig::default()), client)
    }

    #[tokio::test]
    async fn test_blank_message_never_reaches_provider() {
        let (companion, client) = companion(Some("hola"));
        let err = companion.reply("   ", None).await.unwrap_err();
        assert!(matches!(err, CompanionError::EmptyMessage));
        assert!(client.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reply_is_trimmed_and_prompt_rendered() {
        let (companion, client) = companion(Some("  Aquí estoy contigo.\n"));
        let reply = companion.reply("me siento triste", Some("paciente")).await.unwrap();
        assert_eq!(reply, "Aquí estoy contigo.");

        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Tu personalidad es: paciente."));
        assert!(prompts[0].contains("Usuario: me siento triste"));
    }

    #[tokio::test]
    async fn test_empty_completion_gets_fallback_text() {
        let (companion, _) = companion(Some(""));
        let reply = companion.reply("hola", None).await.unwrap();
        assert_eq!(reply, "Lo siento, no pude responder.");
    }

    #[tokio::test]
    async fn test_provider_failure_is_upstream_error() {
        let (companion, client) = companion(None);
        let err = companion.reply("hola", None).await.unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");
        assert_eq!(client.prompts.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_no_prompts_path_means_no_reload() {
        let (companion, _) = companion(Some("x"));
        assert!(companion.changed_prompts().unwrap().is_none());
    }
}

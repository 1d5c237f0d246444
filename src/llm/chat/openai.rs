use async_trait::async_trait;
use log::debug;
use reqwest::{Client as HttpClient, header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION}};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;

use super::{ChatClient, CompletionResponse};
use crate::llm::LlmConfig;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAIChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
    max_output_tokens: u32,
    use_chat_completions: bool,
}

#[derive(Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct OpenAIResponsesRequest<'a> {
    model: &'a str,
    input: &'a str,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Deserialize)]
struct OpenAIResponsesResponse {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OpenAIOutputItem>,
}

#[derive(Deserialize)]
struct OpenAIOutputItem {
    #[serde(default)]
    content: Vec<OpenAIOutputContent>,
}

#[derive(Deserialize)]
struct OpenAIOutputContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl OpenAIResponsesResponse {
    /// Prefers the aggregated `output_text`; otherwise joins every `output_text` part.
    fn into_text(self) -> String {
        if let Some(text) = self.output_text.filter(|t| !t.is_empty()) {
            return text;
        }
        self.output
            .into_iter()
            .flat_map(|item| item.content)
            .filter(|part| part.kind == "output_text")
            .filter_map(|part| part.text)
            .collect::<Vec<_>>()
            .join("")
    }
}

impl OpenAIChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        max_output_tokens: u32,
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let chat_model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let use_chat_completions = api_url.contains("/chat/completions");

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| format!("Invalid API key format: {}", e))?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Box::new(e) as Box<dyn StdError + Send + Sync>)?;

        Ok(Self {
            http,
            model: chat_model,
            base_url: api_url,
            max_output_tokens,
            use_chat_completions,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| "OpenAI API key is required".to_string())?;

        Self::new(
            api_key,
            config.completion_model.clone(),
            config.base_url.clone(),
            config.max_output_tokens,
        )
    }

    fn responses_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/responses") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/responses", base)
        } else {
            format!("{}/v1/responses", base)
        }
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T
    ) -> Result<reqwest::Response, Box<dyn StdError + Send + Sync>> {
        let resp = self.http.post(url).json(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(format!("OpenAI API returned {}: {}", status, detail.trim()).into());
        }
        Ok(resp)
    }

    async fn complete_responses(
        &self,
        prompt: &str
    ) -> Result<String, Box<dyn StdError + Send + Sync>> {
        let url = self.responses_url();
        let req = OpenAIResponsesRequest {
            model: &self.model,
            input: prompt,
            max_output_tokens: self.max_output_tokens,
        };
        debug!("OpenAI responses request → {} (model={})", url, self.model);

        let body = self.post_json(&url, &req).await?.json::<OpenAIResponsesResponse>().await?;
        Ok(body.into_text())
    }

    async fn complete_chat(
        &self,
        prompt: &str
    ) -> Result<String, Box<dyn StdError + Send + Sync>> {
        let req = OpenAIChatRequest {
            model: self.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.max_output_tokens,
        };
        debug!("OpenAI chat completions request → {} (model={})", self.base_url, self.model);

        let resp = self.post_json(&self.base_url, &req).await?.json::<OpenAIResponse>().await?;
        let content = resp.choices
            .into_iter()
            .next()
            .ok_or_else(|| "No response from OpenAI API".to_string())?
            .message.content;
        Ok(content)
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(
        &self,
        prompt: &str
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        let response = if self.use_chat_completions {
            self.complete_chat(prompt).await?
        } else {
            self.complete_responses(prompt).await?
        };
        Ok(CompletionResponse { response })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: Option<&str>) -> OpenAIChatClient {
        OpenAIChatClient::new("sk-test".into(), None, base_url.map(String::from), 150).unwrap()
    }

    #[test]
    fn test_responses_url_variants() {
        assert_eq!(client(None).responses_url(), "https://api.openai.com/v1/responses");
        assert_eq!(
            client(Some("http://proxy.local/v1/")).responses_url(),
            "http://proxy.local/v1/responses"
        );
        assert_eq!(
            client(Some("http://proxy.local/v1/responses")).responses_url(),
            "http://proxy.local/v1/responses"
        );
    }

    #[test]
    fn test_chat_completions_detected_from_base_url() {
        assert!(!client(None).use_chat_completions);
        assert!(client(Some("https://api.openai.com/v1/chat/completions")).use_chat_completions);
    }

    #[test]
    fn test_default_model() {
        assert_eq!(client(None).get_model(), "gpt-4o-mini");
    }

    #[test]
    fn test_output_text_takes_precedence() {
        let body: OpenAIResponsesResponse = serde_json::from_str(
            r#"{"output_text":"Aquí estoy.","output":[{"content":[{"type":"output_text","text":"ignored"}]}]}"#
        ).unwrap();
        assert_eq!(body.into_text(), "Aquí estoy.");
    }

    #[test]
    fn test_output_parts_are_joined() {
        let body: OpenAIResponsesResponse = serde_json::from_str(
            r#"{
                "id": "resp_1",
                "output": [
                    {"type": "reasoning", "content": []},
                    {"type": "message", "content": [
                        {"type": "output_text", "text": "Respira. "},
                        {"type": "refusal", "refusal": "no"},
                        {"type": "output_text", "text": "Estoy contigo."}
                    ]}
                ]
            }"#
        ).unwrap();
        assert_eq!(body.into_text(), "Respira. Estoy contigo.");
    }

    #[test]
    fn test_missing_output_yields_empty_text() {
        let body: OpenAIResponsesResponse = serde_json::from_str(r#"{"id":"resp_2"}"#).unwrap();
        assert_eq!(body.into_text(), "");
    }
}

use serde::{ Serialize, Deserialize };

/// Body of `POST /api/chat`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,
}

/// Every answer from `/api/chat` carries a `reply`, errors included.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatReply {
    pub fn ok(reply: impl Into<String>) -> Self {
        Self { reply: reply.into(), error: None }
    }

    pub fn failed(reply: impl Into<String>, error: impl Into<String>) -> Self {
        Self { reply: reply.into(), error: Some(error.into()) }
    }
}

use chrono::{ Local, TimeZone };
use serde::{ Serialize, Deserialize };

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Bot => "BOT",
        }
    }

    /// Marker shown in front of entries in the history list.
    pub fn marker(&self) -> &'static str {
        match self {
            Role::User => "🟦",
            Role::Bot => "🟪",
        }
    }
}

/// One record of the conversation log. `timestamp` is milliseconds since the epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: Role,
    pub text: String,
    pub timestamp: i64,
}

impl ConversationEntry {
    pub fn new(role: Role, text: impl Into<String>, timestamp: i64) -> Self {
        Self { role, text: text.into(), timestamp }
    }

    pub fn local_time(&self) -> String {
        match Local.timestamp_millis_opt(self.timestamp).single() {
            Some(dt) => dt.format("%d/%m/%Y, %H:%M:%S").to_string(),
            None => self.timestamp.to_string(),
        }
    }
}

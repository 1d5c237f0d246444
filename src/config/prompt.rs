use serde::{ Deserialize, Serialize };
use std::error::Error;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use log::{ info, warn };

pub const PERSONALITY_PLACEHOLDER: &str = "{personality}";
pub const MESSAGE_PLACEHOLDER: &str = "{message}";

const DEFAULT_COMPANION_TEMPLATE: &str = "\
Eres AMIKO, un asistente emocional empático. Tu personalidad es: {personality}.
Da apoyo emocional, comprensión y contención sana.
Habla cálido, breve y humano.
No reemplazas a un psicólogo profesional.

Usuario: {message}
AMIKO:";

#[derive(Debug)]
pub enum PromptError {
    MissingPlaceholder(String),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::MissingPlaceholder(key) =>
                write!(f, "Prompt template is missing the '{}' placeholder", key),
            PromptError::IoError(e) => write!(f, "Prompt file IO error: {}", e),
            PromptError::JsonError(e) => write!(f, "Prompt JSON parsing error: {}", e),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(e) => Some(e),
            PromptError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        PromptError::IoError(err)
    }
}

impl From<serde_json::Error> for PromptError {
    fn from(err: serde_json::Error) -> Self {
        PromptError::JsonError(err)
    }
}

/// User-facing strings sent back by the chat endpoint.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ReplyTexts {
    pub missing_message: String,
    pub empty_completion: String,
    pub processing_error: String,
}

impl Default for ReplyTexts {
    fn default() -> Self {
        Self {
            missing_message: "No enviaste ningún mensaje.".to_string(),
            empty_completion: "Lo siento, no pude responder.".to_string(),
            processing_error: "Hubo un error procesando tu mensaje.".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PromptConfig {
    pub companion_template: String,
    #[serde(default = "default_personality")]
    pub default_personality: String,
    #[serde(default)]
    pub replies: ReplyTexts,
    #[serde(skip)]
    pub last_loaded: Option<SystemTime>,
}

fn default_personality() -> String {
    "cálida y cercana".to_string()
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            companion_template: DEFAULT_COMPANION_TEMPLATE.to_string(),
            default_personality: default_personality(),
            replies: ReplyTexts::default(),
            last_loaded: None,
        }
    }
}

impl PromptConfig {
    fn validate(&self) -> Result<(), PromptError> {
        if !self.companion_template.contains(MESSAGE_PLACEHOLDER) {
            return Err(PromptError::MissingPlaceholder(MESSAGE_PLACEHOLDER.to_string()));
        }
        Ok(())
    }
}

pub fn load_prompts<P: AsRef<Path>>(path: P) -> Result<Arc<PromptConfig>, PromptError> {
    let file_content = fs::read_to_string(&path)?;
    let mut config: PromptConfig = serde_json::from_str(&file_content)?;
    config.validate()?;
    config.last_loaded = Some(SystemTime::now());
    Ok(Arc::new(config))
}

/// Like [`load_prompts`], but a missing file yields the built-in prompt.
pub fn load_prompts_or_default<P: AsRef<Path>>(path: P) -> Result<Arc<PromptConfig>, PromptError> {
    match load_prompts(&path) {
        Ok(config) => {
            info!("Loaded prompts from {}", path.as_ref().display());
            Ok(config)
        }
        Err(PromptError::IoError(e)) if e.kind() == ErrorKind::NotFound => {
            warn!(
                "Prompts file {} not found, using built-in companion prompt",
                path.as_ref().display()
            );
            Ok(Arc::new(PromptConfig::default()))
        }
        Err(e) => Err(e),
    }
}

pub fn reload_prompts_if_changed<P: AsRef<Path>>(
    path: P,
    current_config: &Arc<PromptConfig>
) -> Result<Option<Arc<PromptConfig>>, PromptError> {
    let metadata = match fs::metadata(&path) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Ok(None);
        }
        Err(e) => {
            return Err(e.into());
        }
    };

    if let Ok(modified) = metadata.modified() {
        let stale = match current_config.last_loaded {
            Some(last_loaded) => modified > last_loaded,
            None => true,
        };
        if stale {
            info!("Prompts file changed, reloading...");
            return Ok(Some(load_prompts(path)?));
        }
    }
    Ok(None)
}

pub fn render_companion_prompt(
    config: &PromptConfig,
    personality: Option<&str>,
    message: &str
) -> String {
    let personality = personality
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(&config.default_personality);

    config.companion_template
        .replace(PERSONALITY_PLACEHOLDER, personality)
        .replace(MESSAGE_PLACEHOLDER, message)
}

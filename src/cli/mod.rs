use clap::{ Args as ClapArgs, Parser, Subcommand };

use crate::llm::{ LlmConfig, LlmType, DEFAULT_MAX_OUTPUT_TOKENS };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the backend that relays chat messages to the language model.
    Serve(ServeArgs),
    /// Open an interactive chat session in the terminal.
    Chat(ChatArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ServeArgs {
    /// Interface the HTTP server binds to.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port the HTTP server listens on.
    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    // --- Chat LLM Provider Args ---
    /// Type of LLM provider for chat completion (openai, ollama, anthropic, gemini, deepseek, xai, groq, mock)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "openai")]
    pub chat_llm_type: String,

    /// Base URL for the Chat LLM provider API (e.g., http://localhost:11434 for Ollama)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let adapters handle defaults if None
    pub chat_base_url: Option<String>,

    /// API Key for the Chat LLM provider. Falls back to OPENAI_API_KEY when empty.
    #[arg(long, env = "CHAT_API_KEY", default_value = "", hide_env_values = true)]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., gpt-4o-mini, llama3.2)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on adapter defaults if None
    pub chat_model: Option<String>,

    /// Upper bound on tokens generated per reply.
    #[arg(long, env = "MAX_OUTPUT_TOKENS", default_value_t = DEFAULT_MAX_OUTPUT_TOKENS)]
    pub max_output_tokens: u32,

    // --- General App Args ---
    /// Path to the prompt configuration file.
    #[arg(long, env = "PROMPTS_PATH", default_value = "json/prompts.json")]
    pub prompts_path: String,

    /// Directory of static web assets served outside /api.
    #[arg(long, env = "STATIC_DIR", default_value = "public")]
    pub static_dir: String,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

impl ServeArgs {
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn chat_llm_config(&self) -> Result<LlmConfig, Box<dyn std::error::Error + Send + Sync>> {
        let llm_type: LlmType = self.chat_llm_type.parse()?;
        let api_key = Some(self.chat_api_key.clone())
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()));

        Ok(LlmConfig {
            llm_type,
            api_key,
            completion_model: self.chat_model.clone(),
            base_url: self.chat_base_url.clone(),
            max_output_tokens: self.max_output_tokens,
        })
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ChatArgs {
    /// Base URL of a running `amiko serve` backend.
    #[arg(long, env = "AMIKO_BACKEND_URL", default_value = "http://localhost:3000")]
    pub backend_url: String,

    /// Answer locally with canned replies instead of calling the backend.
    #[arg(long, env = "AMIKO_MOCK", default_value = "false")]
    pub mock: bool,

    /// Personality forwarded with every message.
    #[arg(long, env = "AMIKO_PERSONALITY")]
    pub personality: Option<String>,

    /// Name shown for the companion.
    #[arg(long, env = "AMIKO_BOT_NAME", default_value = "AMIKO")]
    pub bot_name: String,

    #[command(flatten)]
    pub history: HistoryArgs,

    /// Disable the terminal bell used for send/receive cues.
    #[arg(long, env = "AMIKO_NO_SOUNDS", default_value = "false")]
    pub no_sounds: bool,

    /// Emit a short vibration cue on send.
    #[arg(long, env = "AMIKO_VIBRATE", default_value = "false")]
    pub vibrate: bool,

    /// Skip the intro splash.
    #[arg(long, env = "AMIKO_SKIP_SPLASH", default_value = "false")]
    pub skip_splash: bool,

    /// Directory transcripts are exported to.
    #[arg(long, env = "AMIKO_TRANSCRIPT_DIR", default_value = ".")]
    pub transcript_dir: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct HistoryArgs {
    /// History chat store type (file, redis, memory)
    #[arg(long, env = "HISTORY_TYPE", default_value = "file")]
    pub history_type: String,

    /// History store location: a JSON file path, or a redis URL (e.g., redis://127.0.0.1:6379)
    #[arg(long, env = "HISTORY_HOST", default_value = ".amiko/storage.json")]
    pub history_host: String,

    /// Prefix for Redis history keys.
    #[arg(long, env = "HISTORY_REDIS_PREFIX", default_value = "amiko:")]
    pub history_redis_prefix: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_defaults() {
        let args = Args::try_parse_from(["amiko", "serve", "--host", "127.0.0.1", "--port", "8080"])
            .unwrap();
        let Command::Serve(serve) = args.command else { panic!("expected serve") };
        assert_eq!(serve.server_addr(), "127.0.0.1:8080");
        assert_eq!(serve.max_output_tokens, 150);
        assert_eq!(serve.prompts_path, "json/prompts.json");
        assert!(!serve.enable_tls);
    }

    #[test]
    fn test_chat_flags() {
        let args = Args::try_parse_from([
            "amiko", "chat", "--mock", "--history-type", "memory", "--bot-name", "Luz",
        ]).unwrap();
        let Command::Chat(chat) = args.command else { panic!("expected chat") };
        assert!(chat.mock);
        assert_eq!(chat.history.history_type, "memory");
        assert_eq!(chat.bot_name, "Luz");
    }

    #[test]
    fn test_llm_config_from_flags() {
        let args = Args::try_parse_from([
            "amiko", "serve", "--chat-llm-type", "ollama", "--chat-model", "llama3.2",
            "--max-output-tokens", "64",
        ]).unwrap();
        let Command::Serve(serve) = args.command else { panic!("expected serve") };
        let config = serve.chat_llm_config().unwrap();
        assert_eq!(config.llm_type, LlmType::Ollama);
        assert_eq!(config.completion_model.as_deref(), Some("llama3.2"));
        assert_eq!(config.max_output_tokens, 64);
    }

    #[test]
    fn test_unknown_llm_type_is_an_error() {
        let args = Args::try_parse_from(["amiko", "serve", "--chat-llm-type", "palm"]).unwrap();
        let Command::Serve(serve) = args.command else { panic!("expected serve") };
        assert!(serve.chat_llm_config().is_err());
    }
}

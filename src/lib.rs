pub mod cli;
pub mod client;
pub mod companion;
pub mod config;
pub mod history;
pub mod llm;
pub mod models;
pub mod server;

use cli::{ Args, ChatArgs, Command, ServeArgs };
use companion::Companion;
use log::info;
use server::Server;
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    match args.command {
        Command::Serve(serve) => run_server(serve).await,
        Command::Chat(chat) => run_chat(chat).await,
    }
}

async fn run_server(args: ServeArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr());
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Chat Model: {}", args.chat_model.as_deref().unwrap_or("(provider default)"));
    info!("Max Output Tokens: {}", args.max_output_tokens);
    info!("Prompts Path: {}", args.prompts_path);
    info!("Static Dir: {}", args.static_dir);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let companion = Companion::new(&args)?;
    info!("Starting server on: {}", args.server_addr());
    let server = Server::new(companion, args);
    server.run().await
}

async fn run_chat(args: ChatArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Chat Configuration ---");
    info!("Backend: {}", if args.mock { "mock" } else { args.backend_url.as_str() });
    info!("History Store Type: {}", args.history.history_type);
    info!("History Store Host: {}", args.history.history_host);
    info!("-------------------------");

    client::run_chat(args).await
}

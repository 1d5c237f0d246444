use crate::cli::ServeArgs;
use crate::companion::{ Companion, CompanionError };
use crate::models::chat::{ ChatReply, ChatRequest };
use std::error::Error;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use axum::{
    routing::post,
    Router,
    extract::{ State, rejection::JsonRejection },
    response::{ IntoResponse, Response },
    http::StatusCode,
    Json,
};
use axum_server::Handle;
use tower_http::cors::{ Any, CorsLayer };
use tower_http::services::ServeDir;
use log::{ info, warn, error };

#[derive(Clone)]
struct AppState {
    companion: Arc<RwLock<Companion>>,
}

pub fn build_router(companion: Arc<RwLock<Companion>>, static_dir: impl AsRef<Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(cors)
        .with_state(AppState { companion })
}

async fn resolve_addr(addr: &str) -> Result<SocketAddr, Box<dyn Error + Send + Sync>> {
    tokio::net::lookup_host(addr)
        .await
        .map_err(|e| format!("Invalid server address '{}': {}", addr, e))?
        .next()
        .ok_or_else(|| format!("Server address '{}' did not resolve", addr).into())
}

pub async fn start_http_server(
    args: &ServeArgs,
    companion: Arc<RwLock<Companion>>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = resolve_addr(&args.server_addr()).await?;
    let app = build_router(companion, &args.static_dir);

    if args.enable_tls {
        let (cert_path, key_path) = match (&args.tls_cert_path, &args.tls_key_path) {
            (Some(cert), Some(key)) => (cert, key),
            (Some(_), None) | (None, Some(_)) => {
                error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                return Err("Missing TLS certificate or key path".into());
            }
            (None, None) => {
                error!("--enable-tls was set but no certificate/key paths provided.");
                return Err("TLS enabled without cert/key".into());
            }
        };
        info!("TLS enabled. Loading certificate from '{}' and key from '{}'", cert_path, key_path);

        // Both ring and aws-lc-rs may be compiled in; pick one explicitly.
        let _ = rustls::crypto::ring::default_provider().install_default();
        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            cert_path,
            key_path
        ).await?;

        let handle = Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown_handle.graceful_shutdown(Some(Duration::from_secs(5)));
        });

        info!("Starting HTTPS API server on: https://{}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(app.into_make_service())
            .await?;
    } else {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e)
        })?;
        info!("Starting HTTP API server on: http://{}", addr);
        serve(listener, app).await?;
    }

    info!("Server stopped");
    Ok(())
}

/// Serves `app` on an already bound listener until Ctrl-C.
pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn refresh_prompts(companion: &RwLock<Companion>) {
    let changed = companion.read().await.changed_prompts();
    match changed {
        Ok(Some(config)) => companion.write().await.install_prompts(config),
        Ok(None) => {}
        Err(e) => warn!("Keeping current prompts, reload failed: {}", e),
    }
}

async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    refresh_prompts(&state.companion).await;
    let companion = state.companion.read().await.clone();

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Rejected chat request body: {}", rejection);
            ChatRequest::default()
        }
    };
    let message = request.message.unwrap_or_default();

    match companion.reply(&message, request.personality.as_deref()).await {
        Ok(reply) => (StatusCode::OK, Json(ChatReply::ok(reply))).into_response(),
        Err(CompanionError::EmptyMessage) => {
            let reply = companion.replies().missing_message.clone();
            (StatusCode::BAD_REQUEST, Json(ChatReply::ok(reply))).into_response()
        }
        Err(CompanionError::Upstream(detail)) => {
            error!("Chat request failed: {}", detail);
            let reply = companion.replies().processing_error.clone();
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ChatReply::failed(reply, detail))).into_response()
        }
    }
}

use super::*;
use crate::common::{mask_api_key, ping};
use crate::config::ServerConfig;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Room for multipart/JSON overhead on top of the raw audio limit.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// All routes of the service.
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_audio_bytes + BODY_LIMIT_SLACK;

    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/", get(ping))
        .route("/health", get(ping))
        .route("/soap", post(generate_soap))
        .route("/soap/pdf", post(render_pdf))
        .route("/soap/from-audio", post(soap_from_audio))
        .route("/transcribe", post(transcribe_audio))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build state from config, bind and serve until the process stops.
pub async fn serve(config: ServerConfig) -> Result<(), SoapError> {
    info!("LLM key loaded: {}", mask_api_key(&config.llm.api_key));
    info!(
        "Using model {} at {}",
        config.llm.model, config.llm.base_url
    );

    let state = Arc::new(AppState {
        llm: SoapLlmService::new(config.llm.clone())?,
        transcriber: TranscriptionService::new(config.transcription.clone())?,
        max_audio_bytes: config.max_audio_bytes,
    });
    let app = build_router(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| SoapError::Config(format!("Failed to bind {}: {e}", config.bind_addr)))?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| SoapError::Config(format!("Failed to read local address: {e}")))?;
    info!("SOAP notes server listening on {}", local_addr);

    axum::serve(listener, app.into_make_service())
        .await
        .map_err(|e| SoapError::Config(format!("Server error: {e}")))
}

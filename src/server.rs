use crate::config::Config;
use crate::engines::BackendInfo;
use crate::error::ScanError;
use crate::preprocessing::PreprocessingStats;
use crate::processor::DocumentProcessor;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 16 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<DocumentProcessor>,
    pub max_file_size: usize,
}

/// Processing response
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub text: String,
    pub processed_png_base64: String,
    pub engine: Option<&'static str>,
    pub rectified: bool,
    pub width: u32,
    pub height: u32,
    pub warnings: Vec<String>,
    pub processing_time_ms: u64,
    pub preprocessing: PreprocessingStats,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub backends: Vec<BackendInfo>,
    pub max_file_size_bytes: usize,
}

/// Build the HTTP routes around an already-configured processor
pub fn router(state: AppState) -> Router {
    let max_file_size = state.max_file_size;

    Router::new()
        .route("/process", post(handle_process))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(
            max_file_size.saturating_add(MULTIPART_OVERHEAD),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);

    // Local engines may download models on first start
    let init_config = config.clone();
    let processor = tokio::task::spawn_blocking(move || DocumentProcessor::new(&init_config)).await?;

    let state = AppState {
        processor: Arc::new(processor),
        max_file_size: config.max_file_size,
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// Handle document uploads
async fn handle_process(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, ScanError> {
    let start = Instant::now();

    let mut file_data: Option<Bytes> = None;

    // Parse multipart form
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, state.max_file_size, "Failed to parse multipart"))?
    {
        if field.name() == Some("file") {
            file_data = Some(field.bytes().await.map_err(|e| {
                multipart_error(e, state.max_file_size, "Failed to read file data")
            })?);
        }
    }

    let data = file_data.ok_or(ScanError::MissingFile)?;

    if data.len() > state.max_file_size {
        return Err(ScanError::ImageTooLarge {
            size: data.len(),
            max: state.max_file_size,
        });
    }

    let processor = state.processor.clone();
    let artifact = tokio::task::spawn_blocking(move || processor.process(&data))
        .await
        .map_err(|e| ScanError::Internal(format!("Processing task failed: {}", e)))??;

    let processing_time_ms = start.elapsed().as_millis() as u64;
    let (width, height) = artifact.dimensions();

    tracing::info!(
        "Processed {}x{} page in {}ms (rectified: {}, engine: {}, text length: {})",
        width,
        height,
        processing_time_ms,
        artifact.rectified(),
        artifact.engine().unwrap_or("none"),
        artifact.text().len()
    );

    Ok(Json(ProcessResponse {
        text: artifact.text().to_string(),
        processed_png_base64: artifact.png_base64(),
        engine: artifact.engine(),
        rectified: artifact.rectified(),
        width,
        height,
        warnings: artifact.warnings().to_vec(),
        processing_time_ms,
        preprocessing: artifact.preprocessing().clone(),
    }))
}

/// Body-limit rejections keep their 413; everything else is a bad request
fn multipart_error(e: MultipartError, max: usize, context: &str) -> ScanError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ScanError::UploadTooLarge { max }
    } else {
        ScanError::InvalidRequest(format!("{}: {}", context, e))
    }
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        backends: state.processor.backends_info(),
        max_file_size_bytes: state.max_file_size,
    })
}

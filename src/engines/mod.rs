//! OCR backend implementations
//!
//! The cloud backend is always compiled; local engines are conditionally
//! compiled based on feature flags.

#[cfg(any(feature = "engine-ocrs", feature = "engine-leptess"))]
mod cache;

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

#[cfg(feature = "engine-leptess")]
pub mod leptess;

pub mod vision;

use crate::config::Config;
use crate::engine::OcrBackend;
use serde::Serialize;
use std::sync::Arc;

/// Information about a configured backend
#[derive(Debug, Clone, Serialize)]
pub struct BackendInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub tier: &'static str,
}

impl BackendInfo {
    pub fn of(backend: &dyn OcrBackend) -> Self {
        Self {
            name: backend.name(),
            description: backend.description(),
            tier: backend.tier().as_str(),
        }
    }
}

/// Resolve the backend list once at startup, primary first.
///
/// The cloud backend is present exactly when an API key is configured. A
/// local engine that fails to initialize (e.g. models cannot be downloaded)
/// is logged and left out. An empty list is valid; extraction then always
/// yields empty text.
pub fn build_backends(config: &Config) -> Vec<Arc<dyn OcrBackend>> {
    let mut backends: Vec<Arc<dyn OcrBackend>> = Vec::new();

    match &config.vision {
        Some(vision_config) => {
            backends.push(Arc::new(vision::VisionBackend::new(vision_config)));
        }
        None => tracing::info!("No Cloud Vision API key, primary backend disabled"),
    }

    if config.local_ocr {
        push_local_engines(config, &mut backends);
    } else {
        tracing::info!("Local OCR disabled");
    }

    if backends.is_empty() {
        tracing::warn!("No OCR backends available, responses will carry empty text");
    }

    backends
}

#[cfg_attr(not(feature = "engine-leptess"), allow(unused_variables))]
fn push_local_engines(config: &Config, backends: &mut Vec<Arc<dyn OcrBackend>>) {
    #[cfg(feature = "engine-ocrs")]
    {
        tracing::info!("Initializing ocrs engine...");
        match ocrs::OcrsBackend::new() {
            Ok(engine) => backends.push(Arc::new(engine)),
            Err(e) => tracing::warn!(error = %e, "ocrs engine unavailable"),
        }
    }

    #[cfg(feature = "engine-leptess")]
    {
        tracing::info!("Initializing leptess engine...");
        match leptess::LeptessBackend::new(&config.default_language) {
            Ok(engine) => backends.push(Arc::new(engine)),
            Err(e) => tracing::warn!(error = %e, "leptess engine unavailable"),
        }
    }
}

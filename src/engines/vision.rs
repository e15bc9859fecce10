//! Google Cloud Vision engine implementation
//!
//! Sends the processed PNG to the `images:annotate` REST endpoint with a
//! `TEXT_DETECTION` feature and returns the full-page annotation.

use crate::config::VisionConfig;
use crate::engine::{BackendError, OcrBackend, OcrInput, Tier};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use ureq::Agent;

/// Cloud OCR engine, the primary tier
pub struct VisionBackend {
    agent: Agent,
    endpoint: String,
    api_key: String,
}

impl VisionBackend {
    pub fn new(config: &VisionConfig) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .http_status_as_error(false)
            .build()
            .into();

        tracing::info!(
            endpoint = %config.endpoint,
            timeout_secs = config.timeout.as_secs(),
            "Cloud Vision backend configured"
        );

        Self {
            agent,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

impl OcrBackend for VisionBackend {
    fn name(&self) -> &'static str {
        "vision"
    }

    fn description(&self) -> &'static str {
        "Google Cloud Vision text detection"
    }

    fn tier(&self) -> Tier {
        Tier::Primary
    }

    fn detect_text(&self, input: &OcrInput<'_>) -> Result<String, BackendError> {
        let request = AnnotateRequest::text_detection(input.png);

        let mut response = self
            .agent
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .send_json(&request)
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = response.status();
        let body: AnnotateResponse = response.body_mut().read_json().map_err(|e| {
            BackendError::Response(format!("HTTP {}: unreadable body: {}", status.as_u16(), e))
        })?;

        if !status.is_success() && body.error.is_none() {
            return Err(BackendError::Response(format!("HTTP {}", status.as_u16())));
        }

        text_from_response(body)
    }
}

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<ImageRequest>,
}

#[derive(Debug, Serialize)]
struct ImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

impl AnnotateRequest {
    fn text_detection(png: &[u8]) -> Self {
        Self {
            requests: vec![ImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(png),
                },
                features: vec![Feature {
                    kind: "TEXT_DETECTION",
                }],
            }],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
    error: Option<Status>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

/// Pull the page text out of an annotate response. The first text
/// annotation covers the whole image; the rest are individual words.
fn text_from_response(body: AnnotateResponse) -> Result<String, BackendError> {
    if let Some(status) = body.error {
        return Err(BackendError::Response(format!(
            "code {}: {}",
            status.code, status.message
        )));
    }

    let Some(first) = body.responses.into_iter().next() else {
        return Ok(String::new());
    };

    if let Some(status) = first.error {
        return Err(BackendError::Recognition(format!(
            "code {}: {}",
            status.code, status.message
        )));
    }

    Ok(first
        .text_annotations
        .into_iter()
        .next()
        .map(|annotation| annotation.description)
        .unwrap_or_default())
}

use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "docscan-server")]
#[command(about = "Document photo normalization and OCR server")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "DOCSCAN_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "DOCSCAN_PORT", default_value = "9292")]
    pub port: u16,

    /// Maximum upload size in bytes (default: 50MB)
    #[arg(long, env = "DOCSCAN_MAX_FILE_SIZE", default_value = "52428800")]
    pub max_file_size: usize,

    /// Google Cloud Vision API key; the cloud backend is disabled without one
    #[arg(long, env = "GOOGLE_VISION_API_KEY", hide_env_values = true)]
    pub vision_api_key: Option<String>,

    /// Cloud Vision annotate endpoint
    #[arg(
        long,
        env = "GOOGLE_VISION_ENDPOINT",
        default_value = "https://vision.googleapis.com/v1/images:annotate"
    )]
    pub vision_endpoint: String,

    /// Timeout for a single Cloud Vision request, in seconds
    #[arg(long, env = "GOOGLE_VISION_TIMEOUT_SECS", default_value = "10")]
    pub vision_timeout_secs: u64,

    /// Do not initialize any local OCR engine
    #[arg(long, env = "DOCSCAN_NO_LOCAL_OCR")]
    pub no_local_ocr: bool,

    /// Language for the Tesseract engine (e.g., "eng", "deu", "fra")
    #[arg(long, env = "DOCSCAN_DEFAULT_LANGUAGE", default_value = "eng")]
    pub default_language: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    pub vision: Option<VisionConfig>,
    pub local_ocr: bool,
    pub default_language: String,
}

/// Cloud Vision settings. Present only when an API key was supplied, which
/// makes it the single switch for the primary backend.
#[derive(Clone)]
pub struct VisionConfig {
    pub api_key: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for VisionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionConfig")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let vision = args
            .vision_api_key
            .filter(|key| !key.trim().is_empty())
            .map(|api_key| VisionConfig {
                api_key,
                endpoint: args.vision_endpoint,
                timeout: Duration::from_secs(args.vision_timeout_secs.max(1)),
            });

        Self {
            host: args.host,
            port: args.port,
            max_file_size: args.max_file_size,
            vision,
            local_ocr: !args.no_local_ocr,
            default_language: args.default_language,
        }
    }
}

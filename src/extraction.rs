//! Two-tier text extraction
//!
//! Backends are tried in priority order, cloud first, and the walk stops at
//! the first one that returns non-empty text. A failing backend only adds a
//! warning; extraction as a whole cannot fail.

use crate::engine::{OcrBackend, OcrInput, Tier};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Progress of one extraction run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionState {
    NotStarted,
    TriedPrimary,
    TriedFallback,
    Done,
}

impl ExtractionState {
    /// State after an attempt on a backend of the given tier
    fn after(self, tier: Tier) -> Self {
        match (self, tier) {
            (Self::Done, _) => Self::Done,
            (_, Tier::Fallback) => Self::TriedFallback,
            (Self::TriedFallback, Tier::Primary) => Self::TriedFallback,
            (_, Tier::Primary) => Self::TriedPrimary,
        }
    }
}

/// Text found for one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrResult {
    /// Extracted text, empty when no backend produced any
    pub text: String,
    /// Backend that produced `text`
    pub engine: Option<&'static str>,
    /// One entry per backend that failed
    pub warnings: Vec<String>,
    /// Backends that were called, in order
    pub attempted: Vec<&'static str>,
}

/// Walks an ordered list of OCR backends until one finds text
#[derive(Clone, Default)]
pub struct TextExtractor {
    backends: Vec<Arc<dyn OcrBackend>>,
}

impl TextExtractor {
    /// Backends are sorted by tier; the relative order within a tier is kept
    pub fn new(mut backends: Vec<Arc<dyn OcrBackend>>) -> Self {
        backends.sort_by_key(|backend| match backend.tier() {
            Tier::Primary => 0,
            Tier::Fallback => 1,
        });
        Self { backends }
    }

    pub fn backends(&self) -> &[Arc<dyn OcrBackend>] {
        &self.backends
    }

    pub fn extract(&self, input: &OcrInput<'_>) -> OcrResult {
        let mut state = ExtractionState::NotStarted;
        let mut warnings = Vec::new();
        let mut attempted = Vec::new();

        for backend in &self.backends {
            let name = backend.name();
            let tier = backend.tier();
            attempted.push(name);

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| backend.detect_text(input)));
            state = state.after(tier);

            match outcome {
                Ok(Ok(text)) if !text.is_empty() => {
                    state = ExtractionState::Done;
                    info!(engine = name, %tier, chars = text.len(), ?state, "Text extracted");
                    return OcrResult {
                        text,
                        engine: Some(name),
                        warnings,
                        attempted,
                    };
                }
                Ok(Ok(_)) => {
                    debug!(engine = name, %tier, "Backend found no text");
                }
                Ok(Err(e)) => {
                    warn!(engine = name, %tier, error = %e, "OCR backend failed");
                    warnings.push(format!("{}: {}", name, e));
                }
                Err(_) => {
                    warn!(engine = name, %tier, "OCR backend panicked");
                    warnings.push(format!("{}: backend panicked", name));
                }
            }
        }

        debug!(?state, attempts = attempted.len(), "No backend produced text");
        OcrResult {
            text: String::new(),
            engine: None,
            warnings,
            attempted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::BackendError;
    use image::GrayImage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Reply {
        Text(&'static str),
        Fail,
        Panic,
    }

    struct StubBackend {
        name: &'static str,
        tier: Tier,
        reply: Reply,
        calls: AtomicUsize,
    }

    impl StubBackend {
        fn new(name: &'static str, tier: Tier, reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                name,
                tier,
                reply,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl OcrBackend for StubBackend {
        fn name(&self) -> &'static str {
            self.name
        }

        fn description(&self) -> &'static str {
            "stub"
        }

        fn tier(&self) -> Tier {
            self.tier
        }

        fn detect_text(&self, _input: &OcrInput<'_>) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::Fail => Err(BackendError::Request("connection refused".into())),
                Reply::Panic => panic!("engine crashed"),
            }
        }
    }

    fn run(backends: Vec<Arc<dyn OcrBackend>>) -> OcrResult {
        let image = GrayImage::new(4, 4);
        let input = OcrInput {
            png: &[],
            image: &image,
        };
        TextExtractor::new(backends).extract(&input)
    }

    #[test]
    fn test_fallback_used_when_primary_unreachable() {
        let primary = StubBackend::new("cloud", Tier::Primary, Reply::Fail);
        let fallback = StubBackend::new("local", Tier::Fallback, Reply::Text("HELLO WORLD"));

        let result = run(vec![primary.clone(), fallback.clone()]);

        assert_eq!(result.text, "HELLO WORLD");
        assert_eq!(result.engine, Some("local"));
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("connection refused"));
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[test]
    fn test_all_backends_failing_yields_empty_text() {
        let primary = StubBackend::new("cloud", Tier::Primary, Reply::Fail);
        let fallback = StubBackend::new("local", Tier::Fallback, Reply::Fail);

        let result = run(vec![primary, fallback]);

        assert_eq!(result.text, "");
        assert_eq!(result.engine, None);
        assert_eq!(result.warnings.len(), 2);
        assert_eq!(result.attempted, ["cloud", "local"]);
    }

    #[test]
    fn test_primary_success_skips_fallback() {
        let primary = StubBackend::new("cloud", Tier::Primary, Reply::Text("Invoice #42"));
        let fallback = StubBackend::new("local", Tier::Fallback, Reply::Text("unused"));

        let result = run(vec![primary.clone(), fallback.clone()]);

        assert_eq!(result.text, "Invoice #42");
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 0);
    }

    #[test]
    fn test_empty_primary_text_falls_through() {
        let primary = StubBackend::new("cloud", Tier::Primary, Reply::Text(""));
        let fallback = StubBackend::new("local", Tier::Fallback, Reply::Text("found it"));

        let result = run(vec![primary, fallback]);

        assert_eq!(result.text, "found it");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_whitespace_primary_text_is_kept() {
        let primary = StubBackend::new("cloud", Tier::Primary, Reply::Text("  \n\t"));
        let fallback = StubBackend::new("local", Tier::Fallback, Reply::Text("found it"));

        let result = run(vec![primary, fallback.clone()]);

        assert_eq!(result.text, "  \n\t");
        assert_eq!(result.engine, Some("cloud"));
        assert_eq!(fallback.calls(), 0);
    }

    #[test]
    fn test_panicking_backend_is_contained() {
        let primary = StubBackend::new("cloud", Tier::Primary, Reply::Panic);
        let fallback = StubBackend::new("local", Tier::Fallback, Reply::Text("safe"));

        let result = run(vec![primary, fallback]);

        assert_eq!(result.text, "safe");
        assert!(result.warnings[0].contains("panicked"));
    }

    #[test]
    fn test_primary_tried_first_regardless_of_input_order() {
        let fallback = StubBackend::new("local", Tier::Fallback, Reply::Text("local text"));
        let primary = StubBackend::new("cloud", Tier::Primary, Reply::Text("cloud text"));

        let result = run(vec![fallback.clone(), primary]);

        assert_eq!(result.engine, Some("cloud"));
        assert_eq!(fallback.calls(), 0);
    }

    #[test]
    fn test_no_backends_is_valid() {
        let result = run(Vec::new());
        assert_eq!(result.text, "");
        assert!(result.attempted.is_empty());
    }

    #[test]
    fn test_state_transitions() {
        use ExtractionState::*;
        assert_eq!(NotStarted.after(Tier::Primary), TriedPrimary);
        assert_eq!(TriedPrimary.after(Tier::Fallback), TriedFallback);
        assert_eq!(NotStarted.after(Tier::Fallback), TriedFallback);
        assert_eq!(TriedFallback.after(Tier::Primary), TriedFallback);
        assert_eq!(Done.after(Tier::Fallback), Done);
    }
}

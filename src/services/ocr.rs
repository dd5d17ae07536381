// OCR Gateway
// Optional text-recognition capability behind a hard timeout

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Text-recognition capability boundary. Implementations may be slow or
/// absent; the analyzer treats empty or failed output identically to "no text
/// found" and never lets this path block the rest of the analysis.
pub trait OcrGateway: Send + Sync {
    /// Whether an engine is actually wired up. `false` skips the call
    /// entirely and the dependent details are omitted.
    fn is_available(&self) -> bool;

    /// Blocking text recognition over raster or PDF bytes.
    fn recognize(&self, bytes: &[u8]) -> anyhow::Result<String>;
}

/// The capability selected when no OCR engine is installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableOcr;

impl OcrGateway for UnavailableOcr {
    fn is_available(&self) -> bool {
        false
    }

    fn recognize(&self, _bytes: &[u8]) -> anyhow::Result<String> {
        anyhow::bail!("no OCR engine installed")
    }
}

/// Run the gateway off the async runtime with a hard timeout. Timeout, panic,
/// or engine error all degrade to `None`; the caller reports reduced
/// confidence instead of failing the analysis.
pub async fn recognize_with_timeout(
    gateway: Arc<dyn OcrGateway>,
    bytes: Vec<u8>,
    timeout: Duration,
) -> Option<String> {
    if !gateway.is_available() {
        return None;
    }

    let task = tokio::task::spawn_blocking(move || gateway.recognize(&bytes));
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(text))) => {
            let text = text.trim().to_string();
            if text.is_empty() {
                None
            } else {
                Some(text)
            }
        }
        Ok(Ok(Err(err))) => {
            debug!(error = %err, "OCR engine failed; continuing without text");
            None
        }
        Ok(Err(join_err)) => {
            warn!(error = %join_err, "OCR task aborted; continuing without text");
            None
        }
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "OCR timed out; continuing without text");
            None
        }
    }
}

/// First 300 chars plus an ellipsis when longer, for result previews.
pub fn preview(text: &str) -> String {
    const PREVIEW_CHARS: usize = 300;
    let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedOcr(&'static str);

    impl OcrGateway for FixedOcr {
        fn is_available(&self) -> bool {
            true
        }
        fn recognize(&self, _bytes: &[u8]) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct SlowOcr;

    impl OcrGateway for SlowOcr {
        fn is_available(&self) -> bool {
            true
        }
        fn recognize(&self, _bytes: &[u8]) -> anyhow::Result<String> {
            std::thread::sleep(Duration::from_secs(5));
            Ok("too late".to_string())
        }
    }

    #[tokio::test]
    async fn test_unavailable_gateway_yields_none() {
        let out =
            recognize_with_timeout(Arc::new(UnavailableOcr), vec![1, 2, 3], Duration::from_secs(1))
                .await;
        assert_eq!(out, None);
    }

    #[tokio::test]
    async fn test_fixed_gateway_returns_text() {
        let out = recognize_with_timeout(
            Arc::new(FixedOcr("Steps: 20, Sampler: Euler")),
            vec![],
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(out.as_deref(), Some("Steps: 20, Sampler: Euler"));
    }

    #[tokio::test]
    async fn test_blank_output_is_no_text_found() {
        let out = recognize_with_timeout(Arc::new(FixedOcr("   \n")), vec![], Duration::from_secs(1))
            .await;
        assert_eq!(out, None);
    }

    #[tokio::test]
    async fn test_timeout_degrades_to_none() {
        let out =
            recognize_with_timeout(Arc::new(SlowOcr), vec![], Duration::from_millis(50)).await;
        assert_eq!(out, None);
    }

    #[test]
    fn test_preview_truncation() {
        let long = "x".repeat(400);
        let p = preview(&long);
        assert_eq!(p.chars().count(), 301);
        assert!(p.ends_with('…'));
        assert_eq!(preview("short"), "short");
    }
}

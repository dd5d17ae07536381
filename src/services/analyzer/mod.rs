// Analyzer Facade
// Authenticity analysis core organized into specialized submodules:
// - content_type: signature+extension content category detection
// - metadata: embedded container metadata (EXIF, PNG text, PDF info dict)
// - keywords: AI generator marker scanning
// - image_signals: pixel-level statistical/forensic signals
// - text_signals: lexical statistics
// - scoring: deterministic weight-table scoring

pub mod content_type;
pub mod image_signals;
pub mod keywords;
pub mod metadata;
pub mod scoring;
pub mod text_signals;

pub use content_type::{detect_category, ContentCategory};
pub use image_signals::{extract_image_signals, probe_dimensions, ImageSignals};
pub use keywords::find_hits;
pub use metadata::{inspect_image, inspect_pdf, ContainerMetadata};
pub use scoring::{score_signals, weight_ceiling, ScoreInputs, Scored};
pub use text_signals::extract_text_features;

use crate::models::{
    AnalysisResult, AnalyzerDetails, ImageDetails, PdfDetails, TextDetails,
};
use crate::services::config_store::AnalyzerConfig;
use crate::services::ocr::{self, OcrGateway};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// The only hard, user-visible failure: nothing was uploaded at all.
    #[error("uploaded content is empty")]
    EmptyInput,
}

/// Analyze one uploaded artifact. Detects the content category, runs the
/// applicable extractors, and folds the signals into a scored verdict.
/// Degrades on every partial failure; only empty input is an error.
pub async fn analyze(
    bytes: &[u8],
    filename: &str,
    mime: &str,
    config: &AnalyzerConfig,
    ocr_gateway: Arc<dyn OcrGateway>,
) -> Result<AnalysisResult, AnalyzeError> {
    if bytes.is_empty() {
        return Err(AnalyzeError::EmptyInput);
    }

    let category = detect_category(bytes, filename, mime);
    info!(category = category.as_str(), size = bytes.len(), "analyzing upload");

    let result = match category {
        ContentCategory::Image => analyze_image(bytes, config, ocr_gateway).await,
        ContentCategory::Pdf => analyze_pdf(bytes, config, ocr_gateway).await,
        ContentCategory::Text => analyze_text(bytes, config),
        ContentCategory::Unknown => analyze_unknown(config),
    };

    debug!(score = result.score, verdict = result.verdict.as_str(), "analysis complete");
    Ok(result)
}

async fn analyze_image(
    bytes: &[u8],
    config: &AnalyzerConfig,
    ocr_gateway: Arc<dyn OcrGateway>,
) -> AnalysisResult {
    let meta = inspect_image(bytes);
    let meta_hits = find_hits(&meta.as_text());

    let decoded = match image::load_from_memory(bytes) {
        Ok(img) => Some(extract_image_signals(&img, bytes)),
        Err(err) => {
            warn!(error = %err, "image decode failed; degrading to cheap signals");
            None
        }
    };

    let ocr_available = ocr_gateway.is_available();
    let ocr_text = ocr::recognize_with_timeout(
        ocr_gateway,
        bytes.to_vec(),
        Duration::from_millis(config.ocr_timeout_ms),
    )
    .await;
    let ocr_hits = ocr_text.as_deref().map(find_hits).unwrap_or_default();

    let inputs = ScoreInputs {
        meta_hits: &meta_hits,
        ocr_hits: &ocr_hits,
        exif_missing: &meta.exif_missing,
        image: decoded.as_ref(),
        ..Default::default()
    };
    let scored = score_signals(&inputs, ContentCategory::Image, config);

    let mut sentences = Vec::new();
    match &decoded {
        Some(signals) => {
            sentences.push(format!("Examined {}x{} image.", signals.width, signals.height))
        }
        None => sentences.push(
            "Image could not be decoded; pixel-level signals were skipped (reduced confidence)."
                .to_string(),
        ),
    }
    if !ocr_available {
        sentences
            .push("OCR capability unavailable; visible text was not checked (reduced confidence).".to_string());
    }
    append_scoring_sentences(&mut sentences, &scored);

    // Dimensions stay derivable from the header even when full decode fails
    let probed = if decoded.is_none() { probe_dimensions(bytes) } else { None };

    let mut details = ImageDetails {
        exif_missing: meta.exif_missing.clone(),
        meta_field_count: Some(meta.field_count()),
        meta_hits,
        ocr_hits,
        ocr_preview: ocr_text.as_deref().map(ocr::preview),
        ocr_full: ocr_text.clone(),
        text_features: ocr_text.as_deref().map(extract_text_features),
        score_breakdown: scored.breakdown.clone(),
        final_score: scored.final_score,
        ..Default::default()
    };
    if let Some(signals) = &decoded {
        details.entropy = Some(signals.entropy);
        details.edge_density = Some(signals.edge_density);
        details.ela_mean = signals.ela_mean;
        details.color_unique_ratio = Some(signals.color_unique_ratio);
        details.laplacian_var = Some(signals.laplacian_var);
        details.flat_block_ratio = Some(signals.flat_block_ratio);
        details.jpeg_qtables_present = Some(signals.jpeg_qtables_present);
        details.blockiness_score = Some(signals.blockiness_score);
        details.chroma_luma_ratio = Some(signals.chroma_luma_ratio);
        details.brightness_mean = Some(signals.brightness_mean);
        details.brightness_std = Some(signals.brightness_std);
        details.saturation_mean = Some(signals.saturation_mean);
        details.saturation_std = Some(signals.saturation_std);
        details.gray_skewness = Some(signals.gray_skewness);
        details.dark_ratio = Some(signals.dark_ratio);
        details.bright_ratio = Some(signals.bright_ratio);
        details.aspect_ratio = Some(signals.aspect_ratio);
        details.megapixels = Some(signals.megapixels);
    } else if let Some((w, h)) = probed {
        details.aspect_ratio = Some(w as f64 / h.max(1) as f64);
        details.megapixels = Some(w as f64 * h as f64 / 1.0e6);
    }

    AnalysisResult {
        score: scored.final_score,
        verdict: scored.verdict,
        reason: sentences.join(" "),
        details: AnalyzerDetails::Image(details),
    }
}

async fn analyze_pdf(
    bytes: &[u8],
    config: &AnalyzerConfig,
    ocr_gateway: Arc<dyn OcrGateway>,
) -> AnalysisResult {
    let meta = inspect_pdf(bytes);
    let meta_hits = find_hits(&meta.as_text());

    // Native text layer first; OCR only as fallback when the layer is empty
    let mut text = extract_pdf_text(bytes);
    let mut used_ocr = false;
    if text.is_none() {
        text = ocr::recognize_with_timeout(
            ocr_gateway,
            bytes.to_vec(),
            Duration::from_millis(config.ocr_timeout_ms),
        )
        .await;
        used_ocr = text.is_some();
    }

    let ocr_hits = text.as_deref().map(find_hits).unwrap_or_default();
    let text_features = text.as_deref().map(extract_text_features);

    let inputs = ScoreInputs {
        meta_hits: &meta_hits,
        ocr_hits: &ocr_hits,
        text: text_features.as_ref(),
        ..Default::default()
    };
    let scored = score_signals(&inputs, ContentCategory::Pdf, config);

    let mut sentences = vec!["PDF analyzed.".to_string()];
    match (&text, used_ocr) {
        (Some(_), true) => sentences.push("Text recovered via OCR fallback.".to_string()),
        (Some(_), false) => {}
        (None, _) => sentences.push(
            "No text could be extracted from the PDF (reduced confidence).".to_string(),
        ),
    }
    append_scoring_sentences(&mut sentences, &scored);

    AnalysisResult {
        score: scored.final_score,
        verdict: scored.verdict,
        reason: sentences.join(" "),
        details: AnalyzerDetails::Pdf(PdfDetails {
            meta_field_count: Some(meta.field_count()),
            meta_hits,
            ocr_hits,
            ocr_preview: text.as_deref().map(ocr::preview),
            ocr_full: text,
            text_features,
            score_breakdown: scored.breakdown,
            final_score: scored.final_score,
        }),
    }
}

fn analyze_text(bytes: &[u8], config: &AnalyzerConfig) -> AnalysisResult {
    let text = String::from_utf8_lossy(bytes);
    let keyword_hits = find_hits(&text);
    let features = extract_text_features(&text);

    let inputs = ScoreInputs {
        keyword_hits: &keyword_hits,
        text: Some(&features),
        ..Default::default()
    };
    let scored = score_signals(&inputs, ContentCategory::Text, config);

    let mut sentences = vec![format!(
        "Examined plain text ({} words, {} characters).",
        features.word_count, features.char_count
    )];
    append_scoring_sentences(&mut sentences, &scored);

    AnalysisResult {
        score: scored.final_score,
        verdict: scored.verdict,
        reason: sentences.join(" "),
        details: AnalyzerDetails::Text(TextDetails {
            keyword_hits,
            text_features: Some(features),
            score_breakdown: scored.breakdown,
            final_score: scored.final_score,
        }),
    }
}

fn analyze_unknown(config: &AnalyzerConfig) -> AnalysisResult {
    let inputs = ScoreInputs::default();
    let scored = score_signals(&inputs, ContentCategory::Unknown, config);

    AnalysisResult {
        score: scored.final_score,
        verdict: scored.verdict,
        reason: "Unsupported file type; no heuristic signals could be extracted. \
                 Score reflects the uncertain prior only (reduced confidence)."
            .to_string(),
        details: AnalyzerDetails::Text(TextDetails {
            keyword_hits: Vec::new(),
            text_features: None,
            score_breakdown: scored.breakdown,
            final_score: scored.final_score,
        }),
    }
}

/// pdf-extract is known to panic on malformed files; per-signal isolation
/// turns that into "no text layer" instead of aborting the pipeline.
fn extract_pdf_text(bytes: &[u8]) -> Option<String> {
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(bytes)
    }));
    match outcome {
        Ok(Ok(text)) => {
            let text = text.trim().to_string();
            if text.is_empty() {
                None
            } else {
                Some(text)
            }
        }
        Ok(Err(err)) => {
            debug!(error = %err, "PDF text layer extraction failed");
            None
        }
        Err(_) => {
            warn!("PDF text layer extraction panicked; treating as no text");
            None
        }
    }
}

fn append_scoring_sentences(sentences: &mut Vec<String>, scored: &Scored) {
    if scored.reason_clauses.is_empty() {
        sentences.push("No explicit AI markers or statistical anomalies detected.".to_string());
    } else {
        sentences.extend(scored.reason_clauses.iter().cloned());
    }
}

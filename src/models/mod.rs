// ProofGuard Data Models
// Wire-facing analysis result types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Binary authenticity label derived by thresholding the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Authentic,
    Synthetic,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Authentic => "authentic",
            Verdict::Synthetic => "synthetic",
        }
    }
}

// ============ Analysis Result ============

/// One result per analyzed upload. Immutable once produced; never persisted
/// server-side. Serialize-only: the core emits results, it never reads them back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub score: f64,
    pub verdict: Verdict,
    pub reason: String,
    pub details: AnalyzerDetails,
}

/// Per-category detail record. Fields present were actually computed; absent
/// fields mean "not attempted", never "zero". Serialized untagged so the wire
/// shape stays one flat object of optional members per content category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalyzerDetails {
    Image(ImageDetails),
    Pdf(PdfDetails),
    Text(TextDetails),
}

impl AnalyzerDetails {
    pub fn final_score(&self) -> f64 {
        match self {
            AnalyzerDetails::Image(d) => d.final_score,
            AnalyzerDetails::Pdf(d) => d.final_score,
            AnalyzerDetails::Text(d) => d.final_score,
        }
    }

    pub fn score_breakdown(&self) -> &BTreeMap<String, f64> {
        match self {
            AnalyzerDetails::Image(d) => &d.score_breakdown,
            AnalyzerDetails::Pdf(d) => &d.score_breakdown,
            AnalyzerDetails::Text(d) => &d.score_breakdown,
        }
    }
}

// ============ Per-Category Details ============

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ImageDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entropy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_density: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ela_mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_unique_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exif_missing: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub laplacian_var: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flat_block_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jpeg_qtables_present: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blockiness_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chroma_luma_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness_mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness_std: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saturation_mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saturation_std: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gray_skewness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dark_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bright_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub megapixels: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_field_count: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub meta_hits: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ocr_hits: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_full: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_features: Option<TextFeatures>,
    pub score_breakdown: BTreeMap<String, f64>,
    pub final_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct PdfDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_field_count: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub meta_hits: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ocr_hits: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_full: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_features: Option<TextFeatures>,
    pub score_breakdown: BTreeMap<String, f64>,
    pub final_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct TextDetails {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keyword_hits: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_features: Option<TextFeatures>,
    pub score_breakdown: BTreeMap<String, f64>,
    pub final_score: f64,
}

// ============ Text Features ============

/// Lexical statistics for a body of text (native text, PDF text layer, or OCR
/// output). All ratios are 0 for empty input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TextFeatures {
    pub ttr: f64,
    pub avg_sentence_len: f64,
    pub repetition_top5_share: f64,
    pub stopword_ratio: f64,
    pub digit_ratio: f64,
    pub punct_ratio: f64,
    pub word_count: usize,
    pub char_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Verdict::Synthetic).unwrap(), "\"synthetic\"");
        assert_eq!(serde_json::to_string(&Verdict::Authentic).unwrap(), "\"authentic\"");
    }

    #[test]
    fn test_absent_fields_are_omitted_not_null() {
        let details = ImageDetails {
            entropy: Some(7.2),
            final_score: 0.45,
            ..Default::default()
        };
        let json = serde_json::to_value(&details).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("entropy"));
        assert!(!obj.contains_key("ela_mean"));
        assert!(!obj.contains_key("ocr_preview"));
        assert!(!obj.contains_key("exif_missing"));
    }

    #[test]
    fn test_wire_keys_are_snake_case() {
        let details = ImageDetails {
            entropy: Some(7.2),
            edge_density: Some(0.1),
            ela_mean: Some(2.0),
            exif_missing: vec!["Make".to_string()],
            meta_hits: vec!["midjourney".to_string()],
            ocr_preview: Some("hello".to_string()),
            text_features: Some(TextFeatures::default()),
            final_score: 0.45,
            ..Default::default()
        };
        let json = serde_json::to_value(&details).unwrap();
        let obj = json.as_object().unwrap();
        for key in [
            "edge_density",
            "ela_mean",
            "exif_missing",
            "meta_hits",
            "ocr_preview",
            "text_features",
            "score_breakdown",
            "final_score",
        ] {
            assert!(obj.contains_key(key), "missing wire key {key}");
        }
        assert!(!obj.contains_key("edgeDensity"));
        assert!(!obj.contains_key("finalScore"));

        let features = json["text_features"].as_object().unwrap();
        assert!(features.contains_key("avg_sentence_len"));
        assert!(features.contains_key("repetition_top5_share"));
    }

    #[test]
    fn test_details_flatten_without_discriminator() {
        let result = AnalysisResult {
            score: 0.5,
            verdict: Verdict::Authentic,
            reason: "Examined plain text.".to_string(),
            details: AnalyzerDetails::Text(TextDetails {
                keyword_hits: vec!["diffusion".to_string()],
                text_features: Some(TextFeatures::default()),
                score_breakdown: BTreeMap::new(),
                final_score: 0.5,
            }),
        };
        let json = serde_json::to_value(&result).unwrap();
        let details = json["details"].as_object().unwrap();
        // No enum tag leaks onto the wire; members sit directly in `details`.
        assert!(details.contains_key("keyword_hits"));
        assert!(details.contains_key("final_score"));
        assert!(!details.contains_key("Text"));
    }
}

// Scoring Engine
// Deterministic weight-table scoring over extracted signals

use crate::models::{TextFeatures, Verdict};
use crate::services::analyzer::content_type::ContentCategory;
use crate::services::analyzer::image_signals::ImageSignals;
use crate::services::config_store::{AnalyzerConfig, ScoreWeights};
use std::collections::BTreeMap;

// Trigger cutoffs. Weights are configuration; the predicates are fixed.
const LOW_ENTROPY_BITS: f64 = 5.5;
const LOW_EDGE_DENSITY: f64 = 0.02;
const LOW_ELA_MEAN: f64 = 1.2;
const LOW_COLOR_UNIQUE_RATIO: f64 = 0.02;
const LOW_LAPLACIAN_VAR: f64 = 30.0;
const FLAT_BLOCK_RATIO_MIN: f64 = 0.55;
const SMOOTH_BLOCKINESS_MAX: f64 = 1.05;
const SMOOTH_FLAT_RATIO_MIN: f64 = 0.3;
const LOW_TTR: f64 = 0.35;
const HIGH_REPETITION_SHARE: f64 = 0.18;
const SENTENCE_LEN_MID: std::ops::RangeInclusive<f64> = 14.0..=22.0;
const MIN_WORDS_FOR_STYLE: usize = 30;

/// Everything the scoring engine may look at for one request. Absent signals
/// simply never trigger their categories.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreInputs<'a> {
    pub meta_hits: &'a [String],
    pub ocr_hits: &'a [String],
    pub keyword_hits: &'a [String],
    pub exif_missing: &'a [String],
    pub image: Option<&'a ImageSignals>,
    pub text: Option<&'a TextFeatures>,
}

/// Output of one scoring pass: clamped score, audit-trail breakdown, verdict,
/// and one human-readable clause per triggered category, in presentation
/// order (metadata, recognized text, image forensics, text style).
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub final_score: f64,
    pub verdict: Verdict,
    pub breakdown: BTreeMap<String, f64>,
    pub reason_clauses: Vec<String>,
}

/// Pure and deterministic: identical signals plus identical configuration
/// always produce the identical result.
pub fn score_signals(
    inputs: &ScoreInputs<'_>,
    category: ContentCategory,
    config: &AnalyzerConfig,
) -> Scored {
    let mut breakdown = BTreeMap::new();
    let mut clauses = Vec::new();
    let weights = &config.weights;

    let mut trigger = |key: &str, weight: f64, clause: String| {
        breakdown.insert(key.to_string(), weight);
        clauses.push(clause);
    };

    // Metadata first, then recognized text
    if matches!(category, ContentCategory::Image | ContentCategory::Pdf)
        && !inputs.meta_hits.is_empty()
    {
        trigger(
            "metadata_hits",
            weights.metadata_hits,
            format!("Metadata indicators found: {}.", inputs.meta_hits.join(", ")),
        );
    }
    if matches!(category, ContentCategory::Image | ContentCategory::Pdf)
        && !inputs.ocr_hits.is_empty()
    {
        trigger(
            "ocr_hits",
            weights.ocr_hits,
            format!(
                "Recognized text contains AI-related terms: {}.",
                inputs.ocr_hits.join(", ")
            ),
        );
    }
    if category == ContentCategory::Text && !inputs.keyword_hits.is_empty() {
        trigger(
            "keyword_hits",
            weights.keyword_hits,
            format!(
                "Text contains AI-related terms: {}.",
                inputs.keyword_hits.join(", ")
            ),
        );
    }

    // Image forensics
    if category == ContentCategory::Image {
        if let Some(img) = inputs.image {
            if img.entropy < LOW_ENTROPY_BITS {
                trigger(
                    "low_entropy",
                    weights.low_entropy,
                    format!(
                        "Low signal entropy ({:.2} bits) points to over-smoothed rendering.",
                        img.entropy
                    ),
                );
            }
            if img.edge_density < LOW_EDGE_DENSITY {
                trigger(
                    "low_edge_density",
                    weights.low_edge_density,
                    "Very few gradient edges for a natural photograph.".to_string(),
                );
            }
            if let Some(ela) = img.ela_mean {
                if ela < LOW_ELA_MEAN {
                    trigger(
                        "low_ela_mean",
                        weights.low_ela_mean,
                        "Uniformly low recompression error across the whole frame.".to_string(),
                    );
                }
            }
            if img.color_unique_ratio < LOW_COLOR_UNIQUE_RATIO {
                trigger(
                    "low_color_uniqueness",
                    weights.low_color_uniqueness,
                    "Unusually small distinct-color palette.".to_string(),
                );
            }
            if !inputs.exif_missing.is_empty() {
                trigger(
                    "missing_exif",
                    weights.missing_exif,
                    format!(
                        "Expected camera EXIF fields absent: {}.",
                        inputs.exif_missing.join(", ")
                    ),
                );
            }
            if img.laplacian_var < LOW_LAPLACIAN_VAR {
                trigger(
                    "low_laplacian",
                    weights.low_laplacian,
                    "Low Laplacian variance indicates over-smooth detail.".to_string(),
                );
            }
            if img.flat_block_ratio > FLAT_BLOCK_RATIO_MIN {
                trigger(
                    "flat_blocks",
                    weights.flat_blocks,
                    format!(
                        "{:.0}% of 8x8 tiles are flat.",
                        img.flat_block_ratio * 100.0
                    ),
                );
            }
            if img.blockiness_score < SMOOTH_BLOCKINESS_MAX
                && img.flat_block_ratio > SMOOTH_FLAT_RATIO_MIN
            {
                trigger(
                    "very_smooth_low_blockiness",
                    weights.very_smooth_low_blockiness,
                    "No DCT-grid blockiness despite large flat regions.".to_string(),
                );
            }
        } else if !inputs.exif_missing.is_empty() {
            // Metadata survives a decode failure
            trigger(
                "missing_exif",
                weights.missing_exif,
                format!(
                    "Expected camera EXIF fields absent: {}.",
                    inputs.exif_missing.join(", ")
                ),
            );
        }
    }

    // Text style, last in presentation order
    if matches!(category, ContentCategory::Text | ContentCategory::Pdf) {
        if let Some(text) = inputs.text {
            if text.word_count >= MIN_WORDS_FOR_STYLE {
                if text.ttr < LOW_TTR && text.repetition_top5_share > HIGH_REPETITION_SHARE {
                    trigger(
                        "high_repetition_low_ttr",
                        weights.high_repetition_low_ttr,
                        "Low lexical diversity with heavy repetition of a few tokens."
                            .to_string(),
                    );
                }
                if SENTENCE_LEN_MID.contains(&text.avg_sentence_len) {
                    trigger(
                        "avg_sentence_len_mid",
                        weights.avg_sentence_len_mid,
                        "Sentence lengths sit in the uniform mid-band typical of generated prose."
                            .to_string(),
                    );
                }
            }
        }
    }

    let sum: f64 = breakdown.values().sum();
    // Round to nanos so the strict threshold comparison is stable: a nominal
    // 0.45 + 0.25 must equal 0.70, not drift a few ulps above it.
    let final_score =
        ((config.base_score + sum) * 1e9).round() / 1e9;
    let final_score = final_score.clamp(0.0, config.max_score);
    let verdict = if final_score > config.threshold {
        Verdict::Synthetic
    } else {
        Verdict::Authentic
    };

    Scored {
        final_score,
        verdict,
        breakdown,
        reason_clauses: clauses,
    }
}

/// Ceiling for a breakdown entry, by category key. Used by audit tooling and
/// tests to check that no entry exceeds its configured weight.
pub fn weight_ceiling(weights: &ScoreWeights, key: &str) -> Option<f64> {
    match key {
        "metadata_hits" => Some(weights.metadata_hits),
        "ocr_hits" => Some(weights.ocr_hits),
        "keyword_hits" => Some(weights.keyword_hits),
        "low_entropy" => Some(weights.low_entropy),
        "low_edge_density" => Some(weights.low_edge_density),
        "low_ela_mean" => Some(weights.low_ela_mean),
        "low_color_uniqueness" => Some(weights.low_color_uniqueness),
        "missing_exif" => Some(weights.missing_exif),
        "low_laplacian" => Some(weights.low_laplacian),
        "flat_blocks" => Some(weights.flat_blocks),
        "very_smooth_low_blockiness" => Some(weights.very_smooth_low_blockiness),
        "high_repetition_low_ttr" => Some(weights.high_repetition_low_ttr),
        "avg_sentence_len_mid" => Some(weights.avg_sentence_len_mid),
        _ => None,
    }
}

// ProofGuard Core Services

pub mod analyzer;
pub mod config_store;
pub mod ocr;

pub use config_store::*;
pub use ocr::{recognize_with_timeout, OcrGateway, UnavailableOcr};

// Re-export analyzer module functions
pub use analyzer::{
    analyze,
    detect_category,
    extract_image_signals,
    extract_text_features,
    find_hits,
    inspect_image,
    inspect_pdf,
    probe_dimensions,
    score_signals,
    AnalyzeError,
    ContentCategory,
    ImageSignals,
    ScoreInputs,
    Scored,
};

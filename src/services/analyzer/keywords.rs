// AI Keyword Scanning
// Matches known generator/tool markers in metadata and recognized text

use regex::Regex;
use std::sync::OnceLock;

/// Markers of common generation tools and pipelines, plus the generic field
/// names Stable Diffusion writes into PNG text chunks.
const AI_KEYWORDS: &[&str] = &[
    // Common tools and pipelines
    "stable diffusion", "sdxl", "automatic1111", "a1111", "comfyui", "invokeai",
    "midjourney", "dall-e", "dalle", "openai image", "novelai", "leonardo", "firefly",
    "runwayml", "ideogram", "craiyon", "image creator", "bing image creator",
    // Generic markers
    "ai-generated", "ai generated", "generative", "diffusion", "latent",
    // SD metadata fields
    "parameters:", "negative prompt:", "sampler", "cfg scale", "steps:", "seed:",
];

fn prompt_field_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(prompt|negative\s+prompt)\s*:\s*").unwrap())
}

/// Scan text for AI-related markers. Returns matched keywords, deduplicated
/// and sorted for stable output.
pub fn find_hits(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let lower = text.to_lowercase();
    let mut hits: Vec<String> = AI_KEYWORDS
        .iter()
        .filter(|kw| lower.contains(*kw))
        .map(|kw| kw.to_string())
        .collect();

    // "prompt:" pattern typical in SD metadata
    if prompt_field_re().is_match(&lower) {
        hits.push("prompt field".to_string());
    }

    hits.sort();
    hits.dedup();
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_no_hits() {
        assert!(find_hits("").is_empty());
    }

    #[test]
    fn test_matches_are_case_insensitive() {
        let hits = find_hits("Rendered with Stable Diffusion (SDXL)");
        assert!(hits.contains(&"stable diffusion".to_string()));
        assert!(hits.contains(&"sdxl".to_string()));
    }

    #[test]
    fn test_prompt_field_pattern() {
        let hits = find_hits("Negative Prompt: blurry, low quality");
        assert!(hits.contains(&"prompt field".to_string()));
    }

    #[test]
    fn test_clean_text_no_hits() {
        assert!(find_hits("Sunset over the harbor, taken on holiday.").is_empty());
    }

    #[test]
    fn test_hits_deduplicated_and_sorted() {
        let hits = find_hits("diffusion diffusion latent a1111");
        assert_eq!(hits, vec!["a1111", "diffusion", "latent"]);
    }
}

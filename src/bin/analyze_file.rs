use anyhow::Context;
use proofguard_lib::models::AnalyzerDetails;
use proofguard_lib::services::config_store::{AnalyzerConfig, ConfigStore};
use proofguard_lib::services::{analyze, UnavailableOcr};
use std::sync::Arc;

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    proofguard_lib::init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage:\n  cargo run --bin analyze_file -- <path> [--mime <type>] [--config <config.json>] [--json]\n\nNotes:\n  - Prints a short summary by default; `--json` dumps the full result.\n  - Without `--config`, the default config dir is consulted, then shipped defaults."
        );
        return Ok(());
    }

    let path = args[1].clone();
    let mime = parse_arg_value(&args, "--mime").unwrap_or_default();
    let json_output = has_flag(&args, "--json");

    let config = match parse_arg_value(&args, "--config") {
        Some(p) => {
            let content = std::fs::read_to_string(&p)
                .with_context(|| format!("read config {}", p))?;
            serde_json::from_str(&content).with_context(|| format!("parse config {}", p))?
        }
        None => ConfigStore::default_config_dir()
            .map(ConfigStore::new)
            .and_then(|store| store.load().ok())
            .unwrap_or_else(AnalyzerConfig::default),
    };

    let bytes = std::fs::read(&path).with_context(|| format!("read file {}", path))?;
    let file_name = std::path::Path::new(&path)
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string());

    let result = analyze(&bytes, &file_name, &mime, &config, Arc::new(UnavailableOcr)).await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("File: {}", path);
    println!("Score: {:.3}", result.score);
    println!("Verdict: {}", result.verdict.as_str());
    println!("Reason: {}", preview(&result.reason, 400));
    println!();
    println!("Breakdown:");
    for (category, weight) in result.details.score_breakdown() {
        println!("  {:<28} +{:.2}", category, weight);
    }
    if result.details.score_breakdown().is_empty() {
        println!("  (no categories triggered)");
    }

    if let AnalyzerDetails::Image(details) = &result.details {
        println!();
        if let (Some(entropy), Some(flat)) = (details.entropy, details.flat_block_ratio) {
            println!("Entropy: {:.2} bits, flat tiles: {:.0}%", entropy, flat * 100.0);
        }
        if !details.exif_missing.is_empty() {
            println!("Missing EXIF: {}", details.exif_missing.join(", "));
        }
    }

    Ok(())
}

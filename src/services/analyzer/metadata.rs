// Metadata Inspection
// Embedded container metadata: EXIF, PNG text chunks, PDF info dictionary

use regex::Regex;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::OnceLock;
use tracing::debug;

/// Value length cap for stored metadata entries.
const MAX_VALUE_LEN: usize = 200;

/// EXIF tags a camera-written file conventionally carries.
const EXPECTED_EXIF_TAGS: &[exif::Tag] = &[
    exif::Tag::Make,
    exif::Tag::Model,
    exif::Tag::DateTime,
    exif::Tag::DateTimeOriginal,
    exif::Tag::Software,
];

/// Container metadata in normalized form. Never an error: corrupt or absent
/// metadata yields an empty map with `exif_present = false`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerMetadata {
    pub fields: BTreeMap<String, String>,
    pub exif_missing: Vec<String>,
    pub exif_present: bool,
}

impl ContainerMetadata {
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// All keys and values as one scannable blob for keyword matching.
    pub fn as_text(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Inspect an image container: EXIF fields plus PNG tEXt/iTXt chunks, where
/// Stable Diffusion pipelines record their generation parameters.
pub fn inspect_image(bytes: &[u8]) -> ContainerMetadata {
    let mut meta = ContainerMetadata::default();

    match exif::Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(data) => {
            meta.exif_present = true;
            for field in data.fields() {
                let name = field.tag.to_string();
                let value = field.display_value().to_string();
                meta.fields.insert(name, truncate(&value, MAX_VALUE_LEN));
            }
            for tag in EXPECTED_EXIF_TAGS {
                if data.get_field(*tag, exif::In::PRIMARY).is_none() {
                    meta.exif_missing.push(tag.to_string());
                }
            }
        }
        Err(err) => {
            debug!(error = %err, "no readable EXIF segment");
            meta.exif_missing = EXPECTED_EXIF_TAGS.iter().map(|t| t.to_string()).collect();
        }
    }

    for (key, value) in png_text_chunks(bytes) {
        meta.fields.insert(key, truncate(&value, MAX_VALUE_LEN));
    }

    meta
}

/// Inspect a PDF info dictionary by scanning for the conventional keys.
/// Heuristic by design: covers the literal-string form without a full object
/// parser, and degrades to an empty map on anything else.
pub fn inspect_pdf(bytes: &[u8]) -> ContainerMetadata {
    static INFO_RE: OnceLock<Regex> = OnceLock::new();
    let re = INFO_RE.get_or_init(|| {
        Regex::new(r"/(Producer|Creator|Author|Title|CreationDate|ModDate)\s*\(([^)]*)\)")
            .unwrap()
    });

    let mut meta = ContainerMetadata::default();
    let text = String::from_utf8_lossy(bytes);
    for cap in re.captures_iter(&text) {
        let key = cap[1].to_string();
        let value = cap[2].trim().to_string();
        if !value.is_empty() {
            meta.fields.insert(key, truncate(&value, MAX_VALUE_LEN));
        }
    }
    meta
}

/// Walk PNG chunks and collect uncompressed tEXt / iTXt entries.
/// Stops quietly on any structural inconsistency.
fn png_text_chunks(bytes: &[u8]) -> Vec<(String, String)> {
    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    let mut out = Vec::new();
    if bytes.len() < 8 || bytes[..8] != PNG_SIGNATURE {
        return out;
    }

    let mut pos = 8usize;
    while pos + 8 <= bytes.len() {
        let len = u32::from_be_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]])
            as usize;
        let chunk_type = &bytes[pos + 4..pos + 8];
        let data_start = pos + 8;
        let data_end = match data_start.checked_add(len) {
            Some(end) if end + 4 <= bytes.len() => end,
            _ => break,
        };
        let data = &bytes[data_start..data_end];

        match chunk_type {
            b"tEXt" => {
                if let Some(nul) = data.iter().position(|&b| b == 0) {
                    let key = latin1_to_string(&data[..nul]);
                    let value = latin1_to_string(&data[nul + 1..]);
                    out.push((key, value));
                }
            }
            b"iTXt" => {
                if let Some(entry) = parse_itxt(data) {
                    out.push(entry);
                }
            }
            b"IEND" => break,
            _ => {}
        }

        pos = data_end + 4; // skip CRC
    }

    out
}

/// iTXt layout: keyword \0 compression_flag compression_method language \0
/// translated_keyword \0 text. Compressed entries are skipped.
fn parse_itxt(data: &[u8]) -> Option<(String, String)> {
    let key_end = data.iter().position(|&b| b == 0)?;
    let key = std::str::from_utf8(&data[..key_end]).ok()?.to_string();
    let rest = &data[key_end + 1..];
    if rest.len() < 2 || rest[0] != 0 {
        return None; // compressed or malformed
    }
    let rest = &rest[2..];
    let lang_end = rest.iter().position(|&b| b == 0)?;
    let rest = &rest[lang_end + 1..];
    let trans_end = rest.iter().position(|&b| b == 0)?;
    let text = std::str::from_utf8(&rest[trans_end + 1..]).ok()?.to_string();
    Some((key, text))
}

fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal valid PNG: signature + IHDR + one tEXt chunk + IEND.
    /// CRCs are not validated by the chunk walker, so zeros suffice.
    fn png_with_text(key: &str, value: &str) -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        let ihdr_data = [0u8, 0, 0, 1, 0, 0, 0, 1, 8, 0, 0, 0, 0];
        push_chunk(&mut bytes, b"IHDR", &ihdr_data);
        let mut text_data = key.as_bytes().to_vec();
        text_data.push(0);
        text_data.extend_from_slice(value.as_bytes());
        push_chunk(&mut bytes, b"tEXt", &text_data);
        push_chunk(&mut bytes, b"IEND", &[]);
        bytes
    }

    fn push_chunk(bytes: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
        bytes.extend_from_slice(&(data.len() as u32).to_be_bytes());
        bytes.extend_from_slice(chunk_type);
        bytes.extend_from_slice(data);
        bytes.extend_from_slice(&[0, 0, 0, 0]);
    }

    #[test]
    fn test_garbage_bytes_degrade_to_empty() {
        let meta = inspect_image(b"definitely not an image");
        assert!(!meta.exif_present);
        assert!(meta.fields.is_empty());
        assert!(!meta.exif_missing.is_empty());
    }

    #[test]
    fn test_exifless_png_reports_expected_tags_missing() {
        let meta = inspect_image(&png_with_text("Comment", "hello"));
        assert!(!meta.exif_present);
        assert!(meta.exif_missing.contains(&"Make".to_string()));
        assert!(meta.exif_missing.contains(&"Model".to_string()));
        assert!(meta.exif_missing.contains(&"DateTimeOriginal".to_string()));
    }

    #[test]
    fn test_png_text_chunk_extraction() {
        let png = png_with_text("parameters", "a cat, Steps: 30, Sampler: Euler");
        let meta = inspect_image(&png);
        assert_eq!(
            meta.fields.get("parameters").map(String::as_str),
            Some("a cat, Steps: 30, Sampler: Euler")
        );
        assert!(meta.as_text().contains("parameters:"));
    }

    #[test]
    fn test_truncated_png_chunk_walks_safely() {
        let mut png = png_with_text("parameters", "payload");
        png.truncate(png.len() - 6);
        let _ = inspect_image(&png);
    }

    #[test]
    fn test_pdf_info_dict() {
        let pdf = b"%PDF-1.4\n1 0 obj\n<< /Producer (Acme Writer 2.0) /Title (Report) >>\nendobj";
        let meta = inspect_pdf(pdf);
        assert_eq!(meta.fields.get("Producer").map(String::as_str), Some("Acme Writer 2.0"));
        assert_eq!(meta.fields.get("Title").map(String::as_str), Some("Report"));
        assert_eq!(meta.field_count(), 2);
    }

    #[test]
    fn test_pdf_without_info_dict() {
        let meta = inspect_pdf(b"%PDF-1.4\nno info here");
        assert!(meta.fields.is_empty());
    }

    #[test]
    fn test_value_truncation() {
        let long_value = "x".repeat(500);
        let png = png_with_text("Comment", &long_value);
        let meta = inspect_image(&png);
        assert_eq!(meta.fields.get("Comment").unwrap().len(), 200);
    }
}

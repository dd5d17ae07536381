// Content Category Detection
// Signature-first detection with extension and UTF-8 sniffing as fallback

/// Broad content category the analyzer knows how to handle. `Unknown` inputs
/// still get a (low-confidence) result, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCategory {
    Image,
    Pdf,
    Text,
    Unknown,
}

impl ContentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCategory::Image => "image",
            ContentCategory::Pdf => "pdf",
            ContentCategory::Text => "text",
            ContentCategory::Unknown => "unknown",
        }
    }
}

const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md", "markdown", "log", "csv"];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// Detect the content category from magic bytes first, then the declared
/// filename/mime for byte-ambiguous text.
pub fn detect_category(bytes: &[u8], filename: &str, mime: &str) -> ContentCategory {
    if let Some(category) = category_from_signature(bytes) {
        return category;
    }

    let ext = extension(filename);
    if TEXT_EXTENSIONS.contains(&ext.as_str()) || mime.starts_with("text/") {
        return ContentCategory::Text;
    }
    // A declared image/pdf extension whose signature did not match is corrupt,
    // not text; let the category-specific path degrade it.
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return ContentCategory::Image;
    }
    if ext == "pdf" || mime == "application/pdf" {
        return ContentCategory::Pdf;
    }

    if looks_like_text(bytes) {
        return ContentCategory::Text;
    }

    ContentCategory::Unknown
}

fn category_from_signature(bytes: &[u8]) -> Option<ContentCategory> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G'])
        || bytes.starts_with(&[0xFF, 0xD8, 0xFF])
        || bytes.starts_with(b"GIF87a")
        || bytes.starts_with(b"GIF89a")
        || bytes.starts_with(b"BM")
        || (bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP")
    {
        return Some(ContentCategory::Image);
    }
    if bytes.starts_with(b"%PDF") {
        return Some(ContentCategory::Pdf);
    }
    None
}

fn extension(filename: &str) -> String {
    // A dot-less name has no extension; rsplit alone would yield the whole name.
    match filename.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => String::new(),
    }
}

/// Valid UTF-8 with a dominant share of printable characters.
fn looks_like_text(bytes: &[u8]) -> bool {
    let Ok(s) = std::str::from_utf8(bytes) else {
        return false;
    };
    if s.is_empty() {
        return false;
    }
    let printable = s
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .count();
    printable as f64 / s.chars().count() as f64 > 0.95
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_beats_extension() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(detect_category(&png, "mislabeled.txt", ""), ContentCategory::Image);
    }

    #[test]
    fn test_jpeg_signature() {
        assert_eq!(detect_category(&[0xFF, 0xD8, 0xFF, 0xE0], "a.jpg", ""), ContentCategory::Image);
    }

    #[test]
    fn test_pdf_signature() {
        assert_eq!(detect_category(b"%PDF-1.7 rest", "doc.pdf", ""), ContentCategory::Pdf);
    }

    #[test]
    fn test_webp_signature() {
        let mut webp = b"RIFF".to_vec();
        webp.extend_from_slice(&[0, 0, 0, 0]);
        webp.extend_from_slice(b"WEBP");
        assert_eq!(detect_category(&webp, "pic", ""), ContentCategory::Image);
    }

    #[test]
    fn test_plain_text_by_extension() {
        assert_eq!(detect_category(b"hello world", "notes.txt", ""), ContentCategory::Text);
    }

    #[test]
    fn test_plain_text_by_mime() {
        assert_eq!(detect_category(b"hello", "blob", "text/plain"), ContentCategory::Text);
    }

    #[test]
    fn test_utf8_sniff_without_extension() {
        assert_eq!(
            detect_category("Just some prose, nothing else.".as_bytes(), "upload", ""),
            ContentCategory::Text
        );
    }

    #[test]
    fn test_corrupt_image_extension_stays_image() {
        assert_eq!(detect_category(&[0x00, 0x01, 0x02], "broken.png", ""), ContentCategory::Image);
    }

    #[test]
    fn test_dotless_filename_is_not_an_extension() {
        // A binary blob literally named "png" must not be classified by name.
        assert_eq!(detect_category(&[0x00, 0x01, 0x02], "png", ""), ContentCategory::Unknown);
        // But dot-less prose still falls through to the UTF-8 sniff.
        assert_eq!(detect_category(b"plain prose here", "txt", ""), ContentCategory::Text);
    }

    #[test]
    fn test_binary_garbage_is_unknown() {
        let blob: Vec<u8> = (0u8..=255).cycle().take(1024).collect();
        assert_eq!(detect_category(&blob, "blob.bin", ""), ContentCategory::Unknown);
    }
}

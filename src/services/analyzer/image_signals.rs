// Image Signal Extraction
// Pixel-level statistical and forensic signals over a decoded raster buffer

use image::{DynamicImage, GrayImage, ImageOutputFormat, RgbImage};
use std::collections::HashSet;
use std::io::Cursor;
use tracing::debug;

/// Gradient magnitude above which a pixel counts as an edge.
const SOBEL_EDGE_THRESHOLD: f64 = 60.0;

/// Re-encode quality for error level analysis.
const ELA_JPEG_QUALITY: u8 = 90;

/// Intra-tile variance below which an 8x8 tile counts as flat.
const FLAT_BLOCK_EPSILON: f64 = 4.0;

/// Luminance cutoffs for the dark/bright pixel ratios (0-255 scale).
const DARK_LUMA_CUTOFF: u8 = 15;
const BRIGHT_LUMA_CUTOFF: u8 = 240;

/// Full set of pixel-level signals for one decoded image. Every field was
/// actually computed from the buffer; the facade maps these onto the optional
/// wire fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSignals {
    pub entropy: f64,
    pub edge_density: f64,
    pub ela_mean: Option<f64>,
    pub color_unique_ratio: f64,
    pub laplacian_var: f64,
    pub flat_block_ratio: f64,
    pub jpeg_qtables_present: bool,
    pub blockiness_score: f64,
    pub chroma_luma_ratio: f64,
    pub brightness_mean: f64,
    pub brightness_std: f64,
    pub saturation_mean: f64,
    pub saturation_std: f64,
    pub gray_skewness: f64,
    pub dark_ratio: f64,
    pub bright_ratio: f64,
    pub aspect_ratio: f64,
    pub megapixels: f64,
    pub width: u32,
    pub height: u32,
}

/// Compute all signals from a decoded image plus its raw source bytes.
/// Palette/grayscale inputs are upconverted to RGB first. Pure and
/// deterministic; the only fallible piece is the ELA re-encode, which is
/// omitted on failure rather than propagated.
pub fn extract_image_signals(img: &DynamicImage, source_bytes: &[u8]) -> ImageSignals {
    let rgb = img.to_rgb8();
    let gray = img.to_luma8();
    let (width, height) = (rgb.width(), rgb.height());

    let hist = gray_histogram(&gray);
    let total_px = (width as u64 * height as u64).max(1) as f64;

    let ela_mean = compute_ela_mean(&rgb);
    if ela_mean.is_none() {
        debug!(width, height, "ELA re-encode failed; omitting ela_mean");
    }

    let (brightness_mean, brightness_std, saturation_mean, saturation_std) = hsv_stats(&rgb);

    ImageSignals {
        entropy: shannon_entropy(&hist, total_px),
        edge_density: sobel_edge_density(&gray),
        ela_mean,
        color_unique_ratio: unique_color_ratio(&rgb),
        laplacian_var: laplacian_variance(&gray),
        flat_block_ratio: flat_block_ratio(&gray),
        jpeg_qtables_present: has_jpeg_quant_tables(source_bytes),
        blockiness_score: blockiness_score(&gray),
        chroma_luma_ratio: chroma_luma_ratio(&rgb),
        brightness_mean,
        brightness_std,
        saturation_mean,
        saturation_std,
        gray_skewness: histogram_skewness(&hist, total_px),
        dark_ratio: hist.iter().take(DARK_LUMA_CUTOFF as usize).sum::<u64>() as f64 / total_px,
        bright_ratio: hist.iter().skip(BRIGHT_LUMA_CUTOFF as usize + 1).sum::<u64>() as f64
            / total_px,
        aspect_ratio: width as f64 / height.max(1) as f64,
        megapixels: total_px / 1.0e6,
        width,
        height,
    }
}

/// Read only the header to get dimensions, for the degraded path where full
/// decoding is not possible.
pub fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

fn gray_histogram(gray: &GrayImage) -> [u64; 256] {
    let mut hist = [0u64; 256];
    for px in gray.pixels() {
        hist[px.0[0] as usize] += 1;
    }
    hist
}

/// Shannon entropy (bits) of the 256-bin grayscale histogram.
/// Single-color image = 0.0; uniform random noise approaches 8.0.
fn shannon_entropy(hist: &[u64; 256], total: f64) -> f64 {
    let mut entropy = 0.0;
    for &count in hist.iter() {
        if count == 0 {
            continue;
        }
        let p = count as f64 / total;
        entropy -= p * p.log2();
    }
    entropy
}

/// Third standardized moment of the grayscale histogram. Zero for a
/// degenerate (single-level) distribution.
fn histogram_skewness(hist: &[u64; 256], total: f64) -> f64 {
    let mean: f64 = hist
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum::<f64>()
        / total;
    let variance: f64 = hist
        .iter()
        .enumerate()
        .map(|(level, &count)| (level as f64 - mean).powi(2) * count as f64)
        .sum::<f64>()
        / total;
    if variance <= f64::EPSILON {
        return 0.0;
    }
    let m3: f64 = hist
        .iter()
        .enumerate()
        .map(|(level, &count)| (level as f64 - mean).powi(3) * count as f64)
        .sum::<f64>()
        / total;
    m3 / variance.powf(1.5)
}

/// Fraction of interior pixels whose Sobel gradient magnitude exceeds the
/// edge threshold.
fn sobel_edge_density(gray: &GrayImage) -> f64 {
    let (w, h) = (gray.width() as i64, gray.height() as i64);
    if w < 3 || h < 3 {
        return 0.0;
    }

    let at = |x: i64, y: i64| gray.get_pixel(x as u32, y as u32).0[0] as f64;
    let mut edges = 0u64;
    let mut total = 0u64;

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let gx = at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1)
                - at(x - 1, y - 1)
                - 2.0 * at(x - 1, y)
                - at(x - 1, y + 1);
            let gy = at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1)
                - at(x - 1, y - 1)
                - 2.0 * at(x, y - 1)
                - at(x + 1, y - 1);
            if (gx * gx + gy * gy).sqrt() > SOBEL_EDGE_THRESHOLD {
                edges += 1;
            }
            total += 1;
        }
    }

    edges as f64 / total.max(1) as f64
}

/// Variance of the 4-neighbor Laplacian response. Low variance means an
/// over-smooth or blurred frame.
fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (w, h) = (gray.width() as i64, gray.height() as i64);
    if w < 3 || h < 3 {
        return 0.0;
    }

    let at = |x: i64, y: i64| gray.get_pixel(x as u32, y as u32).0[0] as f64;
    let mut responses = Vec::with_capacity(((w - 2) * (h - 2)) as usize);
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let lap = at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4.0 * at(x, y);
            responses.push(lap);
        }
    }

    variance(&responses)
}

/// Re-encode at fixed JPEG quality and take the mean absolute per-pixel
/// difference from the original. Uniformly low ELA across the frame is itself
/// a synthesis signal (no localized edit boundary).
fn compute_ela_mean(rgb: &RgbImage) -> Option<f64> {
    let mut encoded = Vec::new();
    DynamicImage::ImageRgb8(rgb.clone())
        .write_to(
            &mut Cursor::new(&mut encoded),
            ImageOutputFormat::Jpeg(ELA_JPEG_QUALITY),
        )
        .ok()?;
    let recoded = image::load_from_memory(&encoded).ok()?.to_rgb8();
    if recoded.dimensions() != rgb.dimensions() {
        return None;
    }

    let mut sum = 0u64;
    for (a, b) in rgb.pixels().zip(recoded.pixels()) {
        for c in 0..3 {
            sum += (a.0[c] as i64 - b.0[c] as i64).unsigned_abs();
        }
    }
    let samples = (rgb.width() as u64 * rgb.height() as u64 * 3).max(1);
    Some(sum as f64 / samples as f64)
}

/// Distinct RGB tuples divided by total pixels.
fn unique_color_ratio(rgb: &RgbImage) -> f64 {
    let total = (rgb.width() as u64 * rgb.height() as u64).max(1);
    let mut seen: HashSet<[u8; 3]> = HashSet::new();
    for px in rgb.pixels() {
        seen.insert(px.0);
    }
    seen.len() as f64 / total as f64
}

/// Ratio of 8x8 tiles whose internal variance falls below the flatness
/// epsilon. Images smaller than one tile are treated as a single tile.
fn flat_block_ratio(gray: &GrayImage) -> f64 {
    let (w, h) = (gray.width(), gray.height());
    let (tiles_x, tiles_y) = (w / 8, h / 8);

    if tiles_x == 0 || tiles_y == 0 {
        let values: Vec<f64> = gray.pixels().map(|p| p.0[0] as f64).collect();
        return if variance(&values) < FLAT_BLOCK_EPSILON { 1.0 } else { 0.0 };
    }

    let mut flat = 0u64;
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let mut values = Vec::with_capacity(64);
            for dy in 0..8 {
                for dx in 0..8 {
                    values.push(gray.get_pixel(tx * 8 + dx, ty * 8 + dy).0[0] as f64);
                }
            }
            if variance(&values) < FLAT_BLOCK_EPSILON {
                flat += 1;
            }
        }
    }

    flat as f64 / (tiles_x as u64 * tiles_y as u64) as f64
}

/// Discontinuity magnitude at 8-pixel DCT-grid boundaries relative to the
/// mean step between off-grid neighbors. A flat frame scores 0.
fn blockiness_score(gray: &GrayImage) -> f64 {
    let (w, h) = (gray.width(), gray.height());
    if w < 9 || h < 9 {
        return 0.0;
    }

    let at = |x: u32, y: u32| gray.get_pixel(x, y).0[0] as f64;
    let mut boundary_sum = 0.0;
    let mut boundary_n = 0u64;
    let mut interior_sum = 0.0;
    let mut interior_n = 0u64;

    for y in 0..h {
        for x in 1..w {
            let step = (at(x, y) - at(x - 1, y)).abs();
            if x % 8 == 0 {
                boundary_sum += step;
                boundary_n += 1;
            } else {
                interior_sum += step;
                interior_n += 1;
            }
        }
    }
    for x in 0..w {
        for y in 1..h {
            let step = (at(x, y) - at(x, y - 1)).abs();
            if y % 8 == 0 {
                boundary_sum += step;
                boundary_n += 1;
            } else {
                interior_sum += step;
                interior_n += 1;
            }
        }
    }

    let boundary_mean = boundary_sum / boundary_n.max(1) as f64;
    let interior_mean = interior_sum / interior_n.max(1) as f64;
    boundary_mean / (interior_mean + 1e-6)
}

/// Chroma-channel energy over luma-channel energy in YCbCr space. Energy is
/// the mean squared deviation from neutral (128) for chroma and from the
/// channel mean for luma.
fn chroma_luma_ratio(rgb: &RgbImage) -> f64 {
    let total = (rgb.width() as u64 * rgb.height() as u64).max(1) as f64;

    let mut luma = Vec::with_capacity(total as usize);
    let mut chroma_energy = 0.0;
    for px in rgb.pixels() {
        let [r, g, b] = px.0.map(|c| c as f64);
        let y = 0.299 * r + 0.587 * g + 0.114 * b;
        let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
        let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
        luma.push(y);
        chroma_energy += ((cb - 128.0).powi(2) + (cr - 128.0).powi(2)) / 2.0;
    }

    let luma_energy = variance(&luma);
    (chroma_energy / total) / (luma_energy + 1e-6)
}

/// Per-channel mean and standard deviation of HSV value and saturation,
/// on a 0..1 scale.
fn hsv_stats(rgb: &RgbImage) -> (f64, f64, f64, f64) {
    let capacity = (rgb.width() * rgb.height()) as usize;
    let mut values = Vec::with_capacity(capacity);
    let mut saturations = Vec::with_capacity(capacity);
    for px in rgb.pixels() {
        let [r, g, b] = px.0.map(|c| c as f64 / 255.0);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        values.push(max);
        saturations.push(if max > 0.0 { (max - min) / max } else { 0.0 });
    }

    let v_mean = mean(&values);
    let s_mean = mean(&saturations);
    (v_mean, variance(&values).sqrt(), s_mean, variance(&saturations).sqrt())
}

/// Weak camera-origin signal: a JPEG stream carries DQT quantization-table
/// segments (marker 0xFFDB).
fn has_jpeg_quant_tables(bytes: &[u8]) -> bool {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return false;
    }
    bytes.windows(2).any(|w| w == [0xFF, 0xDB])
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid_image(w: u32, h: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(color)))
    }

    fn noise_image(w: u32, h: u32) -> DynamicImage {
        // Deterministic pseudo-random gray levels via an LCG
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        let img = RgbImage::from_fn(w, h, |_, _| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let v = (state >> 33) as u8;
            Rgb([v, v, v])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_entropy_of_single_color_is_zero() {
        let img = solid_image(64, 64, [255, 255, 255]);
        let signals = extract_image_signals(&img, &[]);
        assert_eq!(signals.entropy, 0.0);
    }

    #[test]
    fn test_entropy_of_noise_approaches_eight_bits() {
        let img = noise_image(256, 256);
        let signals = extract_image_signals(&img, &[]);
        assert!((signals.entropy - 8.0).abs() < 0.05, "entropy {}", signals.entropy);
    }

    #[test]
    fn test_flat_image_signals() {
        let img = solid_image(100, 100, [255, 255, 255]);
        let signals = extract_image_signals(&img, &[]);
        assert_eq!(signals.flat_block_ratio, 1.0);
        assert_eq!(signals.edge_density, 0.0);
        assert_eq!(signals.laplacian_var, 0.0);
        assert_eq!(signals.gray_skewness, 0.0);
        assert_eq!(signals.dark_ratio, 0.0);
        assert_eq!(signals.bright_ratio, 1.0);
        assert!(signals.color_unique_ratio <= 1.0 / 10_000.0 + 1e-12);
        assert_eq!(signals.blockiness_score, 0.0);
    }

    #[test]
    fn test_dark_ratio_of_black_image() {
        let img = solid_image(32, 32, [0, 0, 0]);
        let signals = extract_image_signals(&img, &[]);
        assert_eq!(signals.dark_ratio, 1.0);
        assert_eq!(signals.bright_ratio, 0.0);
        assert_eq!(signals.brightness_mean, 0.0);
    }

    #[test]
    fn test_edge_density_of_half_split_image() {
        // Hard vertical edge down the middle: a thin band of edge pixels
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 64, |x, _| {
            if x < 32 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) }
        }));
        let signals = extract_image_signals(&img, &[]);
        assert!(signals.edge_density > 0.0);
        assert!(signals.edge_density < 0.2);
        assert!(signals.flat_block_ratio > 0.7);
    }

    #[test]
    fn test_dimension_signals() {
        let img = solid_image(200, 100, [10, 20, 30]);
        let signals = extract_image_signals(&img, &[]);
        assert_eq!(signals.aspect_ratio, 2.0);
        assert!((signals.megapixels - 0.02).abs() < 1e-12);
        assert_eq!(signals.width, 200);
        assert_eq!(signals.height, 100);
    }

    #[test]
    fn test_saturation_zero_for_grayscale() {
        let img = solid_image(16, 16, [128, 128, 128]);
        let signals = extract_image_signals(&img, &[]);
        assert_eq!(signals.saturation_mean, 0.0);
        assert!((signals.brightness_mean - 128.0 / 255.0).abs() < 1e-9);
        assert!(signals.chroma_luma_ratio < 0.5);
    }

    #[test]
    fn test_qtable_scan() {
        assert!(!has_jpeg_quant_tables(&[0x89, b'P', b'N', b'G']));
        assert!(has_jpeg_quant_tables(&[0xFF, 0xD8, 0xFF, 0xDB, 0x00]));
        assert!(!has_jpeg_quant_tables(&[0xFF, 0xD8, 0xFF, 0xE0]));
    }

    #[test]
    fn test_ela_mean_present_and_low_for_flat_image() {
        let img = solid_image(64, 64, [200, 200, 200]);
        let signals = extract_image_signals(&img, &[]);
        let ela = signals.ela_mean.expect("ELA should compute");
        assert!(ela < 5.0, "flat image recompresses near-losslessly, got {}", ela);
    }

    #[test]
    fn test_probe_dimensions_on_garbage_is_none() {
        assert_eq!(probe_dimensions(b"not an image at all"), None);
    }

    #[test]
    fn test_determinism() {
        let img = noise_image(64, 64);
        let a = extract_image_signals(&img, &[]);
        let b = extract_image_signals(&img, &[]);
        assert_eq!(a, b);
    }
}

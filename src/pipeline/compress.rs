//! Image compression: decode, downscale to a maximum width, re-encode as JPEG.
//!
//! Phone photos of exam papers are routinely 3000–4000 px wide and several
//! megabytes. Vision models downsample internally anyway, so shipping the
//! full-resolution image only costs upload time. Width is capped (aspect ratio
//! preserved, never upscaled) and the result is always JPEG, whatever the
//! input format was.

use crate::error::ExamQuestError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;

/// MIME type of every [`CompressedImage`].
pub const COMPRESSED_MIME_TYPE: &str = "image/jpeg";

/// Output of [`compress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedImage {
    /// JPEG-encoded bytes.
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub original_width: u32,
    pub original_height: u32,
}

impl CompressedImage {
    /// Always `image/jpeg`.
    pub fn mime_type(&self) -> &'static str {
        COMPRESSED_MIME_TYPE
    }

    /// Whether the compression step actually resized the image.
    pub fn was_resized(&self) -> bool {
        self.width != self.original_width || self.height != self.original_height
    }
}

/// Target dimensions for an image of `width`×`height` under a `max_width` cap.
///
/// Unchanged when `width <= max_width`; otherwise width becomes `max_width`
/// and height is `height * (max_width / width)`, rounded, at least 1.
pub fn target_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width {
        return (width, height);
    }
    let scale = max_width as f64 / width as f64;
    let scaled_height = (height as f64 * scale).round() as u32;
    (max_width, scaled_height.max(1))
}

/// Decode `bytes`, cap the width at `max_width`, and re-encode as JPEG at `quality` (1–100).
pub fn compress(bytes: &[u8], max_width: u32, quality: u8) -> Result<CompressedImage, ExamQuestError> {
    let img = image::load_from_memory(bytes).map_err(|e| ExamQuestError::ImageDecodeFailed {
        detail: e.to_string(),
    })?;

    let (original_width, original_height) = (img.width(), img.height());
    let (width, height) = target_dimensions(original_width, original_height, max_width);

    let resized = if (width, height) == (original_width, original_height) {
        img
    } else {
        img.resize_exact(width, height, FilterType::Triangle)
    };

    let jpeg = encode_jpeg(&resized, quality)?;
    debug!(
        "Compressed {}x{} ({} bytes) → {}x{} ({} bytes)",
        original_width,
        original_height,
        bytes.len(),
        width,
        height,
        jpeg.len()
    );

    Ok(CompressedImage {
        bytes: jpeg,
        width,
        height,
        original_width,
        original_height,
    })
}

/// [`compress`] on the blocking thread pool; decoding a 12 MP photo takes
/// long enough to stall the async executor.
pub async fn compress_async(
    bytes: Vec<u8>,
    max_width: u32,
    quality: u8,
) -> Result<CompressedImage, ExamQuestError> {
    tokio::task::spawn_blocking(move || compress(&bytes, max_width, quality))
        .await
        .map_err(|e| ExamQuestError::Internal(format!("compression task failed: {e}")))?
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ExamQuestError> {
    // JPEG has no alpha channel.
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| ExamQuestError::ImageEncodeFailed {
            detail: e.to_string(),
        })?;
    Ok(buf)
}

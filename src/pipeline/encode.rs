//! Image encoding: compressed bytes → base64 [`ImageData`].
//!
//! The Gemini `generateContent` API takes images as base64 `inlineData`
//! inside the JSON request body, so the compressed JPEG is wrapped here once
//! and shared between the request and any preview the caller renders.

use super::compress::CompressedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// A base64-encoded image plus its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Standard base64, no `data:` prefix.
    pub data: String,
    pub mime_type: String,
}

impl ImageData {
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// `data:` URL suitable for an `<img src>` preview.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Size of the decoded payload in bytes, without decoding it.
    pub fn decoded_len(&self) -> usize {
        let padding = self.data.bytes().rev().take_while(|&b| b == b'=').count();
        ((self.data.len() / 4) * 3).saturating_sub(padding.min(2))
    }
}

/// Wrap a compressed image for the API request.
pub fn encode_image(image: &CompressedImage) -> ImageData {
    let b64 = STANDARD.encode(&image.bytes);
    debug!("Encoded image → {} bytes base64", b64.len());
    ImageData::new(b64, image.mime_type())
}

//! Fragment encoding: preprocessed images → base64 PNG attachments.
//!
//! Vision APIs accept images as base64 data-URIs embedded in the JSON
//! request body. PNG is chosen over JPEG because it is lossless — text
//! crispness matters far more than file size when the model is reading
//! 8 pt statement print. `detail: "high"` instructs GPT-4-class models to
//! use the full image tile budget; without it small amounts and dates in
//! dense tables are lost.

use crate::error::ExtractError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a preprocessed page fragment as a base64 PNG ready for the API.
pub fn encode_fragment(img: &DynamicImage) -> Result<ImageData, ExtractError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| ExtractError::Internal(format!("PNG encoding failed: {}", e)))?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded fragment → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

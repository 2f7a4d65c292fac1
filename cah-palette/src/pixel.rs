//! Pixel samples and image decoding

use serde::{Deserialize, Serialize};

use crate::error::PaletteError;

/// One color as three float components in a caller-declared [`ChannelOrder`]
pub type PixelSample = [f32; 3];

/// Component order of a [`PixelSample`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

impl ChannelOrder {
    /// Re-express `sample` (currently in `self` order) in `target` order
    pub fn convert(self, sample: PixelSample, target: ChannelOrder) -> PixelSample {
        if self == target {
            sample
        } else {
            [sample[2], sample[1], sample[0]]
        }
    }
}

/// Decode an encoded image (JPEG, PNG, WebP) into samples
///
/// Alpha is discarded. Samples are emitted row-major in the requested order.
pub fn pixels_from_image(
    bytes: &[u8],
    order: ChannelOrder,
) -> Result<Vec<PixelSample>, PaletteError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| PaletteError::Decode(e.to_string()))?;
    let rgb = decoded.to_rgb8();

    tracing::debug!(
        width = rgb.width(),
        height = rgb.height(),
        ?order,
        "Decoded image for palette extraction"
    );

    Ok(rgb
        .pixels()
        .map(|pixel| {
            let [r, g, b] = pixel.0;
            ChannelOrder::Rgb.convert([r as f32, g as f32, b as f32], order)
        })
        .collect())
}

//! Package thumbnail (`cover.jpeg`).
//!
//! Rendering the first page of the preview is the embedder's job (it owns
//! the PDF renderer); this module scales the rendered page and encodes it.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageError};

use crate::preview::Preview;

/// Renders the first page of a preview into a bitmap.
pub trait PageRenderer: Send + Sync {
    fn render_first_page(&self, preview: &Preview, max_size: u32) -> Option<DynamicImage>;
}

/// Encoding parameters, from the `[preview]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailOptions {
    pub max_size: u32,
    pub quality: u8,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self {
            max_size: 512,
            quality: 70,
        }
    }
}

/// Scale `page` to fit `max_size` and encode it as JPEG.
pub fn encode(page: &DynamicImage, options: ThumbnailOptions) -> Result<Vec<u8>, ImageError> {
    let scaled = if page.width() > options.max_size || page.height() > options.max_size {
        page.thumbnail(options.max_size, options.max_size)
    } else {
        page.clone()
    };

    // JPEG has no alpha channel
    let rgb = scaled.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, options.quality.clamp(1, 100)).encode_image(&rgb)?;
    Ok(out)
}

/// Render and encode a thumbnail. Best-effort: failures are logged.
pub fn render(renderer: &dyn PageRenderer, preview: &Preview, options: ThumbnailOptions) -> Option<Vec<u8>> {
    let Some(page) = renderer.render_first_page(preview, options.max_size) else {
        crate::debug!("package"; "renderer produced no first page, skipping thumbnail");
        return None;
    };
    match encode(&page, options) {
        Ok(jpeg) => Some(jpeg),
        Err(e) => {
            crate::log!("warning"; "failed to encode thumbnail: {}", e);
            None
        }
    }
}

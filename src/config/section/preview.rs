//! `[preview]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [preview]
//! thumbnail = true        # Write cover.jpeg on save
//! thumbnail_size = 512    # Longest edge, in pixels
//! jpeg_quality = 70       # 1-100
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::package::thumbnail::ThumbnailOptions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub thumbnail: bool,
    pub thumbnail_size: u32,
    pub jpeg_quality: u8,
}

impl PreviewConfig {
    pub const THUMBNAIL_SIZE: FieldPath = FieldPath::new("preview.thumbnail_size");
    pub const JPEG_QUALITY: FieldPath = FieldPath::new("preview.jpeg_quality");

    pub fn thumbnail_options(&self) -> ThumbnailOptions {
        ThumbnailOptions {
            max_size: self.thumbnail_size,
            quality: self.jpeg_quality,
        }
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !(16..=4096).contains(&self.thumbnail_size) {
            diag.error(
                Self::THUMBNAIL_SIZE,
                format!("must be between 16 and 4096, got {}", self.thumbnail_size),
            );
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            diag.error(
                Self::JPEG_QUALITY,
                format!("must be between 1 and 100, got {}", self.jpeg_quality),
            );
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        let options = ThumbnailOptions::default();
        Self {
            thumbnail: true,
            thumbnail_size: options.max_size,
            jpeg_quality: options.quality,
        }
    }
}

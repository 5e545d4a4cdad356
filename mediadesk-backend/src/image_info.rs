//! Image detection and thumbnails for uploaded payloads
//!

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, ImageResult, Limits};
use mediadesk_shared::error::ContentError;
use tracing::debug;

/// Widest thumbnail we'll generate, also the tallest
pub const MAX_THUMBNAIL_WIDTH: u32 = 2048;

/// Largest side of an upload we'll decode
pub const MAX_DECODE_DIMENSION: u32 = 32768;

/// Most memory a single decode may allocate
const MAX_DECODE_ALLOC: u64 = 256 * 1024 * 1024;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ImageClass {
    Image { width: u32, height: u32 },
    NotImage,
}

/// Decode the payload to see whether it's an image. Anything that fails to
/// decode is just [ImageClass::NotImage].
pub fn classify(data: &[u8]) -> ImageClass {
    match decode(data) {
        Ok(img) => ImageClass::Image {
            width: img.width(),
            height: img.height(),
        },
        Err(err) => {
            debug!("payload is not an image: {}", err);
            ImageClass::NotImage
        }
    }
}

fn decode(data: &[u8]) -> ImageResult<DynamicImage> {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_DECODE_DIMENSION);
    limits.max_image_height = Some(MAX_DECODE_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);

    let mut reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    reader.limits(limits);
    reader.decode()
}

/// Cache variant name for a thumbnail of the given width
pub fn thumbnail_variant(width: u32) -> String {
    format!("w{}.jpg", width)
}

/// Scale the image to fit `width` (clamped to 1..=[MAX_THUMBNAIL_WIDTH]) by
/// [MAX_THUMBNAIL_WIDTH] tall, keeping the aspect ratio, and encode it as JPEG.
pub fn thumbnail(data: &[u8], width: u32) -> Result<Vec<u8>, ContentError> {
    let img = decode(data)
        .map_err(|err| ContentError::Validation(format!("payload is not an image: {}", err)))?;

    let width = width.clamp(1, MAX_THUMBNAIL_WIDTH);
    let resized = img
        .resize(width, MAX_THUMBNAIL_WIDTH, FilterType::Triangle)
        .to_rgb8();

    let mut buf = Cursor::new(Vec::new());
    resized
        .write_to(&mut buf, ImageFormat::Jpeg)
        .map_err(|err| ContentError::Validation(format!("failed to encode thumbnail: {}", err)))?;
    Ok(buf.into_inner())
}

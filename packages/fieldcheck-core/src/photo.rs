//! # Image Payload Pipeline
//!
//! Turns a captured photo into a self-contained durable payload and resolves
//! whatever a record holds into something displayable.
//!
//! ```text
//! capture ──▶ (device_uri, raw base64)
//!                   │
//!                   ▼
//!            produce_durable ──▶ data:<mime>;base64,<payload>
//!             │ compress feature:
//!             │   decode → fit in 1280 px → JPEG q50 / PNG
//!             │   keep only if smaller
//!             └─ any failure: unmodified payload
//!
//! display ──▶ resolve_for_display
//!               1. durable payload
//!               2. http(s) device URI, as-is
//!               3. local file at device URI, read + wrapped
//!               4. None
//! ```
//!
//! Nothing in here returns an error. A photo that cannot be compressed is
//! stored as captured; a photo that cannot be resolved is simply absent.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::model::{ChecklistRecord, Photo, PhotoField};

/// Longest side of a stored photo, in pixels
pub const MAX_DIMENSION: u32 = 1280;

/// JPEG quality used when re-encoding
pub const JPEG_QUALITY: u8 = 50;

/// MIME type implied by a device URI's extension
pub fn mime_from_uri(uri: &str) -> &'static str {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    if path.to_ascii_lowercase().ends_with(".png") {
        "image/png"
    } else {
        "image/jpeg"
    }
}

/// Wrap a base64 payload as a data URI
pub fn to_data_uri(mime: &str, payload_b64: &str) -> String {
    format!("data:{mime};base64,{payload_b64}")
}

/// Split a base64 data URI into `(mime, payload)`
pub fn parse_data_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    Some((mime, payload))
}

/// Build the durable payload for a freshly captured photo
pub fn produce_durable(device_uri: &str, raw_b64: &str) -> String {
    let mime = mime_from_uri(device_uri);

    #[cfg(feature = "compress")]
    {
        match compress::shrink(raw_b64, mime) {
            Ok(Some(smaller)) => return to_data_uri(mime, &smaller),
            Ok(None) => {
                tracing::debug!(uri = device_uri, "re-encode not smaller; keeping original");
            }
            Err(e) => {
                tracing::warn!(uri = device_uri, error = %e, "photo compression failed; keeping original");
            }
        }
    }

    to_data_uri(mime, raw_b64)
}

#[cfg(feature = "compress")]
mod compress {
    use super::{JPEG_QUALITY, MAX_DIMENSION, BASE64};
    use base64::Engine as _;
    use image::codecs::jpeg::JpegEncoder;
    use image::codecs::png::PngEncoder;
    use image::imageops::FilterType;
    use image::{ExtendedColorType, ImageEncoder, ImageFormat};

    #[derive(Debug, thiserror::Error)]
    pub(super) enum ShrinkError {
        #[error("invalid base64: {0}")]
        Base64(#[from] base64::DecodeError),
        #[error("image: {0}")]
        Image(#[from] image::ImageError),
    }

    /// Re-encode `raw_b64`; `Ok(None)` when the result is not smaller
    pub(super) fn shrink(raw_b64: &str, mime: &str) -> Result<Option<String>, ShrinkError> {
        let bytes = BASE64.decode(raw_b64.trim())?;
        let png = mime == "image/png";
        let format = if png { ImageFormat::Png } else { ImageFormat::Jpeg };

        let mut img = image::load_from_memory_with_format(&bytes, format)?;
        if img.width().max(img.height()) > MAX_DIMENSION {
            img = img.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Triangle);
        }

        let mut out = Vec::with_capacity(bytes.len() / 2);
        if png {
            let rgba = img.to_rgba8();
            PngEncoder::new(&mut out).write_image(
                rgba.as_raw(),
                rgba.width(),
                rgba.height(),
                ExtendedColorType::Rgba8,
            )?;
        } else {
            let rgb = img.to_rgb8();
            JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )?;
        }

        if out.len() < bytes.len() {
            Ok(Some(BASE64.encode(&out)))
        } else {
            Ok(None)
        }
    }
}

/// Best displayable payload for one photo slot of a record
pub async fn resolve_for_display(record: &ChecklistRecord, field: PhotoField) -> Option<String> {
    resolve_photo(record.photos.get(field)).await
}

/// Best displayable payload for a photo
pub async fn resolve_photo(photo: &Photo) -> Option<String> {
    if let Some(durable) = photo.durable() {
        return Some(durable.to_string());
    }

    let uri = photo.device_uri.as_deref().filter(|u| !u.is_empty())?;
    if uri.starts_with("http://") || uri.starts_with("https://") {
        return Some(uri.to_string());
    }

    let bytes = read_device_file(uri).await?;
    Some(to_data_uri(mime_from_uri(uri), &BASE64.encode(bytes)))
}

#[cfg(not(target_arch = "wasm32"))]
async fn read_device_file(uri: &str) -> Option<Vec<u8>> {
    let path = uri.strip_prefix("file://").unwrap_or(uri);
    match tokio::fs::read(path).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::debug!(uri, error = %e, "device photo unreadable");
            None
        }
    }
}

#[cfg(target_arch = "wasm32")]
async fn read_device_file(_uri: &str) -> Option<Vec<u8>> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Photos;

    #[test]
    fn test_mime_from_uri() {
        assert_eq!(mime_from_uri("file:///sdcard/DCIM/a.PNG"), "image/png");
        assert_eq!(mime_from_uri("/tmp/shot.png?v=2"), "image/png");
        assert_eq!(mime_from_uri("/tmp/shot.jpg"), "image/jpeg");
        assert_eq!(mime_from_uri("content://media/123"), "image/jpeg");
    }

    #[test]
    fn test_parse_data_uri() {
        assert_eq!(
            parse_data_uri("data:image/png;base64,AAAA"),
            Some(("image/png", "AAAA"))
        );
        assert_eq!(parse_data_uri("data:image/png,AAAA"), None);
        assert_eq!(parse_data_uri("https://x/y.png"), None);
    }

    #[test]
    fn test_undecodable_payload_is_kept_verbatim() {
        assert_eq!(
            produce_durable("/tmp/a.jpg", "aGVsbG8="),
            "data:image/jpeg;base64,aGVsbG8="
        );
        assert_eq!(
            produce_durable("/tmp/a.png", "%%%"),
            "data:image/png;base64,%%%"
        );
    }

    #[cfg(feature = "compress")]
    #[test]
    fn test_large_png_is_downsampled() {
        use image::codecs::png::PngEncoder;
        use image::{ExtendedColorType, ImageBuffer, ImageEncoder, Rgba};

        let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_fn(2560, 40, |x, y| Rgba([(x % 256) as u8, (y * 6) as u8, 90, 255]));
        let mut raw = Vec::new();
        PngEncoder::new(&mut raw)
            .write_image(img.as_raw(), 2560, 40, ExtendedColorType::Rgba8)
            .unwrap();

        let durable = produce_durable("/tmp/wide.png", &BASE64.encode(&raw));
        let (mime, payload) = parse_data_uri(&durable).unwrap();
        assert_eq!(mime, "image/png");

        let bytes = BASE64.decode(payload).unwrap();
        let back = image::load_from_memory(&bytes).unwrap();
        assert_eq!(back.width(), MAX_DIMENSION);
        assert_eq!(back.height(), 20);
    }

    #[tokio::test]
    async fn test_record_without_photos_resolves_to_none() {
        let record = ChecklistRecord::default();
        for field in PhotoField::ALL {
            assert_eq!(resolve_for_display(&record, field).await, None);
        }
    }

    #[tokio::test]
    async fn test_durable_payload_wins() {
        let mut record = ChecklistRecord::default();
        record.photos.cto = Photo::captured("https://cdn/x.jpg", "data:image/jpeg;base64,AA");
        assert_eq!(
            resolve_for_display(&record, PhotoField::Cto).await.as_deref(),
            Some("data:image/jpeg;base64,AA")
        );
    }

    #[test]
    fn test_remote_uri_returned_as_is() {
        let photo = Photo {
            device_uri: Some("https://cdn.example/p.png".into()),
            durable_image: None,
        };
        let resolved = tokio_test::block_on(resolve_photo(&photo));
        assert_eq!(resolved.as_deref(), Some("https://cdn.example/p.png"));
    }

    #[tokio::test]
    async fn test_local_file_is_read_and_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mac.png");
        std::fs::write(&path, b"\x89PNG").unwrap();

        let mut photos = Photos::default();
        photos.mac_label.device_uri = Some(format!("file://{}", path.display()));
        let resolved = resolve_photo(&photos.mac_label).await.unwrap();
        assert_eq!(resolved, format!("data:image/png;base64,{}", BASE64.encode(b"\x89PNG")));

        photos.mac_label.device_uri = Some(dir.path().join("gone.jpg").display().to_string());
        assert_eq!(resolve_photo(&photos.mac_label).await, None);
    }
}

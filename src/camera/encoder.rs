use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::jpeg::JpegEncoder, DynamicImage, ExtendedColorType};

use super::CaptureError;

pub const JPEG_MIME_TYPE: &str = "image/jpeg";

/// One encoded still frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageArtifact {
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl ImageArtifact {
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }

    /// Decode the payload of a base64 `data:` URI. Returns `None` for anything
    /// that is not a base64 data URI.
    pub fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
        let rest = uri.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        if !header.ends_with(";base64") {
            return None;
        }
        STANDARD.decode(payload).ok()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FrameEncoder {
    quality: u8,
}

impl FrameEncoder {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode `frame` as JPEG at its own dimensions.
    pub fn encode(&self, frame: &DynamicImage) -> Result<ImageArtifact, CaptureError> {
        let rgb = frame.to_rgb8();
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(CaptureError::Encode("frame has no pixels".into()));
        }

        let mut buffer = Cursor::new(Vec::new());
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, self.quality);
        encoder
            .encode(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
            .map_err(|err| CaptureError::Encode(format!("JPEG encoding failed: {err}")))?;

        Ok(ImageArtifact {
            mime_type: JPEG_MIME_TYPE,
            width,
            height,
            bytes: buffer.into_inner(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    fn checkerboard(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            if (x / 8 + y / 8) % 2 == 0 {
                image::Rgb([240, 240, 240])
            } else {
                image::Rgb([20, 20, 20])
            }
        }))
    }

    #[test]
    fn encodes_at_native_resolution() {
        let artifact = FrameEncoder::new(80).encode(&checkerboard(64, 48)).unwrap();
        assert_eq!((artifact.width, artifact.height), (64, 48));
        assert_eq!(&artifact.bytes[..2], &[0xFF, 0xD8]);

        let decoded =
            image::load_from_memory_with_format(&artifact.bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn quality_is_clamped() {
        assert_eq!(FrameEncoder::new(0).quality(), 1);
        assert_eq!(FrameEncoder::new(255).quality(), 100);
    }

    #[test]
    fn empty_frame_is_rejected() {
        let err = FrameEncoder::new(80)
            .encode(&DynamicImage::ImageRgb8(RgbImage::new(0, 0)))
            .unwrap_err();
        assert!(matches!(err, CaptureError::Encode(_)));
    }

    #[test]
    fn data_uri_round_trips_payload() {
        let artifact = FrameEncoder::new(80).encode(&checkerboard(16, 16)).unwrap();
        let uri = artifact.to_data_uri();
        assert!(uri.starts_with("data:image/jpeg;base64,"));
        assert_eq!(ImageArtifact::decode_data_uri(&uri).unwrap(), artifact.bytes);
    }

    #[test]
    fn rejects_non_base64_uris() {
        assert!(ImageArtifact::decode_data_uri("https://example.com/a.jpg").is_none());
        assert!(ImageArtifact::decode_data_uri("data:text/plain,hello").is_none());
    }
}

// Image format sniffing and WebP -> PNG transcoding.
// Some storage endpoints reject WebP, so uploads normalize to PNG first.

use crate::error::{LaunchError, Result};
use crate::models::ImageAsset;

/// Detect a MIME type from magic bytes, falling back to hints in the source
/// URL, defaulting to PNG.
pub fn sniff_content_type(bytes: &[u8], url_hint: Option<&str>) -> String {
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return "image/webp".to_string();
    }
    if bytes.len() >= 8 && bytes[0..8] == [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A] {
        return "image/png".to_string();
    }
    if bytes.len() >= 3 && bytes[0..3] == [0xFF, 0xD8, 0xFF] {
        return "image/jpeg".to_string();
    }
    if bytes.len() >= 6 && (&bytes[0..6] == b"GIF87a" || &bytes[0..6] == b"GIF89a") {
        return "image/gif".to_string();
    }

    if let Some(url) = url_hint {
        let lower = url.to_lowercase();
        if lower.contains(".webp") {
            return "image/webp".to_string();
        }
        if lower.contains(".jpg") || lower.contains(".jpeg") {
            return "image/jpeg".to_string();
        }
        if lower.contains(".gif") {
            return "image/gif".to_string();
        }
    }

    "image/png".to_string()
}

/// Raster transcoding seam. The native implementation decodes with the
/// `image` crate; tests substitute a stub.
pub trait ImageTranscoder {
    fn webp_to_png(&self, bytes: &[u8]) -> Result<Vec<u8>>;
}

/// Return an asset guaranteed not to be WebP, transcoding when needed.
/// Non-WebP input passes through untouched.
pub fn ensure_png(asset: ImageAsset, transcoder: &dyn ImageTranscoder) -> Result<ImageAsset> {
    if !asset.is_webp() {
        return Ok(asset);
    }
    log::debug!("Converting WebP image ({} bytes) to PNG", asset.bytes.len());
    let png_bytes = transcoder.webp_to_png(&asset.bytes)?;
    Ok(ImageAsset::new(png_bytes, "image/png"))
}

#[cfg(feature = "native")]
pub use native_transcoder::NativeTranscoder;

#[cfg(feature = "native")]
mod native_transcoder {
    use super::*;
    use std::io::Cursor;

    /// `image`-crate backed transcoder.
    #[derive(Default)]
    pub struct NativeTranscoder;

    impl ImageTranscoder for NativeTranscoder {
        fn webp_to_png(&self, bytes: &[u8]) -> Result<Vec<u8>> {
            let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::WebP)
                .map_err(|e| LaunchError::ImageDownload(format!("WebP decode failed: {}", e)))?;
            let mut out = Cursor::new(Vec::new());
            decoded
                .write_to(&mut out, image::ImageFormat::Png)
                .map_err(|e| LaunchError::ImageDownload(format!("PNG encode failed: {}", e)))?;
            Ok(out.into_inner())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) struct StubTranscoder;

    impl ImageTranscoder for StubTranscoder {
        fn webp_to_png(&self, _bytes: &[u8]) -> Result<Vec<u8>> {
            Ok(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
        }
    }

    #[test]
    fn sniffs_magic_bytes() {
        let webp = [b'R', b'I', b'F', b'F', 0, 0, 0, 0, b'W', b'E', b'B', b'P'];
        assert_eq!(sniff_content_type(&webp, None), "image/webp");

        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(sniff_content_type(&png, None), "image/png");

        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0];
        assert_eq!(sniff_content_type(&jpeg, None), "image/jpeg");
    }

    #[test]
    fn falls_back_to_url_extension() {
        assert_eq!(
            sniff_content_type(&[], Some("https://cdn.example/pic.WEBP?x=1")),
            "image/webp"
        );
        assert_eq!(
            sniff_content_type(&[], Some("https://cdn.example/pic.jpg")),
            "image/jpeg"
        );
        assert_eq!(sniff_content_type(&[], Some("https://cdn.example/pic")), "image/png");
    }

    #[test]
    fn ensure_png_transcodes_webp_only() {
        let webp = ImageAsset::new(vec![1, 2, 3], "image/webp");
        let converted = ensure_png(webp, &StubTranscoder).unwrap();
        assert_eq!(converted.content_type, "image/png");

        let png = ImageAsset::new(vec![7, 7], "image/png");
        let untouched = ensure_png(png.clone(), &StubTranscoder).unwrap();
        assert_eq!(untouched, png);
    }
}

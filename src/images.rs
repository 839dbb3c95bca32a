use std::io::Cursor;

use anyhow::Context;
use bytes::Bytes;
use image::{imageops::FilterType, ImageFormat};

/// Avatars are normalized to a fixed square.
pub const AVATAR_SIZE: u32 = 250;

pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

fn format_for_ext(ext: &str) -> ImageFormat {
    match ext {
        "jpg" => ImageFormat::Jpeg,
        "gif" => ImageFormat::Gif,
        _ => ImageFormat::Png,
    }
}

/// Decode an uploaded avatar, resize it to [`AVATAR_SIZE`] square and
/// re-encode it in its original format. Undecodable input is an error the
/// caller reports, so the client can retry with a usable file.
pub fn process_avatar(body: &[u8], ext: &str) -> anyhow::Result<Bytes> {
    let img = image::load_from_memory(body).context("decode avatar image")?;
    let resized = img.resize_exact(AVATAR_SIZE, AVATAR_SIZE, FilterType::Triangle);

    let mut out = Cursor::new(Vec::new());
    resized
        .write_to(&mut out, format_for_ext(ext))
        .context("encode avatar image")?;
    Ok(Bytes::from(out.into_inner()))
}

#[cfg(test)]
mod image_tests {
    use super::*;

    fn png_fixture(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/gif"), Some("gif"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
        assert_eq!(ext_from_mime("text/html"), None);
    }

    #[test]
    fn resizes_to_fixed_square() {
        let input = png_fixture(4, 8);
        let out = process_avatar(&input, "png").expect("resize should succeed");
        let img = image::load_from_memory(&out).unwrap();
        assert_eq!(img.width(), AVATAR_SIZE);
        assert_eq!(img.height(), AVATAR_SIZE);
    }

    #[test]
    fn garbage_input_is_an_error_not_a_silent_pass() {
        let err = process_avatar(b"definitely not an image", "png").unwrap_err();
        assert!(err.to_string().contains("decode avatar image"));
    }
}

//! Local image loading for the preview step.
//!
//! Reads the selected file, rejects payloads that are not a recognizable
//! image, probes dimensions from the header without a full decode, and
//! builds a data URI the presentation layer can render.

use crate::model::{Preview, SelectedImage};
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use std::io::Cursor;
use std::path::Path;

pub async fn load_preview(path: &Path) -> Result<(SelectedImage, Preview)> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    let format = image::guess_format(&bytes).context("not a recognizable image")?;
    let (width, height) = image::ImageReader::with_format(Cursor::new(&bytes), format)
        .into_dimensions()
        .context("read image dimensions")?;
    let mime = format.to_mime_type();
    let data_uri = format!("data:{mime};base64,{}", BASE64.encode(&bytes));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();

    Ok((
        SelectedImage {
            file_name,
            bytes: Bytes::from(bytes),
        },
        Preview {
            data_uri,
            width,
            height,
            mime,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_temp_png(name: &str) -> PathBuf {
        let mut buf = Vec::new();
        image::RgbaImage::new(2, 3)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, buf).unwrap();
        path
    }

    #[tokio::test]
    async fn loads_png_preview() {
        let path = write_temp_png("dishlens_preview_ok.png");
        let (image, preview) = load_preview(&path).await.unwrap();
        assert_eq!(image.file_name, "dishlens_preview_ok.png");
        assert!(!image.bytes.is_empty());
        assert_eq!((preview.width, preview.height), (2, 3));
        assert_eq!(preview.mime, "image/png");
        assert!(preview.data_uri.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn rejects_non_image_payload() {
        let path = std::env::temp_dir().join("dishlens_preview_not_image.txt");
        std::fs::write(&path, b"definitely not an image").unwrap();
        assert!(load_preview(&path).await.is_err());
    }

    #[tokio::test]
    async fn rejects_missing_file() {
        let path = std::env::temp_dir().join("dishlens_preview_missing.png");
        let _ = std::fs::remove_file(&path);
        assert!(load_preview(&path).await.is_err());
    }
}

//! Product and logo image uploads. Files land under the data directory in a
//! flat `uploads/` folder with sanitized, collision-resistant names, and are
//! only served back through a traversal-checked resolver.

use crate::storage;

use time::OffsetDateTime;

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

pub(crate) const UPLOADS_DIR: &str = "uploads";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ImageType {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageType {
    fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }
        if bytes.len() >= 3 && bytes[0] == 0xFF && bytes[1] == 0xD8 && bytes[2] == 0xFF {
            return Some(Self::Jpeg);
        }
        if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }
        if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
            return Some(Self::Webp);
        }
        None
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }

    pub(crate) fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub(crate) enum UploadError {
    EmptyBody,
    UnsupportedType,
    BadPath,
    NotFound,
    Io(std::io::Error),
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadError::EmptyBody => f.write_str("upload body was empty"),
            UploadError::UnsupportedType => f.write_str("unsupported image type"),
            UploadError::BadPath => f.write_str("invalid upload path"),
            UploadError::NotFound => f.write_str("upload not found"),
            UploadError::Io(err) => write!(f, "upload i/o error: {err}"),
        }
    }
}

/// Stores the image bytes and returns the path relative to the data
/// directory. The sniffed byte signature is the ground truth for the type; a
/// conflicting content-type header is rejected.
pub(crate) fn store_upload(
    data_dir: &Path,
    bytes: &[u8],
    content_type: Option<&str>,
    filename: Option<&str>,
) -> Result<String, UploadError> {
    if bytes.is_empty() {
        return Err(UploadError::EmptyBody);
    }
    let image_type = ImageType::sniff(bytes).ok_or(UploadError::UnsupportedType)?;
    if let Some(content_type) = content_type
        && content_type != "application/octet-stream"
        && content_type != image_type.content_type()
    {
        return Err(UploadError::UnsupportedType);
    }

    let now = OffsetDateTime::now_utc();
    let base = sanitize_base_name(filename);

    for _ in 0..10 {
        let suffix: u16 = rand::random();
        let rel_path = format!(
            "{}/{}-{:04}{:02}{:02}-{:04x}.{}",
            UPLOADS_DIR,
            base,
            now.year(),
            u8::from(now.month()),
            now.day(),
            suffix,
            image_type.extension()
        );
        let target = data_dir.join(&rel_path);
        if target.exists() {
            continue;
        }
        storage::atomic_write(&target, bytes).map_err(UploadError::Io)?;
        return Ok(rel_path);
    }

    Err(UploadError::Io(std::io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to allocate upload name",
    )))
}

/// Resolves a stored upload path back to a file, refusing anything that
/// would escape the uploads directory.
pub(crate) fn resolve_upload(data_dir: &Path, rel_path: &str) -> Result<PathBuf, UploadError> {
    let path = Path::new(rel_path);
    if path.is_absolute()
        || path
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
    {
        return Err(UploadError::BadPath);
    }

    let uploads_root = data_dir.join(UPLOADS_DIR);
    let candidate = uploads_root.join(path);
    let resolved = std::fs::canonicalize(&candidate).map_err(|err| match err.kind() {
        ErrorKind::NotFound => UploadError::NotFound,
        _ => UploadError::Io(err),
    })?;
    let uploads_root = std::fs::canonicalize(&uploads_root).map_err(UploadError::Io)?;
    if !resolved.starts_with(&uploads_root) {
        return Err(UploadError::BadPath);
    }
    let metadata = std::fs::metadata(&resolved).map_err(UploadError::Io)?;
    if !metadata.is_file() {
        return Err(UploadError::NotFound);
    }
    Ok(resolved)
}

pub(crate) fn content_type_for(rel_path: &str) -> Option<&'static str> {
    let ext = Path::new(rel_path).extension()?.to_str()?;
    ImageType::from_extension(ext).map(ImageType::content_type)
}

fn sanitize_base_name(filename: Option<&str>) -> String {
    let base = filename
        .and_then(|name| Path::new(name).file_stem().and_then(|stem| stem.to_str()))
        .unwrap_or("image");
    let mut out = String::with_capacity(base.len());
    let mut last_dash = false;

    for ch in base.chars() {
        if ch.is_ascii_alphanumeric() {
            last_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else if !last_dash && !out.is_empty() {
            last_dash = true;
            out.push('-');
        }
    }

    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "image".to_string()
    } else if trimmed.len() > 40 {
        trimmed[..40].to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn store_upload__should_write_under_uploads_dir() {
        // Given
        let root = create_temp_root("upload-store");

        // When
        let rel_path = store_upload(&root, &PNG_HEADER, Some("image/png"), Some("Logo Final.png"))
            .expect("store upload");

        // Then
        assert!(rel_path.starts_with("uploads/logo-final-"));
        assert!(rel_path.ends_with(".png"));
        assert!(root.join(&rel_path).exists());

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[test]
    fn store_upload__should_reject_content_type_mismatch() {
        // Given
        let root = create_temp_root("upload-mismatch");

        // When
        let result = store_upload(&root, &PNG_HEADER, Some("image/jpeg"), Some("photo.jpg"));

        // Then
        assert!(matches!(result, Err(UploadError::UnsupportedType)));

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[test]
    fn store_upload__should_reject_unrecognized_bytes() {
        // Given
        let root = create_temp_root("upload-unknown");

        // When
        let result = store_upload(&root, b"plain text", None, None);

        // Then
        assert!(matches!(result, Err(UploadError::UnsupportedType)));

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[test]
    fn resolve_upload__should_reject_traversal() {
        // Given
        let root = create_temp_root("upload-traversal");

        // When
        let result = resolve_upload(&root, "../settings.json");

        // Then
        assert!(matches!(result, Err(UploadError::BadPath)));

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[test]
    fn resolve_upload__should_find_stored_file() {
        // Given
        let root = create_temp_root("upload-resolve");
        let rel_path =
            store_upload(&root, &PNG_HEADER, None, Some("cake.png")).expect("store upload");
        let file_name = Path::new(&rel_path)
            .file_name()
            .and_then(|name| name.to_str())
            .expect("file name");

        // When
        let resolved = resolve_upload(&root, file_name).expect("resolve");

        // Then
        assert!(resolved.ends_with(file_name));

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    fn create_temp_root(test_name: &str) -> std::path::PathBuf {
        let mut root = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        root.push(format!("bakeshop-{}-{}", test_name, nanos));
        std::fs::create_dir_all(&root).expect("create temp dir");
        root
    }
}

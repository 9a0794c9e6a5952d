use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;

pub const SHOW_IMAGE_DIR: &str = "uploads/astronomy_show";

/// Файлы изображений программ на локальном диске.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Сохраняет изображение и возвращает путь относительно корня медиа.
    pub async fn save_show_image(
        &self,
        title: &str,
        file_name: Option<&str>,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, ApiError> {
        if !content_type.is_some_and(|ct| ct.starts_with("image/")) {
            return Err(ApiError::field("image", "Upload a valid image file."));
        }
        if bytes.is_empty() {
            return Err(ApiError::field("image", "The submitted file is empty."));
        }

        let ext = image_extension(file_name, content_type);
        let relative = format!("{}/{}-{}.{}", SHOW_IMAGE_DIR, slugify(title), Uuid::new_v4(), ext);

        let dir = self.root.join(SHOW_IMAGE_DIR);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ApiError::Internal(format!("cannot create {}: {}", dir.display(), e)))?;

        let path = self.root.join(&relative);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ApiError::Internal(format!("cannot write {}: {}", path.display(), e)))?;

        info!("Stored show image {} ({} bytes)", relative, bytes.len());
        Ok(relative)
    }
}

pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut dash = false;
    for c in value.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
            dash = false;
        } else if !dash && !slug.is_empty() {
            slug.push('-');
            dash = true;
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() { "show".to_string() } else { slug }
}

// Расширение из имени файла, иначе из content type
fn image_extension(file_name: Option<&str>, content_type: Option<&str>) -> String {
    let from_name = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase());

    from_name.unwrap_or_else(|| {
        match content_type.and_then(|ct| ct.strip_prefix("image/")) {
            Some("jpeg") => "jpg".to_string(),
            Some("svg+xml") => "svg".to_string(),
            Some(sub) if sub.chars().all(|c| c.is_ascii_alphanumeric()) => sub.to_string(),
            _ => "bin".to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_keeps_words_and_collapses_separators() {
        assert_eq!(slugify("The Big Bang!"), "the-big-bang");
        assert_eq!(slugify("  Mars -- Red Planet "), "mars-red-planet");
        assert_eq!(slugify("???"), "show");
    }

    #[test]
    fn extension_prefers_file_name() {
        assert_eq!(image_extension(Some("nebula.PNG"), Some("image/jpeg")), "png");
        assert_eq!(image_extension(None, Some("image/jpeg")), "jpg");
        assert_eq!(image_extension(Some("noext"), Some("image/webp")), "webp");
    }

    #[tokio::test]
    async fn rejects_non_image_content() {
        let storage = MediaStorage::new(std::env::temp_dir());
        let res = storage
            .save_show_image("Mars", Some("notes.txt"), Some("text/plain"), b"hello")
            .await;
        assert!(matches!(res, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn stores_image_under_show_directory() {
        let root = std::env::temp_dir().join(format!("planetarium-media-{}", Uuid::new_v4()));
        let storage = MediaStorage::new(&root);

        let relative = storage
            .save_show_image("Life in Space", Some("cover.jpg"), Some("image/jpeg"), &[0xff, 0xd8, 0xff])
            .await
            .unwrap();

        assert!(relative.starts_with("uploads/astronomy_show/life-in-space-"));
        assert!(relative.ends_with(".jpg"));
        let written = tokio::fs::read(root.join(&relative)).await.unwrap();
        assert_eq!(written, vec![0xff, 0xd8, 0xff]);

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}

//! Loading and sniffing the query image.

use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ImgSearchError, Result};

/// Image formats recognized from their leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Webp,
    Bmp,
    Tiff,
}

impl ImageKind {
    /// Detect the format from magic bytes.
    #[must_use]
    pub fn sniff(data: &[u8]) -> Option<Self> {
        match data {
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(Self::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
            [b'B', b'M', ..] => Some(Self::Bmp),
            [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => Some(Self::Tiff),
            _ => None,
        }
    }

    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
        }
    }
}

/// An image chosen by the user, held in memory.
///
/// Cloning is cheap; the bytes are reference counted.
#[derive(Debug, Clone)]
pub struct ImageFile {
    path: PathBuf,
    name: String,
    kind: ImageKind,
    data: Bytes,
}

impl ImageFile {
    /// Read an image from disk, rejecting files that are not images.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, or not an image.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ImgSearchError::image_not_found(path));
            }
            Err(e) => return Err(ImgSearchError::path_error("read", path, e)),
        };

        let name = path
            .file_name()
            .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());
        let image = Self::from_bytes(name, data)
            .ok_or_else(|| ImgSearchError::not_an_image(path))?
            .with_path(path);
        debug!(path = %path.display(), bytes = image.len(), mime = image.mime_type(), "Loaded image");
        Ok(image)
    }

    /// Build an image from in-memory bytes; `None` if they are not an image.
    #[must_use]
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Option<Self> {
        let data = data.into();
        let kind = ImageKind::sniff(&data)?;
        let name = name.into();
        Some(Self {
            path: PathBuf::from(&name),
            name,
            kind,
            data,
        })
    }

    fn with_path(mut self, path: &Path) -> Self {
        self.path = path.to_path_buf();
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name sent with the multipart part.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> ImageKind {
        self.kind
    }

    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        self.kind.mime_type()
    }

    #[must_use]
    pub const fn bytes(&self) -> &Bytes {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

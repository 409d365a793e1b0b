//! Image and archive format handling
//!
//! Images carry two kinds of type information: the *declared* type, derived
//! cheaply from the file extension before upload, and the *confirmed* type,
//! sniffed from the bytes the service hands back. Both are kept as separate
//! values so a conversion can be detected by comparing them.
use crate::error::{CompressionError, Result};
use image::ImageFormat;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Image formats understood by the compression service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageType {
    Png,
    Jpeg,
    WebP,
}

impl ImageType {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "png" => Some(ImageType::Png),
            "jpg" | "jpeg" => Some(ImageType::Jpeg),
            "webp" => Some(ImageType::WebP),
            _ => None,
        }
    }

    /// Declared type of a file, based only on its extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageType::Png => "image/png",
            ImageType::Jpeg => "image/jpeg",
            ImageType::WebP => "image/webp",
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageType::Png => "PNG",
            ImageType::Jpeg => "JPEG",
            ImageType::WebP => "WebP",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ImageType {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self> {
        ImageType::from_extension(s).ok_or_else(|| CompressionError::UnsupportedFormat(s.to_string()))
    }
}

/// Content-sniffed type of downloaded image bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedType(ImageFormat);

impl ConfirmedType {
    pub fn sniff(bytes: &[u8]) -> Result<Self> {
        image::guess_format(bytes)
            .map(ConfirmedType)
            .map_err(|_| CompressionError::UnknownImageType)
    }

    pub fn mime_type(&self) -> &'static str {
        self.0.to_mime_type()
    }

    pub fn extension(&self) -> &'static str {
        self.0.extensions_str().first().copied().unwrap_or("bin")
    }
}

/// Archive containers that can be expanded and rebuilt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveFormat {
    Tar,
    Tgz,
    #[default]
    Zip,
}

impl ArchiveFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "tar" => Some(ArchiveFormat::Tar),
            "tgz" => Some(ArchiveFormat::Tgz),
            "zip" => Some(ArchiveFormat::Zip),
            _ => None,
        }
    }

    /// Format used to read an existing archive; anything unrecognised is read as zip
    pub fn for_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .unwrap_or_default()
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::Tgz => "tgz",
            ArchiveFormat::Zip => "zip",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for ArchiveFormat {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self> {
        ArchiveFormat::from_extension(s).ok_or_else(|| CompressionError::UnsupportedFormat(s.to_string()))
    }
}

//! Input stage: accept one uploaded file and decode it into a raster image.
//!
//! The extension check happens in [`UploadedImage::accept`], before any byte
//! is decoded, so an unsupported file never reaches the image decoders.
//! Raster formats go through the `image` crate; PDFs are handed to
//! [`crate::pipeline::render`].

use crate::config::OrganizerConfig;
use crate::error::NoteError;
use crate::pipeline::render;
use image::{DynamicImage, ImageReader};
use std::fmt;
use std::io::Cursor;
use tracing::{debug, info};

/// File formats the picker accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Png,
    Jpg,
    Jpeg,
    Bmp,
    Tiff,
    Pdf,
}

impl UploadFormat {
    /// Every accepted format, in picker order.
    pub const ALL: [UploadFormat; 6] = [
        UploadFormat::Png,
        UploadFormat::Jpg,
        UploadFormat::Jpeg,
        UploadFormat::Bmp,
        UploadFormat::Tiff,
        UploadFormat::Pdf,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            UploadFormat::Png => "png",
            UploadFormat::Jpg => "jpg",
            UploadFormat::Jpeg => "jpeg",
            UploadFormat::Bmp => "bmp",
            UploadFormat::Tiff => "tiff",
            UploadFormat::Pdf => "pdf",
        }
    }

    /// Derive the declared format from a file name's extension (case-insensitive).
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, ext) = file_name.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }

    /// Value for the HTML `accept` attribute, e.g. `.png,.jpg,…`.
    pub fn accept_attribute() -> String {
        Self::ALL
            .iter()
            .map(|f| format!(".{}", f.extension()))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Decoder to fall back on when content sniffing fails. `None` for PDF.
    fn image_format(self) -> Option<image::ImageFormat> {
        match self {
            UploadFormat::Png => Some(image::ImageFormat::Png),
            UploadFormat::Jpg | UploadFormat::Jpeg => Some(image::ImageFormat::Jpeg),
            UploadFormat::Bmp => Some(image::ImageFormat::Bmp),
            UploadFormat::Tiff => Some(image::ImageFormat::Tiff),
            UploadFormat::Pdf => None,
        }
    }
}

impl fmt::Display for UploadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Raw bytes of one accepted upload plus its declared format.
pub struct UploadedImage {
    file_name: String,
    format: UploadFormat,
    bytes: Vec<u8>,
}

impl fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedImage")
            .field("file_name", &self.file_name)
            .field("format", &self.format)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl UploadedImage {
    /// Validate an upload without decoding it.
    ///
    /// Fails with [`NoteError::UnsupportedFormat`], [`NoteError::EmptyUpload`]
    /// or [`NoteError::UploadTooLarge`].
    pub fn accept(
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        max_bytes: usize,
    ) -> Result<Self, NoteError> {
        let file_name = file_name.into();
        let format = UploadFormat::from_file_name(&file_name)
            .ok_or_else(|| NoteError::UnsupportedFormat {
                file_name: file_name.clone(),
            })?;
        if bytes.is_empty() {
            return Err(NoteError::EmptyUpload { file_name });
        }
        if bytes.len() > max_bytes {
            return Err(NoteError::UploadTooLarge {
                size: bytes.len(),
                limit: max_bytes,
            });
        }
        debug!("Accepted upload '{}' ({}, {} bytes)", file_name, format, bytes.len());
        Ok(Self {
            file_name,
            format,
            bytes,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn format(&self) -> UploadFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// A decoded raster, ready for OCR.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    image: DynamicImage,
    source_format: UploadFormat,
}

impl DecodedImage {
    pub fn new(image: DynamicImage, source_format: UploadFormat) -> Self {
        Self {
            image,
            source_format,
        }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn source_format(&self) -> UploadFormat {
        self.source_format
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Decode an accepted upload into a raster image.
///
/// PDFs are rasterised (first page) on the blocking pool; raster formats are
/// decoded in place.
pub async fn decode(
    upload: &UploadedImage,
    config: &OrganizerConfig,
) -> Result<DecodedImage, NoteError> {
    let image = match upload.format {
        UploadFormat::Pdf => {
            render::render_first_page(
                upload.file_name(),
                upload.bytes().to_vec(),
                config.max_rendered_pixels,
            )
            .await?
        }
        declared => decode_raster(upload.file_name(), upload.bytes(), declared)?,
    };

    info!(
        "Decoded '{}' → {}x{} px",
        upload.file_name(),
        image.width(),
        image.height()
    );
    Ok(DecodedImage::new(image, upload.format))
}

/// Decode raster bytes, trusting the content over the extension.
fn decode_raster(
    file_name: &str,
    bytes: &[u8],
    declared: UploadFormat,
) -> Result<DynamicImage, NoteError> {
    let decode_err = |detail: String| NoteError::Decode {
        file_name: file_name.to_string(),
        detail,
    };

    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| decode_err(e.to_string()))?;

    if reader.format().is_none() {
        if let Some(fallback) = declared.image_format() {
            reader.set_format(fallback);
        }
    }

    reader.decode().map_err(|e| decode_err(e.to_string()))
}

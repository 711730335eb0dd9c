//! Uploaded files: certificate templates and custom certificates.
//!
//! Files live flat in two directories and are referenced from the store by
//! bare filename only.

use chrono::Utc;
use image::ImageFormat;
use rand::Rng;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Unsupported file type")]
    UnsupportedType,

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid filename")]
    InvalidFilename,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Problems with the upload itself rather than the server
    pub fn is_client_error(&self) -> bool {
        !matches!(self, StorageError::Io(_))
    }
}

/// A file written to storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub filename: String,
    pub width: u32,
    pub height: u32,
}

pub struct FileStorage {
    templates_dir: PathBuf,
    certificates_dir: PathBuf,
}

impl FileStorage {
    pub fn new(templates_dir: impl Into<PathBuf>, certificates_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates_dir: templates_dir.into(),
            certificates_dir: certificates_dir.into(),
        }
    }

    /// Create both directories if needed
    pub fn ensure_dirs(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.templates_dir)?;
        std::fs::create_dir_all(&self.certificates_dir)
    }

    pub fn templates_dir(&self) -> &Path {
        &self.templates_dir
    }

    pub fn certificates_dir(&self) -> &Path {
        &self.certificates_dir
    }

    /// Store a PNG or JPEG template for an event.
    ///
    /// The content decides the type; the uploaded name only has to carry an
    /// allowed extension.
    pub fn save_template(
        &self,
        event_label: &str,
        original_name: &str,
        data: &[u8],
    ) -> Result<StoredFile, StorageError> {
        let format = upload_format(original_name, data, &[ImageFormat::Png, ImageFormat::Jpeg])?;
        let (width, height) = decoded_dimensions(data, format)?;

        let extension = match format {
            ImageFormat::Jpeg => "jpg",
            _ => "png",
        };
        let filename = unique_filename(
            &format!("template_{}", sanitize_filename(event_label)),
            extension,
        );
        std::fs::write(self.templates_dir.join(&filename), data)?;

        tracing::info!(%filename, width, height, "Stored template");
        Ok(StoredFile {
            filename,
            width,
            height,
        })
    }

    /// Store a pre-rendered PNG certificate for a participant.
    pub fn save_certificate(
        &self,
        participant_label: &str,
        original_name: &str,
        data: &[u8],
    ) -> Result<StoredFile, StorageError> {
        let format = upload_format(original_name, data, &[ImageFormat::Png])?;
        let (width, height) = decoded_dimensions(data, format)?;

        let filename = unique_filename(
            &format!("certificate_{}", sanitize_filename(participant_label)),
            "png",
        );
        std::fs::write(self.certificates_dir.join(&filename), data)?;

        tracing::info!(%filename, width, height, "Stored custom certificate");
        Ok(StoredFile {
            filename,
            width,
            height,
        })
    }

    pub fn template_path(&self, filename: &str) -> Result<PathBuf, StorageError> {
        resolve_in(&self.templates_dir, filename)
    }

    pub fn certificate_path(&self, filename: &str) -> Result<PathBuf, StorageError> {
        resolve_in(&self.certificates_dir, filename)
    }

    pub fn read_template(&self, filename: &str) -> Result<Vec<u8>, StorageError> {
        Ok(std::fs::read(self.template_path(filename)?)?)
    }

    pub fn delete_template(&self, filename: &str) -> Result<(), StorageError> {
        remove_if_present(&self.template_path(filename)?)
    }

    pub fn delete_certificate(&self, filename: &str) -> Result<(), StorageError> {
        remove_if_present(&self.certificate_path(filename)?)
    }
}

fn resolve_in(dir: &Path, filename: &str) -> Result<PathBuf, StorageError> {
    if filename.is_empty()
        || filename.contains(['/', '\\'])
        || filename == "."
        || filename == ".."
    {
        return Err(StorageError::InvalidFilename);
    }
    Ok(dir.join(filename))
}

fn remove_if_present(path: &Path) -> Result<(), StorageError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Removed file");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn upload_format(
    original_name: &str,
    data: &[u8],
    allowed: &[ImageFormat],
) -> Result<ImageFormat, StorageError> {
    let by_name = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| ImageFormat::from_extension(ext.to_ascii_lowercase()));
    if !by_name.is_some_and(|f| allowed.contains(&f)) {
        return Err(StorageError::UnsupportedType);
    }

    let by_content =
        image::guess_format(data).map_err(|e| StorageError::InvalidImage(e.to_string()))?;
    if !allowed.contains(&by_content) {
        return Err(StorageError::UnsupportedType);
    }
    Ok(by_content)
}

fn decoded_dimensions(data: &[u8], format: ImageFormat) -> Result<(u32, u32), StorageError> {
    let image = image::load_from_memory_with_format(data, format)
        .map_err(|e| StorageError::InvalidImage(e.to_string()))?;
    Ok((image.width(), image.height()))
}

/// Keep ASCII alphanumerics, `-` and `_`; everything else becomes `_`.
pub fn sanitize_filename(label: &str) -> String {
    let cleaned: String = label
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(50)
        .collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// `{prefix}_{YYYYmmdd_HHMMSS}_{8 hex}.{ext}`
pub fn unique_filename(prefix: &str, extension: &str) -> String {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let suffix = hex::encode(rand::thread_rng().gen::<[u8; 4]>());
    format!("{prefix}_{stamp}_{suffix}.{extension}")
}

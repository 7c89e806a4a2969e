//! Receipt upload handling.
//!
//! Validates an uploaded proof-of-payment image and stores it at a
//! deterministic location:
//!
//! ```text
//! <upload_root>/payments/<year>/<class>/<student_id>/<start>_<end>/receipt_<epoch_millis>.<ext>
//! ```
//!
//! `<year>` is the calendar year of the submission. File names carry the
//! submission timestamp and the store never replaces an existing file, so
//! two submissions cannot clobber each other.

use chrono::{DateTime, Datelike, Utc};
use shared::StudentClass;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::backend::domain::models::{MonthRange, ReceiptFile};
use crate::backend::storage::ReceiptStore;

/// MIME types accepted for receipts
pub const ALLOWED_MIME_TYPES: [&str; 5] = ["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"];

/// Default upper bound on receipt size (5 MiB); uploads must be strictly smaller
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

const DEFAULT_EXTENSION: &str = "jpg";

/// A file received from the client, not yet validated
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Only image files are allowed (JPG, PNG, GIF, WebP); got '{0}'")]
    UnsupportedType(String),
    #[error("File size must be less than {limit_mb}MB")]
    TooLarge { size: u64, max: u64, limit_mb: u64 },
    #[error("Failed to store receipt: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Whether the client sent something unacceptable, as opposed to a server-side failure
    pub fn is_validation(&self) -> bool {
        !matches!(self, UploadError::Io(_))
    }
}

/// Service that validates and persists receipt images
#[derive(Clone)]
pub struct UploadService {
    store: ReceiptStore,
    max_file_size: u64,
}

impl UploadService {
    pub fn new(store: ReceiptStore, max_file_size: u64) -> Self {
        Self { store, max_file_size }
    }

    pub fn store(&self) -> &ReceiptStore {
        &self.store
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Size error for a receipt of `size` bytes against the configured limit
    pub fn too_large(&self, size: u64) -> UploadError {
        UploadError::TooLarge {
            size,
            max: self.max_file_size,
            limit_mb: self.max_file_size / (1024 * 1024),
        }
    }

    /// Check MIME type and size
    pub fn validate(&self, file: &UploadedFile) -> Result<(), UploadError> {
        let content_type = file.content_type.trim().to_ascii_lowercase();
        if !ALLOWED_MIME_TYPES.contains(&content_type.as_str()) {
            return Err(UploadError::UnsupportedType(file.content_type.clone()));
        }

        if file.size() >= self.max_file_size {
            return Err(self.too_large(file.size()));
        }

        Ok(())
    }

    /// Directory (relative to the upload root) a receipt for this period lands in
    pub fn receipt_directory(year: i32, class: StudentClass, student_id: &str, period: &MonthRange) -> PathBuf {
        PathBuf::from("payments")
            .join(year.to_string())
            .join(class.as_str())
            .join(student_id)
            .join(format!("{}_{}", period.start, period.end))
    }

    /// Validate and store a receipt, returning where it was written
    pub async fn save_payment_file(
        &self,
        file: &UploadedFile,
        student_id: &str,
        class: StudentClass,
        period: &MonthRange,
        now: DateTime<Utc>,
    ) -> Result<ReceiptFile, UploadError> {
        if let Err(e) = self.validate(file) {
            warn!("Rejected receipt upload for student {}: {}", student_id, e);
            return Err(e);
        }

        let directory = Self::receipt_directory(now.year(), class, student_id, period);
        let stem = format!("receipt_{}", now.timestamp_millis());
        let extension = file_extension(&file.file_name);

        let file_name = self
            .store
            .write_new(&directory, &stem, &extension, &file.bytes)
            .await?;
        let file_path = ReceiptStore::public_path(&directory, &file_name);

        info!("Stored receipt for student {} at {}", student_id, file_path);

        Ok(ReceiptFile {
            file_path,
            file_name,
            file_size: file.size() as i64,
            file_mime_type: file.content_type.trim().to_ascii_lowercase(),
        })
    }

    /// Best-effort removal of a stored receipt
    pub async fn discard(&self, receipt: &ReceiptFile) {
        if let Err(e) = self.store.remove(&receipt.file_path).await {
            warn!("Failed to remove receipt {}: {}", receipt.file_path, e);
        }
    }
}

/// Extension of the client's file name, lower-cased; `jpg` when missing or odd
fn file_extension(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((_, ext))
            if !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

//! Error types for checkin.
//!
//! This module defines all error types used throughout the checkin crate,
//! providing detailed context for debugging and user-facing notices.

use std::path::PathBuf;
use thiserror::Error;

use crate::parser::ParseError;

/// The main error type for checkin operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A persisted entry could not be decoded.
    #[error("stored entry '{key}' is unreadable: {source}")]
    CorruptEntry {
        /// Key of the unreadable entry.
        key: String,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Check-in Errors ===
    /// The scanned or imported text is not a guest code.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The guest has already checked in.
    #[error("{name} has already checked in")]
    DuplicateGuest {
        /// Name of the guest as scanned.
        name: String,
        /// Phone of the guest as scanned.
        phone: String,
    },

    /// A prompt action was issued in a state that does not accept it.
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        /// The attempted action.
        action: &'static str,
        /// The current flow state.
        state: &'static str,
    },

    /// An event name was empty after trimming.
    #[error("event name cannot be empty")]
    EmptyEventName,

    // === Scanner Errors ===
    /// The camera or decode feed could not be acquired.
    #[error("unable to access scanner '{source_name}': {message}")]
    CameraAccess {
        /// Name of the decode source.
        source_name: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    // === Export Errors ===
    /// Bulk input contained no usable `name,phone` rows.
    #[error("no valid data found (expected format: name,phone, one per line)")]
    NoValidData,

    /// QR encoding failed (payload too long for any QR version).
    #[error("QR encoding failed: {0}")]
    QrEncode(#[from] qrcode::types::QrError),

    /// PNG encoding failed.
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    /// ZIP packaging failed.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for checkin operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a camera access error.
    #[must_use]
    pub fn camera_access(source_name: &'static str, message: impl Into<String>) -> Self {
        Self::CameraAccess {
            source_name,
            message: message.into(),
        }
    }

    /// Check if this error is a duplicate check-in.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateGuest { .. })
    }

    /// Check if the operation can succeed when simply retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CameraAccess { .. })
    }

    /// Check if this error came from the persistence layer.
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            Self::DatabaseOpen { .. }
                | Self::DatabaseQuery(_)
                | Self::DatabaseMigration { .. }
                | Self::CorruptEntry { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::EmptyEventName;
        assert_eq!(err.to_string(), "event name cannot be empty");

        let err = Error::internal("test error");
        assert_eq!(err.to_string(), "internal error: test error");
    }

    #[test]
    fn test_duplicate_guest_display() {
        let err = Error::DuplicateGuest {
            name: "Jane Doe".to_string(),
            phone: "555".to_string(),
        };
        assert_eq!(err.to_string(), "Jane Doe has already checked in");
        assert!(err.is_duplicate());
        assert!(!Error::NoValidData.is_duplicate());
    }

    #[test]
    fn test_camera_access_is_retryable() {
        let err = Error::camera_access("feed", "permission denied");
        assert!(err.is_retryable());
        let msg = err.to_string();
        assert!(msg.contains("feed"));
        assert!(msg.contains("permission denied"));

        assert!(!Error::NoValidData.is_retryable());
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = Error::InvalidTransition {
            action: "confirm party size",
            state: "idle",
        };
        assert_eq!(err.to_string(), "cannot confirm party size while idle");
    }

    #[test]
    fn test_parse_error_is_transparent() {
        let err: Error = ParseError::MissingFields { found: 1 }.into();
        assert_eq!(
            err.to_string(),
            ParseError::MissingFields { found: 1 }.to_string()
        );
    }

    #[test]
    fn test_no_valid_data_display() {
        assert!(Error::NoValidData.to_string().contains("name,phone"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
        assert!(!err.is_storage_error());
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
            assert!(err.is_storage_error());
        }
    }

    #[test]
    fn test_corrupt_entry_display() {
        let source = serde_json::from_str::<Vec<u8>>("not json").unwrap_err();
        let err = Error::CorruptEntry {
            key: "guests".to_string(),
            source,
        };
        assert!(err.to_string().contains("guests"));
        assert!(err.is_storage_error());
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "max_party_size must be at least 1".to_string(),
        };
        assert!(err.to_string().contains("max_party_size"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}

//! Crate-level error type.
//!
//! Validation failures (quota, missing image) block the specific action and
//! are surfaced to the caller; decode and persistence failures carry the
//! underlying error. Remote sync failures are deliberately *not* routed
//! through this type by the store's sync path — they are recorded as a
//! non-fatal status instead (see [`crate::store::CustomizationStore`]).

use thiserror::Error;

/// Errors produced by the customization engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A save would push the collection past the package quota.
    #[error("requested {requested} copies but only {remaining} remain in the package quota")]
    QuotaExceeded { requested: u32, remaining: u32 },

    /// An operation required a loaded photo and none was present.
    #[error("no image loaded in the working slot")]
    MissingImage,

    /// Every saved item must allocate at least one copy.
    #[error("copies must be at least 1")]
    InvalidCopies,

    /// Calendar month numbers are 1 through 12.
    #[error("month number {0} is out of range (1-12)")]
    InvalidMonth(u8),

    /// Referenced a saved item id that does not exist in the collection.
    #[error("no saved item with id {0}")]
    UnknownId(u64),

    /// The image bytes could not be decoded or re-encoded.
    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),

    /// A stored data URL was malformed and could not be decoded.
    #[error("malformed image data URL")]
    InvalidDataUrl,

    /// Writing or reading the local store file failed.
    #[error("store persistence failed: {0}")]
    Persist(#[from] std::io::Error),

    /// (De)serialization of persisted customization data failed.
    #[error("customization serialization failed: {0}")]
    Serde(#[from] serde_json::Error),

    /// A remote sync request failed.
    #[error("remote sync failed: {0}")]
    Sync(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

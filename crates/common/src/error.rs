//! Common error types.

use thiserror::Error;

/// Errors raised where new image content enters a layer stack.
#[derive(Error, Debug)]
pub enum OverlayError {
    /// The initial layer mapping is not dense from index 0.
    #[error("invalid layer dictionary")]
    InvalidDictionary,

    #[error("{name}: was not found")]
    ImageNotFound { name: String },

    /// The image data could not be turned into a usable raster.
    #[error("{}: is invalid ({reason})", .name.as_deref().unwrap_or("image"))]
    InvalidImage {
        name: Option<String>,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type OverlayResult<T> = Result<T, OverlayError>;

impl OverlayError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::ImageNotFound { name: name.into() }
    }

    /// Invalid image data that did not come from a named asset.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidImage {
            name: None,
            reason: reason.into(),
        }
    }

    pub fn invalid_named(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidImage {
            name: Some(name.into()),
            reason: reason.into(),
        }
    }

    /// Attach an asset name to an `InvalidImage` that does not carry one yet.
    pub fn with_name(self, asset: &str) -> Self {
        match self {
            Self::InvalidImage { name: None, reason } => Self::InvalidImage {
                name: Some(asset.to_string()),
                reason,
            },
            other => other,
        }
    }

    pub fn is_invalid_dictionary(&self) -> bool {
        matches!(self, Self::InvalidDictionary)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ImageNotFound { .. })
    }

    pub fn is_invalid_image(&self) -> bool {
        matches!(self, Self::InvalidImage { .. })
    }
}

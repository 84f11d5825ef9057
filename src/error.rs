//! Error types for skin-ngin

use thiserror::Error;

/// Errors surfaced by the loader and the render lifecycle.
///
/// Loader failures carry the offending url so callers can tell a broken skin
/// host apart from a broken cape host. Cape failures never reach the caller of
/// [`SkinRender::render`](crate::skin::SkinRender::render) since a missing cape
/// is not fatal, but they are logged through this type.
#[derive(Error, Debug)]
pub enum SkinError {
    #[error("Invalid texture value: {0}")]
    InvalidDescriptor(String),

    #[error("Failed to load skin from {url}: {source}")]
    SkinLoad {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to load cape from {url}: {source}")]
    CapeLoad {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to look up player {name}: {source}")]
    Lookup {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("The renderer has not been initialized")]
    NotInitialized,

    #[error("The renderer has been disposed")]
    Disposed,

    #[error("Graphics backend error: {0}")]
    Backend(#[source] anyhow::Error),

    #[error("Could not encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Unsupported image type: {0}")]
    UnsupportedMime(String),

    #[error("Invalid render options: {0}")]
    Options(#[from] serde_json::Error),
}

/// Result type alias for skin-ngin operations
pub type Result<T> = std::result::Result<T, SkinError>;

use std::path::PathBuf;

/// Errors raised by the fetch, embedding and display helpers.
///
/// Attribute extraction never produces these: it reports unrecognized input
/// through [`crate::attributes::Extraction`] instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("object store request failed: {0}")]
    Store(String),

    #[error("failed to decode image {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),

    #[error("grid figure too large: {panels} panels of {panel_width}x{panel_height}px")]
    FigureTooLarge {
        panels: u32,
        panel_width: u32,
        panel_height: u32,
    },

    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("failed to encode model request: {0}")]
    EncodeRequest(#[source] serde_json::Error),

    #[error("model invocation failed: {0}")]
    Invocation(String),

    #[error("malformed model response: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    #[error("missing field `{0}`")]
    MissingField(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

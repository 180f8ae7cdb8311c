//! # Generation Error Types Module
//!
//! Error types raised by the generation backend. They never reach the user:
//! the generation client logs them and substitutes an apology or `None`.

/// Custom error types for generation backend calls
#[derive(Debug, Clone)]
pub enum GenerationError {
    /// Network or transport failure talking to the API
    Http(String),
    /// The API answered with a non-success status
    Api { status: u16, message: String },
    /// The API answered successfully but the body was unusable
    InvalidResponse(String),
    /// The input image could not be decoded or re-encoded
    Image(String),
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::Http(msg) => write!(f, "HTTP error: {msg}"),
            GenerationError::Api { status, message } => {
                write!(f, "API error ({status}): {message}")
            }
            GenerationError::InvalidResponse(msg) => write!(f, "Invalid response: {msg}"),
            GenerationError::Image(msg) => write!(f, "Image error: {msg}"),
        }
    }
}

impl std::error::Error for GenerationError {}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::Http(err.to_string())
    }
}

impl From<image::ImageError> for GenerationError {
    fn from(err: image::ImageError) -> Self {
        GenerationError::Image(err.to_string())
    }
}

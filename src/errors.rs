use std::path::PathBuf;
use thiserror::Error;

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Structured error types for the depth-map conversion pipeline.
///
/// Each variant carries the context of its domain (filesystem, video I/O,
/// model inference) so the binary can report a failure without the caller
/// having to parse error strings.
#[derive(Error, Debug)]
pub enum DepthMapError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot open video {path:?}")]
    VideoOpen { path: PathBuf },

    #[error("Video error: {operation} failed")]
    Video {
        operation: String,
        #[source]
        source: BoxedError,
    },

    #[error("Image processing error: {operation} failed")]
    ImageProcessing {
        operation: String,
        #[source]
        source: BoxedError,
    },

    #[error("Model error: {operation} failed")]
    Model {
        operation: String,
        #[source]
        source: BoxedError,
    },
}

pub type Result<T> = std::result::Result<T, DepthMapError>;

impl DepthMapError {
    pub(crate) fn video(operation: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        Self::Video {
            operation: operation.into(),
            source: source.into(),
        }
    }

    pub(crate) fn model(operation: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        Self::Model {
            operation: operation.into(),
            source: source.into(),
        }
    }
}

/// Fallback for I/O errors raised without path context.
///
/// Call sites that know the path construct `DepthMapError::FileSystem` directly.
impl From<std::io::Error> for DepthMapError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

impl From<image::ImageError> for DepthMapError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageProcessing {
            operation: "image processing".to_string(),
            source: Box::new(err),
        }
    }
}

impl From<ort::Error> for DepthMapError {
    fn from(err: ort::Error) -> Self {
        Self::model("ort operation", err)
    }
}

/// Shape errors come out of tensor handling around inference, so they are
/// reported as model errors.
impl From<ndarray::ShapeError> for DepthMapError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::model("tensor shape conversion", err)
    }
}

#[cfg(feature = "opencv")]
impl From<opencv::Error> for DepthMapError {
    fn from(err: opencv::Error) -> Self {
        Self::video("opencv operation", err)
    }
}

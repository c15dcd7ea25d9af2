//! Centralized error handling for opinion_vis
//!
//! Every fallible operation in the crate returns [`Result`], which carries an
//! [`OpinionVisError`] describing where loading, numerics or rendering went wrong.

use std::fmt;

/// Main error type for opinion_vis operations
#[derive(Debug)]
pub enum OpinionVisError {
    /// NetCDF / HDF5 file operation errors
    NetCDFError(netcdf::Error),

    /// I/O operation errors
    IoError(std::io::Error),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// PNG / GIF encoding errors
    ImageError(image::ImageError),

    /// Malformed metadata or render configuration
    ConfigError(String),

    /// Required dataset missing from a result file
    DatasetNotFound { dataset: String },

    /// Dataset present but with an unexpected shape
    ShapeMismatch { message: String },

    /// Numeric helper called with input it cannot handle
    NumericsError(String),

    /// Figure or movie could not be produced
    RenderError(String),

    /// Thread pool configuration error
    ThreadPoolError(String),

    /// Generic error for ad-hoc messages
    Generic(String),
}

impl fmt::Display for OpinionVisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpinionVisError::NetCDFError(e) => write!(f, "NetCDF/HDF5 error: {}", e),
            OpinionVisError::IoError(e) => write!(f, "I/O error: {}", e),
            OpinionVisError::ArrayError(e) => write!(f, "Array error: {}", e),
            OpinionVisError::ImageError(e) => write!(f, "Image encoding error: {}", e),
            OpinionVisError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            OpinionVisError::DatasetNotFound { dataset } => {
                write!(f, "Dataset '{}' not found in run", dataset)
            }
            OpinionVisError::ShapeMismatch { message } => write!(f, "Shape mismatch: {}", message),
            OpinionVisError::NumericsError(msg) => write!(f, "Numerics error: {}", msg),
            OpinionVisError::RenderError(msg) => write!(f, "Render error: {}", msg),
            OpinionVisError::ThreadPoolError(msg) => write!(f, "Thread pool error: {}", msg),
            OpinionVisError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for OpinionVisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OpinionVisError::NetCDFError(e) => Some(e),
            OpinionVisError::IoError(e) => Some(e),
            OpinionVisError::ArrayError(e) => Some(e),
            OpinionVisError::ImageError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for OpinionVisError {
    fn from(error: netcdf::Error) -> Self {
        OpinionVisError::NetCDFError(error)
    }
}

impl From<std::io::Error> for OpinionVisError {
    fn from(error: std::io::Error) -> Self {
        OpinionVisError::IoError(error)
    }
}

impl From<ndarray::ShapeError> for OpinionVisError {
    fn from(error: ndarray::ShapeError) -> Self {
        OpinionVisError::ArrayError(error)
    }
}

impl From<image::ImageError> for OpinionVisError {
    fn from(error: image::ImageError) -> Self {
        OpinionVisError::ImageError(error)
    }
}

impl<E> From<plotters::drawing::DrawingAreaErrorKind<E>> for OpinionVisError
where
    E: std::error::Error + Send + Sync,
{
    fn from(error: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        OpinionVisError::RenderError(error.to_string())
    }
}

impl From<toml::de::Error> for OpinionVisError {
    fn from(error: toml::de::Error) -> Self {
        OpinionVisError::ConfigError(error.to_string())
    }
}

impl From<String> for OpinionVisError {
    fn from(error: String) -> Self {
        OpinionVisError::Generic(error)
    }
}

impl From<&str> for OpinionVisError {
    fn from(error: &str) -> Self {
        OpinionVisError::Generic(error.to_string())
    }
}

/// Result type alias for opinion_vis operations
pub type Result<T> = std::result::Result<T, OpinionVisError>;

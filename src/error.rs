use thiserror::Error;

/// Errors raised by the remote call gateway layer.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No session was supplied and no default session is set.
    ///
    /// This is a configuration error: the caller must connect a gateway and
    /// either pass it explicitly or install it with
    /// [`set_default_session`](crate::gateway::set_default_session).
    #[error("no gateway session available: pass one explicitly or set a default session")]
    NoSession,

    /// A remote method invocation failed.
    ///
    /// The message comes from the underlying transport unmodified. This
    /// layer performs no retries.
    #[error("remote call `{method}` failed: {message}")]
    Call { method: String, message: String },

    /// The gateway connection is no longer usable.
    #[error("gateway disconnected: {0}")]
    Disconnected(String),
}

impl GatewayError {
    /// Build a [`GatewayError::Call`] from a method name and message.
    pub fn call(method: impl Into<String>, message: impl Into<String>) -> Self {
        GatewayError::Call {
            method: method.into(),
            message: message.into(),
        }
    }
}

/// Errors that can occur when reading pixel blocks from a remote image server.
#[derive(Debug, Error)]
pub enum PixelError {
    /// Error from the call gateway.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Requested level does not exist in the pyramid.
    ///
    /// `level` is the value after negative-index resolution.
    #[error("invalid level: {level}, pyramid has {levels} level(s)")]
    InvalidLevel { level: i32, levels: usize },

    /// Requested block has an empty or negative extent.
    #[error("invalid block: {width}x{height} at ({x}, {y})")]
    InvalidBlock {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },

    /// Decoded payload could not be interpreted as pixels.
    #[error("decode error: {0}")]
    Decode(String),

    /// Remote side reported a pixel datatype this crate does not model.
    #[error("unsupported pixel datatype: {0}")]
    UnsupportedDataType(String),

    /// Remote metadata is internally inconsistent.
    #[error("inconsistent metadata: {0}")]
    Metadata(String),

    /// No remote image server could be resolved.
    #[error("no remote image server could be resolved (is an image open?)")]
    ServerNotFound,

    /// I/O error while reading a temp file written by the remote side.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for PixelError {
    fn from(e: image::ImageError) -> Self {
        PixelError::Decode(e.to_string())
    }
}

impl From<tiff::TiffError> for PixelError {
    fn from(e: tiff::TiffError) -> Self {
        PixelError::Decode(e.to_string())
    }
}

impl From<base64::DecodeError> for PixelError {
    fn from(e: base64::DecodeError) -> Self {
        PixelError::Decode(format!("base64: {e}"))
    }
}

/// Errors that can occur when exchanging annotation objects.
#[derive(Debug, Error)]
pub enum ObjectError {
    /// Error from the call gateway.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Interchange text could not be parsed.
    #[error("interchange parse error: {0}")]
    Interchange(#[from] serde_json::Error),

    /// A feature payload did not have the expected shape.
    #[error("malformed feature: {0}")]
    MalformedFeature(String),

    /// No image-data could be resolved for a write operation.
    #[error("cannot find an image-data handle to write to")]
    MissingImageData,
}

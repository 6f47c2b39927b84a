/// Convenience result type used across ecoticket.
pub type TicketResult<T> = Result<T, TicketError>;

/// Generic user-facing text for delivery failures without a server-provided message.
pub const GENERIC_DELIVERY_MESSAGE: &str = "Something went wrong. Please try again.";

/// Top-level error taxonomy used by pipeline APIs.
///
/// No variant is fatal to the process: asset failures are absorbed by the logo cache, readiness
/// timeouts are downgraded to warnings, and capture/delivery failures end in a retryable state.
#[derive(thiserror::Error, Debug)]
pub enum TicketError {
    /// Invalid user-provided form or configuration data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Logo fetch or decode failure.
    #[error("asset load error: {0}")]
    AssetLoad(String),

    /// The card never reported readiness within the allotted attempts.
    #[error("readiness timeout after {attempts} attempt(s)")]
    ReadinessTimeout {
        /// Number of wait attempts performed.
        attempts: u32,
    },

    /// Rasterization of the ticket card failed.
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Backend call failed (non-2xx or transport failure).
    #[error("delivery error: {message}")]
    Delivery {
        /// HTTP status when a response was received.
        status: Option<u16>,
        /// Human-readable message.
        message: String,
        /// Whether `message` came verbatim from the server's `{error}` body.
        server_message: bool,
    },

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TicketError {
    /// Build a [`TicketError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`TicketError::AssetLoad`] value.
    pub fn asset_load(msg: impl Into<String>) -> Self {
        Self::AssetLoad(msg.into())
    }

    /// Build a [`TicketError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Build a [`TicketError::Delivery`] value for a transport failure (no response).
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Delivery {
            status: None,
            message: msg.into(),
            server_message: false,
        }
    }

    /// Build a [`TicketError::Delivery`] value from an HTTP status and an optional server message.
    pub fn http(status: u16, server_error: Option<String>) -> Self {
        match server_error {
            Some(message) if !message.trim().is_empty() => Self::Delivery {
                status: Some(status),
                message,
                server_message: true,
            },
            _ => Self::Delivery {
                status: Some(status),
                message: format!("Server error {status}"),
                server_message: false,
            },
        }
    }

    /// HTTP status attached to a delivery failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Delivery { status, .. } => *status,
            _ => None,
        }
    }

    /// Text suitable for a user notification.
    ///
    /// Server-provided delivery messages are returned verbatim; everything else maps to `generic`.
    pub fn user_message(&self, generic: &str) -> String {
        match self {
            Self::Delivery {
                message,
                server_message: true,
                ..
            } => message.clone(),
            Self::Validation(msg) => msg.clone(),
            _ => generic.to_string(),
        }
    }
}

/// Failures of the raster capture stage.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The card subtree measured zero height (hidden or not laid out).
    #[error("card has zero measured height")]
    ZeroHeight,

    /// The rasterizer was asked to resolve a remotely hosted font family.
    #[error("refusing to read remote font rules for family '{family}'")]
    RemoteFont {
        /// Offending family name.
        family: String,
    },

    /// An image in the card never produced decoded, non-zero-sized pixels.
    #[error("image '{src}' did not finish loading")]
    ImageNotLoaded {
        /// Image source reference (truncated for data URIs).
        src: String,
    },

    /// Markup parsing or pixmap allocation failed.
    #[error("rasterization failed: {0}")]
    Raster(String),

    /// JPEG encoding failed.
    #[error("encoding failed: {0}")]
    Encode(String),
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

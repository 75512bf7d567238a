//! Error types for the broadcast engine

/// Result type alias for broadcast operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when building or driving a channel
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Channel built without a source manifest
    #[error("Cannot create channel without a source")]
    MissingSource,

    /// Channel built without a mode
    #[error("Cannot create channel without a mode")]
    MissingMode,

    /// Channel built without a color
    #[error("Cannot create channel without a color")]
    MissingColor,

    /// Color outside the known set
    #[error("Invalid color '{0}' (must be one of yellow, red, green, blue)")]
    InvalidColor(String),

    /// Offset requested before the broadcast was started
    #[error("Channel is not broadcasting")]
    NotBroadcasting,

    /// Rotation to the source the channel already plays
    #[error("Cannot rotate channel to '{requested}': it is already the current source")]
    InvalidRotation { requested: String },

    /// Manifest could not be read from the store
    #[error("Failed to read manifest '{source_name}': {error}")]
    Manifest {
        source_name: String,
        #[source]
        error: std::io::Error,
    },

    /// Duration requested on a livestream channel
    #[error("Duration is undefined for a livestream channel")]
    LivestreamDuration,

    /// Malformed `#EXTINF:` value
    #[error("Invalid segment duration '{value}' on manifest line {line}")]
    InvalidSegmentDuration { line: usize, value: String },

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn manifest(source_name: impl Into<String>, error: std::io::Error) -> Self {
        Self::Manifest {
            source_name: source_name.into(),
            error,
        }
    }

    /// Returns `true` for errors caused by a bad channel definition
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            Self::MissingSource | Self::MissingMode | Self::MissingColor | Self::InvalidColor(_)
        )
    }
}

//! Error types for the delivery bridge.

/// Configuration lookup errors. Always recovered locally by the bridge.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration value for {key} is not valid unicode")]
    NotUnicode { key: String },

    #[error("Configuration source unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// The delivery could not be normalized into a processing context.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Malformed JSON payload for {content_type}: {source}")]
    MalformedJson {
        content_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Payload for {content_type} is not valid UTF-8 (invalid byte at offset {offset})")]
    InvalidUtf8 { content_type: String, offset: usize },

    #[error("Payload for {content_type} declared us-ascii but has a non-ASCII byte at offset {offset}")]
    NonAscii { content_type: String, offset: usize },

    #[error("Unsupported charset {charset} for {content_type}")]
    UnsupportedCharset {
        content_type: String,
        charset: String,
    },

    #[error("Invalid content type: {0}")]
    InvalidContentType(String),
}

/// The downstream pipeline did not complete normally.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingFailure {
    #[error("Pipeline rejected message: {0}")]
    Rejected(String),

    #[error("Pipeline panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Broker channel errors raised while settling a delivery.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to settle delivery {delivery_tag}: {reason}")]
    SettleFailed { delivery_tag: u64, reason: String },
}

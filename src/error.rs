use thiserror::Error;

/// Errors raised while building or querying the tree map.
#[derive(Debug, Error)]
pub enum Error {
    #[error("handshake of channel {channel_id} could not be resolved: {reason}")]
    HandshakeUnresolved { channel_id: i64, reason: String },

    #[error("invalid URI {uri:?}: {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("URI {0:?} has no host")]
    MissingHost(String),

    #[error("child index {index} out of range (node has {len} children)")]
    ChildIndexOutOfRange { index: usize, len: usize },

    #[error("payload is not {format}: {reason}")]
    Analysis { format: &'static str, reason: String },

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

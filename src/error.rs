pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Connection endpoint does not exist: {id}")]
    InvalidReference { id: String },

    #[error("Malformed snapshot: {detail}")]
    MalformedSnapshot { detail: String },

    #[error("Connection released over empty canvas")]
    NoSnapTarget,

    #[error("Unknown component: {id}")]
    UnknownComponent { id: String },

    #[error("Unknown connection: {id}")]
    UnknownConnection { id: String },

    #[error("Invalid palette payload: {message}")]
    InvalidPayload { message: String },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedSnapshot {
            detail: detail.into(),
        }
    }
}

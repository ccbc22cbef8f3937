use thiserror::Error;

/// Errors raised while talking to the backend.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Response is missing field `{field}`")]
    MissingField { field: &'static str },

    #[error("Request task did not finish: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type ClientResult<T> = Result<T, ClientError>;

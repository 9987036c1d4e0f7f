use reqwest::StatusCode;
use thiserror::Error;

#[remain::sorted]
#[derive(Debug, Error)]
pub enum ScmError {
    /// The caller fired the cancellation token before the request completed.
    #[error("request cancelled")]
    Cancelled,

    /// Non-success response from the hosted platform.
    #[error("HTTP Error. Code: {status}, message: {error}")]
    HttpError { status: StatusCode, error: String },

    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),

    #[error("{0} not found")]
    NotFound(String),

    /// Errors returned by reqwest
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    /// Serde JSON parsing error
    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    /// URL Parsing Error
    #[error(transparent)]
    UrlParserError(#[from] url::ParseError),
}

pub type ScmResult<T> = Result<T, ScmError>;

use thiserror::Error;

/// Failure to get a usable envelope back from the API.
///
/// A well-formed `{success: false}` envelope is not an error at this level;
/// it comes back as `Ok` and the view decides what to show.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("not signed in")]
    Unauthenticated,
}

pub type ApiResult<T> = Result<T, ApiError>;

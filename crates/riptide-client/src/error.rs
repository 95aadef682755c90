use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status} for {path}")]
    Status { status: u16, path: String },
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Snapshot encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Request decoding error: {0}")]
    Decode(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

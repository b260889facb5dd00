use thiserror::Error;

/// The ways a photo operation can fail.
#[derive(Error, Debug)]
pub enum PhotoError {
    #[error("no photo payload was supplied")]
    NoInput,

    #[error("the photo category is empty")]
    EmptyCategory,

    #[error("photo is {size} bytes which exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("photo {blob} does not exist in category {container}")]
    NotFound { container: String, blob: String },

    #[error("storage backend operation failed: {0:#}")]
    Backend(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PhotoError>;

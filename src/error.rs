use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("image pool exhausted ({capacity} sprites in use)")]
    PoolExhausted { capacity: usize },

    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

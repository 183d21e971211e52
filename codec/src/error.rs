use thiserror::Error;

pub(crate) type Result<T> = std::result::Result<T, CodecError>;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Failed to encode image: {0}")]
    Encode(image::ImageError),

    #[error("Expected a [1, 3, H, W] image tensor, got {dims:?}")]
    InvalidTensor { dims: [usize; 4] },
}

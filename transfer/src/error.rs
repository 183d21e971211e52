use thiserror::Error;

pub(crate) type Result<T> = std::result::Result<T, TransferError>;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Codec(#[from] codec::CodecError),

    #[error(transparent)]
    Shape(#[from] vgg::ShapeError),

    #[error("Content shape {content:?} and style shape {style:?} must match before optimization")]
    ShapeMismatch {
        content: [usize; 4],
        style: [usize; 4],
    },

    #[error("Parameter '{name}' - value '{value}' is outside the range of {min}-{max}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Total loss became non-finite ({loss}) at step {step}")]
    NonFiniteLoss { step: u32, loss: f32 },
}

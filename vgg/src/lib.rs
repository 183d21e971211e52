mod gram;
mod model;

pub use gram::gram;
pub use model::{Features, ShapeError, StyleLayer, Vgg, VggConfig};

/// CPU backend the engine runs on.
pub type MainBackend = burn::backend::NdArray;

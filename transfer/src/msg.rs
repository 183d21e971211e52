use serde::{Deserialize, Serialize};

/// Snapshot of the loss terms at one checkpoint of a run.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ProgressSample {
    pub step: u32,
    pub total_loss: f32,
    pub content_loss: f32,
    pub style_loss: f32,
}

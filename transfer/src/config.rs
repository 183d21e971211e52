use burn::prelude::Config;
use vgg::StyleLayer;

use crate::error::TransferError;

#[derive(Config, Debug)]
pub struct TransferConfig {
    /// Weight of the content-fidelity term.
    #[config(default = 1.0)]
    pub content_weight: f32,

    /// Weight of the combined style term. Raw style losses are orders of
    /// magnitude smaller than content losses; the default rebalances them.
    #[config(default = 1e6)]
    pub style_weight: f32,

    /// Number of optimization steps.
    #[config(default = 300)]
    pub steps: u32,

    /// Smallest accepted value for `steps`.
    #[config(default = 50)]
    pub min_steps: u32,

    /// Largest accepted value for `steps`.
    #[config(default = 1000)]
    pub max_steps: u32,

    /// Adam learning rate for the target image.
    #[config(default = 3e-3)]
    pub learning_rate: f64,

    /// Inputs whose longer side exceeds this are shrunk before optimization.
    #[config(default = 512)]
    pub max_size: u32,

    /// Style weight of the conv1_1 tap.
    #[config(default = 1.0)]
    pub conv1_1_weight: f32,

    /// Style weight of the conv2_1 tap.
    #[config(default = 0.8)]
    pub conv2_1_weight: f32,

    /// Style weight of the conv3_1 tap.
    #[config(default = 0.5)]
    pub conv3_1_weight: f32,

    /// Style weight of the conv4_1 tap.
    #[config(default = 0.3)]
    pub conv4_1_weight: f32,

    /// Style weight of the conv5_1 tap.
    #[config(default = 0.1)]
    pub conv5_1_weight: f32,
}

impl TransferConfig {
    pub fn style_layer_weight(&self, layer: StyleLayer) -> f32 {
        match layer {
            StyleLayer::Conv1_1 => self.conv1_1_weight,
            StyleLayer::Conv2_1 => self.conv2_1_weight,
            StyleLayer::Conv3_1 => self.conv3_1_weight,
            StyleLayer::Conv4_1 => self.conv4_1_weight,
            StyleLayer::Conv5_1 => self.conv5_1_weight,
        }
    }

    /// Check every hyperparameter before any computation starts.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.steps < self.min_steps || self.steps > self.max_steps {
            return Err(TransferError::InvalidParameter {
                name: "steps",
                value: self.steps as f64,
                min: self.min_steps as f64,
                max: self.max_steps as f64,
            });
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(TransferError::InvalidParameter {
                name: "learning_rate",
                value: self.learning_rate,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        if self.max_size == 0 {
            return Err(TransferError::InvalidParameter {
                name: "max_size",
                value: 0.0,
                min: 1.0,
                max: u32::MAX as f64,
            });
        }

        let weights = [
            ("content_weight", self.content_weight),
            ("style_weight", self.style_weight),
            ("conv1_1_weight", self.conv1_1_weight),
            ("conv2_1_weight", self.conv2_1_weight),
            ("conv3_1_weight", self.conv3_1_weight),
            ("conv4_1_weight", self.conv4_1_weight),
            ("conv5_1_weight", self.conv5_1_weight),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(TransferError::InvalidParameter {
                    name,
                    value: value as f64,
                    min: 0.0,
                    max: f64::INFINITY,
                });
            }
        }

        Ok(())
    }
}

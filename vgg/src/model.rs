use std::path::Path;

use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        PaddingConfig2d,
    },
    prelude::{Backend, Config},
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder, RecorderError},
    tensor::{activation::relu, Tensor},
};
use thiserror::Error;

/// The five tapped style layers, in network order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StyleLayer {
    Conv1_1,
    Conv2_1,
    Conv3_1,
    Conv4_1,
    Conv5_1,
}

impl StyleLayer {
    pub const ALL: [StyleLayer; 5] = [
        StyleLayer::Conv1_1,
        StyleLayer::Conv2_1,
        StyleLayer::Conv3_1,
        StyleLayer::Conv4_1,
        StyleLayer::Conv5_1,
    ];
}

#[derive(Debug, Error)]
#[error("Expected a [1, 3, H, W] image tensor with nonzero spatial dims, got {dims:?}")]
pub struct ShapeError {
    pub dims: [usize; 4],
}

/// Activations captured at the six tap points of one forward pass.
#[derive(Clone, Debug)]
pub struct Features<B: Backend> {
    pub conv1_1: Tensor<B, 4>,
    pub conv2_1: Tensor<B, 4>,
    pub conv3_1: Tensor<B, 4>,
    pub conv4_1: Tensor<B, 4>,
    /// Content representation.
    pub conv4_2: Tensor<B, 4>,
    pub conv5_1: Tensor<B, 4>,
}

impl<B: Backend> Features<B> {
    pub fn style(&self, layer: StyleLayer) -> &Tensor<B, 4> {
        match layer {
            StyleLayer::Conv1_1 => &self.conv1_1,
            StyleLayer::Conv2_1 => &self.conv2_1,
            StyleLayer::Conv3_1 => &self.conv3_1,
            StyleLayer::Conv4_1 => &self.conv4_1,
            StyleLayer::Conv5_1 => &self.conv5_1,
        }
    }
}

#[derive(Config, Debug)]
pub struct VggConfig {
    /// Channel width of each conv block. The pretrained network uses
    /// [64, 128, 256, 512, 512]; tests shrink these for cheap forward passes.
    #[config(default = "[64, 128, 256, 512, 512]")]
    pub block_channels: [usize; 5],
}

impl VggConfig {
    /// Initialize with random weights. Real runs load a pretrained record on
    /// top, see [`Vgg::load`].
    pub fn init<B: Backend>(&self, device: &B::Device) -> Vgg<B> {
        let conv = |inp, out| {
            Conv2dConfig::new([inp, out], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device)
        };
        let [c1, c2, c3, c4, c5] = self.block_channels;

        Vgg {
            conv1_1: conv(3, c1),
            conv1_2: conv(c1, c1),
            conv2_1: conv(c1, c2),
            conv2_2: conv(c2, c2),
            conv3_1: conv(c2, c3),
            conv3_2: conv(c3, c3),
            conv3_3: conv(c3, c3),
            conv3_4: conv(c3, c3),
            conv4_1: conv(c3, c4),
            conv4_2: conv(c4, c4),
            conv4_3: conv(c4, c4),
            conv4_4: conv(c4, c4),
            conv5_1: conv(c4, c5),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        }
    }
}

/// VGG19 convolutional prefix, truncated after the last tapped layer.
///
/// The taps match torchvision's `vgg19().features` indices
/// {0, 5, 10, 19, 21, 28}: the raw convolution outputs, captured before
/// the ReLU that feeds the next layer.
#[derive(Module, Debug)]
pub struct Vgg<B: Backend> {
    conv1_1: Conv2d<B>,
    conv1_2: Conv2d<B>,
    conv2_1: Conv2d<B>,
    conv2_2: Conv2d<B>,
    conv3_1: Conv2d<B>,
    conv3_2: Conv2d<B>,
    conv3_3: Conv2d<B>,
    conv3_4: Conv2d<B>,
    conv4_1: Conv2d<B>,
    conv4_2: Conv2d<B>,
    conv4_3: Conv2d<B>,
    conv4_4: Conv2d<B>,
    conv5_1: Conv2d<B>,
    pool: MaxPool2d,
}

impl<B: Backend> Vgg<B> {
    /// Load pretrained weights from a named-MessagePack record and freeze
    /// them. Gradients only ever flow back to the input tensor.
    pub fn load(path: &Path, device: &B::Device) -> Result<Self, RecorderError> {
        let record = NamedMpkFileRecorder::<FullPrecisionSettings>::default()
            .load(path.to_path_buf(), device)?;
        Ok(VggConfig::new().init(device).load_record(record).no_grad())
    }

    /// Run one forward pass, capturing the six tap activations.
    pub fn extract(&self, image: Tensor<B, 4>) -> Result<Features<B>, ShapeError> {
        let dims = image.dims();
        let [batch, channels, height, width] = dims;
        if batch != 1 || channels != 3 || height == 0 || width == 0 {
            return Err(ShapeError { dims });
        }

        let conv1_1 = self.conv1_1.forward(image);
        let x = relu(conv1_1.clone());
        let x = relu(self.conv1_2.forward(x));
        let x = self.pool.forward(x);

        let conv2_1 = self.conv2_1.forward(x);
        let x = relu(conv2_1.clone());
        let x = relu(self.conv2_2.forward(x));
        let x = self.pool.forward(x);

        let conv3_1 = self.conv3_1.forward(x);
        let x = relu(conv3_1.clone());
        let x = relu(self.conv3_2.forward(x));
        let x = relu(self.conv3_3.forward(x));
        let x = relu(self.conv3_4.forward(x));
        let x = self.pool.forward(x);

        let conv4_1 = self.conv4_1.forward(x);
        let x = relu(conv4_1.clone());
        let conv4_2 = self.conv4_2.forward(x);
        let x = relu(conv4_2.clone());
        let x = relu(self.conv4_3.forward(x));
        let x = relu(self.conv4_4.forward(x));
        let x = self.pool.forward(x);

        let conv5_1 = self.conv5_1.forward(x);

        Ok(Features {
            conv1_1,
            conv2_1,
            conv3_1,
            conv4_1,
            conv4_2,
            conv5_1,
        })
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    use super::*;

    type TestBackend = NdArray;

    fn narrow_vgg(device: &<TestBackend as Backend>::Device) -> Vgg<TestBackend> {
        VggConfig::new()
            .with_block_channels([4, 8, 8, 8, 8])
            .init(device)
    }

    #[test]
    fn extract_produces_tap_shapes() {
        let device = Default::default();
        let vgg = narrow_vgg(&device);

        let image = Tensor::<TestBackend, 4>::zeros([1, 3, 64, 64], &device);
        let features = vgg.extract(image).unwrap();

        assert_eq!(features.conv1_1.dims(), [1, 4, 64, 64]);
        assert_eq!(features.conv2_1.dims(), [1, 8, 32, 32]);
        assert_eq!(features.conv3_1.dims(), [1, 8, 16, 16]);
        assert_eq!(features.conv4_1.dims(), [1, 8, 8, 8]);
        assert_eq!(features.conv4_2.dims(), [1, 8, 8, 8]);
        assert_eq!(features.conv5_1.dims(), [1, 8, 4, 4]);
    }

    #[test]
    fn extract_rejects_malformed_input() {
        let device = Default::default();
        let vgg = narrow_vgg(&device);

        let grayscale = Tensor::<TestBackend, 4>::zeros([1, 1, 16, 16], &device);
        assert!(vgg.extract(grayscale).is_err());

        let batched = Tensor::<TestBackend, 4>::zeros([2, 3, 16, 16], &device);
        assert!(vgg.extract(batched).is_err());
    }
}

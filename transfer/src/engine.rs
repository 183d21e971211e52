use burn::{
    optim::AdaptiveMomentumState,
    prelude::Backend,
    tensor::{backend::AutodiffBackend, ElementConversion, Tensor},
};
use codec::Codec;
use tracing::trace_span;
use vgg::{gram, Features, StyleLayer, Vgg};

use crate::{
    adam::Adam,
    config::TransferConfig,
    error::{Result, TransferError},
    msg::ProgressSample,
};

/// One style transfer run: a frozen extractor, the loop hyperparameters and
/// the per-run optimizer. The target image is the only quantity that changes
/// across iterations.
pub struct StyleTransfer<B: AutodiffBackend> {
    config: TransferConfig,
    adam: Adam,
    vgg: Vgg<B>,
}

impl<B: AutodiffBackend> StyleTransfer<B> {
    pub fn new(config: TransferConfig, vgg: Vgg<B>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            adam: Adam::default(),
            vgg,
        })
    }

    /// Refine a copy of `content` towards the style statistics of `style`
    /// for the configured number of steps. Both inputs must share one shape.
    ///
    /// Returns the synthesized image and the ordered progress samples.
    pub fn run(
        &self,
        content: Tensor<B, 4>,
        style: Tensor<B, 4>,
    ) -> Result<(Tensor<B, 4>, Vec<ProgressSample>)> {
        if content.dims() != style.dims() {
            return Err(TransferError::ShapeMismatch {
                content: content.dims(),
                style: style.dims(),
            });
        }

        // Reference activations and style Grams are fixed for the whole run.
        let content_features = self.vgg.extract(content.clone())?;
        let style_features = self.vgg.extract(style)?;
        let style_grams: Vec<(StyleLayer, Tensor<B, 2>)> = StyleLayer::ALL
            .iter()
            .map(|&layer| (layer, gram(style_features.style(layer).clone())))
            .collect();

        let steps = self.config.steps;
        let interval = (steps / 10).max(1);
        let mut progress = Vec::new();

        let mut adam_state: Option<AdaptiveMomentumState<B::InnerBackend, 4>> = None;
        let mut target = Tensor::from_inner(content.inner()).require_grad();

        for step in 1..=steps {
            let features = trace_span!("Forward pass")
                .in_scope(|| self.vgg.extract(target.clone()))?;

            let content_loss = content_loss(&features, &content_features);
            let style_loss = self.style_loss(&features, &style_grams);
            let total_loss = content_loss.clone().mul_scalar(self.config.content_weight)
                + style_loss.clone().mul_scalar(self.config.style_weight);

            let total: f32 = total_loss.clone().into_scalar().elem();
            if !total.is_finite() {
                return Err(TransferError::NonFiniteLoss { step, loss: total });
            }

            let mut grads = trace_span!("Backward pass").in_scope(|| total_loss.backward());
            let grad = target
                .grad_remove(&mut grads)
                .expect("Target image gradients need to be calculated.");

            let (updated, state) = trace_span!("Optimizer step").in_scope(|| {
                self.adam
                    .step(self.config.learning_rate, target.inner(), grad, adam_state.take())
            });
            adam_state = Some(state);
            target = Tensor::from_inner(updated).require_grad();

            if step % interval == 0 || step == steps {
                let sample = ProgressSample {
                    step,
                    total_loss: total,
                    content_loss: content_loss.into_scalar().elem(),
                    style_loss: style_loss.into_scalar().elem(),
                };
                log::info!(
                    "Step {}/{}: total loss {:.5e}",
                    step,
                    steps,
                    sample.total_loss
                );
                progress.push(sample);
            }
        }

        Ok((target, progress))
    }

    fn style_loss(
        &self,
        target: &Features<B>,
        style_grams: &[(StyleLayer, Tensor<B, 2>)],
    ) -> Tensor<B, 1> {
        let device = target.conv1_1.device();
        let mut total = Tensor::zeros([1], &device);

        for (layer, style_gram) in style_grams {
            let activation = target.style(*layer);
            let [_, channels, height, width] = activation.dims();

            let target_gram = gram(activation.clone());
            let layer_loss = (target_gram - style_gram.clone())
                .powi_scalar(2)
                .mean()
                .mul_scalar(self.config.style_layer_weight(*layer))
                .div_scalar((channels * height * width) as f32);
            total = total + layer_loss;
        }

        total
    }
}

fn content_loss<B: Backend>(target: &Features<B>, content: &Features<B>) -> Tensor<B, 1> {
    (target.conv4_2.clone() - content.conv4_2.clone())
        .powi_scalar(2)
        .mean()
}

/// Decode two images, synthesize the stylized result and encode it as JPEG
/// at the content image's (possibly shrunk) resolution.
pub fn run_style_transfer<B: AutodiffBackend>(
    vgg: &Vgg<B>,
    content_bytes: &[u8],
    style_bytes: &[u8],
    config: &TransferConfig,
    device: &B::Device,
) -> Result<(Vec<u8>, Vec<ProgressSample>)> {
    let engine = StyleTransfer::new(config.clone(), vgg.clone())?;

    let codec = Codec::<B>::new(device);
    let content = codec.decode(content_bytes, config.max_size)?;
    let [_, _, height, width] = content.dims();

    // The style image gets the same size cap first, then is forced to the
    // content's exact shape.
    let style = codec.decode(style_bytes, config.max_size)?;
    let style = codec.resize_to(&style, height, width)?;

    let (result, progress) = engine.run(content, style)?;
    let bytes = codec.encode(&result)?;
    Ok((bytes, progress))
}

#[cfg(test)]
mod tests {
    use burn::backend::{Autodiff, NdArray};
    use vgg::VggConfig;

    use super::*;

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn content_loss_of_identical_activations_is_zero() {
        let device = Default::default();
        let vgg: Vgg<TestBackend> = VggConfig::new()
            .with_block_channels([4, 8, 8, 8, 8])
            .init(&device);

        let values: Vec<f32> = (0..3 * 16 * 16).map(|i| (i as f32 * 0.1).sin()).collect();
        let image = Tensor::<TestBackend, 1>::from_floats(values.as_slice(), &device)
            .reshape([1, 3, 16, 16]);

        let a = vgg.extract(image.clone()).unwrap();
        let b = vgg.extract(image).unwrap();

        let loss: f32 = content_loss(&a, &b).into_scalar().elem();
        assert_eq!(loss, 0.0);
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let device = Default::default();
        let vgg: Vgg<TestBackend> = VggConfig::new()
            .with_block_channels([4, 8, 8, 8, 8])
            .init(&device);
        let engine = StyleTransfer::new(TransferConfig::new(), vgg).unwrap();

        let content = Tensor::<TestBackend, 4>::zeros([1, 3, 32, 32], &device);
        let style = Tensor::<TestBackend, 4>::zeros([1, 3, 32, 48], &device);

        assert!(matches!(
            engine.run(content, style),
            Err(TransferError::ShapeMismatch { .. })
        ));
    }
}

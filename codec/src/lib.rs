use std::io::Cursor;

use burn::prelude::{Backend, Tensor, TensorData};
use image::{imageops::FilterType, DynamicImage, ImageFormat, RgbImage};

mod error;

pub use error::CodecError;
use error::Result;

/// Per-channel statistics the pretrained extractor was trained with.
pub const CHANNEL_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const CHANNEL_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Converts encoded image bytes to and from normalized `[1, 3, H, W]`
/// tensors. Holds the broadcastable mean/std tensors for the device.
pub struct Codec<B: Backend> {
    mean: Tensor<B, 4>,
    std: Tensor<B, 4>,
    device: B::Device,
}

impl<B: Backend> Codec<B> {
    pub fn new(device: &B::Device) -> Self {
        let mean = Tensor::<B, 1>::from_floats(CHANNEL_MEAN, device).reshape([1, 3, 1, 1]);
        let std = Tensor::<B, 1>::from_floats(CHANNEL_STD, device).reshape([1, 3, 1, 1]);
        Self {
            mean,
            std,
            device: device.clone(),
        }
    }

    /// Decode raw bytes into a normalized image tensor. Inputs whose longer
    /// side exceeds `max_size` are shrunk to fit, keeping the aspect ratio.
    pub fn decode(&self, bytes: &[u8], max_size: u32) -> Result<Tensor<B, 4>> {
        let img = image::load_from_memory(bytes)?;
        let img = if img.width() <= max_size && img.height() <= max_size {
            img
        } else {
            log::debug!(
                "Shrinking {}x{} input to fit {max_size}",
                img.width(),
                img.height()
            );
            img.resize(max_size, max_size, FilterType::Lanczos3)
        };
        Ok(self.normalize(&img))
    }

    /// Resize an already-decoded image to an exact `height` x `width`,
    /// going through pixel space and re-applying the normalization.
    pub fn resize_to(&self, image: &Tensor<B, 4>, height: usize, width: usize) -> Result<Tensor<B, 4>> {
        let pixels = DynamicImage::ImageRgb8(self.to_pixels(image)?);
        let resized = pixels.resize_exact(width as u32, height as u32, FilterType::Lanczos3);
        Ok(self.normalize(&resized))
    }

    /// Invert the normalization, clamp to the displayable range and
    /// serialize as JPEG.
    pub fn encode(&self, tensor: &Tensor<B, 4>) -> Result<Vec<u8>> {
        let img = DynamicImage::ImageRgb8(self.to_pixels(tensor)?);
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Jpeg)
            .map_err(CodecError::Encode)?;
        Ok(bytes.into_inner())
    }

    fn normalize(&self, img: &DynamicImage) -> Tensor<B, 4> {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let data = TensorData::new(img.to_rgb32f().into_vec(), [h, w, 3]);
        let pixels = Tensor::<B, 3>::from_data(data, &self.device)
            .permute([2, 0, 1])
            .unsqueeze::<4>();
        (pixels - self.mean.clone()) / self.std.clone()
    }

    fn to_pixels(&self, tensor: &Tensor<B, 4>) -> Result<RgbImage> {
        let dims = tensor.dims();
        let [batch, channels, height, width] = dims;
        if batch != 1 || channels != 3 {
            return Err(CodecError::InvalidTensor { dims });
        }

        let pixels = (tensor.clone() * self.std.clone() + self.mean.clone()).clamp(0.0, 1.0);
        let data = pixels
            .squeeze::<3>(0)
            .permute([1, 2, 0])
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|_| CodecError::InvalidTensor { dims })?;
        let buf = data.iter().map(|v| (v * 255.0).round() as u8).collect();

        RgbImage::from_raw(width as u32, height as u32, buf)
            .ok_or(CodecError::InvalidTensor { dims })
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;
    use image::Rgb;

    use super::*;

    type TestBackend = NdArray;

    fn png_bytes(img: RgbImage) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                128,
            ])
        })
    }

    #[test]
    fn decode_produces_normalized_chw_tensor() {
        let device = Default::default();
        let codec = Codec::<TestBackend>::new(&device);

        let tensor = codec.decode(&png_bytes(gradient(32, 24)), 512).unwrap();
        assert_eq!(tensor.dims(), [1, 3, 24, 32]);

        // A zero pixel maps to -mean/std.
        let img = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        let tensor = codec.decode(&png_bytes(img), 512).unwrap();
        let first: f32 = tensor
            .slice([0..1, 0..1, 0..1, 0..1])
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .unwrap()[0];
        assert!((first - (-CHANNEL_MEAN[0] / CHANNEL_STD[0])).abs() < 1e-4);
    }

    #[test]
    fn decode_shrinks_to_fit_max_size() {
        let device = Default::default();
        let codec = Codec::<TestBackend>::new(&device);

        let tensor = codec.decode(&png_bytes(gradient(64, 32)), 32).unwrap();
        assert_eq!(tensor.dims(), [1, 3, 16, 32]);

        // Inputs already within bounds are untouched.
        let tensor = codec.decode(&png_bytes(gradient(20, 30)), 32).unwrap();
        assert_eq!(tensor.dims(), [1, 3, 30, 20]);
    }

    #[test]
    fn decode_rejects_malformed_bytes() {
        let device = Default::default();
        let codec = Codec::<TestBackend>::new(&device);

        let result = codec.decode(b"definitely not an image", 512);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn resize_to_forces_exact_shape() {
        let device = Default::default();
        let codec = Codec::<TestBackend>::new(&device);

        let tensor = codec.decode(&png_bytes(gradient(40, 20)), 512).unwrap();
        let resized = codec.resize_to(&tensor, 32, 24).unwrap();
        assert_eq!(resized.dims(), [1, 3, 32, 24]);
    }

    #[test]
    fn encode_decode_roundtrip_is_pixel_close() {
        let device = Default::default();
        let codec = Codec::<TestBackend>::new(&device);

        let original = codec.decode(&png_bytes(gradient(32, 32)), 512).unwrap();
        let encoded = codec.encode(&original).unwrap();
        let restored = codec.decode(&encoded, 512).unwrap();

        assert_eq!(restored.dims(), original.dims());
        let diff: f32 = (original - restored)
            .abs()
            .mean()
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .unwrap()[0];
        // Normalized units; JPEG error stays well under this.
        assert!(diff < 0.1, "roundtrip drift too large: {diff}");
    }
}

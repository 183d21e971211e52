use burn::prelude::{Backend, Tensor};

/// Channel-correlation (Gram) matrix of a `[1, C, H, W]` activation: the
/// activation reshaped to `[C, H*W]`, multiplied with its own transpose.
pub fn gram<B: Backend>(activation: Tensor<B, 4>) -> Tensor<B, 2> {
    let [_, channels, height, width] = activation.dims();
    let flat = activation.reshape([channels, height * width]);
    flat.clone().matmul(flat.transpose())
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    use super::*;

    type TestBackend = NdArray;

    #[test]
    fn gram_of_known_activation() {
        let device = Default::default();
        // Two channels of two values each: [1, 2] and [3, 4].
        let activation =
            Tensor::<TestBackend, 1>::from_floats([1.0, 2.0, 3.0, 4.0], &device).reshape([1, 2, 1, 2]);

        let gram = gram(activation);
        let values = gram.into_data().convert::<f32>().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![5.0, 11.0, 11.0, 25.0]);
    }

    #[test]
    fn gram_is_symmetric() {
        let device = Default::default();
        let values: Vec<f32> = (0..3 * 5 * 4).map(|i| ((i * 37 % 11) as f32).sin()).collect();
        let activation =
            Tensor::<TestBackend, 1>::from_floats(values.as_slice(), &device).reshape([1, 3, 5, 4]);

        let gram = gram(activation);
        let diff: f32 = (gram.clone() - gram.transpose())
            .abs()
            .max()
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .unwrap()[0];
        assert!(diff < 1e-6);
    }
}

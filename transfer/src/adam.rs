use burn::{optim::AdaptiveMomentumState, prelude::Backend, tensor::Tensor};

/// Adam as described in the paper
/// [Adam: A Method for Stochastic Optimization](https://arxiv.org/pdf/1412.6980.pdf),
/// applied to a single tensor rather than a module's parameter set.
#[derive(Clone, Debug)]
pub(crate) struct Adam {
    beta_1: f32,
    beta_2: f32,
    epsilon: f32,
}

impl Default for Adam {
    fn default() -> Self {
        Self {
            beta_1: 0.9,
            beta_2: 0.999,
            epsilon: 1e-8,
        }
    }
}

impl Adam {
    pub fn step<B: Backend, const D: usize>(
        &self,
        lr: f64,
        tensor: Tensor<B, D>,
        grad: Tensor<B, D>,
        state: Option<AdaptiveMomentumState<B, D>>,
    ) -> (Tensor<B, D>, AdaptiveMomentumState<B, D>) {
        let state = if let Some(mut state) = state {
            let factor = 1.0 - self.beta_1;
            state.moment_1 = state
                .moment_1
                .mul_scalar(self.beta_1)
                .add(grad.clone().mul_scalar(factor));

            let factor = 1.0 - self.beta_2;
            state.moment_2 = state
                .moment_2
                .mul_scalar(self.beta_2)
                .add(grad.powi_scalar(2).mul_scalar(factor));

            state.time += 1;
            state
        } else {
            let moment_1 = grad.clone().mul_scalar(1.0 - self.beta_1);
            let moment_2 = grad.powi_scalar(2).mul_scalar(1.0 - self.beta_2);
            AdaptiveMomentumState::new(1, moment_1, moment_2)
        };

        let time = state.time as i32;
        let moment_1_corrected = state
            .moment_1
            .clone()
            .div_scalar(1f32 - self.beta_1.powi(time));
        let moment_2_corrected = state
            .moment_2
            .clone()
            .div_scalar(1f32 - self.beta_2.powi(time));
        let update = moment_1_corrected.div(moment_2_corrected.sqrt().add_scalar(self.epsilon));

        (tensor - update.mul_scalar(lr), state)
    }
}

//! Formant/pitch track estimation from log-mel features.

use crate::config::F0EstimatorConfig;
use crate::modules::conv::Conv1dOp;
use crate::weights::StateDict;
use anyhow::Result;
use burn::tensor::activation::{leaky_relu, sigmoid};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Lowest formant frequency the estimator can emit, in Hz.
const F_FLOOR: f32 = 50.0;
/// Frequency range above the floor, in Hz.
const F_RANGE: f32 = 950.0;

/// Per-frame formant frequency estimator.
///
/// Consumes log-mel features and produces one positive frequency track per
/// formant at the mel frame rate. The generator conditions on these tracks
/// and upsamples them to the sample rate.
#[derive(Debug, Clone)]
pub struct F0Estimator<B: Backend> {
    input_conv: Conv1dOp<B>,
    hidden_conv: Conv1dOp<B>,
    output_conv: Conv1dOp<B>,
    n_formants: usize,
}

impl<B: Backend> F0Estimator<B> {
    /// Build a zero-initialized estimator from config.
    pub fn from_config(config: &F0EstimatorConfig, n_mels: usize, device: &B::Device) -> Self {
        Self {
            input_conv: Conv1dOp::zeros(n_mels, config.channels, 5, 1, device),
            hidden_conv: Conv1dOp::zeros(config.channels, config.channels, 5, 2, device),
            output_conv: Conv1dOp::zeros(config.channels, config.n_formants, 1, 1, device),
            n_formants: config.n_formants,
        }
    }

    /// Load checkpoint weights into the estimator.
    pub fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        self.input_conv.load(state, "input_conv")?;
        self.hidden_conv.load(state, "hidden_conv")?;
        self.output_conv.load(state, "output_conv")?;
        Ok(())
    }

    /// Number of formant tracks produced per frame.
    pub fn n_formants(&self) -> usize {
        self.n_formants
    }

    /// Estimate formant tracks from log-mel features.
    ///
    /// Input `[1, n_mels, frames]`, output `[1, n_formants, frames]` in Hz,
    /// bounded to `[F_FLOOR, F_FLOOR + F_RANGE]`.
    pub fn estimate(&self, mel: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = leaky_relu(self.input_conv.forward(mel), 0.1);
        let x = leaky_relu(self.hidden_conv.forward(x), 0.1);
        let x = self.output_conv.forward(x);
        sigmoid(x).mul_scalar(F_RANGE).add_scalar(F_FLOOR)
    }
}

#[cfg(test)]
mod tests {
    use super::F0Estimator;
    use crate::config::F0EstimatorConfig;
    use burn::tensor::Tensor;
    use burn_ndarray::{NdArray, NdArrayDevice};

    type TestBackend = NdArray<f32>;

    #[test]
    fn tracks_match_frame_count_and_stay_positive() {
        let device = NdArrayDevice::default();
        let config = F0EstimatorConfig::default();
        let estimator = F0Estimator::<TestBackend>::from_config(&config, 80, &device);

        let mel = Tensor::zeros([1, 80, 25], &device);
        let tracks = estimator.estimate(mel);
        assert_eq!(tracks.dims(), [1, config.n_formants, 25]);

        let data = tracks.to_data();
        for &v in data.as_slice::<f32>().expect("tracks") {
            assert!(v >= 50.0 && v <= 1000.0, "frequency {v} out of range");
        }
    }
}

// ============================================================
// Layer 5 — AWGN Channel
// ============================================================
// Simulates transmission of the encoder's channel symbols over
// an additive white Gaussian noise channel.
//
//   1. Normalise each sample to unit average symbol power
//   2. Add zero-mean Gaussian noise whose variance follows
//      from the SNR in dB:   snr = 10^(snr_db / 10)
//
// With complex signalling, consecutive pairs of real values
// form one complex symbol, so each real component carries half
// the symbol power and half the noise power:
//
//   real:    E[x²] = 1,    σ = sqrt(1 / snr)
//   complex: E[x²] = 1/2,  σ = sqrt(1 / (2·snr))
//
// Reference: Xie et al. (2021) Deep Learning Enabled Semantic
//            Communication Systems (DeepSC)

use burn::{prelude::*, tensor::Distribution};

#[derive(Debug, Clone, Copy)]
pub struct AwgnChannel {
    complex: bool,
}

impl AwgnChannel {
    pub fn new(complex: bool) -> Self {
        Self { complex }
    }

    /// Average power each real component is normalised to.
    fn component_power(&self) -> f64 {
        if self.complex { 0.5 } else { 1.0 }
    }

    /// Noise standard deviation per real component.
    pub fn noise_std(&self, snr_db: i32) -> f64 {
        let snr = 10f64.powf(snr_db as f64 / 10.0);
        (self.component_power() / snr).sqrt()
    }

    /// x: [batch, seq, channel_dim] → power-normalised, noisy copy
    pub fn transmit<B: Backend>(&self, x: Tensor<B, 3>, snr_db: i32) -> Tensor<B, 3> {
        let x = self.normalize(x);
        let noise = Tensor::<B, 3>::random(
            x.shape(),
            Distribution::Normal(0.0, self.noise_std(snr_db)),
            &x.device(),
        );
        x + noise
    }

    fn normalize<B: Backend>(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        // [batch, 1, 1] mean power per sample
        let power = x.clone().powf_scalar(2.0).mean_dim(2).mean_dim(1);
        let scale = power.div_scalar(self.component_power()).add_scalar(1e-12).sqrt();
        x / scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_noise_std() {
        let real = AwgnChannel::new(false);
        assert!((real.noise_std(0) - 1.0).abs() < 1e-12);
        assert!((real.noise_std(10) - 0.1f64.sqrt()).abs() < 1e-12);

        let complex = AwgnChannel::new(true);
        assert!((complex.noise_std(0) - 0.5f64.sqrt()).abs() < 1e-12);
        assert!((complex.noise_std(-5) - (0.5 / 10f64.powf(-0.5)).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_normalised_power_per_sample() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 3>::from_data(
            TensorData::new(vec![3.0f32, 3.0, 3.0, 3.0, 0.1, 0.2, 0.3, 0.4], [2, 2, 2]),
            &device,
        );

        for (complex, expected) in [(false, 1.0f32), (true, 0.5f32)] {
            let y = AwgnChannel::new(complex).normalize(x.clone());
            let power: Vec<f32> = y
                .powf_scalar(2.0)
                .mean_dim(2)
                .mean_dim(1)
                .into_data()
                .convert::<f32>()
                .to_vec()
                .unwrap();
            assert!(power.iter().all(|p| (p - expected).abs() < 1e-4), "{power:?}");
        }
    }

    #[test]
    fn test_high_snr_is_nearly_clean() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 3>::ones([1, 4, 4], &device);
        let y = AwgnChannel::new(true).transmit(x, 100);
        let values: Vec<f32> = y.into_data().convert::<f32>().to_vec().unwrap();
        // Unit-power ones in complex mode become sqrt(0.5).
        assert!(values.iter().all(|v| (v - 0.5f32.sqrt()).abs() < 1e-3));
    }
}

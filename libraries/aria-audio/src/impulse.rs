//! Synthetic reverb impulse response
//!
//! Decaying noise: each sample is uniform noise in [-1, 1) scaled by
//! `(1 - t/len)^2`, generated independently per channel.

use rand::Rng;

/// Multi-channel impulse response for a convolution node
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    sample_rate: f32,
    channels: Vec<Vec<f32>>,
}

impl ImpulseResponse {
    /// Generate a decaying-noise impulse response
    ///
    /// A non-positive or non-finite length yields a single-sample response.
    pub fn synthetic<R: Rng + ?Sized>(
        sample_rate: f32,
        seconds: f32,
        channels: usize,
        rng: &mut R,
    ) -> Self {
        let len = if seconds.is_finite() && seconds > 0.0 && sample_rate > 0.0 {
            ((sample_rate * seconds) as usize).max(1)
        } else {
            1
        };

        let channels = (0..channels.max(1))
            .map(|_| {
                (0..len)
                    .map(|i| {
                        let noise: f32 = rng.gen_range(-1.0..1.0);
                        noise * decay(i, len)
                    })
                    .collect()
            })
            .collect();

        Self {
            sample_rate,
            channels,
        }
    }

    /// Sample rate the response was generated for
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Length in samples
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Whether the response has no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples of one channel
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Duration in seconds
    pub fn duration(&self) -> f32 {
        if self.sample_rate > 0.0 {
            self.len() as f32 / self.sample_rate
        } else {
            0.0
        }
    }
}

fn decay(i: usize, len: usize) -> f32 {
    let remaining = 1.0 - i as f32 / len as f32;
    remaining * remaining
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn two_seconds_stereo() {
        let mut rng = StdRng::seed_from_u64(7);
        let ir = ImpulseResponse::synthetic(48000.0, 2.0, 2, &mut rng);

        assert_eq!(ir.channel_count(), 2);
        assert_eq!(ir.len(), 96000);
        assert!((ir.duration() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn envelope_bounds_every_sample() {
        let mut rng = StdRng::seed_from_u64(42);
        let ir = ImpulseResponse::synthetic(8000.0, 0.5, 2, &mut rng);
        let len = ir.len();

        for ch in 0..ir.channel_count() {
            let samples = ir.channel(ch).unwrap();
            for (i, s) in samples.iter().enumerate() {
                assert!(s.abs() <= decay(i, len) + 1e-6);
            }
        }
    }

    #[test]
    fn tail_is_quieter_than_head() {
        let mut rng = StdRng::seed_from_u64(1);
        let ir = ImpulseResponse::synthetic(8000.0, 1.0, 1, &mut rng);
        let samples = ir.channel(0).unwrap();
        let quarter = samples.len() / 4;

        let energy = |s: &[f32]| s.iter().map(|x| x * x).sum::<f32>();
        assert!(energy(&samples[..quarter]) > energy(&samples[samples.len() - quarter..]) * 10.0);
    }

    #[test]
    fn channels_are_independent() {
        let mut rng = StdRng::seed_from_u64(3);
        let ir = ImpulseResponse::synthetic(8000.0, 0.1, 2, &mut rng);
        assert_ne!(ir.channel(0), ir.channel(1));
    }

    #[test]
    fn degenerate_length_is_one_sample() {
        let mut rng = StdRng::seed_from_u64(9);
        assert_eq!(ImpulseResponse::synthetic(44100.0, 0.0, 2, &mut rng).len(), 1);
        assert_eq!(ImpulseResponse::synthetic(44100.0, f32::NAN, 2, &mut rng).len(), 1);
    }
}

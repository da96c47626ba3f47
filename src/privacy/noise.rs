//! Per-update noise injection for differential privacy.
//!
//! Laplace mechanism throughout: noise scale = sensitivity / epsilon.
//! Noise is added to every contributor's vector before aggregation, so no
//! aggregation step ever sees an un-noised individual update.

use crate::core::{Error, ModelUpdate, Result};
use rand::Rng;

/// Injects calibrated Laplace noise into update vectors.
///
/// The mechanism is Laplace only; mixing mechanisms across updates would
/// void the (epsilon, 0)-DP guarantee. The configured `sensitivity` is the
/// assumed per-record L2 bound; enable clipping to enforce it.
#[derive(Clone, Debug)]
pub struct NoiseInjector {
    /// Privacy budget (smaller = more noise)
    epsilon: f64,
    /// Maximum per-record influence on the aggregate
    sensitivity: f64,
    /// Optional L2 clipping threshold applied before noising
    clipping_threshold: Option<f32>,
}

impl NoiseInjector {
    /// Create a noise injector.
    ///
    /// Fails with `InvalidParameter` when `epsilon <= 0` or
    /// `sensitivity < 0`.
    pub fn new(epsilon: f64, sensitivity: f64) -> Result<Self> {
        if epsilon <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "epsilon must be positive, got {epsilon}"
            )));
        }
        if sensitivity < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "sensitivity must be non-negative, got {sensitivity}"
            )));
        }
        Ok(Self {
            epsilon,
            sensitivity,
            clipping_threshold: None,
        })
    }

    /// Enable L2-norm clipping of each vector before noising.
    pub fn with_clipping(mut self, threshold: f32) -> Self {
        self.clipping_threshold = Some(threshold);
        self
    }

    /// Noise scale of the Laplace mechanism.
    pub fn scale(&self) -> f64 {
        self.sensitivity / self.epsilon
    }

    /// Privatize a batch of updates.
    ///
    /// One output record per input record, same order. Only the vector
    /// coordinates are perturbed; `samples_count` and every other field
    /// pass through unchanged. The caller's records are not mutated, so
    /// the ingested originals stay intact for the audit trail.
    pub fn privatize(&self, updates: &[ModelUpdate]) -> Vec<ModelUpdate> {
        let scale = self.scale();
        let mut rng = rand::thread_rng();

        updates
            .iter()
            .map(|update| {
                let mut privatized = update.clone();
                if let Some(threshold) = self.clipping_threshold {
                    clip_l2(&mut privatized.update_vector, threshold);
                }
                for value in &mut privatized.update_vector {
                    *value += sample_laplace(&mut rng, scale) as f32;
                }
                privatized
            })
            .collect()
    }
}

/// Clip a vector to the given L2 norm. Returns true if clipping applied.
fn clip_l2(vector: &mut [f32], threshold: f32) -> bool {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > threshold && norm > 0.0 {
        let scale = threshold / norm;
        for v in vector.iter_mut() {
            *v *= scale;
        }
        true
    } else {
        false
    }
}

/// Sample from Laplace(0, scale) via the inverse CDF.
fn sample_laplace(rng: &mut impl Rng, scale: f64) -> f64 {
    if scale == 0.0 {
        return 0.0;
    }
    let u: f64 = rng.gen::<f64>() - 0.5;
    -scale * u.signum() * (1.0 - 2.0 * u.abs()).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{now, UpdateId};

    fn update(vector: Vec<f32>, samples: u64) -> ModelUpdate {
        ModelUpdate {
            id: UpdateId::generate(),
            device_id: "dev-a".to_string(),
            model_name: "m".to_string(),
            update_vector: vector,
            samples_count: samples,
            created_at: now(),
            consumed: false,
        }
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(NoiseInjector::new(0.0, 1.0).is_err());
        assert!(NoiseInjector::new(-1.0, 1.0).is_err());
        assert!(NoiseInjector::new(1.0, -0.1).is_err());
        assert!(NoiseInjector::new(1.0, 0.0).is_ok());
    }

    #[test]
    fn test_privatize_perturbs_vectors() {
        let injector = NoiseInjector::new(1.0, 1.0).unwrap();
        let input = vec![update(vec![0.5; 16], 10)];

        let output = injector.privatize(&input);
        assert_eq!(output.len(), 1);
        assert_ne!(output[0].update_vector, input[0].update_vector);
        // Input untouched
        assert_eq!(input[0].update_vector, vec![0.5; 16]);
    }

    #[test]
    fn test_samples_count_passes_through() {
        let injector = NoiseInjector::new(1.0, 1.0).unwrap();
        let input = vec![update(vec![1.0, 2.0], 42), update(vec![3.0, 4.0], 7)];

        let output = injector.privatize(&input);
        assert_eq!(output[0].samples_count, 42);
        assert_eq!(output[1].samples_count, 7);
        assert_eq!(output[0].device_id, input[0].device_id);
    }

    #[test]
    fn test_noise_vanishes_with_large_epsilon() {
        let injector = NoiseInjector::new(1e12, 1.0).unwrap();
        let input = vec![update(vec![1.0, -2.0, 3.0], 10)];

        let output = injector.privatize(&input);
        for (noised, original) in output[0].update_vector.iter().zip(&input[0].update_vector) {
            assert!((noised - original).abs() < 1e-6);
        }
    }

    #[test]
    fn test_zero_sensitivity_adds_no_noise() {
        let injector = NoiseInjector::new(1.0, 0.0).unwrap();
        let input = vec![update(vec![1.0, 2.0], 10)];

        let output = injector.privatize(&input);
        assert_eq!(output[0].update_vector, input[0].update_vector);
    }

    #[test]
    fn test_clipping_bounds_norm() {
        let injector = NoiseInjector::new(1e12, 1.0).unwrap().with_clipping(1.0);
        let input = vec![update(vec![3.0, 4.0], 10)]; // norm 5

        let output = injector.privatize(&input);
        let norm = output[0]
            .update_vector
            .iter()
            .map(|v| v * v)
            .sum::<f32>()
            .sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_clip_l2_noop_below_threshold() {
        let mut vector = vec![0.3, 0.4];
        assert!(!clip_l2(&mut vector, 1.0));
        assert_eq!(vector, vec![0.3, 0.4]);
    }

    #[test]
    fn test_laplace_sample_centered() {
        let mut rng = rand::thread_rng();
        let n = 20_000;
        let mean: f64 = (0..n).map(|_| sample_laplace(&mut rng, 1.0)).sum::<f64>() / n as f64;
        // Laplace(0, 1) has mean 0 and variance 2
        assert!(mean.abs() < 0.1);
    }
}

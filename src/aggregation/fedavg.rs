//! Federated averaging.
//!
//! Sample-count-weighted mean of device update vectors, per model.

use crate::core::{Error, ModelUpdate, Result};

/// Aggregate update vectors for one model into a single global vector.
///
/// Weighted average per coordinate:
/// `global[i] = sum(v[d][i] * samples[d]) / sum(samples[d])`,
/// so devices with more local training data pull the global model
/// proportionally harder, the standard FedAvg policy.
///
/// All vectors must share one length (the model architecture); every
/// `samples_count` must be positive. Pure function of its inputs.
pub fn federated_average(model_name: &str, updates: &[ModelUpdate]) -> Result<Vec<f32>> {
    if updates.is_empty() {
        return Err(Error::EmptyInput);
    }

    let dim = updates[0].update_vector.len();
    for update in updates {
        if update.update_vector.len() != dim {
            return Err(Error::DimensionMismatch {
                model: model_name.to_string(),
                expected: dim,
                got: update.update_vector.len(),
            });
        }
        if update.samples_count == 0 {
            return Err(Error::Validation(format!(
                "update {} from device {} has zero samples",
                update.id, update.device_id
            )));
        }
    }

    let total_samples: u64 = updates.iter().map(|u| u.samples_count).sum();
    let mut global = vec![0.0f32; dim];

    for update in updates {
        let weight = update.samples_count as f32 / total_samples as f32;
        for (i, value) in update.update_vector.iter().enumerate() {
            global[i] += weight * value;
        }
    }

    Ok(global)
}

//! Readiness check for starting an aggregation round.

use crate::core::{Error, ModelUpdate, Result, Timestamp};
use chrono::Duration;
use std::collections::HashSet;

/// Decide whether enough distinct devices have contributed recently to
/// justify a round.
///
/// Counts distinct `device_id`s among unconsumed updates whose
/// `created_at` falls within `window` of `now`, and compares against the
/// inclusive `min_devices` threshold. Deterministic given its inputs; no
/// side effects.
///
/// Note the deliberate asymmetry with round selection: once a round is
/// triggered it folds in every unconsumed update, windowed or not.
pub fn is_ready(
    updates: &[ModelUpdate],
    min_devices: usize,
    window: Duration,
    now: Timestamp,
) -> Result<bool> {
    if min_devices < 1 {
        return Err(Error::Validation(
            "min_devices must be at least 1".to_string(),
        ));
    }

    let cutoff = now - window;
    let devices: HashSet<&str> = updates
        .iter()
        .filter(|u| !u.consumed && u.created_at >= cutoff)
        .map(|u| u.device_id.as_str())
        .collect();

    Ok(devices.len() >= min_devices)
}

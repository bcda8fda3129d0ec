/// Reset-collapse policy.
///
/// Decides whether a group of `affected` item changes should be reported as
/// one reset instead of individual events. Single-item operations are
/// evaluated with `affected == 1`, bulk operations with the number of items
/// they actually changed.
use crate::error::{CollectionError, CollectionResult};

/// Default value of the reset threshold.
pub const DEFAULT_RESET_THRESHOLD: usize = 100;

/// Whether `affected` changes collapse to a reset under `threshold`.
///
/// A threshold of `0` always collapses. Fails if `affected` is zero.
pub fn should_collapse_to_reset(affected: usize, threshold: usize) -> CollectionResult<bool> {
    if affected == 0 {
        return Err(CollectionError::invalid_argument(
            "affected item count must be positive",
        ));
    }

    if threshold == 0 {
        return Ok(true);
    }

    Ok(affected >= threshold)
}

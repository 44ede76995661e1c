//! Sequential back-end of batch evaluation

use crate::error::Result;

/// Evaluate a batch of electrons in sequential mode, stopping at the first
/// failed decision
pub fn evaluate_batch_impl<T, R>(items: &[T], decide: impl Fn(&T) -> Result<R>) -> Result<Vec<R>> {
    items.iter().map(decide).collect()
}

//! Multi-threaded back-end of batch evaluation

use crate::{error::Result, scheduling::MIN_BATCH_SIZE};
use rayon::prelude::*;

/// Evaluate a batch of electrons in multi-threaded mode
///
/// Rayon's indexed collection keeps the results in input order, so the output
/// does not depend on how work was split across threads.
///
pub fn evaluate_batch_impl<T, R>(
    items: &[T],
    decide: impl Send + Sync + Fn(&T) -> Result<R>,
) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
{
    items.par_iter().with_min_len(MIN_BATCH_SIZE).map(decide).collect()
}

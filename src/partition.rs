//! Batch partitioning
//!
//! Splits one cycle's fetched accounts into at most `max_batches` contiguous,
//! near-equal groups. An empty input still produces one (empty) batch so the
//! cadence accounting always sees at least one dispatch.

use crate::error::{Error, Result};
use std::num::NonZeroUsize;

/// Size of every batch but possibly the last
///
/// Computed as `ceil(max(len, 1) / max_batches)`.
pub fn split_factor(len: usize, max_batches: NonZeroUsize) -> usize {
    len.max(1).div_ceil(max_batches.get())
}

/// Split `items` into at most `max_batches` ordered groups
///
/// Groups have [`split_factor`] items each except the last, which may be
/// shorter. Concatenating the output gives back the input.
///
/// # Examples
///
/// ```
/// use account_retriever::partition::partition;
/// use std::num::NonZeroUsize;
///
/// let batches = partition((0..7).collect(), NonZeroUsize::new(3).unwrap());
/// assert_eq!(batches, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]);
/// ```
pub fn partition<T>(items: Vec<T>, max_batches: NonZeroUsize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return vec![Vec::new()];
    }

    let size = split_factor(items.len(), max_batches);
    let mut batches = Vec::with_capacity(items.len().div_ceil(size));
    let mut items = items.into_iter().peekable();

    while items.peek().is_some() {
        batches.push(items.by_ref().take(size).collect());
    }

    batches
}

/// Check that `batches` is a valid partition of `fetched` items
///
/// # Errors
///
/// Returns [`Error::PartitionInvariant`] when the batch count is outside
/// `1..=max_batches`, a batch exceeds the split factor, or the item total
/// differs from `fetched`.
pub fn verify_partition<T>(
    fetched: usize,
    batches: &[Vec<T>],
    max_batches: NonZeroUsize,
) -> Result<()> {
    if batches.is_empty() || batches.len() > max_batches.get() {
        return Err(Error::PartitionInvariant {
            message: format!(
                "{} batches produced, expected 1..={}",
                batches.len(),
                max_batches
            ),
        });
    }

    let factor = split_factor(fetched, max_batches);
    if let Some((index, batch)) = batches
        .iter()
        .enumerate()
        .find(|(_, batch)| batch.len() > factor)
    {
        return Err(Error::PartitionInvariant {
            message: format!(
                "batch {index} holds {} items, split factor is {factor}",
                batch.len()
            ),
        });
    }

    let total: usize = batches.iter().map(Vec::len).sum();
    if total != fetched {
        return Err(Error::PartitionInvariant {
            message: format!("{fetched} items fetched, {total} batched"),
        });
    }

    Ok(())
}

use rand::{seq::SliceRandom, Rng};

/// Returns the indices of the rows to be sampled from a store of `len` rows.
///
/// The index set is `0..len`, uniformly permuted if `shuffle` is `true`, and
/// truncated to `batch_size` if given. Sampling is without replacement, so a
/// `batch_size` larger than `len` yields `len` indices.
pub fn sample_indices<R: Rng + ?Sized>(
    rng: &mut R,
    len: usize,
    batch_size: Option<usize>,
    shuffle: bool,
) -> Vec<usize> {
    let mut ixs = (0..len).collect::<Vec<_>>();
    if shuffle {
        ixs.shuffle(rng);
    }
    if let Some(batch_size) = batch_size {
        ixs.truncate(batch_size);
    }
    ixs
}

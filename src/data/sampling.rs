use rand::seq::{index, SliceRandom};
use rand::Rng;

/// `k` distinct indices from `0..n`, in random order.
///
/// # Panics
/// Panics if `k > n`.
pub fn choose_k_inds<R: Rng + ?Sized>(rng: &mut R, n: usize, k: usize) -> Vec<usize> {
    index::sample(rng, n, k).into_vec()
}

/// `k` distinct elements of `set`, in random order. `k == set.len()` is a
/// plain shuffle.
pub fn choose_k<R: Rng + ?Sized>(rng: &mut R, set: &[usize], k: usize) -> Vec<usize> {
    let mut picked: Vec<usize> = set.choose_multiple(rng, k).copied().collect();
    picked.shuffle(rng);
    picked
}

/// Sorted `0..n` minus `excluded`.
pub fn setdiff(n: usize, excluded: &[usize]) -> Vec<usize> {
    (0..n).filter(|i| !excluded.contains(i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn choose_k_inds_draws_distinct_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut picked = choose_k_inds(&mut rng, 8, 5);
        assert_eq!(picked.len(), 5);
        picked.sort_unstable();
        picked.dedup();
        assert_eq!(picked.len(), 5);
        assert!(picked.iter().all(|&i| i < 8));
    }

    #[test]
    fn full_choose_k_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(11);
        let set = vec![3, 9, 4, 20];
        let mut order = choose_k(&mut rng, &set, set.len());
        order.sort_unstable();
        assert_eq!(order, vec![3, 4, 9, 20]);
    }

    #[test]
    fn setdiff_removes_excluded() {
        assert_eq!(setdiff(6, &[1, 4]), vec![0, 2, 3, 5]);
    }
}

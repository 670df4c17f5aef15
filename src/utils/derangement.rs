//! Random derangements for the Secret Santa draw.
//!
//! A derangement of `0..n` is a permutation `p` with `p[i] != i` for every `i`.
//! Construction is retry-free: a Fisher-Yates shuffle followed by a single
//! repair pass over the remaining fixed points.
//!
//! The result is not uniformly distributed over all derangements: the repair
//! pass favours some outcomes for small `n`. That bias is accepted; validity
//! (bijection, no fixed point) is what the draw relies on.

use rand::Rng;
use rand::seq::SliceRandom;

/// Returns a random derangement of `0..n`.
///
/// `result[i]` is the position that position `i` maps to. Callers must ensure
/// `n >= 2`; there is no derangement of a single element.
///
/// # Panics
///
/// Panics when `n < 2`.
pub fn derangement<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    assert!(n >= 2, "a derangement needs at least two elements, got {n}");

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    repair_fixed_points(&mut indices);
    indices
}

/// Removes every fixed point of the permutation `perm` in place.
///
/// Fixed points are first swapped pairwise, which clears two at a time. A
/// single leftover fixed point `i` is swapped with the first non-fixed
/// position `j`: afterwards `perm[j] == i != j`, and `perm[i]` takes the old
/// `perm[j]`, which cannot be `i` because `i` was already taken by position
/// `i`. A permutation of length >= 2 never has exactly `len - 1` fixed
/// points, so that partner always exists.
///
/// Only positions that were fixed points, plus at most one partner, change.
pub fn repair_fixed_points(perm: &mut [usize]) {
    let fixed: Vec<usize> = (0..perm.len()).filter(|&i| perm[i] == i).collect();

    for pair in fixed.chunks(2) {
        match *pair {
            [a, b] => perm.swap(a, b),
            [i] => {
                if let Some(j) = (0..perm.len()).find(|&j| j != i && perm[j] != j) {
                    perm.swap(i, j);
                }
            }
            _ => unreachable!("chunks(2) yields one or two elements"),
        }
    }
}

/// True when `perm` is a permutation of `0..perm.len()` without fixed points.
pub fn is_derangement(perm: &[usize]) -> bool {
    let mut seen = vec![false; perm.len()];
    for (i, &target) in perm.iter().enumerate() {
        if target == i || target >= perm.len() || seen[target] {
            return false;
        }
        seen[target] = true;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Every permutation of `0..n`, in lexicographic order.
    fn all_permutations(n: usize) -> Vec<Vec<usize>> {
        fn build(prefix: &mut Vec<usize>, used: &mut Vec<bool>, out: &mut Vec<Vec<usize>>) {
            if prefix.len() == used.len() {
                out.push(prefix.clone());
                return;
            }
            for v in 0..used.len() {
                if !used[v] {
                    used[v] = true;
                    prefix.push(v);
                    build(prefix, used, out);
                    prefix.pop();
                    used[v] = false;
                }
            }
        }
        let mut out = Vec::new();
        build(&mut Vec::new(), &mut vec![false; n], &mut out);
        out
    }

    #[test]
    fn test_repair_fixes_every_permutation_up_to_seven() {
        for n in 2..=7 {
            for perm in all_permutations(n) {
                let mut repaired = perm.clone();
                repair_fixed_points(&mut repaired);
                assert!(
                    is_derangement(&repaired),
                    "repair failed for {perm:?}, got {repaired:?}"
                );
            }
        }
    }

    #[test]
    fn test_repair_leaves_derangements_untouched() {
        let mut perm = vec![1, 2, 0, 4, 3];
        repair_fixed_points(&mut perm);
        assert_eq!(perm, vec![1, 2, 0, 4, 3]);
    }

    #[test]
    fn test_repair_identity() {
        let mut perm: Vec<usize> = (0..5).collect();
        repair_fixed_points(&mut perm);
        assert!(is_derangement(&perm));
    }

    #[test]
    fn test_derangement_valid_for_sizes_two_to_fifty() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for n in 2..=50 {
            for _ in 0..200 {
                let perm = derangement(n, &mut rng);
                assert_eq!(perm.len(), n);
                assert!(is_derangement(&perm), "n={n}: {perm:?}");
            }
        }
    }

    #[test]
    fn test_two_participants_always_swap() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..100 {
            assert_eq!(derangement(2, &mut rng), vec![1, 0]);
        }
    }

    #[test]
    fn test_three_participants_reach_both_cycles() {
        // the only derangements of 3: [1,2,0] and [2,0,1]
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            seen.insert(derangement(3, &mut rng));
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    #[should_panic]
    fn test_single_participant_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        derangement(1, &mut rng);
    }

    #[test]
    fn test_is_derangement_rejects_invalid() {
        assert!(!is_derangement(&[0, 1]));
        assert!(!is_derangement(&[1, 1]));
        assert!(!is_derangement(&[1, 5]));
        assert!(is_derangement(&[1, 0]));
    }
}

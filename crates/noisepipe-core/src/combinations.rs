//! Combination planner: lexicographic size-k subsets of the input list.
//!
//! Combinations, not permutations: element order inside each combination
//! follows the sorted input order, and the sequence of combinations is the
//! standard lexicographic one, so runs over the same directory are
//! deterministic and repeatable.

/// Iterator over all `C(n, k)` index combinations in lexicographic order.
///
/// Each item is a strictly increasing vector of `k` indices into the caller's
/// sorted candidate list. `k == 0` yields one empty combination; `k > n`
/// yields nothing.
#[derive(Debug, Clone)]
pub struct Combinations {
    n: usize,
    k: usize,
    indices: Vec<usize>,
    started: bool,
    done: bool,
}

/// Plan all size-`k` combinations over `n` sorted candidates.
pub fn combinations(n: usize, k: usize) -> Combinations {
    Combinations {
        n,
        k,
        indices: (0..k).collect(),
        started: false,
        done: k > n,
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.indices.clone());
        }

        // Advance the rightmost index that still has room, then reset the
        // tail right after it.
        let mut i = self.k;
        loop {
            if i == 0 {
                self.done = true;
                return None;
            }
            i -= 1;
            if self.indices[i] < self.n - (self.k - i) {
                self.indices[i] += 1;
                for j in i + 1..self.k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
                return Some(self.indices.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binomial(n: usize, k: usize) -> usize {
        if k > n {
            return 0;
        }
        let mut result = 1usize;
        for i in 0..k {
            result = result * (n - i) / (i + 1);
        }
        result
    }

    // -----------------------------------------------------------------------
    // Counting tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_count_matches_binomial() {
        for n in 0..8 {
            for k in 0..8 {
                let count = combinations(n, k).count();
                assert_eq!(count, binomial(n, k), "C({n}, {k})");
            }
        }
    }

    #[test]
    fn test_singletons_for_arity_one() {
        let combos: Vec<_> = combinations(4, 1).collect();
        assert_eq!(combos, vec![vec![0], vec![1], vec![2], vec![3]]);
    }

    #[test]
    fn test_three_choose_two_order() {
        let combos: Vec<_> = combinations(3, 2).collect();
        assert_eq!(combos, vec![vec![0, 1], vec![0, 2], vec![1, 2]]);
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        assert_eq!(combinations(0, 1).count(), 0);
        assert_eq!(combinations(0, 3).count(), 0);
    }

    #[test]
    fn test_k_larger_than_n_yields_nothing() {
        assert_eq!(combinations(2, 3).count(), 0);
    }

    #[test]
    fn test_k_equals_n_yields_full_set() {
        let combos: Vec<_> = combinations(4, 4).collect();
        assert_eq!(combos, vec![vec![0, 1, 2, 3]]);
    }

    // -----------------------------------------------------------------------
    // Structural property tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_strictly_increasing_and_unique() {
        for n in 0..7 {
            for k in 1..6 {
                let combos: Vec<_> = combinations(n, k).collect();
                for combo in &combos {
                    assert!(
                        combo.windows(2).all(|w| w[0] < w[1]),
                        "not strictly increasing: {combo:?}"
                    );
                    assert!(combo.iter().all(|&i| i < n));
                }
                // No duplicates across the sequence.
                let mut seen = combos.clone();
                seen.sort();
                seen.dedup();
                assert_eq!(seen.len(), combos.len(), "duplicates for C({n}, {k})");
            }
        }
    }

    #[test]
    fn test_lexicographic_order() {
        for n in 0..7 {
            for k in 1..6 {
                let combos: Vec<_> = combinations(n, k).collect();
                assert!(
                    combos.windows(2).all(|w| w[0] < w[1]),
                    "not lexicographic for C({n}, {k}): {combos:?}"
                );
            }
        }
    }
}

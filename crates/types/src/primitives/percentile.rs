/// Percentile ranks computed for every block's priority-fee distribution
/// and for every calendar bucket's base-fee distribution.
pub const PERCENTILE_RANKS: [u8; 9] = [0, 10, 25, 50, 75, 90, 95, 99, 100];

/// Extract the `perc`-th percentile from an ascending-sorted slice.
///
/// Unified rule used everywhere a percentile is derived in this crate: for
/// a sorted list of length `L` and percentile `p`, `L == 0` returns `0`;
/// `p == 100` returns the last element; otherwise `rank = ceil(L * p /
/// 100)`, and `rank == 0` returns the first element, else the element at
/// index `rank - 1`.
///
/// Each percentile rank is computed independently through this formula —
/// unlike one variant of the system this was distilled from, which reused
/// the 95th-percentile call site for the 99th, this never forces two
/// distinct ranks to coincide except where the math genuinely produces the
/// same index for small `L`.
pub fn percentile_of_sorted(sorted: &[u64], perc: u64) -> u64 {
    let len = sorted.len() as u64;
    if len == 0 {
        return 0;
    }
    if perc == 100 {
        return sorted[sorted.len() - 1];
    }
    let rank = (len * perc).div_ceil(100);
    if rank == 0 {
        return sorted[0];
    }
    sorted[(rank - 1) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_worked_example() {
        let values: Vec<u64> = (1..=10).collect();
        assert_eq!(percentile_of_sorted(&values, 100), 10);
        assert_eq!(percentile_of_sorted(&values, 50), 5);
        assert_eq!(percentile_of_sorted(&values, 10), 1);
        assert_eq!(percentile_of_sorted(&values, 0), 1);
        assert_eq!(percentile_of_sorted(&values, 95), 10);
    }

    #[test]
    fn empty_list_is_zero_for_every_rank() {
        for p in PERCENTILE_RANKS {
            assert_eq!(percentile_of_sorted(&[], p as u64), 0);
        }
    }

    #[test]
    fn ninety_fifth_and_ninety_ninth_are_independent() {
        let values: Vec<u64> = (1..=200).collect();
        let p95 = percentile_of_sorted(&values, 95);
        let p99 = percentile_of_sorted(&values, 99);
        assert_ne!(p95, p99, "distinct ranks must not collapse to the same value");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Every rank's extracted value lies within the list's own bounds,
        /// and higher ranks never return a smaller value than lower ones —
        /// invariant 6 in the testable-properties list, generalized beyond
        /// the single worked example.
        #[test]
        fn ranks_are_bounded_and_monotone(mut values: Vec<u64>) {
            values.sort_unstable();
            if values.is_empty() {
                for &p in &PERCENTILE_RANKS {
                    prop_assert_eq!(percentile_of_sorted(&values, p as u64), 0);
                }
                return;
            }

            let min = values[0];
            let max = values[values.len() - 1];
            let mut previous = None;
            for &p in &PERCENTILE_RANKS {
                let extracted = percentile_of_sorted(&values, p as u64);
                prop_assert!(extracted >= min && extracted <= max);
                if let Some(prev) = previous {
                    prop_assert!(extracted >= prev);
                }
                previous = Some(extracted);
            }
        }

        /// The percentile of a sorted list is always one of its own
        /// elements — the function never fabricates a value.
        #[test]
        fn percentile_is_always_a_member(mut values: Vec<u64>, p in 0u64..=100) {
            values.sort_unstable();
            prop_assume!(!values.is_empty());
            let extracted = percentile_of_sorted(&values, p);
            prop_assert!(values.contains(&extracted));
        }
    }
}

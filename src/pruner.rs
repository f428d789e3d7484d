//! Fast rejection of hopeless partition pairs.

use crate::amount::Amount;

/// Sorted-dominance feasibility test.
///
/// Sort both block-sum vectors descending; a bijection can only exist if
/// the i-th largest output sum never exceeds the i-th largest input sum.
/// Otherwise the i+1 largest outputs collectively need more than the i+1
/// largest inputs can supply, and no assignment covers them. Necessary
/// but not sufficient - the mapping checker has the final word.
///
/// Exact integer comparison on satoshis; no epsilon.
pub fn may_admit_mapping(input_sums: &[Amount], output_sums: &[Amount]) -> bool {
    debug_assert_eq!(input_sums.len(), output_sums.len());
    let mut a = input_sums.to_vec();
    let mut b = output_sums.to_vec();
    a.sort_unstable_by(|x, y| y.cmp(x));
    b.sort_unstable_by(|x, y| y.cmp(x));
    a.iter().zip(&b).all(|(ai, bi)| bi <= ai)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker;

    fn sats(values: &[u64]) -> Vec<Amount> {
        values.iter().map(|&v| Amount::from_sat(v)).collect()
    }

    #[test]
    fn test_accepts_feasible_pairs() {
        assert!(may_admit_mapping(&sats(&[5]), &sats(&[5])));
        assert!(may_admit_mapping(&sats(&[2, 3]), &sats(&[1, 4])));
        assert!(may_admit_mapping(&sats(&[10, 1]), &sats(&[1, 10])));
    }

    #[test]
    fn test_rejects_dominated_pairs() {
        assert!(!may_admit_mapping(&sats(&[3]), &sats(&[5])));
        assert!(!may_admit_mapping(&sats(&[2, 2]), &sats(&[3, 1])));
        assert!(!may_admit_mapping(&sats(&[4, 4, 4]), &sats(&[5, 4, 3])));
    }

    #[test]
    fn test_no_false_negatives_small_exhaustive() {
        // Every rejected pair must really admit no bijection at all.
        let universe: Vec<Vec<u64>> = vec![
            vec![1, 2, 3],
            vec![3, 2, 1],
            vec![2, 2, 2],
            vec![1, 1, 4],
            vec![6, 1, 1],
            vec![5, 2, 4],
        ];
        for a in &universe {
            for b in &universe {
                let input_sums = sats(a);
                let output_sums = sats(b);
                if !may_admit_mapping(&input_sums, &output_sums) {
                    let found = checker::for_each_valid_mapping(
                        &input_sums,
                        &output_sums,
                        |_| Ok(()),
                    )
                    .unwrap();
                    assert_eq!(found, 0, "pruner false negative: {:?} vs {:?}", a, b);
                }
            }
        }
    }
}

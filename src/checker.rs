//! Bijection enumeration for surviving partition pairs.
//!
//! Brute force over the k! block permutations, in lexicographic order.
//! Block counts stay small (k <= 10 or so for any run that finishes), so
//! the permutation walk beats anything cleverer and keeps the emitted
//! order deterministic.

use crate::amount::Amount;
use anyhow::Result;

/// Lexicographic next-permutation. Returns false once `perm` is the last
/// (descending) permutation, leaving it untouched.
pub fn next_permutation(perm: &mut [u16]) -> bool {
    if perm.len() < 2 {
        return false;
    }
    let mut i = perm.len() - 1;
    while i > 0 && perm[i - 1] >= perm[i] {
        i -= 1;
    }
    if i == 0 {
        return false;
    }
    let mut j = perm.len() - 1;
    while perm[j] <= perm[i - 1] {
        j -= 1;
    }
    perm.swap(i - 1, j);
    perm[i..].reverse();
    true
}

/// Enumerate every bijection sigma between input and output blocks in
/// lexicographic order and invoke `on_valid` for each one where every
/// matched output block sum fits inside its input block sum.
///
/// `perm[i] = j` pairs input block i with output block j. Returns how many
/// bijections satisfied the inequalities. Errors from the callback (sink
/// failures) abort the walk.
pub fn for_each_valid_mapping<F>(
    input_sums: &[Amount],
    output_sums: &[Amount],
    mut on_valid: F,
) -> Result<u64>
where
    F: FnMut(&[u16]) -> Result<()>,
{
    let k = input_sums.len();
    debug_assert_eq!(k, output_sums.len());
    if k == 0 {
        return Ok(0);
    }
    let mut perm: Vec<u16> = (0..k as u16).collect();
    let mut found = 0u64;
    loop {
        let valid = perm
            .iter()
            .enumerate()
            .all(|(i, &j)| output_sums[j as usize] <= input_sums[i]);
        if valid {
            on_valid(&perm)?;
            found += 1;
        }
        if !next_permutation(&mut perm) {
            break;
        }
    }
    Ok(found)
}

// src/core/crypto/arith.rs
//! Modular vector and matrix arithmetic over `Z_q`.
//!
//! Every result is canonical, i.e. lies in `[0, q)`. Products are widened to
//! `u128` so any `q` that fits in a `u64` is handled without overflow.
//! Mismatched dimensions are a caller bug and panic.

use super::types::Matrix;

/// Reduces a signed value into `[0, q)`. Unlike `%`, negative inputs map to
/// their positive representative.
pub fn reduce(x: i128, q: u64) -> u64 {
    x.rem_euclid(i128::from(q)) as u64
}

fn mul_mod(a: u64, b: u64, q: u64) -> u64 {
    ((u128::from(a) * u128::from(b)) % u128::from(q)) as u64
}

fn add_mod(a: u64, b: u64, q: u64) -> u64 {
    ((u128::from(a) + u128::from(b)) % u128::from(q)) as u64
}

/// `a · b mod q`
pub fn dot_mod(a: &[u64], b: &[u64], q: u64) -> u64 {
    assert_eq!(a.len(), b.len(), "dot product operands must have equal length");
    a.iter()
        .zip(b)
        .fold(0u64, |acc, (&x, &y)| add_mod(acc, mul_mod(x, y, q), q))
}

/// `M · v mod q`
pub fn mat_vec_mod(m: &Matrix, v: &[u64], q: u64) -> Vec<u64> {
    assert_eq!(m.cols(), v.len(), "matrix columns must match vector length");
    m.iter_rows().map(|row| dot_mod(row, v, q)).collect()
}

/// `Mᵗ · v mod q`, computed without materialising the transpose.
pub fn mat_t_vec_mod(m: &Matrix, v: &[u64], q: u64) -> Vec<u64> {
    assert_eq!(m.rows(), v.len(), "matrix rows must match vector length");
    let mut out = vec![0u64; m.cols()];
    for (row, &coeff) in m.iter_rows().zip(v) {
        if coeff == 0 {
            continue;
        }
        for (acc, &x) in out.iter_mut().zip(row) {
            *acc = add_mod(*acc, mul_mod(x, coeff, q), q);
        }
    }
    out
}

/// Adds a small signed error vector to a canonical vector, reducing mod `q`.
pub fn add_error_mod(v: &[u64], e: &[i64], q: u64) -> Vec<u64> {
    assert_eq!(v.len(), e.len(), "error vector must match vector length");
    v.iter()
        .zip(e)
        .map(|(&x, &err)| reduce(i128::from(x) + i128::from(err), q))
        .collect()
}

/// `(a - b) mod q` for canonical scalars.
pub fn sub_mod(a: u64, b: u64, q: u64) -> u64 {
    reduce(i128::from(a) - i128::from(b), q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reduce_negative() {
        assert_eq!(reduce(-1, 3329), 3328);
        assert_eq!(reduce(-3329, 3329), 0);
        assert_eq!(reduce(-3330, 3329), 3328);
        assert_eq!(reduce(6658, 3329), 0);
    }

    #[test]
    fn test_dot_mod() {
        assert_eq!(dot_mod(&[1, 2, 3], &[4, 5, 6], 7), (4 + 10 + 18) % 7);
        assert_eq!(dot_mod(&[], &[], 7), 0);
    }

    #[test]
    fn test_mat_vec_and_transpose() {
        let m = Matrix::from_rows(vec![vec![1, 2], vec![3, 4], vec![5, 6]]).unwrap();
        assert_eq!(mat_vec_mod(&m, &[1, 1], 100), vec![3, 7, 11]);
        assert_eq!(mat_t_vec_mod(&m, &[1, 0, 1], 100), vec![6, 8]);
        assert_eq!(mat_t_vec_mod(&m, &[1, 1, 1], 5), vec![4, 2]);
    }

    #[test]
    #[should_panic(expected = "matrix columns must match vector length")]
    fn test_mat_vec_dimension_violation() {
        let m = Matrix::from_fn(2, 2, |_, _| 1);
        mat_vec_mod(&m, &[1, 2, 3], 7);
    }

    #[test]
    fn test_large_modulus_does_not_overflow() {
        let q = u64::MAX - 58; // largest 64-bit prime
        let a = q - 1;
        assert_eq!(dot_mod(&[a, a], &[a, a], q), 2);
    }

    #[test]
    fn test_add_error_mod_wraps() {
        assert_eq!(add_error_mod(&[0, 3328, 5], &[-2, 2, 0], 3329), vec![3327, 1, 5]);
    }

    proptest! {
        #[test]
        fn prop_reduce_is_canonical(x in any::<i64>(), q in 2u64..1_000_000) {
            let r = reduce(i128::from(x), q);
            prop_assert!(r < q);
            prop_assert_eq!((i128::from(x) - i128::from(r)).rem_euclid(i128::from(q)), 0);
        }

        #[test]
        fn prop_transpose_matches_explicit(rows in 1usize..6, cols in 1usize..6, seed in any::<u64>()) {
            let q = 97;
            let m = Matrix::from_fn(rows, cols, |i, j| (seed.wrapping_mul(31).wrapping_add((i * 7 + j) as u64)) % q);
            let v: Vec<u64> = (0..rows).map(|i| (seed.wrapping_add(i as u64)) % q).collect();
            let t = Matrix::from_fn(cols, rows, |i, j| m.get(j, i));
            prop_assert_eq!(mat_t_vec_mod(&m, &v, q), mat_vec_mod(&t, &v, q));
        }
    }
}

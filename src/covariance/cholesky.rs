//! Jittered Cholesky factorization.

use log::debug;

use super::matrix::{dot, Matrix};

/// Jitter escalation ran out of attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JitterExhausted {
    /// Factorizations tried, the unjittered one included
    pub attempts: usize,
    /// Last diagonal jitter tried
    pub jitter: f64,
}

/// Lower-triangular factor of `a + shift·I`, or `None` when a pivot is not
/// strictly positive (the shifted matrix is not positive-definite).
pub fn cholesky_shifted(a: &Matrix, shift: f64) -> Option<Matrix> {
    debug_assert!(a.is_square());
    let n = a.rows();
    let mut l = Matrix::zeros(n, n);
    let data = l.data_mut();

    for i in 0..n {
        let (done, rest) = data.split_at_mut(i * n);
        let row_i = &mut rest[..n];
        for j in 0..i {
            let row_j = &done[j * n..j * n + j + 1];
            let s = dot(&row_i[..j], &row_j[..j]);
            row_i[j] = (a[(i, j)] - s) / row_j[j];
        }
        let pivot = a[(i, i)] + shift - dot(&row_i[..i], &row_i[..i]);
        if !(pivot > 0.0) || !pivot.is_finite() {
            return None;
        }
        row_i[i] = pivot.sqrt();
    }
    Some(l)
}

/// Cholesky factor with escalating diagonal jitter.
///
/// Tries the plain matrix first, then adds `base_scale · mean(diag) · 10^k`
/// for k = 0..max_attempts. Returns the factor and the jitter that was used.
pub fn jittered_cholesky(
    a: &Matrix,
    base_scale: f64,
    max_attempts: usize,
) -> Result<(Matrix, f64), JitterExhausted> {
    if let Some(l) = cholesky_shifted(a, 0.0) {
        return Ok((l, 0.0));
    }

    let mean_diag = a.mean_diagonal();
    if !(mean_diag > 0.0) || !mean_diag.is_finite() {
        return Err(JitterExhausted {
            attempts: 1,
            jitter: 0.0,
        });
    }

    let mut jitter = mean_diag * base_scale;
    for attempt in 0..max_attempts {
        if let Some(l) = cholesky_shifted(a, jitter) {
            debug!(
                "Cholesky succeeded with jitter {:e} after {} attempts",
                jitter,
                attempt + 2
            );
            return Ok((l, jitter));
        }
        debug!("Cholesky failed with jitter {:e}", jitter);
        if attempt + 1 < max_attempts {
            jitter *= 10.0;
        }
    }

    Err(JitterExhausted {
        attempts: max_attempts + 1,
        jitter,
    })
}

/// Solve `l · x = b` for lower-triangular `l`
pub fn forward_substitute(l: &Matrix, b: &[f64]) -> Vec<f64> {
    let n = l.rows();
    let mut x = vec![0.0; n];
    for i in 0..n {
        let row = l.row(i);
        x[i] = (b[i] - dot(&row[..i], &x[..i])) / row[i];
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn spd() -> Matrix {
        let mut a = Matrix::zeros(3, 3);
        let values = [[4.0, 2.0, 0.4], [2.0, 5.0, 1.0], [0.4, 1.0, 3.0]];
        for i in 0..3 {
            for j in 0..3 {
                a[(i, j)] = values[i][j];
            }
        }
        a
    }

    fn reconstruct(l: &Matrix) -> Matrix {
        let n = l.rows();
        let mut out = Matrix::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                out[(i, j)] = dot(l.row(i), l.row(j));
            }
        }
        out
    }

    #[test]
    fn test_cholesky_reconstructs() {
        let a = spd();
        let l = cholesky_shifted(&a, 0.0).unwrap();
        let back = reconstruct(&l);
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(back[(i, j)], a[(i, j)], epsilon = 1e-12);
            }
            for j in i + 1..3 {
                assert_eq!(l[(i, j)], 0.0);
            }
        }
    }

    #[test]
    fn test_singular_needs_jitter() {
        // Rank one: every row equal
        let mut a = Matrix::zeros(3, 3);
        for i in 0..3 {
            for j in 0..3 {
                a[(i, j)] = 1.0;
            }
        }
        assert!(cholesky_shifted(&a, 0.0).is_none());

        let (l, jitter) = jittered_cholesky(&a, 1e-6, 10).unwrap();
        assert!(jitter > 0.0 && jitter < 1e-2);
        let back = reconstruct(&l);
        assert_relative_eq!(back[(0, 1)], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_indefinite_exhausts() {
        let mut a = Matrix::zeros(2, 2);
        a[(0, 0)] = 1.0;
        a[(1, 1)] = 1.0;
        a[(0, 1)] = 5.0;
        a[(1, 0)] = 5.0;
        let err = jittered_cholesky(&a, 1e-6, 3).unwrap_err();
        assert_eq!(err.attempts, 4);
        assert_relative_eq!(err.jitter, 1e-4, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_matrix_fails_fast() {
        let a = Matrix::zeros(2, 2);
        let err = jittered_cholesky(&a, 1e-6, 10).unwrap_err();
        assert_eq!(err.attempts, 1);
    }

    #[test]
    fn test_forward_substitute() {
        let l = cholesky_shifted(&spd(), 0.0).unwrap();
        let b = [1.0, -2.0, 0.5];
        let x = forward_substitute(&l, &b);
        let back = l.mul_vec(&x);
        for i in 0..3 {
            assert_relative_eq!(back[i], b[i], epsilon = 1e-12);
        }
    }
}

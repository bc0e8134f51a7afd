//! Exact nullspace extraction for homogeneous systems `A·x = 0`.
//!
//! The whole reduction runs over arbitrary-precision rationals; floating
//! point never enters, so the recovered integer coefficients are exact no
//! matter how the matrix entries grow during elimination. The reduction is a
//! full Gauss-Jordan sweep (rows above the pivot are eliminated too), after
//! which one free column seeds the solution and back-substitution fills in
//! the pivot variables.
//!
//! Degenerate inputs follow a fixed, deterministic policy rather than
//! erroring out: a matrix with no rows constrains nothing and yields the
//! all-ones vector, a fully determined system falls back to treating the
//! last column as free, an all-zero normalized solution is reseeded from the
//! free column, and an all-nonpositive one is negated.

use log::warn;
use nalgebra::DMatrix;
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SolveError {
    /// The matrix has no columns, so there is no free variable to seed and
    /// no coefficient vector to return.
    #[error("the system has no columns to solve for")]
    Unsolvable,
}

/// Returns a member of the right nullspace of `a`, scaled to the
/// smallest-magnitude integer vector the solution family admits.
pub fn nullspace_vector(a: &DMatrix<i64>) -> Result<Vec<BigInt>, SolveError> {
    let rows = a.nrows();
    let cols = a.ncols();
    if cols == 0 {
        return Err(SolveError::Unsolvable);
    }
    if rows == 0 {
        // Nothing to constrain.
        return Ok(vec![BigInt::one(); cols]);
    }

    let mut m: Vec<Vec<BigRational>> = (0..rows)
        .map(|i| {
            (0..cols)
                .map(|j| BigRational::from_integer(BigInt::from(a[(i, j)])))
                .collect()
        })
        .collect();

    // Gauss-Jordan: sweep columns left to right, pivot on the first row at
    // or below the current one with a nonzero entry, normalize it to 1 and
    // clear the column everywhere else. Exact arithmetic means no scaled
    // pivoting is needed.
    let mut next_pivot_row = 0;
    for col in 0..cols {
        if next_pivot_row >= rows {
            break;
        }
        let Some(pivot) = (next_pivot_row..rows).find(|&i| !m[i][col].is_zero()) else {
            continue;
        };
        m.swap(next_pivot_row, pivot);
        let pivot_value = m[next_pivot_row][col].clone();
        for j in col..cols {
            let scaled = &m[next_pivot_row][j] / &pivot_value;
            m[next_pivot_row][j] = scaled;
        }
        for i in 0..rows {
            if i == next_pivot_row {
                continue;
            }
            let factor = m[i][col].clone();
            if factor.is_zero() {
                continue;
            }
            for j in col..cols {
                let delta = &factor * &m[next_pivot_row][j];
                let reduced = &m[i][j] - &delta;
                m[i][j] = reduced;
            }
        }
        next_pivot_row += 1;
    }

    // Pivot columns are where each reduced row leads with an exact 1.
    let mut is_pivot_col = vec![false; cols];
    let mut row_pivot: Vec<Option<usize>> = vec![None; rows];
    for (i, row) in m.iter().enumerate() {
        if let Some(j) = row.iter().position(|x| x.is_one()) {
            is_pivot_col[j] = true;
            row_pivot[i] = Some(j);
        }
    }

    // Free variable: right-most column without a pivot. A fully determined
    // homogeneous system only has the trivial solution, so fall back to the
    // last column to still produce a candidate.
    let free = (0..cols)
        .rev()
        .find(|&c| !is_pivot_col[c])
        .unwrap_or(cols - 1);

    let mut solution = vec![BigRational::zero(); cols];
    solution[free] = BigRational::one();
    for i in (0..rows).rev() {
        let Some(j) = row_pivot[i] else { continue };
        let mut acc = BigRational::zero();
        for c in (j + 1)..cols {
            if !m[i][c].is_zero() {
                acc += &m[i][c] * &solution[c];
            }
        }
        solution[j] = -acc;
    }

    Ok(normalize_to_integers(solution, free))
}

/// Clears denominators with their LCM, divides by the GCD of the resulting
/// integers, then applies the reseed and sign policies.
fn normalize_to_integers(solution: Vec<BigRational>, free: usize) -> Vec<BigInt> {
    let mut denominator_lcm = BigInt::one();
    for value in &solution {
        denominator_lcm = denominator_lcm.lcm(value.denom());
    }
    let mut integers: Vec<BigInt> = solution
        .iter()
        .map(|value| value.numer() * (&denominator_lcm / value.denom()))
        .collect();

    let mut common = BigInt::zero();
    for value in &integers {
        common = common.gcd(value);
    }
    if !common.is_zero() && !common.is_one() {
        for value in &mut integers {
            *value = &*value / &common;
        }
    }

    if integers.iter().all(|value| value.is_zero()) {
        warn!("nullspace solution collapsed to zero, reseeding column {free}");
        integers[free] = BigInt::one();
    }
    if integers.iter().all(|value| !value.is_positive()) {
        warn!("nullspace solution is non-positive, flipping sign");
        for value in &mut integers {
            *value = -&*value;
        }
    }
    integers
}

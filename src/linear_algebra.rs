/*!
 * Dense linear algebra on small systems of `f64`s, used by the [solver](crate::solver).
 *
 * Matrices are given as a slice of rows, each row having one element per column.
 */

/**
 * Solves `Ax = b` for `x` by Gaussian elimination with partial pivoting, provided that `A`
 * is square, matches `b` in size and is not singular.
 *
 * A matrix is treated as singular if a pivot is 0 or smaller than `1e-14` times the
 * largest absolute value in `A`.
 *
 * ```
 * use easy_rev::linear_algebra::solve;
 * let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
 * let x = solve(&a, &[3.0, 5.0]).unwrap();
 * assert!((x[0] - 0.8).abs() < 1e-12);
 * assert!((x[1] - 1.4).abs() < 1e-12);
 * assert!(solve(&[vec![1.0, 2.0], vec![2.0, 4.0]], &[1.0, 1.0]).is_none());
 * ```
 */
pub fn solve(matrix: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if matrix.len() != n || matrix.iter().any(|row| row.len() != n) {
        return None;
    }
    let scale = matrix
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |largest, x| largest.max(x.abs()));
    if n == 0 {
        return Some(Vec::new());
    }
    if scale == 0.0 || !scale.is_finite() {
        return None;
    }
    // augmented matrix [A | b]
    let mut rows: Vec<Vec<f64>> = matrix
        .iter()
        .zip(b)
        .map(|(row, &y)| {
            let mut row = row.clone();
            row.push(y);
            row
        })
        .collect();

    for column in 0..n {
        let pivot = (column..n)
            .max_by(|&i, &j| rows[i][column].abs().total_cmp(&rows[j][column].abs()))?;
        if rows[pivot][column].abs() <= 1e-14 * scale {
            return None;
        }
        rows.swap(column, pivot);
        for row in (column + 1)..n {
            let factor = rows[row][column] / rows[column][column];
            if factor == 0.0 {
                continue;
            }
            for k in column..=n {
                let subtract = factor * rows[column][k];
                rows[row][k] -= subtract;
            }
        }
    }

    // back substitution
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let known: f64 = ((row + 1)..n).map(|k| rows[row][k] * x[k]).sum();
        x[row] = (rows[row][n] - known) / rows[row][row];
    }
    Some(x)
}

/**
 * Swaps the rows and columns of a matrix.
 */
pub fn transpose(matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let columns = matrix.first().map(|row| row.len()).unwrap_or(0);
    (0..columns)
        .map(|column| matrix.iter().map(|row| row[column]).collect())
        .collect()
}

/**
 * Computes `Ax`.
 */
pub fn multiply(matrix: &[Vec<f64>], x: &[f64]) -> Vec<f64> {
    matrix
        .iter()
        .map(|row| row.iter().zip(x).map(|(a, b)| a * b).sum())
        .collect()
}

/**
 * The euclidean length of a vector.
 */
pub fn norm(x: &[f64]) -> f64 {
    x.iter().map(|x| x * x).sum::<f64>().sqrt()
}

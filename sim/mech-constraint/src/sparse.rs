//! Sparse assembly of constraint rows.
//!
//! For a system with N body slots and M constraint rows, the Jacobian has
//! dimensions M × 3N. Each row only touches the column blocks of the one or
//! two bodies its constraint references, so rows are accumulated as triplets
//! and compressed to CSR before the solve.

use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// Sparse constraint Jacobian in CSR format for efficient row operations.
#[derive(Debug, Clone)]
pub struct SparseJacobian {
    matrix: CsrMatrix<f64>,
}

impl SparseJacobian {
    /// Build a sparse Jacobian from `(row, col, value)` triplets.
    ///
    /// Duplicate entries are summed.
    #[must_use]
    pub fn from_triplets(
        num_rows: usize,
        num_cols: usize,
        triplets: &[(usize, usize, f64)],
    ) -> Self {
        let mut coo = CooMatrix::new(num_rows, num_cols);
        for &(row, col, val) in triplets {
            if val.abs() > 1e-15 {
                coo.push(row, col, val);
            }
        }
        Self {
            matrix: CsrMatrix::from(&coo),
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn nrows(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of columns.
    #[must_use]
    pub fn ncols(&self) -> usize {
        self.matrix.ncols()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    /// Compute `J · v`.
    #[must_use]
    pub fn mul_vec(&self, v: &DVector<f64>) -> DVector<f64> {
        let mut result = DVector::zeros(self.nrows());
        for (row_idx, row) in self.matrix.row_iter().enumerate() {
            result[row_idx] = row
                .col_indices()
                .iter()
                .zip(row.values())
                .map(|(&col, &val)| val * v[col])
                .sum();
        }
        result
    }

    /// Compute `Jᵗ · v`.
    #[must_use]
    pub fn mul_transpose_vec(&self, v: &DVector<f64>) -> DVector<f64> {
        let mut result = DVector::zeros(self.ncols());
        for (row_idx, row) in self.matrix.row_iter().enumerate() {
            let v_row = v[row_idx];
            for (&col, &val) in row.col_indices().iter().zip(row.values()) {
                result[col] += val * v_row;
            }
        }
        result
    }

    /// Compute `J · diag(w) · Jᵗ · v` without forming the product matrix.
    #[must_use]
    pub fn normal_mul(&self, weights: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        let spread = self.mul_transpose_vec(v).component_mul(weights);
        self.mul_vec(&spread)
    }

    /// Diagonal of `J · diag(w) · Jᵗ`.
    #[must_use]
    pub fn normal_diagonal(&self, weights: &DVector<f64>) -> DVector<f64> {
        let mut diag = DVector::zeros(self.nrows());
        for (row_idx, row) in self.matrix.row_iter().enumerate() {
            diag[row_idx] = row
                .col_indices()
                .iter()
                .zip(row.values())
                .map(|(&col, &val)| val * val * weights[col])
                .sum();
        }
        diag
    }

    /// Convert to a dense matrix (for testing or small systems).
    #[must_use]
    pub fn to_dense(&self) -> nalgebra::DMatrix<f64> {
        let mut dense = nalgebra::DMatrix::zeros(self.nrows(), self.ncols());
        for (row_idx, row) in self.matrix.row_iter().enumerate() {
            for (&col, &val) in row.col_indices().iter().zip(row.values()) {
                dense[(row_idx, col)] = val;
            }
        }
        dense
    }
}

/// Row buffers filled by constraints: error `C`, Jacobian `J` and its time
/// derivative `J̇`.
#[derive(Debug, Clone, Default)]
pub struct ConstraintRows {
    error: DVector<f64>,
    jacobian: Vec<(usize, usize, f64)>,
    jacobian_dot: Vec<(usize, usize, f64)>,
    columns: usize,
    record_derivative: bool,
}

impl ConstraintRows {
    /// Buffers for `rows` constraint rows over `columns` generalized
    /// coordinates.
    #[must_use]
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            error: DVector::zeros(rows),
            jacobian: Vec::new(),
            jacobian_dot: Vec::new(),
            columns,
            record_derivative: true,
        }
    }

    /// Clear all rows, keeping allocations. With `record_derivative` off,
    /// `J̇` entries are dropped (rest-pose assembly).
    pub fn reset(&mut self, rows: usize, columns: usize, record_derivative: bool) {
        if self.error.len() == rows {
            self.error.fill(0.0);
        } else {
            self.error = DVector::zeros(rows);
        }
        self.jacobian.clear();
        self.jacobian_dot.clear();
        self.columns = columns;
        self.record_derivative = record_derivative;
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.error.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Whether `J̇` entries are being recorded.
    #[must_use]
    pub fn records_derivative(&self) -> bool {
        self.record_derivative
    }

    /// Set the constraint error of `row`.
    pub fn set_error(&mut self, row: usize, value: f64) {
        self.error[row] = value;
    }

    /// Add `value` to `J[row, col]`.
    pub fn add_jacobian(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(col < self.columns, "column {col} outside {}", self.columns);
        self.jacobian.push((row, col, value));
    }

    /// Add `value` to `J̇[row, col]`.
    pub fn add_jacobian_dot(&mut self, row: usize, col: usize, value: f64) {
        if self.record_derivative {
            debug_assert!(col < self.columns, "column {col} outside {}", self.columns);
            self.jacobian_dot.push((row, col, value));
        }
    }

    /// The constraint error vector `C`.
    #[must_use]
    pub fn error(&self) -> &DVector<f64> {
        &self.error
    }

    /// Compress the Jacobian.
    #[must_use]
    pub fn jacobian(&self) -> SparseJacobian {
        SparseJacobian::from_triplets(self.rows(), self.columns, &self.jacobian)
    }

    /// Compress the Jacobian time derivative.
    #[must_use]
    pub fn jacobian_dot(&self) -> SparseJacobian {
        SparseJacobian::from_triplets(self.rows(), self.columns, &self.jacobian_dot)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sparse_jacobian_products() {
        let triplets = vec![(0, 0, 1.0), (0, 3, -1.0), (1, 2, 2.0), (1, 2, 1.0)];
        let jac = SparseJacobian::from_triplets(2, 6, &triplets);

        assert_eq!(jac.nrows(), 2);
        assert_eq!(jac.ncols(), 6);
        assert_eq!(jac.to_dense()[(1, 2)], 3.0);

        let v = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let jv = jac.mul_vec(&v);
        assert_relative_eq!(jv[0], -3.0);
        assert_relative_eq!(jv[1], 9.0);

        let lambda = DVector::from_vec(vec![1.0, 2.0]);
        let jt = jac.mul_transpose_vec(&lambda);
        assert_relative_eq!(jt[0], 1.0);
        assert_relative_eq!(jt[2], 6.0);
        assert_relative_eq!(jt[3], -1.0);
    }

    #[test]
    fn test_normal_product_matches_dense() {
        let triplets = vec![(0, 0, 1.0), (0, 2, 0.5), (1, 2, 1.0), (1, 5, -1.0)];
        let jac = SparseJacobian::from_triplets(2, 6, &triplets);
        let weights = DVector::from_vec(vec![0.5, 0.5, 0.5, 0.25, 0.25, 0.25]);
        let v = DVector::from_vec(vec![1.0, -2.0]);

        let dense = jac.to_dense();
        let w = nalgebra::DMatrix::from_diagonal(&weights);
        let expected = &dense * w * dense.transpose() * &v;
        let actual = jac.normal_mul(&weights, &v);
        assert_relative_eq!(actual, expected, epsilon = 1e-12);

        let diag = jac.normal_diagonal(&weights);
        assert_relative_eq!(diag[0], 0.5 + 0.25 * 0.5, epsilon = 1e-12);
        assert_relative_eq!(diag[1], 0.5 + 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_rows_skip_derivative_in_rest_mode() {
        let mut rows = ConstraintRows::new(1, 3);
        rows.reset(1, 3, false);
        rows.set_error(0, 0.5);
        rows.add_jacobian(0, 1, 1.0);
        rows.add_jacobian_dot(0, 2, 4.0);

        assert_eq!(rows.jacobian().nnz(), 1);
        assert_eq!(rows.jacobian_dot().nnz(), 0);
        assert_eq!(rows.error()[0], 0.5);
    }
}

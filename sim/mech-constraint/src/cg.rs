//! Matrix-free conjugate gradient.
//!
//! Solves `A · x = b` for a symmetric positive (semi-)definite `A` given only
//! the product `p ↦ A · p`:
//!
//! ```text
//! 1. r_0 = b - A * x_0
//! 2. p_0 = z_0 = M^-1 * r_0
//! 3. For k = 0, 1, 2, ...:
//!    α_k = (r_k · z_k) / (p_k · A * p_k)
//!    x_{k+1} = x_k + α_k * p_k
//!    r_{k+1} = r_k - α_k * A * p_k
//!    β_k = (r_{k+1} · z_{k+1}) / (r_k · z_k)
//!    p_{k+1} = z_{k+1} + β_k * p_k
//! ```
//!
//! Convergence is tested per row rather than on the residual norm: every
//! `|r_i|` must fall below `max(relative · |b_i|, absolute)`.

use nalgebra::DVector;

/// Per-row convergence thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CgTolerance {
    /// Fraction of `|b_i|` accepted as residual.
    pub relative: f64,
    /// Absolute residual floor.
    pub absolute: f64,
}

impl CgTolerance {
    /// Whether `residual` satisfies the tolerance against `rhs`.
    #[must_use]
    pub fn accepts(&self, residual: &DVector<f64>, rhs: &DVector<f64>) -> bool {
        residual
            .iter()
            .zip(rhs.iter())
            .all(|(r, b)| r.abs() <= (self.relative * b.abs()).max(self.absolute))
    }
}

/// Iteration limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CgLimits {
    /// Iterations before the convergence test applies.
    pub min_iterations: usize,
    /// Hard iteration cap.
    pub max_iterations: usize,
}

/// Result of one CG run.
#[derive(Debug, Clone)]
pub struct CgOutcome {
    /// Final iterate.
    pub solution: DVector<f64>,
    /// Iterations performed.
    pub iterations: usize,
    /// Whether the tolerance was met.
    pub converged: bool,
    /// Euclidean norm of the final residual.
    pub residual_norm: f64,
}

/// Run preconditioned CG from `x0`.
///
/// `inverse_diagonal`, when given, is the Jacobi preconditioner `M^-1`.
/// The iteration stops early on breakdown (`p · A p ≈ 0`), which happens
/// when the remaining residual lies in the null space of `A`.
#[allow(clippy::many_single_char_names)]
pub fn conjugate_gradient<F>(
    apply: F,
    b: &DVector<f64>,
    x0: DVector<f64>,
    inverse_diagonal: Option<&DVector<f64>>,
    tolerance: CgTolerance,
    limits: CgLimits,
) -> CgOutcome
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
{
    let precondition = |r: &DVector<f64>| match inverse_diagonal {
        Some(diag) => r.component_mul(diag),
        None => r.clone(),
    };

    let mut x = x0;
    let mut r = b - apply(&x);

    if limits.min_iterations == 0 && tolerance.accepts(&r, b) {
        let residual_norm = r.norm();
        return CgOutcome {
            solution: x,
            iterations: 0,
            converged: true,
            residual_norm,
        };
    }

    let mut z = precondition(&r);
    let mut p = z.clone();
    let mut r_dot_z = r.dot(&z);
    let mut converged = false;
    let mut iterations = 0;

    for k in 0..limits.max_iterations {
        iterations = k + 1;

        let ap = apply(&p);
        let p_dot_ap = p.dot(&ap);
        if p_dot_ap.abs() < 1e-30 {
            converged = tolerance.accepts(&r, b);
            break;
        }
        let alpha = r_dot_z / p_dot_ap;

        x.axpy(alpha, &p, 1.0);
        r.axpy(-alpha, &ap, 1.0);

        if iterations >= limits.min_iterations && tolerance.accepts(&r, b) {
            converged = true;
            break;
        }

        z = precondition(&r);
        let r_dot_z_new = r.dot(&z);
        let beta = r_dot_z_new / r_dot_z.max(1e-300);
        r_dot_z = r_dot_z_new;

        p = &z + beta * &p;
    }

    let residual_norm = r.norm();
    CgOutcome {
        solution: x,
        iterations,
        converged,
        residual_norm,
    }
}

/// Jacobi preconditioner from a diagonal, with zero entries mapped to 1.
#[must_use]
pub fn jacobi_inverse(diagonal: &DVector<f64>) -> DVector<f64> {
    diagonal.map(|d| if d.abs() > 1e-15 { 1.0 / d } else { 1.0 })
}

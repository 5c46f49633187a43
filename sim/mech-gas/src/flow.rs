//! Compressible orifice flow of a monatomic ideal gas.
//!
//! The molar flow through an orifice from a reservoir at `(p0, T0)` into
//! back pressure `p1` depends on the ratio `r = p1 / p0`:
//!
//! ```text
//! r <  r*:  ṅ = K* · p0 / sqrt(R·T0)                                 (choked)
//! r >= r*:  ṅ = sqrt(2γ/(γ−1) · (r^(2/γ) − r^((γ+1)/γ))) · p0 / sqrt(R·T0)
//!
//! r* = (2/(γ+1))^(γ/(γ−1))
//! K* = sqrt(γ) · (2/(γ+1))^((γ+1)/(2(γ−1)))
//! ```
//!
//! `K*` is the subsonic expression evaluated at `r*`, so the rate is
//! continuous across the transition.

/// Molar gas constant (J/(mol·K)).
pub const GAS_CONSTANT: f64 = 8.314;

/// Heat capacity ratio of a monatomic ideal gas.
pub const GAMMA: f64 = 5.0 / 3.0;

/// `γ/(γ−1)`, the isentropic pressure exponent.
pub const ISENTROPIC_EXPONENT: f64 = 2.5;

/// Internal energy per mole per kelvin over `R` (`3/2` for a monatomic gas).
pub const ENERGY_FACTOR: f64 = 1.5;

/// Critical pressure ratio `(2/(γ+1))^(γ/(γ−1))`. Below it the flow is choked.
pub const CHOKED_FLOW_LIMIT: f64 = 0.487_139_289_628_746_6;

/// Choked flow coefficient `sqrt(γ)·(2/(γ+1))^((γ+1)/(2(γ−1)))`.
pub const CHOKED_FLOW_RATIO: f64 = 0.726_184_377_413_890_5;

/// Molar mass of air (kg/mol), the default for new cells.
pub const DEFAULT_MOLAR_MASS: f64 = 0.029;

/// Whether the flow at pressure ratio `ratio = p1/p0` is choked.
#[must_use]
pub fn is_choked(ratio: f64) -> bool {
    ratio < CHOKED_FLOW_LIMIT
}

/// Dimensionless flow function of the pressure ratio.
///
/// Multiplied by `p0 / sqrt(R·T0)` it gives the molar rate per unit
/// orifice constant.
#[must_use]
pub fn flow_function(ratio: f64) -> f64 {
    let r = ratio.clamp(0.0, 1.0);
    if is_choked(r) {
        return CHOKED_FLOW_RATIO;
    }
    let term = r.powf(2.0 / GAMMA) - r.powf((GAMMA + 1.0) / GAMMA);
    (2.0 * ISENTROPIC_EXPONENT * term).max(0.0).sqrt()
}

/// Molar flow rate from a source at pressure `p0` and temperature `t0` into
/// back pressure `p1`.
///
/// Returns zero when the source is empty or colder than absolute zero would
/// allow.
#[must_use]
pub fn mole_flow_rate(p0: f64, p1: f64, t0: f64) -> f64 {
    if !(p0 > 0.0 && t0 > 0.0) {
        return 0.0;
    }
    flow_function(p1 / p0) * p0 / (GAS_CONSTANT * t0).sqrt()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constants_match_gamma() {
        assert_relative_eq!(ISENTROPIC_EXPONENT, GAMMA / (GAMMA - 1.0), epsilon = 1e-12);
        assert_relative_eq!(
            CHOKED_FLOW_LIMIT,
            (2.0 / (GAMMA + 1.0)).powf(GAMMA / (GAMMA - 1.0)),
            epsilon = 1e-15
        );
        assert_relative_eq!(
            CHOKED_FLOW_RATIO,
            GAMMA.sqrt() * (2.0 / (GAMMA + 1.0)).powf((GAMMA + 1.0) / (2.0 * (GAMMA - 1.0))),
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_continuous_at_choke_point() {
        let below = flow_function(CHOKED_FLOW_LIMIT - 1e-9);
        let above = flow_function(CHOKED_FLOW_LIMIT + 1e-9);
        assert_relative_eq!(below, above, epsilon = 1e-7);
    }

    #[test]
    fn test_choked_rate_closed_form() {
        let (p0, t0) = (300_000.0, 350.0);
        let p1 = 0.2 * p0;
        let expected = CHOKED_FLOW_RATIO * p0 / (GAS_CONSTANT * t0).sqrt();
        assert!(is_choked(p1 / p0));
        assert_relative_eq!(mole_flow_rate(p0, p1, t0), expected, max_relative = 1e-12);
    }

    #[test]
    fn test_subsonic_rate_closed_form() {
        let (p0, t0) = (120_000.0, 290.0);
        let r: f64 = 0.8;
        let expected = (2.0 * GAMMA / (GAMMA - 1.0)
            * (r.powf(2.0 / GAMMA) - r.powf((GAMMA + 1.0) / GAMMA)))
        .sqrt()
            * p0
            / (GAS_CONSTANT * t0).sqrt();
        assert!(!is_choked(r));
        assert_relative_eq!(mole_flow_rate(p0, r * p0, t0), expected, max_relative = 1e-12);
    }

    #[test]
    fn test_no_flow_at_equal_pressure_or_empty_source() {
        assert_eq!(mole_flow_rate(1000.0, 1000.0, 300.0), 0.0);
        assert_eq!(mole_flow_rate(0.0, 0.0, 300.0), 0.0);
        assert_eq!(mole_flow_rate(1000.0, 0.0, 0.0), 0.0);
        assert!(flow_function(0.5) > flow_function(0.9));
    }
}

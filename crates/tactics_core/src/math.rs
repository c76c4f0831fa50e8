//! Fixed-point math utilities for deterministic resolution.
//!
//! Part qualities, hit points, energy, resources and research fractions
//! are all fractional. Floating-point results can differ between CPUs,
//! so every client resolving the same turn would risk diverging. All of
//! those quantities use [`Fixed`] instead.

use fixed::types::I32F32;

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> Fixed {
    Fixed::from_num(n)
}

/// Create a fixed-point number from a percentage (`150` is `1.5`).
///
/// Data files express qualities and thresholds as integer percentages so
/// that no float ever reaches the simulation.
#[must_use]
pub fn from_percent(percent: u32) -> Fixed {
    Fixed::from_num(percent) / Fixed::from_num(100)
}

/// Divide, saturating to [`Fixed::MAX`] when the divisor is zero.
///
/// Energy costs divide by part quality; a zero-quality part simply can
/// never afford to act.
#[must_use]
pub fn saturating_div(numerator: Fixed, divisor: Fixed) -> Fixed {
    numerator.checked_div(divisor).unwrap_or(Fixed::MAX)
}

/// Raise `base` to an integer power by repeated squaring.
///
/// Intermediate products are truncated exactly the same way on every
/// platform, so the result is deterministic.
#[must_use]
pub fn pow_int(base: Fixed, mut exp: u32) -> Fixed {
    let mut result = Fixed::ONE;
    let mut square = base;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.saturating_mul(square);
        }
        square = square.saturating_mul(square);
        exp >>= 1;
    }
    result
}

/// Base of the research saturation curve: each research point keeps
/// 199/200 of the remaining distance to a full unlock.
#[must_use]
pub fn research_base() -> Fixed {
    Fixed::from_num(199) / Fixed::from_num(200)
}

/// Research fraction for an accumulated research total.
///
/// `1 - (199/200)^points`, which starts at zero and approaches one.
#[must_use]
pub fn research_fraction(points: u32) -> Fixed {
    Fixed::ONE - pow_int(research_base(), points)
}

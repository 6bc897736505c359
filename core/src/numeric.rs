use std::fmt;

// ============================================================================
// Numeric Type System
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub enum NumericType {
    /// 64-bit signed integer, wraps on overflow
    Int(i64),

    /// IEEE 754 double precision floating point
    Float(f64),
}

// ============================================================================
// Display Implementation
// ============================================================================

/// Finite floats always print with a decimal point and read back as the
/// same float. NaN and the infinities print as `NaN`, `+Inf` and `-Inf`,
/// which read back as symbols: they fall outside the print/read round trip.
impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NumericType::Int(n) => write!(f, "{n}"),
            NumericType::Float(x) => {
                if x.is_nan() {
                    write!(f, "NaN")
                } else if x.is_infinite() {
                    let sign = if *x > 0.0 { "+Inf" } else { "-Inf" };
                    write!(f, "{sign}")
                } else if x.fract() == 0.0 {
                    // Keep the decimal point so the printed form reads back as a float
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
        }
    }
}

// ============================================================================
// Equality
// ============================================================================

/// Numbers of different kinds are never equal: `1` and `1.0` differ.
impl PartialEq for NumericType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NumericType::Int(a), NumericType::Int(b)) => a == b,
            (NumericType::Float(a), NumericType::Float(b)) => a == b,
            _ => false,
        }
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

impl NumericType {
    pub fn is_float(&self) -> bool {
        matches!(self, NumericType::Float(_))
    }

    pub fn to_float(&self) -> f64 {
        match self {
            NumericType::Int(n) => *n as f64,
            NumericType::Float(x) => *x,
        }
    }

    /// Add two numbers. Int + Int stays Int; anything involving a Float
    /// promotes to Float.
    pub fn add(&self, other: &NumericType) -> NumericType {
        match (self, other) {
            (NumericType::Int(a), NumericType::Int(b)) => NumericType::Int(a.wrapping_add(*b)),
            _ => NumericType::Float(self.to_float() + other.to_float()),
        }
    }
}

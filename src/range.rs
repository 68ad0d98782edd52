//! Numeric literals and ranges used by the schema model.
//!
//! Ranges are declared in *logical* units (what the schema author writes); numeric types
//! with a divisor store `round(value × divisor)` on the wire, so bounds are scaled into
//! *raw* units before values are checked against them.

use std::fmt;

/// A number as written in a schema or value literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Uint(u64),
    Float(f64),
    /// Exact quotient `raw / divisor`, as decoded from an integer type with a divisor.
    Scaled { raw: i128, divisor: u32 },
}

impl Number {
    pub fn to_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Uint(u) => u as f64,
            Number::Float(f) => f,
            Number::Scaled { raw, divisor } => raw as f64 / f64::from(divisor),
        }
    }

    /// Scale by `divisor` into an exact integer. Floats are rounded; `None` if the
    /// result is not finite or does not fit in an `i128`.
    pub fn scaled_integer(self, divisor: u32) -> Option<i128> {
        let d = i128::from(divisor);
        match self {
            Number::Int(i) => i128::from(i).checked_mul(d),
            Number::Uint(u) => i128::from(u).checked_mul(d),
            Number::Scaled { raw, divisor: own } if own > 0 && divisor % own == 0 => {
                raw.checked_mul(i128::from(divisor / own))
            }
            Number::Float(_) | Number::Scaled { .. } => {
                let scaled = (self.to_f64() * f64::from(divisor)).round();
                if !scaled.is_finite() || scaled.abs() >= 1.7e38 {
                    return None;
                }
                Some(scaled as i128)
            }
        }
    }

    pub fn scaled_float(self, divisor: u32) -> f64 {
        self.to_f64() * f64::from(divisor)
    }

    pub fn is_negative(self) -> bool {
        match self {
            Number::Int(i) => i < 0,
            Number::Uint(_) => false,
            Number::Float(f) => f < 0.0,
            Number::Scaled { raw, .. } => raw < 0,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Uint(u) => write!(f, "{}", u),
            Number::Float(x) => write!(f, "{:?}", x),
            Number::Scaled { raw, divisor } => write_scaled(f, *raw, *divisor),
        }
    }
}

/// Exact decimal for power-of-ten divisors, nearest `f64` otherwise.
fn write_scaled(f: &mut fmt::Formatter<'_>, raw: i128, divisor: u32) -> fmt::Result {
    let digits = divisor.checked_ilog10().unwrap_or(0);
    if 10u32.pow(digits) != divisor {
        return write!(f, "{:?}", raw as f64 / f64::from(divisor.max(1)));
    }
    let sign = if raw < 0 { "-" } else { "" };
    let d = u128::from(divisor);
    let whole = raw.unsigned_abs() / d;
    let frac = raw.unsigned_abs() % d;
    let frac = format!("{:0width$}", frac, width = digits as usize);
    let frac = frac.trim_end_matches('0');
    write!(f, "{}{}.{}", sign, whole, if frac.is_empty() { "0" } else { frac })
}

/// Inclusive range of a numeric type, in logical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    pub min: Number,
    pub max: Number,
}

impl NumericRange {
    pub fn new(min: Number, max: Number) -> Self {
        NumericRange { min, max }
    }

    pub fn single(n: Number) -> Self {
        NumericRange { min: n, max: n }
    }

    /// Raw integer bounds after scaling by `divisor`. `None` if a bound overflows.
    pub fn scaled_integer(&self, divisor: u32) -> Option<(i128, i128)> {
        Some((
            self.min.scaled_integer(divisor)?,
            self.max.scaled_integer(divisor)?,
        ))
    }

    pub fn scaled_float(&self, divisor: u32) -> (f64, f64) {
        (self.min.scaled_float(divisor), self.max.scaled_float(divisor))
    }
}

impl fmt::Display for NumericRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}-{}", self.min, self.max)
        }
    }
}

/// Raw bounds of a numeric type after divisor scaling, ready for value checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawRange {
    Integer { min: i128, max: i128 },
    Float { min: f64, max: f64 },
}

impl RawRange {
    pub fn contains_integer(&self, v: i128) -> bool {
        match *self {
            RawRange::Integer { min, max } => v >= min && v <= max,
            RawRange::Float { min, max } => (v as f64) >= min && (v as f64) <= max,
        }
    }

    pub fn contains_float(&self, v: f64) -> bool {
        match *self {
            RawRange::Integer { min, max } => v >= min as f64 && v <= max as f64,
            RawRange::Float { min, max } => v >= min && v <= max,
        }
    }
}

/// Element-count bounds of a container type. An undeclared range is `0..=u64::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayRange {
    pub min: u64,
    pub max: u64,
}

impl ArrayRange {
    pub const UNBOUNDED: ArrayRange = ArrayRange { min: 0, max: u64::MAX };

    pub fn new(min: u64, max: u64) -> Self {
        ArrayRange { min, max }
    }

    pub fn exact(n: u64) -> Self {
        ArrayRange { min: n, max: n }
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }

    pub fn contains(&self, count: u64) -> bool {
        count >= self.min && count <= self.max
    }

    pub fn is_fixed(&self) -> bool {
        self.min == self.max
    }
}

impl fmt::Display for ArrayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else if self.max == u64::MAX {
            write!(f, "{}-", self.min)
        } else {
            write!(f, "{}-{}", self.min, self.max)
        }
    }
}

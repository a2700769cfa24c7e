//! The number type shared by the lexer and the evaluator.

use std::fmt::Display;

/// A numeric literal or the result of arithmetic on numeric literals.
/// Integers stay exact for as long as every operand is an integer and the
/// operation does not overflow; everything else is carried out in floats.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    /// Converts the text of an integer-class token into a number. Literals
    /// with a fractional part, or too large for an `i64`, become floats.
    pub fn from_literal(literal_text: &str) -> Option<Number> {
        if let Ok(int_value) = literal_text.parse::<i64>() {
            return Some(Number::Integer(int_value));
        }

        return literal_text.parse::<f64>().ok().map(Number::Float);
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Integer(int_value) => *int_value as f64,
            Number::Float(float_value) => *float_value,
        }
    }

    /// Returns the number as a repetition count if it is a non-negative
    /// integer.
    pub fn as_count(&self) -> Option<usize> {
        match self {
            Number::Integer(int_value) if *int_value >= 0 => usize::try_from(*int_value).ok(),
            _ => None,
        }
    }

    // Applies int_op when both sides are integers and it does not overflow,
    // float_op otherwise.
    fn combine(
        self,
        other: Number,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Number {
        if let (Number::Integer(lhs), Number::Integer(rhs)) = (self, other) {
            if let Some(result) = int_op(lhs, rhs) {
                return Number::Integer(result);
            }
        }

        return Number::Float(float_op(self.as_f64(), other.as_f64()));
    }

    pub fn add(self, other: Number) -> Number {
        return self.combine(other, i64::checked_add, |lhs, rhs| lhs + rhs);
    }

    pub fn sub(self, other: Number) -> Number {
        return self.combine(other, i64::checked_sub, |lhs, rhs| lhs - rhs);
    }

    pub fn mul(self, other: Number) -> Number {
        return self.combine(other, i64::checked_mul, |lhs, rhs| lhs * rhs);
    }

    /// Divides self by other. Returns None for an integer division by zero.
    /// Integer divisions that do not come out even produce a float.
    pub fn checked_div(self, other: Number) -> Option<Number> {
        if let Number::Integer(0) = other {
            if let Number::Integer(_) = self {
                return None;
            }
        }

        return Some(self.combine(
            other,
            |lhs, rhs| match lhs.checked_rem(rhs) {
                Some(0) => lhs.checked_div(rhs),
                _ => None,
            },
            |lhs, rhs| lhs / rhs,
        ));
    }

    /// Remainder of self divided by other, with the sign of self. Returns
    /// None for an integer remainder by zero.
    pub fn checked_rem(self, other: Number) -> Option<Number> {
        if let (Number::Integer(_), Number::Integer(0)) = (self, other) {
            return None;
        }

        return Some(self.combine(
            other,
            |lhs, rhs| Some(lhs.wrapping_rem(rhs)),
            |lhs, rhs| lhs % rhs,
        ));
    }

    pub fn abs(self) -> Number {
        match self {
            Number::Integer(int_value) => match int_value.checked_abs() {
                Some(abs_value) => Number::Integer(abs_value),
                None => Number::Float((int_value as f64).abs()),
            },
            Number::Float(float_value) => Number::Float(float_value.abs()),
        }
    }

    pub fn pow(self, exponent: Number) -> Number {
        return self.combine(
            exponent,
            |base, exp| u32::try_from(exp).ok().and_then(|exp| base.checked_pow(exp)),
            f64::powf,
        );
    }
}

impl Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::Integer(int_value) => {
                return write!(f, "{}", int_value);
            }
            Number::Float(float_value) => {
                return write!(f, "{}", float_value);
            }
        }
    }
}

//! Pure arithmetic over `f64`.
//!
//! Division by zero is a value ([`Quotient::Undefined`]), not an error.

use calculator_sdk::Operation;

/// Outcome of [`divide`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Quotient {
    Value(f64),
    Undefined,
}

impl Quotient {
    #[must_use]
    pub fn value(self) -> Option<f64> {
        match self {
            Quotient::Value(v) => Some(v),
            Quotient::Undefined => None,
        }
    }
}

#[must_use]
pub fn add(a: f64, b: f64) -> f64 {
    a + b
}

#[must_use]
pub fn subtract(a: f64, b: f64) -> f64 {
    a - b
}

#[must_use]
pub fn multiply(a: f64, b: f64) -> f64 {
    a * b
}

#[must_use]
pub fn divide(a: f64, b: f64) -> Quotient {
    if b == 0.0 {
        Quotient::Undefined
    } else {
        Quotient::Value(a / b)
    }
}

/// Applies `operation`; `None` only for division by zero.
#[must_use]
pub fn evaluate(operation: Operation, a: f64, b: f64) -> Option<f64> {
    match operation {
        Operation::Add => Some(add(a, b)),
        Operation::Subtract => Some(subtract(a, b)),
        Operation::Multiply => Some(multiply(a, b)),
        Operation::Divide => divide(a, b).value(),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn basic_operations() {
        assert_eq!(add(2.0, 3.0), 5.0);
        assert_eq!(subtract(2.0, 3.0), -1.0);
        assert_eq!(multiply(2.5, 4.0), 10.0);
        assert_eq!(divide(7.0, 2.0), Quotient::Value(3.5));
    }

    #[test]
    fn divide_by_zero_is_undefined() {
        assert_eq!(divide(5.0, 0.0), Quotient::Undefined);
        assert_eq!(divide(5.0, -0.0), Quotient::Undefined);
        assert_eq!(divide(0.0, 0.0), Quotient::Undefined);
        assert_eq!(evaluate(Operation::Divide, 5.0, 0.0), None);
    }

    #[test]
    fn evaluate_dispatches_by_operation() {
        assert_eq!(evaluate(Operation::Add, 1.5, 1.5), Some(3.0));
        assert_eq!(evaluate(Operation::Subtract, 1.0, 4.0), Some(-3.0));
        assert_eq!(evaluate(Operation::Multiply, -2.0, 3.0), Some(-6.0));
        assert_eq!(evaluate(Operation::Divide, 9.0, 3.0), Some(3.0));
    }

    #[test]
    fn evaluation_is_deterministic() {
        for op in Operation::ALL {
            assert_eq!(evaluate(op, 0.1, 0.2), evaluate(op, 0.1, 0.2));
        }
    }
}

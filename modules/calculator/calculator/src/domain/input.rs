//! Request-boundary parsing of operands typed by a person.
//!
//! Both `.` and `,` are accepted as the decimal separator, so `"2,5"` and
//! `"2.5"` parse to the same value.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("invalid input for operand {position}")]
    InvalidOperand { position: u8 },
}

impl InputError {
    #[must_use]
    pub fn position(&self) -> u8 {
        match self {
            Self::InvalidOperand { position } => *position,
        }
    }
}

/// Parses one operand. `position` is 1-based and only used in the error.
///
/// # Errors
/// Returns [`InputError::InvalidOperand`] for empty text, more than one
/// decimal separator, anything `f64` cannot parse, and non-finite values.
pub fn parse_operand(position: u8, text: &str) -> Result<f64, InputError> {
    let invalid = || InputError::InvalidOperand { position };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }
    if trimmed.chars().filter(|c| matches!(c, '.' | ',')).count() > 1 {
        return Err(invalid());
    }

    let normalized = trimmed.replace(',', ".");
    let value: f64 = normalized.parse().map_err(|_| invalid())?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(invalid())
    }
}

/// Raw compute (or update) request as received from a caller.
#[derive(Debug, Clone, Default)]
pub struct ComputeRequest {
    pub value1: String,
    pub value2: String,
    pub operation: String,
}

/// A [`ComputeRequest`] whose operands are numbers. The operation text is
/// passed through untouched; recognizing it is the service's job.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequest {
    pub operand1: f64,
    pub operand2: f64,
    pub operation: String,
}

impl ComputeRequest {
    /// # Errors
    /// Returns the first operand that fails [`parse_operand`].
    pub fn parse(&self) -> Result<ParsedRequest, InputError> {
        Ok(ParsedRequest {
            operand1: parse_operand(1, &self.value1)?,
            operand2: parse_operand(2, &self.value2)?,
            operation: self.operation.clone(),
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn accepts_both_decimal_separators() {
        assert_eq!(parse_operand(1, "2,5"), Ok(2.5));
        assert_eq!(parse_operand(1, "2.5"), Ok(2.5));
        assert_eq!(parse_operand(1, " -10 "), Ok(-10.0));
        assert_eq!(parse_operand(1, "1e3"), Ok(1000.0));
    }

    #[test]
    fn rejects_garbage() {
        for text in ["", "   ", "abc", "1,2,3", "1.2,3", "2,5x"] {
            assert_eq!(
                parse_operand(2, text),
                Err(InputError::InvalidOperand { position: 2 }),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_non_finite() {
        for text in ["inf", "-infinity", "NaN", "1e400"] {
            assert!(parse_operand(1, text).is_err(), "{text:?} should be rejected");
        }
    }

    #[test]
    fn request_reports_first_bad_operand() {
        let req = ComputeRequest {
            value1: "x".to_owned(),
            value2: "y".to_owned(),
            operation: "add".to_owned(),
        };
        let err = req.parse().unwrap_err();
        assert_eq!(err.position(), 1);
        assert_eq!(err.to_string(), "invalid input for operand 1");

        let req = ComputeRequest {
            value1: "1".to_owned(),
            value2: "".to_owned(),
            operation: "add".to_owned(),
        };
        assert_eq!(req.parse().unwrap_err().to_string(), "invalid input for operand 2");
    }

    #[test]
    fn request_keeps_operation_text() {
        let req = ComputeRequest {
            value1: "3,0".to_owned(),
            value2: "4".to_owned(),
            operation: " Sum ".to_owned(),
        };
        let parsed = req.parse().unwrap();
        assert_eq!(parsed.operand1, 3.0);
        assert_eq!(parsed.operand2, 4.0);
        assert_eq!(parsed.operation, " Sum ");
    }
}

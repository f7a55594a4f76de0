//! Garde validation utilities.

use crate::domain::OutcomeError;
use garde::{Report, Validate};

/// Validate a request, turning a garde report into an `InvalidInput` error
pub fn validate_struct<T>(value: &T) -> Result<(), OutcomeError>
where
    T: Validate,
    T::Context: Default,
{
    value
        .validate()
        .map_err(|report| OutcomeError::invalid_input(format_validation_errors(&report)))
}

/// Format validation errors from garde Report into a human-readable string
fn format_validation_errors(report: &Report) -> String {
    report
        .iter()
        .map(|(path, error)| {
            if path.to_string().is_empty() {
                error.message().to_string()
            } else {
                format!("{}: {}", path, error.message())
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCategory;
    use garde::Validate;

    #[derive(Validate)]
    struct TestRequest {
        #[garde(length(min = 1, max = 10))]
        name: String,
        #[garde(length(min = 1))]
        brand: Option<String>,
    }

    #[test]
    fn test_validate_success() {
        let request = TestRequest {
            name: "value".to_string(),
            brand: None,
        };
        assert!(validate_struct(&request).is_ok());
    }

    #[test]
    fn test_validate_failure_is_invalid_input() {
        let request = TestRequest {
            name: "".to_string(),
            brand: None,
        };
        let error = validate_struct(&request).unwrap_err();
        assert_eq!(error.code, OutcomeError::INVALID_INPUT);
        assert_eq!(error.category, ErrorCategory::Validation);
    }

    #[test]
    fn test_validate_reports_every_field() {
        let request = TestRequest {
            name: "far too long for the limit".to_string(),
            brand: Some("".to_string()),
        };
        let error = validate_struct(&request).unwrap_err();
        assert!(error.message.contains("name"));
        assert!(error.message.contains("brand"));
    }
}

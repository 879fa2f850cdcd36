/// Errors raised while validating tool arguments, before any network call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("field {field} is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("unable to parse {field} '{value}' as {expected}")]
    ParseFailed {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("date range is reversed: {from} is after {to}")]
    ReversedRange { from: String, to: String },
}

impl ValidationError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

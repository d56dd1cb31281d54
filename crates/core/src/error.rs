use thiserror::Error;

/// Request-level failure taxonomy. `InvalidInput` comes from client-side
/// validation and never reaches the upstream API; the other variants
/// classify upstream Cost Explorer failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    AuthenticationFailed(String),
    #[error("{0}")]
    AccessDenied(String),
    #[error("{0}")]
    Upstream(String),
}

impl BillingError {
    pub(crate) fn invalid_month() -> Self {
        Self::InvalidInput("Month must be in YYYY-MM format".to_string())
    }

    /// Map an upstream error code onto the taxonomy. Unknown codes pass the
    /// upstream message through unchanged.
    pub fn from_upstream(code: Option<&str>, message: impl Into<String>) -> Self {
        match code {
            Some("UnrecognizedClientException") => Self::AuthenticationFailed(
                "Invalid AWS credentials. Check AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY \
                 in the environment."
                    .to_string(),
            ),
            Some("AccessDeniedException") => Self::AccessDenied(
                "Insufficient permissions. The supplied AWS credentials don't have access \
                 to the Cost Explorer API."
                    .to_string(),
            ),
            _ => Self::Upstream(message.into()),
        }
    }

    /// Stable machine-readable label carried in the `error` field of HTTP
    /// error bodies.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "Invalid month format",
            Self::AuthenticationFailed(_) => "Authentication failed",
            Self::AccessDenied(_) => "Access denied",
            Self::Upstream(_) => "Failed to retrieve billing data",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_expired_credentials() {
        let err = BillingError::from_upstream(Some("UnrecognizedClientException"), "ignored");
        assert!(matches!(err, BillingError::AuthenticationFailed(_)));
        assert_eq!(err.label(), "Authentication failed");
    }

    #[test]
    fn classifies_missing_permissions() {
        let err = BillingError::from_upstream(Some("AccessDeniedException"), "ignored");
        assert!(matches!(err, BillingError::AccessDenied(_)));
        assert_eq!(err.label(), "Access denied");
    }

    #[test]
    fn unknown_codes_pass_the_message_through() {
        let err = BillingError::from_upstream(Some("ThrottlingException"), "rate exceeded");
        assert_eq!(err, BillingError::Upstream("rate exceeded".to_string()));
        assert_eq!(err.label(), "Failed to retrieve billing data");

        let err = BillingError::from_upstream(None, "connection reset");
        assert_eq!(err.to_string(), "connection reset");
    }
}

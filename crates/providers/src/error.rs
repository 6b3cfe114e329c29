//! Provider error classification.
//!
//! The dispatcher's retry policy keys entirely off this split: transient
//! failures are retried with backoff, fatal ones refund immediately.

/// Error returned by a provider call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Retryable: timeout, temporary unavailability, overload.
    #[error("Transient provider error: {0}")]
    Transient(String),

    /// Terminal: invalid input or a permanent provider-side rejection.
    #[error("Fatal provider error: {0}")]
    Fatal(String),
}

impl ProviderError {
    /// Whether the dispatcher may retry after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }

    /// Classify an HTTP response status.
    ///
    /// 408 (request timeout), 429 (rate limited) and all 5xx are
    /// transient; every other non-success status is a permanent
    /// rejection of the request.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        let message = format!("HTTP {status}: {body}");
        match status {
            408 | 429 => ProviderError::Transient(message),
            500..=599 => ProviderError::Transient(message),
            _ => ProviderError::Fatal(message),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    /// Network-level failures (connect, timeout, interrupted body) are
    /// transient; anything that made it to a status code is classified
    /// by [`ProviderError::from_http_status`] at the call site.
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Transient(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn server_errors_are_transient() {
        assert_matches!(
            ProviderError::from_http_status(500, ""),
            ProviderError::Transient(_)
        );
        assert_matches!(
            ProviderError::from_http_status(503, ""),
            ProviderError::Transient(_)
        );
    }

    #[test]
    fn timeout_and_rate_limit_are_transient() {
        assert_matches!(
            ProviderError::from_http_status(408, ""),
            ProviderError::Transient(_)
        );
        assert_matches!(
            ProviderError::from_http_status(429, ""),
            ProviderError::Transient(_)
        );
    }

    #[test]
    fn client_errors_are_fatal() {
        assert_matches!(
            ProviderError::from_http_status(400, "bad prompt"),
            ProviderError::Fatal(_)
        );
        assert_matches!(
            ProviderError::from_http_status(422, ""),
            ProviderError::Fatal(_)
        );
    }

    #[test]
    fn fatal_message_carries_body() {
        let err = ProviderError::from_http_status(400, "bad prompt");
        assert!(err.to_string().contains("bad prompt"));
    }

    #[test]
    fn is_transient_matches_variant() {
        assert!(ProviderError::Transient("x".into()).is_transient());
        assert!(!ProviderError::Fatal("x".into()).is_transient());
    }
}

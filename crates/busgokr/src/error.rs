//! Error taxonomy for bus.go.kr operations

use thiserror::Error;

/// Failures raised by the HTTP transport before an envelope can be inspected
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection to the service failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The service answered with a non-success HTTP status
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The response body was not valid JSON
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Request timeout
    #[error("Request timed out after {timeout_secs} seconds")]
    Timeout {
        /// The timeout duration in seconds
        timeout_secs: u64,
    },
}

impl TransportError {
    /// Returns true if repeating the request might succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::RequestFailed(_) | Self::Timeout { .. }
        )
    }
}

/// Errors that can occur during bus.go.kr operations
#[derive(Debug, Error)]
pub enum BusError {
    /// The caller omitted every selector an operation needs
    #[error("Missing parameters: {0}")]
    MissingParameters(String),

    /// The envelope carried a non-success status code
    #[error("API error {code}: {message}")]
    Api {
        /// Upstream status code
        code: i32,
        /// Upstream status message
        message: String,
    },

    /// A required field was missing or not parseable
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// No entity exists for the requested identifier
    #[error("{0}")]
    IdNotFound(String),

    /// No entity matched the requested name
    #[error("{0}")]
    NameNotFound(String),

    /// Neither the identifier nor the name resolved to a route
    #[error("{0}")]
    BusRouteNotFound(String),

    /// A position search found no stations
    #[error("{0}")]
    NoStationAtPosition(String),

    /// A position search found no routes
    #[error("{0}")]
    NoRouteAtPosition(String),

    /// Endpoint table lookup or URL construction failed
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Network or HTTP failure
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl BusError {
    /// Returns true for the "no results for this selector" kinds
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::IdNotFound(_)
                | Self::NameNotFound(_)
                | Self::BusRouteNotFound(_)
                | Self::NoStationAtPosition(_)
                | Self::NoRouteAtPosition(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_transport_errors() {
        assert!(TransportError::ConnectionFailed("test".to_string()).is_retryable());
        assert!(TransportError::RequestFailed("HTTP 502".to_string()).is_retryable());
        assert!(TransportError::Timeout { timeout_secs: 10 }.is_retryable());
        assert!(!TransportError::ParseError("eof".to_string()).is_retryable());
    }

    #[test]
    fn test_not_found_kinds() {
        assert!(BusError::IdNotFound("x".to_string()).is_not_found());
        assert!(BusError::NameNotFound("x".to_string()).is_not_found());
        assert!(BusError::BusRouteNotFound("x".to_string()).is_not_found());
        assert!(BusError::NoStationAtPosition("x".to_string()).is_not_found());
        assert!(BusError::NoRouteAtPosition("x".to_string()).is_not_found());

        assert!(!BusError::MissingParameters("x".to_string()).is_not_found());
        assert!(
            !BusError::Api {
                code: 8,
                message: "x".to_string()
            }
            .is_not_found()
        );
        assert!(!BusError::from(TransportError::Timeout { timeout_secs: 1 }).is_not_found());
    }

    #[test]
    fn test_error_display() {
        let err = BusError::Api {
            code: 4,
            message: "결과가 없습니다.".to_string(),
        };
        assert!(err.to_string().contains('4'));
        assert!(err.to_string().contains("결과가 없습니다."));

        let err = BusError::IdNotFound("No busroute with id 9999 found.".to_string());
        assert_eq!(err.to_string(), "No busroute with id 9999 found.");

        let err = BusError::from(TransportError::Timeout { timeout_secs: 10 });
        assert!(err.to_string().contains("10"));
    }
}

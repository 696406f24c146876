use thiserror::Error;

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Value of type `{0}` cannot be represented as text")]
    Unrepresentable(&'static str),

    #[error("Payload is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

#[derive(Error, Debug)]
pub enum CompositionError {
    #[error("Failed to serialize payload: {0}")]
    Serialization(#[from] SerializationError),

    #[error("No serializer configured to encode a payload of type `{0}`")]
    Unencodable(&'static str),
}

/// Raised before any broker call when the scheduling arguments of a publish are inconsistent.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("You cannot publish a message in the past")]
    PublishInPast,

    #[error("You cannot set a publish date for a high priority message")]
    ScheduledHighPriority,
}

/// Failure reported by a broker collaborator. It is carried as-is and never inspected.
#[derive(Error, Debug)]
#[error("Broker call failed: {0}")]
pub struct BrokerError(#[source] pub Box<dyn std::error::Error + Send + Sync>);

impl BrokerError {
    pub fn new(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        BrokerError(e.into())
    }
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("Message scheduled for `{0}` but no deferred queue is configured")]
    NoDeferredQueue(chrono::DateTime<chrono::Utc>),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value `{value}` for `{key}`")]
    InvalidValue { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ValidationError::PublishInPast.to_string(),
            "You cannot publish a message in the past"
        );
        assert_eq!(
            ValidationError::ScheduledHighPriority.to_string(),
            "You cannot set a publish date for a high priority message"
        );
    }

    #[test]
    fn test_publish_error_is_transparent_over_validation() {
        let err: PublishError = ValidationError::PublishInPast.into();
        assert_eq!(err.to_string(), "You cannot publish a message in the past");
        assert!(matches!(
            err,
            PublishError::Validation(ValidationError::PublishInPast)
        ));
    }

    #[test]
    fn test_broker_error_keeps_source() {
        let err = BrokerError::new("channel closed");
        assert_eq!(err.to_string(), "Broker call failed: channel closed");
        assert!(std::error::Error::source(&err).is_some());
    }
}

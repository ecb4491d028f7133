//! Error types shared by every module.
//!
//! Vendor failures (Cognito, DynamoDB, S3, or the in-memory stand-ins) are
//! carried as [`VendorError`] and pass through [`Error::Vendor`] untouched.

use std::fmt;
use thiserror::Error;

/// Coarse classification of a failure reported by a managed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    PermissionDenied,
    Unavailable,
    NotFound,
    InvalidCredentials,
    AlreadyExists,
    InvalidArgument,
    Unknown,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            ErrorCode::PermissionDenied => "permission-denied",
            ErrorCode::Unavailable => "unavailable",
            ErrorCode::NotFound => "not-found",
            ErrorCode::InvalidCredentials => "invalid-credentials",
            ErrorCode::AlreadyExists => "already-exists",
            ErrorCode::InvalidArgument => "invalid-argument",
            ErrorCode::Unknown => "unknown",
        };
        f.write_str(code)
    }
}

/// Error returned by an identity, document or object storage backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct VendorError {
    pub code: ErrorCode,
    pub message: String,
}

impl VendorError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Build from an AWS SDK error, classifying it by exception name.
    ///
    /// The message carries the service's own text, prefixed with `context`.
    pub fn from_sdk<E: fmt::Debug>(context: &str, err: E) -> Self {
        let rendered = format!("{:?}", err);
        let code = classify_sdk_error(&rendered);
        tracing::error!("{} failed ({}): {}", context, code, rendered);

        let message = service_message(&rendered).unwrap_or(rendered.as_str());
        Self::new(code, format!("{}: {}", context, message))
    }
}

/// Pull `message: Some("...")` out of a rendered SDK error.
fn service_message(rendered: &str) -> Option<&str> {
    const MARKER: &str = "message: Some(\"";
    let start = rendered.find(MARKER)? + MARKER.len();
    let rest = &rendered[start..];
    let end = rest.find("\")")?;
    Some(&rest[..end]).filter(|message| !message.is_empty())
}

/// Map the debug rendering of an AWS SDK error onto an [`ErrorCode`].
pub fn classify_sdk_error(error_message: &str) -> ErrorCode {
    const PERMISSION: &[&str] = &["AccessDeniedException", "UnauthorizedOperation", "AccessDenied"];
    const UNAVAILABLE: &[&str] = &[
        "TooManyRequestsException",
        "ThrottlingException",
        "ProvisionedThroughputExceededException",
        "RequestLimitExceeded",
        "InternalErrorException",
        "InternalServerError",
        "ServiceUnavailable",
        "SlowDown",
        "DispatchFailure",
        "TimeoutError",
    ];
    const CREDENTIALS: &[&str] = &[
        "NotAuthorizedException",
        "UserNotConfirmedException",
        "PasswordResetRequiredException",
    ];

    let matches = |names: &[&str]| names.iter().any(|name| error_message.contains(name));

    if matches(PERMISSION) {
        ErrorCode::PermissionDenied
    } else if matches(UNAVAILABLE) {
        ErrorCode::Unavailable
    } else if matches(CREDENTIALS) {
        ErrorCode::InvalidCredentials
    } else if error_message.contains("UsernameExistsException")
        || error_message.contains("ConditionalCheckFailedException")
    {
        ErrorCode::AlreadyExists
    } else if error_message.contains("UserNotFoundException")
        || error_message.contains("ResourceNotFoundException")
        || error_message.contains("NoSuchKey")
        || error_message.contains("NoSuchBucket")
    {
        ErrorCode::NotFound
    } else if error_message.contains("InvalidPasswordException")
        || error_message.contains("InvalidParameterException")
        || error_message.contains("ValidationException")
    {
        ErrorCode::InvalidArgument
    } else {
        ErrorCode::Unknown
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Vendor(#[from] VendorError),

    #[error("no user is signed in")]
    NotSignedIn,

    #[error("the signed-in user has no profile yet")]
    ProfileNotLoaded,

    #[error("operation requires the admin role")]
    Forbidden,

    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("unknown image slot: {0}")]
    UnknownImageSlot(String),

    #[error("invalid client id: {0:?}")]
    InvalidClientId(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("malformed document {collection}/{id}: {source}")]
    Malformed {
        collection: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_cognito_errors() {
        assert_eq!(
            classify_sdk_error("ServiceError { source: NotAuthorizedException(..) }"),
            ErrorCode::InvalidCredentials
        );
        assert_eq!(
            classify_sdk_error("ServiceError { source: UsernameExistsException(..) }"),
            ErrorCode::AlreadyExists
        );
        assert_eq!(
            classify_sdk_error("ServiceError { source: TooManyRequestsException(..) }"),
            ErrorCode::Unavailable
        );
        assert_eq!(
            classify_sdk_error("ServiceError { source: InvalidPasswordException(..) }"),
            ErrorCode::InvalidArgument
        );
    }

    #[test]
    fn test_classify_dynamo_and_transport_errors() {
        assert_eq!(
            classify_sdk_error("ServiceError { source: AccessDeniedException(..) }"),
            ErrorCode::PermissionDenied
        );
        assert_eq!(
            classify_sdk_error("DispatchFailure(DispatchFailure { source: ConnectorError })"),
            ErrorCode::Unavailable
        );
        assert_eq!(
            classify_sdk_error("ServiceError { source: ResourceNotFoundException(..) }"),
            ErrorCode::NotFound
        );
        assert_eq!(classify_sdk_error("something odd"), ErrorCode::Unknown);
    }

    #[test]
    fn test_vendor_error_passes_through_unchanged() {
        let vendor = VendorError::new(ErrorCode::InvalidCredentials, "bad password");
        let err: Error = vendor.clone().into();
        match err {
            Error::Vendor(inner) => assert_eq!(inner, vendor),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(vendor.to_string(), "invalid-credentials: bad password");
    }

    #[derive(Debug)]
    #[allow(dead_code)]
    struct NotAuthorizedException {
        message: Option<String>,
    }

    #[test]
    fn test_from_sdk_keeps_service_message() {
        let err = VendorError::from_sdk(
            "Cognito sign-in",
            NotAuthorizedException {
                message: Some("Incorrect username or password.".to_string()),
            },
        );
        assert_eq!(err.code, ErrorCode::InvalidCredentials);
        assert_eq!(err.message, "Cognito sign-in: Incorrect username or password.");
    }

    #[test]
    fn test_from_sdk_without_message_uses_rendered_error() {
        #[derive(Debug)]
        struct DispatchFailure;

        let err = VendorError::from_sdk("DynamoDB scan", DispatchFailure);
        assert_eq!(err.code, ErrorCode::Unavailable);
        assert_eq!(err.message, "DynamoDB scan: DispatchFailure");
    }

    #[test]
    fn test_missing_fields_message() {
        let err = Error::MissingFields(vec!["headline".into(), "whatsapp".into()]);
        assert_eq!(err.to_string(), "missing required fields: headline, whatsapp");
    }
}

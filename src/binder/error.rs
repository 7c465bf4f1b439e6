use crate::resolve::ResolveError;
use http::{Method, StatusCode};
use std::fmt;
use std::io;

/// Request binding failure.
///
/// Every variant is attributable to client input, so the whole type maps to
/// `400 Bad Request`; the variant's own message is kept as the detail.
#[derive(Debug)]
pub enum BindError {
    /// A JSON body field could not be coerced into its declared type
    InvalidField(ResolveError),
    /// The JSON body is not a well-formed JSON object
    InvalidJson(String),
    /// Body-bearing method with a `Content-Type` the binder cannot read
    UnsupportedMediaType(String),
    /// Method that is neither a read method nor a body-bearing method
    UnsupportedMethod(Method),
    /// Body longer than the configured limit
    BodyTooLarge {
        /// Configured limit in bytes
        limit: usize,
    },
    /// The body stream failed mid-read
    Body(io::Error),
}

impl BindError {
    /// HTTP status for the error. Always `400 Bad Request`.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    /// Short machine-readable classification, used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            BindError::InvalidField(_) => "invalid_field",
            BindError::InvalidJson(_) => "invalid_json",
            BindError::UnsupportedMediaType(_) => "unsupported_media_type",
            BindError::UnsupportedMethod(_) => "unsupported_method",
            BindError::BodyTooLarge { .. } => "body_too_large",
            BindError::Body(_) => "body_read",
        }
    }

    /// Client-facing description, without the `bad request:` prefix.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            BindError::InvalidField(err) => err.to_string(),
            BindError::InvalidJson(_) => "invalid json".to_string(),
            BindError::UnsupportedMediaType(content_type) => {
                format!("unsupported content type {content_type:?}")
            }
            BindError::UnsupportedMethod(method) => format!("unsupported method {method}"),
            BindError::BodyTooLarge { limit } => format!("request body exceeds {limit} bytes"),
            BindError::Body(err) => format!("failed to read request body: {err}"),
        }
    }

    /// RFC 7807 problem document for the error.
    #[must_use]
    pub fn to_problem(&self) -> serde_json::Value {
        let status = self.status();
        serde_json::json!({
            "type": "about:blank",
            "title": status.canonical_reason().unwrap_or("Bad Request"),
            "status": status.as_u16(),
            "detail": self.detail(),
            "kind": self.kind(),
        })
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bad request: {}", self.detail())
    }
}

impl std::error::Error for BindError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BindError::InvalidField(err) => Some(err),
            BindError::Body(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResolveError> for BindError {
    fn from(err: ResolveError) -> Self {
        BindError::InvalidField(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_variant_is_bad_request() {
        let errors = [
            BindError::InvalidJson("eof".to_string()),
            BindError::UnsupportedMediaType("text/plain".to_string()),
            BindError::UnsupportedMethod(Method::OPTIONS),
            BindError::BodyTooLarge { limit: 1 },
            BindError::Body(io::Error::new(io::ErrorKind::UnexpectedEof, "closed")),
        ];
        for err in &errors {
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
            assert!(err.to_string().starts_with("bad request: "), "{err}");
        }
    }

    #[test]
    fn test_messages_preserve_offending_value() {
        assert_eq!(
            BindError::InvalidJson("trailing comma".to_string()).to_string(),
            "bad request: invalid json"
        );
        assert!(BindError::UnsupportedMediaType("text/plain".to_string())
            .to_string()
            .contains("text/plain"));
        assert!(BindError::UnsupportedMethod(Method::TRACE)
            .to_string()
            .contains("TRACE"));
    }

    #[test]
    fn test_problem_document() {
        let problem = BindError::UnsupportedMethod(Method::OPTIONS).to_problem();
        assert_eq!(problem["status"], 400);
        assert_eq!(problem["title"], "Bad Request");
        assert_eq!(problem["kind"], "unsupported_method");
    }
}

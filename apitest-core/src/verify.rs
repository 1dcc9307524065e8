//! Assertions over a captured HTTP response: status code, JSON-schema shape
//! and error-envelope message. Each check either fully passes or returns a
//! typed verification error; these errors are the expected test-failure
//! signal and propagate out of test bodies with `?`.

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use crate::http::{Response, StatusCode};

static SCHEMAS: Lazy<Mutex<HashMap<PathBuf, Arc<jsonschema::Validator>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("expected status {expected}, got {actual}")]
    StatusMismatch {
        expected: StatusCode,
        actual: StatusCode,
    },
    #[error("response body violates schema {}: {}", schema.display(), violations.join("; "))]
    SchemaViolation {
        schema: PathBuf,
        violations: Vec<String>,
    },
    #[error("expected message {expected:?}, got {actual:?}")]
    MessageMismatch {
        expected: String,
        actual: Option<String>,
    },
    #[error("failed to load schema {}: {reason}", path.display())]
    SchemaLoad { path: PathBuf, reason: String },
    #[error("response body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Error envelope returned by the service on rejected requests. Other fields
/// are ignored.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
}

/// Verification operations over a captured response.
pub trait Verify {
    /// Fails with [`Error::StatusMismatch`] unless the response carries
    /// exactly `expected`.
    fn expect_status(&self, expected: StatusCode) -> Result<(), Error>;

    /// Validates the raw body against the JSON-schema document at `schema`.
    /// Compiled validators are cached per path for the process lifetime.
    fn expect_schema(&self, schema: impl AsRef<Path>) -> Result<(), Error>;

    /// Decodes the body as an error envelope and compares its `message`
    /// field byte-for-byte with `expected`. No normalization.
    fn expect_message(&self, expected: &str) -> Result<(), Error>;
}

impl Verify for Response {
    fn expect_status(&self, expected: StatusCode) -> Result<(), Error> {
        if self.status != expected {
            return Err(Error::StatusMismatch {
                expected,
                actual: self.status,
            });
        }
        Ok(())
    }

    fn expect_schema(&self, schema: impl AsRef<Path>) -> Result<(), Error> {
        let validator = compiled(schema.as_ref())?;
        let instance: serde_json::Value = serde_json::from_str(&self.body)?;

        let violations: Vec<String> = validator
            .iter_errors(&instance)
            .map(|violation| violation.to_string())
            .collect();
        if !violations.is_empty() {
            return Err(Error::SchemaViolation {
                schema: schema.as_ref().to_path_buf(),
                violations,
            });
        }
        Ok(())
    }

    fn expect_message(&self, expected: &str) -> Result<(), Error> {
        let envelope: ErrorEnvelope = serde_json::from_str(&self.body)?;
        match envelope.message {
            Some(ref message) if message == expected => Ok(()),
            actual => Err(Error::MessageMismatch {
                expected: expected.to_string(),
                actual,
            }),
        }
    }
}

fn compiled(path: &Path) -> Result<Arc<jsonschema::Validator>, Error> {
    let mut cache = SCHEMAS
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    if let Some(validator) = cache.get(path) {
        return Ok(validator.clone());
    }

    let buf = std::fs::read_to_string(path).map_err(|e| Error::SchemaLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let document: serde_json::Value = serde_json::from_str(&buf)?;
    let validator = jsonschema::validator_for(&document).map_err(|e| Error::SchemaLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let validator = Arc::new(validator);
    cache.insert(path.to_path_buf(), validator.clone());
    Ok(validator)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use reqwest::header::HeaderMap;
    use std::io::Write;

    fn response(status: StatusCode, body: &str) -> Response {
        Response {
            status,
            headers: HeaderMap::new(),
            body: body.to_string(),
        }
    }

    fn write_schema(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn matching_status_is_a_noop() {
        let res = response(StatusCode::CREATED, "");
        assert!(res.expect_status(StatusCode::CREATED).is_ok());
    }

    #[test]
    fn status_mismatch_carries_both_codes() {
        let res = response(StatusCode::BAD_REQUEST, "");
        let err = res.expect_status(StatusCode::CREATED).unwrap_err();
        match err {
            Error::StatusMismatch { expected, actual } => {
                assert_eq!(expected, StatusCode::CREATED);
                assert_eq!(actual, StatusCode::BAD_REQUEST);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn message_match_is_byte_for_byte() {
        let res = response(StatusCode::UNAUTHORIZED, r#"{"message":"User not authorized!"}"#);
        assert!(res.expect_message("User not authorized!").is_ok());

        let err = res.expect_message("user not authorized!").unwrap_err();
        match err {
            Error::MessageMismatch { expected, actual } => {
                assert_eq!(expected, "user not authorized!");
                assert_eq!(actual.as_deref(), Some("User not authorized!"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn absent_message_field_is_a_mismatch() {
        let res = response(StatusCode::BAD_REQUEST, r#"{"code":"1207"}"#);
        let err = res.expect_message("User not authorized!").unwrap_err();
        assert!(matches!(err, Error::MessageMismatch { actual: None, .. }));
    }

    #[test]
    fn unparsable_body_fails_message_check() {
        let res = response(StatusCode::BAD_REQUEST, "<html>not json</html>");
        assert!(matches!(
            res.expect_message("whatever"),
            Err(Error::InvalidJson(_))
        ));
    }

    #[test]
    fn schema_validation_passes_and_fails() {
        let schema = write_schema(
            r#"{
                "type": "object",
                "properties": {
                    "books": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {"isbn": {"type": "string"}},
                            "required": ["isbn"]
                        }
                    }
                },
                "required": ["books"]
            }"#,
        );

        let ok = response(StatusCode::CREATED, r#"{"books":[{"isbn":"9781449325862"}]}"#);
        assert!(ok.expect_schema(schema.path()).is_ok());

        let bad = response(StatusCode::CREATED, r#"{"books":[{"isbn":42}]}"#);
        let err = bad.expect_schema(schema.path()).unwrap_err();
        match err {
            Error::SchemaViolation { violations, .. } => assert!(!violations.is_empty()),
            other => panic!("unexpected error: {other}"),
        }

        // second use hits the per-path validator cache
        assert!(ok.expect_schema(schema.path()).is_ok());
    }

    #[test]
    fn missing_schema_file_is_a_load_error() {
        let res = response(StatusCode::OK, "{}");
        assert!(matches!(
            res.expect_schema("/nonexistent/schema.json"),
            Err(Error::SchemaLoad { .. })
        ));
    }
}

//! Error types for the content gateway

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the gateway
///
/// Covers failures from the content delivery backend, per-event schema
/// synthesis, and the surrounding runtime. The cache layer never retries or
/// substitutes defaults: every failure propagates to the caller unchanged and
/// nothing partial is cached.
#[derive(Error, Debug)]
pub enum Error {
    /// No event entry matches the requested name (or no entry is flagged as
    /// the default event)
    #[error("no event entry matches `{0}`")]
    EventNotFound(String),

    /// The content source answered but the payload was unusable
    #[error("content source error: {0}")]
    ContentSource(String),

    /// Schema synthesis from content-type metadata failed
    #[error("schema build error: {0}")]
    SchemaBuild(String),

    /// A credential required by the schema builder is absent from the
    /// event's secrets
    #[error("missing credential `{0}` in event secrets")]
    MissingCredentials(&'static str),

    /// Invalid or incomplete gateway configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// HTTP transport errors
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal errors
    #[error("internal error: {0}")]
    Internal(String),

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Stable machine-readable code for error responses
    pub fn code(&self) -> &'static str {
        match self {
            Error::EventNotFound(_) => "EVENT_NOT_FOUND",
            Error::ContentSource(_) => "CONTENT_SOURCE_ERROR",
            Error::SchemaBuild(_) => "SCHEMA_BUILD_ERROR",
            Error::MissingCredentials(_) => "MISSING_CREDENTIALS",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Http(_) => "TRANSPORT_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
            Error::Other(_) => "UNKNOWN_ERROR",
        }
    }

    /// Message suitable for client-facing responses
    ///
    /// # Security
    ///
    /// In production (ENV=production), internal error details are sanitized
    /// to prevent information disclosure. Only safe error types show their
    /// full message to clients.
    pub fn public_message(&self) -> String {
        let is_production = std::env::var("ENV")
            .map(|e| e == "production" || e == "prod")
            .unwrap_or(false);

        if is_production {
            match self {
                // Safe to expose: names what the caller asked for, not internals
                Error::EventNotFound(name) => format!("no event entry matches `{}`", name),
                Error::Config(msg) => format!("invalid configuration: {}", msg),
                // SECURITY: backend and credential details stay server-side
                Error::ContentSource(_) | Error::Http(_) => "content backend error".to_string(),
                Error::SchemaBuild(_) => "schema build error".to_string(),
                Error::MissingCredentials(_) => "event is misconfigured".to_string(),
                Error::Serialization(_) => "data processing error".to_string(),
                Error::Io(_) | Error::Internal(_) | Error::Other(_) => {
                    "internal server error".to_string()
                }
            }
        } else {
            self.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_error_display() {
        let err = Error::EventNotFound("summit-2024".to_string());
        assert_eq!(err.to_string(), "no event entry matches `summit-2024`");

        let err = Error::ContentSource("empty response".to_string());
        assert_eq!(err.to_string(), "content source error: empty response");

        let err = Error::SchemaBuild("duplicate type".to_string());
        assert_eq!(err.to_string(), "schema build error: duplicate type");

        let err = Error::MissingCredentials("cdaToken");
        assert_eq!(
            err.to_string(),
            "missing credential `cdaToken` in event secrets"
        );

        let err = Error::Internal("lost introspection".to_string());
        assert_eq!(err.to_string(), "internal error: lost introspection");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json");
        assert!(json_err.is_err());
        let err: Error = json_err.unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_error_from_anyhow() {
        let anyhow_err = anyhow::anyhow!("something went wrong");
        let err: Error = anyhow_err.into();
        assert!(matches!(err, Error::Other(_)));
    }

    #[test]
    fn test_codes_are_stable() {
        let cases = vec![
            (Error::EventNotFound("x".into()), "EVENT_NOT_FOUND"),
            (Error::ContentSource("x".into()), "CONTENT_SOURCE_ERROR"),
            (Error::SchemaBuild("x".into()), "SCHEMA_BUILD_ERROR"),
            (Error::MissingCredentials("spaceId"), "MISSING_CREDENTIALS"),
            (Error::Config("x".into()), "CONFIG_ERROR"),
            (Error::Internal("x".into()), "INTERNAL_ERROR"),
        ];
        for (err, code) in cases {
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn test_public_message_development() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("ENV");

        let err = Error::SchemaBuild("space graph has a cycle".to_string());
        assert_eq!(
            err.public_message(),
            "schema build error: space graph has a cycle"
        );

        std::env::remove_var("ENV");
    }

    #[test]
    fn test_public_message_production_sanitized() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("ENV", "production");

        let err = Error::Internal("secret space id s1".to_string());
        assert_eq!(err.public_message(), "internal server error");

        let err = Error::MissingCredentials("cmaToken");
        assert_eq!(err.public_message(), "event is misconfigured");

        // Not-found stays informative: it echoes only caller input
        let err = Error::EventNotFound("summit".to_string());
        assert!(err.public_message().contains("summit"));

        std::env::remove_var("ENV");
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(Error::Internal("error".to_string()))
        }

        assert_eq!(returns_ok().unwrap(), 42);
        assert!(returns_err().is_err());
    }
}

//! Infrastructure errors.
//!
//! Stores, caches, and configuration loaders report failures as
//! [`AppError`] so `?` works across crate boundaries. The session layer
//! never shows these to its callers; it logs them and reports a generic
//! internal failure instead.

use std::fmt;

use thiserror::Error;

/// What went wrong, independent of which backend produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    NotFound,
    Validation,
    /// Unique value already taken.
    Conflict,
    Internal,
    Database,
    Cache,
    Configuration,
    Serialization,
    /// A bounded call ran out of time.
    Timeout,
    ServiceUnavailable,
}

impl ErrorKind {
    /// Upper snake-case label used in messages and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Validation => "VALIDATION",
            Self::Conflict => "CONFLICT",
            Self::Internal => "INTERNAL",
            Self::Database => "DATABASE",
            Self::Cache => "CACHE",
            Self::Configuration => "CONFIGURATION",
            Self::Serialization => "SERIALIZATION",
            Self::Timeout => "TIMEOUT",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }

    /// Whether the same call may succeed if simply tried again.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::Database | Self::Cache | Self::Timeout | Self::ServiceUnavailable
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error carried through every infrastructure crate.
///
/// `source` keeps the driver error for logging. [`Clone`] drops it, since
/// driver errors are generally not cloneable.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

macro_rules! kind_constructors {
    ($($name:ident => $kind:ident),* $(,)?) => {
        $(
            #[doc = concat!("An error of kind [`ErrorKind::", stringify!($kind), "`].")]
            pub fn $name(message: impl Into<String>) -> Self {
                Self::new(ErrorKind::$kind, message)
            }
        )*
    };
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Wraps a lower-level error as the cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            source: Some(Box::new(source)),
            ..Self::new(kind, message)
        }
    }

    kind_constructors! {
        not_found => NotFound,
        validation => Validation,
        conflict => Conflict,
        internal => Internal,
        database => Database,
        cache => Cache,
        configuration => Configuration,
        timeout => Timeout,
        service_unavailable => ServiceUnavailable,
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self::new(self.kind, self.message.clone())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorKind::Serialization, "Malformed JSON value", err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        let message = err.to_string();
        Self::with_source(ErrorKind::Configuration, message, err)
    }
}

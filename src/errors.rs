/*!
 * Error types for the loctext library.
 *
 * This module contains the error types for the different layers of the
 * translation engine, using the thiserror crate for ergonomic definitions:
 *
 * - `ProviderError`: transport and API errors raised by providers and
 *   legacy translators
 * - `TranslationFailure`: the structured outcome the router returns for
 *   every expected failure mode
 * - `TerminologyError`: caller errors while loading terminology sources
 * - `SessionError`: commands that are unavailable in the current session state
 */

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request did not complete in time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The API answered but produced no translated text
    #[error("Provider returned an empty translation")]
    EmptyResponse,

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// The requested model is not available on the provider
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Classify this error into the provider failure taxonomy
    pub fn failure_kind(&self) -> ProviderFailureKind {
        match self {
            Self::RequestFailed(_) | Self::ConnectionError(_) => ProviderFailureKind::Network,
            Self::Timeout(_) => ProviderFailureKind::Timeout,
            Self::ParseError(_) | Self::EmptyResponse => ProviderFailureKind::InvalidResponse,
            Self::ModelNotFound(_) => ProviderFailureKind::MissingModel,
            Self::ApiError { status_code, message } => match status_code {
                404 if message.to_lowercase().contains("model") => ProviderFailureKind::MissingModel,
                408 | 504 => ProviderFailureKind::Timeout,
                502 | 503 => ProviderFailureKind::Network,
                _ => ProviderFailureKind::Unknown,
            },
            Self::RateLimitExceeded(_) | Self::AuthenticationError(_) | Self::Cancelled => {
                ProviderFailureKind::Unknown
            }
        }
    }

    /// Name of the error variant, recorded as the failure's cause type
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RequestFailed(_) => "RequestFailed",
            Self::ConnectionError(_) => "ConnectionError",
            Self::Timeout(_) => "Timeout",
            Self::ParseError(_) => "ParseError",
            Self::EmptyResponse => "EmptyResponse",
            Self::ApiError { .. } => "ApiError",
            Self::ModelNotFound(_) => "ModelNotFound",
            Self::RateLimitExceeded(_) => "RateLimitExceeded",
            Self::AuthenticationError(_) => "AuthenticationError",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Whether a retry of the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::ConnectionError(_) | Self::Timeout(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }

    /// Build an error from a non-success HTTP status and its body
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() || error.is_body() {
            Self::ParseError(error.to_string())
        } else if let Some(status) = error.status() {
            Self::from_status(status.as_u16(), error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(error: serde_json::Error) -> Self {
        Self::ParseError(error.to_string())
    }
}

/// Sub-kinds of a provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderFailureKind {
    Network,
    Timeout,
    InvalidResponse,
    MissingModel,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ProviderFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Network => "Network",
            Self::Timeout => "Timeout",
            Self::InvalidResponse => "InvalidResponse",
            Self::MissingModel => "MissingModel",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Which routing fields could not be resolved for a provider request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingRouteField {
    Provider,
    Model,
    ProviderAndModel,
}

impl MissingRouteField {
    /// Determine the missing field set, if any
    pub fn from_presence(has_provider: bool, has_model: bool) -> Option<Self> {
        match (has_provider, has_model) {
            (true, true) => None,
            (false, true) => Some(Self::Provider),
            (true, false) => Some(Self::Model),
            (false, false) => Some(Self::ProviderAndModel),
        }
    }
}

impl fmt::Display for MissingRouteField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider => f.write_str("no translation provider is selected"),
            Self::Model => f.write_str("no model is selected for the translation provider"),
            Self::ProviderAndModel => {
                f.write_str("no translation provider and no model are selected")
            }
        }
    }
}

/// Flat classification of a `TranslationFailure`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RequestValidation,
    Provider(ProviderFailureKind),
    Cancelled,
    LegacyTranslator,
}

/// Structured failure returned by the translation router.
///
/// Every expected failure mode travels through this type; the router never
/// panics or raises for provider faults.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationFailure {
    /// Provider routing was requested but could not be resolved
    #[error("Cannot translate with a provider: {missing}")]
    RequestValidation { missing: MissingRouteField },

    /// The provider call failed
    #[error("Provider '{provider}' failed ({kind}): {message}")]
    Provider {
        provider: String,
        kind: ProviderFailureKind,
        message: String,
        cause_type: Option<String>,
    },

    /// The operation observed a cancellation request
    #[error("Translation was cancelled")]
    Cancelled,

    /// The legacy translator chain could not produce a translation
    #[error("Legacy translation failed: {message}")]
    LegacyTranslator {
        translator: Option<String>,
        message: String,
    },
}

impl TranslationFailure {
    /// Build a provider failure from a classified provider error
    pub fn from_provider_error(provider: &str, error: &ProviderError) -> Self {
        if matches!(error, ProviderError::Cancelled) {
            return Self::Cancelled;
        }
        Self::Provider {
            provider: provider.to_string(),
            kind: error.failure_kind(),
            message: error.to_string(),
            cause_type: Some(error.type_name().to_string()),
        }
    }

    /// Flat kind of this failure
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::RequestValidation { .. } => FailureKind::RequestValidation,
            Self::Provider { kind, .. } => FailureKind::Provider(*kind),
            Self::Cancelled => FailureKind::Cancelled,
            Self::LegacyTranslator { .. } => FailureKind::LegacyTranslator,
        }
    }

    /// Whether the legacy translator chain may be tried after this failure
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(self, Self::Provider { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Provider named by this failure, if any
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::Provider { provider, .. } => Some(provider),
            _ => None,
        }
    }
}

/// Errors that can occur while loading terminology sources
#[derive(Error, Debug)]
pub enum TerminologyError {
    /// The terminology file does not exist
    #[error("Terminology file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file extension is not a supported terminology format
    #[error("Unsupported terminology format: {0}")]
    UnsupportedFormat(String),

    /// The file could not be read
    #[error("Failed to read terminology file: {0}")]
    Io(#[from] std::io::Error),

    /// The delimited file is malformed
    #[error("Failed to parse delimited terminology file: {0}")]
    Csv(#[from] csv::Error),
}

/// Commands that cannot run in the current session state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Another operation is in flight
    #[error("Command unavailable: a translation is already running")]
    Busy,

    /// Nothing is running, so there is nothing to cancel
    #[error("Command unavailable: no translation is running")]
    NotBusy,

    /// Navigation would move past the first or last item
    #[error("Command unavailable: already at the {0} item")]
    AtBoundary(&'static str),

    /// The requested index is outside the item collection
    #[error("Index {index} is out of range for {len} items")]
    IndexOutOfRange { index: usize, len: usize },

    /// The session has no items to work on
    #[error("The item collection is empty")]
    EmptyCollection,

    /// Save was requested without a translated draft
    #[error("Command unavailable: the draft has no translated text")]
    NothingToSave,
}

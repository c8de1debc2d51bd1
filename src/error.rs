use thiserror::Error;

/// Failures surfaced by [`crate::clients::completion::CompletionClient`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompletionError {
    #[error("No API key is configured")]
    CredentialMissing,

    #[error("The API key was rejected by the service")]
    CredentialInvalid,

    #[error("Local request limit reached, retry in {wait_secs}s")]
    LocalRateLimited { wait_secs: u64 },

    #[error("The service is rate limiting requests, retry in {retry_after_secs}s")]
    RemoteRateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {secs}s")]
    NetworkTimeout { secs: u64 },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Service error ({status}): {message}")]
    RemoteServiceError { status: u16, message: String },

    #[error("The service returned an empty response")]
    EmptyResponse,
}

impl CompletionError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::NetworkError(msg.into())
    }

    pub fn remote(status: u16, msg: impl Into<String>) -> Self {
        Self::RemoteServiceError {
            status,
            message: msg.into(),
        }
    }

    /// Short machine-readable identifier.
    pub fn code(&self) -> &'static str {
        match self {
            Self::CredentialMissing => "credential_missing",
            Self::CredentialInvalid => "credential_invalid",
            Self::LocalRateLimited { .. } => "local_rate_limited",
            Self::RemoteRateLimited { .. } => "remote_rate_limited",
            Self::NetworkTimeout { .. } => "network_timeout",
            Self::NetworkError(_) => "network_error",
            Self::RemoteServiceError { .. } => "remote_service_error",
            Self::EmptyResponse => "empty_response",
        }
    }

    /// What the user can do about it.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::CredentialMissing => "Set an API key with `enhancer key set <KEY>`.",
            Self::CredentialInvalid => {
                "Check that the API key is correct and still active, then set it again."
            }
            Self::LocalRateLimited { .. } => {
                "Too many requests in the last minute. Wait for the hinted time and try again."
            }
            Self::RemoteRateLimited { .. } => {
                "The service is throttling this key. Wait a moment or check your plan's limits."
            }
            Self::NetworkTimeout { .. } => {
                "The service did not answer in time. Check your connection and try again."
            }
            Self::NetworkError(_) => "Could not reach the service. Check your network connection.",
            Self::RemoteServiceError { .. } => {
                "The service rejected the request. Try a different model or a shorter prompt."
            }
            Self::EmptyResponse => "The model returned no text. Try again or rephrase the prompt.",
        }
    }

    /// Seconds the caller should wait before trying again, if known.
    pub fn wait_hint(&self) -> Option<u64> {
        match self {
            Self::LocalRateLimited { wait_secs } => Some(*wait_secs),
            Self::RemoteRateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Transient failures that the client retries with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RemoteRateLimited { .. } | Self::NetworkTimeout { .. } | Self::NetworkError(_)
        )
    }
}

/// Structurer-internal failure; never surfaced to callers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("suggested role does not match the expected layout")]
    SuggestionLayout,

    #[error("invalid confidence value: {0}")]
    Confidence(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Credential error: {0}")]
    Crypto(String),
}

impl StoreError {
    pub fn crypto(msg: impl Into<String>) -> Self {
        Self::Crypto(msg.into())
    }
}

use reqwest::StatusCode;
use std::error::Error as StdError;

/// Failures produced by this crate.
///
/// The first six variants mirror the transport taxonomy: construction,
/// credential-format, transport (with the distinguished certificate-trust
/// subtype), decoding, server-rejected, and authentication errors. The
/// remaining variants come from the session boundary and the collaborator
/// stores.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("credentials contain characters that cannot be sent: {0}")]
    InvalidCredentials(String),
    #[error("transport failure: {source}")]
    Transport {
        source: reqwest::Error,
        /// True when the failure chain points at certificate validation,
        /// so callers can surface a trust-remediation hint instead of a
        /// generic connectivity error.
        certificate_trust: bool,
    },
    #[error("response decode failure: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("server rejected request ({status}): {body}")]
    ServerRejected { status: u16, body: String },
    #[error("unauthorized")]
    Unauthorized,
    #[error("no such user in the directory: {0}")]
    UnknownUser(String),
    #[error("session is locked")]
    SessionLocked,
    #[error("no server profile is configured")]
    NotConfigured,
    #[error("local authentication failed: {0}")]
    LocalAuth(String),
    #[error("credential store failure: {0}")]
    CredentialStorage(String),
}

impl Error {
    /// The human-readable message surfaced to the operator for this error.
    ///
    /// For `ServerRejected` this derives the text from the response body:
    /// the envelope's `meta.message` when the body parses as one, else the
    /// raw body, else a status-code fallback. Everything else renders via
    /// `Display`.
    pub fn surface_message(&self) -> String {
        match self {
            Error::ServerRejected { status, body } => rejection_message(*status, body),
            other => other.to_string(),
        }
    }
}

/// Wraps a transport-level failure, tagging certificate-trust causes.
pub(crate) fn classify_transport(source: reqwest::Error) -> Error {
    let certificate_trust = is_certificate_error(&source);
    Error::Transport {
        source,
        certificate_trust,
    }
}

fn is_certificate_error(err: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(cause) = source {
        let text = cause.to_string().to_ascii_lowercase();
        if text.contains("certificate")
            || text.contains("self signed")
            || text.contains("self-signed")
        {
            return true;
        }
        source = cause.source();
    }
    false
}

/// Derives the operator-facing text for a non-200, non-401 response.
pub(crate) fn rejection_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value
            .pointer("/ocs/meta/message")
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
        {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        let reason = StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("request failed");
        format!("{status} {reason}")
    } else {
        trimmed.to_string()
    }
}

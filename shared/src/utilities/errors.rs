use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication against {base_url} failed, {reason}")]
    AuthFailure { base_url: String, reason: String },
    #[error("Failed to read snapshot {path}, {reason}")]
    SnapshotReadFailure { path: PathBuf, reason: String },
    #[error("Failed to write snapshot {path}, {reason}")]
    SnapshotWriteFailure { path: PathBuf, reason: String },
    #[error("Missing required field '{field}' on {kind}")]
    MissingRequiredField { kind: String, field: String },
    #[error("No translation path registered for kind '{0}'")]
    UnknownKind(String),
    #[error("Unknown scope type '{0}'")]
    UnknownScope(String),
    #[error("Unresolved {space} reference '{reference}'")]
    UnresolvedReference { space: String, reference: String },
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: String, name: String },
    #[error("Destination rejected {kind} with status {status}, {body}")]
    DestinationRejected {
        kind: String,
        status: u16,
        body: String,
    },
    #[error("Could not recover existing {kind} '{name}', {reason}")]
    RecoveryFailed {
        kind: String,
        name: String,
        reason: String,
    },
    #[error("Listing {kind} failed with status {status}, {body}")]
    ListingFailed {
        kind: String,
        status: u16,
        body: String,
    },
    #[error("Unexpected response shape, {0}")]
    UnexpectedShape(String),
    #[error("Environment variable {0} not set")]
    EnvironmentVariableNotSetError(String),
    #[error("Invalid config value for {key}, {reason}")]
    InvalidConfig { key: String, reason: String },
    #[error("{0}")]
    FileReadError(String),
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Serde json error: {0}")]
    SerdejsonError(#[from] serde_json::Error),
    #[error("IO error, {0}")]
    IoError(#[from] std::io::Error),
    #[error("Url parse error: {0}")]
    UrlParseError(#[from] url::ParseError),
    #[error("Invalid uuid format: {0}")]
    UuidParseError(#[from] uuid::Error),
}

impl AppError {
    /// Errors that abort the whole run rather than a single resource.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::AuthFailure { .. }
                | Self::SnapshotReadFailure { .. }
                | Self::SnapshotWriteFailure { .. }
                | Self::ListingFailed { .. }
                | Self::EnvironmentVariableNotSetError(_)
                | Self::InvalidConfig { .. }
                | Self::FileReadError(_)
        )
    }

    pub fn missing_field(kind: impl ToString, field: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            kind: kind.to_string(),
            field: field.into(),
        }
    }

    pub fn unresolved(space: impl ToString, reference: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            space: space.to_string(),
            reference: reference.into(),
        }
    }
}
